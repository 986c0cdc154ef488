//! Archive writer: turns a document tree into blocks and relocations, runs
//! the layout engine, and patches the header's total size.

use byteorder::{ByteOrder, WriteBytesExt, BE};
use log::debug;

use crate::io::{
    write_common_header, CommonHeader, Error, Result, DICT_ENTRY_BYTES, DICT_HEADER_BYTES,
    ENTRY_KIND_DATA, ENTRY_KIND_FOLDER, SUPPORTED_REVISION,
};
use crate::layout::{BlockId, LayoutEngine};
use crate::reach::PointerWidth;
use crate::reloc::{NameReloc, Relocation};
use crate::structs::{Document, Entry, Folder};

/// Start alignment of headers and dictionaries.
const STRUCT_ALIGN: u32 = 4;

pub(crate) fn encode_archive(document: &Document) -> Result<Vec<u8>> {
    match document.revision {
        SUPPORTED_REVISION => {}
        revision => return Err(Error::UnsupportedRevision { revision }),
    }

    let mut engine = LayoutEngine::new();

    // Header content; total size and dictionary offset are patched later.
    let mut header_bytes = Vec::with_capacity(crate::io::COMMON_HEADER_BYTES);
    write_common_header(
        &mut header_bytes,
        &CommonHeader {
            fourcc: document.fourcc,
            size: 0,
            revision: document.revision,
            ofs_parent_dict: 0,
        },
    )?;
    let header = engine.add_block(BlockId::NULL, header_bytes, STRUCT_ALIGN);

    let root_dict = add_folder(&mut engine, header, &document.root)?;
    engine.add_reloc(Relocation {
        source: header,
        ofs_delta_reference: 0,
        ofs_pointer: 12,
        target: root_dict,
        addend: 0,
        width: PointerWidth::S32,
    });

    let layout = engine.finalize()?;
    let header_at = layout
        .address_of(header)
        .ok_or(Error::UnknownBlock(header))? as usize;

    let mut buffer = layout.into_buffer();
    if buffer.len() > u32::MAX as usize {
        return Err(Error::ArchiveTooLarge);
    }
    let total = buffer.len() as u32;
    BE::write_u32(&mut buffer[header_at + 4..header_at + 8], total);

    debug!(
        "encoded archive {:?} rev {}: {} bytes",
        std::str::from_utf8(&document.fourcc).unwrap_or("????"),
        document.revision,
        buffer.len()
    );
    Ok(buffer)
}

/// Registers one dictionary block for `folder` plus the name and child
/// blocks of each entry, recursing into sub-folders. Name and data offsets
/// are relative to the dictionary start, so every entry relocation uses the
/// dictionary block itself as its delta reference.
fn add_folder(engine: &mut LayoutEngine, parent: BlockId, folder: &Folder) -> Result<BlockId> {
    let byte_size = DICT_HEADER_BYTES + folder.len() * DICT_ENTRY_BYTES;

    let mut content = Vec::with_capacity(byte_size);
    content.write_u32::<BE>(byte_size as u32)?;
    content.write_u32::<BE>(folder.len() as u32)?;
    for (_, entry) in folder.iter() {
        content.write_i32::<BE>(0)?; // ofs_name, relocated
        content.write_i32::<BE>(0)?; // ofs_data, relocated
        match entry {
            Entry::Data(data) => {
                content.write_u32::<BE>(data.bytes.len() as u32)?;
                content.write_u32::<BE>(ENTRY_KIND_DATA)?;
            }
            Entry::Folder(_) => {
                content.write_u32::<BE>(0)?;
                content.write_u32::<BE>(ENTRY_KIND_FOLDER)?;
            }
        }
    }

    let dict = engine.add_block(parent, content, STRUCT_ALIGN);

    for (i, (name, entry)) in folder.iter().enumerate() {
        let entry_at = (DICT_HEADER_BYTES + i * DICT_ENTRY_BYTES) as u32;

        // Each entry's name pointer pair is declared relative to the entry
        // itself, then rebased to the dictionary the entry nests in.
        let name_reloc =
            NameReloc::new(-(entry_at as i32), 0, name.clone()).rebased(entry_at as i32);
        add_name_reloc(engine, dict, &name_reloc);

        let child = match entry {
            Entry::Data(data) => {
                if data.bytes.is_empty() {
                    // Nothing to point at; the field keeps the null value.
                    continue;
                }
                engine.add_shared_block(dict, data.bytes.clone(), data.align)
            }
            Entry::Folder(sub) => add_folder(engine, dict, sub)?,
        };
        engine.add_reloc(Relocation {
            source: dict,
            ofs_delta_reference: 0,
            ofs_pointer: entry_at + 4,
            target: child,
            addend: 0,
            width: PointerWidth::S32,
        });
    }

    Ok(dict)
}

/// Interns the name's NUL-terminated bytes as a block and queues the patch
/// job for one [`NameReloc`] inside `container`. Repeated names collapse to
/// one stored string through the engine's content interner.
fn add_name_reloc(engine: &mut LayoutEngine, container: BlockId, reloc: &NameReloc) {
    let mut name_bytes = Vec::with_capacity(reloc.name.len() + 1);
    name_bytes.extend_from_slice(reloc.name.as_bytes());
    name_bytes.push(0);
    let name_block = engine.add_shared_block(container, name_bytes, 1);

    engine.add_reloc(Relocation {
        source: container,
        ofs_delta_reference: reloc.ofs_delta_reference as u32,
        ofs_pointer: reloc.ofs_pointer as u32,
        target: name_block,
        addend: 0,
        width: PointerWidth::S32,
    });
}
