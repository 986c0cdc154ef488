//! Defensive container reading.
//!
//! The reader reconstructs a name → block reference graph from relative
//! offsets without trusting the input. Optional fields that resolve out of
//! range degrade to empty values; structural damage (truncated header,
//! unresolvable root dictionary, conflicting duplicate keys) aborts this
//! parse attempt but stays recoverable for format auto-detection.

use log::{debug, trace};

use crate::io::{
    read_common_header, CommonHeader, Error, Result, COMMON_HEADER_BYTES, DICT_ENTRY_BYTES,
    DICT_HEADER_BYTES, ENTRY_KIND_FOLDER, SUPPORTED_REVISION,
};
use crate::span::ByteSpan;
use crate::structs::{DataBlock, Document, Entry, Folder};
use crate::table::OrderedTable;

/// Cap on dictionary nesting. Offsets in a malformed file can form a cycle;
/// anything deeper degrades to an empty dictionary.
const MAX_DICT_DEPTH: usize = 64;

/// One resolved node of the reference graph. Borrows the input buffer and
/// is invalid the instant the backing buffer is released.
#[derive(Clone, Debug, PartialEq)]
pub enum Resource<'a> {
    Folder(OrderedTable<String, Resource<'a>>),
    Data(ByteSpan<'a>),
}

/// Resolves a [`CommonHeader`] and recursively resolves named dictionary
/// entries into a reference graph, holding only a borrowed view of the
/// input.
pub struct ContainerReader<'a> {
    data: ByteSpan<'a>,
}

impl<'a> ContainerReader<'a> {
    pub fn new(buffer: &'a [u8]) -> Self {
        Self {
            data: ByteSpan::new(buffer),
        }
    }

    /// The archive header, or `None` if the buffer cannot hold one. Soft by
    /// design: auto-detection probes several readers against one buffer.
    pub fn header(&self) -> Option<CommonHeader> {
        read_common_header(self.data)
    }

    /// Resolves the header and the full reference graph.
    pub fn read(&self) -> Result<(CommonHeader, Resource<'a>)> {
        let header = self.header().ok_or(Error::TruncatedInput {
            needed: COMMON_HEADER_BYTES,
            available: self.data.len(),
        })?;
        if !header.size_is_valid(self.data.len()) {
            return Err(Error::TruncatedInput {
                needed: header.size as usize,
                available: self.data.len(),
            });
        }

        let root = if header.ofs_parent_dict == 0 {
            Resource::Folder(OrderedTable::new())
        } else {
            // The root dictionary is structural: an unresolvable offset
            // fails the parse instead of degrading.
            let dict_at = self
                .data
                .resolve_pointer(12, 0)
                .ok_or(Error::UnresolvedPointer { field_offset: 12 })?;
            self.read_dictionary(dict_at, 0)?
        };
        Ok((header, root))
    }

    /// Reads the dictionary at `dict_at`. Entry offsets are interpreted
    /// relative to the dictionary's own start; sub-dictionaries recurse with
    /// their own base.
    fn read_dictionary(&self, dict_at: usize, depth: usize) -> Result<Resource<'a>> {
        if depth >= MAX_DICT_DEPTH {
            debug!("dictionary at {:#x} exceeds nesting cap, degrading to empty", dict_at);
            return Ok(Resource::Folder(OrderedTable::new()));
        }

        let count = self.data.get_u32(dict_at + 4).unwrap_or(0) as usize;
        let mut entries: OrderedTable<String, Resource<'a>> = OrderedTable::new();

        for i in 0..count {
            let entry_at = dict_at + DICT_HEADER_BYTES + i * DICT_ENTRY_BYTES;
            if entry_at + DICT_ENTRY_BYTES > self.data.len() {
                debug!(
                    "dictionary at {:#x} declares {} entries but {} fit the buffer",
                    dict_at, count, i
                );
                break;
            }

            let name = self.data.read_string_pointer(entry_at, dict_at);
            let payload_len = self.data.get_u32(entry_at + 8).unwrap_or(0) as usize;
            let kind = self.data.get_u32(entry_at + 12).unwrap_or(0);

            let resource = match self.data.resolve_pointer(entry_at + 4, dict_at) {
                None => Resource::Data(ByteSpan::empty()),
                Some(at) if kind == ENTRY_KIND_FOLDER => self.read_dictionary(at, depth + 1)?,
                Some(at) => Resource::Data(
                    self.data.slice(at, payload_len).unwrap_or_else(ByteSpan::empty),
                ),
            };
            trace!("resolved entry {:?} of dictionary at {:#x}", name, dict_at);

            if !entries.insert_unique(name.to_string(), resource) {
                return Err(Error::DuplicateKey {
                    key: name.to_string(),
                });
            }
        }

        Ok(Resource::Folder(entries))
    }
}

/// Parses a complete buffer into an owned [`Document`].
pub(crate) fn decode_archive(buffer: &[u8]) -> Result<Document> {
    let reader = ContainerReader::new(buffer);
    let (header, root) = reader.read()?;
    if header.revision != SUPPORTED_REVISION {
        return Err(Error::UnsupportedRevision {
            revision: header.revision,
        });
    }

    let mut document = Document::new(header.fourcc, header.revision);
    document.root = to_folder(&root);
    Ok(document)
}

fn to_folder(resource: &Resource<'_>) -> Folder {
    let mut folder = Folder::new();
    if let Resource::Folder(entries) = resource {
        for (name, child) in entries.iter() {
            let entry = match child {
                Resource::Folder(_) => Entry::Folder(to_folder(child)),
                Resource::Data(span) => Entry::Data(DataBlock::new(span.as_bytes().to_vec())),
            };
            folder.insert(name.clone(), entry);
        }
    }
    folder
}
