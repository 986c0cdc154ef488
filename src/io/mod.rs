//! Container I/O: binary layout constants, the error taxonomy, and the
//! stream-facing [`WriteArchive`]/[`ReadArchive`] traits.
//!
//! All integers are big-endian. The general container mechanics are:
//!
//! ```text
//! CommonHeader (16 bytes)
//!   [0..4)   fourcc tag
//!   [4..8)   u32 total size
//!   [8..12)  u32 revision
//!   [12..16) s32 relative offset to the root dictionary (0 = none)
//!
//! Dictionary
//!   [0..4)   u32 byte size
//!   [4..8)   u32 entry count
//!   entries, 16 bytes each:
//!     [0..4)   s32 name offset, relative to dictionary start (0 = absent)
//!     [4..8)   s32 data offset, relative to dictionary start (0 = absent)
//!     [8..12)  u32 payload length (0 for sub-dictionaries)
//!     [12..16) u32 entry kind (0 = payload, 1 = sub-dictionary)
//! ```
//!
//! Names are NUL-terminated strings, stored once and shared however many
//! entries reference them. A relative pointer field holding 0 always means
//! "absent", never a real zero-distance pointer.

use byteorder::{WriteBytesExt, BE};
use std::io::{Read, Write};
use thiserror::Error;

pub mod read;
mod write;

pub use read::{ContainerReader, Resource};

use crate::layout::BlockId;
use crate::reach::Reachability;
use crate::span::ByteSpan;
use crate::structs::Document;

pub type Result<T> = std::result::Result<T, Error>;

/// Fixed binary size of [`CommonHeader`].
pub const COMMON_HEADER_BYTES: usize = 16;
/// Dictionary header: byte size + entry count.
pub const DICT_HEADER_BYTES: usize = 8;
/// Size of one dictionary entry.
pub const DICT_ENTRY_BYTES: usize = 16;

/// Dictionary entry kind: leaf payload bytes.
pub const ENTRY_KIND_DATA: u32 = 0;
/// Dictionary entry kind: nested sub-dictionary.
pub const ENTRY_KIND_FOLDER: u32 = 1;

/// The container revision this crate reads and writes.
pub const SUPPORTED_REVISION: u32 = 1;

#[derive(Error, Debug)]
pub enum Error {
    #[error("input truncated: needed {needed} bytes, {available} available")]
    TruncatedInput { needed: usize, available: usize },

    #[error("structural pointer at offset {field_offset:#x} resolves out of bounds")]
    UnresolvedPointer { field_offset: usize },

    #[error("relocation {block:?}+{ofs_pointer:#x}: distance {delta} is {miss}")]
    RelocationOutOfRange {
        block: BlockId,
        ofs_pointer: u32,
        delta: i64,
        miss: Reachability,
    },

    #[error("relocation {block:?}+{ofs_pointer:#x}: real pointer would encode the null value 0")]
    ZeroDistancePointer { block: BlockId, ofs_pointer: u32 },

    #[error("block {id:?}: alignment {align} is not a nonzero power of two")]
    AlignmentViolation { id: BlockId, align: u32 },

    #[error("block {id:?}: distance {delta} to {toward:?} is {miss}")]
    ConstraintViolated {
        id: BlockId,
        toward: BlockId,
        delta: i64,
        miss: Reachability,
    },

    #[error("relocation field {block:?}+{ofs_pointer:#x} lies outside its source block")]
    FieldOutOfBounds { block: BlockId, ofs_pointer: u32 },

    #[error("unknown block handle {0:?}")]
    UnknownBlock(BlockId),

    #[error("dictionary key {key:?} appears twice with conflicting targets")]
    DuplicateKey { key: String },

    #[error("archive revision {revision} is not supported")]
    UnsupportedRevision { revision: u32 },

    #[error("buffer does not match any registered format")]
    UnknownFormat,

    #[error("archive exceeds the 32-bit size limit")]
    ArchiveTooLarge,

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// The 16-byte header every archive and sub-resource starts with.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct CommonHeader {
    pub fourcc: [u8; 4],
    pub size: u32,
    pub revision: u32,
    /// Relative offset from the header start to the owning dictionary;
    /// 0 means none.
    pub ofs_parent_dict: i32,
}

impl CommonHeader {
    /// Whether the declared total size is sane for a buffer of `available`
    /// bytes: at least the header itself, at most the bytes actually there.
    pub fn size_is_valid(&self, available: usize) -> bool {
        self.size as usize >= COMMON_HEADER_BYTES && self.size as usize <= available
    }
}

/// Reads a [`CommonHeader`] from the front of `data`.
///
/// Returns `None` if the buffer is shorter than 16 bytes. Callers must treat
/// that as "not this format", never as fatal: format auto-detection tries
/// multiple readers against the same buffer.
pub fn read_common_header(data: ByteSpan<'_>) -> Option<CommonHeader> {
    if data.len() < COMMON_HEADER_BYTES {
        return None;
    }
    Some(CommonHeader {
        fourcc: data.get_tag(0)?,
        size: data.get_u32(4)?,
        revision: data.get_u32(8)?,
        ofs_parent_dict: data.get_i32(12)?,
    })
}

/// Writes the fixed 16-byte header. The dictionary offset is written as
/// given; writers that relocate the dictionary leave it 0 and patch later.
pub fn write_common_header<W: Write>(w: &mut W, header: &CommonHeader) -> std::io::Result<()> {
    w.write_all(&header.fourcc)?;
    w.write_u32::<BE>(header.size)?;
    w.write_u32::<BE>(header.revision)?;
    w.write_i32::<BE>(header.ofs_parent_dict)?;
    Ok(())
}

/// Trait for writing a [`Document`] to a stream.
///
/// The document tree is laid out into one contiguous buffer first (blocks
/// placed, deduplicated, every relative pointer patched); only a fully valid
/// buffer reaches the stream. The archive revision is taken from the
/// document.
///
/// # Example
/// ```rust
/// use resarc::structs::{DataBlock, Document, Entry};
/// use resarc::io::WriteArchive;
///
/// let mut doc = Document::new(*b"SCNE", 1);
/// doc.root.insert("shape", Entry::Data(DataBlock::new(vec![1, 2])));
///
/// let mut buffer = Vec::new();
/// buffer.write_archive(&doc).unwrap();
/// ```
///
/// # Errors
/// - [`Error::UnsupportedRevision`] for a revision this crate cannot emit.
/// - [`Error::RelocationOutOfRange`] and the other layout errors when the
///   engine cannot place the graph; nothing is written to the stream in that
///   case.
pub trait WriteArchive: Write {
    fn write_archive(&mut self, document: &Document) -> Result<()> {
        let bytes = write::encode_archive(document)?;
        self.write_all(&bytes)?;
        Ok(())
    }
}

impl<W: Write + ?Sized> WriteArchive for W {}

/// Trait for reading a [`Document`] from a stream.
///
/// The stream is read to the end and parsed defensively: malformed optional
/// fields degrade to absent values, while structural damage (truncated
/// header, unresolvable root dictionary) fails the parse.
///
/// # Example
/// ```rust
/// use resarc::io::ReadArchive;
///
/// let buffer = vec![0u8; 4]; // too short for a header
/// assert!(buffer.as_slice().read_archive().is_err());
/// ```
pub trait ReadArchive: Read {
    fn read_archive(&mut self) -> Result<Document> {
        let mut buffer = Vec::new();
        self.read_to_end(&mut buffer)?;
        read::decode_archive(&buffer)
    }
}

impl<R: Read + ?Sized> ReadArchive for R {}
