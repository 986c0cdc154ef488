//! # Resource Archive Serialization Library
//!
//! This library provides **stable data structures and binary layout/relocation
//! machinery** for console-native resource archives: hierarchical documents of
//! named, variably-sized byte blocks (models, materials, textures, ...) linked
//! by relative pointers.
//!
//! ## Purpose
//!
//! - The structs (`Document`, `Folder`, `Entry`, `DataBlock`) are **plain data
//!   containers**. They are a stable schema for constructing or reading
//!   archive content; payload bytes are opaque to this crate.
//! - Writing places every block into one contiguous buffer, honoring each
//!   block's alignment, deduplicating byte-identical payloads, and patching
//!   every relative pointer. If a pointer distance cannot be represented at
//!   its field width the build fails without emitting partial output.
//! - Reading resolves relative pointers defensively: a malformed or truncated
//!   offset degrades to an absent value instead of aborting the parse.
//! - All actual I/O should be done via the [`WriteArchive`](io::WriteArchive)
//!   and [`ReadArchive`](io::ReadArchive) traits.
//!
//! ## Example
//! ```rust
//! use resarc::structs::{DataBlock, Document, Entry};
//! use resarc::io::{ReadArchive, WriteArchive};
//!
//! let mut doc = Document::new(*b"SCNE", 1);
//! doc.root.insert("mesh", Entry::Data(DataBlock::new(vec![1, 2, 3, 4])));
//!
//! // Serialize it
//! let mut buffer = Vec::new();
//! buffer.write_archive(&doc).unwrap();
//!
//! // Deserialize it
//! let loaded = buffer.as_slice().read_archive().unwrap();
//! assert_eq!(doc, loaded);
//! ```

pub mod intern;
pub mod io;
pub mod layout;
pub mod reach;
pub mod registry;
pub mod reloc;
pub mod span;
pub mod structs;
pub mod table;
