use crate::table::OrderedTable;

#[derive(Clone, Debug, PartialEq)]
/// Represents an entire scene document.
///
/// A `Document` is the producer/consumer-facing view of an archive: a fourcc
/// identifying the format, a revision, and a tree of named entries. Payload
/// bytes are opaque to this crate; the library guarantees their placement
/// and linkage, never their meaning.
pub struct Document {
    /// Four-byte format tag written into the archive header.
    pub fourcc: [u8; 4],

    /// Format revision written into the archive header. Writing checks it
    /// against the revisions this crate supports.
    pub revision: u32,

    /// Top-level dictionary of the document.
    pub root: Folder,
}

impl Document {
    pub fn new(fourcc: [u8; 4], revision: u32) -> Self {
        Self {
            fourcc,
            revision,
            root: Folder::new(),
        }
    }
}

#[derive(Clone, Debug, Default, PartialEq)]
/// A named dictionary of entries.
///
/// Iteration order is insertion order, and that order is exactly the byte
/// order of the serialized dictionary, so documents rebuild reproducibly.
pub struct Folder {
    entries: OrderedTable<String, Entry>,
}

impl Folder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Inserts an entry under `name`. Re-inserting an existing name replaces
    /// its entry in place without changing iteration order.
    pub fn insert(&mut self, name: impl Into<String>, entry: Entry) {
        self.entries.emplace(name.into(), entry);
    }

    pub fn get(&self, name: &str) -> Option<&Entry> {
        self.entries
            .iter()
            .find(|(k, _)| k.as_str() == name)
            .map(|(_, v)| v)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&String, &Entry)> {
        self.entries.iter()
    }
}

#[derive(Clone, Debug, PartialEq)]
/// One named member of a [`Folder`]: either a nested dictionary or a leaf
/// block of payload bytes.
pub enum Entry {
    Folder(Folder),
    Data(DataBlock),
}

#[derive(Clone, Debug, PartialEq)]
/// An opaque chunk of payload bytes plus its required start alignment in the
/// output buffer.
pub struct DataBlock {
    pub bytes: Vec<u8>,
    pub align: u32,
}

impl DataBlock {
    /// A block with no particular alignment requirement.
    pub fn new(bytes: Vec<u8>) -> Self {
        Self { bytes, align: 1 }
    }

    pub fn with_align(bytes: Vec<u8>, align: u32) -> Self {
        Self { bytes, align }
    }
}
