//! Pending pointer-patch jobs.
//!
//! Every named reference in an archive is recorded as a pair of offsets:
//! the "delta reference" (the base the relative value is measured from) and
//! the pointer field itself (where the relative value is stored). Keeping
//! them separate lets the same name be referenced relative to different base
//! structures without duplicating the string payload.

use crate::layout::BlockId;
use crate::reach::PointerWidth;

/// One named pointer relocation within a structure.
///
/// `{ 0, 4 }` means struct+04 holds a string pointer relative to the struct
/// start; `{ 4, 8 }` means struct+08 holds a string pointer relative to
/// struct+04.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct NameReloc {
    /// Offset of the base the relative value is measured from, relative to
    /// the start of the structure.
    pub ofs_delta_reference: i32,
    /// Offset of the pointer field itself, relative to the start of the
    /// structure.
    pub ofs_pointer: i32,
    pub name: String,
    /// System-owned name (external reference); survives name-table rewrites.
    pub non_volatile: bool,
}

impl NameReloc {
    pub fn new(ofs_delta_reference: i32, ofs_pointer: i32, name: impl Into<String>) -> Self {
        Self {
            ofs_delta_reference,
            ofs_pointer,
            name: name.into(),
            non_volatile: false,
        }
    }

    /// Marks the name as system-owned. Non-volatile names must be preserved
    /// when a name table is rewritten; user names may be renamed or dropped.
    pub fn with_non_volatile(mut self) -> Self {
        self.non_volatile = true;
        self
    }

    /// Shifts both offsets by the parent-relative position of the structure.
    /// `{ 4, 8 }` rebased by 14 becomes `{ 18, 22 }`; rebasing composes
    /// additively across nesting levels.
    pub fn rebased(mut self, offset_parent_to_child: i32) -> Self {
        self.ofs_delta_reference += offset_parent_to_child;
        self.ofs_pointer += offset_parent_to_child;
        self
    }
}

/// One pointer-patch job: patch the field at `source+ofs_pointer` with the
/// signed distance from `source+ofs_delta_reference` to `target+addend`,
/// encoded at `width`.
#[derive(Clone, Debug)]
pub struct Relocation {
    pub source: BlockId,
    pub ofs_delta_reference: u32,
    pub ofs_pointer: u32,
    pub target: BlockId,
    pub addend: i64,
    pub width: PointerWidth,
}

/// The set of pending relocations for one build. Jobs accumulate while
/// blocks are registered and are consumed exactly once when the layout
/// engine finalizes; afterwards the ledger is empty.
#[derive(Debug, Default)]
pub struct RelocationLedger {
    jobs: Vec<Relocation>,
}

impl RelocationLedger {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, job: Relocation) {
        self.jobs.push(job);
    }

    pub fn len(&self) -> usize {
        self.jobs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.jobs.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Relocation> {
        self.jobs.iter()
    }

    /// Drains every job for patching, leaving the ledger empty.
    pub(crate) fn take(&mut self) -> Vec<Relocation> {
        std::mem::take(&mut self.jobs)
    }
}
