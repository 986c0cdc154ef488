//! Binary layout engine.
//!
//! Producers register named chunks of output bytes ("blocks") plus the
//! relative-pointer relationships between them; the engine assigns every
//! block a final address inside one contiguous buffer and patches every
//! pointer field. A build either fully succeeds with a valid buffer or fails
//! without emitting partial output.

use indexmap::IndexMap;
use log::{debug, trace};

use crate::intern::Interner;
use crate::io::{Error, Result};
use crate::reach::{DistanceConstraint, Reachability};
use crate::reloc::{Relocation, RelocationLedger};

/// Sentinel value of the null block handle.
pub const NULL_BLOCK_ID: u32 = 0xFFFF_FFFF;

/// Opaque handle to a registered block. Valid only for the engine that
/// produced it; after `finalize` the handle's identity becomes a fixed
/// offset in the output buffer.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct BlockId(u32);

impl BlockId {
    pub const NULL: BlockId = BlockId(NULL_BLOCK_ID);

    pub fn is_null(self) -> bool {
        self.0 == NULL_BLOCK_ID
    }

    fn index(self) -> usize {
        self.0 as usize
    }
}

impl Default for BlockId {
    fn default() -> Self {
        BlockId::NULL
    }
}

enum BlockContent {
    /// Content owned by this block alone, never collapsed. Structural blocks
    /// (headers, dictionaries) are unique even when their registered bytes
    /// momentarily coincide, since pending relocations will diverge them.
    Unique(Vec<u8>),
    /// Index into the content interner; byte-identical shared blocks
    /// collapse to one address.
    Shared(usize),
}

struct BlockRecord {
    parent: BlockId,
    content: BlockContent,
    align: u32,
    /// Extra distance constraints this block must satisfy toward other
    /// blocks, beyond what each relocation's field width already imposes.
    constraints: Vec<(BlockId, DistanceConstraint)>,
}

/// Assigns final addresses to registered blocks and drives the relocation
/// ledger to patch every pointer field.
///
/// The engine exclusively owns all block records and the ledger for the
/// duration of one build; `finalize` consumes it, so no state survives
/// across invocations. Output is deterministic: an unchanged input graph
/// produces byte-identical output.
#[derive(Default)]
pub struct LayoutEngine {
    records: Vec<BlockRecord>,
    contents: Interner<Vec<u8>>,
    ledger: RelocationLedger,
}

impl LayoutEngine {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a chunk of output data. `parent` declares structural
    /// nesting ([`BlockId::NULL`] for a group root) and controls placement
    /// grouping; `align` is the required start alignment in bytes.
    ///
    /// The block always gets its own copy in the output. Blocks whose fields
    /// are patched by relocations must be registered this way; their bytes
    /// are not final at registration time.
    pub fn add_block(&mut self, parent: BlockId, content: Vec<u8>, align: u32) -> BlockId {
        let size = content.len();
        self.push_record(parent, BlockContent::Unique(content), align, size)
    }

    /// Registers a chunk of output data through the content interner:
    /// byte-identical shared content registered twice collapses to a single
    /// copy at finalize, and every relocation targeting either handle
    /// resolves to the surviving address. For immutable payloads only (name
    /// strings, repeated descriptors); the shared copy is never patched.
    pub fn add_shared_block(&mut self, parent: BlockId, content: Vec<u8>, align: u32) -> BlockId {
        let size = content.len();
        if let Some(existing) = self.contents.find(&content) {
            trace!("shared content ({} bytes) collapses onto interned index {}", size, existing);
        }
        let index = self.contents.add(content);
        self.push_record(parent, BlockContent::Shared(index), align, size)
    }

    fn push_record(
        &mut self,
        parent: BlockId,
        content: BlockContent,
        align: u32,
        size: usize,
    ) -> BlockId {
        self.records.push(BlockRecord {
            parent,
            content,
            align,
            constraints: Vec::new(),
        });

        let id = BlockId(self.records.len() as u32 - 1);
        trace!("registered block {:?}: {} bytes, align {}", id, size, align);
        id
    }

    /// Declares an extra distance constraint `block` must satisfy toward
    /// `toward`, e.g. a narrower relocation scheme between two specific
    /// structures.
    pub fn add_constraint(&mut self, block: BlockId, toward: BlockId, constraint: DistanceConstraint) {
        if let Some(rec) = self.records.get_mut(block.index()) {
            rec.constraints.push((toward, constraint));
        }
    }

    /// Queues a pointer-patch job; consumed at finalize.
    pub fn add_reloc(&mut self, job: Relocation) {
        trace!(
            "queued relocation {:?}+{:#x} -> {:?}{:+}",
            job.source,
            job.ofs_pointer,
            job.target,
            job.addend
        );
        self.ledger.push(job);
    }

    pub fn block_count(&self) -> usize {
        self.records.len()
    }

    pub fn pending_relocations(&self) -> usize {
        self.ledger.len()
    }

    fn content_len(&self, record: &BlockRecord) -> usize {
        match &record.content {
            BlockContent::Unique(bytes) => bytes.len(),
            BlockContent::Shared(index) => self.contents.get(*index).map_or(0, Vec::len),
        }
    }

    /// Checks that `id` names a registered block.
    fn checked_index(&self, id: BlockId) -> Result<usize> {
        if id.index() < self.records.len() {
            Ok(id.index())
        } else {
            Err(Error::UnknownBlock(id))
        }
    }

    /// Assigns addresses, deduplicates, verifies every constraint, and
    /// patches every relocation into the finished buffer.
    pub fn finalize(mut self) -> Result<Layout> {
        let n = self.records.len();

        // Collapse byte-identical shared blocks onto their first
        // registration, widening the survivor's alignment to the strictest
        // requirement. Unique blocks always survive as themselves.
        let mut first_of_content: Vec<Option<usize>> = vec![None; self.contents.len()];
        let mut canon = vec![0usize; n];
        let mut align = vec![0u32; n];
        for (i, rec) in self.records.iter().enumerate() {
            if rec.align == 0 || !rec.align.is_power_of_two() {
                return Err(Error::AlignmentViolation {
                    id: BlockId(i as u32),
                    align: rec.align,
                });
            }
            match &rec.content {
                BlockContent::Unique(_) => {
                    canon[i] = i;
                    align[i] = rec.align;
                }
                BlockContent::Shared(index) => match first_of_content[*index] {
                    Some(first) => {
                        canon[i] = first;
                        align[first] = align[first].max(rec.align);
                        trace!("block {:?} collapses onto {:?}", BlockId(i as u32), BlockId(first as u32));
                    }
                    None => {
                        first_of_content[*index] = Some(i);
                        canon[i] = i;
                        align[i] = rec.align;
                    }
                },
            }
        }

        // Partition surviving blocks into groups by structural root. Parent
        // handles always predate their children, so the chase terminates.
        let root_of = |start: usize| -> usize {
            let mut i = start;
            loop {
                let parent = self.records[i].parent;
                if parent.is_null() {
                    return i;
                }
                let pi = parent.index();
                if pi >= n || canon[pi] >= i {
                    return i;
                }
                i = canon[pi];
            }
        };

        let mut groups: IndexMap<usize, Vec<usize>> = IndexMap::new();
        for i in 0..n {
            if canon[i] == i {
                groups.entry(root_of(i)).or_default().push(i);
            }
        }
        let placed: usize = groups.values().map(Vec::len).sum();

        // Place groups in first-declaration order, members in declaration
        // order, inserting minimal padding for each block's alignment.
        let mut addresses = vec![0u32; n];
        let mut cursor: u64 = 0;
        for members in groups.values() {
            for &i in members {
                let a = align[i] as u64;
                cursor = cursor.div_ceil(a) * a;
                if cursor > u32::MAX as u64 {
                    return Err(Error::ArchiveTooLarge);
                }
                addresses[i] = cursor as u32;
                let size = self.content_len(&self.records[i]);
                trace!("placed block {:?} at {:#x} ({} bytes, align {})", BlockId(i as u32), cursor, size, a);
                cursor += size as u64;
            }
        }
        if cursor > u32::MAX as u64 {
            return Err(Error::ArchiveTooLarge);
        }
        for i in 0..n {
            addresses[i] = addresses[canon[i]];
        }

        // Materialize the buffer; padding stays zeroed.
        let mut buffer = vec![0u8; cursor as usize];
        for (i, rec) in self.records.iter().enumerate() {
            if canon[i] != i {
                continue;
            }
            let content: &[u8] = match &rec.content {
                BlockContent::Unique(bytes) => bytes,
                BlockContent::Shared(index) => {
                    self.contents.get(*index).map_or(&[][..], Vec::as_slice)
                }
            };
            let at = addresses[i] as usize;
            buffer[at..at + content.len()].copy_from_slice(content);
        }

        // Per-block distance constraints.
        for (i, rec) in self.records.iter().enumerate() {
            for &(toward, constraint) in &rec.constraints {
                let t = self.checked_index(toward)?;
                let delta = addresses[t] as i64 - addresses[i] as i64;
                let miss = constraint.check(delta);
                if !miss.is_reachable() {
                    return Err(Error::ConstraintViolated {
                        id: BlockId(i as u32),
                        toward,
                        delta,
                        miss,
                    });
                }
            }
        }

        // Patch relocations. A null target encodes the reserved field value
        // 0; everything else is a signed distance checked against the field
        // width before encoding. Overflow fails the build; silent truncation
        // would corrupt the pointer.
        let jobs = self.ledger.take();
        let job_count = jobs.len();
        for job in jobs {
            let s = self.checked_index(job.source)?;
            let field_at = addresses[s] as usize + job.ofs_pointer as usize;
            let field_end = job.ofs_pointer as usize + job.width.byte_len();
            if field_end > self.content_len(&self.records[s]) {
                return Err(Error::FieldOutOfBounds {
                    block: job.source,
                    ofs_pointer: job.ofs_pointer,
                });
            }
            let field = &mut buffer[field_at..field_at + job.width.byte_len()];

            if job.target.is_null() {
                job.width.encode(field, 0);
                continue;
            }

            let t = self.checked_index(job.target)?;
            let reference = addresses[s] as i64 + job.ofs_delta_reference as i64;
            let delta = addresses[t] as i64 + job.addend - reference;
            if delta == 0 {
                // Would read back as the null sentinel.
                return Err(Error::ZeroDistancePointer {
                    block: job.source,
                    ofs_pointer: job.ofs_pointer,
                });
            }
            match job.width.constraint().check(delta) {
                Reachability::Reachable => {}
                miss => {
                    return Err(Error::RelocationOutOfRange {
                        block: job.source,
                        ofs_pointer: job.ofs_pointer,
                        delta,
                        miss,
                    })
                }
            }
            job.width.encode(field, delta);
            trace!("patched {:?}+{:#x} = {:+}", job.source, job.ofs_pointer, delta);
        }

        debug!(
            "layout finalized: {} blocks ({} placed), {} relocations, {} bytes",
            n,
            placed,
            job_count,
            buffer.len()
        );

        Ok(Layout { buffer, addresses })
    }
}

/// A finished build: the output buffer plus the final address of every
/// registered block (collapsed blocks share the survivor's address).
pub struct Layout {
    buffer: Vec<u8>,
    addresses: Vec<u32>,
}

impl Layout {
    pub fn buffer(&self) -> &[u8] {
        &self.buffer
    }

    pub fn into_buffer(self) -> Vec<u8> {
        self.buffer
    }

    pub fn len(&self) -> usize {
        self.buffer.len()
    }

    pub fn is_empty(&self) -> bool {
        self.buffer.is_empty()
    }

    pub fn address_of(&self, id: BlockId) -> Option<u32> {
        self.addresses.get(id.index()).copied()
    }
}
