//! Deduplicating value store.
//!
//! Repeated sub-blocks (name strings, vertex-attribute descriptors) must be
//! stored once in the output buffer and shared by every pointer that targets
//! them. The interner collapses equal values to a stable index; insertion
//! order defines the numbering downstream layout uses as its deduplicated
//! block list.

use indexmap::IndexSet;
use std::hash::Hash;

/// Insertion-ordered deduplicating store.
///
/// Backed by an [`IndexSet`], so lookup is hash-assisted while indices remain
/// stable and equal to insertion order.
#[derive(Clone, Debug, Default)]
pub struct Interner<T: Hash + Eq> {
    entries: IndexSet<T>,
}

impl<T: Hash + Eq> Interner<T> {
    pub fn new() -> Self {
        Self {
            entries: IndexSet::new(),
        }
    }

    /// Returns the index of `value`, inserting it if no equal value was
    /// previously added. Equal values always return the same index.
    pub fn add(&mut self, value: T) -> usize {
        self.entries.insert_full(value).0
    }

    /// Index of a previously interned value. `None` is a caller logic error:
    /// only interned content may be queried.
    pub fn find(&self, value: &T) -> Option<usize> {
        self.entries.get_index_of(value)
    }

    pub fn get(&self, index: usize) -> Option<&T> {
        self.entries.get_index(index)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &T> {
        self.entries.iter()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn equal_values_share_an_index() {
        let mut pool: Interner<Vec<u8>> = Interner::new();
        let a = pool.add(b"courseModel".to_vec());
        let b = pool.add(b"skybox".to_vec());
        let again = pool.add(b"courseModel".to_vec());

        assert_eq!(a, again);
        assert_ne!(a, b);
        assert_eq!(pool.len(), 2);
    }

    #[test]
    fn indices_follow_insertion_order() {
        let mut pool: Interner<&str> = Interner::new();
        assert_eq!(pool.add("x"), 0);
        assert_eq!(pool.add("y"), 1);
        assert_eq!(pool.add("z"), 2);
        assert_eq!(pool.get(1), Some(&"y"));
    }

    #[test]
    fn find_requires_prior_insert() {
        let mut pool: Interner<&str> = Interner::new();
        pool.add("present");
        assert_eq!(pool.find(&"present"), Some(0));
        assert_eq!(pool.find(&"missing"), None);
    }
}
