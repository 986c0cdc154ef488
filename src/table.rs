//! Insertion-order-preserving associative container.
//!
//! Archive dictionaries must serialize in a deterministic, reproducible byte
//! order, and the read order must match for round-trip fidelity. Lookup is a
//! linear scan by value equality, so keys only need `PartialEq`.

/// Ordered key/value table. Keys are unique; re-inserting an existing key
/// overwrites its value in place without changing iteration order.
#[derive(Clone, Debug, PartialEq)]
pub struct OrderedTable<K, V> {
    keys: Vec<K>,
    values: Vec<V>,
}

impl<K, V> Default for OrderedTable<K, V> {
    fn default() -> Self {
        Self {
            keys: Vec::new(),
            values: Vec::new(),
        }
    }
}

impl<K: PartialEq, V> OrderedTable<K, V> {
    pub fn new() -> Self {
        Self::default()
    }

    fn find(&self, key: &K) -> Option<usize> {
        self.keys.iter().position(|k| k == key)
    }

    pub fn contains(&self, key: &K) -> bool {
        self.find(key).is_some()
    }

    pub fn get(&self, key: &K) -> Option<&V> {
        Some(&self.values[self.find(key)?])
    }

    pub fn get_mut(&mut self, key: &K) -> Option<&mut V> {
        let pos = self.find(key)?;
        Some(&mut self.values[pos])
    }

    /// Overwrites in place if `key` is present, else appends.
    pub fn emplace(&mut self, key: K, value: V) {
        match self.find(&key) {
            Some(pos) => self.values[pos] = value,
            None => {
                self.keys.push(key);
                self.values.push(value);
            }
        }
    }

    pub fn len(&self) -> usize {
        self.keys.len()
    }

    pub fn is_empty(&self) -> bool {
        self.keys.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&K, &V)> {
        self.keys.iter().zip(self.values.iter())
    }

    pub fn keys(&self) -> impl Iterator<Item = &K> {
        self.keys.iter()
    }

    pub fn values(&self) -> impl Iterator<Item = &V> {
        self.values.iter()
    }
}

impl<K: PartialEq, V: PartialEq> OrderedTable<K, V> {
    /// Insert for formats that forbid key reuse. Re-inserting a key with an
    /// equal value is a no-op; an unequal value is rejected and the table is
    /// left unchanged. Returns `false` on rejection.
    #[must_use]
    pub fn insert_unique(&mut self, key: K, value: V) -> bool {
        match self.find(&key) {
            Some(pos) => self.values[pos] == value,
            None => {
                self.keys.push(key);
                self.values.push(value);
                true
            }
        }
    }
}
