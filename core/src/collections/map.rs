//! Insertion ordered map with linear-scan lookup.
//!
//! Keys are compared with value equality, so `1` and `1.0` address the same
//! entry. Maps in this language stay small and ordered, so there is no
//! hashing at all.

use im::Vector as ImVector;

use crate::language::{Meta, Value};

#[derive(Clone, Default)]
pub struct ArrayMap {
    entries: ImVector<(Value, Value)>,
    meta: Meta,
}

impl ArrayMap {
    pub fn new() -> Self {
        ArrayMap::default()
    }

    /// Build from pairs; later duplicates replace earlier values
    pub fn from_pairs<I: IntoIterator<Item = (Value, Value)>>(pairs: I) -> Self {
        pairs
            .into_iter()
            .fold(ArrayMap::new(), |map, (k, v)| map.assoc(k, v))
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    fn index_of(&self, key: &Value) -> Option<usize> {
        self.entries.iter().position(|(k, _)| k == key)
    }

    pub fn get(&self, key: &Value) -> Option<&Value> {
        self.index_of(key).map(|i| &self.entries[i].1)
    }

    /// The stored key and value for `key`
    pub fn entry(&self, key: &Value) -> Option<&(Value, Value)> {
        self.index_of(key).map(|i| &self.entries[i])
    }

    pub fn contains_key(&self, key: &Value) -> bool {
        self.index_of(key).is_some()
    }

    /// New map with `key` bound to `value`. An existing key keeps its
    /// position.
    pub fn assoc(&self, key: Value, value: Value) -> Self {
        let entries = match self.index_of(&key) {
            Some(i) => self.entries.update(i, (key, value)),
            None => {
                let mut entries = self.entries.clone();
                entries.push_back((key, value));
                entries
            }
        };
        ArrayMap {
            entries,
            meta: self.meta.clone(),
        }
    }

    /// New map lacking `key`; a clone of the receiver if it is absent
    pub fn without(&self, key: &Value) -> Self {
        match self.index_of(key) {
            Some(i) => {
                let mut entries = self.entries.clone();
                entries.remove(i);
                ArrayMap {
                    entries,
                    meta: self.meta.clone(),
                }
            }
            None => self.clone(),
        }
    }

    /// Entry at a position in insertion order
    pub fn nth_entry(&self, index: usize) -> Option<&(Value, Value)> {
        self.entries.get(index)
    }

    pub fn iter(&self) -> im::vector::Iter<'_, (Value, Value)> {
        self.entries.iter()
    }

    pub fn keys(&self) -> impl Iterator<Item = &Value> {
        self.entries.iter().map(|(k, _)| k)
    }

    pub fn values(&self) -> impl Iterator<Item = &Value> {
        self.entries.iter().map(|(_, v)| v)
    }

    pub fn meta(&self) -> &Meta {
        &self.meta
    }

    pub fn with_meta(&self, meta: Meta) -> Self {
        ArrayMap {
            entries: self.entries.clone(),
            meta,
        }
    }
}

impl PartialEq for ArrayMap {
    fn eq(&self, other: &Self) -> bool {
        self.len() == other.len()
            && self
                .iter()
                .all(|(k, v)| other.get(k).is_some_and(|w| v == w))
    }
}

impl std::fmt::Debug for ArrayMap {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        std::fmt::Debug::fmt(&Value::Map(self.clone()), f)
    }
}
