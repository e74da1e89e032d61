use im::Vector as ImVector;

use crate::language::{Meta, Value};

/// Persistent vector - immutable with structural sharing using im::Vector
#[derive(Clone, Default)]
pub struct PersistentVector {
    pub elements: ImVector<Value>,
    meta: Meta,
}

impl PersistentVector {
    pub fn new() -> Self {
        PersistentVector::default()
    }

    pub fn from_vec(items: Vec<Value>) -> Self {
        PersistentVector {
            elements: items.into_iter().collect(),
            meta: None,
        }
    }

    pub fn len(&self) -> usize {
        self.elements.len()
    }

    pub fn is_empty(&self) -> bool {
        self.elements.is_empty()
    }

    pub fn get(&self, index: usize) -> Option<&Value> {
        self.elements.get(index)
    }

    /// New vector with `value` appended
    pub fn push(&self, value: Value) -> Self {
        let mut elements = self.elements.clone();
        elements.push_back(value);
        PersistentVector {
            elements,
            meta: self.meta.clone(),
        }
    }

    /// New vector with the element at `index` replaced. `index == len`
    /// appends. Returns `None` when the index is out of range.
    pub fn assoc(&self, index: usize, value: Value) -> Option<Self> {
        if index == self.len() {
            return Some(self.push(value));
        }
        if index > self.len() {
            return None;
        }
        Some(PersistentVector {
            elements: self.elements.update(index, value),
            meta: self.meta.clone(),
        })
    }

    pub fn peek(&self) -> Option<&Value> {
        self.elements.last()
    }

    /// New vector without the last element, `None` when empty
    pub fn pop(&self) -> Option<Self> {
        if self.is_empty() {
            return None;
        }
        let mut elements = self.elements.clone();
        elements.pop_back();
        Some(PersistentVector {
            elements,
            meta: self.meta.clone(),
        })
    }

    /// Elements in `start..end`, `None` if the range is invalid
    pub fn subvec(&self, start: usize, end: usize) -> Option<Self> {
        if start > end || end > self.len() {
            return None;
        }
        Some(PersistentVector {
            elements: self.elements.clone().slice(start..end),
            meta: None,
        })
    }

    pub fn iter(&self) -> im::vector::Iter<'_, Value> {
        self.elements.iter()
    }

    pub fn meta(&self) -> &Meta {
        &self.meta
    }

    pub fn with_meta(&self, meta: Meta) -> Self {
        PersistentVector {
            elements: self.elements.clone(),
            meta,
        }
    }
}

impl FromIterator<Value> for PersistentVector {
    fn from_iter<I: IntoIterator<Item = Value>>(iter: I) -> Self {
        PersistentVector {
            elements: iter.into_iter().collect(),
            meta: None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_push_leaves_original_unchanged() {
        let v = PersistentVector::from_vec(vec![Value::int(1), Value::int(2)]);
        let w = v.push(Value::int(3));
        assert_eq!(v.len(), 2);
        assert_eq!(w.len(), 3);
        assert_eq!(w.get(2), Some(&Value::int(3)));
    }

    #[test]
    fn test_assoc_bounds() {
        let v = PersistentVector::from_vec(vec![Value::int(1)]);
        assert_eq!(v.assoc(0, Value::int(9)).unwrap().get(0), Some(&Value::int(9)));
        assert_eq!(v.assoc(1, Value::int(2)).unwrap().len(), 2);
        assert!(v.assoc(5, Value::int(2)).is_none());
        assert_eq!(v.get(0), Some(&Value::int(1)));
    }

    #[test]
    fn test_pop_and_subvec() {
        let v: PersistentVector = (1..=5).map(Value::int).collect();
        assert_eq!(v.pop().unwrap().len(), 4);
        assert!(PersistentVector::new().pop().is_none());
        let sub = v.subvec(1, 3).unwrap();
        assert_eq!(sub.len(), 2);
        assert_eq!(sub.get(0), Some(&Value::int(2)));
        assert!(v.subvec(3, 2).is_none());
        assert!(v.subvec(0, 6).is_none());
    }
}
