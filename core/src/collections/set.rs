use crate::collections::map::ArrayMap;
use crate::language::{Meta, Value};

/// Set of unique values backed by an [`ArrayMap`] from member to itself
#[derive(Clone, Default)]
pub struct PersistentSet {
    members: ArrayMap,
}

impl PersistentSet {
    pub fn new() -> Self {
        PersistentSet::default()
    }

    pub fn len(&self) -> usize {
        self.members.len()
    }

    pub fn is_empty(&self) -> bool {
        self.members.is_empty()
    }

    pub fn contains(&self, value: &Value) -> bool {
        self.members.contains_key(value)
    }

    /// The stored member equal to `value`
    pub fn get(&self, value: &Value) -> Option<&Value> {
        self.members.get(value)
    }

    /// New set including `value`; the receiver if already present
    pub fn add(&self, value: Value) -> Self {
        if self.contains(&value) {
            return self.clone();
        }
        PersistentSet {
            members: self.members.assoc(value.clone(), value),
        }
    }

    pub fn disj(&self, value: &Value) -> Self {
        PersistentSet {
            members: self.members.without(value),
        }
    }

    pub fn iter(&self) -> impl Iterator<Item = &Value> {
        self.members.keys()
    }

    /// The backing map, used for seq views over the members
    pub fn as_map(&self) -> &ArrayMap {
        &self.members
    }

    pub fn meta(&self) -> &Meta {
        self.members.meta()
    }

    pub fn with_meta(&self, meta: Meta) -> Self {
        PersistentSet {
            members: self.members.with_meta(meta),
        }
    }
}

impl FromIterator<Value> for PersistentSet {
    fn from_iter<I: IntoIterator<Item = Value>>(iter: I) -> Self {
        iter.into_iter()
            .fold(PersistentSet::new(), |set, value| set.add(value))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_add_is_idempotent() {
        let s = PersistentSet::new().add(Value::int(1));
        let s2 = s.add(Value::int(1));
        assert_eq!(s2.len(), 1);
        assert_eq!(s.add(Value::int(2)).len(), 2);
        assert_eq!(s.len(), 1);
    }

    #[test]
    fn test_disj() {
        let s: PersistentSet = (1..=3).map(Value::int).collect();
        let s2 = s.disj(&Value::int(2));
        assert!(!s2.contains(&Value::int(2)));
        assert!(s.contains(&Value::int(2)));
        assert_eq!(s2.len(), 2);
    }
}
