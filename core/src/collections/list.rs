//! Singly linked persistent list.
//!
//! Prepending shares the whole tail with the original list, and every node
//! records the length of the list it heads so `count` is O(1).

use std::rc::Rc;

use crate::language::{Meta, Value};

struct Node {
    first: Value,
    rest: Option<Rc<Node>>,
    count: usize,
}

#[derive(Clone, Default)]
pub struct List {
    head: Option<Rc<Node>>,
    meta: Meta,
}

impl List {
    pub fn empty() -> Self {
        List::default()
    }

    pub fn from_vec(items: Vec<Value>) -> Self {
        items
            .into_iter()
            .rev()
            .fold(List::empty(), |list, item| list.cons(item))
    }

    /// New list with `value` in front; the receiver is untouched
    pub fn cons(&self, value: Value) -> Self {
        let count = self.len() + 1;
        List {
            head: Some(Rc::new(Node {
                first: value,
                rest: self.head.clone(),
                count,
            })),
            meta: None,
        }
    }

    pub fn first(&self) -> Option<&Value> {
        self.head.as_ref().map(|node| &node.first)
    }

    /// Everything after the first element; the empty list for an empty list
    pub fn rest(&self) -> List {
        List {
            head: self.head.as_ref().and_then(|node| node.rest.clone()),
            meta: None,
        }
    }

    pub fn len(&self) -> usize {
        self.head.as_ref().map_or(0, |node| node.count)
    }

    pub fn is_empty(&self) -> bool {
        self.head.is_none()
    }

    pub fn iter(&self) -> ListIter<'_> {
        ListIter {
            node: self.head.as_deref(),
        }
    }

    pub fn meta(&self) -> &Meta {
        &self.meta
    }

    pub fn with_meta(&self, meta: Meta) -> Self {
        List {
            head: self.head.clone(),
            meta,
        }
    }

    pub fn ptr_eq(&self, other: &List) -> bool {
        match (&self.head, &other.head) {
            (Some(a), Some(b)) => Rc::ptr_eq(a, b),
            (None, None) => true,
            _ => false,
        }
    }
}

impl Drop for List {
    // Unlink uniquely owned nodes one at a time so long lists do not
    // recurse through `Rc` drops.
    fn drop(&mut self) {
        let mut next = self.head.take();
        while let Some(node) = next {
            match Rc::try_unwrap(node) {
                Ok(mut node) => next = node.rest.take(),
                Err(_) => break,
            }
        }
    }
}

pub struct ListIter<'a> {
    node: Option<&'a Node>,
}

impl<'a> Iterator for ListIter<'a> {
    type Item = &'a Value;

    fn next(&mut self) -> Option<Self::Item> {
        let node = self.node?;
        self.node = node.rest.as_deref();
        Some(&node.first)
    }
}

impl FromIterator<Value> for List {
    fn from_iter<I: IntoIterator<Item = Value>>(iter: I) -> Self {
        List::from_vec(iter.into_iter().collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ints(list: &List) -> Vec<i64> {
        list.iter()
            .map(|v| match v {
                Value::Number(crate::numeric::NumericType::Int(n)) => *n,
                other => panic!("unexpected {other:?}"),
            })
            .collect()
    }

    #[test]
    fn test_cons_shares_and_counts() {
        let base = List::from_vec(vec![Value::int(2), Value::int(3)]);
        let longer = base.cons(Value::int(1));

        assert_eq!(base.len(), 2);
        assert_eq!(longer.len(), 3);
        assert_eq!(ints(&longer), vec![1, 2, 3]);
        assert_eq!(ints(&base), vec![2, 3]);
        assert!(longer.rest().ptr_eq(&base));
    }

    #[test]
    fn test_rest_of_empty_is_empty() {
        let empty = List::empty();
        assert!(empty.rest().is_empty());
        assert!(empty.first().is_none());
    }

    #[test]
    fn test_long_list_drops_without_overflow() {
        let list: List = (0..200_000).map(Value::int).collect();
        assert_eq!(list.len(), 200_000);
        drop(list);
    }
}
