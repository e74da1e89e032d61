use std::rc::Rc;

use crate::collections::lazy::LazySeq;
use crate::collections::map::ArrayMap;
use crate::collections::vector::PersistentVector;
use crate::error::Result;
use crate::language::Value;

/// Which part of a map entry a map view yields.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MapView {
    Entries,
    Keys,
    Vals,
}

/// A value prepended to any seqable rest.
pub struct ConsCell {
    pub first: Value,
    pub rest: Value,
}

impl Drop for ConsCell {
    // Realized lazy sequences chain cons cells through lazy cells; walk the
    // uniquely owned part of that chain iteratively.
    fn drop(&mut self) {
        let mut next = std::mem::replace(&mut self.rest, Value::Nil);
        loop {
            next = match next {
                Value::Seq(Seq::Cons(cell)) => match Rc::try_unwrap(cell) {
                    Ok(mut cell) => std::mem::replace(&mut cell.rest, Value::Nil),
                    Err(_) => break,
                },
                Value::Seq(Seq::Lazy(lazy)) => match Rc::try_unwrap(lazy) {
                    Ok(lazy) => lazy.into_realized(),
                    Err(_) => break,
                },
                _ => break,
            };
        }
    }
}

/// Seq views that are not plain lists.
///
/// Index-based views walk an underlying collection without copying it;
/// `rest` just advances the index.
#[derive(Clone)]
pub enum Seq {
    Cons(Rc<ConsCell>),
    Vector {
        vec: PersistentVector,
        index: usize,
    },
    Map {
        map: ArrayMap,
        index: usize,
        view: MapView,
    },
    Array {
        items: Rc<[Value]>,
        index: usize,
    },
    Lazy(Rc<LazySeq>),
}

impl Seq {
    pub fn cons(first: Value, rest: Value) -> Seq {
        Seq::Cons(Rc::new(ConsCell { first, rest }))
    }

    pub fn from_vec(items: Vec<Value>) -> Seq {
        Seq::Array {
            items: items.into(),
            index: 0,
        }
    }

    /// First element and remainder, `None` once exhausted. Forces lazy
    /// sequences.
    pub fn uncons(&self) -> Result<Option<(Value, Value)>> {
        Ok(match self {
            Seq::Cons(cell) => Some((cell.first.clone(), cell.rest.clone())),
            Seq::Vector { vec, index } => vec.get(*index).map(|v| {
                let rest = Seq::Vector {
                    vec: vec.clone(),
                    index: index + 1,
                };
                (v.clone(), Value::Seq(rest))
            }),
            Seq::Map { map, index, view } => map.nth_entry(*index).map(|(k, v)| {
                let first = match view {
                    MapView::Entries => Value::vector(vec![k.clone(), v.clone()]),
                    MapView::Keys => k.clone(),
                    MapView::Vals => v.clone(),
                };
                let rest = Seq::Map {
                    map: map.clone(),
                    index: index + 1,
                    view: *view,
                };
                (first, Value::Seq(rest))
            }),
            Seq::Array { items, index } => items.get(*index).map(|v| {
                let rest = Seq::Array {
                    items: items.clone(),
                    index: index + 1,
                };
                (v.clone(), Value::Seq(rest))
            }),
            Seq::Lazy(lazy) => {
                let mut current = lazy.force()?;
                while let Value::Seq(Seq::Lazy(inner)) = &current {
                    current = inner.force()?;
                }
                return crate::abstractions::uncons(&current);
            }
        })
    }

    /// Element count when it is known without walking
    pub fn counted_len(&self) -> Option<usize> {
        match self {
            Seq::Vector { vec, index } => Some(vec.len().saturating_sub(*index)),
            Seq::Map { map, index, .. } => Some(map.len().saturating_sub(*index)),
            Seq::Array { items, index } => Some(items.len().saturating_sub(*index)),
            Seq::Cons(_) | Seq::Lazy(_) => None,
        }
    }

    pub fn is_lazy(&self) -> bool {
        matches!(self, Seq::Lazy(_))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_vector_view_walks_without_copying() {
        let vec = PersistentVector::from_vec(vec![Value::int(1), Value::int(2)]);
        let seq = Seq::Vector { vec, index: 0 };
        let (first, rest) = seq.uncons().unwrap().unwrap();
        assert_eq!(first, Value::int(1));
        match rest {
            Value::Seq(rest) => {
                assert_eq!(rest.counted_len(), Some(1));
                let (second, tail) = rest.uncons().unwrap().unwrap();
                assert_eq!(second, Value::int(2));
                match tail {
                    Value::Seq(tail) => assert!(tail.uncons().unwrap().is_none()),
                    other => panic!("unexpected {other:?}"),
                }
            }
            other => panic!("unexpected {other:?}"),
        }
    }

    #[test]
    fn test_map_views() {
        let map = ArrayMap::new()
            .assoc(Value::keyword("a"), Value::int(1))
            .assoc(Value::keyword("b"), Value::int(2));
        let keys = Seq::Map {
            map: map.clone(),
            index: 0,
            view: MapView::Keys,
        };
        let vals = Seq::Map {
            map,
            index: 1,
            view: MapView::Vals,
        };
        assert_eq!(keys.uncons().unwrap().unwrap().0, Value::keyword("a"));
        assert_eq!(vals.uncons().unwrap().unwrap().0, Value::int(2));
    }

    #[test]
    fn test_long_cons_chain_drops() {
        let mut v = Value::Nil;
        for i in 0..200_000 {
            v = Value::Seq(Seq::cons(Value::int(i), v));
        }
        drop(v);
    }
}
