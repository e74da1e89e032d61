//! Collection abstractions shared by the stdlib and the runtime.
//!
//! Sequence access is defined once, in [`uncons`], and everything else that
//! walks a collection (`first`, `rest`, `count`, printing, equality) goes
//! through it. Lazy sequences are forced on demand.

use std::rc::Rc;

use num_traits::{Signed, ToPrimitive};

use crate::collections::{ArrayMap, List, MapView, PersistentSet, PersistentVector, Seq};
use crate::error::{Error, Result};
use crate::language::Value;
use crate::numeric::NumericType;

fn not_seqable(value: &Value) -> Error {
    Error::type_error(format!("Don't know how to create a seq from {}", value.kind()))
}

/// Split a seqable value into its first element and the remainder.
/// `None` means the collection is empty.
pub fn uncons(value: &Value) -> Result<Option<(Value, Value)>> {
    Ok(match value {
        Value::Nil => None,
        Value::List(list) => list
            .first()
            .map(|first| (first.clone(), Value::List(list.rest()))),
        Value::Vector(vec) => Seq::Vector {
            vec: vec.clone(),
            index: 0,
        }
        .uncons()?,
        Value::Map(map) => Seq::Map {
            map: map.clone(),
            index: 0,
            view: MapView::Entries,
        }
        .uncons()?,
        Value::Set(set) => Seq::Map {
            map: set.as_map().clone(),
            index: 0,
            view: MapView::Keys,
        }
        .uncons()?,
        Value::String(s) => {
            let chars: Vec<Value> = s.chars().map(Value::Char).collect();
            Seq::from_vec(chars).uncons()?
        }
        Value::Seq(seq) => seq.uncons()?,
        other => return Err(not_seqable(other)),
    })
}

/// `nil` for empty collections, otherwise a sequence over the elements
pub fn seq(value: &Value) -> Result<Value> {
    Ok(match value {
        Value::Nil => Value::Nil,
        Value::List(list) if list.is_empty() => Value::Nil,
        Value::List(_) => value.clone(),
        Value::Vector(vec) if vec.is_empty() => Value::Nil,
        Value::Vector(vec) => Value::Seq(Seq::Vector {
            vec: vec.clone(),
            index: 0,
        }),
        Value::Map(map) if map.is_empty() => Value::Nil,
        Value::Map(map) => Value::Seq(Seq::Map {
            map: map.clone(),
            index: 0,
            view: MapView::Entries,
        }),
        Value::Set(set) if set.is_empty() => Value::Nil,
        Value::Set(set) => Value::Seq(Seq::Map {
            map: set.as_map().clone(),
            index: 0,
            view: MapView::Keys,
        }),
        Value::String(s) if s.is_empty() => Value::Nil,
        Value::String(s) => Value::Seq(Seq::from_vec(s.chars().map(Value::Char).collect())),
        Value::Seq(Seq::Lazy(lazy)) => {
            let mut current = lazy.force()?;
            while let Value::Seq(Seq::Lazy(inner)) = &current {
                current = inner.force()?;
            }
            seq(&current)?
        }
        Value::Seq(s) => match s.counted_len() {
            Some(0) => Value::Nil,
            _ => value.clone(),
        },
        other => return Err(not_seqable(other)),
    })
}

pub fn first(value: &Value) -> Result<Value> {
    Ok(uncons(value)?.map(|(head, _)| head).unwrap_or(Value::Nil))
}

/// Everything after the first element; an empty list when exhausted
pub fn rest(value: &Value) -> Result<Value> {
    Ok(match uncons(value)? {
        Some((_, tail)) => tail,
        None => Value::List(List::empty()),
    })
}

/// Like [`rest`] but `nil` when nothing remains
pub fn next(value: &Value) -> Result<Value> {
    match uncons(value)? {
        Some((_, tail)) => seq(&tail),
        None => Ok(Value::Nil),
    }
}

pub fn count(value: &Value) -> Result<usize> {
    match value {
        Value::Nil => Ok(0),
        Value::String(s) => Ok(s.chars().count()),
        Value::List(list) => Ok(list.len()),
        Value::Vector(vec) => Ok(vec.len()),
        Value::Map(map) => Ok(map.len()),
        Value::Set(set) => Ok(set.len()),
        Value::Seq(s) => match s.counted_len() {
            Some(n) => Ok(n),
            None => {
                let mut n = 0;
                let mut current = value.clone();
                while let Some((_, tail)) = uncons(&current)? {
                    n += 1;
                    current = tail;
                }
                Ok(n)
            }
        },
        other => Err(Error::type_error(format!(
            "count not supported on {}",
            other.kind()
        ))),
    }
}

/// Prepend to any seqable. Lists stay lists.
pub fn cons(head: Value, tail: &Value) -> Result<Value> {
    Ok(match tail {
        Value::Nil => Value::List(List::empty().cons(head)),
        Value::List(list) => Value::List(list.cons(head)),
        Value::Vector(_)
        | Value::Map(_)
        | Value::Set(_)
        | Value::String(_)
        | Value::Seq(_) => Value::Seq(Seq::cons(head, tail.clone())),
        other => return Err(not_seqable(other)),
    })
}

/// Add an element where the collection grows most cheaply
pub fn conj(coll: &Value, item: Value) -> Result<Value> {
    Ok(match coll {
        Value::Nil => Value::List(List::empty().cons(item)),
        Value::List(list) => Value::List(list.cons(item)),
        Value::Vector(vec) => Value::Vector(vec.push(item)),
        Value::Set(set) => Value::Set(set.add(item)),
        Value::Seq(_) => Value::Seq(Seq::cons(item, coll.clone())),
        Value::Map(map) => match &item {
            Value::Vector(pair) if pair.len() == 2 => {
                let (k, v) = (pair.get(0), pair.get(1));
                match (k, v) {
                    (Some(k), Some(v)) => Value::Map(map.assoc(k.clone(), v.clone())),
                    _ => return Err(Error::type_error("map entry must have two elements")),
                }
            }
            Value::Map(other) => {
                let mut result = map.clone();
                for (k, v) in other.iter() {
                    result = result.assoc(k.clone(), v.clone());
                }
                Value::Map(result)
            }
            Value::Nil => coll.clone(),
            other => {
                return Err(Error::type_error(format!(
                    "can't conj {} onto a map",
                    other.kind()
                )));
            }
        },
        other => {
            return Err(Error::type_error(format!(
                "conj not supported on {}",
                other.kind()
            )));
        }
    })
}

fn expect_index(key: &Value) -> Result<i64> {
    match key {
        Value::Number(n) => match n {
            NumericType::Int(i) => Ok(*i),
            NumericType::Float(_) | NumericType::Ratio(_) | NumericType::BigFloat(_) => {
                Err(Error::type_error(format!("index must be an integer, got {key}")))
            }
            // Out of i64 range is out of bounds for every collection
            NumericType::BigInt(n) => Ok(n
                .to_i64()
                .unwrap_or(if n.is_negative() { i64::MIN } else { i64::MAX })),
        },
        other => Err(Error::type_error(format!(
            "index must be an integer, got {}",
            other.kind()
        ))),
    }
}

/// Associate `key` with `value`. A vector accepts `0..=len`; `nil` acts as an
/// empty map.
pub fn assoc(coll: &Value, key: Value, value: Value) -> Result<Value> {
    match coll {
        Value::Nil => Ok(Value::Map(ArrayMap::new().assoc(key, value))),
        Value::Map(map) => Ok(Value::Map(map.assoc(key, value))),
        Value::Vector(vec) => {
            let index = expect_index(&key)?;
            usize::try_from(index)
                .ok()
                .and_then(|i| vec.assoc(i, value))
                .map(Value::Vector)
                .ok_or_else(|| Error::index(index, vec.len()))
        }
        other => Err(Error::type_error(format!(
            "assoc not supported on {}",
            other.kind()
        ))),
    }
}

pub fn dissoc(coll: &Value, key: &Value) -> Result<Value> {
    match coll {
        Value::Nil => Ok(Value::Nil),
        Value::Map(map) => Ok(Value::Map(map.without(key))),
        other => Err(Error::type_error(format!(
            "dissoc not supported on {}",
            other.kind()
        ))),
    }
}

pub fn disj(coll: &Value, key: &Value) -> Result<Value> {
    match coll {
        Value::Nil => Ok(Value::Nil),
        Value::Set(set) => Ok(Value::Set(set.disj(key))),
        other => Err(Error::type_error(format!(
            "disj not supported on {}",
            other.kind()
        ))),
    }
}

/// Keyed lookup. Missing keys and unsupported receivers yield `default`.
pub fn get(coll: &Value, key: &Value, default: Value) -> Value {
    let found = match coll {
        Value::Map(map) => map.get(key).cloned(),
        Value::Set(set) => set.get(key).cloned(),
        Value::Vector(vec) => match key {
            Value::Number(NumericType::Int(i)) => {
                usize::try_from(*i).ok().and_then(|i| vec.get(i)).cloned()
            }
            _ => None,
        },
        Value::String(s) => match key {
            Value::Number(NumericType::Int(i)) => usize::try_from(*i)
                .ok()
                .and_then(|i| s.chars().nth(i))
                .map(Value::Char),
            _ => None,
        },
        _ => None,
    };
    found.unwrap_or(default)
}

/// Positional access. Out of range is an IndexError unless a default is
/// supplied.
pub fn nth(coll: &Value, index: &Value, default: Option<Value>) -> Result<Value> {
    let i = expect_index(index)?;
    let found = match coll {
        Value::Nil => None,
        Value::Vector(vec) => usize::try_from(i).ok().and_then(|p| vec.get(p)).cloned(),
        Value::String(s) => usize::try_from(i)
            .ok()
            .and_then(|p| s.chars().nth(p))
            .map(Value::Char),
        Value::List(_) | Value::Seq(_) | Value::Map(_) | Value::Set(_) => match usize::try_from(i) {
            Ok(p) => {
                let mut current = coll.clone();
                let mut found = None;
                let mut position = 0;
                while let Some((head, tail)) = uncons(&current)? {
                    if position == p {
                        found = Some(head);
                        break;
                    }
                    position += 1;
                    current = tail;
                }
                found
            }
            Err(_) => None,
        },
        other => {
            return Err(Error::type_error(format!(
                "nth not supported on {}",
                other.kind()
            )));
        }
    };
    match (found, default) {
        (Some(v), _) => Ok(v),
        (None, Some(d)) => Ok(d),
        (None, None) => Err(Error::index(i, count(coll)?)),
    }
}

/// Key membership. For vectors the key is an index.
pub fn contains(coll: &Value, key: &Value) -> Result<bool> {
    Ok(match coll {
        Value::Nil => false,
        Value::Map(map) => map.contains_key(key),
        Value::Set(set) => set.contains(key),
        Value::Vector(vec) => match key {
            Value::Number(NumericType::Int(i)) => {
                usize::try_from(*i).is_ok_and(|i| i < vec.len())
            }
            _ => false,
        },
        other => {
            return Err(Error::type_error(format!(
                "contains? not supported on {}",
                other.kind()
            )));
        }
    })
}

pub fn peek(coll: &Value) -> Result<Value> {
    match coll {
        Value::Nil => Ok(Value::Nil),
        Value::List(list) => Ok(list.first().cloned().unwrap_or(Value::Nil)),
        Value::Vector(vec) => Ok(vec.peek().cloned().unwrap_or(Value::Nil)),
        other => Err(Error::type_error(format!(
            "peek not supported on {}",
            other.kind()
        ))),
    }
}

pub fn pop(coll: &Value) -> Result<Value> {
    match coll {
        Value::Nil => Ok(Value::Nil),
        Value::List(list) if list.is_empty() => Err(Error::type_error("Can't pop empty list")),
        Value::List(list) => Ok(Value::List(list.rest())),
        Value::Vector(vec) => vec
            .pop()
            .map(Value::Vector)
            .ok_or_else(|| Error::type_error("Can't pop empty vector")),
        other => Err(Error::type_error(format!(
            "pop not supported on {}",
            other.kind()
        ))),
    }
}

/// The `[key value]` entry for `key`, or `nil`
pub fn find(coll: &Value, key: &Value) -> Result<Value> {
    let entry = |k: &Value, v: &Value| Value::vector(vec![k.clone(), v.clone()]);
    Ok(match coll {
        Value::Nil => Value::Nil,
        Value::Map(map) => map
            .entry(key)
            .map(|(k, v)| entry(k, v))
            .unwrap_or(Value::Nil),
        Value::Vector(vec) => match key {
            Value::Number(NumericType::Int(i)) => usize::try_from(*i)
                .ok()
                .and_then(|p| vec.get(p))
                .map(|v| entry(key, v))
                .unwrap_or(Value::Nil),
            _ => Value::Nil,
        },
        other => {
            return Err(Error::type_error(format!(
                "find not supported on {}",
                other.kind()
            )));
        }
    })
}

fn map_view(coll: &Value, view: MapView, what: &str) -> Result<Value> {
    match coll {
        Value::Nil => Ok(Value::Nil),
        Value::Map(map) if map.is_empty() => Ok(Value::Nil),
        Value::Map(map) => Ok(Value::Seq(Seq::Map {
            map: map.clone(),
            index: 0,
            view,
        })),
        other => Err(Error::type_error(format!(
            "{what} not supported on {}",
            other.kind()
        ))),
    }
}

pub fn keys(coll: &Value) -> Result<Value> {
    map_view(coll, MapView::Keys, "keys")
}

pub fn vals(coll: &Value) -> Result<Value> {
    map_view(coll, MapView::Vals, "vals")
}

/// Sub-vector `[start, end)`; `end` defaults to the length
pub fn subvec(coll: &Value, start: i64, end: Option<i64>) -> Result<Value> {
    match coll {
        Value::Vector(vec) => {
            let end = end.unwrap_or(vec.len() as i64);
            let bounds = usize::try_from(start).ok().zip(usize::try_from(end).ok());
            bounds
                .and_then(|(s, e)| vec.subvec(s, e))
                .map(Value::Vector)
                .ok_or_else(|| Error::index(if start < 0 { start } else { end }, vec.len()))
        }
        other => Err(Error::type_error(format!(
            "subvec not supported on {}",
            other.kind()
        ))),
    }
}

/// Reverse view of a vector, `nil` when empty
pub fn rseq(coll: &Value) -> Result<Value> {
    match coll {
        Value::Vector(vec) if vec.is_empty() => Ok(Value::Nil),
        Value::Vector(vec) => {
            let items: Vec<Value> = vec.iter().rev().cloned().collect();
            Ok(Value::Seq(Seq::from_vec(items)))
        }
        other => Err(Error::type_error(format!(
            "rseq not supported on {}",
            other.kind()
        ))),
    }
}

/// Collect a seqable into a vector of its elements
pub fn to_vec(value: &Value) -> Result<Vec<Value>> {
    match value {
        Value::List(list) => Ok(list.iter().cloned().collect()),
        Value::Vector(vec) => Ok(vec.iter().cloned().collect()),
        _ => SeqIter::new(value.clone()).collect(),
    }
}

pub fn vec(value: &Value) -> Result<Value> {
    match value {
        Value::Vector(vec) => Ok(Value::Vector(PersistentVector::from_vec(
            vec.iter().cloned().collect(),
        ))),
        other => Ok(Value::Vector(PersistentVector::from_vec(to_vec(other)?))),
    }
}

pub fn set(value: &Value) -> Result<Value> {
    Ok(Value::Set(to_vec(value)?.into_iter().collect::<PersistentSet>()))
}

/// Build a map from alternating keys and values
pub fn hash_map(items: &[Value]) -> Result<Value> {
    if items.len() % 2 != 0 {
        return Err(Error::type_error(
            "hash-map requires an even number of arguments",
        ));
    }
    let pairs = items
        .chunks(2)
        .map(|pair| (pair[0].clone(), pair[1].clone()));
    Ok(Value::Map(ArrayMap::from_pairs(pairs)))
}

/// Iterator over the elements of any seqable, forcing lazy parts as it goes
pub struct SeqIter {
    current: Value,
}

impl SeqIter {
    pub fn new(value: Value) -> Self {
        SeqIter { current: value }
    }
}

impl Iterator for SeqIter {
    type Item = Result<Value>;

    fn next(&mut self) -> Option<Self::Item> {
        match uncons(&self.current) {
            Ok(Some((head, tail))) => {
                self.current = tail;
                Some(Ok(head))
            }
            Ok(None) => None,
            Err(e) => {
                self.current = Value::Nil;
                Some(Err(e))
            }
        }
    }
}

/// Name component of a symbol, keyword or string
pub fn name(value: &Value) -> Result<Value> {
    match value {
        Value::String(_) => Ok(value.clone()),
        Value::Symbol(s) => Ok(Value::String(Rc::from(s.name.resolve()))),
        Value::Keyword(k) => Ok(Value::String(Rc::from(k.name.resolve()))),
        other => Err(Error::type_error(format!(
            "name not supported on {}",
            other.kind()
        ))),
    }
}

/// Namespace component of a symbol or keyword, `nil` if unqualified
pub fn namespace(value: &Value) -> Result<Value> {
    let ns = match value {
        Value::Symbol(s) => s.ns,
        Value::Keyword(k) => k.ns,
        other => {
            return Err(Error::type_error(format!(
                "namespace not supported on {}",
                other.kind()
            )));
        }
    };
    Ok(ns
        .map(|n| Value::String(Rc::from(n.resolve())))
        .unwrap_or(Value::Nil))
}
