//! The object model: the closed set of runtime values.
//!
//! Every datum the engine manipulates is a [`Value`]. Each value has exactly
//! one [`Kind`], and the operations a kind supports are exposed through
//! [`Value::has`] rather than open-ended type inspection. This module also
//! owns the kind-specific equality and ordering rules and the canonical
//! printer.

use std::cmp::Ordering;
use std::fmt;
use std::fmt::Write as _;
use std::rc::Rc;

use crate::abstractions::uncons;
use crate::analyzer::FnExpr;
use crate::collections::{ArrayMap, Delay, List, PersistentSet, PersistentVector, Seq};
use crate::environment::Env;
use crate::error::{Error, Result};
use crate::interner::InternedSymbol;
use crate::namespace::{Namespace, Var};
use crate::numeric::{NumericType, Ops};
use crate::runtime::Runtime;

/// Optional metadata map carried by collections, symbols and functions
pub type Meta = Option<Rc<ArrayMap>>;

// ============================================================================
// Symbols and Keywords
// ============================================================================

/// Split `ns/name` text. A lone `/` and names ending in `/` are unqualified.
fn split_qualified(text: &str) -> (Option<&str>, &str) {
    if text.len() > 1 {
        if let Some(i) = text.find('/') {
            if i > 0 && i + 1 < text.len() {
                return (Some(&text[..i]), &text[i + 1..]);
            }
        }
    }
    (None, text)
}

fn compare_names(
    a: (Option<InternedSymbol>, InternedSymbol),
    b: (Option<InternedSymbol>, InternedSymbol),
) -> Ordering {
    let ns = match (a.0, b.0) {
        (None, None) => Ordering::Equal,
        (None, Some(_)) => Ordering::Less,
        (Some(_), None) => Ordering::Greater,
        (Some(x), Some(y)) => x.cmp_text(&y),
    };
    ns.then_with(|| a.1.cmp_text(&b.1))
}

/// A possibly namespace-qualified symbol. Metadata does not take part in
/// equality.
#[derive(Clone)]
pub struct Symbol {
    pub ns: Option<InternedSymbol>,
    pub name: InternedSymbol,
    pub meta: Meta,
}

impl Symbol {
    /// Parse `ns/name` or `name`
    pub fn new(text: &str) -> Symbol {
        match split_qualified(text) {
            (Some(ns), name) => Symbol::qualified(ns, name),
            (None, name) => Symbol::simple(name),
        }
    }

    pub fn simple(name: &str) -> Symbol {
        Symbol {
            ns: None,
            name: InternedSymbol::new(name),
            meta: None,
        }
    }

    pub fn qualified(ns: &str, name: &str) -> Symbol {
        Symbol {
            ns: Some(InternedSymbol::new(ns)),
            name: InternedSymbol::new(name),
            meta: None,
        }
    }

    pub fn from_parts(ns: Option<InternedSymbol>, name: InternedSymbol) -> Symbol {
        Symbol {
            ns,
            name,
            meta: None,
        }
    }

    pub fn is_simple(&self) -> bool {
        self.ns.is_none()
    }

    pub fn with_meta(&self, meta: Meta) -> Symbol {
        Symbol {
            ns: self.ns,
            name: self.name,
            meta,
        }
    }

    /// True for an unqualified symbol with exactly this name
    pub fn is(&self, name: &str) -> bool {
        self.ns.is_none() && self.name.with_str(|s| s == name)
    }
}

impl PartialEq for Symbol {
    fn eq(&self, other: &Self) -> bool {
        self.ns == other.ns && self.name == other.name
    }
}

impl Eq for Symbol {}

impl std::hash::Hash for Symbol {
    fn hash<H: std::hash::Hasher>(&self, state: &mut H) {
        self.ns.hash(state);
        self.name.hash(state);
    }
}

impl fmt::Display for Symbol {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.ns {
            Some(ns) => write!(f, "{ns}/{}", self.name),
            None => write!(f, "{}", self.name),
        }
    }
}

impl fmt::Debug for Symbol {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{self}")
    }
}

#[derive(Clone, Copy, PartialEq, Eq, Hash)]
pub struct Keyword {
    pub ns: Option<InternedSymbol>,
    pub name: InternedSymbol,
}

impl Keyword {
    /// Parse `ns/name` or `name` (without the leading colon)
    pub fn new(text: &str) -> Keyword {
        let (ns, name) = split_qualified(text);
        Keyword {
            ns: ns.map(InternedSymbol::new),
            name: InternedSymbol::new(name),
        }
    }
}

impl fmt::Display for Keyword {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.ns {
            Some(ns) => write!(f, ":{ns}/{}", self.name),
            None => write!(f, ":{}", self.name),
        }
    }
}

impl fmt::Debug for Keyword {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{self}")
    }
}

// ============================================================================
// Callables
// ============================================================================

/// A closure: analyzed arities plus the frame it was created in
pub struct Function {
    pub expr: Rc<FnExpr>,
    pub env: Env,
    pub meta: Meta,
}

impl Function {
    pub fn name(&self) -> String {
        match &self.expr.name {
            Some(name) => name.to_string(),
            None => "fn".to_string(),
        }
    }
}

/// Signature shared by every native procedure
pub type NativeFn = fn(&Runtime, &[Value]) -> Result<Value>;

/// A procedure implemented in Rust. Arity is checked before `func` runs.
pub struct NativeProc {
    pub name: &'static str,
    pub min_arity: usize,
    /// `None` for variadic procedures
    pub max_arity: Option<usize>,
    pub func: NativeFn,
}

impl NativeProc {
    pub fn accepts(&self, argc: usize) -> bool {
        argc >= self.min_arity && self.max_arity.is_none_or(|max| argc <= max)
    }
}

// ============================================================================
// Core Type System
// ============================================================================

#[derive(Clone)]
pub enum Value {
    Nil,
    Bool(bool),
    Number(NumericType),
    Char(char),
    String(Rc<str>),
    Symbol(Symbol),
    Keyword(Keyword),
    List(List),
    Vector(PersistentVector),
    Map(ArrayMap),
    Set(PersistentSet),
    Seq(Seq),
    Delay(Rc<Delay>),
    Fn(Rc<Function>),
    Native(&'static NativeProc),
    Var(Rc<Var>),
    Namespace(Rc<Namespace>),
    Error(Rc<Error>),
}

/// The runtime kind of a value
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Kind {
    Nil,
    Bool,
    Int,
    BigInt,
    Ratio,
    BigFloat,
    Double,
    Char,
    String,
    Symbol,
    Keyword,
    List,
    Vector,
    ArrayMap,
    MapSet,
    Seq,
    LazySeq,
    Delay,
    Fn,
    Proc,
    Var,
    Namespace,
    Error,
}

impl Kind {
    pub fn name(&self) -> &'static str {
        match self {
            Kind::Nil => "Nil",
            Kind::Bool => "Bool",
            Kind::Int => "Int",
            Kind::BigInt => "BigInt",
            Kind::Ratio => "Ratio",
            Kind::BigFloat => "BigFloat",
            Kind::Double => "Double",
            Kind::Char => "Char",
            Kind::String => "String",
            Kind::Symbol => "Symbol",
            Kind::Keyword => "Keyword",
            Kind::List => "List",
            Kind::Vector => "Vector",
            Kind::ArrayMap => "ArrayMap",
            Kind::MapSet => "MapSet",
            Kind::Seq => "Seq",
            Kind::LazySeq => "LazySeq",
            Kind::Delay => "Delay",
            Kind::Fn => "Fn",
            Kind::Proc => "Proc",
            Kind::Var => "Var",
            Kind::Namespace => "Namespace",
            Kind::Error => "Error",
        }
    }
}

impl fmt::Display for Kind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Behaviours a kind may support
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Capability {
    Equality,
    Ordering,
    Named,
    Seqable,
    Associative,
    Stack,
    /// Count is available in constant time
    Countable,
    Indexed,
    Meta,
    Callable,
}

impl Value {
    pub fn int(n: i64) -> Value {
        Value::Number(NumericType::Int(n))
    }

    pub fn float(x: f64) -> Value {
        Value::Number(NumericType::Float(x))
    }

    pub fn string(s: &str) -> Value {
        Value::String(Rc::from(s))
    }

    pub fn symbol(text: &str) -> Value {
        Value::Symbol(Symbol::new(text))
    }

    pub fn keyword(text: &str) -> Value {
        Value::Keyword(Keyword::new(text))
    }

    pub fn list(items: Vec<Value>) -> Value {
        Value::List(List::from_vec(items))
    }

    pub fn vector(items: Vec<Value>) -> Value {
        Value::Vector(PersistentVector::from_vec(items))
    }

    pub fn error(err: Error) -> Value {
        Value::Error(Rc::new(err))
    }

    pub fn kind(&self) -> Kind {
        match self {
            Value::Nil => Kind::Nil,
            Value::Bool(_) => Kind::Bool,
            Value::Number(n) => match n {
                NumericType::Int(_) => Kind::Int,
                NumericType::BigInt(_) => Kind::BigInt,
                NumericType::Ratio(_) => Kind::Ratio,
                NumericType::BigFloat(_) => Kind::BigFloat,
                NumericType::Float(_) => Kind::Double,
            },
            Value::Char(_) => Kind::Char,
            Value::String(_) => Kind::String,
            Value::Symbol(_) => Kind::Symbol,
            Value::Keyword(_) => Kind::Keyword,
            Value::List(_) => Kind::List,
            Value::Vector(_) => Kind::Vector,
            Value::Map(_) => Kind::ArrayMap,
            Value::Set(_) => Kind::MapSet,
            Value::Seq(Seq::Lazy(_)) => Kind::LazySeq,
            Value::Seq(_) => Kind::Seq,
            Value::Delay(_) => Kind::Delay,
            Value::Fn(_) => Kind::Fn,
            Value::Native(_) => Kind::Proc,
            Value::Var(_) => Kind::Var,
            Value::Namespace(_) => Kind::Namespace,
            Value::Error(_) => Kind::Error,
        }
    }

    pub fn has(&self, capability: Capability) -> bool {
        match capability {
            Capability::Equality => true,
            Capability::Ordering => matches!(
                self,
                Value::Nil
                    | Value::Bool(_)
                    | Value::Number(_)
                    | Value::Char(_)
                    | Value::String(_)
                    | Value::Symbol(_)
                    | Value::Keyword(_)
                    | Value::Vector(_)
            ),
            Capability::Named => matches!(
                self,
                Value::Symbol(_) | Value::Keyword(_) | Value::String(_)
            ),
            Capability::Seqable => matches!(
                self,
                Value::Nil
                    | Value::String(_)
                    | Value::List(_)
                    | Value::Vector(_)
                    | Value::Map(_)
                    | Value::Set(_)
                    | Value::Seq(_)
            ),
            Capability::Associative => matches!(self, Value::Map(_) | Value::Vector(_)),
            Capability::Stack => matches!(self, Value::List(_) | Value::Vector(_)),
            Capability::Countable => match self {
                Value::Nil
                | Value::String(_)
                | Value::List(_)
                | Value::Vector(_)
                | Value::Map(_)
                | Value::Set(_) => true,
                Value::Seq(seq) => seq.counted_len().is_some(),
                _ => false,
            },
            Capability::Indexed => matches!(self, Value::Vector(_) | Value::String(_)),
            Capability::Meta => matches!(
                self,
                Value::List(_)
                    | Value::Vector(_)
                    | Value::Map(_)
                    | Value::Set(_)
                    | Value::Symbol(_)
                    | Value::Fn(_)
            ),
            Capability::Callable => matches!(
                self,
                Value::Fn(_)
                    | Value::Native(_)
                    | Value::Keyword(_)
                    | Value::Map(_)
                    | Value::Set(_)
                    | Value::Vector(_)
                    | Value::Var(_)
            ),
        }
    }

    /// Everything except `nil` and `false` is true
    pub fn is_truthy(&self) -> bool {
        !matches!(self, Value::Nil | Value::Bool(false))
    }

    pub fn meta(&self) -> Meta {
        match self {
            Value::List(l) => l.meta().clone(),
            Value::Vector(v) => v.meta().clone(),
            Value::Map(m) => m.meta().clone(),
            Value::Set(s) => s.meta().clone(),
            Value::Symbol(s) => s.meta.clone(),
            Value::Fn(f) => f.meta.clone(),
            Value::Var(v) => Some(Rc::new(v.meta())),
            _ => None,
        }
    }

    pub fn with_meta(&self, meta: Meta) -> Result<Value> {
        Ok(match self {
            Value::List(l) => Value::List(l.with_meta(meta)),
            Value::Vector(v) => Value::Vector(v.with_meta(meta)),
            Value::Map(m) => Value::Map(m.with_meta(meta)),
            Value::Set(s) => Value::Set(s.with_meta(meta)),
            Value::Symbol(s) => Value::Symbol(s.with_meta(meta)),
            Value::Fn(f) => Value::Fn(Rc::new(Function {
                expr: f.expr.clone(),
                env: f.env,
                meta,
            })),
            other => {
                return Err(Error::type_error(format!(
                    "{} does not support metadata",
                    other.kind()
                )));
            }
        })
    }
}

impl From<bool> for Value {
    fn from(b: bool) -> Self {
        Value::Bool(b)
    }
}

impl From<NumericType> for Value {
    fn from(n: NumericType) -> Self {
        Value::Number(n)
    }
}

// ============================================================================
// Equality and Ordering
// ============================================================================

fn sequential_equals(a: &Value, b: &Value) -> Result<bool> {
    if let (Value::List(x), Value::List(y)) = (a, b) {
        if x.ptr_eq(y) {
            return Ok(true);
        }
        if x.len() != y.len() {
            return Ok(false);
        }
    }
    let (mut x, mut y) = (a.clone(), b.clone());
    loop {
        match (uncons(&x)?, uncons(&y)?) {
            (None, None) => return Ok(true),
            (Some((fx, rx)), Some((fy, ry))) => {
                if !equals(&fx, &fy)? {
                    return Ok(false);
                }
                x = rx;
                y = ry;
            }
            _ => return Ok(false),
        }
    }
}

/// Kind-aware equality. Numbers compare by value across kinds, lists and
/// seqs compare with each other element-wise, vectors only with vectors,
/// maps and sets ignore insertion order, and reference kinds compare by
/// identity. Fails only if realizing a lazy sequence fails.
pub fn equals(a: &Value, b: &Value) -> Result<bool> {
    Ok(match (a, b) {
        (Value::Nil, Value::Nil) => true,
        (Value::Bool(x), Value::Bool(y)) => x == y,
        (Value::Number(x), Value::Number(y)) => x == y,
        (Value::Char(x), Value::Char(y)) => x == y,
        (Value::String(x), Value::String(y)) => x == y,
        (Value::Symbol(x), Value::Symbol(y)) => x == y,
        (Value::Keyword(x), Value::Keyword(y)) => x == y,
        (Value::Vector(x), Value::Vector(y)) => {
            if x.len() != y.len() {
                return Ok(false);
            }
            for (p, q) in x.iter().zip(y.iter()) {
                if !equals(p, q)? {
                    return Ok(false);
                }
            }
            true
        }
        (Value::List(_) | Value::Seq(_), Value::List(_) | Value::Seq(_)) => {
            sequential_equals(a, b)?
        }
        (Value::Map(x), Value::Map(y)) => {
            if x.len() != y.len() {
                return Ok(false);
            }
            for (k, v) in x.iter() {
                match y.get(k) {
                    Some(w) if equals(v, w)? => {}
                    _ => return Ok(false),
                }
            }
            true
        }
        (Value::Set(x), Value::Set(y)) => x.len() == y.len() && x.iter().all(|v| y.contains(v)),
        (Value::Delay(x), Value::Delay(y)) => Rc::ptr_eq(x, y),
        (Value::Fn(x), Value::Fn(y)) => Rc::ptr_eq(x, y),
        (Value::Native(x), Value::Native(y)) => std::ptr::eq(*x, *y),
        (Value::Var(x), Value::Var(y)) => Rc::ptr_eq(x, y),
        (Value::Namespace(x), Value::Namespace(y)) => Rc::ptr_eq(x, y),
        (Value::Error(x), Value::Error(y)) => Rc::ptr_eq(x, y),
        _ => false,
    })
}

impl PartialEq for Value {
    fn eq(&self, other: &Self) -> bool {
        equals(self, other).unwrap_or(false)
    }
}

/// Ordering used by `compare` and `sort`. `nil` sorts before everything;
/// values of unrelated kinds are not comparable.
pub fn compare(a: &Value, b: &Value) -> Result<Ordering> {
    if equals(a, b)? {
        return Ok(Ordering::Equal);
    }
    match (a, b) {
        (Value::Nil, _) => Ok(Ordering::Less),
        (_, Value::Nil) => Ok(Ordering::Greater),
        (Value::Number(x), Value::Number(y)) => Ok(Ops::resolve(x, y).compare(x, y)),
        (Value::String(x), Value::String(y)) => Ok(x.cmp(y)),
        (Value::Char(x), Value::Char(y)) => Ok(x.cmp(y)),
        (Value::Bool(x), Value::Bool(y)) => Ok(x.cmp(y)),
        (Value::Symbol(x), Value::Symbol(y)) => {
            Ok(compare_names((x.ns, x.name), (y.ns, y.name)))
        }
        (Value::Keyword(x), Value::Keyword(y)) => {
            Ok(compare_names((x.ns, x.name), (y.ns, y.name)))
        }
        (Value::Vector(x), Value::Vector(y)) => {
            if x.len() != y.len() {
                return Ok(x.len().cmp(&y.len()));
            }
            for (p, q) in x.iter().zip(y.iter()) {
                let ord = compare(p, q)?;
                if ord != Ordering::Equal {
                    return Ok(ord);
                }
            }
            Ok(Ordering::Equal)
        }
        _ => Err(Error::type_error(format!(
            "{} (type: {}) is not comparable with {}",
            a,
            a.kind(),
            b.kind()
        ))),
    }
}

// ============================================================================
// Printing
// ============================================================================

/// Render a value. `escape = true` produces text the reader accepts again;
/// `escape = false` is for human display (strings and chars unquoted).
/// Fails if realizing a lazy sequence fails.
pub fn print_value(value: &Value, escape: bool) -> Result<String> {
    let mut out = String::new();
    Printer {
        escape,
        force: true,
    }
    .write(&mut out, value)?;
    Ok(out)
}

fn char_name(c: char) -> Option<&'static str> {
    match c {
        '\n' => Some("newline"),
        ' ' => Some("space"),
        '\t' => Some("tab"),
        '\r' => Some("return"),
        '\u{8}' => Some("backspace"),
        '\u{c}' => Some("formfeed"),
        _ => None,
    }
}

struct Printer {
    escape: bool,
    /// Realize lazy sequences while printing
    force: bool,
}

impl Printer {
    fn write(&self, out: &mut String, value: &Value) -> Result<()> {
        match value {
            Value::Nil => out.push_str("nil"),
            Value::Bool(b) => out.push_str(if *b { "true" } else { "false" }),
            Value::Number(n) => {
                let _ = write!(out, "{n}");
            }
            Value::Char(c) => {
                if self.escape {
                    out.push('\\');
                    match char_name(*c) {
                        Some(name) => out.push_str(name),
                        None => out.push(*c),
                    }
                } else {
                    out.push(*c);
                }
            }
            Value::String(s) => {
                if self.escape {
                    write_escaped(out, s);
                } else {
                    out.push_str(s);
                }
            }
            Value::Symbol(s) => {
                let _ = write!(out, "{s}");
            }
            Value::Keyword(k) => {
                let _ = write!(out, "{k}");
            }
            Value::List(list) => self.write_items(out, "(", ")", list.iter())?,
            Value::Vector(vec) => self.write_items(out, "[", "]", vec.iter())?,
            Value::Set(set) => self.write_items(out, "#{", "}", set.iter())?,
            Value::Map(map) => {
                out.push('{');
                for (i, (k, v)) in map.iter().enumerate() {
                    if i > 0 {
                        out.push_str(", ");
                    }
                    self.write(out, k)?;
                    out.push(' ');
                    self.write(out, v)?;
                }
                out.push('}');
            }
            Value::Seq(seq) => self.write_seq(out, seq)?,
            Value::Delay(_) => out.push_str("#<delay>"),
            Value::Fn(f) => {
                let _ = write!(out, "#<fn {}>", f.name());
            }
            Value::Native(p) => {
                let _ = write!(out, "#<proc {}>", p.name);
            }
            Value::Var(v) => {
                let _ = write!(out, "#'{}", v.qualified_name());
            }
            Value::Namespace(ns) => {
                let _ = write!(out, "#<namespace {}>", ns.name());
            }
            Value::Error(e) => {
                let _ = write!(out, "#<{}: {}>", e.kind(), e.message());
            }
        }
        Ok(())
    }

    fn write_items<'a, I>(&self, out: &mut String, open: &str, close: &str, items: I) -> Result<()>
    where
        I: Iterator<Item = &'a Value>,
    {
        out.push_str(open);
        for (i, item) in items.enumerate() {
            if i > 0 {
                out.push(' ');
            }
            self.write(out, item)?;
        }
        out.push_str(close);
        Ok(())
    }

    fn write_seq(&self, out: &mut String, seq: &Seq) -> Result<()> {
        out.push('(');
        let mut current = Value::Seq(seq.clone());
        let mut first = true;
        loop {
            if !self.force {
                if let Value::Seq(Seq::Lazy(lazy)) = &current {
                    if !lazy.is_realized() {
                        if !first {
                            out.push(' ');
                        }
                        out.push_str("...");
                        break;
                    }
                }
            }
            match uncons(&current)? {
                None => break,
                Some((head, tail)) => {
                    if !first {
                        out.push(' ');
                    }
                    first = false;
                    self.write(out, &head)?;
                    current = tail;
                }
            }
        }
        out.push(')');
        Ok(())
    }
}

fn write_escaped(out: &mut String, s: &str) {
    out.push('"');
    for c in s.chars() {
        match c {
            '"' => out.push_str("\\\""),
            '\\' => out.push_str("\\\\"),
            '\n' => out.push_str("\\n"),
            '\t' => out.push_str("\\t"),
            '\r' => out.push_str("\\r"),
            c if c.is_control() => {
                let _ = write!(out, "\\u{:04x}", c as u32);
            }
            c => out.push(c),
        }
    }
    out.push('"');
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match print_value(self, true) {
            Ok(s) => f.write_str(&s),
            Err(e) => write!(f, "#<unprintable: {e}>"),
        }
    }
}

/// Debug output never realizes lazy sequences; pending parts print as `...`
impl fmt::Debug for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut out = String::new();
        let printer = Printer {
            escape: true,
            force: false,
        };
        match printer.write(&mut out, self) {
            Ok(()) => f.write_str(&out),
            Err(e) => write!(f, "#<unprintable: {e}>"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_symbol_parsing() {
        let s = Symbol::new("kern.core/map");
        assert_eq!(s.ns.map(|n| n.resolve()), Some("kern.core".to_string()));
        assert_eq!(s.name.resolve(), "map");
        assert!(Symbol::new("/").is_simple());
        let div = Symbol::new("kern.core//");
        assert_eq!(div.name.resolve(), "/");
    }

    #[test]
    fn test_symbol_equality_ignores_meta() {
        let meta = Some(Rc::new(
            ArrayMap::new().assoc(Value::keyword("private"), Value::Bool(true)),
        ));
        let plain = Symbol::simple("x");
        assert_eq!(plain.with_meta(meta), plain);
    }

    #[test]
    fn test_cross_kind_numeric_equality() {
        assert_eq!(Value::int(1), Value::float(1.0));
        assert_ne!(Value::int(1), Value::string("1"));
    }

    #[test]
    fn test_sequential_equality_groups() {
        let list = Value::list(vec![Value::int(1), Value::int(2)]);
        let seq = Value::Seq(Seq::from_vec(vec![Value::int(1), Value::int(2)]));
        let vec = Value::vector(vec![Value::int(1), Value::int(2)]);
        assert_eq!(list, seq);
        assert_ne!(list, vec);
        assert_eq!(vec, Value::vector(vec![Value::int(1), Value::int(2)]));
    }

    #[test]
    fn test_map_equality_ignores_order() {
        let a = ArrayMap::new()
            .assoc(Value::keyword("a"), Value::int(1))
            .assoc(Value::keyword("b"), Value::int(2));
        let b = ArrayMap::new()
            .assoc(Value::keyword("b"), Value::int(2))
            .assoc(Value::keyword("a"), Value::int(1));
        assert_eq!(Value::Map(a), Value::Map(b));
    }

    #[test]
    fn test_compare_nil_lowest() {
        assert_eq!(compare(&Value::Nil, &Value::int(1)).unwrap(), Ordering::Less);
        assert_eq!(compare(&Value::int(1), &Value::Nil).unwrap(), Ordering::Greater);
        assert_eq!(
            compare(&Value::string("a"), &Value::string("b")).unwrap(),
            Ordering::Less
        );
        assert!(compare(&Value::int(1), &Value::string("a")).is_err());
    }

    #[test]
    fn test_compare_vectors_by_length_first() {
        let short = Value::vector(vec![Value::int(9)]);
        let long = Value::vector(vec![Value::int(1), Value::int(1)]);
        assert_eq!(compare(&short, &long).unwrap(), Ordering::Less);
    }

    #[test]
    fn test_printing() {
        let v = Value::vector(vec![
            Value::string("a\"b"),
            Value::Char('\n'),
            Value::keyword("k"),
            Value::Nil,
        ]);
        assert_eq!(print_value(&v, true).unwrap(), r#"["a\"b" \newline :k nil]"#);
        assert_eq!(print_value(&Value::string("hi"), false).unwrap(), "hi");
        assert_eq!(Value::list(vec![]).to_string(), "()");
    }

    #[test]
    fn test_capabilities() {
        let v = Value::vector(vec![]);
        assert_eq!(v.kind(), Kind::Vector);
        assert!(v.has(Capability::Associative));
        assert!(v.has(Capability::Callable));
        assert!(!Value::int(1).has(Capability::Seqable));
        assert!(Value::Nil.has(Capability::Seqable));
        assert!(!Value::Nil.is_truthy());
        assert!(Value::int(0).is_truthy());
    }
}
