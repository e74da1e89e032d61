//! Native procedures registered in `kern.core`.
//!
//! Names end in `*` (plus `ex-info`); the bootstrap library wraps them into
//! the public surface. Arity is declared in the table and checked by the
//! evaluator before a procedure runs.

use std::cmp::Ordering;
use std::rc::Rc;
use std::str::FromStr;

use num_bigint::BigInt as BigInteger;

use crate::abstractions as coll;
use crate::collections::{ArrayMap, Delay, LazySeq, List, PersistentSet, Seq};
use crate::error::{Error, Result};
use crate::interner::InternedSymbol;
use crate::language::{Keyword, NativeFn, NativeProc, Symbol, Value, compare, equals};
use crate::namespace::Namespace;
use crate::native::{
    extract_callable, extract_error, extract_int, extract_keyword, extract_namespace,
    extract_number, extract_string, extract_symbol, extract_var, join_printed, seq_to_vec,
    type_mismatch,
};
use crate::numeric::{self, NumericType, Ops};
use crate::reader::Reader;
use crate::runtime::Runtime;

const fn native(
    name: &'static str,
    min_arity: usize,
    max_arity: Option<usize>,
    func: NativeFn,
) -> NativeProc {
    NativeProc {
        name,
        min_arity,
        max_arity,
        func,
    }
}

// ============================================================================
// Identity, Equality and Types
// ============================================================================

fn type_of(_rt: &Runtime, args: &[Value]) -> Result<Value> {
    Ok(Value::symbol(args[0].kind().name()))
}

fn identical(a: &Value, b: &Value) -> bool {
    match (a, b) {
        (Value::Nil, Value::Nil) => true,
        (Value::Bool(x), Value::Bool(y)) => x == y,
        (Value::Number(NumericType::Int(x)), Value::Number(NumericType::Int(y))) => x == y,
        (Value::Char(x), Value::Char(y)) => x == y,
        (Value::Keyword(x), Value::Keyword(y)) => x == y,
        (Value::Symbol(x), Value::Symbol(y)) => x == y,
        (Value::String(x), Value::String(y)) => Rc::ptr_eq(x, y),
        (Value::List(x), Value::List(y)) => x.ptr_eq(y),
        (Value::Delay(x), Value::Delay(y)) => Rc::ptr_eq(x, y),
        (Value::Fn(x), Value::Fn(y)) => Rc::ptr_eq(x, y),
        (Value::Native(x), Value::Native(y)) => std::ptr::eq(*x, *y),
        (Value::Var(x), Value::Var(y)) => Rc::ptr_eq(x, y),
        (Value::Namespace(x), Value::Namespace(y)) => Rc::ptr_eq(x, y),
        (Value::Error(x), Value::Error(y)) => Rc::ptr_eq(x, y),
        _ => false,
    }
}

fn identical_p(_rt: &Runtime, args: &[Value]) -> Result<Value> {
    Ok(Value::Bool(identical(&args[0], &args[1])))
}

fn equal_p(_rt: &Runtime, args: &[Value]) -> Result<Value> {
    for pair in args.windows(2) {
        if !equals(&pair[0], &pair[1])? {
            return Ok(Value::Bool(false));
        }
    }
    Ok(Value::Bool(true))
}

fn ordering_value(ordering: Ordering) -> Value {
    Value::int(match ordering {
        Ordering::Less => -1,
        Ordering::Equal => 0,
        Ordering::Greater => 1,
    })
}

fn compare_fn(_rt: &Runtime, args: &[Value]) -> Result<Value> {
    Ok(ordering_value(compare(&args[0], &args[1])?))
}

// ============================================================================
// Arithmetic
// ============================================================================

/// Left fold over numeric arguments
fn fold_numbers(
    who: &str,
    args: &[Value],
    step: impl Fn(&NumericType, &NumericType) -> Result<NumericType>,
) -> Result<Value> {
    let mut acc = extract_number(who, &args[0])?.clone();
    for arg in &args[1..] {
        acc = step(&acc, extract_number(who, arg)?)?;
    }
    Ok(Value::Number(acc))
}

fn add(_rt: &Runtime, args: &[Value]) -> Result<Value> {
    if args.is_empty() {
        return Ok(Value::int(0));
    }
    fold_numbers("add*", args, |a, b| Ok(Ops::resolve(a, b).add(a, b)))
}

fn add_extended(_rt: &Runtime, args: &[Value]) -> Result<Value> {
    if args.is_empty() {
        return Ok(Value::int(0));
    }
    fold_numbers("add'*", args, |a, b| {
        Ok(Ops::resolve_extended(a, b).add(a, b))
    })
}

fn subtract(_rt: &Runtime, args: &[Value]) -> Result<Value> {
    if let [x] = args {
        let x = extract_number("subtract*", x)?;
        let zero = NumericType::Int(0);
        return Ok(Value::Number(Ops::resolve(&zero, x).subtract(&zero, x)));
    }
    fold_numbers("subtract*", args, |a, b| {
        Ok(Ops::resolve(a, b).subtract(a, b))
    })
}

fn subtract_extended(_rt: &Runtime, args: &[Value]) -> Result<Value> {
    if let [x] = args {
        let x = extract_number("subtract'*", x)?;
        let zero = NumericType::Int(0);
        return Ok(Value::Number(
            Ops::resolve_extended(&zero, x).subtract(&zero, x),
        ));
    }
    fold_numbers("subtract'*", args, |a, b| {
        Ok(Ops::resolve_extended(a, b).subtract(a, b))
    })
}

fn multiply(_rt: &Runtime, args: &[Value]) -> Result<Value> {
    if args.is_empty() {
        return Ok(Value::int(1));
    }
    fold_numbers("multiply*", args, |a, b| {
        Ok(Ops::resolve(a, b).multiply(a, b))
    })
}

fn multiply_extended(_rt: &Runtime, args: &[Value]) -> Result<Value> {
    if args.is_empty() {
        return Ok(Value::int(1));
    }
    fold_numbers("multiply'*", args, |a, b| {
        Ok(Ops::resolve_extended(a, b).multiply(a, b))
    })
}

fn divide(_rt: &Runtime, args: &[Value]) -> Result<Value> {
    if let [x] = args {
        let x = extract_number("divide*", x)?;
        let one = NumericType::Int(1);
        return Ok(Value::Number(Ops::resolve(&one, x).divide(&one, x)?));
    }
    fold_numbers("divide*", args, |a, b| Ops::resolve(a, b).divide(a, b))
}

fn quot(_rt: &Runtime, args: &[Value]) -> Result<Value> {
    let a = extract_number("quot*", &args[0])?;
    let b = extract_number("quot*", &args[1])?;
    Ok(Value::Number(Ops::resolve(a, b).quotient(a, b)?))
}

fn rem(_rt: &Runtime, args: &[Value]) -> Result<Value> {
    let a = extract_number("rem*", &args[0])?;
    let b = extract_number("rem*", &args[1])?;
    Ok(Value::Number(Ops::resolve(a, b).remainder(a, b)?))
}

/// True when `test` holds for every adjacent pair
fn chain(
    who: &str,
    args: &[Value],
    test: fn(Ops, &NumericType, &NumericType) -> bool,
) -> Result<Value> {
    for arg in args {
        extract_number(who, arg)?;
    }
    for pair in args.windows(2) {
        let a = extract_number(who, &pair[0])?;
        let b = extract_number(who, &pair[1])?;
        if !test(Ops::resolve(a, b), a, b) {
            return Ok(Value::Bool(false));
        }
    }
    Ok(Value::Bool(true))
}

fn lt(_rt: &Runtime, args: &[Value]) -> Result<Value> {
    chain("lt*", args, Ops::lt)
}

fn lte(_rt: &Runtime, args: &[Value]) -> Result<Value> {
    chain("lte*", args, Ops::lte)
}

fn gt(_rt: &Runtime, args: &[Value]) -> Result<Value> {
    chain("gt*", args, Ops::gt)
}

fn gte(_rt: &Runtime, args: &[Value]) -> Result<Value> {
    chain("gte*", args, Ops::gte)
}

fn num_eq(_rt: &Runtime, args: &[Value]) -> Result<Value> {
    chain("num-eq*", args, Ops::eq)
}

fn max(_rt: &Runtime, args: &[Value]) -> Result<Value> {
    fold_numbers("max*", args, |a, b| Ok(numeric::max(a, b)))
}

fn min(_rt: &Runtime, args: &[Value]) -> Result<Value> {
    fold_numbers("min*", args, |a, b| Ok(numeric::min(a, b)))
}

fn zero_p(_rt: &Runtime, args: &[Value]) -> Result<Value> {
    Ok(Value::Bool(extract_number("zero?*", &args[0])?.is_zero()))
}

fn pos_p(_rt: &Runtime, args: &[Value]) -> Result<Value> {
    Ok(Value::Bool(extract_number("pos?*", &args[0])?.is_pos()))
}

fn neg_p(_rt: &Runtime, args: &[Value]) -> Result<Value> {
    Ok(Value::Bool(extract_number("neg?*", &args[0])?.is_neg()))
}

// ============================================================================
// Bit Operations
// ============================================================================

fn bit_fold(who: &str, args: &[Value], op: fn(i64, i64) -> i64) -> Result<Value> {
    let mut acc = extract_int(who, &args[0])?;
    for arg in &args[1..] {
        acc = op(acc, extract_int(who, arg)?);
    }
    Ok(Value::int(acc))
}

/// Apply `op` to an Int and a bit index in `0..64`
fn bit_index(who: &str, args: &[Value], op: fn(i64, u32) -> Value) -> Result<Value> {
    let x = extract_int(who, &args[0])?;
    let n = extract_int(who, &args[1])?;
    Ok(op(x, (n & 63) as u32))
}

fn bit_and(_rt: &Runtime, args: &[Value]) -> Result<Value> {
    bit_fold("bit-and*", args, |a, b| a & b)
}

fn bit_or(_rt: &Runtime, args: &[Value]) -> Result<Value> {
    bit_fold("bit-or*", args, |a, b| a | b)
}

fn bit_xor(_rt: &Runtime, args: &[Value]) -> Result<Value> {
    bit_fold("bit-xor*", args, |a, b| a ^ b)
}

fn bit_and_not(_rt: &Runtime, args: &[Value]) -> Result<Value> {
    bit_fold("bit-and-not*", args, |a, b| a & !b)
}

fn bit_not(_rt: &Runtime, args: &[Value]) -> Result<Value> {
    Ok(Value::int(!extract_int("bit-not*", &args[0])?))
}

fn bit_clear(_rt: &Runtime, args: &[Value]) -> Result<Value> {
    bit_index("bit-clear*", args, |x, n| Value::int(x & !(1i64 << n)))
}

fn bit_set(_rt: &Runtime, args: &[Value]) -> Result<Value> {
    bit_index("bit-set*", args, |x, n| Value::int(x | (1i64 << n)))
}

fn bit_flip(_rt: &Runtime, args: &[Value]) -> Result<Value> {
    bit_index("bit-flip*", args, |x, n| Value::int(x ^ (1i64 << n)))
}

fn bit_test(_rt: &Runtime, args: &[Value]) -> Result<Value> {
    bit_index("bit-test*", args, |x, n| Value::Bool((x >> n) & 1 == 1))
}

fn bit_shift_left(_rt: &Runtime, args: &[Value]) -> Result<Value> {
    bit_index("bit-shift-left*", args, |x, n| Value::int(x << n))
}

fn bit_shift_right(_rt: &Runtime, args: &[Value]) -> Result<Value> {
    bit_index("bit-shift-right*", args, |x, n| Value::int(x >> n))
}

fn unsigned_bit_shift_right(_rt: &Runtime, args: &[Value]) -> Result<Value> {
    bit_index("unsigned-bit-shift-right*", args, |x, n| {
        Value::int(((x as u64) >> n) as i64)
    })
}

// ============================================================================
// Numeric Conversions
// ============================================================================

fn to_int(_rt: &Runtime, args: &[Value]) -> Result<Value> {
    match &args[0] {
        Value::Number(n) => Ok(Value::int(n.to_int())),
        Value::Char(c) => Ok(Value::int(*c as i64)),
        other => Err(type_mismatch("int*", "a number or Char", other)),
    }
}

fn to_double(_rt: &Runtime, args: &[Value]) -> Result<Value> {
    Ok(Value::float(extract_number("double*", &args[0])?.to_f64()))
}

fn to_bigint(_rt: &Runtime, args: &[Value]) -> Result<Value> {
    match &args[0] {
        Value::Number(n) => Ok(Value::Number(NumericType::bigint(n.to_bigint()))),
        Value::String(s) => BigInteger::from_str(s.trim())
            .map(|n| Value::Number(NumericType::bigint(n)))
            .map_err(|_| Error::type_error(format!("bigint*: invalid integer {s:?}"))),
        other => Err(type_mismatch("bigint*", "a number or String", other)),
    }
}

fn to_bigfloat(_rt: &Runtime, args: &[Value]) -> Result<Value> {
    match &args[0] {
        Value::Number(n) => Ok(Value::Number(NumericType::bigfloat(n.to_bigdecimal()))),
        Value::String(s) => NumericType::parse_bigfloat(s.trim())
            .map(Value::Number)
            .ok_or_else(|| Error::type_error(format!("bigfloat*: invalid decimal {s:?}"))),
        other => Err(type_mismatch("bigfloat*", "a number or String", other)),
    }
}

fn to_num(_rt: &Runtime, args: &[Value]) -> Result<Value> {
    extract_number("num*", &args[0])?;
    Ok(args[0].clone())
}

fn numerator(_rt: &Runtime, args: &[Value]) -> Result<Value> {
    match &args[0] {
        Value::Number(NumericType::Ratio(r)) => {
            Ok(Value::Number(NumericType::integer(r.numer().clone())))
        }
        other => Err(type_mismatch("numerator*", "Ratio", other)),
    }
}

fn denominator(_rt: &Runtime, args: &[Value]) -> Result<Value> {
    match &args[0] {
        Value::Number(NumericType::Ratio(r)) => {
            Ok(Value::Number(NumericType::integer(r.denom().clone())))
        }
        other => Err(type_mismatch("denominator*", "Ratio", other)),
    }
}

fn to_char(_rt: &Runtime, args: &[Value]) -> Result<Value> {
    match &args[0] {
        Value::Char(c) => Ok(Value::Char(*c)),
        Value::Number(NumericType::Int(n)) => u32::try_from(*n)
            .ok()
            .and_then(char::from_u32)
            .map(Value::Char)
            .ok_or_else(|| Error::type_error(format!("char*: {n} is not a valid code point"))),
        other => Err(type_mismatch("char*", "Int or Char", other)),
    }
}

// ============================================================================
// Strings, Symbols and Keywords
// ============================================================================

fn str_fn(_rt: &Runtime, args: &[Value]) -> Result<Value> {
    let mut out = String::new();
    for arg in args {
        match arg {
            Value::Nil => {}
            Value::String(s) => out.push_str(s),
            Value::Char(c) => out.push(*c),
            other => out.push_str(&crate::language::print_value(other, false)?),
        }
    }
    Ok(Value::String(Rc::from(out)))
}

fn pr_str(_rt: &Runtime, args: &[Value]) -> Result<Value> {
    Ok(Value::String(Rc::from(join_printed(args, true, " ")?)))
}

fn print_str(_rt: &Runtime, args: &[Value]) -> Result<Value> {
    Ok(Value::String(Rc::from(join_printed(args, false, " ")?)))
}

fn name_text(who: &str, value: &Value) -> Result<String> {
    match value {
        Value::String(s) => Ok(s.to_string()),
        Value::Symbol(sym) => Ok(sym.to_string()),
        Value::Keyword(k) => Ok(match k.ns {
            Some(ns) => format!("{ns}/{}", k.name),
            None => k.name.resolve(),
        }),
        other => Err(type_mismatch(who, "a String, Symbol or Keyword", other)),
    }
}

fn symbol(_rt: &Runtime, args: &[Value]) -> Result<Value> {
    match args {
        [Value::Symbol(sym)] => Ok(Value::Symbol(sym.clone())),
        [name] => Ok(Value::Symbol(Symbol::new(&name_text("symbol*", name)?))),
        [ns, name] => {
            let name = extract_string("symbol*", name)?;
            match ns {
                Value::Nil => Ok(Value::Symbol(Symbol::simple(&name))),
                ns => Ok(Value::Symbol(Symbol::qualified(
                    &extract_string("symbol*", ns)?,
                    &name,
                ))),
            }
        }
        _ => Err(Error::arity("symbol*", args.len())),
    }
}

fn keyword(_rt: &Runtime, args: &[Value]) -> Result<Value> {
    match args {
        [Value::Keyword(k)] => Ok(Value::Keyword(*k)),
        [name] => Ok(Value::Keyword(Keyword::new(&name_text("keyword*", name)?))),
        [ns, name] => {
            let name = extract_string("keyword*", name)?;
            Ok(Value::Keyword(Keyword {
                ns: match ns {
                    Value::Nil => None,
                    ns => Some(InternedSymbol::new(&extract_string("keyword*", ns)?)),
                },
                name: InternedSymbol::new(&name),
            }))
        }
        _ => Err(Error::arity("keyword*", args.len())),
    }
}

fn name(_rt: &Runtime, args: &[Value]) -> Result<Value> {
    coll::name(&args[0])
}

fn namespace(_rt: &Runtime, args: &[Value]) -> Result<Value> {
    coll::namespace(&args[0])
}

fn gensym(rt: &Runtime, args: &[Value]) -> Result<Value> {
    let prefix = match args.first() {
        Some(prefix) => name_text("gensym*", prefix)?,
        None => "G__".to_string(),
    };
    Ok(Value::Symbol(Symbol::simple(&format!(
        "{prefix}{}",
        rt.next_gensym_id()
    ))))
}

// ============================================================================
// Collections
// ============================================================================

fn list(_rt: &Runtime, args: &[Value]) -> Result<Value> {
    Ok(Value::list(args.to_vec()))
}

fn cons(_rt: &Runtime, args: &[Value]) -> Result<Value> {
    coll::cons(args[0].clone(), &args[1])
}

fn first(_rt: &Runtime, args: &[Value]) -> Result<Value> {
    coll::first(&args[0])
}

fn rest(_rt: &Runtime, args: &[Value]) -> Result<Value> {
    coll::rest(&args[0])
}

fn next(_rt: &Runtime, args: &[Value]) -> Result<Value> {
    coll::next(&args[0])
}

fn seq(_rt: &Runtime, args: &[Value]) -> Result<Value> {
    coll::seq(&args[0])
}

/// Eager concatenation into a List
fn concat(_rt: &Runtime, args: &[Value]) -> Result<Value> {
    let mut items = Vec::new();
    for arg in args {
        items.extend(seq_to_vec(arg)?);
    }
    Ok(Value::List(List::from_vec(items)))
}

fn conj(_rt: &Runtime, args: &[Value]) -> Result<Value> {
    let mut acc = args[0].clone();
    for item in &args[1..] {
        acc = coll::conj(&acc, item.clone())?;
    }
    Ok(acc)
}

fn count(_rt: &Runtime, args: &[Value]) -> Result<Value> {
    Ok(Value::int(coll::count(&args[0])? as i64))
}

fn nth(_rt: &Runtime, args: &[Value]) -> Result<Value> {
    coll::nth(&args[0], &args[1], args.get(2).cloned())
}

fn get(_rt: &Runtime, args: &[Value]) -> Result<Value> {
    let default = args.get(2).cloned().unwrap_or(Value::Nil);
    Ok(coll::get(&args[0], &args[1], default))
}

fn assoc(_rt: &Runtime, args: &[Value]) -> Result<Value> {
    if args.len() % 2 != 1 {
        return Err(Error::type_error(
            "assoc* expects even number of arguments after map/vector",
        ));
    }
    let mut acc = args[0].clone();
    for pair in args[1..].chunks(2) {
        acc = coll::assoc(&acc, pair[0].clone(), pair[1].clone())?;
    }
    Ok(acc)
}

fn dissoc(_rt: &Runtime, args: &[Value]) -> Result<Value> {
    let mut acc = args[0].clone();
    for key in &args[1..] {
        acc = coll::dissoc(&acc, key)?;
    }
    Ok(acc)
}

fn disj(_rt: &Runtime, args: &[Value]) -> Result<Value> {
    let mut acc = args[0].clone();
    for key in &args[1..] {
        acc = coll::disj(&acc, key)?;
    }
    Ok(acc)
}

fn contains_p(_rt: &Runtime, args: &[Value]) -> Result<Value> {
    Ok(Value::Bool(coll::contains(&args[0], &args[1])?))
}

fn find(_rt: &Runtime, args: &[Value]) -> Result<Value> {
    coll::find(&args[0], &args[1])
}

fn keys(_rt: &Runtime, args: &[Value]) -> Result<Value> {
    coll::keys(&args[0])
}

fn vals(_rt: &Runtime, args: &[Value]) -> Result<Value> {
    coll::vals(&args[0])
}

fn peek(_rt: &Runtime, args: &[Value]) -> Result<Value> {
    coll::peek(&args[0])
}

fn pop(_rt: &Runtime, args: &[Value]) -> Result<Value> {
    coll::pop(&args[0])
}

fn vec(_rt: &Runtime, args: &[Value]) -> Result<Value> {
    coll::vec(&args[0])
}

fn vector(_rt: &Runtime, args: &[Value]) -> Result<Value> {
    Ok(Value::vector(args.to_vec()))
}

fn hash_map(_rt: &Runtime, args: &[Value]) -> Result<Value> {
    coll::hash_map(args)
}

fn hash_set(_rt: &Runtime, args: &[Value]) -> Result<Value> {
    Ok(Value::Set(args.iter().cloned().collect::<PersistentSet>()))
}

fn set(_rt: &Runtime, args: &[Value]) -> Result<Value> {
    coll::set(&args[0])
}

fn subvec(_rt: &Runtime, args: &[Value]) -> Result<Value> {
    let start = extract_int("subvec*", &args[1])?;
    let end = match args.get(2) {
        Some(end) => Some(extract_int("subvec*", end)?),
        None => None,
    };
    coll::subvec(&args[0], start, end)
}

fn rseq(_rt: &Runtime, args: &[Value]) -> Result<Value> {
    coll::rseq(&args[0])
}

/// Order two values with a user comparator. Boolean comparators answer
/// "less than", numeric ones give the sign.
fn user_order(rt: &Runtime, f: &Value, a: &Value, b: &Value) -> Result<Ordering> {
    match rt.apply(f, &[a.clone(), b.clone()])? {
        Value::Number(n) if n.is_neg() => Ok(Ordering::Less),
        Value::Number(n) if n.is_pos() => Ok(Ordering::Greater),
        Value::Number(_) => Ok(Ordering::Equal),
        Value::Bool(true) => Ok(Ordering::Less),
        Value::Bool(false) | Value::Nil => {
            if rt.apply(f, &[b.clone(), a.clone()])?.is_truthy() {
                Ok(Ordering::Greater)
            } else {
                Ok(Ordering::Equal)
            }
        }
        other => Err(type_mismatch("sort*", "a number or Bool from comparator", &other)),
    }
}

/// Stable merge sort whose comparator may fail
fn merge_sort(
    mut items: Vec<Value>,
    cmp: &dyn Fn(&Value, &Value) -> Result<Ordering>,
) -> Result<Vec<Value>> {
    if items.len() <= 1 {
        return Ok(items);
    }
    let right = items.split_off(items.len() / 2);
    let left = merge_sort(items, cmp)?;
    let right = merge_sort(right, cmp)?;

    let mut out = Vec::with_capacity(left.len() + right.len());
    let mut left = left.into_iter().peekable();
    let mut right = right.into_iter().peekable();
    while let (Some(a), Some(b)) = (left.peek(), right.peek()) {
        let next = if cmp(b, a)? == Ordering::Less {
            right.next()
        } else {
            left.next()
        };
        out.extend(next);
    }
    out.extend(left);
    out.extend(right);
    Ok(out)
}

fn sort(rt: &Runtime, args: &[Value]) -> Result<Value> {
    let items = seq_to_vec(&args[1])?;
    let sorted = match &args[0] {
        Value::Nil => merge_sort(items, &compare)?,
        f => {
            let f = extract_callable("sort*", f)?;
            merge_sort(items, &|a, b| user_order(rt, f, a, b))?
        }
    };
    Ok(Value::Seq(Seq::from_vec(sorted)))
}

// ============================================================================
// Laziness and References
// ============================================================================

fn lazy_seq(rt: &Runtime, args: &[Value]) -> Result<Value> {
    let thunk = extract_callable("lazy-seq*", &args[0])?.clone();
    Ok(Value::Seq(Seq::Lazy(Rc::new(LazySeq::new(
        thunk,
        rt.invoker(),
    )))))
}

fn delay(rt: &Runtime, args: &[Value]) -> Result<Value> {
    let thunk = extract_callable("delay*", &args[0])?.clone();
    Ok(Value::Delay(Rc::new(Delay::new(thunk, rt.invoker()))))
}

fn force(_rt: &Runtime, args: &[Value]) -> Result<Value> {
    match &args[0] {
        Value::Delay(d) => d.force(),
        other => Ok(other.clone()),
    }
}

fn realized_p(_rt: &Runtime, args: &[Value]) -> Result<Value> {
    match &args[0] {
        Value::Delay(d) => Ok(Value::Bool(d.is_realized())),
        Value::Seq(Seq::Lazy(lazy)) => Ok(Value::Bool(lazy.is_realized())),
        other => Err(type_mismatch("realized?*", "a Delay or LazySeq", other)),
    }
}

fn deref(_rt: &Runtime, args: &[Value]) -> Result<Value> {
    match &args[0] {
        Value::Var(var) => var.deref(),
        Value::Delay(d) => d.force(),
        other => Err(type_mismatch("deref*", "a Var or Delay", other)),
    }
}

/// `(apply* f a b ... coll)`: the last argument is spread
fn apply(rt: &Runtime, args: &[Value]) -> Result<Value> {
    let f = &args[0];
    let (spread, fixed) = match args[1..].split_last() {
        Some(split) => split,
        None => return rt.apply(f, &[]),
    };
    let mut call_args = fixed.to_vec();
    call_args.extend(seq_to_vec(spread)?);
    rt.apply(f, &call_args)
}

// ============================================================================
// Metadata and Vars
// ============================================================================

fn meta(_rt: &Runtime, args: &[Value]) -> Result<Value> {
    Ok(match args[0].meta() {
        Some(meta) if !meta.is_empty() => Value::Map((*meta).clone()),
        _ => Value::Nil,
    })
}

fn with_meta(_rt: &Runtime, args: &[Value]) -> Result<Value> {
    let meta = match &args[1] {
        Value::Nil => None,
        Value::Map(map) => Some(Rc::new(map.clone())),
        other => return Err(type_mismatch("with-meta*", "a map or nil", other)),
    };
    args[0].with_meta(meta)
}

fn set_macro(_rt: &Runtime, args: &[Value]) -> Result<Value> {
    let var = extract_var("set-macro*", &args[0])?;
    var.set_macro(true);
    Ok(Value::Var(var))
}

fn var_get(_rt: &Runtime, args: &[Value]) -> Result<Value> {
    extract_var("var-get*", &args[0])?.deref()
}

fn find_var(rt: &Runtime, args: &[Value]) -> Result<Value> {
    let sym = extract_symbol("find-var*", &args[0])?;
    let Some(ns_name) = sym.ns else {
        return Err(Error::type_error(format!(
            "find-var*: symbol must be namespace-qualified: {sym}"
        )));
    };
    let ns = rt
        .registry()
        .find_namespace(ns_name)
        .ok_or_else(|| Error::type_error(format!("No such namespace: {ns_name}")))?;
    Ok(ns.find_own(sym.name).map_or(Value::Nil, Value::Var))
}

// ============================================================================
// Errors
// ============================================================================

fn ex_info(_rt: &Runtime, args: &[Value]) -> Result<Value> {
    let message = extract_string("ex-info", &args[0])?;
    let data = match args.get(1) {
        None | Some(Value::Nil) => Value::Map(ArrayMap::new()),
        Some(data @ Value::Map(_)) => data.clone(),
        Some(other) => return Err(type_mismatch("ex-info", "a map", other)),
    };
    Ok(Value::error(Error::user(message.to_string(), data)))
}

fn ex_message(_rt: &Runtime, args: &[Value]) -> Result<Value> {
    Ok(match &args[0] {
        Value::Error(err) => Value::String(Rc::from(err.message())),
        _ => Value::Nil,
    })
}

fn ex_data(_rt: &Runtime, args: &[Value]) -> Result<Value> {
    Ok(match &args[0] {
        Value::Error(err) => err.data(),
        _ => Value::Nil,
    })
}

fn ex_kind(_rt: &Runtime, args: &[Value]) -> Result<Value> {
    let err = extract_error("ex-kind*", &args[0])?;
    Ok(Value::symbol(err.kind().name()))
}

// ============================================================================
// Printing
// ============================================================================

fn pr(rt: &Runtime, args: &[Value]) -> Result<Value> {
    rt.write_output(&join_printed(args, true, " ")?)?;
    Ok(Value::Nil)
}

fn print(rt: &Runtime, args: &[Value]) -> Result<Value> {
    rt.write_output(&join_printed(args, false, " ")?)?;
    Ok(Value::Nil)
}

fn newline(rt: &Runtime, _args: &[Value]) -> Result<Value> {
    rt.write_output("\n")?;
    Ok(Value::Nil)
}

// ============================================================================
// Reading and Evaluation
// ============================================================================

fn read_string(rt: &Runtime, args: &[Value]) -> Result<Value> {
    let text = extract_string("read-string*", &args[0])?;
    let mut reader = Reader::for_str(&text);
    reader.set_namespace(rt.current_namespace().name());
    match reader.read()? {
        Some(form) => Ok(form),
        None => Err(Error::syntax("EOF while reading", reader.line(), reader.column())),
    }
}

fn eval(rt: &Runtime, args: &[Value]) -> Result<Value> {
    rt.eval_form(&args[0])
}

fn load_string(rt: &Runtime, args: &[Value]) -> Result<Value> {
    let text = extract_string("load-string*", &args[0])?;
    rt.eval_str(&text)
}

fn macroexpand_1(rt: &Runtime, args: &[Value]) -> Result<Value> {
    rt.macroexpand_1(&args[0])
}

fn macroexpand(rt: &Runtime, args: &[Value]) -> Result<Value> {
    rt.macroexpand(&args[0])
}

// ============================================================================
// Namespaces
// ============================================================================

fn namespace_name(who: &str, value: &Value) -> Result<InternedSymbol> {
    let sym = extract_symbol(who, value)?;
    if sym.ns.is_some() {
        return Err(Error::type_error(format!(
            "{who}: namespace names are unqualified, got {sym}"
        )));
    }
    Ok(sym.name)
}

fn in_ns(rt: &Runtime, args: &[Value]) -> Result<Value> {
    let ns = rt
        .registry()
        .ensure_namespace(namespace_name("in-ns*", &args[0])?);
    rt.registry().set_current(ns.clone());
    Ok(Value::Namespace(ns))
}

fn create_ns(rt: &Runtime, args: &[Value]) -> Result<Value> {
    let name = namespace_name("create-ns*", &args[0])?;
    Ok(Value::Namespace(rt.registry().ensure_namespace(name)))
}

fn find_ns(rt: &Runtime, args: &[Value]) -> Result<Value> {
    let name = namespace_name("find-ns*", &args[0])?;
    Ok(rt
        .registry()
        .find_namespace(name)
        .map_or(Value::Nil, Value::Namespace))
}

fn remove_ns(rt: &Runtime, args: &[Value]) -> Result<Value> {
    let name = namespace_name("remove-ns*", &args[0])?;
    Ok(rt
        .registry()
        .remove_namespace(name)?
        .map_or(Value::Nil, Value::Namespace))
}

fn all_ns(rt: &Runtime, _args: &[Value]) -> Result<Value> {
    let mut all = rt.registry().all_namespaces();
    all.sort_by(|a, b| a.name().cmp_text(&b.name()));
    Ok(Value::list(all.into_iter().map(Value::Namespace).collect()))
}

fn current_ns(rt: &Runtime, _args: &[Value]) -> Result<Value> {
    Ok(Value::Namespace(rt.current_namespace()))
}

fn ns_name(rt: &Runtime, args: &[Value]) -> Result<Value> {
    let ns = extract_namespace(rt, "ns-name*", &args[0])?;
    Ok(Value::Symbol(Symbol::from_parts(None, ns.name())))
}

fn ns_map(rt: &Runtime, args: &[Value]) -> Result<Value> {
    let ns = extract_namespace(rt, "ns-map*", &args[0])?;
    let mut mappings = ns.mappings();
    mappings.sort_by(|a, b| a.0.cmp_text(&b.0));
    Ok(Value::Map(ArrayMap::from_pairs(mappings.into_iter().map(
        |(name, var)| (Value::Symbol(Symbol::from_parts(None, name)), Value::Var(var)),
    ))))
}

fn ns_unmap(rt: &Runtime, args: &[Value]) -> Result<Value> {
    let ns = extract_namespace(rt, "ns-unmap*", &args[0])?;
    ns.unmap(extract_symbol("ns-unmap*", &args[1])?.name);
    Ok(Value::Nil)
}

fn ns_aliases(rt: &Runtime, args: &[Value]) -> Result<Value> {
    let ns = extract_namespace(rt, "ns-aliases*", &args[0])?;
    let mut aliases = ns.aliases();
    aliases.sort_by(|a, b| a.0.cmp_text(&b.0));
    Ok(Value::Map(ArrayMap::from_pairs(aliases.into_iter().map(
        |(alias, target)| {
            (
                Value::Symbol(Symbol::from_parts(None, alias)),
                Value::Namespace(target),
            )
        },
    ))))
}

fn ns_unalias(rt: &Runtime, args: &[Value]) -> Result<Value> {
    let ns = extract_namespace(rt, "ns-unalias*", &args[0])?;
    ns.remove_alias(extract_symbol("ns-unalias*", &args[1])?.name);
    Ok(Value::Nil)
}

fn existing_namespace(rt: &Runtime, who: &str, value: &Value) -> Result<Rc<Namespace>> {
    let name = namespace_name(who, value)?;
    rt.registry()
        .find_namespace(name)
        .ok_or_else(|| Error::type_error(format!("{who}: no namespace named {name}")))
}

/// Refer `names` (or every public Var when `None`) of `from` into the
/// current namespace
fn refer_into(rt: &Runtime, who: &str, from: &Namespace, names: Option<&Value>) -> Result<()> {
    let current = rt.current_namespace();
    let Some(names) = names else {
        current.refer_all(from);
        return Ok(());
    };
    for name in seq_to_vec(names)? {
        let sym = extract_symbol(who, &name)?;
        let var = from
            .find_own(sym.name)
            .filter(|var| !var.is_private())
            .ok_or_else(|| {
                Error::type_error(format!("{who}: {sym} does not exist in {}", from.name()))
            })?;
        current.refer(sym.name, var)?;
    }
    Ok(())
}

/// `(refer* 'ns)` or `(refer* 'ns [names])`
fn refer(rt: &Runtime, args: &[Value]) -> Result<Value> {
    let from = existing_namespace(rt, "refer*", &args[0])?;
    refer_into(rt, "refer*", &from, args.get(1))?;
    Ok(Value::Nil)
}

fn alias(rt: &Runtime, args: &[Value]) -> Result<Value> {
    let alias = namespace_name("alias*", &args[0])?;
    let target = existing_namespace(rt, "alias*", &args[1])?;
    rt.current_namespace().add_alias(alias, target)?;
    Ok(Value::Nil)
}

/// A `require` spec: `lib` or `[lib :as alias :refer [names]]`, where
/// `:refer :all` refers every public Var
fn require(rt: &Runtime, args: &[Value]) -> Result<Value> {
    let (lib, options) = match &args[0] {
        Value::Vector(spec) => {
            let items: Vec<Value> = spec.iter().cloned().collect();
            match items.split_first() {
                Some((lib, options)) => (lib.clone(), options.to_vec()),
                None => return Err(Error::type_error("require*: empty lib spec")),
            }
        }
        other => (other.clone(), Vec::new()),
    };
    let ns = existing_namespace(rt, "require*", &lib)?;
    if options.len() % 2 != 0 {
        return Err(Error::type_error(format!(
            "require*: options for {} must come in pairs",
            ns.name()
        )));
    }
    for option in options.chunks(2) {
        let key = extract_keyword("require*", &option[0])?;
        match key.name.resolve().as_str() {
            "as" => {
                let alias = namespace_name("require*", &option[1])?;
                rt.current_namespace().add_alias(alias, ns.clone())?;
            }
            "refer" => match &option[1] {
                Value::Keyword(k) if k.name.with_str(|s| s == "all") => {
                    refer_into(rt, "require*", &ns, None)?
                }
                names => refer_into(rt, "require*", &ns, Some(names))?,
            },
            _ => {
                return Err(Error::type_error(format!(
                    "require*: unsupported option {}",
                    option[0]
                )));
            }
        }
    }
    Ok(Value::Nil)
}

// ============================================================================
// Registration
// ============================================================================

/// Every native procedure, in registration order
pub static NATIVES: &[NativeProc] = &[
    // Identity, equality and types
    native("type*", 1, Some(1), type_of),
    native("identical?*", 2, Some(2), identical_p),
    native("=*", 1, None, equal_p),
    native("compare*", 2, Some(2), compare_fn),
    // Arithmetic
    native("add*", 0, None, add),
    native("add'*", 0, None, add_extended),
    native("subtract*", 1, None, subtract),
    native("subtract'*", 1, None, subtract_extended),
    native("multiply*", 0, None, multiply),
    native("multiply'*", 0, None, multiply_extended),
    native("divide*", 1, None, divide),
    native("quot*", 2, Some(2), quot),
    native("rem*", 2, Some(2), rem),
    native("lt*", 1, None, lt),
    native("lte*", 1, None, lte),
    native("gt*", 1, None, gt),
    native("gte*", 1, None, gte),
    native("num-eq*", 1, None, num_eq),
    native("max*", 1, None, max),
    native("min*", 1, None, min),
    native("zero?*", 1, Some(1), zero_p),
    native("pos?*", 1, Some(1), pos_p),
    native("neg?*", 1, Some(1), neg_p),
    // Bit operations
    native("bit-and*", 2, None, bit_and),
    native("bit-or*", 2, None, bit_or),
    native("bit-xor*", 2, None, bit_xor),
    native("bit-and-not*", 2, None, bit_and_not),
    native("bit-not*", 1, Some(1), bit_not),
    native("bit-clear*", 2, Some(2), bit_clear),
    native("bit-set*", 2, Some(2), bit_set),
    native("bit-flip*", 2, Some(2), bit_flip),
    native("bit-test*", 2, Some(2), bit_test),
    native("bit-shift-left*", 2, Some(2), bit_shift_left),
    native("bit-shift-right*", 2, Some(2), bit_shift_right),
    native("unsigned-bit-shift-right*", 2, Some(2), unsigned_bit_shift_right),
    // Numeric conversions
    native("int*", 1, Some(1), to_int),
    native("double*", 1, Some(1), to_double),
    native("bigint*", 1, Some(1), to_bigint),
    native("bigfloat*", 1, Some(1), to_bigfloat),
    native("num*", 1, Some(1), to_num),
    native("numerator*", 1, Some(1), numerator),
    native("denominator*", 1, Some(1), denominator),
    native("char*", 1, Some(1), to_char),
    // Strings, symbols and keywords
    native("str*", 0, None, str_fn),
    native("pr-str*", 0, None, pr_str),
    native("print-str*", 0, None, print_str),
    native("symbol*", 1, Some(2), symbol),
    native("keyword*", 1, Some(2), keyword),
    native("name*", 1, Some(1), name),
    native("namespace*", 1, Some(1), namespace),
    native("gensym*", 0, Some(1), gensym),
    // Collections
    native("list**", 0, None, list),
    native("cons*", 2, Some(2), cons),
    native("first*", 1, Some(1), first),
    native("rest*", 1, Some(1), rest),
    native("next*", 1, Some(1), next),
    native("seq*", 1, Some(1), seq),
    native("concat*", 0, None, concat),
    native("conj*", 1, None, conj),
    native("count*", 1, Some(1), count),
    native("nth*", 2, Some(3), nth),
    native("get*", 2, Some(3), get),
    native("assoc*", 3, None, assoc),
    native("dissoc*", 1, None, dissoc),
    native("disj*", 1, None, disj),
    native("contains?*", 2, Some(2), contains_p),
    native("find*", 2, Some(2), find),
    native("keys*", 1, Some(1), keys),
    native("vals*", 1, Some(1), vals),
    native("peek*", 1, Some(1), peek),
    native("pop*", 1, Some(1), pop),
    native("vec*", 1, Some(1), vec),
    native("vector*", 0, None, vector),
    native("hash-map*", 0, None, hash_map),
    native("hash-set*", 0, None, hash_set),
    native("set*", 1, Some(1), set),
    native("subvec*", 2, Some(3), subvec),
    native("rseq*", 1, Some(1), rseq),
    native("sort*", 2, Some(2), sort),
    // Laziness and references
    native("lazy-seq*", 1, Some(1), lazy_seq),
    native("delay*", 1, Some(1), delay),
    native("force*", 1, Some(1), force),
    native("realized?*", 1, Some(1), realized_p),
    native("deref*", 1, Some(1), deref),
    native("apply*", 1, None, apply),
    // Metadata and Vars
    native("meta*", 1, Some(1), meta),
    native("with-meta*", 2, Some(2), with_meta),
    native("set-macro*", 1, Some(1), set_macro),
    native("var-get*", 1, Some(1), var_get),
    native("find-var*", 1, Some(1), find_var),
    // Errors
    native("ex-info", 1, Some(2), ex_info),
    native("ex-message*", 1, Some(1), ex_message),
    native("ex-data*", 1, Some(1), ex_data),
    native("ex-kind*", 1, Some(1), ex_kind),
    // Printing
    native("pr*", 0, None, pr),
    native("print*", 0, None, print),
    native("newline*", 0, Some(0), newline),
    // Reading and evaluation
    native("read-string*", 1, Some(1), read_string),
    native("eval*", 1, Some(1), eval),
    native("load-string*", 1, Some(1), load_string),
    native("macroexpand-1*", 1, Some(1), macroexpand_1),
    native("macroexpand*", 1, Some(1), macroexpand),
    // Namespaces
    native("in-ns*", 1, Some(1), in_ns),
    native("create-ns*", 1, Some(1), create_ns),
    native("find-ns*", 1, Some(1), find_ns),
    native("remove-ns*", 1, Some(1), remove_ns),
    native("all-ns*", 0, Some(0), all_ns),
    native("current-ns*", 0, Some(0), current_ns),
    native("ns-name*", 1, Some(1), ns_name),
    native("ns-map*", 1, Some(1), ns_map),
    native("ns-unmap*", 2, Some(2), ns_unmap),
    native("ns-aliases*", 1, Some(1), ns_aliases),
    native("ns-unalias*", 2, Some(2), ns_unalias),
    native("refer*", 1, Some(2), refer),
    native("alias*", 2, Some(2), alias),
    native("require*", 1, Some(1), require),
];

/// Bind every native procedure in `core`. Returns how many were bound.
pub fn install(core: &Namespace) -> usize {
    for proc in NATIVES {
        core.intern(InternedSymbol::new(proc.name))
            .bind(Value::Native(proc));
    }
    NATIVES.len()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorKind;
    use crate::runtime::RuntimeConfig;

    fn bare() -> Rc<Runtime> {
        Runtime::with_config(RuntimeConfig {
            load_bootstrap: false,
            ..RuntimeConfig::default()
        })
        .unwrap()
    }

    fn eval(rt: &Runtime, text: &str) -> Value {
        rt.eval_str(text).unwrap()
    }

    fn kind_of(rt: &Runtime, text: &str) -> ErrorKind {
        rt.eval_str(text).unwrap_err().kind()
    }

    #[test]
    fn test_native_names_are_unique() {
        let mut names: Vec<&str> = NATIVES.iter().map(|p| p.name).collect();
        names.sort_unstable();
        names.dedup();
        assert_eq!(names.len(), NATIVES.len());
    }

    #[test]
    fn test_arithmetic_identities_and_unary_forms() {
        let rt = bare();
        assert_eq!(eval(&rt, "(add*)"), Value::int(0));
        assert_eq!(eval(&rt, "(multiply*)"), Value::int(1));
        assert_eq!(eval(&rt, "(subtract* 5)"), Value::int(-5));
        assert_eq!(eval(&rt, "(divide* 4)"), eval(&rt, "1/4"));
        assert_eq!(eval(&rt, "(divide* 6 3)"), Value::int(2));
        assert_eq!(kind_of(&rt, "(divide* 1 0)"), ErrorKind::Arithmetic);
        assert_eq!(kind_of(&rt, "(add* 1 :a)"), ErrorKind::Type);
        assert_eq!(kind_of(&rt, "(quot*)"), ErrorKind::Arity);
    }

    #[test]
    fn test_plain_add_wraps_and_extended_promotes() {
        let rt = bare();
        assert_eq!(
            eval(&rt, "(add* 9223372036854775807 1)"),
            Value::int(i64::MIN)
        );
        let promoted = eval(&rt, "(add'* 9223372036854775807 1)");
        assert_eq!(promoted.kind().name(), "BigInt");
        assert_eq!(promoted.to_string(), "9223372036854775808N");
    }

    #[test]
    fn test_comparison_chains() {
        let rt = bare();
        assert_eq!(eval(&rt, "(lt* 1 2 3)"), Value::Bool(true));
        assert_eq!(eval(&rt, "(lt* 1 3 2)"), Value::Bool(false));
        assert_eq!(eval(&rt, "(num-eq* 1 1.0 1N)"), Value::Bool(true));
        assert_eq!(kind_of(&rt, "(lt* 1 \"a\")"), ErrorKind::Type);
        assert_eq!(eval(&rt, "(compare* [1 2] [1 3])"), Value::int(-1));
    }

    #[test]
    fn test_bit_operations_accept_int_only() {
        let rt = bare();
        assert_eq!(eval(&rt, "(bit-and* 12 10)"), Value::int(8));
        assert_eq!(eval(&rt, "(bit-shift-left* 1 10)"), Value::int(1024));
        assert_eq!(eval(&rt, "(unsigned-bit-shift-right* -1 60)"), Value::int(15));
        assert_eq!(eval(&rt, "(bit-test* 5 2)"), Value::Bool(true));
        assert_eq!(kind_of(&rt, "(bit-or* 1.0 2)"), ErrorKind::Type);
    }

    #[test]
    fn test_conversions() {
        let rt = bare();
        assert_eq!(eval(&rt, "(int* 3.9)"), Value::int(3));
        assert_eq!(eval(&rt, "(int* \\A)"), Value::int(65));
        assert_eq!(eval(&rt, "(char* 97)"), Value::Char('a'));
        assert_eq!(eval(&rt, "(numerator* 6/4)"), Value::int(3));
        assert_eq!(eval(&rt, "(denominator* 6/4)"), Value::int(2));
        assert_eq!(eval(&rt, "(bigint* \"123\")").kind().name(), "BigInt");
        assert_eq!(eval(&rt, "(bigfloat* \"1.5\")").kind().name(), "BigFloat");
        assert_eq!(kind_of(&rt, "(numerator* 3)"), ErrorKind::Type);
    }

    #[test]
    fn test_str_and_printing_to_strings() {
        let rt = bare();
        assert_eq!(
            eval(&rt, "(str* \"a\" nil \\b 1 :k)"),
            Value::string("ab1:k")
        );
        assert_eq!(
            eval(&rt, "(pr-str* \"a\" [1 \\b])"),
            Value::string("\"a\" [1 \\b]")
        );
        assert_eq!(eval(&rt, "(print-str* \"a\" \\b)"), Value::string("a b"));
    }

    #[test]
    fn test_sort_with_and_without_comparator() {
        let rt = bare();
        assert_eq!(eval(&rt, "(sort* nil [3 1 2])"), eval(&rt, "'(1 2 3)"));
        assert_eq!(eval(&rt, "(sort* gt* [3 1 2])"), eval(&rt, "'(3 2 1)"));
        assert_eq!(
            eval(&rt, "(sort* (fn [a b] (subtract* b a)) [1 3 2])"),
            eval(&rt, "'(3 2 1)")
        );
        assert_eq!(kind_of(&rt, "(sort* nil [1 :a])"), ErrorKind::Type);
    }

    #[test]
    fn test_apply_spreads_last_argument() {
        let rt = bare();
        assert_eq!(eval(&rt, "(apply* add* 1 2 [3 4])"), Value::int(10));
        assert_eq!(eval(&rt, "(apply* add* nil)"), Value::int(0));
    }

    #[test]
    fn test_ex_info_round_trip() {
        let rt = bare();
        eval(&rt, "(def e (ex-info \"bad\" {:code 7}))");
        assert_eq!(eval(&rt, "(ex-message* e)"), Value::string("bad"));
        assert_eq!(eval(&rt, "(get* (ex-data* e) :code)"), Value::int(7));
        assert_eq!(eval(&rt, "(ex-kind* e)"), Value::symbol("UserError"));
        assert_eq!(eval(&rt, "(ex-message* 5)"), Value::Nil);
    }

    #[test]
    fn test_printing_goes_to_output_sink() {
        use std::cell::RefCell;
        use std::io::Write;

        struct Sink(Rc<RefCell<Vec<u8>>>);
        impl Write for Sink {
            fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
                self.0.borrow_mut().extend_from_slice(buf);
                Ok(buf.len())
            }
            fn flush(&mut self) -> std::io::Result<()> {
                Ok(())
            }
        }

        let rt = bare();
        let buffer = Rc::new(RefCell::new(Vec::new()));
        rt.set_output(Box::new(Sink(buffer.clone())));
        eval(&rt, "(pr* \"x\" 1) (newline*) (print* \"x\" \\y)");
        assert_eq!(
            String::from_utf8(buffer.borrow().clone()).unwrap(),
            "\"x\" 1\nx y"
        );
    }

    #[test]
    fn test_read_string_and_eval() {
        let rt = bare();
        assert_eq!(eval(&rt, "(eval* (read-string* \"(add* 1 2)\"))"), Value::int(3));
        assert_eq!(kind_of(&rt, "(read-string* \"\")"), ErrorKind::Syntax);
        assert_eq!(eval(&rt, "(load-string* \"(def z 1) (add* z 1)\")"), Value::int(2));
    }

    #[test]
    fn test_namespace_procedures() {
        let rt = bare();
        eval(&rt, "(in-ns* 'lib) (def helper 42) (def ^:private hidden 1)");
        eval(&rt, "(in-ns* 'app)");
        eval(&rt, "(require* '[lib :as l :refer [helper]])");
        assert_eq!(eval(&rt, "l/helper"), Value::int(42));
        assert_eq!(eval(&rt, "helper"), Value::int(42));
        assert_eq!(kind_of(&rt, "l/hidden"), ErrorKind::Analysis);
        assert_eq!(kind_of(&rt, "(remove-ns* 'app)"), ErrorKind::Type);
        assert_eq!(eval(&rt, "(ns-name* (current-ns*))"), Value::symbol("app"));
        assert_eq!(eval(&rt, "(find-ns* 'missing)"), Value::Nil);
        eval(&rt, "(ns-unalias* 'app 'l)");
        assert_eq!(kind_of(&rt, "l/helper"), ErrorKind::Analysis);
        assert_eq!(eval(&rt, "(var-get* (find-var* 'lib/helper))"), Value::int(42));
    }
}
