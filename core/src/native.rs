//! Native procedure utilities and helpers
//!
//! Argument extraction for procedures implemented in Rust. Every helper
//! takes the name of the calling procedure so type errors say who
//! rejected the value.

use std::rc::Rc;

use crate::abstractions::to_vec;
use crate::error::{Error, Result};
use crate::language::{Keyword, Symbol, Value, print_value};
use crate::namespace::{Namespace, Var};
use crate::numeric::NumericType;
use crate::runtime::Runtime;

// ============================================================================
// Value Extraction Helpers
// ============================================================================

/// The error for an argument of the wrong kind
pub fn type_mismatch(who: &str, expected: &str, got: &Value) -> Error {
    Error::type_error(format!("{who}: expected {expected}, got {}", got.kind()))
}

/// Extract any number
pub fn extract_number<'a>(who: &str, value: &'a Value) -> Result<&'a NumericType> {
    match value {
        Value::Number(n) => Ok(n),
        _ => Err(type_mismatch(who, "a number", value)),
    }
}

/// Extract a fixed-width integer
pub fn extract_int(who: &str, value: &Value) -> Result<i64> {
    match value {
        Value::Number(NumericType::Int(n)) => Ok(*n),
        _ => Err(type_mismatch(who, "Int", value)),
    }
}

/// Extract a string
pub fn extract_string(who: &str, value: &Value) -> Result<Rc<str>> {
    match value {
        Value::String(s) => Ok(s.clone()),
        _ => Err(type_mismatch(who, "String", value)),
    }
}

pub fn extract_symbol<'a>(who: &str, value: &'a Value) -> Result<&'a Symbol> {
    match value {
        Value::Symbol(sym) => Ok(sym),
        _ => Err(type_mismatch(who, "Symbol", value)),
    }
}

pub fn extract_keyword(who: &str, value: &Value) -> Result<Keyword> {
    match value {
        Value::Keyword(k) => Ok(*k),
        _ => Err(type_mismatch(who, "Keyword", value)),
    }
}

pub fn extract_var(who: &str, value: &Value) -> Result<Rc<Var>> {
    match value {
        Value::Var(var) => Ok(var.clone()),
        _ => Err(type_mismatch(who, "Var", value)),
    }
}

pub fn extract_error(who: &str, value: &Value) -> Result<Rc<Error>> {
    match value {
        Value::Error(err) => Ok(err.clone()),
        _ => Err(type_mismatch(who, "Error", value)),
    }
}

/// Extract a namespace given either the namespace itself or its name
pub fn extract_namespace(rt: &Runtime, who: &str, value: &Value) -> Result<Rc<Namespace>> {
    match value {
        Value::Namespace(ns) => Ok(ns.clone()),
        Value::Symbol(sym) if sym.ns.is_none() => rt
            .registry()
            .find_namespace(sym.name)
            .ok_or_else(|| Error::type_error(format!("{who}: no namespace named {sym}"))),
        _ => Err(type_mismatch(who, "a Namespace or Symbol", value)),
    }
}

/// Extract a function-like value that can be invoked
pub fn extract_callable<'a>(who: &str, value: &'a Value) -> Result<&'a Value> {
    if value.has(crate::language::Capability::Callable) {
        Ok(value)
    } else {
        Err(type_mismatch(who, "a callable value", value))
    }
}

// ============================================================================
// Sequence Helpers
// ============================================================================

/// Collect any seqable value into a `Vec`
pub fn seq_to_vec(value: &Value) -> Result<Vec<Value>> {
    to_vec(value)
}

/// Join the printed forms of `values` with `separator`
pub fn join_printed(values: &[Value], escape: bool, separator: &str) -> Result<String> {
    let mut out = String::new();
    for (i, value) in values.iter().enumerate() {
        if i > 0 {
            out.push_str(separator);
        }
        out.push_str(&print_value(value, escape)?);
    }
    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_extract_int() {
        assert_eq!(extract_int("f", &Value::int(42)).unwrap(), 42);
        let err = extract_int("f", &Value::float(4.2)).unwrap_err();
        assert_eq!(err.message(), "f: expected Int, got Double");
    }

    #[test]
    fn test_extract_string_and_symbol() {
        assert_eq!(&*extract_string("f", &Value::string("hi")).unwrap(), "hi");
        assert!(extract_string("f", &Value::symbol("hi")).is_err());
        assert!(extract_symbol("f", &Value::symbol("a/b")).unwrap().ns.is_some());
    }

    #[test]
    fn test_join_printed() {
        let values = vec![Value::string("a"), Value::Char('b'), Value::int(1)];
        assert_eq!(join_printed(&values, true, " ").unwrap(), "\"a\" \\b 1");
        assert_eq!(join_printed(&values, false, "").unwrap(), "ab1");
    }
}
