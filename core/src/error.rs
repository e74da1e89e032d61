//! Error types for reading, analysis and evaluation.
//!
//! Every fallible operation in the engine returns [`Result`]. Errors raised
//! while evaluating language code unwind through `?` until a `try` form
//! catches them, at which point they become [`Value::Error`] values that user
//! code can inspect and rethrow.

use std::fmt;

use thiserror::Error as ThisError;

use crate::language::Value;

/// Convenience alias used throughout the crate.
pub type Result<T> = std::result::Result<T, Error>;

/// Categories of errors, as matched by `catch` clauses.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    Syntax,
    Analysis,
    Arity,
    Type,
    Index,
    Arithmetic,
    User,
    Internal,
}

impl ErrorKind {
    /// The name a `catch` clause uses for this kind
    pub fn name(&self) -> &'static str {
        match self {
            ErrorKind::Syntax => "SyntaxError",
            ErrorKind::Analysis => "AnalysisError",
            ErrorKind::Arity => "ArityError",
            ErrorKind::Type => "TypeError",
            ErrorKind::Index => "IndexError",
            ErrorKind::Arithmetic => "ArithmeticError",
            ErrorKind::User => "UserError",
            ErrorKind::Internal => "InternalError",
        }
    }

    /// Look up a kind by its `catch` name
    pub fn from_name(name: &str) -> Option<ErrorKind> {
        Some(match name {
            "SyntaxError" => ErrorKind::Syntax,
            "AnalysisError" => ErrorKind::Analysis,
            "ArityError" => ErrorKind::Arity,
            "TypeError" => ErrorKind::Type,
            "IndexError" => ErrorKind::Index,
            "ArithmeticError" => ErrorKind::Arithmetic,
            "UserError" => ErrorKind::User,
            "InternalError" => ErrorKind::Internal,
            _ => return None,
        })
    }
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

#[derive(Debug, Clone, ThisError)]
pub enum Error {
    /// Malformed input while reading
    #[error("SyntaxError: {message} (line {line}, column {column})")]
    Syntax {
        message: String,
        line: usize,
        column: usize,
    },

    /// Unresolvable symbol or malformed special form
    #[error("AnalysisError: {0}")]
    Analysis(String),

    /// No arity of the callee accepts the given argument count
    #[error("ArityError: wrong number of args ({got}) passed to {name}")]
    Arity { name: String, got: usize },

    #[error("TypeError: {0}")]
    Type(String),

    #[error("IndexError: index {index} out of bounds for length {length}")]
    Index { index: i64, length: usize },

    #[error("ArithmeticError: {0}")]
    Arithmetic(String),

    /// Raised by language code through `ex-info` and `throw`
    #[error("UserError: {message}")]
    User { message: String, data: Value },

    /// Engine invariant violation (stale frame, runaway recursion)
    #[error("InternalError: {0}")]
    Internal(String),

    /// Unwinds a `recur` to its enclosing `loop` or function.
    /// The analyzer guarantees it never escapes those.
    #[error("InternalError: recur escaped its target")]
    Recur(Vec<Value>),
}

impl Error {
    pub fn syntax(message: impl Into<String>, line: usize, column: usize) -> Self {
        Error::Syntax {
            message: message.into(),
            line,
            column,
        }
    }

    pub fn analysis(message: impl Into<String>) -> Self {
        Error::Analysis(message.into())
    }

    pub fn arity(name: impl Into<String>, got: usize) -> Self {
        Error::Arity {
            name: name.into(),
            got,
        }
    }

    pub fn type_error(message: impl Into<String>) -> Self {
        Error::Type(message.into())
    }

    pub fn index(index: i64, length: usize) -> Self {
        Error::Index { index, length }
    }

    pub fn arithmetic(message: impl Into<String>) -> Self {
        Error::Arithmetic(message.into())
    }

    pub fn user(message: impl Into<String>, data: Value) -> Self {
        Error::User {
            message: message.into(),
            data,
        }
    }

    pub fn internal(message: impl Into<String>) -> Self {
        Error::Internal(message.into())
    }

    pub fn kind(&self) -> ErrorKind {
        match self {
            Error::Syntax { .. } => ErrorKind::Syntax,
            Error::Analysis(_) => ErrorKind::Analysis,
            Error::Arity { .. } => ErrorKind::Arity,
            Error::Type(_) => ErrorKind::Type,
            Error::Index { .. } => ErrorKind::Index,
            Error::Arithmetic(_) => ErrorKind::Arithmetic,
            Error::User { .. } => ErrorKind::User,
            Error::Internal(_) | Error::Recur(_) => ErrorKind::Internal,
        }
    }

    /// The message without the kind prefix
    pub fn message(&self) -> String {
        match self {
            Error::Syntax { message, .. } | Error::User { message, .. } => message.clone(),
            Error::Analysis(m) | Error::Type(m) | Error::Arithmetic(m) | Error::Internal(m) => {
                m.clone()
            }
            Error::Arity { name, got } => format!("wrong number of args ({got}) passed to {name}"),
            Error::Index { index, length } => {
                format!("index {index} out of bounds for length {length}")
            }
            Error::Recur(_) => "recur escaped its target".to_string(),
        }
    }

    /// The data payload carried by user errors, nil for every other kind
    pub fn data(&self) -> Value {
        match self {
            Error::User { data, .. } => data.clone(),
            _ => Value::Nil,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_kind_names_round_trip() {
        for kind in [
            ErrorKind::Syntax,
            ErrorKind::Analysis,
            ErrorKind::Arity,
            ErrorKind::Type,
            ErrorKind::Index,
            ErrorKind::Arithmetic,
            ErrorKind::User,
        ] {
            assert_eq!(ErrorKind::from_name(kind.name()), Some(kind));
        }
        assert_eq!(ErrorKind::from_name("NoSuchError"), None);
    }

    #[test]
    fn test_display_includes_kind() {
        let err = Error::arity("user/f", 3);
        assert_eq!(
            err.to_string(),
            "ArityError: wrong number of args (3) passed to user/f"
        );
        assert_eq!(err.kind(), ErrorKind::Arity);
    }

    #[test]
    fn test_syntax_error_position() {
        let err = Error::syntax("Unexpected EOF", 3, 7);
        assert_eq!(err.message(), "Unexpected EOF");
        assert!(err.to_string().contains("line 3, column 7"));
    }

    #[test]
    fn test_user_error_carries_data() {
        let err = Error::user("boom", Value::Bool(true));
        assert_eq!(err.kind(), ErrorKind::User);
        assert!(matches!(err.data(), Value::Bool(true)));
        assert!(matches!(Error::type_error("x").data(), Value::Nil));
    }
}
