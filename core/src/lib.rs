//! Language engine for Kern
//!
//! Kern is a small Clojure-flavoured Lisp. This crate holds the whole
//! engine: the reader, the analyzer that turns forms into expression trees,
//! the tree-walking evaluator, the numeric tower, persistent collections,
//! namespaces and Vars, and the core library loaded at startup.
//!
//! ```no_run
//! use kern::Runtime;
//!
//! let rt = Runtime::new()?;
//! let value = rt.eval_str("(reduce + (map inc [1 2 3]))")?;
//! assert_eq!(value.to_string(), "9");
//! # Ok::<(), kern::Error>(())
//! ```

pub mod abstractions;
pub mod analyzer;
pub mod collections;
pub mod environment;
pub mod error;
pub mod interner;
pub mod interpreter;
pub mod language;
pub mod namespace;
pub mod native;
pub mod numeric;
pub mod reader;
pub mod runtime;
pub mod stdlib;

// Re-export commonly used items for convenience
pub use abstractions::{
    SeqIter, assoc, conj, cons, count, first, get, hash_map, next, nth, rest, seq, to_vec,
};
pub use analyzer::{Expr, is_special_form};
pub use collections::{ArrayMap, Delay, LazySeq, List, PersistentSet, PersistentVector, Seq};
pub use environment::{Env, Environment};
pub use error::{Error, ErrorKind, Result};
pub use interner::InternedSymbol;
pub use language::{
    Capability, Function, Keyword, Kind, NativeFn, NativeProc, Symbol, Value, equals, compare,
    print_value,
};
pub use namespace::{CORE_NS, Namespace, Registry, Var};
pub use numeric::NumericType;
pub use reader::{Reader, read_all};
pub use runtime::{Runtime, RuntimeConfig};
