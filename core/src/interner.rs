use once_cell::sync::Lazy;
use std::fmt;
use std::sync::{PoisonError, RwLock};
use string_interner::{DefaultBackend, DefaultSymbol, StringInterner};

static INTERNER: Lazy<RwLock<StringInterner<DefaultBackend>>> =
    Lazy::new(|| RwLock::new(StringInterner::default()));

/// A name that has been interned in the process-wide string table.
///
/// Symbols, keywords and namespace names all store their components as
/// `InternedSymbol`s, so equal text always compares as the same handle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct InternedSymbol(DefaultSymbol);

impl InternedSymbol {
    /// Intern a string and return its handle
    pub fn new(s: &str) -> Self {
        let mut interner = INTERNER.write().unwrap_or_else(PoisonError::into_inner);
        InternedSymbol(interner.get_or_intern(s))
    }

    /// Resolve the handle back to an owned string
    pub fn resolve(&self) -> String {
        self.with_str(str::to_owned)
    }

    /// Resolve the handle and run a function with the string slice.
    /// Avoids the allocation `resolve()` makes.
    pub fn with_str<F, R>(&self, f: F) -> R
    where
        F: FnOnce(&str) -> R,
    {
        let interner = INTERNER.read().unwrap_or_else(PoisonError::into_inner);
        // Handles are only ever minted by `new`, so resolution cannot miss.
        f(interner.resolve(self.0).unwrap_or_default())
    }

    /// Compare two handles by their text rather than by interning order
    pub fn cmp_text(&self, other: &InternedSymbol) -> std::cmp::Ordering {
        if self == other {
            return std::cmp::Ordering::Equal;
        }
        let left = self.resolve();
        other.with_str(|right| left.as_str().cmp(right))
    }
}

impl From<&str> for InternedSymbol {
    fn from(s: &str) -> Self {
        InternedSymbol::new(s)
    }
}

impl fmt::Display for InternedSymbol {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.with_str(|s| write!(f, "{s}"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_intern_same_string_returns_same_symbol() {
        let sym1 = InternedSymbol::new("foo");
        let sym2 = InternedSymbol::new("foo");
        assert_eq!(sym1, sym2);
    }

    #[test]
    fn test_intern_different_strings_returns_different_symbols() {
        let sym1 = InternedSymbol::new("foo");
        let sym2 = InternedSymbol::new("bar");
        assert_ne!(sym1, sym2);
    }

    #[test]
    fn test_resolve_returns_original_string() {
        let sym = InternedSymbol::new("kern.core");
        assert_eq!(sym.resolve(), "kern.core");
    }

    #[test]
    fn test_cmp_text_ignores_interning_order() {
        let z = InternedSymbol::new("zzz-interned-first");
        let a = InternedSymbol::new("aaa-interned-second");
        assert_eq!(a.cmp_text(&z), std::cmp::Ordering::Less);
        assert_eq!(z.cmp_text(&a), std::cmp::Ordering::Greater);
        assert_eq!(a.cmp_text(&a), std::cmp::Ordering::Equal);
    }

    #[test]
    fn test_display() {
        let sym = InternedSymbol::new("display-test");
        assert_eq!(format!("{sym}"), "display-test");
    }
}
