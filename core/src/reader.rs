//! Reader: turns program text into data.
//!
//! The reader pulls characters from a [`CharSource`] and produces one
//! top-level form per [`Reader::read`] call. Characters with special meaning
//! are handled by entries in a macro table, and `#` looks up a second
//! dispatch table. Both tables can be extended.

use std::rc::Rc;
use std::str::FromStr;

use num_bigint::BigInt as BigInteger;
use num_traits::Num;
use rustc_hash::FxHashMap;

use crate::collections::{ArrayMap, PersistentSet};
use crate::error::{Error, Result};
use crate::interner::InternedSymbol;
use crate::language::{Keyword, Symbol, Value};
use crate::numeric::NumericType;

// ============================================================================
// Character Sources
// ============================================================================

/// A pull-based stream of characters
pub trait CharSource {
    fn peek(&mut self) -> Option<char>;
    fn next(&mut self) -> Option<char>;
}

/// Adapts any character iterator
pub struct IterSource<I: Iterator<Item = char>> {
    chars: std::iter::Peekable<I>,
}

impl<I: Iterator<Item = char>> IterSource<I> {
    pub fn new(chars: I) -> Self {
        IterSource {
            chars: chars.peekable(),
        }
    }
}

impl<I: Iterator<Item = char>> CharSource for IterSource<I> {
    fn peek(&mut self) -> Option<char> {
        self.chars.peek().copied()
    }

    fn next(&mut self) -> Option<char> {
        self.chars.next()
    }
}

/// Source over a string slice
pub type StrSource<'a> = IterSource<std::str::Chars<'a>>;

// ============================================================================
// Reader
// ============================================================================

/// Handler for a macro or dispatch character. `Ok(None)` means the handler
/// consumed input without producing a form (as `#_` does).
pub type MacroFn<S> = fn(&mut Reader<S>, char) -> Result<Option<Value>>;

/// Parameters seen inside a `#(...)` literal
#[derive(Default)]
struct FnArgs {
    max: usize,
    rest: bool,
}

pub struct Reader<S: CharSource> {
    source: S,
    line: usize,
    column: usize,
    macros: FxHashMap<char, MacroFn<S>>,
    dispatch: FxHashMap<char, MacroFn<S>>,
    /// Namespace `::keyword` resolves against
    namespace: InternedSymbol,
    fn_args: Option<FnArgs>,
}

impl<'a> Reader<StrSource<'a>> {
    pub fn for_str(text: &'a str) -> Self {
        Reader::new(IterSource::new(text.chars()))
    }
}

/// Read every form in `text`
pub fn read_all(text: &str) -> Result<Vec<Value>> {
    let mut reader = Reader::for_str(text);
    let mut forms = Vec::new();
    while let Some(form) = reader.read()? {
        forms.push(form);
    }
    Ok(forms)
}

impl<S: CharSource> Reader<S> {
    pub fn new(source: S) -> Self {
        let mut reader = Reader {
            source,
            line: 1,
            column: 0,
            macros: FxHashMap::default(),
            dispatch: FxHashMap::default(),
            namespace: InternedSymbol::new("user"),
            fn_args: None,
        };
        reader.install_defaults();
        reader
    }

    /// Set the namespace used for `::keyword`
    pub fn with_namespace(mut self, namespace: InternedSymbol) -> Self {
        self.namespace = namespace;
        self
    }

    pub fn set_namespace(&mut self, namespace: InternedSymbol) {
        self.namespace = namespace;
    }

    pub fn register_macro(&mut self, c: char, handler: MacroFn<S>) {
        self.macros.insert(c, handler);
    }

    pub fn register_dispatch(&mut self, c: char, handler: MacroFn<S>) {
        self.dispatch.insert(c, handler);
    }

    fn install_defaults(&mut self) {
        self.register_macro('(', Self::read_list);
        self.register_macro('[', Self::read_vector);
        self.register_macro('{', Self::read_map);
        self.register_macro(')', Self::unmatched);
        self.register_macro(']', Self::unmatched);
        self.register_macro('}', Self::unmatched);
        self.register_macro('"', Self::read_string);
        self.register_macro('\\', Self::read_char);
        self.register_macro('\'', |r, _| r.wrap("quote"));
        self.register_macro('`', |r, _| r.wrap("syntax-quote"));
        self.register_macro('~', Self::read_unquote);
        self.register_macro('@', |r, _| r.wrap("deref"));
        self.register_macro('^', Self::read_meta);
        self.register_macro(':', Self::read_keyword);
        self.register_macro('#', Self::read_dispatch);

        self.register_dispatch('{', Self::read_set);
        self.register_dispatch('_', Self::read_discard);
        self.register_dispatch('\'', |r, _| r.wrap("var"));
        self.register_dispatch('(', Self::read_fn_literal);
        self.register_dispatch('#', Self::read_symbolic_value);
    }

    pub fn line(&self) -> usize {
        self.line
    }

    pub fn column(&self) -> usize {
        self.column
    }

    /// Read one top-level form; `Ok(None)` at end of input
    pub fn read(&mut self) -> Result<Option<Value>> {
        loop {
            self.skip_whitespace();
            let Some(c) = self.source.peek() else {
                return Ok(None);
            };
            if let Some(form) = self.read_one(c)? {
                return Ok(Some(form));
            }
        }
    }

    fn error(&self, message: impl Into<String>) -> Error {
        Error::syntax(message, self.line, self.column)
    }

    fn next_char(&mut self) -> Option<char> {
        let c = self.source.next()?;
        if c == '\n' {
            self.line += 1;
            self.column = 0;
        } else {
            self.column += 1;
        }
        Some(c)
    }

    fn skip_whitespace(&mut self) {
        while let Some(c) = self.source.peek() {
            if c.is_whitespace() || c == ',' {
                self.next_char();
            } else if c == ';' {
                while let Some(c) = self.next_char() {
                    if c == '\n' {
                        break;
                    }
                }
            } else {
                break;
            }
        }
    }

    fn is_terminator(&self, c: char) -> bool {
        c.is_whitespace()
            || c == ','
            || c == ';'
            || (self.macros.contains_key(&c) && !matches!(c, '#' | '\'' | ':'))
    }

    fn read_one(&mut self, c: char) -> Result<Option<Value>> {
        if let Some(handler) = self.macros.get(&c).copied() {
            self.next_char();
            return handler(self, c);
        }
        let token = self.read_token();
        self.interpret_token(&token).map(Some)
    }

    fn read_token(&mut self) -> String {
        let mut token = String::new();
        while let Some(c) = self.source.peek() {
            if self.is_terminator(c) {
                break;
            }
            token.push(c);
            self.next_char();
        }
        token
    }

    /// The next form, failing at end of input
    fn read_required(&mut self, context: &str) -> Result<Value> {
        loop {
            self.skip_whitespace();
            let Some(c) = self.source.peek() else {
                return Err(self.error(format!("EOF while reading {context}")));
            };
            if let Some(form) = self.read_one(c)? {
                return Ok(form);
            }
        }
    }

    fn read_delimited(&mut self, close: char) -> Result<Vec<Value>> {
        let start = self.line;
        let mut items = Vec::new();
        loop {
            self.skip_whitespace();
            match self.source.peek() {
                None => {
                    return Err(self.error(format!(
                        "EOF while reading, expected {close} to match line {start}"
                    )));
                }
                Some(c) if c == close => {
                    self.next_char();
                    return Ok(items);
                }
                Some(c) => {
                    if let Some(form) = self.read_one(c)? {
                        items.push(form);
                    }
                }
            }
        }
    }

    // ========================================================================
    // Tokens
    // ========================================================================

    fn interpret_token(&mut self, token: &str) -> Result<Value> {
        match token {
            "nil" => return Ok(Value::Nil),
            "true" => return Ok(Value::Bool(true)),
            "false" => return Ok(Value::Bool(false)),
            _ => {}
        }
        let unsigned = token.strip_prefix(['+', '-']).unwrap_or(token);
        if unsigned.starts_with(|c: char| c.is_ascii_digit()) {
            return self.parse_number(token).map(Value::Number);
        }
        if token.starts_with('%') {
            if let Some(args) = self.fn_args.as_mut() {
                return fn_arg(args, token).ok_or_else(|| {
                    Error::syntax(format!("Invalid token: {token}"), self.line, self.column)
                });
            }
        }
        if token.ends_with(':') || token.contains("::") {
            return Err(self.error(format!("Invalid token: {token}")));
        }
        Ok(Value::Symbol(Symbol::new(token)))
    }

    fn parse_number(&self, token: &str) -> Result<NumericType> {
        let (negative, body) = match token.as_bytes().first() {
            Some(b'-') => (true, &token[1..]),
            Some(b'+') => (false, &token[1..]),
            _ => (false, token),
        };
        let invalid = || self.error(format!("Invalid number: {token}"));
        let all_digits = |s: &str| !s.is_empty() && s.bytes().all(|b| b.is_ascii_digit());
        let radix_digits =
            |s: &str, radix: u32| !s.is_empty() && s.chars().all(|c| c.is_digit(radix));
        let signed = |n: BigInteger| if negative { -n } else { n };

        if let Some(digits) = body.strip_suffix('N') {
            if all_digits(digits) {
                let n = BigInteger::from_str(digits).map_err(|_| invalid())?;
                return Ok(NumericType::bigint(signed(n)));
            }
            return Err(invalid());
        }
        if let Some(decimal) = token.strip_suffix('M') {
            return NumericType::parse_bigfloat(decimal).ok_or_else(invalid);
        }
        if let Some(hex) = body.strip_prefix("0x").or_else(|| body.strip_prefix("0X")) {
            if !radix_digits(hex, 16) {
                return Err(invalid());
            }
            let n = BigInteger::from_str_radix(hex, 16).map_err(|_| invalid())?;
            return Ok(NumericType::integer(signed(n)));
        }
        if let Some((radix, digits)) = body.split_once(['r', 'R']) {
            if all_digits(radix) {
                let radix: u32 = radix.parse().map_err(|_| invalid())?;
                if !(2..=36).contains(&radix) {
                    return Err(self.error(format!("Radix out of range: {radix}")));
                }
                if !radix_digits(digits, radix) {
                    return Err(invalid());
                }
                let n = BigInteger::from_str_radix(digits, radix).map_err(|_| invalid())?;
                return Ok(NumericType::integer(signed(n)));
            }
        }
        if let Some((num, denom)) = body.split_once('/') {
            if all_digits(num) && all_digits(denom) {
                let num = BigInteger::from_str(num).map_err(|_| invalid())?;
                let denom = BigInteger::from_str(denom).map_err(|_| invalid())?;
                return NumericType::make_big_ratio(signed(num), denom)
                    .map_err(|_| self.error(format!("Divide by zero in ratio: {token}")));
            }
            return Err(invalid());
        }
        if all_digits(body) {
            return match token.parse::<i64>() {
                Ok(n) => Ok(NumericType::Int(n)),
                Err(_) => {
                    let n = BigInteger::from_str(body).map_err(|_| invalid())?;
                    Ok(NumericType::bigint(signed(n)))
                }
            };
        }
        if is_float_literal(body) {
            return token
                .parse::<f64>()
                .map(NumericType::Float)
                .map_err(|_| invalid());
        }
        Err(invalid())
    }

    // ========================================================================
    // Macro Characters
    // ========================================================================

    fn wrap(&mut self, head: &str) -> Result<Option<Value>> {
        let form = self.read_required(head)?;
        Ok(Some(Value::list(vec![Value::symbol(head), form])))
    }

    fn unmatched(r: &mut Self, c: char) -> Result<Option<Value>> {
        Err(r.error(format!("Unmatched delimiter: {c}")))
    }

    fn read_list(r: &mut Self, _c: char) -> Result<Option<Value>> {
        Ok(Some(Value::list(r.read_delimited(')')?)))
    }

    fn read_vector(r: &mut Self, _c: char) -> Result<Option<Value>> {
        Ok(Some(Value::vector(r.read_delimited(']')?)))
    }

    fn read_map(r: &mut Self, _c: char) -> Result<Option<Value>> {
        let items = r.read_delimited('}')?;
        if items.len() % 2 != 0 {
            return Err(r.error("Map literal must contain an even number of forms"));
        }
        let mut map = ArrayMap::new();
        for pair in items.chunks(2) {
            if map.contains_key(&pair[0]) {
                return Err(r.error(format!("Duplicate key: {}", pair[0])));
            }
            map = map.assoc(pair[0].clone(), pair[1].clone());
        }
        Ok(Some(Value::Map(map)))
    }

    fn read_set(r: &mut Self, _c: char) -> Result<Option<Value>> {
        let items = r.read_delimited('}')?;
        let mut set = PersistentSet::new();
        for item in items {
            if set.contains(&item) {
                return Err(r.error(format!("Duplicate key: {item}")));
            }
            set = set.add(item);
        }
        Ok(Some(Value::Set(set)))
    }

    fn read_string(r: &mut Self, _c: char) -> Result<Option<Value>> {
        let mut text = String::new();
        loop {
            match r.next_char() {
                None => return Err(r.error("EOF while reading string")),
                Some('"') => break,
                Some('\\') => {
                    let escaped = match r.next_char() {
                        None => return Err(r.error("EOF while reading string")),
                        Some('n') => '\n',
                        Some('t') => '\t',
                        Some('r') => '\r',
                        Some('b') => '\u{8}',
                        Some('f') => '\u{c}',
                        Some('0') => '\0',
                        Some('\\') => '\\',
                        Some('"') => '"',
                        Some('u') => {
                            let mut hex = String::new();
                            for _ in 0..4 {
                                match r.next_char() {
                                    Some(h) if h.is_ascii_hexdigit() => hex.push(h),
                                    _ => return Err(r.error("Invalid unicode escape")),
                                }
                            }
                            r.code_point(&hex)?
                        }
                        Some(other) => {
                            return Err(r.error(format!("Unsupported escape character: \\{other}")));
                        }
                    };
                    text.push(escaped);
                }
                Some(c) => text.push(c),
            }
        }
        Ok(Some(Value::String(Rc::from(text))))
    }

    fn code_point(&self, hex: &str) -> Result<char> {
        u32::from_str_radix(hex, 16)
            .ok()
            .and_then(char::from_u32)
            .ok_or_else(|| self.error(format!("Invalid unicode character: \\u{hex}")))
    }

    fn read_char(r: &mut Self, _c: char) -> Result<Option<Value>> {
        let Some(first) = r.next_char() else {
            return Err(r.error("EOF while reading character"));
        };
        let mut token = String::from(first);
        while let Some(c) = r.source.peek() {
            if r.is_terminator(c) {
                break;
            }
            token.push(c);
            r.next_char();
        }
        if token.chars().count() == 1 {
            return Ok(Some(Value::Char(first)));
        }
        let c = match token.as_str() {
            "newline" => '\n',
            "space" => ' ',
            "tab" => '\t',
            "return" => '\r',
            "backspace" => '\u{8}',
            "formfeed" => '\u{c}',
            t if t.len() == 5 && t.starts_with('u') => r.code_point(&t[1..])?,
            _ => return Err(r.error(format!("Unsupported character: \\{token}"))),
        };
        Ok(Some(Value::Char(c)))
    }

    fn read_unquote(r: &mut Self, _c: char) -> Result<Option<Value>> {
        if r.source.peek() == Some('@') {
            r.next_char();
            return r.wrap("unquote-splicing");
        }
        r.wrap("unquote")
    }

    fn read_keyword(r: &mut Self, _c: char) -> Result<Option<Value>> {
        let auto = r.source.peek() == Some(':');
        if auto {
            r.next_char();
        }
        let token = r.read_token();
        if token.is_empty() || token.ends_with(':') || token.contains("::") {
            return Err(r.error(format!("Invalid token: :{token}")));
        }
        if auto {
            if token.contains('/') {
                return Err(r.error(format!("Invalid token: ::{token}")));
            }
            return Ok(Some(Value::Keyword(Keyword {
                ns: Some(r.namespace),
                name: InternedSymbol::new(&token),
            })));
        }
        Ok(Some(Value::Keyword(Keyword::new(&token))))
    }

    fn read_meta(r: &mut Self, _c: char) -> Result<Option<Value>> {
        let meta = match r.read_required("metadata")? {
            Value::Symbol(s) => ArrayMap::new().assoc(Value::keyword("tag"), Value::Symbol(s)),
            Value::String(s) => ArrayMap::new().assoc(Value::keyword("tag"), Value::String(s)),
            k @ Value::Keyword(_) => ArrayMap::new().assoc(k, Value::Bool(true)),
            Value::Map(m) => m,
            _ => {
                return Err(r.error(
                    "Metadata must be Symbol, Keyword, String or Map",
                ));
            }
        };
        let target = r.read_required("metadata target")?;
        if !matches!(
            target,
            Value::Symbol(_) | Value::List(_) | Value::Vector(_) | Value::Map(_) | Value::Set(_)
        ) {
            return Err(r.error(format!("Metadata can not be applied to {}", target.kind())));
        }
        let mut merged = target.meta().map(|m| (*m).clone()).unwrap_or_default();
        for (k, v) in meta.iter() {
            merged = merged.assoc(k.clone(), v.clone());
        }
        target.with_meta(Some(Rc::new(merged))).map(Some)
    }

    fn read_dispatch(r: &mut Self, _c: char) -> Result<Option<Value>> {
        let Some(c) = r.next_char() else {
            return Err(r.error("EOF while reading dispatch character"));
        };
        match r.dispatch.get(&c).copied() {
            Some(handler) => handler(r, c),
            None => Err(r.error(format!("No dispatch macro for: {c}"))),
        }
    }

    fn read_discard(r: &mut Self, _c: char) -> Result<Option<Value>> {
        r.read_required("discarded form")?;
        Ok(None)
    }

    fn read_symbolic_value(r: &mut Self, _c: char) -> Result<Option<Value>> {
        let token = r.read_token();
        let x = match token.as_str() {
            "Inf" => f64::INFINITY,
            "-Inf" => f64::NEG_INFINITY,
            "NaN" => f64::NAN,
            _ => return Err(r.error(format!("Unknown symbolic value: ##{token}"))),
        };
        Ok(Some(Value::float(x)))
    }

    fn read_fn_literal(r: &mut Self, _c: char) -> Result<Option<Value>> {
        if r.fn_args.is_some() {
            return Err(r.error("Nested #()s are not allowed"));
        }
        r.fn_args = Some(FnArgs::default());
        let body = r.read_delimited(')');
        let args = r.fn_args.take().unwrap_or_default();
        let body = body?;

        let mut params: Vec<Value> = (1..=args.max)
            .map(|i| Value::symbol(&format!("%{i}")))
            .collect();
        if args.rest {
            params.push(Value::symbol("&"));
            params.push(Value::symbol("%&"));
        }
        Ok(Some(Value::list(vec![
            Value::symbol("fn"),
            Value::vector(params),
            Value::list(body),
        ])))
    }
}

/// Map `%`, `%N` and `%&` inside `#(...)` to parameter symbols
fn fn_arg(args: &mut FnArgs, token: &str) -> Option<Value> {
    match token {
        "%" => {
            args.max = args.max.max(1);
            Some(Value::symbol("%1"))
        }
        "%&" => {
            args.rest = true;
            Some(Value::symbol("%&"))
        }
        _ => {
            let n: usize = token[1..].parse().ok().filter(|n| *n >= 1)?;
            args.max = args.max.max(n);
            Some(Value::symbol(token))
        }
    }
}

/// `digits[.digits][e[+-]digits]` with a fraction or an exponent
fn is_float_literal(s: &str) -> bool {
    let (mantissa, exponent) = match s.find(['e', 'E']) {
        Some(i) => (&s[..i], Some(&s[i + 1..])),
        None => (s, None),
    };
    let (int_part, frac) = match mantissa.split_once('.') {
        Some((i, f)) => (i, Some(f)),
        None => (mantissa, None),
    };
    let digits = |t: &str| t.bytes().all(|b| b.is_ascii_digit());
    if int_part.is_empty() || !digits(int_part) {
        return false;
    }
    if let Some(f) = frac {
        if !digits(f) {
            return false;
        }
    }
    match exponent {
        Some(e) => {
            let e = e.strip_prefix(['+', '-']).unwrap_or(e);
            !e.is_empty() && digits(e)
        }
        None => frac.is_some(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn read_one(text: &str) -> Value {
        Reader::for_str(text).read().unwrap().unwrap()
    }

    #[test]
    fn test_float_literal_grammar() {
        assert!(is_float_literal("1.5"));
        assert!(is_float_literal("1e10"));
        assert!(is_float_literal("2.5E-3"));
        assert!(is_float_literal("3."));
        assert!(!is_float_literal("12"));
        assert!(!is_float_literal("1e"));
        assert!(!is_float_literal("1.2.3"));
    }

    #[test]
    fn test_numbers() {
        assert_eq!(read_one("42"), Value::int(42));
        assert_eq!(read_one("-7"), Value::int(-7));
        assert_eq!(read_one("0x1F"), Value::int(31));
        assert_eq!(read_one("2r1010"), Value::int(10));
        assert_eq!(read_one("-0x10"), Value::int(-16));
        assert_eq!(read_one("-2r11"), Value::int(-3));
        assert_eq!(read_one("4/2"), Value::int(2));
        assert_eq!(read_one("1.5"), Value::float(1.5));
        assert!(matches!(
            read_one("9223372036854775808"),
            Value::Number(NumericType::BigInt(_))
        ));
        assert!(matches!(read_one("1N"), Value::Number(NumericType::BigInt(_))));
        assert!(matches!(read_one("1.5M"), Value::Number(NumericType::BigFloat(_))));
        assert!(matches!(read_one("1/3"), Value::Number(NumericType::Ratio(_))));
    }

    #[test]
    fn test_invalid_numbers() {
        let bad_inputs = [
            "1/0", "12abc", "1.2.3", "37r1", "0x-5", "0x+5", "-0x-1", "2r-101", "16r+F", "0x",
            "1E-999999999M",
        ];
        for bad in bad_inputs {
            let result = Reader::for_str(bad).read();
            assert!(matches!(result, Err(Error::Syntax { .. })), "{bad}");
        }
    }

    #[test]
    fn test_symbols_and_keywords() {
        assert_eq!(read_one("add'"), Value::symbol("add'"));
        assert_eq!(read_one("-"), Value::symbol("-"));
        assert_eq!(read_one("->>"), Value::symbol("->>"));
        assert_eq!(read_one(":a/b"), Value::keyword("a/b"));
        let auto = Reader::for_str("::k")
            .with_namespace(InternedSymbol::new("my.ns"))
            .read()
            .unwrap()
            .unwrap();
        assert_eq!(auto, Value::keyword("my.ns/k"));
    }

    #[test]
    fn test_strings_and_chars() {
        assert_eq!(read_one(r#""a\nb""#), Value::string("a\nb"));
        assert_eq!(read_one(r#""\u0041""#), Value::string("A"));
        assert_eq!(read_one(r"\a"), Value::Char('a'));
        assert_eq!(read_one(r"\newline"), Value::Char('\n'));
        assert_eq!(read_one(r"\("), Value::Char('('));
        assert!(Reader::for_str(r"\bogus").read().is_err());
        assert!(Reader::for_str("\"open").read().is_err());
    }

    #[test]
    fn test_quote_family() {
        assert_eq!(
            read_one("'x"),
            Value::list(vec![Value::symbol("quote"), Value::symbol("x")])
        );
        assert_eq!(
            read_one("~@xs"),
            Value::list(vec![Value::symbol("unquote-splicing"), Value::symbol("xs")])
        );
        assert_eq!(
            read_one("#'f"),
            Value::list(vec![Value::symbol("var"), Value::symbol("f")])
        );
        assert_eq!(
            read_one("@d"),
            Value::list(vec![Value::symbol("deref"), Value::symbol("d")])
        );
    }

    #[test]
    fn test_collections() {
        assert_eq!(
            read_one("[1, 2 3]"),
            Value::vector(vec![Value::int(1), Value::int(2), Value::int(3)])
        );
        assert!(matches!(read_one("{:a 1}"), Value::Map(m) if m.len() == 1));
        assert!(matches!(read_one("#{1 2}"), Value::Set(s) if s.len() == 2));
        assert!(Reader::for_str("{:a}").read().is_err());
        assert!(Reader::for_str("{:a 1 :a 2}").read().is_err());
        assert!(Reader::for_str("#{1 1}").read().is_err());
    }

    #[test]
    fn test_delimiter_errors() {
        assert!(Reader::for_str(")").read().is_err());
        match Reader::for_str("(1\n(2").read() {
            Err(Error::Syntax { line, .. }) => assert_eq!(line, 2),
            other => panic!("unexpected {other:?}"),
        }
    }

    #[test]
    fn test_comments_and_discard() {
        let forms = read_all("; comment\n1 #_ 2 3").unwrap();
        assert_eq!(forms, vec![Value::int(1), Value::int(3)]);
        assert!(Reader::for_str("  ; only a comment").read().unwrap().is_none());
    }

    #[test]
    fn test_fn_literal() {
        let form = read_one("#(+ % %3 %&)");
        assert_eq!(form.to_string(), "(fn [%1 %2 %3 & %&] (+ %1 %3 %&))");
        assert!(Reader::for_str("#(#(%))").read().is_err());
    }

    #[test]
    fn test_metadata() {
        let form = read_one("^:private x");
        let meta = form.meta().unwrap();
        assert_eq!(meta.get(&Value::keyword("private")), Some(&Value::Bool(true)));
        assert!(Reader::for_str("^:a 1").read().is_err());
    }

    #[test]
    fn test_symbolic_values() {
        match read_one("##NaN") {
            Value::Number(NumericType::Float(x)) => assert!(x.is_nan()),
            other => panic!("unexpected {other:?}"),
        }
        assert_eq!(read_one("##-Inf"), Value::float(f64::NEG_INFINITY));
    }

    #[test]
    fn test_custom_dispatch() {
        let mut reader = Reader::for_str("#!ignored 5");
        reader.register_dispatch('!', |r, _| {
            r.read_token();
            Ok(None)
        });
        assert_eq!(reader.read().unwrap(), Some(Value::int(5)));
    }
}
