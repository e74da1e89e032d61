//! Analyzer and macroexpander.
//!
//! Turns read forms into [`Expr`] trees. Special forms are recognized first,
//! then lexical locals, then macros, which are expanded to a fixpoint before
//! the result is analyzed. Local references become `(depth, slot)` pairs.
//! Each scope opened here (fn arity, `let`, `loop`, `catch`) corresponds to
//! exactly one frame at run time.

use std::rc::Rc;

use rustc_hash::FxHashMap;
use tracing::trace;

use crate::abstractions::to_vec;
use crate::collections::{ArrayMap, List, PersistentSet, PersistentVector};
use crate::error::{Error, ErrorKind, Result};
use crate::interner::InternedSymbol;
use crate::interpreter::{STACK_GROW_SIZE, STACK_RED_ZONE};
use crate::language::{Symbol, Value};
use crate::namespace::{CORE_NS, Registry, Var};
use crate::runtime::Runtime;

/// Heads handled by the analyzer itself
pub const SPECIAL_FORMS: &[&str] = &[
    "quote",
    "if",
    "do",
    "def",
    "fn",
    "let",
    "loop",
    "recur",
    "var",
    "throw",
    "try",
    "syntax-quote",
    "unquote",
    "unquote-splicing",
];

pub fn is_special_form(sym: &Symbol) -> bool {
    sym.is_simple() && sym.name.with_str(|name| SPECIAL_FORMS.contains(&name))
}

// ============================================================================
// Expressions
// ============================================================================

#[derive(Debug, Clone, PartialEq)]
pub enum Expr {
    Literal(Value),
    Local {
        depth: usize,
        slot: usize,
    },
    /// Dereferenced on evaluation
    Var(Rc<Var>),
    /// `(var x)`: the Var itself
    TheVar(Rc<Var>),
    If {
        test: Box<Expr>,
        then: Box<Expr>,
        otherwise: Box<Expr>,
    },
    Do(Vec<Expr>),
    Def {
        var: Rc<Var>,
        init: Option<Box<Expr>>,
        meta: Option<ArrayMap>,
    },
    /// Binding `i` lives in slot `i` of a fresh frame
    Let {
        bindings: Vec<Expr>,
        body: Box<Expr>,
    },
    Loop {
        bindings: Vec<Expr>,
        body: Box<Expr>,
    },
    Recur(Vec<Expr>),
    Fn(Rc<FnExpr>),
    Call {
        callee: Box<Expr>,
        args: Vec<Expr>,
    },
    Throw(Box<Expr>),
    Try(Box<TryExpr>),
    Vector(Vec<Expr>),
    Map(Vec<(Expr, Expr)>),
    Set(Vec<Expr>),
}

#[derive(Debug, PartialEq)]
pub struct FnExpr {
    pub name: Option<Symbol>,
    pub arities: Vec<Arity>,
}

/// One arity of a function. The call frame is laid out as
/// `[fn itself, fixed params..., rest param]`.
#[derive(Debug, PartialEq)]
pub struct Arity {
    pub params: usize,
    pub variadic: bool,
    pub body: Expr,
    pub frame_size: usize,
}

impl FnExpr {
    /// The arity accepting `argc` arguments. Fixed arities win over the
    /// variadic one.
    pub fn arity_for(&self, argc: usize) -> Option<&Arity> {
        self.arities
            .iter()
            .find(|a| !a.variadic && a.params == argc)
            .or_else(|| {
                self.arities
                    .iter()
                    .find(|a| a.variadic && argc >= a.params)
            })
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct TryExpr {
    pub body: Expr,
    pub catches: Vec<Catch>,
    pub finally: Option<Expr>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Catch {
    /// `None` catches every kind
    pub kind: Option<ErrorKind>,
    /// Runs in a one-slot frame holding the error value
    pub body: Expr,
}

// ============================================================================
// Resolution
// ============================================================================

/// Resolve a symbol to a Var: qualified symbols through aliases then the
/// registry, unqualified ones through the current namespace.
pub fn resolve_symbol(registry: &Registry, sym: &Symbol) -> Result<Option<Rc<Var>>> {
    let current = registry.current();
    let Some(ns_name) = sym.ns else {
        return Ok(current.lookup(sym.name));
    };
    let ns = current
        .resolve_alias(ns_name)
        .or_else(|| registry.find_namespace(ns_name))
        .ok_or_else(|| Error::analysis(format!("No such namespace: {ns_name}")))?;
    match ns.find_own(sym.name) {
        Some(var) if var.is_private() && !Rc::ptr_eq(&ns, &current) => Err(Error::analysis(
            format!("var: #'{} is not public", var.qualified_name()),
        )),
        found => Ok(found),
    }
}

fn quote(form: Value) -> Value {
    Value::list(vec![Value::symbol("quote"), form])
}

fn core_symbol(name: &str) -> Value {
    Value::Symbol(Symbol::qualified(CORE_NS, name))
}

fn core_call(name: &str, args: Vec<Value>) -> Value {
    let mut items = Vec::with_capacity(args.len() + 1);
    items.push(core_symbol(name));
    items.extend(args);
    Value::list(items)
}

/// Forms of a list or seq; `None` for anything else
fn list_items(form: &Value) -> Result<Option<Vec<Value>>> {
    match form {
        Value::List(list) => Ok(Some(list.iter().cloned().collect())),
        Value::Seq(_) => to_vec(form).map(Some),
        _ => Ok(None),
    }
}

fn head_is(items: &[Value], name: &str) -> bool {
    matches!(items.first(), Some(Value::Symbol(s)) if s.is(name))
}

// ============================================================================
// Analyzer
// ============================================================================

struct Scope {
    /// Slot names; `None` for an unnamed slot
    names: Vec<Option<InternedSymbol>>,
}

#[derive(Debug, Clone, Copy)]
enum Recur {
    None,
    AcrossTry,
    /// Number of values the target rebinds
    Target(usize),
}

#[derive(Debug, Clone, Copy)]
struct Ctx {
    tail: bool,
    recur: Recur,
}

impl Ctx {
    const TOP: Ctx = Ctx {
        tail: false,
        recur: Recur::None,
    };

    fn operand(self) -> Ctx {
        Ctx {
            tail: false,
            ..self
        }
    }
}

pub(crate) struct Analyzer<'a> {
    rt: &'a Runtime,
    scopes: Vec<Scope>,
}

impl<'a> Analyzer<'a> {
    pub(crate) fn new(rt: &'a Runtime) -> Self {
        Analyzer {
            rt,
            scopes: Vec::new(),
        }
    }

    pub(crate) fn analyze(&mut self, form: &Value) -> Result<Expr> {
        self.analyze_in(form, Ctx::TOP)
    }

    fn error<T>(&self, message: impl Into<String>) -> Result<T> {
        Err(Error::analysis(message))
    }

    fn lookup_local(&self, name: InternedSymbol) -> Option<(usize, usize)> {
        for (depth, scope) in self.scopes.iter().rev().enumerate() {
            if let Some(slot) = scope.names.iter().rposition(|n| *n == Some(name)) {
                return Some((depth, slot));
            }
        }
        None
    }

    fn is_local(&self, sym: &Symbol) -> bool {
        sym.is_simple() && self.lookup_local(sym.name).is_some()
    }

    fn with_scope<T>(
        &mut self,
        names: Vec<Option<InternedSymbol>>,
        f: impl FnOnce(&mut Self) -> Result<T>,
    ) -> Result<T> {
        self.scopes.push(Scope { names });
        let result = f(self);
        self.scopes.pop();
        result
    }

    fn bind_in_scope(&mut self, name: InternedSymbol) {
        if let Some(scope) = self.scopes.last_mut() {
            scope.names.push(Some(name));
        }
    }

    // ------------------------------------------------------------------------
    // Macroexpansion
    // ------------------------------------------------------------------------

    /// Expand `form` once if its head names a macro not shadowed by a local
    pub(crate) fn macroexpand_1(&mut self, form: &Value) -> Result<Option<Value>> {
        let Some(items) = list_items(form)? else {
            return Ok(None);
        };
        let Some(Value::Symbol(head)) = items.first() else {
            return Ok(None);
        };
        if is_special_form(head) || self.is_local(head) {
            return Ok(None);
        }
        let var = match resolve_symbol(self.rt.registry(), head) {
            Ok(Some(var)) if var.is_macro() => var,
            _ => return Ok(None),
        };
        let expander = var.deref()?;
        let expanded = self.rt.apply(&expander, &items[1..])?;
        trace!(macro_name = %var.qualified_name(), "expanded macro");
        Ok(Some(expanded))
    }

    /// Expand until the head is no longer a macro, giving up after
    /// `RuntimeConfig::max_expansion_steps` expansions of one form
    pub(crate) fn expand(&mut self, form: &Value) -> Result<Value> {
        let limit = self.rt.config().max_expansion_steps;
        let mut current = form.clone();
        for _ in 0..limit {
            match self.macroexpand_1(&current)? {
                Some(next) => current = next,
                None => return Ok(current),
            }
        }
        Err(Error::internal(format!(
            "macroexpansion did not terminate after {limit} steps"
        )))
    }

    // ------------------------------------------------------------------------
    // Dispatch
    // ------------------------------------------------------------------------

    fn analyze_in(&mut self, form: &Value, ctx: Ctx) -> Result<Expr> {
        stacker::maybe_grow(STACK_RED_ZONE, STACK_GROW_SIZE, || self.analyze_form(form, ctx))
    }

    fn analyze_form(&mut self, form: &Value, ctx: Ctx) -> Result<Expr> {
        match form {
            Value::Symbol(sym) => self.analyze_symbol(sym),
            Value::List(_) | Value::Seq(_) => self.analyze_seq(form, ctx),
            Value::Vector(vec) => {
                let mut exprs = Vec::with_capacity(vec.len());
                for item in vec.iter() {
                    exprs.push(self.analyze_in(item, ctx.operand())?);
                }
                match literals(&exprs) {
                    Some(values) => Ok(Expr::Literal(Value::Vector(
                        PersistentVector::from_vec(values).with_meta(vec.meta().clone()),
                    ))),
                    None => Ok(Expr::Vector(exprs)),
                }
            }
            Value::Map(map) => {
                let mut keys = Vec::with_capacity(map.len());
                let mut vals = Vec::with_capacity(map.len());
                for (k, v) in map.iter() {
                    keys.push(self.analyze_in(k, ctx.operand())?);
                    vals.push(self.analyze_in(v, ctx.operand())?);
                }
                match (literals(&keys), literals(&vals)) {
                    (Some(ks), Some(vs)) => Ok(Expr::Literal(Value::Map(
                        ArrayMap::from_pairs(ks.into_iter().zip(vs)).with_meta(map.meta().clone()),
                    ))),
                    _ => Ok(Expr::Map(keys.into_iter().zip(vals).collect())),
                }
            }
            Value::Set(set) => {
                let mut exprs = Vec::with_capacity(set.len());
                for item in set.iter() {
                    exprs.push(self.analyze_in(item, ctx.operand())?);
                }
                match literals(&exprs) {
                    Some(values) => Ok(Expr::Literal(Value::Set(
                        values
                            .into_iter()
                            .collect::<PersistentSet>()
                            .with_meta(set.meta().clone()),
                    ))),
                    None => Ok(Expr::Set(exprs)),
                }
            }
            _ => Ok(Expr::Literal(form.clone())),
        }
    }

    fn analyze_symbol(&mut self, sym: &Symbol) -> Result<Expr> {
        if sym.is_simple() {
            if let Some((depth, slot)) = self.lookup_local(sym.name) {
                return Ok(Expr::Local { depth, slot });
            }
        }
        let var = self.resolve_required(sym)?;
        if var.is_macro() {
            return self.error(format!(
                "Can't take value of a macro: #'{}",
                var.qualified_name()
            ));
        }
        Ok(Expr::Var(var))
    }

    fn resolve_required(&self, sym: &Symbol) -> Result<Rc<Var>> {
        match resolve_symbol(self.rt.registry(), sym)? {
            Some(var) => Ok(var),
            None if sym.is_simple() => {
                self.error(format!("Unable to resolve symbol: {sym} in this context"))
            }
            None => self.error(format!("No such var: {sym}")),
        }
    }

    fn analyze_seq(&mut self, form: &Value, ctx: Ctx) -> Result<Expr> {
        let form = self.expand(form)?;
        let Some(items) = list_items(&form)? else {
            return self.analyze_in(&form, ctx);
        };
        if items.is_empty() {
            return Ok(Expr::Literal(Value::List(List::empty())));
        }
        if let Value::Symbol(head) = &items[0] {
            if is_special_form(head) {
                let name = head.name.resolve();
                return self.analyze_special(&name, &items, ctx);
            }
        }
        let callee = self.analyze_in(&items[0], ctx.operand())?;
        let mut args = Vec::with_capacity(items.len() - 1);
        for arg in &items[1..] {
            args.push(self.analyze_in(arg, ctx.operand())?);
        }
        Ok(Expr::Call {
            callee: Box::new(callee),
            args,
        })
    }

    fn analyze_special(&mut self, name: &str, items: &[Value], ctx: Ctx) -> Result<Expr> {
        match name {
            "quote" => {
                self.expect_args("quote", items, 1)?;
                Ok(Expr::Literal(items[1].clone()))
            }
            "if" => self.analyze_if(items, ctx),
            "do" => self.analyze_body(&items[1..], ctx),
            "def" => self.analyze_def(items, ctx),
            "fn" => self.analyze_fn(items),
            "let" => self.analyze_let(items, ctx, false),
            "loop" => self.analyze_let(items, ctx, true),
            "recur" => self.analyze_recur(items, ctx),
            "var" => {
                self.expect_args("var", items, 1)?;
                match &items[1] {
                    Value::Symbol(sym) => Ok(Expr::TheVar(self.resolve_required(sym)?)),
                    other => self.error(format!("var requires a symbol, got {}", other.kind())),
                }
            }
            "throw" => {
                self.expect_args("throw", items, 1)?;
                let value = self.analyze_in(&items[1], ctx.operand())?;
                Ok(Expr::Throw(Box::new(value)))
            }
            "try" => self.analyze_try(items, ctx),
            "syntax-quote" => {
                self.expect_args("syntax-quote", items, 1)?;
                let mut gensyms = FxHashMap::default();
                let expanded = self.syntax_quote(&items[1], &mut gensyms)?;
                self.analyze_in(&expanded, ctx)
            }
            _ => self.error(format!("{name} used outside of syntax-quote")),
        }
    }

    fn expect_args(&self, form: &str, items: &[Value], n: usize) -> Result<()> {
        let got = items.len() - 1;
        if got != n {
            return self.error(format!("Wrong number of args ({got}) passed to {form}"));
        }
        Ok(())
    }

    /// `do` semantics: every form but the last is evaluated for effect
    fn analyze_body(&mut self, forms: &[Value], ctx: Ctx) -> Result<Expr> {
        match forms {
            [] => Ok(Expr::Literal(Value::Nil)),
            [only] => self.analyze_in(only, ctx),
            [init @ .., last] => {
                let mut exprs = Vec::with_capacity(forms.len());
                for form in init {
                    exprs.push(self.analyze_in(form, ctx.operand())?);
                }
                exprs.push(self.analyze_in(last, ctx)?);
                Ok(Expr::Do(exprs))
            }
        }
    }

    // ------------------------------------------------------------------------
    // Special Forms
    // ------------------------------------------------------------------------

    fn analyze_if(&mut self, items: &[Value], ctx: Ctx) -> Result<Expr> {
        if items.len() < 3 {
            return self.error("Too few arguments to if");
        }
        if items.len() > 4 {
            return self.error("Too many arguments to if");
        }
        let test = self.analyze_in(&items[1], ctx.operand())?;
        let then = self.analyze_in(&items[2], ctx)?;
        let otherwise = match items.get(3) {
            Some(form) => self.analyze_in(form, ctx)?,
            None => Expr::Literal(Value::Nil),
        };
        Ok(Expr::If {
            test: Box::new(test),
            then: Box::new(then),
            otherwise: Box::new(otherwise),
        })
    }

    fn analyze_def(&mut self, items: &[Value], ctx: Ctx) -> Result<Expr> {
        if items.len() < 2 {
            return self.error("Too few arguments to def");
        }
        if items.len() > 4 {
            return self.error("Too many arguments to def");
        }
        let Value::Symbol(name) = &items[1] else {
            return self.error("First argument to def must be a Symbol");
        };
        let current = self.rt.registry().current();
        if let Some(ns) = name.ns {
            if ns != current.name() {
                return self.error(format!("Can't create defs outside of current ns: {name}"));
            }
        }
        let (doc, init) = match &items[2..] {
            [] => (None, None),
            [init] => (None, Some(init)),
            [Value::String(doc), init] => (Some(doc.clone()), Some(init)),
            _ => return self.error("Too many arguments to def"),
        };

        let var = current.intern(name.name);
        let mut meta = name.meta.as_ref().map(|m| (**m).clone()).unwrap_or_default();
        if let Some(doc) = doc {
            meta = meta.assoc(Value::keyword("doc"), Value::String(doc));
        }
        let init = match init {
            Some(form) => Some(Box::new(self.analyze_in(form, ctx.operand())?)),
            None => None,
        };
        Ok(Expr::Def {
            var,
            init,
            meta: if meta.is_empty() { None } else { Some(meta) },
        })
    }

    fn analyze_fn(&mut self, items: &[Value]) -> Result<Expr> {
        let mut rest = &items[1..];
        let name = match rest.first() {
            Some(Value::Symbol(sym)) => {
                rest = &rest[1..];
                Some(sym.clone())
            }
            _ => None,
        };

        let mut clauses: Vec<(PersistentVector, Vec<Value>)> = Vec::new();
        match rest.first() {
            Some(Value::Vector(params)) => clauses.push((params.clone(), rest[1..].to_vec())),
            Some(_) => {
                for clause in rest {
                    match list_items(clause)? {
                        Some(forms) => match forms.first() {
                            Some(Value::Vector(params)) => {
                                clauses.push((params.clone(), forms[1..].to_vec()))
                            }
                            _ => return self.error("Parameter declaration missing"),
                        },
                        None => {
                            return self.error(format!(
                                "Invalid fn clause, expected a list, got {}",
                                clause.kind()
                            ));
                        }
                    }
                }
            }
            None => return self.error("Parameter declaration missing"),
        }

        let mut arities = Vec::with_capacity(clauses.len());
        for (params, body) in &clauses {
            arities.push(self.analyze_arity(name.as_ref(), params, body)?);
        }
        self.check_arities(&arities)?;
        Ok(Expr::Fn(Rc::new(FnExpr { name, arities })))
    }

    fn analyze_arity(
        &mut self,
        name: Option<&Symbol>,
        params: &PersistentVector,
        body: &[Value],
    ) -> Result<Arity> {
        let (fixed, rest) = self.parse_params(params)?;
        let mut names = Vec::with_capacity(fixed.len() + 2);
        names.push(name.filter(|s| s.is_simple()).map(|s| s.name));
        names.extend(fixed.iter().map(|p| Some(*p)));
        names.extend(rest.map(Some));
        let frame_size = names.len();
        let recur_count = fixed.len() + usize::from(rest.is_some());

        let body = self.with_scope(names, |a| {
            a.analyze_body(
                body,
                Ctx {
                    tail: true,
                    recur: Recur::Target(recur_count),
                },
            )
        })?;
        Ok(Arity {
            params: fixed.len(),
            variadic: rest.is_some(),
            body,
            frame_size,
        })
    }

    fn parse_params(
        &self,
        params: &PersistentVector,
    ) -> Result<(Vec<InternedSymbol>, Option<InternedSymbol>)> {
        let mut fixed = Vec::new();
        let mut iter = params.iter();
        while let Some(param) = iter.next() {
            let Value::Symbol(sym) = param else {
                return self.error(format!("Invalid parameter: {param}"));
            };
            if !sym.is_simple() {
                return self.error(format!("Can't use qualified name as parameter: {sym}"));
            }
            if sym.is("&") {
                let rest = match (iter.next(), iter.next()) {
                    (Some(Value::Symbol(r)), None) if r.is_simple() && !r.is("&") => r.name,
                    _ => return self.error("& must be followed by exactly one symbol"),
                };
                return Ok((fixed, Some(rest)));
            }
            fixed.push(sym.name);
        }
        Ok((fixed, None))
    }

    fn check_arities(&self, arities: &[Arity]) -> Result<()> {
        let variadic: Vec<&Arity> = arities.iter().filter(|a| a.variadic).collect();
        if variadic.len() > 1 {
            return self.error("Can't have more than 1 variadic overload");
        }
        let mut seen = Vec::new();
        for arity in arities.iter().filter(|a| !a.variadic) {
            if seen.contains(&arity.params) {
                return self.error("Can't have 2 overloads with same arity");
            }
            seen.push(arity.params);
            if let Some(v) = variadic.first() {
                if arity.params > v.params {
                    return self.error(
                        "Can't have fixed arity function with more params than variadic function",
                    );
                }
            }
        }
        Ok(())
    }

    fn analyze_let(&mut self, items: &[Value], ctx: Ctx, is_loop: bool) -> Result<Expr> {
        let form = if is_loop { "loop" } else { "let" };
        let Some(Value::Vector(bindings)) = items.get(1) else {
            return self.error(format!("{form} requires a vector for its binding"));
        };
        if bindings.len() % 2 != 0 {
            return self.error(format!(
                "{form} requires an even number of forms in binding vector"
            ));
        }
        let pairs: Vec<Value> = bindings.iter().cloned().collect();
        let body = &items[2..];

        self.with_scope(Vec::new(), |a| {
            let mut inits = Vec::with_capacity(pairs.len() / 2);
            for pair in pairs.chunks(2) {
                let name = match &pair[0] {
                    Value::Symbol(sym) if sym.is_simple() => sym.name,
                    other => {
                        return a.error(format!("Bad binding form, expected symbol, got: {other}"));
                    }
                };
                inits.push(a.analyze_in(&pair[1], ctx.operand())?);
                a.bind_in_scope(name);
            }
            if is_loop {
                let body = a.analyze_body(
                    body,
                    Ctx {
                        tail: true,
                        recur: Recur::Target(inits.len()),
                    },
                )?;
                Ok(Expr::Loop {
                    bindings: inits,
                    body: Box::new(body),
                })
            } else {
                let body = a.analyze_body(body, ctx)?;
                Ok(Expr::Let {
                    bindings: inits,
                    body: Box::new(body),
                })
            }
        })
    }

    fn analyze_recur(&mut self, items: &[Value], ctx: Ctx) -> Result<Expr> {
        let expected = match ctx.recur {
            Recur::AcrossTry => return self.error("Cannot recur across try"),
            Recur::None => return self.error("Can only recur from tail position"),
            Recur::Target(_) if !ctx.tail => {
                return self.error("Can only recur from tail position");
            }
            Recur::Target(n) => n,
        };
        let got = items.len() - 1;
        if got != expected {
            return self.error(format!(
                "Mismatched argument count to recur, expected: {expected} args, got: {got}"
            ));
        }
        let mut args = Vec::with_capacity(got);
        for arg in &items[1..] {
            args.push(self.analyze_in(arg, ctx.operand())?);
        }
        Ok(Expr::Recur(args))
    }

    fn analyze_try(&mut self, items: &[Value], ctx: Ctx) -> Result<Expr> {
        let guarded = Ctx {
            tail: ctx.tail,
            recur: Recur::AcrossTry,
        };
        let mut body_forms = Vec::new();
        let mut catch_forms = Vec::new();
        let mut finally_forms: Option<Vec<Value>> = None;

        for form in &items[1..] {
            let clause = list_items(form)?;
            match clause {
                Some(parts) if head_is(&parts, "catch") => {
                    if finally_forms.is_some() {
                        return self.error("finally clause must be last in try expression");
                    }
                    catch_forms.push(parts);
                }
                Some(parts) if head_is(&parts, "finally") => {
                    if finally_forms.is_some() {
                        return self.error("Only one finally clause allowed in try expression");
                    }
                    finally_forms = Some(parts[1..].to_vec());
                }
                _ => {
                    if !catch_forms.is_empty() || finally_forms.is_some() {
                        return self.error(
                            "Only catch or finally clause can follow catch in try expression",
                        );
                    }
                    body_forms.push(form.clone());
                }
            }
        }

        let body = self.analyze_body(&body_forms, guarded)?;
        let mut catches = Vec::with_capacity(catch_forms.len());
        for parts in &catch_forms {
            catches.push(self.analyze_catch(parts, guarded)?);
        }
        let finally = match finally_forms {
            Some(forms) => Some(self.analyze_body(&forms, guarded.operand())?),
            None => None,
        };
        Ok(Expr::Try(Box::new(TryExpr {
            body,
            catches,
            finally,
        })))
    }

    fn analyze_catch(&mut self, parts: &[Value], ctx: Ctx) -> Result<Catch> {
        if parts.len() < 3 {
            return self.error("catch requires an error kind and a binding");
        }
        let kind = match &parts[1] {
            Value::Symbol(sym) if sym.is("Error") => None,
            Value::Symbol(sym) if sym.is_simple() => {
                match sym.name.with_str(ErrorKind::from_name) {
                    Some(kind) => Some(kind),
                    None => return self.error(format!("Unknown error kind in catch: {sym}")),
                }
            }
            other => return self.error(format!("Unknown error kind in catch: {other}")),
        };
        let binding = match &parts[2] {
            Value::Symbol(sym) if sym.is_simple() => sym.name,
            other => return self.error(format!("Bad binding form in catch: {other}")),
        };
        let body = self.with_scope(vec![Some(binding)], |a| a.analyze_body(&parts[3..], ctx))?;
        Ok(Catch { kind, body })
    }

    // ------------------------------------------------------------------------
    // Syntax-quote
    // ------------------------------------------------------------------------

    fn syntax_quote(
        &mut self,
        form: &Value,
        gensyms: &mut FxHashMap<InternedSymbol, Symbol>,
    ) -> Result<Value> {
        Ok(match form {
            Value::Symbol(sym) => quote(Value::Symbol(self.qualify(sym, gensyms))),
            Value::List(_) | Value::Seq(_) => {
                let items = to_vec(form)?;
                if head_is(&items, "unquote") {
                    if items.len() != 2 {
                        return self.error("unquote takes exactly one form");
                    }
                    return Ok(items[1].clone());
                }
                if head_is(&items, "unquote-splicing") {
                    return self.error("unquote-splicing used outside of a collection");
                }
                core_call("concat*", self.splice_parts(&items, gensyms)?)
            }
            Value::Vector(vec) => {
                let items: Vec<Value> = vec.iter().cloned().collect();
                let parts = self.splice_parts(&items, gensyms)?;
                core_call("vec*", vec![core_call("concat*", parts)])
            }
            Value::Map(map) => {
                let items: Vec<Value> = map
                    .iter()
                    .flat_map(|(k, v)| [k.clone(), v.clone()])
                    .collect();
                let parts = self.splice_parts(&items, gensyms)?;
                core_call(
                    "apply*",
                    vec![core_symbol("hash-map*"), core_call("concat*", parts)],
                )
            }
            Value::Set(set) => {
                let items: Vec<Value> = set.iter().cloned().collect();
                let parts = self.splice_parts(&items, gensyms)?;
                core_call(
                    "apply*",
                    vec![core_symbol("hash-set*"), core_call("concat*", parts)],
                )
            }
            Value::Nil
            | Value::Bool(_)
            | Value::Number(_)
            | Value::Char(_)
            | Value::String(_)
            | Value::Keyword(_) => form.clone(),
            _ => quote(form.clone()),
        })
    }

    /// One `concat*` argument per element: spliced seqs as they are, other
    /// elements wrapped in a one-element list
    fn splice_parts(
        &mut self,
        items: &[Value],
        gensyms: &mut FxHashMap<InternedSymbol, Symbol>,
    ) -> Result<Vec<Value>> {
        let mut parts = Vec::with_capacity(items.len());
        for item in items {
            if let Some(inner) = list_items(item)? {
                if head_is(&inner, "unquote-splicing") {
                    if inner.len() != 2 {
                        return self.error("unquote-splicing takes exactly one form");
                    }
                    parts.push(inner[1].clone());
                    continue;
                }
            }
            let quoted = self.syntax_quote(item, gensyms)?;
            parts.push(core_call("list**", vec![quoted]));
        }
        Ok(parts)
    }

    fn qualify(&self, sym: &Symbol, gensyms: &mut FxHashMap<InternedSymbol, Symbol>) -> Symbol {
        let registry = self.rt.registry();
        if let Some(ns) = sym.ns {
            return match registry.current().resolve_alias(ns) {
                Some(target) => Symbol::from_parts(Some(target.name()), sym.name),
                None => Symbol::from_parts(sym.ns, sym.name),
            };
        }
        if is_special_form(sym) || sym.is("&") || sym.is("catch") || sym.is("finally") {
            return Symbol::from_parts(None, sym.name);
        }
        let name = sym.name.resolve();
        if let Some(base) = name.strip_suffix('#') {
            let rt = self.rt;
            return gensyms
                .entry(sym.name)
                .or_insert_with(|| {
                    Symbol::simple(&format!("{base}__{}__auto__", rt.next_gensym_id()))
                })
                .clone();
        }
        match resolve_symbol(registry, sym) {
            Ok(Some(var)) => var.symbol(),
            _ => Symbol::from_parts(Some(registry.current().name()), sym.name),
        }
    }
}

/// The values of an all-literal expression list
fn literals(exprs: &[Expr]) -> Option<Vec<Value>> {
    exprs
        .iter()
        .map(|e| match e {
            Expr::Literal(v) => Some(v.clone()),
            _ => None,
        })
        .collect()
}
