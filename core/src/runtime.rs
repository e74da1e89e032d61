//! The runtime context.
//!
//! A [`Runtime`] owns everything one program needs: the namespace registry,
//! the frame arena, the output sink and the configuration. Tests create as
//! many isolated runtimes as they like. A runtime is single-threaded and is
//! always handled through an `Rc`, because lazy sequences and delays call
//! back into it through a weak handle.

use std::cell::{Cell, RefCell};
use std::io::Write;
use std::rc::{Rc, Weak};

use rustc_hash::FxHashSet;
use tracing::{debug, error};

use crate::analyzer::{Analyzer, Expr, FnExpr, resolve_symbol};
use crate::collections::{Invoke, Seq};
use crate::environment::{Env, Environment};
use crate::error::{Error, Result};
use crate::interner::InternedSymbol;
use crate::language::{Symbol, Value};
use crate::namespace::{Namespace, Registry, Var};
use crate::reader::Reader;
use crate::stdlib;

/// Library evaluated into the core namespace at startup
const BOOTSTRAP: &str = include_str!("bootstrap/core.clj");

// ============================================================================
// Configuration
// ============================================================================

#[derive(Debug, Clone)]
pub struct RuntimeConfig {
    /// Evaluate the bootstrap library; without it only natives are defined
    pub load_bootstrap: bool,
    /// Live frame count above which the top-level driver collects
    pub gc_threshold: usize,
    /// Maximum nesting of function calls before an error is raised
    pub max_call_depth: usize,
    /// Expansions of a single form before macroexpansion is abandoned
    pub max_expansion_steps: usize,
    /// Namespace made current once startup finishes
    pub user_namespace: String,
}

impl Default for RuntimeConfig {
    fn default() -> Self {
        RuntimeConfig {
            load_bootstrap: true,
            gc_threshold: 10_000,
            max_call_depth: 10_000,
            max_expansion_steps: 100_000,
            user_namespace: "user".to_string(),
        }
    }
}

// ============================================================================
// Runtime
// ============================================================================

pub struct Runtime {
    config: RuntimeConfig,
    registry: Registry,
    pub(crate) env: RefCell<Environment>,
    output: RefCell<Box<dyn Write>>,
    gensym: Cell<u64>,
    pub(crate) depth: Cell<usize>,
    /// Nesting of driver entry points; collection only runs at zero
    loads: Cell<usize>,
    /// Result of the last top-level form, kept alive across collections
    last: RefCell<Value>,
    self_ref: Weak<Runtime>,
}

impl Runtime {
    pub fn new() -> Result<Rc<Runtime>> {
        Runtime::with_config(RuntimeConfig::default())
    }

    pub fn with_config(config: RuntimeConfig) -> Result<Rc<Runtime>> {
        let rt = Rc::new_cyclic(|me| Runtime {
            config,
            registry: Registry::new(),
            env: RefCell::new(Environment::new()),
            output: RefCell::new(Box::new(std::io::stdout())),
            gensym: Cell::new(0),
            depth: Cell::new(0),
            loads: Cell::new(0),
            last: RefCell::new(Value::Nil),
            self_ref: me.clone(),
        });
        rt.bootstrap()?;
        Ok(rt)
    }

    fn bootstrap(&self) -> Result<()> {
        let core = self.registry.core();
        let count = stdlib::install(&core);
        debug!(natives = count, "registered native procedures");

        if self.config.load_bootstrap {
            self.registry.set_current(core.clone());
            self.eval_str(BOOTSTRAP)?;
            debug!(vars = core.own_vars().len(), "loaded bootstrap library");
        }

        let user = self
            .registry
            .ensure_namespace(InternedSymbol::new(&self.config.user_namespace));
        self.registry.set_current(user);
        Ok(())
    }

    pub fn config(&self) -> &RuntimeConfig {
        &self.config
    }

    pub fn registry(&self) -> &Registry {
        &self.registry
    }

    pub fn current_namespace(&self) -> Rc<Namespace> {
        self.registry.current()
    }

    /// Replace the sink used by the printing procedures
    pub fn set_output(&self, out: Box<dyn Write>) {
        *self.output.borrow_mut() = out;
    }

    pub(crate) fn write_output(&self, text: &str) -> Result<()> {
        let mut out = self.output.borrow_mut();
        out.write_all(text.as_bytes())
            .and_then(|_| out.flush())
            .map_err(|e| Error::internal(format!("output failed: {e}")))
    }

    pub fn next_gensym_id(&self) -> u64 {
        let id = self.gensym.get() + 1;
        self.gensym.set(id);
        id
    }

    /// Weak handle used by lazy sequences and delays to call back in
    pub fn invoker(&self) -> Weak<dyn Invoke> {
        self.self_ref.clone()
    }

    // ========================================================================
    // Analysis
    // ========================================================================

    pub fn analyze(&self, form: &Value) -> Result<Expr> {
        Analyzer::new(self).analyze(form)
    }

    /// Expand `form` once if it is a macro call, otherwise return it unchanged
    pub fn macroexpand_1(&self, form: &Value) -> Result<Value> {
        Ok(Analyzer::new(self)
            .macroexpand_1(form)?
            .unwrap_or_else(|| form.clone()))
    }

    /// Expand until `form` is no longer a macro call
    pub fn macroexpand(&self, form: &Value) -> Result<Value> {
        Analyzer::new(self).expand(form)
    }

    /// Resolve a symbol the way the analyzer does, without locals
    pub fn resolve(&self, sym: &Symbol) -> Result<Option<Rc<Var>>> {
        resolve_symbol(&self.registry, sym)
    }

    // ========================================================================
    // Driver
    // ========================================================================

    pub fn eval_form(&self, form: &Value) -> Result<Value> {
        let expr = self.analyze(form)?;
        self.eval(&expr, None)
    }

    fn eval_top(&self, form: &Value) -> Result<Value> {
        self.loads.set(self.loads.get() + 1);
        let result = self.eval_form(form);
        self.loads.set(self.loads.get() - 1);
        if let Ok(value) = &result {
            *self.last.borrow_mut() = value.clone();
        }
        self.maybe_collect();
        result
    }

    /// Read and evaluate every form in `text`, stopping at the first error.
    /// Returns the value of the last form.
    pub fn eval_str(&self, text: &str) -> Result<Value> {
        let mut reader = Reader::for_str(text);
        let mut last = Value::Nil;
        loop {
            reader.set_namespace(self.registry.current().name());
            match reader.read()? {
                Some(form) => last = self.eval_top(&form)?,
                None => return Ok(last),
            }
        }
    }

    /// Read and evaluate every form in `text`, reporting failures and
    /// carrying on with the next form. Returns the errors in order.
    pub fn process_str(&self, text: &str) -> Vec<Error> {
        let mut reader = Reader::for_str(text);
        let mut errors = Vec::new();
        loop {
            reader.set_namespace(self.registry.current().name());
            let position = (reader.line(), reader.column());
            let form = match reader.read() {
                Ok(Some(form)) => form,
                Ok(None) => break,
                Err(err) => {
                    error!(line = reader.line(), "{err}");
                    errors.push(err);
                    if (reader.line(), reader.column()) == position {
                        break;
                    }
                    continue;
                }
            };
            if let Err(err) = self.eval_top(&form) {
                error!(form = %form, "{err}");
                errors.push(err);
            }
        }
        errors
    }

    // ========================================================================
    // Garbage Collection
    // ========================================================================

    fn maybe_collect(&self) {
        let idle = self.loads.get() == 0 && self.depth.get() == 0;
        if idle && self.env.borrow().live_frames() > self.config.gc_threshold {
            self.collect_garbage(&[]);
        }
    }

    /// Free every captured frame not reachable from a Var, the last
    /// top-level result or `extra_roots`. Returns the number freed.
    ///
    /// Only safe between top-level forms: frames referenced solely from the
    /// host stack are not roots.
    pub fn collect_garbage(&self, extra_roots: &[Value]) -> usize {
        let mut tracer = Tracer::default();
        for ns in self.registry.all_namespaces() {
            tracer.push_namespace(&ns);
        }
        tracer.pending.push(self.last.borrow().clone());
        tracer.pending.extend(extra_roots.iter().cloned());

        let mut env = self.env.borrow_mut();
        tracer.run(&mut env);
        let freed = env.sweep();
        debug!(freed, live = env.live_frames(), "collected frames");
        freed
    }
}

impl Invoke for Runtime {
    fn invoke(&self, f: &Value, args: &[Value]) -> Result<Value> {
        self.apply(f, args)
    }
}

/// Worklist marker for [`Runtime::collect_garbage`]
#[derive(Default)]
struct Tracer {
    pending: Vec<Value>,
    frames: Vec<Env>,
    seen: FxHashSet<usize>,
}

impl Tracer {
    /// True the first time an allocation is seen
    fn first_visit<T: ?Sized>(&mut self, ptr: *const T) -> bool {
        self.seen.insert(ptr as *const () as usize)
    }

    fn push_var(&mut self, var: &Rc<Var>) {
        if self.first_visit(Rc::as_ptr(var)) {
            self.pending.extend(var.peek());
            self.pending.push(Value::Map(var.meta()));
        }
    }

    fn push_namespace(&mut self, ns: &Rc<Namespace>) {
        if !self.first_visit(Rc::as_ptr(ns)) {
            return;
        }
        let vars: Vec<Rc<Var>> = ns
            .own_vars()
            .values()
            .chain(ns.referred_vars().values())
            .cloned()
            .collect();
        for var in &vars {
            self.push_var(var);
            if let Some(owner) = var.namespace() {
                self.push_namespace(&owner);
            }
        }
        let aliased: Vec<Rc<Namespace>> = ns.aliased().values().cloned().collect();
        for target in &aliased {
            self.push_namespace(target);
        }
    }

    /// Vars and constants named by a function body stay reachable even
    /// after they are unmapped from every namespace
    fn push_code(&mut self, code: &Rc<FnExpr>) {
        if !self.first_visit(Rc::as_ptr(code)) {
            return;
        }
        let mut stack: Vec<&Expr> = code.arities.iter().map(|a| &a.body).collect();
        while let Some(expr) = stack.pop() {
            match expr {
                Expr::Literal(value) => self.pending.push(value.clone()),
                Expr::Local { .. } => {}
                Expr::Var(var) | Expr::TheVar(var) => self.push_var(var),
                Expr::If {
                    test,
                    then,
                    otherwise,
                } => stack.extend([&**test, &**then, &**otherwise]),
                Expr::Do(items) | Expr::Recur(items) | Expr::Vector(items) | Expr::Set(items) => {
                    stack.extend(items)
                }
                Expr::Def { var, init, meta } => {
                    self.push_var(var);
                    stack.extend(init.as_deref());
                    if let Some(meta) = meta {
                        self.pending.push(Value::Map(meta.clone()));
                    }
                }
                Expr::Let { bindings, body } | Expr::Loop { bindings, body } => {
                    stack.extend(bindings);
                    stack.push(body);
                }
                Expr::Fn(inner) => stack.extend(inner.arities.iter().map(|a| &a.body)),
                Expr::Call { callee, args } => {
                    stack.push(callee);
                    stack.extend(args);
                }
                Expr::Throw(thrown) => stack.push(thrown),
                Expr::Try(t) => {
                    stack.push(&t.body);
                    stack.extend(t.catches.iter().map(|c| &c.body));
                    stack.extend(t.finally.as_ref());
                }
                Expr::Map(pairs) => {
                    for (k, v) in pairs {
                        stack.push(k);
                        stack.push(v);
                    }
                }
            }
        }
    }

    fn run(&mut self, env: &mut Environment) {
        loop {
            if let Some(value) = self.pending.pop() {
                self.trace(value);
            } else if let Some(frame) = self.frames.pop() {
                if let Some(id) = frame {
                    if let Some((values, parent)) = env.mark(id) {
                        self.pending.extend(values);
                        self.frames.push(parent);
                    }
                }
            } else {
                break;
            }
        }
    }

    fn trace(&mut self, value: Value) {
        if let Some(meta) = value.meta() {
            if self.first_visit(Rc::as_ptr(&meta)) {
                self.pending.push(Value::Map((*meta).clone()));
            }
        }
        match value {
            Value::List(list) => self.pending.extend(list.iter().cloned()),
            Value::Vector(vec) => self.pending.extend(vec.iter().cloned()),
            Value::Set(set) => self.pending.extend(set.iter().cloned()),
            Value::Map(map) => {
                for (k, v) in map.iter() {
                    self.pending.push(k.clone());
                    self.pending.push(v.clone());
                }
            }
            Value::Seq(seq) => match seq {
                Seq::Cons(cell) => {
                    if self.first_visit(Rc::as_ptr(&cell)) {
                        self.pending.push(cell.first.clone());
                        self.pending.push(cell.rest.clone());
                    }
                }
                Seq::Lazy(lazy) => {
                    if self.first_visit(Rc::as_ptr(&lazy)) {
                        self.pending.push(lazy.traced());
                    }
                }
                Seq::Vector { vec, .. } => self.pending.extend(vec.iter().cloned()),
                Seq::Map { map, .. } => self.pending.push(Value::Map(map)),
                Seq::Array { items, .. } => {
                    if self.first_visit(Rc::as_ptr(&items)) {
                        self.pending.extend(items.iter().cloned());
                    }
                }
            },
            Value::Delay(delay) => {
                if self.first_visit(Rc::as_ptr(&delay)) {
                    self.pending.push(delay.traced());
                }
            }
            Value::Fn(f) => {
                if self.first_visit(Rc::as_ptr(&f)) {
                    self.frames.push(f.env);
                    self.push_code(&f.expr);
                }
            }
            Value::Var(var) => self.push_var(&var),
            Value::Namespace(ns) => self.push_namespace(&ns),
            Value::Error(err) => self.pending.push(err.data()),
            Value::Nil
            | Value::Bool(_)
            | Value::Number(_)
            | Value::Char(_)
            | Value::String(_)
            | Value::Symbol(_)
            | Value::Keyword(_)
            | Value::Native(_) => {}
        }
    }
}
