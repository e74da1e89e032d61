//! The tree-walking evaluator.
//!
//! `eval` walks an analyzed [`Expr`] against a frame in the runtime's arena.
//! `recur` is an unwinding [`Error::Recur`] caught by the nearest `loop` or
//! function body, which rebinds its frame and runs again, so tail loops never
//! grow the host stack.

use std::rc::Rc;

use crate::abstractions::{get, nth};
use crate::analyzer::{Arity, Expr, FnExpr, TryExpr};
use crate::collections::{ArrayMap, PersistentSet};
use crate::environment::{Env, FrameId};
use crate::error::{Error, Result};
use crate::language::{Function, Value};
use crate::namespace::Var;
use crate::runtime::Runtime;

/// Remaining host stack below which evaluation moves to a fresh segment
pub(crate) const STACK_RED_ZONE: usize = 128 * 1024;
pub(crate) const STACK_GROW_SIZE: usize = 4 * 1024 * 1024;

impl Runtime {
    /// Evaluate `expr` in frame `env`. Nested calls grow the host stack on
    /// demand, so recursion depth is bounded by `max_call_depth` alone.
    pub fn eval(&self, expr: &Expr, env: Env) -> Result<Value> {
        stacker::maybe_grow(STACK_RED_ZONE, STACK_GROW_SIZE, || self.eval_inner(expr, env))
    }

    fn eval_inner(&self, expr: &Expr, env: Env) -> Result<Value> {
        match expr {
            Expr::Literal(value) => Ok(value.clone()),
            Expr::Local { depth, slot } => self.env.borrow().lookup(env, *depth, *slot),
            Expr::Var(var) => var.deref(),
            Expr::TheVar(var) => Ok(Value::Var(var.clone())),
            Expr::If {
                test,
                then,
                otherwise,
            } => {
                if self.eval(test, env)?.is_truthy() {
                    self.eval(then, env)
                } else {
                    self.eval(otherwise, env)
                }
            }
            Expr::Do(body) => self.eval_do(body, env),
            Expr::Def { var, init, meta } => {
                self.eval_def(var, init.as_deref(), meta.as_ref(), env)
            }
            Expr::Let { bindings, body } => self.eval_let(bindings, body, env),
            Expr::Loop { bindings, body } => self.eval_loop(bindings, body, env),
            Expr::Recur(args) => Err(Error::Recur(self.eval_all(args, env)?)),
            Expr::Fn(fn_expr) => Ok(self.make_fn(fn_expr, env)),
            Expr::Call { callee, args } => {
                let f = self.eval(callee, env)?;
                let args = self.eval_all(args, env)?;
                self.apply(&f, &args)
            }
            Expr::Throw(expr) => self.eval_throw(expr, env),
            Expr::Try(try_expr) => self.eval_try(try_expr, env),
            Expr::Vector(items) => Ok(Value::vector(self.eval_all(items, env)?)),
            Expr::Map(entries) => self.eval_map(entries, env),
            Expr::Set(items) => Ok(Value::Set(
                self.eval_all(items, env)?.into_iter().collect::<PersistentSet>(),
            )),
        }
    }

    fn eval_all(&self, exprs: &[Expr], env: Env) -> Result<Vec<Value>> {
        let mut values = Vec::with_capacity(exprs.len());
        for expr in exprs {
            values.push(self.eval(expr, env)?);
        }
        Ok(values)
    }

    fn eval_do(&self, body: &[Expr], env: Env) -> Result<Value> {
        let mut last = Value::Nil;
        for expr in body {
            last = self.eval(expr, env)?;
        }
        Ok(last)
    }

    fn eval_map(&self, entries: &[(Expr, Expr)], env: Env) -> Result<Value> {
        let mut map = ArrayMap::new();
        for (key, value) in entries {
            let key = self.eval(key, env)?;
            let value = self.eval(value, env)?;
            map = map.assoc(key, value);
        }
        Ok(Value::Map(map))
    }

    fn eval_def(
        &self,
        var: &Rc<Var>,
        init: Option<&Expr>,
        meta: Option<&ArrayMap>,
        env: Env,
    ) -> Result<Value> {
        let value = match init {
            Some(init) => Some(self.eval(init, env)?),
            None => None,
        };
        if let Some(meta) = meta {
            if let Some(flag) = meta.get(&Value::keyword("macro")) {
                var.set_macro(flag.is_truthy());
            }
            let merged = meta
                .iter()
                .fold(var.meta(), |acc, (k, v)| acc.assoc(k.clone(), v.clone()));
            var.set_meta(merged);
        }
        if let Some(value) = value {
            var.bind(value);
        }
        Ok(Value::Var(var.clone()))
    }

    fn make_fn(&self, fn_expr: &Rc<FnExpr>, env: Env) -> Value {
        self.env.borrow_mut().capture(env);
        Value::Fn(Rc::new(Function {
            expr: fn_expr.clone(),
            env,
            meta: None,
        }))
    }

    // ========================================================================
    // Scopes
    // ========================================================================

    /// Evaluate binding `i` into slot `i` of `frame`, in order
    fn bind_slots(&self, frame: FrameId, bindings: &[Expr]) -> Result<()> {
        for (slot, init) in bindings.iter().enumerate() {
            let value = self.eval(init, Some(frame))?;
            self.env.borrow_mut().set(frame, slot, value)?;
        }
        Ok(())
    }

    fn eval_let(&self, bindings: &[Expr], body: &Expr, env: Env) -> Result<Value> {
        let frame = self
            .env
            .borrow_mut()
            .push(env, vec![Value::Nil; bindings.len()]);
        let result = self
            .bind_slots(frame, bindings)
            .and_then(|_| self.eval(body, Some(frame)));
        self.env.borrow_mut().release(frame);
        result
    }

    fn eval_loop(&self, bindings: &[Expr], body: &Expr, env: Env) -> Result<Value> {
        let frame = self
            .env
            .borrow_mut()
            .push(env, vec![Value::Nil; bindings.len()]);
        match self.bind_slots(frame, bindings) {
            Ok(()) => self.run_recurring(frame, env, 0, body),
            Err(err) => {
                self.env.borrow_mut().release(frame);
                Err(err)
            }
        }
    }

    /// Run `body` in `frame` until it completes without `recur`. Recur
    /// values land in the slots starting at `offset`. Releases the frame.
    fn run_recurring(
        &self,
        mut frame: FrameId,
        parent: Env,
        offset: usize,
        body: &Expr,
    ) -> Result<Value> {
        loop {
            match self.eval(body, Some(frame)) {
                Err(Error::Recur(values)) => match self.renew_frame(frame, parent, offset, values) {
                    Ok(next) => frame = next,
                    Err(err) => {
                        self.env.borrow_mut().release(frame);
                        return Err(err);
                    }
                },
                result => {
                    self.env.borrow_mut().release(frame);
                    return result;
                }
            }
        }
    }

    /// Rebind a frame for the next iteration. A frame some closure captured
    /// keeps its values; the iteration continues in a copy.
    fn renew_frame(
        &self,
        frame: FrameId,
        parent: Env,
        offset: usize,
        values: Vec<Value>,
    ) -> Result<FrameId> {
        let mut arena = self.env.borrow_mut();
        if !arena.is_captured(frame) {
            arena.rebind(frame, offset, values)?;
            return Ok(frame);
        }
        let mut slots = arena.values(frame)?;
        for (i, value) in values.into_iter().enumerate() {
            match slots.get_mut(offset + i) {
                Some(slot) => *slot = value,
                None => return Err(Error::internal("recur with too many values")),
            }
        }
        Ok(arena.push(parent, slots))
    }

    // ========================================================================
    // Errors
    // ========================================================================

    fn eval_throw(&self, expr: &Expr, env: Env) -> Result<Value> {
        match self.eval(expr, env)? {
            Value::Error(err) => Err((*err).clone()),
            other => Err(Error::type_error(format!(
                "throw requires an Error, got {}",
                other.kind()
            ))),
        }
    }

    fn eval_try(&self, try_expr: &TryExpr, env: Env) -> Result<Value> {
        let result = match self.eval(&try_expr.body, env) {
            Err(Error::Recur(values)) => Err(Error::Recur(values)),
            Err(err) => self.eval_catch(try_expr, err, env),
            ok => ok,
        };
        if let Some(finally) = &try_expr.finally {
            self.eval(finally, env)?;
        }
        result
    }

    fn eval_catch(&self, try_expr: &TryExpr, err: Error, env: Env) -> Result<Value> {
        let kind = err.kind();
        let Some(catch) = try_expr
            .catches
            .iter()
            .find(|c| c.kind.as_ref().is_none_or(|k| *k == kind))
        else {
            return Err(err);
        };
        let frame = self.env.borrow_mut().push(env, vec![Value::error(err)]);
        let result = self.eval(&catch.body, Some(frame));
        self.env.borrow_mut().release(frame);
        result
    }

    // ========================================================================
    // Invocation
    // ========================================================================

    /// Call any callable value with already evaluated arguments
    pub fn apply(&self, f: &Value, args: &[Value]) -> Result<Value> {
        match f {
            Value::Fn(func) => self.call_fn(func, args),
            Value::Native(proc) => {
                if !proc.accepts(args.len()) {
                    return Err(Error::arity(proc.name, args.len()));
                }
                (proc.func)(self, args)
            }
            Value::Keyword(_) => match args {
                [coll] => Ok(get(coll, f, Value::Nil)),
                [coll, default] => Ok(get(coll, f, default.clone())),
                _ => Err(Error::arity(f.to_string(), args.len())),
            },
            Value::Map(_) | Value::Set(_) => match args {
                [key] => Ok(get(f, key, Value::Nil)),
                [key, default] => Ok(get(f, key, default.clone())),
                _ => Err(Error::arity(f.kind().name(), args.len())),
            },
            Value::Vector(_) => match args {
                [index] => nth(f, index, None),
                _ => Err(Error::arity(f.kind().name(), args.len())),
            },
            Value::Var(var) => self.apply(&var.deref()?, args),
            other => Err(Error::type_error(format!(
                "{} cannot be called",
                other.kind()
            ))),
        }
    }

    fn call_fn(&self, func: &Rc<Function>, args: &[Value]) -> Result<Value> {
        let arity = func
            .expr
            .arity_for(args.len())
            .ok_or_else(|| Error::arity(func.name(), args.len()))?;
        let depth = self.depth.get();
        if depth >= self.config().max_call_depth {
            return Err(Error::internal(format!(
                "call depth exceeded {} in {}",
                self.config().max_call_depth,
                func.name()
            )));
        }
        self.depth.set(depth + 1);
        let result = self.invoke_arity(func, arity, args);
        self.depth.set(depth);
        result
    }

    /// Frame layout: `[func, fixed args..., rest]`, where rest is `nil` or a
    /// List of the remaining arguments
    fn invoke_arity(&self, func: &Rc<Function>, arity: &Arity, args: &[Value]) -> Result<Value> {
        let mut slots = Vec::with_capacity(arity.frame_size);
        slots.push(Value::Fn(func.clone()));
        slots.extend(args[..arity.params].iter().cloned());
        if arity.variadic {
            let rest = &args[arity.params..];
            slots.push(if rest.is_empty() {
                Value::Nil
            } else {
                Value::list(rest.to_vec())
            });
        }
        let frame = self.env.borrow_mut().push(func.env, slots);
        self.run_recurring(frame, func.env, 1, &arity.body)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorKind;
    use crate::runtime::RuntimeConfig;

    fn bare() -> Rc<Runtime> {
        Runtime::with_config(RuntimeConfig {
            load_bootstrap: false,
            max_call_depth: 50,
            ..RuntimeConfig::default()
        })
        .unwrap()
    }

    fn eval(rt: &Runtime, text: &str) -> Value {
        rt.eval_str(text).unwrap()
    }

    #[test]
    fn test_let_sees_earlier_bindings() {
        let rt = bare();
        assert_eq!(eval(&rt, "(let [a 1 b (add* a 1)] (add* a b))"), Value::int(3));
        assert_eq!(rt.env.borrow().live_frames(), 0);
    }

    #[test]
    fn test_loop_recur_runs_in_constant_frames() {
        let rt = bare();
        let v = eval(
            &rt,
            "(loop [i 0 acc 0] (if (lt* i 100000) (recur (add* i 1) (add* acc i)) acc))",
        );
        assert_eq!(v, Value::int(4_999_950_000));
        assert_eq!(rt.env.borrow().live_frames(), 0);
    }

    #[test]
    fn test_fn_recur_with_rest_param() {
        let rt = bare();
        eval(
            &rt,
            "(def count-down (fn [n & xs] (if (lt* 0 n) (recur (subtract* n 1) (cons* n xs)) xs)))",
        );
        assert_eq!(eval(&rt, "(count-down 3)"), eval(&rt, "'(1 2 3)"));
    }

    #[test]
    fn test_closures_capture_loop_iterations() {
        let rt = bare();
        let v = eval(
            &rt,
            "(loop [i 0 fs []] (if (lt* i 3) (recur (add* i 1) (conj* fs (fn [] i))) ((nth* fs 1))))",
        );
        assert_eq!(v, Value::int(1));
    }

    #[test]
    fn test_multi_arity_dispatch() {
        let rt = bare();
        eval(&rt, "(def f (fn ([] 0) ([a] 1) ([a & more] more)))");
        assert_eq!(eval(&rt, "(f)"), Value::int(0));
        assert_eq!(eval(&rt, "(f 9)"), Value::int(1));
        assert_eq!(eval(&rt, "(f 9 8 7)"), eval(&rt, "'(8 7)"));
        let err = rt.eval_str("((fn [a] a))").unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Arity);
    }

    #[test]
    fn test_named_fn_refers_to_itself() {
        let rt = bare();
        let v = eval(
            &rt,
            "((fn fact [n] (if (lte* n 1) 1 (multiply* n (fact (subtract* n 1))))) 10)",
        );
        assert_eq!(v, Value::int(3_628_800));
    }

    #[test]
    fn test_try_catch_by_kind_and_finally() {
        let rt = bare();
        eval(&rt, "(def log [])");
        let v = eval(
            &rt,
            "(try (nth* [] 3) (catch TypeError e :type) (catch IndexError e :index) (finally (def log (conj* log :done))))",
        );
        assert_eq!(v, Value::keyword("index"));
        assert_eq!(eval(&rt, "log"), eval(&rt, "[:done]"));

        let err = rt
            .eval_str("(try (throw (ex-info \"boom\" {:a 1})) (catch TypeError e :nope))")
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::User);
        assert_eq!(err.message(), "boom");
    }

    #[test]
    fn test_rethrow_keeps_kind() {
        let rt = bare();
        let err = rt
            .eval_str("(try (divide* 1 0) (catch Error e (throw e)))")
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Arithmetic);
        let err = rt.eval_str("(throw 5)").unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Type);
    }

    #[test]
    fn test_call_depth_guard() {
        let rt = bare();
        eval(&rt, "(def spin (fn [n] (add* 1 (spin n))))");
        let err = rt.eval_str("(spin 0)").unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Internal);
        assert_eq!(rt.env.borrow().live_frames(), 0);
        assert_eq!(eval(&rt, "(add* 1 1)"), Value::int(2));
    }

    #[test]
    fn test_collections_are_callable() {
        let rt = bare();
        assert_eq!(eval(&rt, "(:a {:a 1})"), Value::int(1));
        assert_eq!(eval(&rt, "(:b {:a 1} 7)"), Value::int(7));
        assert_eq!(eval(&rt, "({:a 1} :a)"), Value::int(1));
        assert_eq!(eval(&rt, "(#{1 2} 2)"), Value::int(2));
        assert_eq!(eval(&rt, "([10 20] 1)"), Value::int(20));
        assert_eq!(eval(&rt, "(#'add* 1 2)"), Value::int(3));
        let err = rt.eval_str("(1 2)").unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Type);
    }

    #[test]
    fn test_def_applies_metadata() {
        let rt = bare();
        eval(&rt, "(def ^:private secret \"hidden\" 42)");
        let var = rt
            .resolve(&crate::language::Symbol::new("secret"))
            .unwrap()
            .unwrap();
        assert!(var.is_private());
        assert_eq!(
            var.meta().get(&Value::keyword("doc")),
            Some(&Value::string("hidden"))
        );
        assert_eq!(eval(&rt, "secret"), Value::int(42));
    }
}
