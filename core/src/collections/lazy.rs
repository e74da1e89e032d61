//! Deferred computations: lazy sequences and delays.
//!
//! Both wrap a zero-argument function value and realize it at most once.
//! The function is invoked through a weak handle to whatever can call
//! language functions (normally the runtime), so these cells never keep the
//! runtime alive on their own.

use std::cell::RefCell;
use std::rc::Weak;

use crate::error::{Error, Result};
use crate::language::Value;

/// Something able to call a language-level function value.
pub trait Invoke {
    fn invoke(&self, f: &Value, args: &[Value]) -> Result<Value>;
}

enum State {
    Pending(Value),
    Realizing(Value),
    Realized(Value),
}

/// A memoizing thunk. `Pending -> Realizing -> Realized` happens exactly
/// once; a failed realization returns to `Pending`.
struct Memo {
    state: RefCell<State>,
    invoker: Weak<dyn Invoke>,
}

impl Memo {
    fn new(thunk: Value, invoker: Weak<dyn Invoke>) -> Self {
        Memo {
            state: RefCell::new(State::Pending(thunk)),
            invoker,
        }
    }

    fn is_realized(&self) -> bool {
        matches!(&*self.state.borrow(), State::Realized(_))
    }

    fn force(&self, what: &str) -> Result<Value> {
        let invoker = {
            let state = self.state.borrow();
            match &*state {
                State::Realized(value) => return Ok(value.clone()),
                State::Realizing(_) => {
                    return Err(Error::type_error(format!("{what} realized recursively")));
                }
                State::Pending(_) => self
                    .invoker
                    .upgrade()
                    .ok_or_else(|| Error::internal(format!("{what} outlived its runtime")))?,
            }
        };

        let thunk = {
            let mut state = self.state.borrow_mut();
            let thunk = match &*state {
                State::Pending(thunk) => thunk.clone(),
                _ => return Err(Error::internal(format!("{what} changed state"))),
            };
            *state = State::Realizing(thunk.clone());
            thunk
        };

        match invoker.invoke(&thunk, &[]) {
            Ok(value) => {
                *self.state.borrow_mut() = State::Realized(value.clone());
                Ok(value)
            }
            Err(err) => {
                *self.state.borrow_mut() = State::Pending(thunk);
                Err(err)
            }
        }
    }

    /// The value a collector has to trace: the thunk or the result
    fn traced(&self) -> Value {
        match &*self.state.borrow() {
            State::Pending(v) | State::Realizing(v) | State::Realized(v) => v.clone(),
        }
    }

    fn into_realized(self) -> Value {
        match self.state.into_inner() {
            State::Realized(v) => v,
            _ => Value::Nil,
        }
    }
}

/// A sequence whose contents are computed on first access.
pub struct LazySeq {
    memo: Memo,
}

impl LazySeq {
    pub fn new(thunk: Value, invoker: Weak<dyn Invoke>) -> Self {
        LazySeq {
            memo: Memo::new(thunk, invoker),
        }
    }

    pub fn is_realized(&self) -> bool {
        self.memo.is_realized()
    }

    /// The seqable value produced by the thunk
    pub fn force(&self) -> Result<Value> {
        self.memo.force("Lazy sequence")
    }

    pub(crate) fn traced(&self) -> Value {
        self.memo.traced()
    }

    pub(crate) fn into_realized(self) -> Value {
        self.memo.into_realized()
    }
}

/// A value computed on the first `force` and cached afterwards.
pub struct Delay {
    memo: Memo,
}

impl Delay {
    pub fn new(thunk: Value, invoker: Weak<dyn Invoke>) -> Self {
        Delay {
            memo: Memo::new(thunk, invoker),
        }
    }

    pub fn is_realized(&self) -> bool {
        self.memo.is_realized()
    }

    pub fn force(&self) -> Result<Value> {
        self.memo.force("Delay")
    }

    pub(crate) fn traced(&self) -> Value {
        self.memo.traced()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::Cell;
    use std::rc::Rc;

    struct Counting {
        calls: Cell<usize>,
        fail_first: Cell<bool>,
    }

    impl Invoke for Counting {
        fn invoke(&self, _f: &Value, _args: &[Value]) -> Result<Value> {
            self.calls.set(self.calls.get() + 1);
            if self.fail_first.replace(false) {
                return Err(Error::user("not yet", Value::Nil));
            }
            Ok(Value::list(vec![Value::int(1), Value::int(2)]))
        }
    }

    fn counting(fail_first: bool) -> Rc<Counting> {
        Rc::new(Counting {
            calls: Cell::new(0),
            fail_first: Cell::new(fail_first),
        })
    }

    #[test]
    fn test_lazy_seq_realizes_once() {
        let inv = counting(false);
        let weak: Weak<dyn Invoke> = Rc::downgrade(&inv) as Weak<dyn Invoke>;
        let lazy = LazySeq::new(Value::Nil, weak);

        assert!(!lazy.is_realized());
        lazy.force().unwrap();
        lazy.force().unwrap();
        assert!(lazy.is_realized());
        assert_eq!(inv.calls.get(), 1);
    }

    #[test]
    fn test_failed_realization_can_retry() {
        let inv = counting(true);
        let weak: Weak<dyn Invoke> = Rc::downgrade(&inv) as Weak<dyn Invoke>;
        let delay = Delay::new(Value::Nil, weak);

        assert!(delay.force().is_err());
        assert!(!delay.is_realized());
        assert!(delay.force().is_ok());
        assert_eq!(inv.calls.get(), 2);
    }

    #[test]
    fn test_dropped_invoker_is_an_error() {
        let inv = counting(false);
        let weak: Weak<dyn Invoke> = Rc::downgrade(&inv) as Weak<dyn Invoke>;
        drop(inv);
        let lazy = LazySeq::new(Value::Nil, weak);
        assert!(matches!(lazy.force(), Err(Error::Internal(_))));
        assert!(!lazy.is_realized());
    }
}
