//! Namespaces and Vars: the mutable global binding store.
//!
//! A [`Registry`] owns every live [`Namespace`] and tracks the current one.
//! Namespaces own their [`Var`]s and may refer Vars owned elsewhere or alias
//! other namespaces. Everything here is single-threaded and uses `RefCell`.

use std::cell::{Cell, Ref, RefCell};
use std::rc::{Rc, Weak};

use rustc_hash::FxHashMap;
use tracing::debug;

use crate::collections::ArrayMap;
use crate::error::{Error, Result};
use crate::interner::InternedSymbol;
use crate::language::{Symbol, Value};

/// Name of the namespace holding natives and the bootstrap library
pub const CORE_NS: &str = "kern.core";

// ============================================================================
// Var
// ============================================================================

/// A named, namespace-owned reference cell
pub struct Var {
    ns: Weak<Namespace>,
    ns_name: InternedSymbol,
    name: InternedSymbol,
    /// `None` while unbound
    value: RefCell<Option<Value>>,
    is_macro: Cell<bool>,
    meta: RefCell<ArrayMap>,
}

impl Var {
    fn new(ns: Weak<Namespace>, ns_name: InternedSymbol, name: InternedSymbol) -> Self {
        Var {
            ns,
            ns_name,
            name,
            value: RefCell::new(None),
            is_macro: Cell::new(false),
            meta: RefCell::new(ArrayMap::new()),
        }
    }

    pub fn name(&self) -> InternedSymbol {
        self.name
    }

    pub fn ns_name(&self) -> InternedSymbol {
        self.ns_name
    }

    /// The owning namespace, if it is still alive
    pub fn namespace(&self) -> Option<Rc<Namespace>> {
        self.ns.upgrade()
    }

    pub fn qualified_name(&self) -> String {
        format!("{}/{}", self.ns_name, self.name)
    }

    pub fn symbol(&self) -> Symbol {
        Symbol::from_parts(Some(self.ns_name), self.name)
    }

    pub fn is_bound(&self) -> bool {
        self.value.borrow().is_some()
    }

    /// Current value; unbound Vars are a TypeError
    pub fn deref(&self) -> Result<Value> {
        self.value.borrow().clone().ok_or_else(|| {
            Error::type_error(format!("Var {} is unbound", self.qualified_name()))
        })
    }

    /// Current value without failing on unbound Vars
    pub fn peek(&self) -> Option<Value> {
        self.value.borrow().clone()
    }

    pub fn bind(&self, value: Value) {
        *self.value.borrow_mut() = Some(value);
    }

    pub fn is_macro(&self) -> bool {
        self.is_macro.get()
    }

    pub fn set_macro(&self, flag: bool) {
        self.is_macro.set(flag);
    }

    pub fn meta(&self) -> ArrayMap {
        self.meta.borrow().clone()
    }

    pub fn set_meta(&self, meta: ArrayMap) {
        *self.meta.borrow_mut() = meta;
    }

    pub fn is_private(&self) -> bool {
        self.meta
            .borrow()
            .get(&Value::keyword("private"))
            .is_some_and(Value::is_truthy)
    }
}

/// Vars compare by identity
impl PartialEq for Var {
    fn eq(&self, other: &Self) -> bool {
        std::ptr::eq(self, other)
    }
}

impl std::fmt::Debug for Var {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "#'{}", self.qualified_name())
    }
}

// ============================================================================
// Namespace
// ============================================================================

pub struct Namespace {
    name: InternedSymbol,
    me: Weak<Namespace>,
    vars: RefCell<FxHashMap<InternedSymbol, Rc<Var>>>,
    refers: RefCell<FxHashMap<InternedSymbol, Rc<Var>>>,
    aliases: RefCell<FxHashMap<InternedSymbol, Rc<Namespace>>>,
}

impl Namespace {
    pub fn new(name: InternedSymbol) -> Rc<Namespace> {
        Rc::new_cyclic(|me| Namespace {
            name,
            me: me.clone(),
            vars: RefCell::new(FxHashMap::default()),
            refers: RefCell::new(FxHashMap::default()),
            aliases: RefCell::new(FxHashMap::default()),
        })
    }

    pub fn name(&self) -> InternedSymbol {
        self.name
    }

    /// The Var this namespace owns under `name`, created unbound if missing.
    /// A referred Var of the same name is shadowed, not modified.
    pub fn intern(&self, name: InternedSymbol) -> Rc<Var> {
        if let Some(var) = self.vars.borrow().get(&name) {
            return var.clone();
        }
        let var = Rc::new(Var::new(self.me.clone(), self.name, name));
        self.refers.borrow_mut().remove(&name);
        self.vars.borrow_mut().insert(name, var.clone());
        var
    }

    /// Own Vars first, then referred Vars
    pub fn lookup(&self, name: InternedSymbol) -> Option<Rc<Var>> {
        if let Some(var) = self.vars.borrow().get(&name) {
            return Some(var.clone());
        }
        self.refers.borrow().get(&name).cloned()
    }

    /// A Var owned by this namespace
    pub fn find_own(&self, name: InternedSymbol) -> Option<Rc<Var>> {
        self.vars.borrow().get(&name).cloned()
    }

    /// Make `var` visible under `name`. Fails if `name` is an own Var.
    pub fn refer(&self, name: InternedSymbol, var: Rc<Var>) -> Result<()> {
        if let Some(own) = self.vars.borrow().get(&name) {
            if !Rc::ptr_eq(own, &var) {
                return Err(Error::type_error(format!(
                    "{name} already refers to {} in namespace {}",
                    own.qualified_name(),
                    self.name
                )));
            }
            return Ok(());
        }
        self.refers.borrow_mut().insert(name, var);
        Ok(())
    }

    /// Refer every public Var owned by `other`, keeping existing own Vars
    pub fn refer_all(&self, other: &Namespace) {
        let publics: Vec<(InternedSymbol, Rc<Var>)> = other
            .vars
            .borrow()
            .iter()
            .filter(|(_, var)| !var.is_private())
            .map(|(name, var)| (*name, var.clone()))
            .collect();
        let own = self.vars.borrow();
        let mut refers = self.refers.borrow_mut();
        for (name, var) in publics {
            if !own.contains_key(&name) {
                refers.insert(name, var);
            }
        }
    }

    pub fn add_alias(&self, alias: InternedSymbol, ns: Rc<Namespace>) -> Result<()> {
        let mut aliases = self.aliases.borrow_mut();
        if let Some(existing) = aliases.get(&alias) {
            if !Rc::ptr_eq(existing, &ns) {
                return Err(Error::type_error(format!(
                    "Alias {alias} already exists in namespace {}, aliasing {}",
                    self.name,
                    existing.name()
                )));
            }
        }
        aliases.insert(alias, ns);
        Ok(())
    }

    pub fn remove_alias(&self, alias: InternedSymbol) {
        self.aliases.borrow_mut().remove(&alias);
    }

    pub fn resolve_alias(&self, alias: InternedSymbol) -> Option<Rc<Namespace>> {
        self.aliases.borrow().get(&alias).cloned()
    }

    /// Remove a mapping, own or referred
    pub fn unmap(&self, name: InternedSymbol) {
        self.vars.borrow_mut().remove(&name);
        self.refers.borrow_mut().remove(&name);
    }

    /// Every visible name with its Var, own Vars taking precedence
    pub fn mappings(&self) -> Vec<(InternedSymbol, Rc<Var>)> {
        let mut all: FxHashMap<InternedSymbol, Rc<Var>> = self.refers.borrow().clone();
        for (name, var) in self.vars.borrow().iter() {
            all.insert(*name, var.clone());
        }
        all.into_iter().collect()
    }

    pub fn aliases(&self) -> Vec<(InternedSymbol, Rc<Namespace>)> {
        self.aliases
            .borrow()
            .iter()
            .map(|(name, ns)| (*name, ns.clone()))
            .collect()
    }

    pub(crate) fn own_vars(&self) -> Ref<'_, FxHashMap<InternedSymbol, Rc<Var>>> {
        self.vars.borrow()
    }

    pub(crate) fn referred_vars(&self) -> Ref<'_, FxHashMap<InternedSymbol, Rc<Var>>> {
        self.refers.borrow()
    }

    pub(crate) fn aliased(&self) -> Ref<'_, FxHashMap<InternedSymbol, Rc<Namespace>>> {
        self.aliases.borrow()
    }
}

// ============================================================================
// Registry
// ============================================================================

/// All namespaces known to one runtime, plus the current namespace
pub struct Registry {
    namespaces: RefCell<FxHashMap<InternedSymbol, Rc<Namespace>>>,
    current: RefCell<Rc<Namespace>>,
    core: Rc<Namespace>,
}

impl Default for Registry {
    fn default() -> Self {
        Self::new()
    }
}

impl Registry {
    /// A registry containing only an empty core namespace, which is current
    pub fn new() -> Self {
        let core = Namespace::new(InternedSymbol::new(CORE_NS));
        let mut namespaces = FxHashMap::default();
        namespaces.insert(core.name(), core.clone());
        Registry {
            namespaces: RefCell::new(namespaces),
            current: RefCell::new(core.clone()),
            core,
        }
    }

    pub fn core(&self) -> Rc<Namespace> {
        self.core.clone()
    }

    pub fn current(&self) -> Rc<Namespace> {
        self.current.borrow().clone()
    }

    pub fn set_current(&self, ns: Rc<Namespace>) {
        *self.current.borrow_mut() = ns;
    }

    pub fn find_namespace(&self, name: InternedSymbol) -> Option<Rc<Namespace>> {
        self.namespaces.borrow().get(&name).cloned()
    }

    /// The namespace named `name`, created if missing. New namespaces refer
    /// every public core Var.
    pub fn ensure_namespace(&self, name: InternedSymbol) -> Rc<Namespace> {
        if let Some(ns) = self.find_namespace(name) {
            return ns;
        }
        let ns = Namespace::new(name);
        ns.refer_all(&self.core);
        self.namespaces.borrow_mut().insert(name, ns.clone());
        debug!(namespace = %name, "created namespace");
        ns
    }

    /// Detach a namespace. Values still holding it keep it alive.
    pub fn remove_namespace(&self, name: InternedSymbol) -> Result<Option<Rc<Namespace>>> {
        if name == self.core.name() {
            return Err(Error::type_error(format!("Cannot remove {CORE_NS} namespace")));
        }
        if name == self.current().name() {
            return Err(Error::type_error(format!(
                "Cannot remove current namespace {name}"
            )));
        }
        let removed = self.namespaces.borrow_mut().remove(&name);
        if removed.is_some() {
            debug!(namespace = %name, "removed namespace");
        }
        Ok(removed)
    }

    pub fn all_namespaces(&self) -> Vec<Rc<Namespace>> {
        self.namespaces.borrow().values().cloned().collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sym(s: &str) -> InternedSymbol {
        InternedSymbol::new(s)
    }

    #[test]
    fn test_intern_is_idempotent() {
        let ns = Namespace::new(sym("a"));
        let x1 = ns.intern(sym("x"));
        let x2 = ns.intern(sym("x"));
        assert!(Rc::ptr_eq(&x1, &x2));
        assert!(!x1.is_bound());
        assert!(x1.deref().is_err());
        x1.bind(Value::int(1));
        assert_eq!(x2.deref().unwrap(), Value::int(1));
        assert_eq!(x1.qualified_name(), "a/x");
    }

    #[test]
    fn test_intern_shadows_refer() {
        let registry = Registry::new();
        let core_var = registry.core().intern(sym("inc"));
        core_var.bind(Value::int(0));
        let user = registry.ensure_namespace(sym("user"));
        assert!(Rc::ptr_eq(&user.lookup(sym("inc")).unwrap(), &core_var));

        let own = user.intern(sym("inc"));
        assert!(!Rc::ptr_eq(&own, &core_var));
        assert!(Rc::ptr_eq(&user.lookup(sym("inc")).unwrap(), &own));
        assert_eq!(core_var.deref().unwrap(), Value::int(0));
    }

    #[test]
    fn test_private_vars_are_not_referred() {
        let registry = Registry::new();
        let hidden = registry.core().intern(sym("hidden"));
        hidden.set_meta(ArrayMap::new().assoc(Value::keyword("private"), Value::Bool(true)));
        let ns = registry.ensure_namespace(sym("other"));
        assert!(ns.lookup(sym("hidden")).is_none());
    }

    #[test]
    fn test_remove_namespace_rules() {
        let registry = Registry::new();
        let other = registry.ensure_namespace(sym("other"));
        assert!(registry.remove_namespace(sym(CORE_NS)).is_err());
        registry.set_current(other.clone());
        assert!(registry.remove_namespace(sym("other")).is_err());
        registry.set_current(registry.core());
        assert!(registry.remove_namespace(sym("other")).unwrap().is_some());
        assert!(registry.find_namespace(sym("other")).is_none());
        // Detached but still usable through existing references
        other.intern(sym("y"));
        assert!(other.lookup(sym("y")).is_some());
    }

    #[test]
    fn test_aliases() {
        let a = Namespace::new(sym("a"));
        let b = Namespace::new(sym("b"));
        let c = Namespace::new(sym("c"));
        a.add_alias(sym("bee"), b.clone()).unwrap();
        assert!(a.add_alias(sym("bee"), c).is_err());
        assert!(Rc::ptr_eq(&a.resolve_alias(sym("bee")).unwrap(), &b));
        a.remove_alias(sym("bee"));
        assert!(a.resolve_alias(sym("bee")).is_none());
    }
}
