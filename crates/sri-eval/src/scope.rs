//! Snapshot scopes.
//!
//! A scope is one flat map from names to values with three reserved
//! namespaces layered into the keys: plain identifiers, `method:<name>`
//! for user-defined top-level methods, and `class:<Name>` /
//! `module:<qname>` for types. Entering a method or block copies the
//! enclosing map (copy-on-entry); there is no closure-by-reference, so
//! rebinding a name inside a block is invisible outside, while shared
//! containers reached through the copy remain shared.

use rustc_hash::FxHashMap;

use crate::value::Value;

/// One variable environment.
#[derive(Clone, Debug, Default)]
pub struct Scope {
    vars: FxHashMap<String, Value>,
}

impl Scope {
    pub fn new() -> Self {
        Self::default()
    }

    /// The copy-on-entry child: a snapshot of every binding.
    pub fn child(&self) -> Self {
        self.clone()
    }

    pub fn get(&self, name: &str) -> Option<Value> {
        self.vars.get(name).cloned()
    }

    pub fn set(&mut self, name: impl Into<String>, value: Value) {
        self.vars.insert(name.into(), value);
    }

    pub fn contains(&self, name: &str) -> bool {
        self.vars.contains_key(name)
    }

    // Reserved namespaces

    pub fn define_method(&mut self, name: &str, value: Value) {
        self.vars.insert(format!("method:{}", name), value);
    }

    pub fn lookup_method(&self, name: &str) -> Option<Value> {
        self.vars.get(&format!("method:{}", name)).cloned()
    }

    pub fn define_class(&mut self, name: &str, value: Value) {
        self.vars.insert(format!("class:{}", name), value);
    }

    pub fn lookup_class(&self, name: &str) -> Option<Value> {
        self.vars.get(&format!("class:{}", name)).cloned()
    }

    pub fn define_module(&mut self, name: &str, value: Value) {
        self.vars.insert(format!("module:{}", name), value);
    }

    pub fn lookup_module(&self, name: &str) -> Option<Value> {
        self.vars.get(&format!("module:{}", name)).cloned()
    }

    /// Seeds bindings from an embedding host. Keys prefixed `class:` or
    /// `method:` land in their namespaces; everything else is a plain
    /// variable.
    pub fn seed(&mut self, bindings: impl IntoIterator<Item = (String, Value)>) {
        for (name, value) in bindings {
            self.vars.insert(name, value);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn child_is_a_snapshot() {
        let mut outer = Scope::new();
        outer.set("x", Value::integer(1));
        let mut inner = outer.child();
        inner.set("x", Value::integer(2));
        assert!(outer.get("x").unwrap().ruby_eq(&Value::integer(1)));
    }

    #[test]
    fn shared_containers_stay_shared_through_the_copy() {
        let mut outer = Scope::new();
        outer.set("a", Value::array(vec![]));
        let inner = outer.child();
        if let Some(Value::Array(arr)) = inner.get("a") {
            arr.borrow_mut().push(Value::integer(9));
        }
        if let Some(Value::Array(arr)) = outer.get("a") {
            assert_eq!(arr.borrow().len(), 1);
        } else {
            panic!("expected array");
        }
    }

    #[test]
    fn namespaces_do_not_collide() {
        let mut scope = Scope::new();
        scope.set("Foo", Value::integer(1));
        scope.define_class("Foo", Value::Nil);
        assert!(scope.get("Foo").unwrap().ruby_eq(&Value::integer(1)));
        assert!(scope.lookup_class("Foo").is_some());
        assert!(scope.lookup_method("Foo").is_none());
    }
}
