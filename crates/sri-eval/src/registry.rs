//! Built-in method registry.
//!
//! A table `{class name → {method name → native fn}}`, consulted after
//! user-defined methods. Lookup walks the receiver's ancestor chain from
//! most specific to `BasicObject` and accepts both the string and symbol
//! spellings of a method name. Kernel is modeled the Ruby way: its methods
//! are copied by name into Object's table at construction.

use rustc_hash::FxHashMap;

use crate::builtins;
use crate::interp::Interpreter;
use crate::value::Value;
use sri_util::Result;

/// A built-in method: receiver plus evaluated arguments in, value out.
pub type NativeFn = fn(&mut Interpreter, &Value, &[Value]) -> Result<Value>;

/// The fixed ancestor chain for built-in class names. Unknown names are
/// user classes, which sit directly under `Object`.
pub fn ancestors(class_name: &str) -> Vec<&str> {
    match class_name {
        "BasicObject" => vec!["BasicObject"],
        "Object" | "Kernel" => vec!["Object", "BasicObject"],
        "Numeric" => vec!["Numeric", "Object", "BasicObject"],
        "Integer" | "Float" | "Rational" | "Complex" => {
            vec![class_name, "Numeric", "Object", "BasicObject"]
        }
        _ => vec![class_name, "Object", "BasicObject"],
    }
}

/// The registry of built-in methods.
pub struct MethodRegistry {
    tables: FxHashMap<String, FxHashMap<String, NativeFn>>,
}

impl MethodRegistry {
    /// Builds the registry with the full built-in surface installed and
    /// Kernel mixed into Object.
    pub fn with_builtins() -> Self {
        let mut registry = Self {
            tables: FxHashMap::default(),
        };
        builtins::install(&mut registry);
        registry.include_kernel_in_object();
        registry
    }

    /// Registers a method under both its string and symbol keys.
    pub fn register(&mut self, class: &str, name: &str, f: NativeFn) {
        let table = self.tables.entry(class.to_string()).or_default();
        table.insert(name.to_string(), f);
        table.insert(format!(":{}", name), f);
    }

    /// Resolves `method` for a receiver of class `class_name`, walking the
    /// ancestor chain. Returns the first hit.
    pub fn lookup(&self, class_name: &str, method: &str) -> Option<NativeFn> {
        for ancestor in ancestors(class_name) {
            if let Some(table) = self.tables.get(ancestor) {
                if let Some(f) = table
                    .get(method)
                    .or_else(|| table.get(&format!(":{}", method)))
                {
                    return Some(*f);
                }
            }
        }
        None
    }

    /// Kernel inclusion is a by-name copy of its methods into Object.
    fn include_kernel_in_object(&mut self) {
        let Some(kernel) = self.tables.get("Kernel").cloned() else {
            return;
        };
        let object = self.tables.entry("Object".to_string()).or_default();
        for (name, f) in kernel {
            object.entry(name).or_insert(f);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ancestor_chain_ends_at_basic_object() {
        assert_eq!(
            ancestors("Integer"),
            vec!["Integer", "Numeric", "Object", "BasicObject"]
        );
        assert_eq!(ancestors("String"), vec!["String", "Object", "BasicObject"]);
        assert_eq!(ancestors("BasicObject"), vec!["BasicObject"]);
    }

    #[test]
    fn user_classes_fall_back_to_object() {
        assert_eq!(ancestors("Box"), vec!["Box", "Object", "BasicObject"]);
    }

    #[test]
    fn lookup_walks_the_chain_and_accepts_symbol_keys() {
        let registry = MethodRegistry::with_builtins();
        // `to_s` lives on Object but resolves for Integer receivers.
        assert!(registry.lookup("Integer", "to_s").is_some());
        assert!(registry.lookup("Integer", ":to_s").is_some());
        assert!(registry.lookup("Integer", "no_such_method").is_none());
    }

    #[test]
    fn kernel_methods_are_copied_into_object() {
        let registry = MethodRegistry::with_builtins();
        assert!(registry.lookup("Object", "puts").is_some());
        assert!(registry.lookup("String", "puts").is_some());
    }
}
