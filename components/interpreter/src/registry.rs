//! Class registry.
//!
//! Classes register under up to three aliases so that legacy modules which
//! stored qualified names in the class name, modules with separate namespace
//! fields, and code that only knows simple names all resolve to the same
//! class object.

use std::collections::HashMap;
use std::rc::Rc;

use core_types::{ErrorKind, RuntimeError, RuntimeResult};

use crate::class::ClassRef;

/// Name-indexed class lookup.
#[derive(Default)]
pub struct ClassRegistry {
    classes: HashMap<String, ClassRef>,
}

impl ClassRegistry {
    /// Create an empty registry.
    pub fn new() -> Self {
        ClassRegistry::default()
    }

    /// Register a class under its simple name, its raw stored name, and its
    /// canonical qualified name.
    pub fn register(&mut self, class: ClassRef) {
        let raw_name = class.name().to_string();
        let simple_name = class.simple_name().to_string();
        let qualified_name = class.qualified_name();

        if !simple_name.is_empty() {
            self.classes.insert(simple_name, class.clone());
        }
        if !raw_name.is_empty() {
            self.classes.insert(raw_name, class.clone());
        }
        if !qualified_name.is_empty() {
            self.classes.insert(qualified_name, class);
        }
    }

    /// Look up a class by any of its aliases. A qualified name that misses
    /// retries with its trailing simple segment.
    pub fn get(&self, name: &str) -> RuntimeResult<ClassRef> {
        if let Some(class) = self.classes.get(name) {
            return Ok(class.clone());
        }

        if let Some(dot) = name.rfind('.') {
            if let Some(class) = self.classes.get(&name[dot + 1..]) {
                return Ok(class.clone());
            }
        }

        Err(RuntimeError::new(
            ErrorKind::ClassNotFound,
            format!("class not found: {name}"),
        ))
    }

    /// Whether any alias matches `name` exactly.
    pub fn has(&self, name: &str) -> bool {
        self.classes.contains_key(name)
    }

    /// All alias strings, sorted and deduplicated.
    pub fn all_class_names(&self) -> Vec<String> {
        let mut names: Vec<String> = self.classes.keys().cloned().collect();
        names.sort();
        names.dedup();
        names
    }

    /// The registered classes, deduplicated by object identity.
    pub fn unique_classes(&self) -> Vec<ClassRef> {
        let mut seen: Vec<*const crate::class::Class> = Vec::new();
        let mut result = Vec::new();
        for class in self.classes.values() {
            let ptr = Rc::as_ptr(class);
            if !seen.contains(&ptr) {
                seen.push(ptr);
                result.push(class.clone());
            }
        }
        result
    }
}

impl std::fmt::Debug for ClassRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ClassRegistry")
            .field("aliases", &self.classes.len())
            .field("classes", &self.unique_classes().len())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::class::Class;

    #[test]
    fn test_register_creates_three_aliases() {
        let mut registry = ClassRegistry::new();
        let class = Class::new_ref("Program");
        class.set_namespace("HelloWorld");
        registry.register(class.clone());

        for alias in ["Program", "HelloWorld.Program"] {
            let found = registry.get(alias).unwrap();
            assert!(Rc::ptr_eq(&found, &class), "alias {alias}");
        }
    }

    #[test]
    fn test_raw_qualified_name_registers_simple_alias() {
        let mut registry = ClassRegistry::new();
        let class = Class::new_ref("System.Collections.Generic.List`1");
        class.set_namespace("System.Collections.Generic");
        registry.register(class.clone());

        assert!(Rc::ptr_eq(&registry.get("List`1").unwrap(), &class));
        assert!(Rc::ptr_eq(
            &registry.get("System.Collections.Generic.List`1").unwrap(),
            &class
        ));
    }

    #[test]
    fn test_qualified_miss_retries_simple_segment() {
        let mut registry = ClassRegistry::new();
        let class = Class::new_ref("Widget");
        registry.register(class.clone());

        let found = registry.get("Some.Other.Namespace.Widget").unwrap();
        assert!(Rc::ptr_eq(&found, &class));
    }

    #[test]
    fn test_missing_class_fails() {
        let registry = ClassRegistry::new();
        let err = registry.get("Nope").unwrap_err();
        assert_eq!(err.kind, ErrorKind::ClassNotFound);
    }

    #[test]
    fn test_all_class_names_sorted_and_deduped() {
        let mut registry = ClassRegistry::new();
        let class = Class::new_ref("Program");
        class.set_namespace("App");
        registry.register(class);
        registry.register(Class::new_ref("Alpha"));

        let names = registry.all_class_names();
        assert_eq!(names, vec!["Alpha", "App.Program", "Program"]);
    }

    #[test]
    fn test_unique_classes_dedupes_aliases() {
        let mut registry = ClassRegistry::new();
        let class = Class::new_ref("Program");
        class.set_namespace("App");
        registry.register(class);

        assert_eq!(registry.unique_classes().len(), 1);
        assert!(registry.all_class_names().len() > 1);
    }
}
