//! Heap objects.
//!
//! An [`Object`] stores its field values in a flat name-to-value map. Field
//! reads fall through to an optional base-class instance layer; writes always
//! land in the object's own layer. Native standard-library objects attach an
//! opaque payload through [`Object::set_native_data`].

use std::any::Any;
use std::cell::RefCell;
use std::collections::HashMap;
use std::rc::Rc;

use core_types::{ErrorKind, RuntimeError, RuntimeResult};

use crate::class::ClassRef;
use crate::value::Value;

/// Shared handle to a heap object.
pub type ObjectRef = Rc<RefCell<Object>>;

/// A runtime object instance.
#[derive(Default)]
pub struct Object {
    class: Option<ClassRef>,
    base_instance: Option<ObjectRef>,
    fields: HashMap<String, Value>,
    native_data: Option<Rc<dyn Any>>,
}

impl Object {
    /// Create an object with no class link.
    pub fn new() -> Self {
        Object::default()
    }

    /// Create a shared handle to an empty object.
    pub fn new_ref() -> ObjectRef {
        Rc::new(RefCell::new(Object::new()))
    }

    /// The object's class, if linked.
    pub fn class(&self) -> Option<ClassRef> {
        self.class.clone()
    }

    /// Link the object to its class.
    pub fn set_class(&mut self, class: ClassRef) {
        self.class = Some(class);
    }

    /// The base-class instance layer, if present.
    pub fn base_instance(&self) -> Option<ObjectRef> {
        self.base_instance.clone()
    }

    /// Install a base-class instance layer.
    pub fn set_base_instance(&mut self, base: ObjectRef) {
        self.base_instance = Some(base);
    }

    /// Initialize a field slot to null if it does not exist yet.
    pub fn init_field_slot(&mut self, name: &str) {
        self.fields.entry(name.to_string()).or_insert(Value::Null);
    }

    /// Write a field in this object's own layer, creating the slot if
    /// needed. Base layers are never consulted on writes.
    pub fn set_field(&mut self, name: &str, value: Value) {
        self.fields.insert(name.to_string(), value);
    }

    /// Read a field, falling through to the base-instance layer when the
    /// slot is absent here.
    pub fn get_field(&self, name: &str) -> RuntimeResult<Value> {
        if let Some(value) = self.fields.get(name) {
            return Ok(value.clone());
        }
        if let Some(base) = &self.base_instance {
            return base.borrow().get_field(name);
        }
        Err(RuntimeError::new(
            ErrorKind::FieldNotFound,
            format!("field not found: {name}"),
        ))
    }

    /// Whether this object is an instance of `class`: its class chain
    /// contains `class`, or its class implements it as an interface.
    pub fn is_instance_of(&self, class: &ClassRef) -> bool {
        let Some(own) = &self.class else {
            return false;
        };

        let mut current = Some(own.clone());
        while let Some(cls) = current {
            if Rc::ptr_eq(&cls, class) {
                return true;
            }
            current = cls.base_class();
        }

        own.implements_interface(class)
    }

    /// Attach an opaque native payload.
    pub fn set_native_data(&mut self, data: Rc<dyn Any>) {
        self.native_data = Some(data);
    }

    /// Retrieve the native payload, downcast to `T`.
    pub fn native_data<T: 'static>(&self) -> Option<Rc<T>> {
        self.native_data.clone()?.downcast::<T>().ok()
    }
}

impl std::fmt::Debug for Object {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Object")
            .field("class", &self.class.as_ref().map(|c| c.qualified_name()))
            .field("fields", &self.fields.len())
            .field("has_base", &self.base_instance.is_some())
            .field("has_native_data", &self.native_data.is_some())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::class::{Class, Instantiate};

    #[test]
    fn test_set_and_get_field() {
        let mut obj = Object::new();
        obj.set_field("x", Value::Int32(7));
        assert_eq!(obj.get_field("x").unwrap(), Value::Int32(7));
    }

    #[test]
    fn test_missing_field_fails() {
        let obj = Object::new();
        let err = obj.get_field("nope").unwrap_err();
        assert_eq!(err.kind, ErrorKind::FieldNotFound);
    }

    #[test]
    fn test_init_field_slot_does_not_overwrite() {
        let mut obj = Object::new();
        obj.set_field("x", Value::Int32(1));
        obj.init_field_slot("x");
        assert_eq!(obj.get_field("x").unwrap(), Value::Int32(1));

        obj.init_field_slot("y");
        assert_eq!(obj.get_field("y").unwrap(), Value::Null);
    }

    #[test]
    fn test_base_layer_read_through() {
        let base = Object::new_ref();
        base.borrow_mut().set_field("inherited", Value::Int32(3));

        let mut derived = Object::new();
        derived.set_base_instance(base.clone());
        assert_eq!(derived.get_field("inherited").unwrap(), Value::Int32(3));

        // Writes stay in the derived layer.
        derived.set_field("inherited", Value::Int32(9));
        assert_eq!(derived.get_field("inherited").unwrap(), Value::Int32(9));
        assert_eq!(base.borrow().get_field("inherited").unwrap(), Value::Int32(3));
    }

    #[test]
    fn test_is_instance_of_walks_class_chain() {
        let base = Class::new_ref("Base");
        let derived = Class::new_ref("Derived");
        derived.set_base_class(base.clone());

        let obj = derived.create_instance();
        assert!(obj.borrow().is_instance_of(&derived));
        assert!(obj.borrow().is_instance_of(&base));

        let unrelated = Class::new_ref("Other");
        assert!(!obj.borrow().is_instance_of(&unrelated));
    }

    #[test]
    fn test_is_instance_of_checks_interfaces() {
        let iface = Class::new_ref("IShape");
        let cls = Class::new_ref("Circle");
        cls.add_interface(iface.clone());

        let obj = cls.create_instance();
        assert!(obj.borrow().is_instance_of(&iface));
    }

    #[test]
    fn test_native_data_roundtrip() {
        let mut obj = Object::new();
        obj.set_native_data(Rc::new(RefCell::new(vec![1, 2, 3])));

        let data = obj.native_data::<RefCell<Vec<i32>>>().unwrap();
        data.borrow_mut().push(4);
        assert_eq!(obj.native_data::<RefCell<Vec<i32>>>().unwrap().borrow().len(), 4);

        // Wrong type downcasts to None.
        assert!(obj.native_data::<RefCell<String>>().is_none());
    }
}
