//! Classes and fields.
//!
//! A [`Class`] carries the reflective metadata for one type: its fields,
//! methods, optional base class, and structural interface set. Classes are
//! shared handles; the registry is the arbiter of their lifetime, and the
//! interior is cell-based so loaders and builders can keep populating a
//! class after it has been registered.

use std::cell::{Cell, RefCell};
use std::rc::Rc;

use crate::method::MethodRef;
use crate::object::{Object, ObjectRef};
use crate::types::TypeReference;

/// Shared handle to a class.
pub type ClassRef = Rc<Class>;

/// Shared handle to a field definition.
pub type FieldRef = Rc<Field>;

/// A field definition: a name and its advisory type.
///
/// Instance fields are not type-checked at store time; the type is metadata
/// for exporters and tooling.
#[derive(Debug)]
pub struct Field {
    name: String,
    field_type: TypeReference,
}

impl Field {
    /// Create a field definition.
    pub fn new(name: impl Into<String>, field_type: TypeReference) -> Self {
        Field {
            name: name.into(),
            field_type,
        }
    }

    /// The field name.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// The declared type.
    pub fn field_type(&self) -> &TypeReference {
        &self.field_type
    }
}

/// A class definition.
pub struct Class {
    name: String,
    namespace: RefCell<String>,
    base_class: RefCell<Option<ClassRef>>,
    fields: RefCell<Vec<FieldRef>>,
    methods: RefCell<Vec<MethodRef>>,
    interfaces: RefCell<Vec<ClassRef>>,
    is_abstract: Cell<bool>,
    is_sealed: Cell<bool>,
}

impl Class {
    /// Create a class with the given (possibly already qualified) name.
    pub fn new(name: impl Into<String>) -> Self {
        Class {
            name: name.into(),
            namespace: RefCell::new(String::new()),
            base_class: RefCell::new(None),
            fields: RefCell::new(Vec::new()),
            methods: RefCell::new(Vec::new()),
            interfaces: RefCell::new(Vec::new()),
            is_abstract: Cell::new(false),
            is_sealed: Cell::new(false),
        }
    }

    /// Create a shared handle to a new class.
    pub fn new_ref(name: impl Into<String>) -> ClassRef {
        Rc::new(Class::new(name))
    }

    /// The stored name, which some emitters leave fully qualified.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// The simple name: the trailing segment after the last dot.
    pub fn simple_name(&self) -> &str {
        match self.name.rfind('.') {
            Some(dot) => &self.name[dot + 1..],
            None => &self.name,
        }
    }

    /// The namespace string; empty when the class is in the global space.
    pub fn namespace(&self) -> String {
        self.namespace.borrow().clone()
    }

    /// Set the namespace.
    pub fn set_namespace(&self, namespace: impl Into<String>) {
        *self.namespace.borrow_mut() = namespace.into();
    }

    /// The qualified name: `namespace + "." + simple-name` when the
    /// namespace is non-empty, otherwise the stored name as-is.
    pub fn qualified_name(&self) -> String {
        let ns = self.namespace.borrow();
        if ns.is_empty() {
            self.name.clone()
        } else {
            format!("{}.{}", ns, self.simple_name())
        }
    }

    /// The base class, if any.
    pub fn base_class(&self) -> Option<ClassRef> {
        self.base_class.borrow().clone()
    }

    /// Set the base class.
    pub fn set_base_class(&self, base: ClassRef) {
        *self.base_class.borrow_mut() = Some(base);
    }

    /// Whether the class is marked abstract.
    pub fn is_abstract(&self) -> bool {
        self.is_abstract.get()
    }

    /// Mark the class abstract.
    pub fn set_abstract(&self, value: bool) {
        self.is_abstract.set(value);
    }

    /// Whether the class is marked sealed.
    pub fn is_sealed(&self) -> bool {
        self.is_sealed.get()
    }

    /// Mark the class sealed.
    pub fn set_sealed(&self, value: bool) {
        self.is_sealed.set(value);
    }

    /// Append a field definition.
    pub fn add_field(&self, field: FieldRef) {
        self.fields.borrow_mut().push(field);
    }

    /// The fields declared directly on this class, in declaration order.
    pub fn fields(&self) -> Vec<FieldRef> {
        self.fields.borrow().clone()
    }

    /// Look up a field by name on this class, then recursively on its base.
    pub fn field(&self, name: &str) -> Option<FieldRef> {
        for field in self.fields.borrow().iter() {
            if field.name() == name {
                return Some(field.clone());
            }
        }
        self.base_class.borrow().as_ref()?.field(name)
    }

    /// Append a method definition.
    pub fn add_method(&self, method: MethodRef) {
        self.methods.borrow_mut().push(method);
    }

    /// The methods declared directly on this class, in declaration order.
    pub fn methods(&self) -> Vec<MethodRef> {
        self.methods.borrow().clone()
    }

    /// The first method with this name declared directly on this class,
    /// ignoring parameter lists.
    pub fn method(&self, name: &str) -> Option<MethodRef> {
        self.methods
            .borrow()
            .iter()
            .find(|m| m.name() == name)
            .cloned()
    }

    /// The first method with this name searching this class then its base
    /// chain, ignoring parameter lists.
    pub fn lookup_method(&self, name: &str) -> Option<MethodRef> {
        if let Some(method) = self.method(name) {
            return Some(method);
        }
        self.base_class.borrow().as_ref()?.lookup_method(name)
    }

    /// Register a structural interface.
    pub fn add_interface(&self, interface: ClassRef) {
        self.interfaces.borrow_mut().push(interface);
    }

    /// Whether `interface` is in this class's interface set.
    pub fn implements_interface(&self, interface: &ClassRef) -> bool {
        self.interfaces
            .borrow()
            .iter()
            .any(|iface| Rc::ptr_eq(iface, interface))
    }
}

/// Instance construction lives on the shared handle because the new object
/// links back to its class.
pub trait Instantiate {
    /// Allocate an instance with a null slot for every field on the chain.
    fn create_instance(&self) -> ObjectRef;
}

impl Instantiate for ClassRef {
    fn create_instance(&self) -> ObjectRef {
        let obj = Object::new_ref();
        {
            let mut inner = obj.borrow_mut();
            inner.set_class(self.clone());

            // One flat slot per field name over the whole chain; same-name
            // fields in base classes share the derived slot.
            let mut current = Some(self.clone());
            while let Some(cls) = current {
                for field in cls.fields() {
                    inner.init_field_slot(field.name());
                }
                current = cls.base_class();
            }
        }
        obj
    }
}

impl std::fmt::Debug for Class {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Class")
            .field("name", &self.qualified_name())
            .field("fields", &self.fields.borrow().len())
            .field("methods", &self.methods.borrow().len())
            .field("has_base", &self.base_class.borrow().is_some())
            .finish()
    }
}
