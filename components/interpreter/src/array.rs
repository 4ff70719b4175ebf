//! Runtime arrays.
//!
//! An [`Array`] is a length-fixed sequence of values with an element type,
//! carried by a host [`Object`](crate::Object) as native data. Out-of-bounds
//! access is relaxed for compatibility with the original runtime: reads
//! yield null and writes are ignored.

use std::cell::RefCell;
use std::rc::Rc;

use crate::object::{Object, ObjectRef};
use crate::types::TypeReference;
use crate::value::Value;

/// A one-dimensional runtime array.
#[derive(Debug)]
pub struct Array {
    element_type: TypeReference,
    elements: Vec<Value>,
}

impl Array {
    /// Create an array of `length` null elements.
    pub fn new(element_type: TypeReference, length: i32) -> Self {
        let size = length.max(0) as usize;
        Array {
            element_type,
            elements: vec![Value::Null; size],
        }
    }

    /// The element at `index`, or null when out of bounds.
    pub fn get(&self, index: i32) -> Value {
        if index < 0 {
            return Value::Null;
        }
        self.elements
            .get(index as usize)
            .cloned()
            .unwrap_or(Value::Null)
    }

    /// Store `value` at `index`; out-of-bounds writes are ignored.
    pub fn set(&mut self, index: i32, value: Value) {
        if index < 0 {
            return;
        }
        if let Some(slot) = self.elements.get_mut(index as usize) {
            *slot = value;
        }
    }

    /// The fixed length.
    pub fn len(&self) -> i32 {
        self.elements.len() as i32
    }

    /// Whether the array has zero elements.
    pub fn is_empty(&self) -> bool {
        self.elements.is_empty()
    }

    /// The element type.
    pub fn element_type(&self) -> &TypeReference {
        &self.element_type
    }

    /// Wrap this array in a host object so it can travel as a value.
    pub fn into_object(self) -> ObjectRef {
        let obj = Object::new_ref();
        obj.borrow_mut().set_native_data(Rc::new(RefCell::new(self)));
        obj
    }

    /// The array carried by `object`, if any.
    pub fn from_object(object: &ObjectRef) -> Option<Rc<RefCell<Array>>> {
        object.borrow().native_data::<RefCell<Array>>()
    }
}
