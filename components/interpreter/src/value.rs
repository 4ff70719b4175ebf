//! Runtime value representation.
//!
//! This module provides the core `Value` enum that represents every value
//! the stack machine can hold. Primitives are stored inline; objects are
//! shared references with identity semantics.

use std::fmt;
use std::hash::{Hash, Hasher};
use std::rc::Rc;

use core_types::{ErrorKind, RuntimeError, RuntimeResult};

use crate::object::ObjectRef;

/// A runtime value.
///
/// Equality is structural for primitives and strings and identity-based for
/// object references; comparisons across variant tags are always false (no
/// implicit promotion). Hashing agrees with equality on every variant so
/// values can key mappings.
///
/// # Examples
///
/// ```
/// use interpreter::Value;
///
/// let n = Value::Int32(42);
/// assert!(n.is_int32());
/// assert_eq!(n.as_int32().unwrap(), 42);
/// assert_ne!(n, Value::Int64(42)); // no promotion across tags
/// ```
#[derive(Debug, Clone)]
pub enum Value {
    /// The null value
    Null,
    /// 32-bit signed integer
    Int32(i32),
    /// 64-bit signed integer
    Int64(i64),
    /// 32-bit IEEE float
    Float32(f32),
    /// 64-bit IEEE float
    Float64(f64),
    /// Boolean
    Boolean(bool),
    /// UTF-8 string
    String(String),
    /// Shared object reference
    Object(ObjectRef),
}

impl Value {
    /// Whether this is the null value.
    pub fn is_null(&self) -> bool {
        matches!(self, Value::Null)
    }

    /// Whether this is an int32.
    pub fn is_int32(&self) -> bool {
        matches!(self, Value::Int32(_))
    }

    /// Whether this is an int64.
    pub fn is_int64(&self) -> bool {
        matches!(self, Value::Int64(_))
    }

    /// Whether this is a float32.
    pub fn is_float32(&self) -> bool {
        matches!(self, Value::Float32(_))
    }

    /// Whether this is a float64.
    pub fn is_float64(&self) -> bool {
        matches!(self, Value::Float64(_))
    }

    /// Whether this is a boolean.
    pub fn is_bool(&self) -> bool {
        matches!(self, Value::Boolean(_))
    }

    /// Whether this is a string.
    pub fn is_string(&self) -> bool {
        matches!(self, Value::String(_))
    }

    /// Whether this is an object reference.
    pub fn is_object(&self) -> bool {
        matches!(self, Value::Object(_))
    }

    /// Whether this is an integer of either width.
    pub fn is_integer(&self) -> bool {
        self.is_int32() || self.is_int64()
    }

    /// The int32 payload, or `TypeMismatch`.
    pub fn as_int32(&self) -> RuntimeResult<i32> {
        match self {
            Value::Int32(v) => Ok(*v),
            other => Err(tag_mismatch("int32", other)),
        }
    }

    /// The int64 payload, or `TypeMismatch`.
    pub fn as_int64(&self) -> RuntimeResult<i64> {
        match self {
            Value::Int64(v) => Ok(*v),
            other => Err(tag_mismatch("int64", other)),
        }
    }

    /// The float32 payload, or `TypeMismatch`.
    pub fn as_float32(&self) -> RuntimeResult<f32> {
        match self {
            Value::Float32(v) => Ok(*v),
            other => Err(tag_mismatch("float32", other)),
        }
    }

    /// The float64 payload, or `TypeMismatch`.
    pub fn as_float64(&self) -> RuntimeResult<f64> {
        match self {
            Value::Float64(v) => Ok(*v),
            other => Err(tag_mismatch("float64", other)),
        }
    }

    /// The boolean payload, or `TypeMismatch`.
    pub fn as_bool(&self) -> RuntimeResult<bool> {
        match self {
            Value::Boolean(v) => Ok(*v),
            other => Err(tag_mismatch("bool", other)),
        }
    }

    /// The string payload, or `TypeMismatch`.
    pub fn as_string(&self) -> RuntimeResult<&str> {
        match self {
            Value::String(v) => Ok(v),
            other => Err(tag_mismatch("string", other)),
        }
    }

    /// The object payload, or `TypeMismatch`.
    pub fn as_object(&self) -> RuntimeResult<ObjectRef> {
        match self {
            Value::Object(v) => Ok(v.clone()),
            other => Err(tag_mismatch("object", other)),
        }
    }

    /// The name of this value's variant tag, used in diagnostics.
    pub fn tag_name(&self) -> &'static str {
        match self {
            Value::Null => "null",
            Value::Int32(_) => "int32",
            Value::Int64(_) => "int64",
            Value::Float32(_) => "float32",
            Value::Float64(_) => "float64",
            Value::Boolean(_) => "bool",
            Value::String(_) => "string",
            Value::Object(_) => "object",
        }
    }

    /// Widen to int64, truncating floats. Fails with `TypeMismatch` for
    /// non-numeric variants.
    pub fn to_int64(&self) -> RuntimeResult<i64> {
        match self {
            Value::Int32(v) => Ok(i64::from(*v)),
            Value::Int64(v) => Ok(*v),
            Value::Float32(v) => Ok(*v as i64),
            Value::Float64(v) => Ok(*v as i64),
            other => Err(tag_mismatch("a numeric value", other)),
        }
    }

    /// Widen to float64. Fails with `TypeMismatch` for non-numeric variants.
    pub fn to_float64(&self) -> RuntimeResult<f64> {
        match self {
            Value::Int32(v) => Ok(f64::from(*v)),
            Value::Int64(v) => Ok(*v as f64),
            Value::Float32(v) => Ok(f64::from(*v)),
            Value::Float64(v) => Ok(*v),
            other => Err(tag_mismatch("a numeric value", other)),
        }
    }

    /// Truthiness: null is false, booleans are themselves, numbers compare
    /// against zero, strings against empty, and object references are true.
    pub fn to_bool(&self) -> bool {
        match self {
            Value::Null => false,
            Value::Boolean(v) => *v,
            Value::Int32(v) => *v != 0,
            Value::Int64(v) => *v != 0,
            Value::Float32(v) => *v != 0.0,
            Value::Float64(v) => *v != 0.0,
            Value::String(v) => !v.is_empty(),
            Value::Object(_) => true,
        }
    }

    /// The display string used by `Console.WriteLine` and string
    /// concatenation: primitives in their natural textual form, `<object>`
    /// for opaque references.
    pub fn to_display_string(&self) -> String {
        self.to_string()
    }
}

fn tag_mismatch(expected: &str, actual: &Value) -> RuntimeError {
    RuntimeError::new(
        ErrorKind::TypeMismatch,
        format!("expected {expected}, found {}", actual.tag_name()),
    )
}

impl PartialEq for Value {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Value::Null, Value::Null) => true,
            (Value::Int32(a), Value::Int32(b)) => a == b,
            (Value::Int64(a), Value::Int64(b)) => a == b,
            (Value::Float32(a), Value::Float32(b)) => a == b,
            (Value::Float64(a), Value::Float64(b)) => a == b,
            (Value::Boolean(a), Value::Boolean(b)) => a == b,
            (Value::String(a), Value::String(b)) => a == b,
            (Value::Object(a), Value::Object(b)) => Rc::ptr_eq(a, b),
            _ => false,
        }
    }
}

impl Eq for Value {}

impl Hash for Value {
    fn hash<H: Hasher>(&self, state: &mut H) {
        std::mem::discriminant(self).hash(state);
        match self {
            Value::Null => {}
            Value::Int32(v) => v.hash(state),
            Value::Int64(v) => v.hash(state),
            Value::Float32(v) => v.to_bits().hash(state),
            Value::Float64(v) => v.to_bits().hash(state),
            Value::Boolean(v) => v.hash(state),
            Value::String(v) => v.hash(state),
            Value::Object(v) => (Rc::as_ptr(v) as usize).hash(state),
        }
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Null => f.write_str("null"),
            Value::Int32(v) => write!(f, "{v}"),
            Value::Int64(v) => write!(f, "{v}"),
            Value::Float32(v) => write!(f, "{v}"),
            Value::Float64(v) => write!(f, "{v}"),
            Value::Boolean(v) => f.write_str(if *v { "true" } else { "false" }),
            Value::String(v) => f.write_str(v),
            Value::Object(_) => f.write_str("<object>"),
        }
    }
}
