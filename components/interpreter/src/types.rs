//! Type references.
//!
//! A [`TypeReference`] describes a primitive, a class-backed object type, or
//! a one-dimensional array of another type. Two textual renderings exist:
//! the canonical one used by normalization and overload matching, and the
//! legacy display one the original metadata exporter used for locals.

use core_types::PrimitiveType;

use crate::class::ClassRef;

/// A reference to a type.
#[derive(Clone)]
pub enum TypeReference {
    /// One of the primitive types
    Primitive(PrimitiveType),
    /// A class-backed object type
    Class(ClassRef),
    /// An object type with no resolved class
    Object,
    /// A one-dimensional array of the element type
    Array(Box<TypeReference>),
}

impl TypeReference {
    /// Shorthand for the int32 primitive.
    pub fn int32() -> Self {
        TypeReference::Primitive(PrimitiveType::Int32)
    }

    /// Shorthand for the int64 primitive.
    pub fn int64() -> Self {
        TypeReference::Primitive(PrimitiveType::Int64)
    }

    /// Shorthand for the float32 primitive.
    pub fn float32() -> Self {
        TypeReference::Primitive(PrimitiveType::Float32)
    }

    /// Shorthand for the float64 primitive.
    pub fn float64() -> Self {
        TypeReference::Primitive(PrimitiveType::Float64)
    }

    /// Shorthand for the bool primitive.
    pub fn bool() -> Self {
        TypeReference::Primitive(PrimitiveType::Bool)
    }

    /// Shorthand for void.
    pub fn void() -> Self {
        TypeReference::Primitive(PrimitiveType::Void)
    }

    /// Shorthand for the string primitive.
    pub fn string() -> Self {
        TypeReference::Primitive(PrimitiveType::String)
    }

    /// Shorthand for the uint8 primitive.
    pub fn uint8() -> Self {
        TypeReference::Primitive(PrimitiveType::UInt8)
    }

    /// Shorthand for the untyped object reference.
    pub fn object() -> Self {
        TypeReference::Object
    }

    /// Whether this is the void primitive.
    pub fn is_void(&self) -> bool {
        matches!(self, TypeReference::Primitive(PrimitiveType::Void))
    }

    /// Whether this is any primitive.
    pub fn is_primitive(&self) -> bool {
        matches!(self, TypeReference::Primitive(_))
    }

    /// The backing class for class-typed references.
    pub fn class_ref(&self) -> Option<&ClassRef> {
        match self {
            TypeReference::Class(cls) => Some(cls),
            _ => None,
        }
    }

    /// The canonical type name: primitive canonical spellings, qualified
    /// class names, `object` for unresolved object types, `T[]` for arrays.
    pub fn canonical_name(&self) -> String {
        match self {
            TypeReference::Primitive(prim) => prim.canonical_name().to_string(),
            TypeReference::Class(cls) => cls.qualified_name(),
            TypeReference::Object => "object".to_string(),
            TypeReference::Array(element) => format!("{}[]", element.canonical_name()),
        }
    }

    /// The legacy display name: identical to the canonical form except that
    /// floats render as `float`/`double` and classes render their simple
    /// name. Used for the `locals` section of exported metadata.
    pub fn legacy_name(&self) -> String {
        match self {
            TypeReference::Primitive(prim) => prim.legacy_name().to_string(),
            TypeReference::Class(cls) => cls.name().to_string(),
            TypeReference::Object => "object".to_string(),
            TypeReference::Array(element) => format!("{}[]", element.legacy_name()),
        }
    }
}

impl std::fmt::Debug for TypeReference {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "TypeReference({})", self.canonical_name())
    }
}
