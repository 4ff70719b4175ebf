//! Unit tests for type-name normalization

use core_types::{normalize_type_name, PrimitiveType};

#[test]
fn test_full_alias_table() {
    let table = [
        ("System.Void", "void"),
        ("void", "void"),
        ("System.String", "string"),
        ("string", "string"),
        ("System.Boolean", "bool"),
        ("bool", "bool"),
        ("boolean", "bool"),
        ("System.Int32", "int32"),
        ("int32", "int32"),
        ("int", "int32"),
        ("System.Int64", "int64"),
        ("int64", "int64"),
        ("long", "int64"),
        ("System.Single", "float32"),
        ("Single", "float32"),
        ("float", "float32"),
        ("float32", "float32"),
        ("System.Double", "float64"),
        ("double", "float64"),
        ("float64", "float64"),
        ("System.Byte", "uint8"),
        ("byte", "uint8"),
        ("uint8", "uint8"),
        ("System.Object", "object"),
        ("object", "object"),
    ];
    for (raw, expected) in table {
        assert_eq!(normalize_type_name(raw), expected, "alias {raw}");
    }
}

#[test]
fn test_unknown_names_survive_unchanged() {
    assert_eq!(normalize_type_name("HelloWorld.Program"), "HelloWorld.Program");
    assert_eq!(normalize_type_name("Int32Holder"), "Int32Holder");
}

#[test]
fn test_canonical_roundtrip_through_primitive_type() {
    for prim in [
        PrimitiveType::Int32,
        PrimitiveType::Int64,
        PrimitiveType::Float32,
        PrimitiveType::Float64,
        PrimitiveType::Bool,
        PrimitiveType::Void,
        PrimitiveType::String,
        PrimitiveType::UInt8,
        PrimitiveType::Object,
    ] {
        let name = prim.canonical_name();
        assert_eq!(PrimitiveType::from_canonical(name), Some(prim));
        assert_eq!(normalize_type_name(name), name);
    }
}
