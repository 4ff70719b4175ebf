//! System.String native methods.
//!
//! Static helpers over string values; instance-style methods take the
//! subject string as their first argument, which is how the IR emitters
//! lower string member calls.

use core_types::{ErrorKind, RuntimeError};
use interpreter::{Class, TypeReference, Value, VirtualMachine};

use crate::support::{arg, arg_i64, arg_str, native};

/// Register `System.String`.
pub fn register(vm: &mut VirtualMachine) {
    let string_class = Class::new_ref("String");
    string_class.set_namespace("System");
    string_class.set_sealed(true);

    string_class.add_method(native(
        "Concat",
        TypeReference::string(),
        true,
        &[
            ("str0", TypeReference::string()),
            ("str1", TypeReference::string()),
        ],
        |_, args, _| {
            let mut text = String::new();
            for value in args {
                if !value.is_null() {
                    text.push_str(&value.to_display_string());
                }
            }
            Ok(Value::String(text))
        },
    ));

    string_class.add_method(native(
        "IsNullOrEmpty",
        TypeReference::bool(),
        true,
        &[("value", TypeReference::string())],
        |_, args, _| {
            let empty = match arg(args, 0)? {
                Value::Null => true,
                Value::String(text) => text.is_empty(),
                _ => false,
            };
            Ok(Value::Boolean(empty))
        },
    ));

    string_class.add_method(native(
        "Length",
        TypeReference::int32(),
        true,
        &[("value", TypeReference::string())],
        |_, args, _| Ok(Value::Int32(arg_str(args, 0)?.chars().count() as i32)),
    ));

    string_class.add_method(native(
        "Substring",
        TypeReference::string(),
        true,
        &[
            ("value", TypeReference::string()),
            ("startIndex", TypeReference::int32()),
        ],
        |_, args, _| {
            let text = arg_str(args, 0)?;
            let start = arg_i64(args, 1)?;
            substring(text, start, None)
        },
    ));
    string_class.add_method(native(
        "Substring",
        TypeReference::string(),
        true,
        &[
            ("value", TypeReference::string()),
            ("startIndex", TypeReference::int32()),
            ("length", TypeReference::int32()),
        ],
        |_, args, _| {
            let text = arg_str(args, 0)?;
            let start = arg_i64(args, 1)?;
            let length = arg_i64(args, 2)?;
            substring(text, start, Some(length))
        },
    ));

    string_class.add_method(native(
        "Contains",
        TypeReference::bool(),
        true,
        &[
            ("value", TypeReference::string()),
            ("substring", TypeReference::string()),
        ],
        |_, args, _| {
            Ok(Value::Boolean(
                arg_str(args, 0)?.contains(arg_str(args, 1)?),
            ))
        },
    ));

    string_class.add_method(native(
        "ToUpper",
        TypeReference::string(),
        true,
        &[("value", TypeReference::string())],
        |_, args, _| Ok(Value::String(arg_str(args, 0)?.to_uppercase())),
    ));
    string_class.add_method(native(
        "ToLower",
        TypeReference::string(),
        true,
        &[("value", TypeReference::string())],
        |_, args, _| Ok(Value::String(arg_str(args, 0)?.to_lowercase())),
    ));

    vm.register_class(string_class);
}

fn substring(text: &str, start: i64, length: Option<i64>) -> Result<Value, RuntimeError> {
    let chars: Vec<char> = text.chars().collect();
    let total = chars.len() as i64;
    if start < 0 || start > total {
        return Err(RuntimeError::new(
            ErrorKind::OutOfRange,
            format!("substring start {start} out of range for length {total}"),
        ));
    }
    let end = match length {
        Some(len) => {
            if len < 0 || start + len > total {
                return Err(RuntimeError::new(
                    ErrorKind::OutOfRange,
                    format!("substring length {len} out of range"),
                ));
            }
            start + len
        }
        None => total,
    };
    Ok(Value::String(
        chars[start as usize..end as usize].iter().collect(),
    ))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn string_vm() -> VirtualMachine {
        let mut vm = VirtualMachine::new();
        register(&mut vm);
        vm
    }

    #[test]
    fn test_concat_skips_nulls() {
        let mut vm = string_vm();
        let result = vm
            .invoke_static_by_name(
                "String",
                "Concat",
                &[Value::String("a".to_string()), Value::Null],
            )
            .unwrap();
        assert_eq!(result, Value::String("a".to_string()));
    }

    #[test]
    fn test_is_null_or_empty() {
        let mut vm = string_vm();
        for (value, expected) in [
            (Value::Null, true),
            (Value::String(String::new()), true),
            (Value::String("x".to_string()), false),
        ] {
            assert_eq!(
                vm.invoke_static_by_name("String", "IsNullOrEmpty", &[value]).unwrap(),
                Value::Boolean(expected)
            );
        }
    }

    #[test]
    fn test_substring_overloads() {
        let mut vm = string_vm();
        let class = vm.get_class("System.String").unwrap();
        let two = instruction_set::CallTarget {
            declaring_type: "System.String".to_string(),
            name: "Substring".to_string(),
            return_type: "string".to_string(),
            parameter_types: vec!["string".to_string(), "int32".to_string()],
        };
        let result = vm
            .invoke_static(&class, &two, &[Value::String("hello".to_string()), Value::Int32(2)])
            .unwrap();
        assert_eq!(result, Value::String("llo".to_string()));

        let three = instruction_set::CallTarget {
            parameter_types: vec![
                "string".to_string(),
                "int32".to_string(),
                "int32".to_string(),
            ],
            ..two
        };
        let result = vm
            .invoke_static(
                &class,
                &three,
                &[
                    Value::String("hello".to_string()),
                    Value::Int32(1),
                    Value::Int32(3),
                ],
            )
            .unwrap();
        assert_eq!(result, Value::String("ell".to_string()));
    }

    #[test]
    fn test_substring_out_of_range() {
        assert!(substring("abc", 4, None).is_err());
        assert!(substring("abc", 1, Some(5)).is_err());
    }

    #[test]
    fn test_length_counts_chars() {
        let mut vm = string_vm();
        assert_eq!(
            vm.invoke_static_by_name("String", "Length", &[Value::String("héllo".to_string())])
                .unwrap(),
            Value::Int32(5)
        );
    }
}
