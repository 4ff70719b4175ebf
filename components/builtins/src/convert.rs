//! System.Convert native methods.
//!
//! Conversions accept any numeric variant, booleans, and numeric strings;
//! unconvertible inputs fail with `TypeMismatch`.

use core_types::{ErrorKind, RuntimeError, RuntimeResult};
use interpreter::{Class, TypeReference, Value, VirtualMachine};

use crate::support::{arg, native};

fn to_i64(value: &Value) -> RuntimeResult<i64> {
    match value {
        Value::Boolean(flag) => Ok(i64::from(*flag)),
        Value::String(text) => text.trim().parse::<i64>().map_err(|_| {
            RuntimeError::new(
                ErrorKind::TypeMismatch,
                format!("cannot convert {text:?} to an integer"),
            )
        }),
        other => other.to_int64(),
    }
}

fn to_f64(value: &Value) -> RuntimeResult<f64> {
    match value {
        Value::Boolean(flag) => Ok(if *flag { 1.0 } else { 0.0 }),
        Value::String(text) => text.trim().parse::<f64>().map_err(|_| {
            RuntimeError::new(
                ErrorKind::TypeMismatch,
                format!("cannot convert {text:?} to a float"),
            )
        }),
        other => other.to_float64(),
    }
}

/// Register `System.Convert`.
pub fn register(vm: &mut VirtualMachine) {
    let convert = Class::new_ref("Convert");
    convert.set_namespace("System");
    convert.set_abstract(true);

    convert.add_method(native(
        "ToInt32",
        TypeReference::int32(),
        true,
        &[("value", TypeReference::object())],
        |_, args, _| Ok(Value::Int32(to_i64(arg(args, 0)?)? as i32)),
    ));
    convert.add_method(native(
        "ToInt64",
        TypeReference::int64(),
        true,
        &[("value", TypeReference::object())],
        |_, args, _| Ok(Value::Int64(to_i64(arg(args, 0)?)?)),
    ));
    convert.add_method(native(
        "ToSingle",
        TypeReference::float32(),
        true,
        &[("value", TypeReference::object())],
        |_, args, _| Ok(Value::Float32(to_f64(arg(args, 0)?)? as f32)),
    ));
    convert.add_method(native(
        "ToDouble",
        TypeReference::float64(),
        true,
        &[("value", TypeReference::object())],
        |_, args, _| Ok(Value::Float64(to_f64(arg(args, 0)?)?)),
    ));
    convert.add_method(native(
        "ToBoolean",
        TypeReference::bool(),
        true,
        &[("value", TypeReference::object())],
        |_, args, _| Ok(Value::Boolean(arg(args, 0)?.to_bool())),
    ));
    convert.add_method(native(
        "ToString",
        TypeReference::string(),
        true,
        &[("value", TypeReference::object())],
        |_, args, _| {
            let value = arg(args, 0)?;
            let text = if value.is_null() {
                String::new()
            } else {
                value.to_display_string()
            };
            Ok(Value::String(text))
        },
    ));

    vm.register_class(convert);
}
