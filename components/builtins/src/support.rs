//! Shared helpers for native method registration.

use std::rc::Rc;

use core_types::{ErrorKind, RuntimeError, RuntimeResult};
use interpreter::{Method, MethodRef, ObjectRef, TypeReference, Value, VirtualMachine};

/// Build a native method with the given signature.
pub(crate) fn native(
    name: &str,
    return_type: TypeReference,
    is_static: bool,
    params: &[(&str, TypeReference)],
    implementation: impl Fn(Option<&ObjectRef>, &[Value], &mut VirtualMachine) -> RuntimeResult<Value>
        + 'static,
) -> MethodRef {
    let mut method = Method::new(name, return_type).with_static(is_static);
    for (pname, ty) in params {
        method = method.with_parameter(*pname, ty.clone());
    }
    let method = Rc::new(method);
    method.set_native(Rc::new(implementation));
    method
}

/// The receiver of an instance native, or `NoInstance`.
pub(crate) fn receiver<'a>(this: Option<&'a ObjectRef>) -> RuntimeResult<&'a ObjectRef> {
    this.ok_or_else(|| {
        RuntimeError::new(ErrorKind::NoInstance, "instance method called without a receiver")
    })
}

/// The argument at `index`, or `OutOfRange`.
pub(crate) fn arg<'a>(args: &'a [Value], index: usize) -> RuntimeResult<&'a Value> {
    args.get(index).ok_or_else(|| {
        RuntimeError::new(
            ErrorKind::OutOfRange,
            format!("missing argument at position {index}"),
        )
    })
}

/// The argument at `index` widened to float64.
pub(crate) fn arg_f64(args: &[Value], index: usize) -> RuntimeResult<f64> {
    arg(args, index)?.to_float64()
}

/// The argument at `index` widened to int64.
pub(crate) fn arg_i64(args: &[Value], index: usize) -> RuntimeResult<i64> {
    arg(args, index)?.to_int64()
}

/// The argument at `index` as a string slice.
pub(crate) fn arg_str<'a>(args: &'a [Value], index: usize) -> RuntimeResult<&'a str> {
    arg(args, index)?.as_string()
}
