//! C ABI host surface for ObjectIR plugins.
//!
//! Plugins receive an opaque `*mut VirtualMachine` in their `PluginInit`
//! entry point and call back into the runtime through the functions in this
//! crate. Rich data crosses the boundary as JSON strings; every function
//! either returns a success integer (1) or returns 0 and records a
//! thread-local error string retrievable with [`PluginLastError`].
//!
//! Strings returned through `out` parameters are allocated by the runtime
//! and must be released with [`FreeString`].

#![warn(missing_docs)]
#![warn(clippy::all)]

use std::cell::RefCell;
use std::ffi::{c_char, CStr, CString};

use core_types::{normalize_type_name, ErrorKind, RuntimeError, RuntimeResult};
use instruction_set::decode_instruction;
use interpreter::{ClassRef, MethodRef, TypeReference, VirtualMachine, RUNTIME_ABI_VERSION_PACKED};
use serde_json::Value as Json;

thread_local! {
    static LAST_ERROR: RefCell<CString> = RefCell::new(CString::default());
}

fn set_last_error(message: &str) {
    let sanitized = message.replace('\0', " ");
    LAST_ERROR.with(|slot| {
        *slot.borrow_mut() = CString::new(sanitized).unwrap_or_default();
    });
}

fn clear_last_error() {
    LAST_ERROR.with(|slot| {
        *slot.borrow_mut() = CString::default();
    });
}

/// The error recorded by the last failing call on this thread. The pointer
/// stays valid until the next plugin-API call on the same thread.
#[no_mangle]
pub extern "C" fn PluginLastError() -> *const c_char {
    LAST_ERROR.with(|slot| slot.borrow().as_ptr())
}

/// Release a string allocated by this API. Null is accepted.
///
/// # Safety
/// `ptr` must be null or a pointer previously returned through an `out`
/// parameter of this API, and must not be used afterwards.
#[no_mangle]
pub unsafe extern "C" fn FreeString(ptr: *mut c_char) {
    if !ptr.is_null() {
        drop(CString::from_raw(ptr));
    }
}

/// The packed ABI version of this runtime build.
#[no_mangle]
pub extern "C" fn RuntimeGetPluginAbiVersionPacked() -> u32 {
    RUNTIME_ABI_VERSION_PACKED
}

/// Write a JSON array of all registered class names to `*out_json`.
///
/// # Safety
/// `vm` must be the pointer handed to the plugin's init entry point and
/// `out_json` must be a valid location to store a string pointer.
#[no_mangle]
pub unsafe extern "C" fn GetAllClassNamesJson(
    vm: *mut VirtualMachine,
    out_json: *mut *mut c_char,
) -> i32 {
    if vm.is_null() || out_json.is_null() {
        set_last_error("invalid arguments to GetAllClassNamesJson");
        return 0;
    }
    clear_last_error();

    let vm = &mut *vm;
    let names = vm.all_class_names();
    let json = Json::Array(names.into_iter().map(Json::String).collect());
    match CString::new(json.to_string()) {
        Ok(text) => {
            *out_json = text.into_raw();
            1
        }
        Err(_) => {
            set_last_error("allocation failure");
            0
        }
    }
}

/// Write a class's metadata JSON to `*out_json`. The class name may be
/// simple, qualified, or a trailing `.ClassName` suffix of a qualified name.
///
/// # Safety
/// Same contract as [`GetAllClassNamesJson`]; `class_name` must point to a
/// NUL-terminated string.
#[no_mangle]
pub unsafe extern "C" fn GetClassMetadataJson(
    vm: *mut VirtualMachine,
    class_name: *const c_char,
    include_instructions: i32,
    out_json: *mut *mut c_char,
) -> i32 {
    if vm.is_null() || class_name.is_null() || out_json.is_null() {
        set_last_error("invalid arguments to GetClassMetadataJson");
        return 0;
    }
    clear_last_error();

    let vm = &mut *vm;
    let name = match cstr_argument(class_name, "class_name") {
        Ok(name) => name,
        Err(err) => return fail(err),
    };
    let result = find_class(vm, &name).and_then(|class| {
        vm.export_class_metadata(&class.qualified_name(), include_instructions != 0)
    });

    match result {
        Ok(json) => match CString::new(json.to_string()) {
            Ok(text) => {
                *out_json = text.into_raw();
                1
            }
            Err(_) => {
                set_last_error("allocation failure");
                0
            }
        },
        Err(err) => {
            set_last_error(&err.to_string());
            0
        }
    }
}

/// Replace the instruction list of the unique method named `method_name` on
/// `class_name`. Fails when several overloads share the name; use
/// [`ReplaceMethodInstructionsJsonBySignature`] for those.
///
/// # Safety
/// `vm` as in [`GetAllClassNamesJson`]; the string arguments must point to
/// NUL-terminated strings.
#[no_mangle]
pub unsafe extern "C" fn ReplaceMethodInstructionsJson(
    vm: *mut VirtualMachine,
    class_name: *const c_char,
    method_name: *const c_char,
    instructions_json: *const c_char,
) -> i32 {
    if vm.is_null() || class_name.is_null() || method_name.is_null() || instructions_json.is_null()
    {
        set_last_error("invalid arguments to ReplaceMethodInstructionsJson");
        return 0;
    }
    clear_last_error();

    let vm = &mut *vm;
    let class_name = match cstr_argument(class_name, "class_name") {
        Ok(text) => text,
        Err(err) => return fail(err),
    };
    let method_name = match cstr_argument(method_name, "method_name") {
        Ok(text) => text,
        Err(err) => return fail(err),
    };
    let instructions_json = match cstr_argument(instructions_json, "instructions_json") {
        Ok(text) => text,
        Err(err) => return fail(err),
    };

    let result = find_class(vm, &class_name).and_then(|class| {
        let method = find_method_unique(&class, &method_name)?;
        let instructions = parse_instruction_array(&instructions_json)?;
        method.set_instructions(instructions);
        Ok(())
    });

    finish(result)
}

/// Replace the instruction list of the overload selected by the parameter
/// types in `parameter_types_json` (a JSON array of type-name strings).
/// `return_type` may be null; it is informational.
///
/// # Safety
/// Same contract as [`ReplaceMethodInstructionsJson`]; `return_type` may be
/// null.
#[no_mangle]
pub unsafe extern "C" fn ReplaceMethodInstructionsJsonBySignature(
    vm: *mut VirtualMachine,
    class_name: *const c_char,
    method_name: *const c_char,
    parameter_types_json: *const c_char,
    return_type: *const c_char,
    instructions_json: *const c_char,
) -> i32 {
    let _ = return_type;
    if vm.is_null()
        || class_name.is_null()
        || method_name.is_null()
        || parameter_types_json.is_null()
        || instructions_json.is_null()
    {
        set_last_error("invalid arguments to ReplaceMethodInstructionsJsonBySignature");
        return 0;
    }
    clear_last_error();

    let vm = &mut *vm;
    let class_name = match cstr_argument(class_name, "class_name") {
        Ok(text) => text,
        Err(err) => return fail(err),
    };
    let method_name = match cstr_argument(method_name, "method_name") {
        Ok(text) => text,
        Err(err) => return fail(err),
    };
    let parameter_types_json = match cstr_argument(parameter_types_json, "parameter_types_json") {
        Ok(text) => text,
        Err(err) => return fail(err),
    };
    let instructions_json = match cstr_argument(instructions_json, "instructions_json") {
        Ok(text) => text,
        Err(err) => return fail(err),
    };

    let result = parse_type_name_array(&parameter_types_json).and_then(|parameter_types| {
        let class = find_class(vm, &class_name)?;
        let method = find_method_by_signature(&class, &method_name, &parameter_types)?;
        let instructions = parse_instruction_array(&instructions_json)?;
        method.set_instructions(instructions);
        Ok(())
    });

    finish(result)
}

fn fail(err: RuntimeError) -> i32 {
    set_last_error(&err.to_string());
    0
}

fn finish(result: RuntimeResult<()>) -> i32 {
    match result {
        Ok(()) => 1,
        Err(err) => fail(err),
    }
}

unsafe fn cstr_argument(ptr: *const c_char, what: &str) -> RuntimeResult<String> {
    CStr::from_ptr(ptr)
        .to_str()
        .map(str::to_string)
        .map_err(|_| {
            RuntimeError::new(
                ErrorKind::UnsupportedOperation,
                format!("{what} is not valid UTF-8"),
            )
        })
}

/// Class lookup with the plugin-API relaxation: an exact alias wins, then a
/// trailing `.ClassName` suffix match over all registered names.
fn find_class(vm: &VirtualMachine, class_name: &str) -> RuntimeResult<ClassRef> {
    if class_name.is_empty() {
        return Err(RuntimeError::new(ErrorKind::ClassNotFound, "class name is empty"));
    }
    if vm.has_class(class_name) {
        return vm.get_class(class_name);
    }

    let suffix = format!(".{class_name}");
    for name in vm.all_class_names() {
        if name == class_name || name.ends_with(&suffix) {
            return vm.get_class(&name);
        }
    }

    Err(RuntimeError::new(
        ErrorKind::ClassNotFound,
        format!("class not found: {class_name}"),
    ))
}

fn collect_methods_by_name(class: &ClassRef, name: &str) -> Vec<MethodRef> {
    let mut matches = Vec::new();
    let mut current = Some(class.clone());
    while let Some(cls) = current {
        for method in cls.methods() {
            if method.name() == name {
                matches.push(method);
            }
        }
        current = cls.base_class();
    }
    matches
}

fn find_method_unique(class: &ClassRef, name: &str) -> RuntimeResult<MethodRef> {
    let mut candidates = collect_methods_by_name(class, name);
    match candidates.len() {
        0 => Err(RuntimeError::new(
            ErrorKind::MethodNotFound,
            format!("method not found: {name}"),
        )),
        1 => Ok(candidates.swap_remove(0)),
        _ => Err(RuntimeError::new(
            ErrorKind::AmbiguousOverload,
            format!("ambiguous overload for method: {name}; use the signature-qualified API"),
        )),
    }
}

fn parameter_type_matches(requested: &str, parameter: &TypeReference) -> bool {
    let requested_norm = normalize_type_name(requested);
    let param_canon = parameter.canonical_name();
    if requested_norm == param_canon {
        return true;
    }
    if !requested_norm.contains('.') {
        let simple = match param_canon.rfind('.') {
            Some(dot) => &param_canon[dot + 1..],
            None => param_canon.as_str(),
        };
        return requested_norm == simple;
    }
    false
}

fn find_method_by_signature(
    class: &ClassRef,
    name: &str,
    parameter_types: &[String],
) -> RuntimeResult<MethodRef> {
    let candidates = collect_methods_by_name(class, name);
    if candidates.is_empty() {
        return Err(RuntimeError::new(
            ErrorKind::MethodNotFound,
            format!("method not found: {name}"),
        ));
    }

    let mut exact: Vec<MethodRef> = candidates
        .into_iter()
        .filter(|method| {
            let params = method.parameters();
            params.len() == parameter_types.len()
                && params
                    .iter()
                    .zip(parameter_types.iter())
                    .all(|((_, ty), requested)| parameter_type_matches(requested, ty))
        })
        .collect();

    match exact.len() {
        1 => Ok(exact.swap_remove(0)),
        0 => Err(RuntimeError::new(
            ErrorKind::NoMatchingOverload,
            format!("no matching overload for method: {name}"),
        )),
        _ => Err(RuntimeError::new(
            ErrorKind::AmbiguousOverload,
            format!("ambiguous overload for method: {name}"),
        )),
    }
}

fn parse_type_name_array(text: &str) -> RuntimeResult<Vec<String>> {
    let json: Json = serde_json::from_str(text).map_err(|e| {
        RuntimeError::new(
            ErrorKind::BadOpcode,
            format!("parameterTypes JSON parse error: {e}"),
        )
    })?;
    let Some(entries) = json.as_array() else {
        return Err(RuntimeError::new(
            ErrorKind::BadOpcode,
            "parameterTypes must be a JSON array",
        ));
    };
    entries
        .iter()
        .map(|entry| {
            entry.as_str().map(str::to_string).ok_or_else(|| {
                RuntimeError::new(ErrorKind::BadOpcode, "parameterTypes elements must be strings")
            })
        })
        .collect()
}

fn parse_instruction_array(text: &str) -> RuntimeResult<Vec<instruction_set::Instruction>> {
    let json: Json = serde_json::from_str(text).map_err(|e| {
        RuntimeError::new(
            ErrorKind::BadOpcode,
            format!("instructions JSON parse error: {e}"),
        )
    })?;
    let Some(nodes) = json.as_array() else {
        return Err(RuntimeError::new(
            ErrorKind::BadOpcode,
            "instructions must be a JSON array",
        ));
    };
    let mut instructions = Vec::with_capacity(nodes.len());
    for node in nodes {
        instructions.push(decode_instruction(node)?);
    }
    Ok(instructions)
}

#[cfg(test)]
mod tests {
    use super::*;
    use interpreter::{Class, Method};
    use std::rc::Rc;

    #[test]
    fn test_find_class_suffix_match() {
        let mut vm = VirtualMachine::new();
        let class = Class::new_ref("Program");
        class.set_namespace("HelloWorld");
        vm.register_class(class);

        assert!(find_class(&vm, "Program").is_ok());
        assert!(find_class(&vm, "HelloWorld.Program").is_ok());
        let err = find_class(&vm, "Absent").unwrap_err();
        assert_eq!(err.kind, ErrorKind::ClassNotFound);
    }

    #[test]
    fn test_find_method_unique_rejects_overloads() {
        let class = Class::new_ref("M");
        class.add_method(Rc::new(
            Method::new("F", TypeReference::void())
                .with_static(true)
                .with_parameter("a", TypeReference::int32()),
        ));
        class.add_method(Rc::new(
            Method::new("F", TypeReference::void())
                .with_static(true)
                .with_parameter("a", TypeReference::string()),
        ));

        let err = find_method_unique(&class, "F").unwrap_err();
        assert_eq!(err.kind, ErrorKind::AmbiguousOverload);
    }

    #[test]
    fn test_find_method_by_signature_exact_only() {
        let class = Class::new_ref("M");
        class.add_method(Rc::new(
            Method::new("F", TypeReference::void())
                .with_static(true)
                .with_parameter("a", TypeReference::int32()),
        ));

        assert!(find_method_by_signature(&class, "F", &["System.Int32".to_string()]).is_ok());

        let err =
            find_method_by_signature(&class, "F", &["string".to_string()]).unwrap_err();
        assert_eq!(err.kind, ErrorKind::NoMatchingOverload);
    }

    #[test]
    fn test_parse_type_name_array() {
        assert_eq!(
            parse_type_name_array(r#"["int32", "string"]"#).unwrap(),
            vec!["int32", "string"]
        );
        assert!(parse_type_name_array(r#"{"not": "array"}"#).is_err());
        assert!(parse_type_name_array(r#"[1]"#).is_err());
    }

    #[test]
    fn test_last_error_roundtrip() {
        set_last_error("boom");
        let text = unsafe { CStr::from_ptr(PluginLastError()) };
        assert_eq!(text.to_str().unwrap(), "boom");

        clear_last_error();
        let text = unsafe { CStr::from_ptr(PluginLastError()) };
        assert_eq!(text.to_str().unwrap(), "");
    }
}
