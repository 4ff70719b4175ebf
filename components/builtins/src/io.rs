//! System.IO.File native methods.
//!
//! Whole-file convenience operations. I/O failures surface as runtime
//! errors; there is no exception object to catch them with.

use core_types::{ErrorKind, RuntimeError};
use interpreter::{Class, TypeReference, Value, VirtualMachine};

use crate::support::{arg_str, native};

/// Register `System.IO.File`.
pub fn register(vm: &mut VirtualMachine) {
    let file = Class::new_ref("File");
    file.set_namespace("System.IO");
    file.set_abstract(true);

    file.add_method(native(
        "ReadAllText",
        TypeReference::string(),
        true,
        &[("path", TypeReference::string())],
        |_, args, _| {
            let path = arg_str(args, 0)?;
            std::fs::read_to_string(path).map(Value::String).map_err(|e| {
                RuntimeError::new(
                    ErrorKind::UnsupportedOperation,
                    format!("cannot read {path}: {e}"),
                )
            })
        },
    ));

    file.add_method(native(
        "WriteAllText",
        TypeReference::void(),
        true,
        &[
            ("path", TypeReference::string()),
            ("contents", TypeReference::string()),
        ],
        |_, args, _| {
            let path = arg_str(args, 0)?;
            let contents = arg_str(args, 1)?;
            std::fs::write(path, contents).map_err(|e| {
                RuntimeError::new(
                    ErrorKind::UnsupportedOperation,
                    format!("cannot write {path}: {e}"),
                )
            })?;
            Ok(Value::Null)
        },
    ));

    file.add_method(native(
        "Exists",
        TypeReference::bool(),
        true,
        &[("path", TypeReference::string())],
        |_, args, _| Ok(Value::Boolean(std::path::Path::new(arg_str(args, 0)?).is_file())),
    ));

    file.add_method(native(
        "Delete",
        TypeReference::bool(),
        true,
        &[("path", TypeReference::string())],
        |_, args, _| {
            Ok(Value::Boolean(
                std::fs::remove_file(arg_str(args, 0)?).is_ok(),
            ))
        },
    ));

    vm.register_class(file);
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_write_read_exists_delete_cycle() {
        let mut vm = VirtualMachine::new();
        register(&mut vm);

        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("note.txt");
        let path_value = Value::String(path.to_string_lossy().into_owned());

        vm.invoke_static_by_name(
            "System.IO.File",
            "WriteAllText",
            &[path_value.clone(), Value::String("hello".to_string())],
        )
        .unwrap();

        assert_eq!(
            vm.invoke_static_by_name("System.IO.File", "Exists", &[path_value.clone()])
                .unwrap(),
            Value::Boolean(true)
        );
        assert_eq!(
            vm.invoke_static_by_name("System.IO.File", "ReadAllText", &[path_value.clone()])
                .unwrap(),
            Value::String("hello".to_string())
        );
        assert_eq!(
            vm.invoke_static_by_name("System.IO.File", "Delete", &[path_value.clone()])
                .unwrap(),
            Value::Boolean(true)
        );
        assert_eq!(
            vm.invoke_static_by_name("System.IO.File", "Exists", &[path_value]).unwrap(),
            Value::Boolean(false)
        );
    }

    #[test]
    fn test_read_missing_file_fails() {
        let mut vm = VirtualMachine::new();
        register(&mut vm);
        let err = vm
            .invoke_static_by_name(
                "System.IO.File",
                "ReadAllText",
                &[Value::String("/definitely/not/here.txt".to_string())],
            )
            .unwrap_err();
        assert_eq!(err.kind, ErrorKind::UnsupportedOperation);
    }
}
