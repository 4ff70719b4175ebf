//! System.Console native methods.
//!
//! `WriteLine` and `Write` route through the VM output writer so embedders
//! and tests capture console traffic; `ReadLine` reads from standard input.

use std::io::BufRead;

use interpreter::{Class, TypeReference, Value, VirtualMachine};

use crate::support::native;

/// Register `System.Console`.
pub fn register(vm: &mut VirtualMachine) {
    let console = Class::new_ref("Console");
    console.set_namespace("System");
    console.set_abstract(true);

    // WriteLine overloads per argument type, plus the bare newline form.
    for (param_name, ty) in [
        ("value", TypeReference::string()),
        ("value", TypeReference::int32()),
        ("value", TypeReference::int64()),
        ("value", TypeReference::float64()),
        ("value", TypeReference::float32()),
        ("value", TypeReference::bool()),
    ] {
        console.add_method(native(
            "WriteLine",
            TypeReference::void(),
            true,
            &[(param_name, ty)],
            |_, args, vm| {
                let text = match args.first() {
                    Some(Value::Null) | None => String::new(),
                    Some(value) => value.to_display_string(),
                };
                vm.write_output(&text);
                vm.write_output("\n");
                Ok(Value::Null)
            },
        ));
    }
    console.add_method(native("WriteLine", TypeReference::void(), true, &[], |_, _, vm| {
        vm.write_output("\n");
        Ok(Value::Null)
    }));

    for (param_name, ty) in [
        ("value", TypeReference::string()),
        ("value", TypeReference::int32()),
        ("value", TypeReference::float64()),
        ("value", TypeReference::bool()),
    ] {
        console.add_method(native(
            "Write",
            TypeReference::void(),
            true,
            &[(param_name, ty)],
            |_, args, vm| {
                let text = match args.first() {
                    Some(Value::Null) | None => String::new(),
                    Some(value) => value.to_display_string(),
                };
                vm.write_output(&text);
                Ok(Value::Null)
            },
        ));
    }

    console.add_method(native(
        "ReadLine",
        TypeReference::string(),
        true,
        &[],
        |_, _, _| {
            let mut line = String::new();
            std::io::stdin().lock().read_line(&mut line).ok();
            while line.ends_with('\n') || line.ends_with('\r') {
                line.pop();
            }
            Ok(Value::String(line))
        },
    ));

    vm.register_class(console);
}
