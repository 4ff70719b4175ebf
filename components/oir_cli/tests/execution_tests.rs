//! Driver-level execution tests
//!
//! Exercises the Runtime orchestration against real module files on disk:
//! format detection, strict loading, entry resolution, and plugin loading
//! failures.

use std::io::Write;

use interpreter::CaptureWriter;
use oir_cli::{CliError, Runtime};

const HELLO: &str = r#"{"types": [{
    "kind": "class", "name": "Program", "namespace": "HelloWorld",
    "methods": [{
        "name": "Main", "returnType": "void", "isStatic": true,
        "instructions": [
            {"opCode": "ldstr", "operand": {"type": "string", "value": "Hello"}},
            {"opCode": "call", "operand": {"method": {
                "declaringType": "System.Console", "name": "WriteLine",
                "returnType": "void", "parameterTypes": ["string"]}}},
            {"opCode": "ret"}
        ]
    }]
}]}"#;

fn write_module(dir: &tempfile::TempDir, name: &str, contents: &[u8]) -> String {
    let path = dir.path().join(name);
    let mut file = std::fs::File::create(&path).unwrap();
    file.write_all(contents).unwrap();
    path.to_string_lossy().into_owned()
}

#[test]
fn runs_a_json_module_file() {
    let dir = tempfile::tempdir().unwrap();
    let path = write_module(&dir, "hello.json", HELLO.as_bytes());

    let mut runtime = Runtime::new(false);
    let capture = CaptureWriter::new();
    runtime.set_output(Box::new(capture.clone()));

    runtime.load_module_file(&path).unwrap();
    runtime.run_entry("Main.Main", &[]).unwrap();
    assert_eq!(capture.contents(), "Hello\n");
}

#[test]
fn json_module_with_utf8_bom_loads() {
    let dir = tempfile::tempdir().unwrap();
    let mut bytes = vec![0xEF, 0xBB, 0xBF];
    bytes.extend_from_slice(HELLO.as_bytes());
    let path = write_module(&dir, "hello.json", &bytes);

    let mut runtime = Runtime::new(false);
    runtime.load_module_file(&path).unwrap();
    assert!(runtime.vm_mut().has_class("HelloWorld.Program"));
}

#[test]
fn fob_magic_bytes_are_detected_and_rejected() {
    let dir = tempfile::tempdir().unwrap();
    let path = write_module(&dir, "module.anything", b"FOB\x01\x02\x03");

    let mut runtime = Runtime::new(false);
    let err = runtime.load_module_file(&path).unwrap_err();
    assert!(matches!(err, CliError::UnsupportedFormat(_)));
}

#[test]
fn ir_extension_is_detected_and_rejected() {
    let dir = tempfile::tempdir().unwrap();
    let path = write_module(&dir, "module.ir", b"class Program { }");

    let mut runtime = Runtime::new(false);
    let err = runtime.load_module_file(&path).unwrap_err();
    assert!(matches!(err, CliError::UnsupportedFormat(_)));
}

#[test]
fn missing_module_file_is_an_io_error() {
    let mut runtime = Runtime::new(false);
    let err = runtime.load_module_file("/no/such/module.json").unwrap_err();
    assert!(matches!(err, CliError::Io(_)));
}

#[test]
fn strict_mode_rejects_partially_decodable_modules() {
    let module = r#"{"types": [{
        "kind": "class", "name": "P",
        "methods": [{
            "name": "M", "returnType": "void", "isStatic": true,
            "instructions": [{"opCode": "zorp"}]
        }]
    }]}"#;
    let dir = tempfile::tempdir().unwrap();
    let path = write_module(&dir, "bad.json", module.as_bytes());

    let mut lenient = Runtime::new(false);
    lenient.load_module_file(&path).unwrap();

    let mut strict = Runtime::new(true);
    let err = strict.load_module_file(&path).unwrap_err();
    assert!(matches!(err, CliError::Runtime(_)));
}

#[test]
fn missing_entry_class_is_a_runtime_error() {
    let dir = tempfile::tempdir().unwrap();
    let path = write_module(&dir, "hello.json", HELLO.as_bytes());

    let mut runtime = Runtime::new(false);
    runtime.load_module_file(&path).unwrap();
    let err = runtime.run_entry("Absent.Main", &[]).unwrap_err();
    assert!(matches!(err, CliError::Runtime(_)));
}

#[test]
fn malformed_entry_point_is_rejected() {
    let mut runtime = Runtime::new(false);
    let err = runtime.run_entry("JustAName", &[]).unwrap_err();
    assert!(matches!(err, CliError::BadEntryPoint(_)));
}

#[test]
fn loading_a_missing_plugin_fails() {
    let mut runtime = Runtime::new(false);
    let err = runtime.load_plugin("/no/such/libplugin.so").unwrap_err();
    assert!(matches!(err, CliError::Runtime(_)));
}
