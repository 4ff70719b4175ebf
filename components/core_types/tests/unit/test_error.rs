//! Unit tests for the runtime error taxonomy

use core_types::{ErrorKind, RuntimeError, RuntimeResult};

#[test]
fn test_every_kind_has_a_display_name() {
    let kinds = [
        ErrorKind::TypeMismatch,
        ErrorKind::StackUnderflow,
        ErrorKind::OutOfRange,
        ErrorKind::LocalNotFound,
        ErrorKind::ArgumentNotFound,
        ErrorKind::FieldNotFound,
        ErrorKind::NoInstance,
        ErrorKind::BadOpcode,
        ErrorKind::BadBranchTarget,
        ErrorKind::DivideByZero,
        ErrorKind::UnsupportedOperation,
        ErrorKind::ClassNotFound,
        ErrorKind::MethodNotFound,
        ErrorKind::AmbiguousOverload,
        ErrorKind::NoMatchingOverload,
        ErrorKind::Unimplemented,
        ErrorKind::AbiIncompatible,
        ErrorKind::PluginMissingEntry,
        ErrorKind::PluginInitFailed,
        ErrorKind::UnhandledThrow,
    ];
    for kind in kinds {
        assert!(!kind.as_str().is_empty());
    }
}

#[test]
fn test_error_propagates_through_question_mark() {
    fn inner() -> RuntimeResult<i32> {
        Err(RuntimeError::new(ErrorKind::MethodNotFound, "Frobnicate"))
    }
    fn outer() -> RuntimeResult<i32> {
        let v = inner()?;
        Ok(v + 1)
    }
    let err = outer().unwrap_err();
    assert_eq!(err.kind, ErrorKind::MethodNotFound);
    assert!(err.message.contains("Frobnicate"));
}

#[test]
fn test_error_message_formatting() {
    let err = RuntimeError::new(ErrorKind::BadBranchTarget, "target 99 out of range");
    let text = err.to_string();
    assert!(text.starts_with("bad branch target"));
    assert!(text.contains("99"));
}
