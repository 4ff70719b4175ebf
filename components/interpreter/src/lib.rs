//! Execution engine for the ObjectIR runtime.
//!
//! This crate contains the heart of the runtime:
//!
//! - [`Value`] - the variant-typed runtime value
//! - [`Object`] / [`Array`] - heap instances with field storage
//! - [`Class`] / [`Method`] / [`Field`] - reflective metadata
//! - [`ClassRegistry`] - name-indexed class lookup with aliases
//! - [`ExecutionContext`] - the per-invocation frame
//! - [`executor`] - the instruction dispatch loop
//! - [`VirtualMachine`] - registry, frame stack, output, invocation, plugins
//! - [`loader`] - the JSON module loader
//!
//! # Example
//!
//! ```
//! use interpreter::{ModuleLoader, Value, VirtualMachine};
//!
//! let module = r#"{"types": [{
//!     "kind": "class", "name": "Program", "namespace": "",
//!     "methods": [{
//!         "name": "Answer", "returnType": "int32", "isStatic": true,
//!         "instructions": [{"opCode": "ldi4", "operand": 42}, {"opCode": "ret"}]
//!     }]
//! }]}"#;
//!
//! let mut vm = VirtualMachine::new();
//! ModuleLoader::new().load_str(&mut vm, module).unwrap();
//! let result = vm.invoke_static_by_name("Program", "Answer", &[]).unwrap();
//! assert_eq!(result, Value::Int32(42));
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod array;
pub mod class;
pub mod executor;
pub mod frame;
pub mod loader;
pub mod method;
pub mod object;
pub mod plugin;
pub mod registry;
pub mod types;
pub mod value;
pub mod vm;

pub use array::Array;
pub use class::{Class, ClassRef, Field, FieldRef, Instantiate};
pub use frame::{ExecutionContext, FrameRef};
pub use loader::{detect_format, ModuleFormat, ModuleLoader};
pub use method::{Method, MethodBody, MethodRef, NativeMethod};
pub use object::{Object, ObjectRef};
pub use plugin::{PluginInfo, RUNTIME_ABI_VERSION_PACKED};
pub use registry::ClassRegistry;
pub use types::TypeReference;
pub use value::Value;
pub use vm::{CaptureWriter, OutputWriter, StdoutWriter, VirtualMachine};
