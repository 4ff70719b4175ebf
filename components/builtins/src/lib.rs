//! Standard-library native classes for the ObjectIR runtime.
//!
//! Registers the `System.*` classes whose methods are implemented natively:
//! - `System.Console` - console output and input
//! - `System.Math` - floating-point math and constants
//! - `System.Convert` - value conversions
//! - `System.String` - static string helpers
//! - `System.Collections.Generic.*` - List, Dictionary, Stack, Queue, HashSet
//! - `System.IO.File` - whole-file convenience I/O
//!
//! # Example
//!
//! ```
//! use interpreter::{Value, VirtualMachine};
//!
//! let mut vm = VirtualMachine::new();
//! builtins::register_standard_library(&mut vm);
//!
//! let result = vm
//!     .invoke_static_by_name("System.Math", "Sqrt", &[Value::Float64(16.0)])
//!     .unwrap();
//! assert_eq!(result, Value::Float64(4.0));
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod collections;
pub mod console;
pub mod convert;
pub mod io;
pub mod math;
pub mod strings;

mod support;

use interpreter::VirtualMachine;

/// Register every standard-library class into `vm`.
pub fn register_standard_library(vm: &mut VirtualMachine) {
    console::register(vm);
    math::register(vm);
    convert::register(vm);
    strings::register(vm);
    collections::register(vm);
    io::register(vm);
}
