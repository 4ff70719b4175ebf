//! Core types for the ObjectIR runtime.
//!
//! This crate provides the foundational types shared by every layer of the
//! runtime: the error taxonomy, the primitive type enumeration, and the
//! CLR-alias type-name normalization rules.
//!
//! # Overview
//!
//! - [`RuntimeError`] - Runtime failures with an [`ErrorKind`] discriminant
//! - [`PrimitiveType`] - The primitive types of the ObjectIR type system
//! - [`normalize_type_name`] - Canonical spelling for CLR-style type aliases
//!
//! # Examples
//!
//! ```
//! use core_types::{normalize_type_name, ErrorKind, PrimitiveType, RuntimeError};
//!
//! assert_eq!(normalize_type_name("System.Int32"), "int32");
//! assert_eq!(PrimitiveType::Float32.canonical_name(), "float32");
//!
//! let error = RuntimeError::new(ErrorKind::DivideByZero, "division by zero");
//! assert_eq!(error.kind, ErrorKind::DivideByZero);
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod error;
pub mod type_names;

pub use error::{ErrorKind, RuntimeError, RuntimeResult};
pub use type_names::{normalize_type_name, normalize_type_names, PrimitiveType};
