//! ObjectIR runtime CLI library.
//!
//! Provides the [`Runtime`] orchestrator and supporting modules for the
//! `objectir` binary.

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod cli;
pub mod error;
pub mod runtime;

pub use cli::Cli;
pub use error::{CliError, CliResult};
pub use runtime::Runtime;
