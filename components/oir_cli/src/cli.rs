//! CLI argument definitions.

use clap::Parser;

/// Run an ObjectIR module to completion.
#[derive(Parser, Debug)]
#[command(name = "objectir", version, about = "ObjectIR runtime")]
pub struct Cli {
    /// Path to the module file (.json, .ir, or FOB container)
    pub module: String,

    /// Entry point as Class.Method or Namespace.Class.Method
    #[arg(default_value = "Main.Main")]
    pub entry: String,

    /// Arguments passed to the entry method (as strings)
    #[arg(trailing_var_arg = true)]
    pub args: Vec<String>,

    /// Native plugin libraries to load before execution
    #[arg(long = "plugin", value_name = "PATH")]
    pub plugins: Vec<String>,

    /// Fail module loading on the first undecodable instruction
    #[arg(long)]
    pub strict: bool,
}
