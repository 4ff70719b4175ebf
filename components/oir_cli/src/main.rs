//! ObjectIR runtime CLI
//!
//! Entry point for the `objectir` binary. Parses CLI arguments, loads the
//! module and any plugins, and runs the entry method to completion.

use clap::Parser;
use interpreter::Value;
use oir_cli::{Cli, Runtime};

// The binary carries the plugin host surface so loaded plugins can call
// back into the runtime.
use plugin_api as _;

fn main() {
    let cli = Cli::parse();

    let mut runtime = Runtime::new(cli.strict);

    if let Err(e) = runtime.load_module_file(&cli.module) {
        eprintln!("Error: {e}");
        std::process::exit(1);
    }

    for plugin in &cli.plugins {
        if let Err(e) = runtime.load_plugin(plugin) {
            eprintln!("Error: {e}");
            std::process::exit(1);
        }
    }

    match runtime.run_entry(&cli.entry, &cli.args) {
        Ok(result) => {
            if !matches!(result, Value::Null) {
                println!("Result: {result}");
            }
        }
        Err(e) => {
            eprintln!("Error: {e}");
            std::process::exit(1);
        }
    }
}
