//! Runtime orchestration for module execution.
//!
//! The `Runtime` struct wires the components together: the module loader
//! populates a VM that already carries the standard library, plugins load
//! before the entry invocation, and entry resolution applies the historical
//! `Main.Main` to `Program.Main` fallback.

use std::path::Path;

use interpreter::{detect_format, ModuleFormat, ModuleLoader, OutputWriter, Value, VirtualMachine};

use crate::error::{CliError, CliResult};

/// Orchestrates loading and execution for the CLI.
pub struct Runtime {
    vm: VirtualMachine,
    strict: bool,
}

impl Runtime {
    /// Create a runtime with the standard library registered.
    ///
    /// # Arguments
    /// * `strict` - fail module loading on the first undecodable instruction
    pub fn new(strict: bool) -> Self {
        let mut vm = VirtualMachine::new();
        builtins::register_standard_library(&mut vm);
        Runtime { vm, strict }
    }

    /// Redirect interpreter output (used by tests).
    pub fn set_output(&mut self, output: Box<dyn OutputWriter>) {
        self.vm.set_output(output);
    }

    /// Direct access to the underlying VM.
    pub fn vm_mut(&mut self) -> &mut VirtualMachine {
        &mut self.vm
    }

    /// Load a module file, detecting its format by magic bytes and
    /// extension. Only JSON modules load in-process; FOB containers and
    /// textual IR are produced by external tools.
    pub fn load_module_file(&mut self, path: &str) -> CliResult<()> {
        let bytes = std::fs::read(path)?;
        match detect_format(Path::new(path), &bytes) {
            ModuleFormat::Fob => Err(CliError::UnsupportedFormat(format!(
                "{path}: FOB containers require the external FOB loader"
            ))),
            ModuleFormat::IrText => Err(CliError::UnsupportedFormat(format!(
                "{path}: textual IR requires the external IR parser"
            ))),
            ModuleFormat::Json => {
                let text = String::from_utf8_lossy(strip_utf8_bom(&bytes)).into_owned();
                ModuleLoader::new()
                    .with_strict(self.strict)
                    .load_str(&mut self.vm, &text)?;
                Ok(())
            }
        }
    }

    /// Load a module from a JSON string.
    pub fn load_module_str(&mut self, text: &str) -> CliResult<()> {
        ModuleLoader::new()
            .with_strict(self.strict)
            .load_str(&mut self.vm, text)?;
        Ok(())
    }

    /// Load a native plugin.
    pub fn load_plugin(&mut self, path: &str) -> CliResult<()> {
        self.vm.load_plugin(Path::new(path))?;
        Ok(())
    }

    /// Invoke `entry` (`Class.Method`) with string arguments and return its
    /// result. The default `Main.Main` entry falls back to `Program.Main`
    /// when no `Main` class exists.
    pub fn run_entry(&mut self, entry: &str, args: &[String]) -> CliResult<Value> {
        let (mut class_name, mut method_name) = split_entry(entry)?;

        if !self.vm.has_class(&class_name) && entry == "Main.Main" && self.vm.has_class("Program")
        {
            class_name = "Program".to_string();
            method_name = "Main".to_string();
        }

        let values: Vec<Value> = args.iter().map(|a| Value::String(a.clone())).collect();
        let result = self
            .vm
            .invoke_static_by_name(&class_name, &method_name, &values)?;
        Ok(result)
    }
}

fn split_entry(entry: &str) -> CliResult<(String, String)> {
    match entry.rfind('.') {
        Some(dot) if dot > 0 && dot + 1 < entry.len() => {
            Ok((entry[..dot].to_string(), entry[dot + 1..].to_string()))
        }
        _ => Err(CliError::BadEntryPoint(format!(
            "{entry} (expected Class.Method or Namespace.Class.Method)"
        ))),
    }
}

fn strip_utf8_bom(bytes: &[u8]) -> &[u8] {
    bytes.strip_prefix(&[0xEF, 0xBB, 0xBF]).unwrap_or(bytes)
}
