//! JSON module loader.
//!
//! Populates a VM's class registry from a module document of the shape
//! `{ "types": [ ... ] }`. The loader is lenient by default: instructions
//! that fail to decode are reported to standard error and skipped, so a
//! partially decodable module still loads (and typically fails later at
//! execution time). Strict mode turns the first decode failure into a load
//! failure.

use std::path::Path;

use core_types::{normalize_type_name, ErrorKind, PrimitiveType, RuntimeError, RuntimeResult};
use instruction_set::{decode_instruction, decode_label_map, Instruction};
use serde_json::Value as Json;

use crate::class::{Class, ClassRef, Field};
use crate::method::Method;
use crate::registry::ClassRegistry;
use crate::types::TypeReference;
use crate::vm::VirtualMachine;

/// On-disk module formats the driver can encounter.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ModuleFormat {
    /// A JSON module document
    Json,
    /// The textual IR dialect (parsed by an external tool, not this loader)
    IrText,
    /// The binary FOB container (loaded by an external tool, not this loader)
    Fob,
}

/// Detect a module's format from its leading bytes and file extension. The
/// magic bytes `F`,`O`,`B` win over any extension.
pub fn detect_format(path: &Path, head: &[u8]) -> ModuleFormat {
    if head.starts_with(b"FOB") {
        return ModuleFormat::Fob;
    }
    let extension = path
        .extension()
        .and_then(|e| e.to_str())
        .map(|e| e.to_ascii_lowercase());
    match extension.as_deref() {
        Some("ir") => ModuleFormat::IrText,
        _ => ModuleFormat::Json,
    }
}

/// Loader for JSON module documents.
#[derive(Debug, Clone, Copy, Default)]
pub struct ModuleLoader {
    strict: bool,
}

impl ModuleLoader {
    /// Create a lenient loader.
    pub fn new() -> Self {
        ModuleLoader { strict: false }
    }

    /// Fail the load on the first instruction decode error instead of
    /// skipping it.
    pub fn with_strict(mut self, strict: bool) -> Self {
        self.strict = strict;
        self
    }

    /// Parse a module document and register its classes into `vm`.
    pub fn load_str(&self, vm: &mut VirtualMachine, text: &str) -> RuntimeResult<()> {
        let document: Json = serde_json::from_str(text).map_err(|e| {
            RuntimeError::new(ErrorKind::BadOpcode, format!("module JSON parse error: {e}"))
        })?;

        let Some(types) = document.get("types").and_then(Json::as_array) else {
            return Ok(());
        };

        // First pass registers every class so base and interface names can
        // resolve regardless of declaration order.
        let mut pending: Vec<(ClassRef, Option<String>, Vec<String>)> = Vec::new();
        for type_json in types {
            let kind = type_json
                .get("kind")
                .and_then(Json::as_str)
                .unwrap_or("")
                .to_ascii_lowercase();
            if kind != "class" {
                // Interface and struct entries are accepted and skipped.
                continue;
            }
            pending.push(self.load_class(vm, type_json)?);
        }

        for (class, base_name, interface_names) in pending {
            if let Some(base_name) = base_name {
                match vm.registry().get(&base_name) {
                    Ok(base) => class.set_base_class(base),
                    Err(err) if self.strict => return Err(err),
                    Err(_) => eprintln!(
                        "[loader] base class not found for {}: {base_name}",
                        class.qualified_name()
                    ),
                }
            }
            for interface_name in interface_names {
                match vm.registry().get(&interface_name) {
                    Ok(interface) => class.add_interface(interface),
                    Err(err) if self.strict => return Err(err),
                    Err(_) => eprintln!(
                        "[loader] interface not found for {}: {interface_name}",
                        class.qualified_name()
                    ),
                }
            }
        }

        Ok(())
    }

    fn load_class(
        &self,
        vm: &mut VirtualMachine,
        class_json: &Json,
    ) -> RuntimeResult<(ClassRef, Option<String>, Vec<String>)> {
        let name = class_json
            .get("name")
            .and_then(Json::as_str)
            .ok_or_else(|| RuntimeError::new(ErrorKind::BadOpcode, "class entry missing name"))?;
        let namespace = class_json
            .get("namespace")
            .and_then(Json::as_str)
            .unwrap_or("");

        let class = Class::new_ref(name);
        class.set_namespace(namespace);
        class.set_abstract(
            class_json
                .get("isAbstract")
                .and_then(Json::as_bool)
                .unwrap_or(false),
        );
        class.set_sealed(
            class_json
                .get("isSealed")
                .and_then(Json::as_bool)
                .unwrap_or(false),
        );

        if let Some(fields) = class_json.get("fields").and_then(Json::as_array) {
            self.load_fields(vm, &class, fields)?;
        }
        if let Some(methods) = class_json.get("methods").and_then(Json::as_array) {
            self.load_methods(vm, &class, methods)?;
        }

        let base_name = class_json
            .get("base")
            .and_then(Json::as_str)
            .filter(|s| !s.is_empty())
            .map(str::to_string);
        let interface_names = class_json
            .get("interfaces")
            .and_then(Json::as_array)
            .map(|names| {
                names
                    .iter()
                    .filter_map(Json::as_str)
                    .map(str::to_string)
                    .collect()
            })
            .unwrap_or_default();

        vm.register_class(class.clone());
        Ok((class, base_name, interface_names))
    }

    fn load_fields(
        &self,
        vm: &VirtualMachine,
        class: &ClassRef,
        fields: &[Json],
    ) -> RuntimeResult<()> {
        for field_json in fields {
            let name = field_json
                .get("name")
                .and_then(Json::as_str)
                .ok_or_else(|| RuntimeError::new(ErrorKind::BadOpcode, "field entry missing name"))?;
            let type_text = field_json
                .get("type")
                .and_then(Json::as_str)
                .unwrap_or("object");
            let field_type = parse_type_reference(vm.registry(), type_text);
            class.add_field(std::rc::Rc::new(Field::new(name, field_type)));
        }
        Ok(())
    }

    fn load_methods(
        &self,
        vm: &VirtualMachine,
        class: &ClassRef,
        methods: &[Json],
    ) -> RuntimeResult<()> {
        for method_json in methods {
            let name = method_json
                .get("name")
                .and_then(Json::as_str)
                .ok_or_else(|| {
                    RuntimeError::new(ErrorKind::BadOpcode, "method entry missing name")
                })?;
            let return_type_text = method_json
                .get("returnType")
                .and_then(Json::as_str)
                .unwrap_or("void");

            let mut method = Method::new(name, parse_type_reference(vm.registry(), return_type_text))
                .with_static(
                    method_json
                        .get("isStatic")
                        .and_then(Json::as_bool)
                        .unwrap_or(false),
                )
                .with_virtual(
                    method_json
                        .get("isVirtual")
                        .and_then(Json::as_bool)
                        .unwrap_or(false),
                );

            if let Some(parameters) = method_json.get("parameters").and_then(Json::as_array) {
                for parameter in parameters {
                    let pname = parameter.get("name").and_then(Json::as_str).unwrap_or("");
                    let ptype = parameter
                        .get("type")
                        .and_then(Json::as_str)
                        .unwrap_or("object");
                    method = method.with_parameter(pname, parse_type_reference(vm.registry(), ptype));
                }
            }

            // Both lower-camel and Pascal spellings occur in the wild.
            let locals = method_json
                .get("localVariables")
                .or_else(|| method_json.get("LocalVariables"))
                .and_then(Json::as_array);
            if let Some(locals) = locals {
                for local in locals {
                    let lname = local.get("name").and_then(Json::as_str).unwrap_or("");
                    let ltype = local.get("type").and_then(Json::as_str).unwrap_or("object");
                    method = method.with_local(lname, parse_type_reference(vm.registry(), ltype));
                }
            }

            let method = std::rc::Rc::new(method);

            if let Some(label_map) = method_json.get("labelMap") {
                if label_map.is_object() {
                    method.set_label_map(decode_label_map(label_map));
                }
            }

            if let Some(nodes) = method_json.get("instructions").and_then(Json::as_array) {
                let instructions =
                    self.decode_body(&class.qualified_name(), name, nodes)?;
                if !instructions.is_empty() {
                    method.set_instructions(instructions);
                }
            }

            class.add_method(method);
        }
        Ok(())
    }

    fn decode_body(
        &self,
        class_name: &str,
        method_name: &str,
        nodes: &[Json],
    ) -> RuntimeResult<Vec<Instruction>> {
        let mut instructions = Vec::with_capacity(nodes.len());
        for (index, node) in nodes.iter().enumerate() {
            match decode_instruction(node) {
                Ok(instruction) => instructions.push(instruction),
                Err(err) if self.strict => {
                    return Err(RuntimeError::new(
                        err.kind,
                        format!("{class_name}.{method_name} instruction {index}: {}", err.message),
                    ))
                }
                Err(err) => {
                    eprintln!(
                        "[loader] skipping instruction {index} in {class_name}.{method_name}: {err}"
                    );
                }
            }
        }
        Ok(instructions)
    }
}

/// Resolve a type name to a reference: primitives by canonical name, known
/// classes through the registry, anything else the untyped object reference.
pub fn parse_type_reference(registry: &ClassRegistry, raw: &str) -> TypeReference {
    let normalized = normalize_type_name(raw);
    if normalized == "object" {
        return TypeReference::Object;
    }
    if let Some(primitive) = PrimitiveType::from_canonical(&normalized) {
        return TypeReference::Primitive(primitive);
    }
    match registry.get(&normalized) {
        Ok(class) => TypeReference::Class(class),
        Err(_) => TypeReference::Object,
    }
}
