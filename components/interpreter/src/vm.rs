//! The virtual machine.
//!
//! A [`VirtualMachine`] owns the class registry, the context stack, the
//! output writer, and the loaded plugins. One VM is single-threaded: nothing
//! yields control except native methods and nested invocations through the
//! frame stack.

use std::rc::Rc;

use core_types::{normalize_type_name, ErrorKind, RuntimeError, RuntimeResult};
use instruction_set::{encode_instruction_block, CallTarget};
use serde_json::{json, Value as Json};

use crate::class::{ClassRef, Instantiate};
use crate::executor;
use crate::frame::{ExecutionContext, FrameRef};
use crate::method::MethodRef;
use crate::object::ObjectRef;
use crate::plugin::LoadedPlugin;
use crate::registry::ClassRegistry;
use crate::types::TypeReference;
use crate::value::Value;

/// Sink for interpreter-visible output.
pub trait OutputWriter {
    /// Write a chunk of text. Chunks arrive in program order.
    fn write(&mut self, text: &str);
}

/// Default writer printing to standard output.
pub struct StdoutWriter;

impl OutputWriter for StdoutWriter {
    fn write(&mut self, text: &str) {
        print!("{text}");
    }
}

/// Writer that accumulates output in a shared buffer, for tests and
/// embedders that capture program output.
#[derive(Clone, Default)]
pub struct CaptureWriter {
    buffer: Rc<std::cell::RefCell<String>>,
}

impl CaptureWriter {
    /// Create an empty capture buffer.
    pub fn new() -> Self {
        CaptureWriter::default()
    }

    /// Everything written so far.
    pub fn contents(&self) -> String {
        self.buffer.borrow().clone()
    }
}

impl OutputWriter for CaptureWriter {
    fn write(&mut self, text: &str) {
        self.buffer.borrow_mut().push_str(text);
    }
}

/// The runtime engine: class registry, context stack, output, plugins.
pub struct VirtualMachine {
    registry: ClassRegistry,
    frames: Vec<FrameRef>,
    output: Box<dyn OutputWriter>,
    pub(crate) plugins: Vec<LoadedPlugin>,
}

impl VirtualMachine {
    /// Create a VM with an empty registry writing to stdout.
    pub fn new() -> Self {
        VirtualMachine {
            registry: ClassRegistry::new(),
            frames: Vec::new(),
            output: Box::new(StdoutWriter),
            plugins: Vec::new(),
        }
    }

    /// Replace the output writer.
    pub fn set_output(&mut self, output: Box<dyn OutputWriter>) {
        self.output = output;
    }

    /// Write text to the output writer.
    pub fn write_output(&mut self, text: &str) {
        self.output.write(text);
    }

    /// The class registry.
    pub fn registry(&self) -> &ClassRegistry {
        &self.registry
    }

    /// Register a class.
    pub fn register_class(&mut self, class: ClassRef) {
        self.registry.register(class);
    }

    /// Look up a class by any of its aliases.
    pub fn get_class(&self, name: &str) -> RuntimeResult<ClassRef> {
        self.registry.get(name)
    }

    /// Whether a class alias exists.
    pub fn has_class(&self, name: &str) -> bool {
        self.registry.has(name)
    }

    /// All registered alias strings, sorted and deduplicated.
    pub fn all_class_names(&self) -> Vec<String> {
        self.registry.all_class_names()
    }

    /// Allocate an instance of the named class. Constructor methods are the
    /// caller's responsibility; allocation alone never runs `.ctor`.
    pub fn create_object(&mut self, class_name: &str) -> RuntimeResult<ObjectRef> {
        let class = self.registry.get(class_name)?;
        Ok(class.create_instance())
    }

    /// Allocate an array of `length` null elements.
    pub fn create_array(&mut self, element_type: TypeReference, length: i32) -> ObjectRef {
        crate::array::Array::new(element_type, length).into_object()
    }

    /// The frame currently executing, if any.
    pub fn current_frame(&self) -> Option<FrameRef> {
        self.frames.last().cloned()
    }

    /// Current frame-stack depth.
    pub fn frame_depth(&self) -> usize {
        self.frames.len()
    }

    /// Invoke an instance method by bare name: the unique method found by
    /// walking the receiver's class chain, ignoring parameter lists.
    pub fn invoke_instance_by_name(
        &mut self,
        object: &ObjectRef,
        method_name: &str,
        args: &[Value],
    ) -> RuntimeResult<Value> {
        let class = receiver_class(object)?;
        let method = class.lookup_method(method_name).ok_or_else(|| {
            RuntimeError::new(
                ErrorKind::MethodNotFound,
                format!("method not found: {method_name}"),
            )
        })?;
        self.dispatch(&method, Some(object), args)
    }

    /// Invoke an instance method through a call target, resolving overloads
    /// by parameter types.
    pub fn invoke_instance(
        &mut self,
        object: &ObjectRef,
        target: &CallTarget,
        args: &[Value],
    ) -> RuntimeResult<Value> {
        let class = receiver_class(object)?;
        let method = resolve_overload(&class, target, false)?;
        self.dispatch(&method, Some(object), args)
    }

    /// Invoke a static method by bare name on the given class.
    pub fn invoke_static_by_name(
        &mut self,
        class_name: &str,
        method_name: &str,
        args: &[Value],
    ) -> RuntimeResult<Value> {
        let class = self.registry.get(class_name)?;
        self.invoke_static_on(&class, method_name, args)
    }

    /// Invoke a static method by bare name on a class handle.
    pub fn invoke_static_on(
        &mut self,
        class: &ClassRef,
        method_name: &str,
        args: &[Value],
    ) -> RuntimeResult<Value> {
        let method = class.lookup_method(method_name).ok_or_else(|| {
            RuntimeError::new(
                ErrorKind::MethodNotFound,
                format!("static method not found: {method_name}"),
            )
        })?;
        self.dispatch(&method, None, args)
    }

    /// Invoke a static method through a call target, resolving overloads by
    /// parameter types. Only static methods are considered.
    pub fn invoke_static(
        &mut self,
        class: &ClassRef,
        target: &CallTarget,
        args: &[Value],
    ) -> RuntimeResult<Value> {
        let method = resolve_overload(class, target, true)?;
        self.dispatch(&method, None, args)
    }

    /// Run a resolved method: native bodies call straight through, and
    /// interpreted bodies execute in a fresh frame pushed onto the context
    /// stack. A void return type forces a null result.
    fn dispatch(
        &mut self,
        method: &MethodRef,
        this: Option<&ObjectRef>,
        args: &[Value],
    ) -> RuntimeResult<Value> {
        if let Some(native) = method.native_impl() {
            return native(this, args, self);
        }

        if let Some(instructions) = method.instructions() {
            let frame = ExecutionContext::new_ref(method.clone());
            {
                let mut ctx = frame.borrow_mut();
                ctx.set_this(this.cloned());
                ctx.set_arguments(args);
            }
            let label_map = method.label_map();

            self.frames.push(frame.clone());
            let result = executor::run(&instructions, &frame, self, &label_map);
            self.frames.pop();

            let value = result?;
            if method.return_type().is_void() {
                return Ok(Value::Null);
            }
            return Ok(value);
        }

        Err(RuntimeError::new(
            ErrorKind::Unimplemented,
            format!("method has no implementation: {}", method.name()),
        ))
    }

    /// Export one class's metadata in the plugin-API JSON shape.
    pub fn export_class_metadata(
        &self,
        name: &str,
        include_instructions: bool,
    ) -> RuntimeResult<Json> {
        let class = self.registry.get(name)?;
        Ok(class_metadata(&class, include_instructions))
    }

    /// Export every registered class under a `types` array.
    pub fn export_metadata(&self, include_instructions: bool) -> Json {
        let types: Vec<Json> = self
            .registry
            .unique_classes()
            .iter()
            .map(|class| class_metadata(class, include_instructions))
            .collect();
        json!({ "types": types })
    }
}

impl Default for VirtualMachine {
    fn default() -> Self {
        VirtualMachine::new()
    }
}

impl std::fmt::Debug for VirtualMachine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("VirtualMachine")
            .field("registry", &self.registry)
            .field("frame_depth", &self.frames.len())
            .field("plugins", &self.plugins.len())
            .finish()
    }
}

fn receiver_class(object: &ObjectRef) -> RuntimeResult<ClassRef> {
    object.borrow().class().ok_or_else(|| {
        RuntimeError::new(
            ErrorKind::NoInstance,
            "cannot invoke a method on an object without a class",
        )
    })
}

fn class_metadata(class: &ClassRef, include_instructions: bool) -> Json {
    let fields: Vec<Json> = class
        .fields()
        .iter()
        .map(|field| {
            json!({
                "name": field.name(),
                "type": field.field_type().canonical_name(),
            })
        })
        .collect();

    let methods: Vec<Json> = class
        .methods()
        .iter()
        .map(|method| {
            let parameters: Vec<Json> = method
                .parameters()
                .iter()
                .map(|(name, ty)| json!({ "name": name, "type": ty.canonical_name() }))
                .collect();

            let mut node = json!({
                "name": method.name(),
                "returnType": method.return_type().canonical_name(),
                "isStatic": method.is_static(),
                "isVirtual": method.is_virtual(),
                "parameters": parameters,
            });

            if !method.locals().is_empty() {
                // Locals keep the legacy type spelling; see DESIGN.md.
                let locals: Vec<Json> = method
                    .locals()
                    .iter()
                    .map(|(name, ty)| json!({ "name": name, "type": ty.legacy_name() }))
                    .collect();
                node["locals"] = Json::Array(locals);
            }

            if include_instructions {
                if let Some(instructions) = method.instructions() {
                    node["instructions"] = encode_instruction_block(&instructions);
                }
            }

            node
        })
        .collect();

    json!({
        "name": class.name(),
        "namespace": class.namespace(),
        "fullName": class.qualified_name(),
        "kind": "class",
        "isAbstract": class.is_abstract(),
        "isSealed": class.is_sealed(),
        "fields": fields,
        "methods": methods,
    })
}

/// Collect every method with `name` walking `class` and its base chain.
fn collect_methods_by_name(class: &ClassRef, name: &str) -> Vec<MethodRef> {
    let mut matches = Vec::new();
    let mut current = Some(class.clone());
    while let Some(cls) = current {
        for method in cls.methods() {
            if method.name() == name {
                matches.push(method);
            }
        }
        current = cls.base_class();
    }
    matches
}

fn type_name_matches_parameter(requested: &str, parameter: &TypeReference) -> bool {
    let requested_norm = normalize_type_name(requested);
    let param_canon = parameter.canonical_name();
    if requested_norm == param_canon {
        return true;
    }

    // An unqualified request may match the trailing segment of a qualified
    // parameter type.
    if !requested_norm.contains('.') {
        let param_simple = match param_canon.rfind('.') {
            Some(dot) => &param_canon[dot + 1..],
            None => param_canon.as_str(),
        };
        return requested_norm == param_simple;
    }

    false
}

fn format_method_signature(method: &MethodRef) -> String {
    let mut signature = String::from(method.name());
    signature.push('(');
    for (index, (_, ty)) in method.parameters().iter().enumerate() {
        if index > 0 {
            signature.push_str(", ");
        }
        signature.push_str(&ty.canonical_name());
    }
    signature.push_str(") -> ");
    signature.push_str(&method.return_type().canonical_name());
    signature
}

fn candidate_listing(methods: &[MethodRef]) -> String {
    methods
        .iter()
        .map(|m| format!("\n  - {}", format_method_signature(m)))
        .collect()
}

/// Select the overload a call target names.
///
/// With no parameter types, resolution succeeds only when a single viable
/// method exists. With parameter types, an exact per-parameter type match
/// wins; if none matches exactly but exactly one candidate has the right
/// arity, that legacy fallback wins.
pub(crate) fn resolve_overload(
    class: &ClassRef,
    target: &CallTarget,
    require_static: bool,
) -> RuntimeResult<MethodRef> {
    let methods = collect_methods_by_name(class, &target.name);
    if methods.is_empty() {
        return Err(RuntimeError::new(
            ErrorKind::MethodNotFound,
            format!("method not found: {}", target.name),
        ));
    }

    let viable: Vec<MethodRef> = methods
        .iter()
        .filter(|m| !require_static || m.is_static())
        .cloned()
        .collect();

    if target.parameter_types.is_empty() {
        if viable.len() == 1 {
            return Ok(viable[0].clone());
        }
        return Err(RuntimeError::new(
            ErrorKind::AmbiguousOverload,
            format!(
                "ambiguous overload for '{}'; provide parameterTypes. Candidates:{}",
                target.name,
                candidate_listing(&viable)
            ),
        ));
    }

    let requested: Vec<String> = target
        .parameter_types
        .iter()
        .map(|t| normalize_type_name(t))
        .collect();

    let exact: Vec<MethodRef> = viable
        .iter()
        .filter(|method| {
            let params = method.parameters();
            params.len() == requested.len()
                && params
                    .iter()
                    .zip(requested.iter())
                    .all(|((_, ty), req)| type_name_matches_parameter(req, ty))
        })
        .cloned()
        .collect();

    match exact.len() {
        1 => return Ok(exact[0].clone()),
        0 => {}
        _ => {
            return Err(RuntimeError::new(
                ErrorKind::AmbiguousOverload,
                format!(
                    "ambiguous overload for '{}' with provided signature. Candidates:{}",
                    target.name,
                    candidate_listing(&exact)
                ),
            ))
        }
    }

    // Legacy fallback: a unique arity match wins regardless of types.
    let arity: Vec<MethodRef> = viable
        .iter()
        .filter(|m| m.parameters().len() == requested.len())
        .cloned()
        .collect();
    if arity.len() == 1 {
        return Ok(arity[0].clone());
    }

    Err(RuntimeError::new(
        ErrorKind::NoMatchingOverload,
        format!(
            "no matching overload for '{}'. Candidates:{}",
            target.name,
            candidate_listing(&viable)
        ),
    ))
}
