//! Method definitions.
//!
//! A method body is one of three forms: a list of instructions, a native
//! implementation, or nothing (an unimplemented stub). The body is a cell so
//! plugins can swap it at runtime; frames snapshot the instruction list at
//! creation, so a swap never affects an execution already in flight.

use std::cell::RefCell;
use std::collections::HashMap;
use std::rc::Rc;

use core_types::RuntimeResult;
use instruction_set::Instruction;

use crate::object::ObjectRef;
use crate::types::TypeReference;
use crate::value::Value;
use crate::vm::VirtualMachine;

/// Shared handle to a method.
pub type MethodRef = Rc<Method>;

/// Signature of native method implementations: receiver (absent for static
/// methods), arguments, and the VM for output and reentrant invocation.
pub type NativeMethod =
    Rc<dyn Fn(Option<&ObjectRef>, &[Value], &mut VirtualMachine) -> RuntimeResult<Value>>;

/// The body of a method. A method has at most one form at any time;
/// installing one clears the other.
#[derive(Clone, Default)]
pub enum MethodBody {
    /// No implementation
    #[default]
    Stub,
    /// An interpreted instruction list
    Instructions(Rc<Vec<Instruction>>),
    /// A native implementation
    Native(NativeMethod),
}

/// A method definition.
pub struct Method {
    name: String,
    return_type: TypeReference,
    is_static: bool,
    is_virtual: bool,
    parameters: Vec<(String, TypeReference)>,
    locals: Vec<(String, TypeReference)>,
    body: RefCell<MethodBody>,
    label_map: RefCell<Rc<HashMap<String, usize>>>,
}

impl Method {
    /// Create an instance method with no parameters and no body.
    pub fn new(name: impl Into<String>, return_type: TypeReference) -> Self {
        Method {
            name: name.into(),
            return_type,
            is_static: false,
            is_virtual: false,
            parameters: Vec::new(),
            locals: Vec::new(),
            body: RefCell::new(MethodBody::Stub),
            label_map: RefCell::new(Rc::new(HashMap::new())),
        }
    }

    /// Mark the method static.
    pub fn with_static(mut self, value: bool) -> Self {
        self.is_static = value;
        self
    }

    /// Mark the method virtual. The flag is advisory metadata; dispatch
    /// always uses the receiver's runtime class.
    pub fn with_virtual(mut self, value: bool) -> Self {
        self.is_virtual = value;
        self
    }

    /// Append a parameter.
    pub fn with_parameter(mut self, name: impl Into<String>, ty: TypeReference) -> Self {
        self.parameters.push((name.into(), ty));
        self
    }

    /// Append a local variable.
    pub fn with_local(mut self, name: impl Into<String>, ty: TypeReference) -> Self {
        self.locals.push((name.into(), ty));
        self
    }

    /// The method name.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// The declared return type.
    pub fn return_type(&self) -> &TypeReference {
        &self.return_type
    }

    /// Whether the method is static.
    pub fn is_static(&self) -> bool {
        self.is_static
    }

    /// Whether the method is marked virtual.
    pub fn is_virtual(&self) -> bool {
        self.is_virtual
    }

    /// The ordered parameter list.
    pub fn parameters(&self) -> &[(String, TypeReference)] {
        &self.parameters
    }

    /// The ordered local-variable list.
    pub fn locals(&self) -> &[(String, TypeReference)] {
        &self.locals
    }

    /// Replace the body with an instruction list.
    pub fn set_instructions(&self, instructions: Vec<Instruction>) {
        *self.body.borrow_mut() = MethodBody::Instructions(Rc::new(instructions));
    }

    /// Replace the body with a native implementation.
    pub fn set_native(&self, implementation: NativeMethod) {
        *self.body.borrow_mut() = MethodBody::Native(implementation);
    }

    /// Whether any body form is installed.
    pub fn has_body(&self) -> bool {
        !matches!(&*self.body.borrow(), MethodBody::Stub)
    }

    /// A snapshot of the instruction list, if the body is interpreted.
    /// Frames hold this snapshot for their whole lifetime.
    pub fn instructions(&self) -> Option<Rc<Vec<Instruction>>> {
        match &*self.body.borrow() {
            MethodBody::Instructions(list) => Some(list.clone()),
            _ => None,
        }
    }

    /// The native implementation, if the body is native.
    pub fn native_impl(&self) -> Option<NativeMethod> {
        match &*self.body.borrow() {
            MethodBody::Native(implementation) => Some(implementation.clone()),
            _ => None,
        }
    }

    /// Install the label map used for branch resolution.
    pub fn set_label_map(&self, map: HashMap<String, usize>) {
        *self.label_map.borrow_mut() = Rc::new(map);
    }

    /// A snapshot of the label map.
    pub fn label_map(&self) -> Rc<HashMap<String, usize>> {
        self.label_map.borrow().clone()
    }
}

impl std::fmt::Debug for Method {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let body = match &*self.body.borrow() {
            MethodBody::Stub => "stub",
            MethodBody::Instructions(_) => "instructions",
            MethodBody::Native(_) => "native",
        };
        f.debug_struct("Method")
            .field("name", &self.name)
            .field("return_type", &self.return_type.canonical_name())
            .field("is_static", &self.is_static)
            .field("parameters", &self.parameters.len())
            .field("body", &body)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use instruction_set::OpCode;

    #[test]
    fn test_new_method_is_a_stub() {
        let method = Method::new("Frob", TypeReference::void());
        assert!(!method.has_body());
        assert!(method.instructions().is_none());
        assert!(method.native_impl().is_none());
    }

    #[test]
    fn test_set_instructions_replaces_native() {
        let method = Method::new("Frob", TypeReference::void());
        method.set_native(Rc::new(|_, _, _| Ok(Value::Null)));
        assert!(method.native_impl().is_some());

        method.set_instructions(vec![Instruction::new(OpCode::Ret)]);
        assert!(method.native_impl().is_none());
        assert_eq!(method.instructions().unwrap().len(), 1);
    }

    #[test]
    fn test_set_native_replaces_instructions() {
        let method = Method::new("Frob", TypeReference::void());
        method.set_instructions(vec![Instruction::new(OpCode::Ret)]);

        method.set_native(Rc::new(|_, _, _| Ok(Value::Int32(1))));
        assert!(method.instructions().is_none());
        assert!(method.native_impl().is_some());
    }

    #[test]
    fn test_instruction_snapshot_survives_replacement() {
        let method = Method::new("Frob", TypeReference::void());
        method.set_instructions(vec![Instruction::new(OpCode::Nop), Instruction::new(OpCode::Ret)]);

        let snapshot = method.instructions().unwrap();
        method.set_instructions(vec![Instruction::new(OpCode::Ret)]);

        // The old snapshot is untouched by the swap.
        assert_eq!(snapshot.len(), 2);
        assert_eq!(method.instructions().unwrap().len(), 1);
    }

    #[test]
    fn test_builder_style_construction() {
        let method = Method::new("Add", TypeReference::int32())
            .with_static(true)
            .with_parameter("a", TypeReference::int32())
            .with_parameter("b", TypeReference::int32())
            .with_local("sum", TypeReference::int32());
        assert!(method.is_static());
        assert_eq!(method.parameters().len(), 2);
        assert_eq!(method.locals().len(), 1);
    }

    #[test]
    fn test_label_map_snapshot() {
        let method = Method::new("Loop", TypeReference::void());
        let mut map = HashMap::new();
        map.insert("top".to_string(), 2usize);
        method.set_label_map(map);
        assert_eq!(method.label_map().get("top"), Some(&2));
    }
}
