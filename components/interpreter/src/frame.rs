//! Execution frames.
//!
//! An [`ExecutionContext`] is the per-invocation state: the operand stack,
//! the locals and arguments vectors (name-indexed through precomputed maps),
//! and the current `this` reference. Frames are created at invocation, pushed
//! onto the VM's context stack so natives can introspect the current frame,
//! and destroyed on return.

use std::cell::RefCell;
use std::collections::HashMap;
use std::rc::Rc;

use core_types::{ErrorKind, RuntimeError, RuntimeResult};

use crate::method::MethodRef;
use crate::object::ObjectRef;
use crate::value::Value;

/// Shared handle to a frame, used for the VM context stack.
pub type FrameRef = Rc<RefCell<ExecutionContext>>;

/// Per-invocation execution state.
pub struct ExecutionContext {
    method: MethodRef,
    stack: Vec<Value>,
    locals: Vec<Value>,
    arguments: Vec<Value>,
    this_ref: Option<ObjectRef>,
    local_indices: HashMap<String, usize>,
    parameter_indices: HashMap<String, usize>,
}

impl ExecutionContext {
    /// Create a frame for `method`, pre-sizing locals and arguments to the
    /// declared counts and building the name-to-index maps.
    pub fn new(method: MethodRef) -> Self {
        let locals = method.locals();
        let mut local_indices = HashMap::with_capacity(locals.len());
        for (index, (name, _)) in locals.iter().enumerate() {
            local_indices.insert(name.clone(), index);
        }
        let local_count = locals.len();

        let parameters = method.parameters();
        let mut parameter_indices = HashMap::with_capacity(parameters.len());
        for (index, (name, _)) in parameters.iter().enumerate() {
            parameter_indices.insert(name.clone(), index);
        }
        let parameter_count = parameters.len();

        ExecutionContext {
            method,
            stack: Vec::new(),
            locals: vec![Value::Null; local_count],
            arguments: vec![Value::Null; parameter_count],
            this_ref: None,
            local_indices,
            parameter_indices,
        }
    }

    /// Create a shared handle to a new frame.
    pub fn new_ref(method: MethodRef) -> FrameRef {
        Rc::new(RefCell::new(ExecutionContext::new(method)))
    }

    /// The method this frame executes.
    pub fn method(&self) -> &MethodRef {
        &self.method
    }

    /// Push a value onto the operand stack.
    pub fn push(&mut self, value: Value) {
        self.stack.push(value);
    }

    /// Pop the top value, failing with `StackUnderflow` on an empty stack.
    pub fn pop(&mut self) -> RuntimeResult<Value> {
        self.stack.pop().ok_or_else(|| {
            RuntimeError::new(ErrorKind::StackUnderflow, "pop on empty operand stack")
        })
    }

    /// Pop the top value, or null when the stack is empty. Used by `ret` and
    /// by the fall-off-the-end return path.
    pub fn pop_or_null(&mut self) -> Value {
        self.stack.pop().unwrap_or(Value::Null)
    }

    /// The top value without removing it.
    pub fn peek(&self) -> RuntimeResult<Value> {
        self.stack.last().cloned().ok_or_else(|| {
            RuntimeError::new(ErrorKind::StackUnderflow, "peek on empty operand stack")
        })
    }

    /// Current operand stack depth.
    pub fn stack_depth(&self) -> usize {
        self.stack.len()
    }

    /// Store a local by index, growing the vector to fit.
    pub fn set_local(&mut self, index: usize, value: Value) {
        if index >= self.locals.len() {
            self.locals.resize(index + 1, Value::Null);
        }
        self.locals[index] = value;
    }

    /// Load a local by index, failing with `OutOfRange` past the end.
    pub fn get_local(&self, index: usize) -> RuntimeResult<Value> {
        self.locals.get(index).cloned().ok_or_else(|| {
            RuntimeError::new(
                ErrorKind::OutOfRange,
                format!("local index {index} out of range"),
            )
        })
    }

    /// Store a local by name.
    pub fn set_local_by_name(&mut self, name: &str, value: Value) -> RuntimeResult<()> {
        let index = *self.local_indices.get(name).ok_or_else(|| {
            RuntimeError::new(ErrorKind::LocalNotFound, format!("local not found: {name}"))
        })?;
        self.set_local(index, value);
        Ok(())
    }

    /// Load a local by name.
    pub fn get_local_by_name(&self, name: &str) -> RuntimeResult<Value> {
        let index = *self.local_indices.get(name).ok_or_else(|| {
            RuntimeError::new(ErrorKind::LocalNotFound, format!("local not found: {name}"))
        })?;
        self.get_local(index)
    }

    /// Copy the invocation arguments into the frame, resizing if the caller
    /// passed a different count than declared.
    pub fn set_arguments(&mut self, args: &[Value]) {
        if args.len() != self.arguments.len() {
            self.arguments.resize(args.len(), Value::Null);
        }
        self.arguments[..args.len()].clone_from_slice(args);
    }

    /// Load an argument by index, failing with `OutOfRange` past the end.
    pub fn get_argument(&self, index: usize) -> RuntimeResult<Value> {
        self.arguments.get(index).cloned().ok_or_else(|| {
            RuntimeError::new(
                ErrorKind::OutOfRange,
                format!("argument index {index} out of range"),
            )
        })
    }

    /// Load an argument by name. The reserved name `this` always resolves to
    /// the current receiver, the null value for static methods.
    pub fn get_argument_by_name(&self, name: &str) -> RuntimeResult<Value> {
        if name == "this" {
            return Ok(match &self.this_ref {
                Some(obj) => Value::Object(obj.clone()),
                None => Value::Null,
            });
        }

        let index = *self.parameter_indices.get(name).ok_or_else(|| {
            RuntimeError::new(
                ErrorKind::ArgumentNotFound,
                format!("argument not found: {name}"),
            )
        })?;
        self.get_argument(index)
    }

    /// Store an argument by name.
    pub fn set_argument_by_name(&mut self, name: &str, value: Value) -> RuntimeResult<()> {
        let index = *self.parameter_indices.get(name).ok_or_else(|| {
            RuntimeError::new(
                ErrorKind::ArgumentNotFound,
                format!("argument not found: {name}"),
            )
        })?;
        if index >= self.arguments.len() {
            self.arguments.resize(index + 1, Value::Null);
        }
        self.arguments[index] = value;
        Ok(())
    }

    /// The current `this` reference.
    pub fn this(&self) -> Option<ObjectRef> {
        self.this_ref.clone()
    }

    /// Set the `this` reference.
    pub fn set_this(&mut self, this: Option<ObjectRef>) {
        self.this_ref = this;
    }
}

impl std::fmt::Debug for ExecutionContext {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ExecutionContext")
            .field("method", &self.method.name())
            .field("stack_depth", &self.stack.len())
            .field("locals", &self.locals.len())
            .field("arguments", &self.arguments.len())
            .field("has_this", &self.this_ref.is_some())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::method::Method;
    use crate::object::Object;
    use crate::types::TypeReference;

    fn frame_for(method: Method) -> ExecutionContext {
        ExecutionContext::new(Rc::new(method))
    }

    #[test]
    fn test_new_frame_presizes_locals_and_arguments() {
        let method = Method::new("M", TypeReference::void())
            .with_parameter("a", TypeReference::int32())
            .with_local("x", TypeReference::int32())
            .with_local("y", TypeReference::string());
        let frame = frame_for(method);
        assert_eq!(frame.get_local(0).unwrap(), Value::Null);
        assert_eq!(frame.get_local(1).unwrap(), Value::Null);
        assert_eq!(frame.get_argument(0).unwrap(), Value::Null);
    }

    #[test]
    fn test_stack_push_pop_peek() {
        let mut frame = frame_for(Method::new("M", TypeReference::void()));
        frame.push(Value::Int32(1));
        frame.push(Value::Int32(2));
        assert_eq!(frame.peek().unwrap(), Value::Int32(2));
        assert_eq!(frame.pop().unwrap(), Value::Int32(2));
        assert_eq!(frame.pop().unwrap(), Value::Int32(1));

        let err = frame.pop().unwrap_err();
        assert_eq!(err.kind, ErrorKind::StackUnderflow);
        assert_eq!(frame.pop_or_null(), Value::Null);
    }

    #[test]
    fn test_set_local_grows_vector() {
        let mut frame = frame_for(Method::new("M", TypeReference::void()));
        frame.set_local(3, Value::Int32(9));
        assert_eq!(frame.get_local(3).unwrap(), Value::Int32(9));
        assert_eq!(frame.get_local(0).unwrap(), Value::Null);

        let err = frame.get_local(4).unwrap_err();
        assert_eq!(err.kind, ErrorKind::OutOfRange);
    }

    #[test]
    fn test_named_local_access() {
        let method = Method::new("M", TypeReference::void()).with_local("i", TypeReference::int32());
        let mut frame = frame_for(method);
        frame.set_local_by_name("i", Value::Int32(5)).unwrap();
        assert_eq!(frame.get_local_by_name("i").unwrap(), Value::Int32(5));

        let err = frame.get_local_by_name("missing").unwrap_err();
        assert_eq!(err.kind, ErrorKind::LocalNotFound);
    }

    #[test]
    fn test_named_argument_access() {
        let method = Method::new("M", TypeReference::void())
            .with_parameter("v", TypeReference::int32());
        let mut frame = frame_for(method);
        frame.set_arguments(&[Value::Int32(42)]);
        assert_eq!(frame.get_argument_by_name("v").unwrap(), Value::Int32(42));

        frame.set_argument_by_name("v", Value::Int32(7)).unwrap();
        assert_eq!(frame.get_argument_by_name("v").unwrap(), Value::Int32(7));

        let err = frame.get_argument_by_name("w").unwrap_err();
        assert_eq!(err.kind, ErrorKind::ArgumentNotFound);
    }

    #[test]
    fn test_this_is_reserved_argument_name() {
        let mut frame = frame_for(Method::new("M", TypeReference::void()));
        // Static frames resolve `this` to null rather than failing.
        assert_eq!(frame.get_argument_by_name("this").unwrap(), Value::Null);

        let obj = Object::new_ref();
        frame.set_this(Some(obj.clone()));
        assert_eq!(
            frame.get_argument_by_name("this").unwrap(),
            Value::Object(obj)
        );
    }

    #[test]
    fn test_set_arguments_resizes_on_mismatch() {
        let method = Method::new("M", TypeReference::void())
            .with_parameter("a", TypeReference::int32());
        let mut frame = frame_for(method);
        frame.set_arguments(&[Value::Int32(1), Value::Int32(2)]);
        assert_eq!(frame.get_argument(1).unwrap(), Value::Int32(2));
    }
}
