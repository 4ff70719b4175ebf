//! Instruction executor.
//!
//! [`run`] drives a flat instruction list in a frame: it owns the
//! instruction pointer, resolves branch targets, and applies the special
//! re-execution rule for `while` loops with binary conditions. Individual
//! opcodes execute through [`step`], which structured blocks reuse
//! recursively.
//!
//! `break` and `continue` travel as a small control-flow value rather than
//! an error: blocks propagate them outward and the innermost loop absorbs
//! them.

use std::collections::HashMap;

use core_types::{normalize_type_name, ErrorKind, RuntimeError, RuntimeResult};
use instruction_set::{Condition, ConditionKind, ConstantOperand, Instruction, OpCode};

use crate::frame::FrameRef;
use crate::value::Value;
use crate::vm::VirtualMachine;

/// Outcome of one instruction inside a structured region.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Flow {
    /// Continue with the next instruction
    Next,
    /// Unwind to the innermost loop and terminate it
    Break,
    /// Unwind to the innermost loop and restart the iteration
    Continue,
}

/// Execute a flat instruction list in `frame` and produce the return value:
/// the value popped by `ret`, or the top of stack (null if empty) when the
/// instruction pointer runs off the end.
pub fn run(
    instructions: &[Instruction],
    frame: &FrameRef,
    vm: &mut VirtualMachine,
    label_map: &HashMap<String, usize>,
) -> RuntimeResult<Value> {
    let mut ip = 0usize;

    while let Some(instr) = instructions.get(ip) {
        match instr.opcode {
            OpCode::Ret => return Ok(frame.borrow_mut().pop_or_null()),

            OpCode::Br => {
                ip = resolve_target(instr, label_map, instructions.len())?;
                continue;
            }

            OpCode::BrTrue | OpCode::BrFalse => {
                let condition = frame.borrow_mut().pop()?.to_bool();
                let taken = if instr.opcode == OpCode::BrTrue {
                    condition
                } else {
                    !condition
                };
                if taken {
                    ip = resolve_target(instr, label_map, instructions.len())?;
                } else {
                    ip += 1;
                }
                continue;
            }

            OpCode::Beq | OpCode::Bne | OpCode::Bgt | OpCode::Blt | OpCode::Bge | OpCode::Ble => {
                let (left, right) = {
                    let mut ctx = frame.borrow_mut();
                    let right = ctx.pop()?;
                    let left = ctx.pop()?;
                    (left, right)
                };
                let comparison = branch_comparison(instr.opcode);
                if compare(comparison, &left, &right)? {
                    ip = resolve_target(instr, label_map, instructions.len())?;
                } else {
                    ip += 1;
                }
                continue;
            }

            OpCode::While => {
                // A binary-condition loop at the flat level re-executes the
                // contiguous load prefix before it on every iteration; this
                // preserves the two-values-per-check shape the IR producer
                // emits.
                let data = instr.while_data.as_deref().ok_or_else(|| {
                    RuntimeError::new(ErrorKind::BadOpcode, "while instruction missing metadata")
                })?;
                if let Some(condition) = &data.condition {
                    if condition.kind == ConditionKind::Binary {
                        let comparison = condition.comparison_op.ok_or_else(|| {
                            RuntimeError::new(
                                ErrorKind::BadOpcode,
                                "binary condition missing comparison operation",
                            )
                        })?;

                        let mut setup_start = ip;
                        while setup_start > 0
                            && instructions[setup_start - 1].opcode.is_replayable_load()
                        {
                            setup_start -= 1;
                        }
                        let setup = &instructions[setup_start..ip];

                        loop {
                            for setup_instr in setup {
                                expect_next(step(setup_instr, frame, vm)?)?;
                            }
                            let (left, right) = {
                                let mut ctx = frame.borrow_mut();
                                let right = ctx.pop()?;
                                let left = ctx.pop()?;
                                (left, right)
                            };
                            if !compare(comparison, &left, &right)? {
                                break;
                            }
                            match exec_block(&data.body, frame, vm)? {
                                Flow::Break => break,
                                Flow::Continue | Flow::Next => {}
                            }
                        }

                        ip += 1;
                        continue;
                    }
                }
                // Stack and expression conditions share the structured path.
                match step(instr, frame, vm)? {
                    Flow::Next => {}
                    flow => return Err(loop_control_error(flow)),
                }
                ip += 1;
            }

            _ => {
                match step(instr, frame, vm)? {
                    Flow::Next => {}
                    flow => return Err(loop_control_error(flow)),
                }
                ip += 1;
            }
        }
    }

    Ok(frame.borrow_mut().pop_or_null())
}

/// Execute one non-branch instruction. Branch opcodes are the dispatcher's
/// responsibility and fail here, which is what they do when they appear
/// inside a structured block.
pub fn step(
    instr: &Instruction,
    frame: &FrameRef,
    vm: &mut VirtualMachine,
) -> RuntimeResult<Flow> {
    match instr.opcode {
        OpCode::Nop | OpCode::Ret => {}

        OpCode::Dup => {
            let mut ctx = frame.borrow_mut();
            let top = ctx.peek()?;
            ctx.push(top);
        }

        OpCode::Pop => {
            frame.borrow_mut().pop()?;
        }

        OpCode::LdArg => {
            let name = identifier(instr, "ldarg")?;
            let value = frame.borrow().get_argument_by_name(&name)?;
            frame.borrow_mut().push(value);
        }

        OpCode::StArg => {
            let name = identifier(instr, "starg")?;
            let mut ctx = frame.borrow_mut();
            let value = ctx.pop()?;
            ctx.set_argument_by_name(&name, value)?;
        }

        OpCode::LdLoc => {
            let name = identifier(instr, "ldloc")?;
            let value = frame.borrow().get_local_by_name(&name)?;
            frame.borrow_mut().push(value);
        }

        OpCode::StLoc => {
            let name = identifier(instr, "stloc")?;
            let mut ctx = frame.borrow_mut();
            let value = ctx.pop()?;
            ctx.set_local_by_name(&name, value)?;
        }

        OpCode::LdFld => {
            let field_name = instr
                .field_name()
                .ok_or_else(|| {
                    RuntimeError::new(ErrorKind::BadOpcode, "ldfld instruction missing field operand")
                })?
                .to_string();
            let instance = pop_instance_or_this(frame);
            let Some(instance) = instance else {
                return Err(RuntimeError::new(
                    ErrorKind::NoInstance,
                    "ldfld requires an object instance on the stack or a valid `this`",
                ));
            };
            let value = instance.borrow().get_field(&field_name)?;
            frame.borrow_mut().push(value);
        }

        OpCode::StFld => {
            let field_name = instr
                .field_name()
                .ok_or_else(|| {
                    RuntimeError::new(ErrorKind::BadOpcode, "stfld instruction missing field operand")
                })?
                .to_string();
            let value = frame.borrow_mut().pop()?;
            let instance = pop_instance_or_this(frame);
            let Some(instance) = instance else {
                return Err(RuntimeError::new(
                    ErrorKind::NoInstance,
                    "stfld requires an object instance on the stack or a valid `this`",
                ));
            };
            instance.borrow_mut().set_field(&field_name, value);
        }

        OpCode::LdCon | OpCode::LdStr => {
            let value = constant_value(instr)?;
            frame.borrow_mut().push(value);
        }

        OpCode::LdI4 => {
            let literal = instr.operand_int.unwrap_or(0) as i32;
            frame.borrow_mut().push(Value::Int32(literal));
        }

        OpCode::LdI8 => {
            let literal = instr.operand_int.unwrap_or(0);
            frame.borrow_mut().push(Value::Int64(literal));
        }

        OpCode::LdR4 => {
            let literal = instr.operand_double.unwrap_or(0.0) as f32;
            frame.borrow_mut().push(Value::Float32(literal));
        }

        OpCode::LdR8 => {
            let literal = instr.operand_double.unwrap_or(0.0);
            frame.borrow_mut().push(Value::Float64(literal));
        }

        OpCode::LdTrue => frame.borrow_mut().push(Value::Boolean(true)),
        OpCode::LdFalse => frame.borrow_mut().push(Value::Boolean(false)),
        OpCode::LdNull => frame.borrow_mut().push(Value::Null),

        OpCode::Add | OpCode::Sub | OpCode::Mul | OpCode::Div | OpCode::Rem => {
            let (left, right) = {
                let mut ctx = frame.borrow_mut();
                let right = ctx.pop()?;
                let left = ctx.pop()?;
                (left, right)
            };
            let result = arithmetic(instr.opcode, &left, &right)?;
            frame.borrow_mut().push(result);
        }

        OpCode::Neg => {
            let operand = frame.borrow_mut().pop()?;
            let result = negate(&operand)?;
            frame.borrow_mut().push(result);
        }

        OpCode::Ceq | OpCode::Cne | OpCode::Clt | OpCode::Cle | OpCode::Cgt | OpCode::Cge => {
            let (left, right) = {
                let mut ctx = frame.borrow_mut();
                let right = ctx.pop()?;
                let left = ctx.pop()?;
                (left, right)
            };
            let result = compare(instr.opcode, &left, &right)?;
            frame.borrow_mut().push(Value::Boolean(result));
        }

        OpCode::NewObj => {
            let type_name = instr.operand_string.as_deref().filter(|s| !s.is_empty()).ok_or_else(
                || RuntimeError::new(ErrorKind::BadOpcode, "newobj instruction missing type operand"),
            )?;
            let object = vm.create_object(type_name)?;
            frame.borrow_mut().push(Value::Object(object));
        }

        OpCode::Call | OpCode::CallVirt => {
            execute_call(instr, frame, vm)?;
        }

        OpCode::Break => return Ok(Flow::Break),
        OpCode::Continue => return Ok(Flow::Continue),

        OpCode::While => {
            let data = instr.while_data.as_deref().ok_or_else(|| {
                RuntimeError::new(ErrorKind::BadOpcode, "while instruction missing metadata")
            })?;
            let condition = data.condition.as_ref().ok_or_else(|| {
                RuntimeError::new(ErrorKind::BadOpcode, "while instruction missing condition")
            })?;

            while evaluate_condition(condition, frame, vm)? {
                match exec_block(&data.body, frame, vm)? {
                    Flow::Break => break,
                    Flow::Continue | Flow::Next => {}
                }
            }
        }

        OpCode::If => {
            let data = instr.if_data.as_deref().ok_or_else(|| {
                RuntimeError::new(ErrorKind::BadOpcode, "if instruction missing metadata")
            })?;
            let condition = frame.borrow_mut().pop()?.to_bool();
            let flow = if condition {
                exec_block(&data.then_block, frame, vm)?
            } else if !data.else_block.is_empty() {
                exec_block(&data.else_block, frame, vm)?
            } else {
                Flow::Next
            };
            // Loop control inside a branch unwinds to the enclosing loop.
            return Ok(flow);
        }

        OpCode::Throw => {
            return Err(RuntimeError::new(ErrorKind::UnhandledThrow, "throw reached"))
        }

        OpCode::Br
        | OpCode::BrTrue
        | OpCode::BrFalse
        | OpCode::Beq
        | OpCode::Bne
        | OpCode::Bgt
        | OpCode::Blt
        | OpCode::Bge
        | OpCode::Ble => {
            return Err(RuntimeError::new(
                ErrorKind::UnsupportedOperation,
                "branch opcodes must be handled by the instruction dispatcher",
            ))
        }

        OpCode::CastClass | OpCode::IsInst | OpCode::NewArr | OpCode::LdElem | OpCode::StElem
        | OpCode::LdLen => {
            return Err(RuntimeError::new(
                ErrorKind::Unimplemented,
                format!("opcode not implemented: {}", instr.opcode.mnemonic()),
            ))
        }
    }

    Ok(Flow::Next)
}

/// Execute a structured block, propagating loop control outward.
fn exec_block(
    instructions: &[Instruction],
    frame: &FrameRef,
    vm: &mut VirtualMachine,
) -> RuntimeResult<Flow> {
    for instr in instructions {
        match step(instr, frame, vm)? {
            Flow::Next => {}
            flow => return Ok(flow),
        }
    }
    Ok(Flow::Next)
}

/// Evaluate a `while` condition in the structured path.
fn evaluate_condition(
    condition: &Condition,
    frame: &FrameRef,
    vm: &mut VirtualMachine,
) -> RuntimeResult<bool> {
    for setup in &condition.setup {
        expect_next(step(setup, frame, vm)?)?;
    }

    match condition.kind {
        ConditionKind::Stack => Ok(frame.borrow_mut().pop()?.to_bool()),

        ConditionKind::Binary => {
            let comparison = condition.comparison_op.ok_or_else(|| {
                RuntimeError::new(
                    ErrorKind::BadOpcode,
                    "binary condition missing comparison operation",
                )
            })?;
            let (left, right) = {
                let mut ctx = frame.borrow_mut();
                let right = ctx.pop()?;
                let left = ctx.pop()?;
                (left, right)
            };
            compare(comparison, &left, &right)
        }

        ConditionKind::Expression => {
            for instr in &condition.expression {
                expect_next(step(instr, frame, vm)?)?;
            }
            Ok(frame.borrow_mut().pop()?.to_bool())
        }
    }
}

fn execute_call(
    instr: &Instruction,
    frame: &FrameRef,
    vm: &mut VirtualMachine,
) -> RuntimeResult<()> {
    let target = instr.call_target.as_ref().ok_or_else(|| {
        RuntimeError::new(ErrorKind::BadOpcode, "call instruction missing target metadata")
    })?;

    let mut call_args = {
        let mut ctx = frame.borrow_mut();
        let mut args = Vec::with_capacity(target.parameter_types.len());
        for _ in 0..target.parameter_types.len() {
            args.push(ctx.pop()?);
        }
        args
    };
    call_args.reverse();

    // Console.WriteLine short-circuits resolution entirely.
    if target.declaring_type == "System.Console" && target.name == "WriteLine" {
        let mut line = String::new();
        for (index, arg) in call_args.iter().enumerate() {
            if index > 0 {
                line.push(' ');
            }
            // Null prints as an empty string rather than the literal "null".
            if !arg.is_null() {
                line.push_str(&arg.to_display_string());
            }
        }
        line.push('\n');
        vm.write_output(&line);
        return Ok(());
    }

    let result = if instr.opcode == OpCode::CallVirt {
        let receiver = frame.borrow_mut().pop()?;
        let instance = receiver.as_object().map_err(|_| {
            RuntimeError::new(
                ErrorKind::NoInstance,
                "callvirt requires an object instance on the stack",
            )
        })?;
        vm.invoke_instance(&instance, target, &call_args)?
    } else {
        let class = vm.get_class(&target.declaring_type)?;
        vm.invoke_static(&class, target, &call_args)?
    };

    if !target.is_void_return() {
        frame.borrow_mut().push(result);
    }
    Ok(())
}

/// Reconstruct a value from a typed-constant operand, honoring the declared
/// type alias. A constant marked null produces the null value.
fn constant_value(instr: &Instruction) -> RuntimeResult<Value> {
    let default_constant;
    let constant = match &instr.constant {
        Some(c) => c,
        None => {
            default_constant = ConstantOperand::default();
            &default_constant
        }
    };

    if constant.is_null {
        return Ok(Value::Null);
    }

    if !constant.type_name.is_empty() {
        let normalized = normalize_type_name(&constant.type_name);
        match normalized.as_str() {
            "string" => return Ok(Value::String(constant.raw_value.clone())),
            "bool" => {
                if constant.raw_value.is_empty() {
                    return Ok(Value::Boolean(constant.bool_value));
                }
                let lowered = constant.raw_value.to_ascii_lowercase();
                let flag = match lowered.as_str() {
                    "true" | "1" => true,
                    "false" | "0" => false,
                    _ => constant.bool_value,
                };
                return Ok(Value::Boolean(flag));
            }
            "int32" => return parse_constant::<i32>(&constant.raw_value, "int32").map(Value::Int32),
            "int64" => return parse_constant::<i64>(&constant.raw_value, "int64").map(Value::Int64),
            "float32" => {
                return parse_constant::<f32>(&constant.raw_value, "float32").map(Value::Float32)
            }
            "float64" => {
                return parse_constant::<f64>(&constant.raw_value, "float64").map(Value::Float64)
            }
            _ => {}
        }
    }

    if constant.bool_value {
        return Ok(Value::Boolean(true));
    }

    Ok(Value::String(constant.raw_value.clone()))
}

fn parse_constant<T: std::str::FromStr>(raw: &str, type_name: &str) -> RuntimeResult<T> {
    raw.parse::<T>().map_err(|_| {
        RuntimeError::new(
            ErrorKind::TypeMismatch,
            format!("cannot parse {type_name} constant from {raw:?}"),
        )
    })
}

/// Pop the instance operand for `ldfld`/`stfld`: a popped object reference
/// is the instance; anything else (including an empty stack) falls back to
/// the frame's `this`.
fn pop_instance_or_this(frame: &FrameRef) -> Option<crate::object::ObjectRef> {
    let mut ctx = frame.borrow_mut();
    let popped = if ctx.stack_depth() > 0 {
        ctx.pop().ok()
    } else {
        None
    };
    match popped {
        Some(Value::Object(obj)) => Some(obj),
        _ => ctx.this(),
    }
}

fn identifier(instr: &Instruction, mnemonic: &str) -> RuntimeResult<String> {
    instr
        .identifier
        .clone()
        .filter(|name| !name.is_empty())
        .ok_or_else(|| {
            RuntimeError::new(
                ErrorKind::BadOpcode,
                format!("{mnemonic} instruction missing name operand"),
            )
        })
}

fn expect_next(flow: Flow) -> RuntimeResult<()> {
    match flow {
        Flow::Next => Ok(()),
        other => Err(loop_control_error(other)),
    }
}

fn loop_control_error(flow: Flow) -> RuntimeError {
    let which = if flow == Flow::Break { "break" } else { "continue" };
    RuntimeError::new(
        ErrorKind::UnsupportedOperation,
        format!("{which} outside of a loop body"),
    )
}

fn branch_comparison(opcode: OpCode) -> OpCode {
    match opcode {
        OpCode::Beq => OpCode::Ceq,
        OpCode::Bne => OpCode::Cne,
        OpCode::Bgt => OpCode::Cgt,
        OpCode::Blt => OpCode::Clt,
        OpCode::Bge => OpCode::Cge,
        OpCode::Ble => OpCode::Cle,
        other => other,
    }
}

fn resolve_target(
    instr: &Instruction,
    label_map: &HashMap<String, usize>,
    instruction_count: usize,
) -> RuntimeResult<usize> {
    let mut target: i64 = -1;

    if let Some(index) = instr.operand_int {
        target = index;
    } else if let Some(label) = instr.operand_string.as_deref().filter(|s| !s.is_empty()) {
        if let Some(index) = label_map.get(label) {
            return check_target_range(*index as i64, instruction_count);
        }
        target = label.parse::<i64>().map_err(|_| {
            RuntimeError::new(
                ErrorKind::BadBranchTarget,
                format!("branch target not found: {label}"),
            )
        })?;
    }

    check_target_range(target, instruction_count)
}

fn check_target_range(target: i64, instruction_count: usize) -> RuntimeResult<usize> {
    if target < 0 || target as usize >= instruction_count {
        return Err(RuntimeError::new(
            ErrorKind::BadBranchTarget,
            format!("branch target out of range: {target}"),
        ));
    }
    Ok(target as usize)
}

/// Numeric comparison following the integer-else-float64 rule; `ceq`/`cne`
/// additionally compare strings and booleans directly.
pub fn compare(opcode: OpCode, left: &Value, right: &Value) -> RuntimeResult<bool> {
    match opcode {
        OpCode::Ceq | OpCode::Cne => {
            let equal = if left.is_string() && right.is_string() {
                left.as_string()? == right.as_string()?
            } else if left.is_bool() && right.is_bool() {
                left.as_bool()? == right.as_bool()?
            } else if left.is_integer() && right.is_integer() {
                left.to_int64()? == right.to_int64()?
            } else {
                left.to_float64()? == right.to_float64()?
            };
            Ok(if opcode == OpCode::Ceq { equal } else { !equal })
        }

        OpCode::Clt | OpCode::Cle | OpCode::Cgt | OpCode::Cge => {
            if left.is_integer() && right.is_integer() {
                let (a, b) = (left.to_int64()?, right.to_int64()?);
                Ok(match opcode {
                    OpCode::Clt => a < b,
                    OpCode::Cle => a <= b,
                    OpCode::Cgt => a > b,
                    _ => a >= b,
                })
            } else {
                let (a, b) = (left.to_float64()?, right.to_float64()?);
                Ok(match opcode {
                    OpCode::Clt => a < b,
                    OpCode::Cle => a <= b,
                    OpCode::Cgt => a > b,
                    _ => a >= b,
                })
            }
        }

        other => Err(RuntimeError::new(
            ErrorKind::UnsupportedOperation,
            format!("not a comparison opcode: {}", other.mnemonic()),
        )),
    }
}

/// Binary arithmetic with the widening rules of the engine: int32 pairs stay
/// int32, anything involving int64 widens to int64, everything else widens
/// to float64. `add` concatenates display strings when either side is a
/// string.
fn arithmetic(opcode: OpCode, left: &Value, right: &Value) -> RuntimeResult<Value> {
    if opcode == OpCode::Add && (left.is_string() || right.is_string()) {
        let mut text = left.to_display_string();
        text.push_str(&right.to_display_string());
        return Ok(Value::String(text));
    }

    if opcode == OpCode::Rem && !(left.is_integer() && right.is_integer()) {
        return Err(RuntimeError::new(
            ErrorKind::UnsupportedOperation,
            "remainder is not defined for floating point operands",
        ));
    }

    if opcode == OpCode::Div {
        let divisor_is_zero = match right {
            Value::Int32(0) => true,
            Value::Int64(0) => true,
            _ => false,
        };
        if divisor_is_zero {
            return Err(RuntimeError::new(ErrorKind::DivideByZero, "division by zero"));
        }
    }

    if left.is_int32() && right.is_int32() {
        let (a, b) = (left.as_int32()?, right.as_int32()?);
        let result = match opcode {
            OpCode::Add => a.wrapping_add(b),
            OpCode::Sub => a.wrapping_sub(b),
            OpCode::Mul => a.wrapping_mul(b),
            OpCode::Div => a.wrapping_div(b),
            OpCode::Rem => {
                if b == 0 {
                    return Err(RuntimeError::new(ErrorKind::DivideByZero, "remainder by zero"));
                }
                a.wrapping_rem(b)
            }
            _ => unreachable!("arithmetic called with non-arithmetic opcode"),
        };
        return Ok(Value::Int32(result));
    }

    if left.is_int64() || right.is_int64() {
        let (a, b) = (left.to_int64()?, right.to_int64()?);
        let result = match opcode {
            OpCode::Add => a.wrapping_add(b),
            OpCode::Sub => a.wrapping_sub(b),
            OpCode::Mul => a.wrapping_mul(b),
            OpCode::Div => {
                if b == 0 {
                    return Err(RuntimeError::new(ErrorKind::DivideByZero, "division by zero"));
                }
                a.wrapping_div(b)
            }
            OpCode::Rem => {
                if b == 0 {
                    return Err(RuntimeError::new(ErrorKind::DivideByZero, "remainder by zero"));
                }
                a.wrapping_rem(b)
            }
            _ => unreachable!("arithmetic called with non-arithmetic opcode"),
        };
        return Ok(Value::Int64(result));
    }

    let (a, b) = (left.to_float64()?, right.to_float64()?);
    let result = match opcode {
        OpCode::Add => a + b,
        OpCode::Sub => a - b,
        OpCode::Mul => a * b,
        // IEEE division does not trap.
        OpCode::Div => a / b,
        _ => unreachable!("arithmetic called with non-arithmetic opcode"),
    };
    Ok(Value::Float64(result))
}

/// Negation preserving the operand's numeric variant.
fn negate(operand: &Value) -> RuntimeResult<Value> {
    match operand {
        Value::Int32(v) => Ok(Value::Int32(v.wrapping_neg())),
        Value::Int64(v) => Ok(Value::Int64(v.wrapping_neg())),
        Value::Float32(v) => Ok(Value::Float32(-v)),
        Value::Float64(v) => Ok(Value::Float64(-v)),
        other => Err(RuntimeError::new(
            ErrorKind::TypeMismatch,
            format!("cannot negate {}", other.tag_name()),
        )),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_compare_integer_widths_mix() {
        assert!(compare(OpCode::Ceq, &Value::Int32(5), &Value::Int64(5)).unwrap());
        assert!(compare(OpCode::Clt, &Value::Int32(3), &Value::Int64(4)).unwrap());
        assert!(!compare(OpCode::Cge, &Value::Int32(3), &Value::Int64(4)).unwrap());
    }

    #[test]
    fn test_compare_strings_and_bools() {
        let a = Value::String("x".to_string());
        let b = Value::String("x".to_string());
        assert!(compare(OpCode::Ceq, &a, &b).unwrap());
        assert!(!compare(OpCode::Cne, &a, &b).unwrap());
        assert!(compare(OpCode::Ceq, &Value::Boolean(true), &Value::Boolean(true)).unwrap());
    }

    #[test]
    fn test_compare_mixed_numeric_widens_to_float() {
        assert!(compare(OpCode::Ceq, &Value::Int32(1), &Value::Float64(1.0)).unwrap());
        assert!(compare(OpCode::Cgt, &Value::Float32(1.5), &Value::Int32(1)).unwrap());
    }

    #[test]
    fn test_compare_string_to_number_fails() {
        let err = compare(OpCode::Ceq, &Value::String("1".to_string()), &Value::Int32(1))
            .unwrap_err();
        assert_eq!(err.kind, ErrorKind::TypeMismatch);
    }

    #[test]
    fn test_ordering_has_no_string_support() {
        let a = Value::String("a".to_string());
        let b = Value::String("b".to_string());
        assert!(compare(OpCode::Clt, &a, &b).is_err());
    }

    #[test]
    fn test_arithmetic_int32_stays_int32() {
        let result = arithmetic(OpCode::Add, &Value::Int32(2), &Value::Int32(3)).unwrap();
        assert_eq!(result, Value::Int32(5));
    }

    #[test]
    fn test_arithmetic_widens_to_int64() {
        let result = arithmetic(OpCode::Mul, &Value::Int32(2), &Value::Int64(3)).unwrap();
        assert_eq!(result, Value::Int64(6));
    }

    #[test]
    fn test_arithmetic_widens_to_float64() {
        let result = arithmetic(OpCode::Sub, &Value::Float32(2.5), &Value::Int32(1)).unwrap();
        assert_eq!(result, Value::Float64(1.5));
    }

    #[test]
    fn test_add_concatenates_strings() {
        let result = arithmetic(
            OpCode::Add,
            &Value::String("n=".to_string()),
            &Value::Int32(4),
        )
        .unwrap();
        assert_eq!(result, Value::String("n=4".to_string()));
    }

    #[test]
    fn test_integer_division_by_zero_fails() {
        let err = arithmetic(OpCode::Div, &Value::Int32(10), &Value::Int32(0)).unwrap_err();
        assert_eq!(err.kind, ErrorKind::DivideByZero);

        let err = arithmetic(OpCode::Div, &Value::Int64(10), &Value::Int64(0)).unwrap_err();
        assert_eq!(err.kind, ErrorKind::DivideByZero);
    }

    #[test]
    fn test_float_division_by_zero_follows_ieee() {
        let result = arithmetic(OpCode::Div, &Value::Float64(1.0), &Value::Float64(0.0)).unwrap();
        assert_eq!(result, Value::Float64(f64::INFINITY));
    }

    #[test]
    fn test_rem_rejects_floats() {
        let err = arithmetic(OpCode::Rem, &Value::Float64(5.0), &Value::Float64(2.0)).unwrap_err();
        assert_eq!(err.kind, ErrorKind::UnsupportedOperation);
    }

    #[test]
    fn test_negate_preserves_variant() {
        assert_eq!(negate(&Value::Int32(5)).unwrap(), Value::Int32(-5));
        assert_eq!(negate(&Value::Int64(5)).unwrap(), Value::Int64(-5));
        assert_eq!(negate(&Value::Float32(2.5)).unwrap(), Value::Float32(-2.5));
        assert_eq!(negate(&Value::Float64(2.5)).unwrap(), Value::Float64(-2.5));
        assert!(negate(&Value::String("x".to_string())).is_err());
    }

    #[test]
    fn test_constant_value_honors_type_aliases() {
        let mut instr = Instruction::new(OpCode::LdCon);
        instr.constant = Some(ConstantOperand {
            type_name: "System.Int32".to_string(),
            raw_value: "42".to_string(),
            bool_value: false,
            is_null: false,
        });
        assert_eq!(constant_value(&instr).unwrap(), Value::Int32(42));

        instr.constant.as_mut().unwrap().type_name = "long".to_string();
        assert_eq!(constant_value(&instr).unwrap(), Value::Int64(42));

        instr.constant.as_mut().unwrap().type_name = "double".to_string();
        assert_eq!(constant_value(&instr).unwrap(), Value::Float64(42.0));
    }

    #[test]
    fn test_constant_value_null_flag_wins() {
        let mut instr = Instruction::new(OpCode::LdCon);
        instr.constant = Some(ConstantOperand {
            type_name: "string".to_string(),
            raw_value: "ignored".to_string(),
            bool_value: false,
            is_null: true,
        });
        assert_eq!(constant_value(&instr).unwrap(), Value::Null);
    }

    #[test]
    fn test_constant_value_bool_spellings() {
        let mut instr = Instruction::new(OpCode::LdCon);
        instr.constant = Some(ConstantOperand {
            type_name: "bool".to_string(),
            raw_value: "1".to_string(),
            bool_value: false,
            is_null: false,
        });
        assert_eq!(constant_value(&instr).unwrap(), Value::Boolean(true));

        instr.constant.as_mut().unwrap().raw_value = "False".to_string();
        assert_eq!(constant_value(&instr).unwrap(), Value::Boolean(false));
    }

    #[test]
    fn test_constant_value_untyped_falls_back_to_string() {
        let mut instr = Instruction::new(OpCode::LdStr);
        instr.constant = Some(ConstantOperand {
            type_name: String::new(),
            raw_value: "plain".to_string(),
            bool_value: false,
            is_null: false,
        });
        assert_eq!(
            constant_value(&instr).unwrap(),
            Value::String("plain".to_string())
        );
    }

    #[test]
    fn test_constant_value_bad_number_fails() {
        let mut instr = Instruction::new(OpCode::LdCon);
        instr.constant = Some(ConstantOperand {
            type_name: "int32".to_string(),
            raw_value: "not-a-number".to_string(),
            bool_value: false,
            is_null: false,
        });
        let err = constant_value(&instr).unwrap_err();
        assert_eq!(err.kind, ErrorKind::TypeMismatch);
    }
}
