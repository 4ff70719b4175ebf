//! JSON instruction decoding.
//!
//! Decodes the JSON-shaped instruction documents produced by the IR
//! emitters. Operand shapes are deliberately permissive: several emitters
//! disagree on details (string vs. object field targets, label vs. index
//! branch targets), and the decoder accepts all the dialects the original
//! runtime did.

use std::collections::HashMap;

use core_types::{normalize_type_name, ErrorKind, RuntimeError, RuntimeResult};
use serde_json::Value as Json;

use crate::instruction::{
    CallTarget, Condition, ConditionKind, ConstantOperand, FieldTarget, IfData, Instruction,
    WhileData,
};
use crate::opcode::OpCode;

fn bad(message: impl Into<String>) -> RuntimeError {
    RuntimeError::new(ErrorKind::BadOpcode, message)
}

/// Decode one instruction node.
pub fn decode_instruction(node: &Json) -> RuntimeResult<Instruction> {
    let opcode_text = node
        .get("opCode")
        .and_then(Json::as_str)
        .unwrap_or_default();
    let opcode = OpCode::parse(opcode_text)?;
    let mut instr = Instruction::new(opcode);

    let operand = match node.get("operand") {
        Some(op) if !op.is_null() => op,
        _ => return Ok(instr),
    };

    match opcode {
        OpCode::LdArg | OpCode::StArg => {
            if let Some(name) = operand.get("argumentName").and_then(Json::as_str) {
                instr.identifier = Some(name.to_string());
            }
        }

        OpCode::LdLoc | OpCode::StLoc => {
            if let Some(name) = operand.get("localName").and_then(Json::as_str) {
                instr.identifier = Some(name.to_string());
            }
        }

        OpCode::LdFld | OpCode::StFld => {
            if let Some(field) = operand.get("field") {
                let target = decode_field_target(field);
                // The bare name doubles as a lightweight fallback operand.
                instr.operand_string = Some(target.name.clone());
                instr.field_target = Some(target);
            }
        }

        OpCode::LdCon | OpCode::LdStr => {
            instr.constant = Some(decode_constant(operand));
        }

        OpCode::Call | OpCode::CallVirt => {
            if let Some(method) = operand.get("method") {
                instr.call_target = Some(decode_call_target(method));
            }
        }

        OpCode::NewObj => {
            if let Some(type_name) = operand.get("type").and_then(Json::as_str) {
                instr.operand_string = Some(type_name.to_string());
            }
        }

        op if op.is_branch() => decode_branch_operand(operand, &mut instr),

        OpCode::While => {
            let obj = operand
                .as_object()
                .ok_or_else(|| bad("while instruction operand must be an object"))?;
            let condition = match obj.get("condition") {
                Some(node) => Some(decode_condition(node)?),
                None => None,
            };
            let body = match obj.get("body") {
                Some(node) => decode_instruction_array(node)?,
                None => Vec::new(),
            };
            instr.while_data = Some(Box::new(WhileData { condition, body }));
        }

        OpCode::If => {
            let obj = operand
                .as_object()
                .ok_or_else(|| bad("if instruction operand must be an object"))?;
            let then_block = match obj.get("thenBlock") {
                Some(node) => decode_instruction_array(node)?,
                None => Vec::new(),
            };
            let else_block = match obj.get("elseBlock") {
                Some(node) => decode_instruction_array(node)?,
                None => Vec::new(),
            };
            instr.if_data = Some(Box::new(IfData {
                then_block,
                else_block,
            }));
        }

        _ => decode_scalar_operand(operand, &mut instr),
    }

    Ok(instr)
}

/// Decode an array of instruction nodes. A non-array decodes to an empty
/// list, mirroring the original loader's leniency for absent blocks.
pub fn decode_instruction_array(node: &Json) -> RuntimeResult<Vec<Instruction>> {
    let Some(elements) = node.as_array() else {
        return Ok(Vec::new());
    };
    let mut result = Vec::with_capacity(elements.len());
    for element in elements {
        result.push(decode_instruction(element)?);
    }
    Ok(result)
}

/// Decode a per-method label map (`label name -> instruction index`).
pub fn decode_label_map(node: &Json) -> HashMap<String, usize> {
    let mut map = HashMap::new();
    if let Some(entries) = node.as_object() {
        for (label, target) in entries {
            if let Some(index) = target.as_u64() {
                map.insert(label.clone(), index as usize);
            }
        }
    }
    map
}

fn decode_field_target(field: &Json) -> FieldTarget {
    if let Some(text) = field.as_str() {
        // Text-parser dialect: "ClassName.fieldName", split at the last dot.
        return match text.rfind('.') {
            Some(dot) => FieldTarget {
                declaring_type: text[..dot].to_string(),
                name: text[dot + 1..].to_string(),
                field_type: String::new(),
            },
            None => FieldTarget {
                declaring_type: String::new(),
                name: text.to_string(),
                field_type: String::new(),
            },
        };
    }

    FieldTarget {
        declaring_type: string_field(field, "declaringType"),
        name: string_field(field, "name"),
        field_type: string_field(field, "type"),
    }
}

fn decode_call_target(method: &Json) -> CallTarget {
    let return_type_raw = method
        .get("returnType")
        .and_then(Json::as_str)
        .unwrap_or("void");
    let mut parameter_types = Vec::new();
    if let Some(params) = method.get("parameterTypes").and_then(Json::as_array) {
        for param in params {
            if let Some(name) = param.as_str() {
                parameter_types.push(normalize_type_name(name));
            }
        }
    }

    CallTarget {
        declaring_type: string_field(method, "declaringType"),
        name: string_field(method, "name"),
        return_type: normalize_type_name(return_type_raw),
        parameter_types,
    }
}

fn decode_constant(operand: &Json) -> ConstantOperand {
    let mut constant = ConstantOperand {
        type_name: string_field(operand, "type"),
        ..ConstantOperand::default()
    };

    match operand.get("value") {
        Some(Json::String(text)) => constant.raw_value = text.clone(),
        Some(value) if value.is_i64() || value.is_u64() => {
            constant.raw_value = value.to_string();
        }
        Some(value) if value.is_f64() => {
            constant.raw_value = value.as_f64().unwrap_or_default().to_string();
        }
        Some(Json::Bool(flag)) => {
            constant.bool_value = *flag;
            constant.raw_value = if *flag { "true" } else { "false" }.to_string();
        }
        Some(Json::Null) | None => constant.is_null = true,
        Some(_) => {}
    }

    constant
}

fn decode_branch_operand(operand: &Json, instr: &mut Instruction) {
    if let Some(obj) = operand.as_object() {
        if let Some(target) = obj.get("target") {
            if let Some(index) = target.as_i64() {
                instr.operand_int = Some(index);
            } else if let Some(label) = target.as_str() {
                instr.operand_string = Some(label.to_string());
            } else {
                instr.operand_int = Some(0);
            }
        } else if let Some(offset) = obj.get("offset").and_then(Json::as_i64) {
            instr.operand_int = Some(offset);
        }
    } else if let Some(index) = operand.as_i64() {
        instr.operand_int = Some(index);
    } else if let Some(label) = operand.as_str() {
        instr.operand_string = Some(label.to_string());
    }
}

/// Fallback operand decoding for opcodes without a dedicated shape
/// (typed literals, `castclass`/`isinst`, ...). Accepts a bare scalar or a
/// `{ "value": ... }` wrapper, which is what the metadata exporter emits.
fn decode_scalar_operand(operand: &Json, instr: &mut Instruction) {
    let scalar = match operand.get("value") {
        Some(inner) => inner,
        None => operand,
    };

    if let Some(text) = scalar.as_str() {
        instr.operand_string = Some(text.to_string());
    } else if let Some(int) = scalar.as_i64() {
        instr.operand_int = Some(int);
    } else if let Some(float) = scalar.as_f64() {
        instr.operand_double = Some(float);
    }
}

/// Decode a `while` condition node.
pub fn decode_condition(node: &Json) -> RuntimeResult<Condition> {
    let obj = node
        .as_object()
        .ok_or_else(|| bad("condition node must be an object"))?;

    let kind_text = obj
        .get("kind")
        .and_then(Json::as_str)
        .ok_or_else(|| bad("condition kind missing"))?;

    let kind = match kind_text {
        "stack" => ConditionKind::Stack,
        "binary" => ConditionKind::Binary,
        "expression" => ConditionKind::Expression,
        other => return Err(bad(format!("unsupported condition kind: {other}"))),
    };

    let mut condition = Condition::new(kind);

    if kind == ConditionKind::Binary {
        let op_text = obj
            .get("operation")
            .and_then(Json::as_str)
            .ok_or_else(|| bad("binary condition missing operation"))?;
        condition.comparison_op = Some(OpCode::parse(op_text)?);
    }

    if kind == ConditionKind::Expression {
        if let Some(expr) = obj.get("expression") {
            if expr.is_array() {
                condition.expression = decode_instruction_array(expr)?;
            } else {
                condition.expression.push(decode_instruction(expr)?);
            }
        }
    }

    if let Some(setup) = obj.get("setup") {
        condition.setup = decode_instruction_array(setup)?;
    }

    Ok(condition)
}

fn string_field(node: &Json, key: &str) -> String {
    node.get(key)
        .and_then(Json::as_str)
        .unwrap_or_default()
        .to_string()
}
