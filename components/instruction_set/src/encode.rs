//! JSON instruction encoding.
//!
//! The inverse of [`crate::decode`]: serializes instruction lists into the
//! JSON shape exported through the plugin metadata API. Every shape emitted
//! here is accepted by the decoder, so export followed by reparse preserves
//! the instruction list.

use serde_json::{json, Map, Value as Json};

use crate::instruction::{Condition, ConditionKind, Instruction};
use crate::opcode::OpCode;

/// Serialize a block of instructions to a JSON array.
pub fn encode_instruction_block(instructions: &[Instruction]) -> Json {
    Json::Array(instructions.iter().map(encode_instruction).collect())
}

/// Serialize one instruction.
pub fn encode_instruction(instr: &Instruction) -> Json {
    let mut node = Map::new();
    node.insert("opCode".to_string(), json!(instr.opcode.mnemonic()));

    let mut operand = Map::new();

    match instr.opcode {
        OpCode::LdArg | OpCode::StArg => {
            if let Some(name) = &instr.identifier {
                operand.insert("argumentName".to_string(), json!(name));
            }
        }

        OpCode::LdLoc | OpCode::StLoc => {
            if let Some(name) = &instr.identifier {
                operand.insert("localName".to_string(), json!(name));
            }
        }

        OpCode::LdFld | OpCode::StFld => {
            if let Some(target) = &instr.field_target {
                operand.insert(
                    "field".to_string(),
                    json!({
                        "declaringType": target.declaring_type,
                        "name": target.name,
                        "type": target.field_type,
                    }),
                );
            } else if let Some(name) = &instr.operand_string {
                operand.insert("field".to_string(), json!(name));
            }
        }

        OpCode::LdCon | OpCode::LdStr => {
            if let Some(constant) = &instr.constant {
                if constant.is_null {
                    operand.insert("value".to_string(), Json::Null);
                } else {
                    operand.insert("value".to_string(), json!(constant.raw_value));
                }
                if !constant.type_name.is_empty() {
                    operand.insert("type".to_string(), json!(constant.type_name));
                }
            }
        }

        OpCode::LdI4 | OpCode::LdI8 => {
            operand.insert("value".to_string(), json!(instr.operand_int.unwrap_or(0)));
        }

        OpCode::LdR4 | OpCode::LdR8 => {
            operand.insert(
                "value".to_string(),
                json!(instr.operand_double.unwrap_or(0.0)),
            );
        }

        OpCode::Call | OpCode::CallVirt => {
            if let Some(target) = &instr.call_target {
                operand.insert(
                    "method".to_string(),
                    json!({
                        "declaringType": target.declaring_type,
                        "name": target.name,
                        "returnType": target.return_type,
                        "parameterTypes": target.parameter_types,
                    }),
                );
            }
        }

        OpCode::NewObj => {
            if let Some(type_name) = &instr.operand_string {
                operand.insert("type".to_string(), json!(type_name));
            }
        }

        OpCode::If => {
            if let Some(data) = &instr.if_data {
                operand.insert(
                    "thenBlock".to_string(),
                    encode_instruction_block(&data.then_block),
                );
                operand.insert(
                    "elseBlock".to_string(),
                    encode_instruction_block(&data.else_block),
                );
            }
        }

        OpCode::While => {
            if let Some(data) = &instr.while_data {
                if let Some(condition) = &data.condition {
                    operand.insert("condition".to_string(), encode_condition(condition));
                }
                operand.insert("body".to_string(), encode_instruction_block(&data.body));
            }
        }

        op if op.is_branch() => {
            if let Some(index) = instr.operand_int {
                operand.insert("target".to_string(), json!(index));
            } else if let Some(label) = &instr.operand_string {
                operand.insert("target".to_string(), json!(label));
            }
        }

        _ => {
            if let Some(text) = &instr.operand_string {
                operand.insert("value".to_string(), json!(text));
            }
        }
    }

    if !operand.is_empty() {
        node.insert("operand".to_string(), Json::Object(operand));
    }

    Json::Object(node)
}

fn encode_condition(condition: &Condition) -> Json {
    let mut node = Map::new();
    let kind = match condition.kind {
        ConditionKind::Stack => "stack",
        ConditionKind::Binary => "binary",
        ConditionKind::Expression => "expression",
    };
    node.insert("kind".to_string(), json!(kind));

    if let Some(op) = condition.comparison_op {
        node.insert("operation".to_string(), json!(op.mnemonic()));
    }
    if !condition.expression.is_empty() {
        node.insert(
            "expression".to_string(),
            encode_instruction_block(&condition.expression),
        );
    }
    if !condition.setup.is_empty() {
        node.insert("setup".to_string(), encode_instruction_block(&condition.setup));
    }

    Json::Object(node)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::decode::decode_instruction;
    use serde_json::json;

    fn roundtrip(node: Json) -> Instruction {
        let decoded = decode_instruction(&node).unwrap();
        let encoded = encode_instruction(&decoded);
        let redecoded = decode_instruction(&encoded).unwrap();
        assert_eq!(decoded, redecoded, "roundtrip changed the instruction");
        redecoded
    }

    #[test]
    fn test_roundtrip_loads_and_stores() {
        roundtrip(json!({"opCode": "ldarg", "operand": {"argumentName": "v"}}));
        roundtrip(json!({"opCode": "stloc", "operand": {"localName": "i"}}));
        roundtrip(json!({"opCode": "ldi4", "operand": 42}));
        roundtrip(json!({"opCode": "ldi8", "operand": 1099511627776i64}));
        roundtrip(json!({"opCode": "ldr8", "operand": 2.5}));
        roundtrip(json!({"opCode": "ldtrue"}));
        roundtrip(json!({"opCode": "ldnull"}));
    }

    #[test]
    fn test_roundtrip_constants() {
        roundtrip(json!({"opCode": "ldstr", "operand": {"type": "string", "value": "Hello"}}));
        roundtrip(json!({"opCode": "ldcon", "operand": {"type": "System.Int32", "value": "7"}}));
        roundtrip(json!({"opCode": "ldcon", "operand": {"value": null, "type": "string"}}));
    }

    #[test]
    fn test_roundtrip_field_and_call_targets() {
        roundtrip(json!({
            "opCode": "stfld",
            "operand": {"field": {"declaringType": "B", "name": "x", "type": "int32"}}
        }));
        roundtrip(json!({
            "opCode": "call",
            "operand": {"method": {
                "declaringType": "System.Console",
                "name": "WriteLine",
                "returnType": "void",
                "parameterTypes": ["string"]
            }}
        }));
    }

    #[test]
    fn test_roundtrip_branches() {
        roundtrip(json!({"opCode": "br", "operand": {"target": 4}}));
        roundtrip(json!({"opCode": "brtrue", "operand": {"target": "loop_top"}}));
    }

    #[test]
    fn test_roundtrip_structured_blocks() {
        roundtrip(json!({
            "opCode": "if",
            "operand": {
                "thenBlock": [{"opCode": "ldi4", "operand": 1}],
                "elseBlock": []
            }
        }));
        roundtrip(json!({
            "opCode": "while",
            "operand": {
                "condition": {"kind": "binary", "operation": "clt"},
                "body": [
                    {"opCode": "ldloc", "operand": {"localName": "i"}},
                    {"opCode": "ldi4", "operand": 1},
                    {"opCode": "add"},
                    {"opCode": "stloc", "operand": {"localName": "i"}}
                ]
            }
        }));
    }

    #[test]
    fn test_roundtrip_newobj_and_castclass() {
        roundtrip(json!({"opCode": "newobj", "operand": {"type": "Demo.Widget"}}));
        roundtrip(json!({"opCode": "castclass", "operand": "Demo.Widget"}));
    }

    #[test]
    fn test_nop_has_no_operand() {
        let encoded = encode_instruction(&Instruction::new(OpCode::Nop));
        assert_eq!(encoded, json!({"opCode": "nop"}));
    }
}
