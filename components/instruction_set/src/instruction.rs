//! Instruction representation.
//!
//! An [`Instruction`] carries an opcode plus the operand slots that opcode
//! uses; unused slots stay `None`. Structured control flow (`if`, `while`)
//! nests further instruction lists inside the instruction itself.

use crate::opcode::OpCode;

/// Names a field for `ldfld`/`stfld`.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct FieldTarget {
    /// Declaring class, possibly qualified; may be empty
    pub declaring_type: String,
    /// Field name
    pub name: String,
    /// Declared field type text; may be empty
    pub field_type: String,
}

/// Names a method overload for `call`/`callvirt`.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct CallTarget {
    /// Declaring class, possibly qualified
    pub declaring_type: String,
    /// Method name
    pub name: String,
    /// Normalized return type name
    pub return_type: String,
    /// Normalized parameter type names, leftmost first
    pub parameter_types: Vec<String>,
}

impl CallTarget {
    /// Whether the target's declared return type is void.
    pub fn is_void_return(&self) -> bool {
        self.return_type.is_empty() || self.return_type == "void" || self.return_type == "System.Void"
    }
}

/// A typed constant operand for `ldcon`/`ldstr`.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct ConstantOperand {
    /// Declared type name as written in the module; may be empty
    pub type_name: String,
    /// Raw textual value
    pub raw_value: String,
    /// Boolean payload when the JSON value was a boolean
    pub bool_value: bool,
    /// The constant is the null value
    pub is_null: bool,
}

/// How a `while` condition produces its boolean.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConditionKind {
    /// The top stack value is consumed as the condition
    Stack,
    /// Two stack operands are compared with a comparison opcode
    Binary,
    /// An embedded instruction sequence leaves one boolean
    Expression,
}

/// A `while` loop condition.
#[derive(Debug, Clone, PartialEq)]
pub struct Condition {
    /// The condition kind
    pub kind: ConditionKind,
    /// Comparison opcode for `Binary` conditions
    pub comparison_op: Option<OpCode>,
    /// Instructions run before every condition check
    pub setup: Vec<Instruction>,
    /// Embedded instructions for `Expression` conditions
    pub expression: Vec<Instruction>,
}

impl Condition {
    /// Create a condition of the given kind with empty instruction lists.
    pub fn new(kind: ConditionKind) -> Self {
        Condition {
            kind,
            comparison_op: None,
            setup: Vec::new(),
            expression: Vec::new(),
        }
    }
}

/// Blocks of a structured `if`.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct IfData {
    /// Instructions run when the condition is truthy
    pub then_block: Vec<Instruction>,
    /// Instructions run when the condition is falsy; may be empty
    pub else_block: Vec<Instruction>,
}

/// Condition and body of a structured `while`.
#[derive(Debug, Clone, PartialEq)]
pub struct WhileData {
    /// The loop condition; absent conditions fail at execution time
    pub condition: Option<Condition>,
    /// The loop body
    pub body: Vec<Instruction>,
}

/// One unit of stack-machine execution.
#[derive(Debug, Clone, PartialEq)]
pub struct Instruction {
    /// The opcode
    pub opcode: OpCode,
    /// Argument or local name for `ldarg`/`starg`/`ldloc`/`stloc`
    pub identifier: Option<String>,
    /// Integer operand: literals and absolute branch targets
    pub operand_int: Option<i64>,
    /// Float operand for `ldr4`/`ldr8`
    pub operand_double: Option<f64>,
    /// String operand: type names, label targets, fallback field names
    pub operand_string: Option<String>,
    /// Typed constant for `ldcon`/`ldstr`
    pub constant: Option<ConstantOperand>,
    /// Field target for `ldfld`/`stfld`
    pub field_target: Option<FieldTarget>,
    /// Call target for `call`/`callvirt`
    pub call_target: Option<CallTarget>,
    /// Nested blocks for `if`
    pub if_data: Option<Box<IfData>>,
    /// Condition and body for `while`
    pub while_data: Option<Box<WhileData>>,
}

impl Instruction {
    /// Create an instruction with every operand slot empty.
    pub fn new(opcode: OpCode) -> Self {
        Instruction {
            opcode,
            identifier: None,
            operand_int: None,
            operand_double: None,
            operand_string: None,
            constant: None,
            field_target: None,
            call_target: None,
            if_data: None,
            while_data: None,
        }
    }

    /// The field name for `ldfld`/`stfld`: the field target's name, else the
    /// string-operand fallback.
    pub fn field_name(&self) -> Option<&str> {
        self.field_target
            .as_ref()
            .map(|ft| ft.name.as_str())
            .or(self.operand_string.as_deref())
            .filter(|name| !name.is_empty())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_instruction_new_is_empty() {
        let instr = Instruction::new(OpCode::Nop);
        assert_eq!(instr.opcode, OpCode::Nop);
        assert!(instr.identifier.is_none());
        assert!(instr.operand_int.is_none());
        assert!(instr.field_target.is_none());
        assert!(instr.while_data.is_none());
    }

    #[test]
    fn test_field_name_prefers_target() {
        let mut instr = Instruction::new(OpCode::LdFld);
        instr.operand_string = Some("fallback".to_string());
        instr.field_target = Some(FieldTarget {
            declaring_type: "B".to_string(),
            name: "x".to_string(),
            field_type: "int32".to_string(),
        });
        assert_eq!(instr.field_name(), Some("x"));
    }

    #[test]
    fn test_field_name_falls_back_to_string_operand() {
        let mut instr = Instruction::new(OpCode::StFld);
        instr.operand_string = Some("y".to_string());
        assert_eq!(instr.field_name(), Some("y"));

        instr.operand_string = Some(String::new());
        assert_eq!(instr.field_name(), None);
    }

    #[test]
    fn test_call_target_void_return() {
        let mut target = CallTarget {
            declaring_type: "System.Console".to_string(),
            name: "WriteLine".to_string(),
            return_type: "void".to_string(),
            parameter_types: vec!["string".to_string()],
        };
        assert!(target.is_void_return());

        target.return_type = "int32".to_string();
        assert!(!target.is_void_return());

        target.return_type = String::new();
        assert!(target.is_void_return());
    }
}
