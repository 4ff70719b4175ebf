//! Instruction set for the ObjectIR runtime.
//!
//! This crate defines the stack-machine instruction data model: the opcode
//! table with its mnemonic aliases, the [`Instruction`] structure with its
//! opcode-specific operand slots, and the JSON decoding and encoding rules
//! used by the module loader, the metadata exporter, and the plugin API.
//!
//! # Example
//!
//! ```
//! use instruction_set::{decode_instruction, OpCode};
//!
//! let node = serde_json::json!({
//!     "opCode": "ldc.i4",
//!     "operand": 42
//! });
//!
//! let instr = decode_instruction(&node).unwrap();
//! assert_eq!(instr.opcode, OpCode::LdI4);
//! assert_eq!(instr.operand_int, Some(42));
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod decode;
pub mod encode;
pub mod instruction;
pub mod opcode;

pub use decode::{decode_instruction, decode_instruction_array, decode_label_map};
pub use encode::{encode_instruction, encode_instruction_block};
pub use instruction::{
    CallTarget, Condition, ConditionKind, ConstantOperand, FieldTarget, IfData, Instruction,
    WhileData,
};
pub use opcode::OpCode;
