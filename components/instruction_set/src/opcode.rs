//! Opcode table for the ObjectIR stack machine.
//!
//! Mnemonics are case-insensitive and several CIL-style aliases map onto the
//! canonical opcodes (`ldc.i4` for `ldi4`, `beq.s` for `beq`, ...).

use core_types::{ErrorKind, RuntimeError, RuntimeResult};

/// Opcodes recognized by the ObjectIR engine.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum OpCode {
    // Stack
    /// No operation
    Nop,
    /// Duplicate the top stack value
    Dup,
    /// Discard the top stack value
    Pop,

    // Loads
    /// Load a named argument
    LdArg,
    /// Load a named local
    LdLoc,
    /// Load a field from an instance (stack instance or `this`)
    LdFld,
    /// Load a typed constant
    LdCon,
    /// Load a string constant
    LdStr,
    /// Load an int32 literal
    LdI4,
    /// Load an int64 literal
    LdI8,
    /// Load a float32 literal
    LdR4,
    /// Load a float64 literal
    LdR8,
    /// Load boolean true
    LdTrue,
    /// Load boolean false
    LdFalse,
    /// Load the null value
    LdNull,

    // Stores
    /// Store to a named local
    StLoc,
    /// Store to a field of an instance
    StFld,
    /// Store to a named argument
    StArg,

    // Arithmetic
    /// Addition (string concatenation when either operand is a string)
    Add,
    /// Subtraction
    Sub,
    /// Multiplication
    Mul,
    /// Division
    Div,
    /// Integer remainder
    Rem,
    /// Numeric negation
    Neg,

    // Comparison
    /// Equal
    Ceq,
    /// Not equal
    Cne,
    /// Less than
    Clt,
    /// Less than or equal
    Cle,
    /// Greater than
    Cgt,
    /// Greater than or equal
    Cge,

    // Control flow
    /// Return from the current method
    Ret,
    /// Unconditional branch
    Br,
    /// Branch if the popped value is truthy
    BrTrue,
    /// Branch if the popped value is falsy
    BrFalse,
    /// Branch if equal
    Beq,
    /// Branch if not equal
    Bne,
    /// Branch if greater than
    Bgt,
    /// Branch if less than
    Blt,
    /// Branch if greater than or equal
    Bge,
    /// Branch if less than or equal
    Ble,
    /// Structured conditional with then/else blocks
    If,
    /// Structured loop with a condition and a body block
    While,
    /// Terminate the innermost loop
    Break,
    /// Restart the innermost loop iteration
    Continue,
    /// Terminating fault
    Throw,

    // Objects and types
    /// Allocate an instance of a named class
    NewObj,
    /// Call a static method
    Call,
    /// Call an instance method on a stack receiver
    CallVirt,
    /// Checked cast (decoded, not executed by this core)
    CastClass,
    /// Type test (decoded, not executed by this core)
    IsInst,

    // Arrays (decoded, not executed by this core)
    /// Allocate an array
    NewArr,
    /// Load an array element
    LdElem,
    /// Store an array element
    StElem,
    /// Load an array length
    LdLen,
}

impl OpCode {
    /// Parse an opcode mnemonic, case-insensitively, admitting aliases.
    pub fn parse(text: &str) -> RuntimeResult<OpCode> {
        let op = text.to_ascii_lowercase();
        let parsed = match op.as_str() {
            "nop" => OpCode::Nop,
            "dup" => OpCode::Dup,
            "pop" => OpCode::Pop,

            "ldarg" => OpCode::LdArg,
            "ldloc" => OpCode::LdLoc,
            "ldfld" => OpCode::LdFld,
            "ldcon" | "ldc" => OpCode::LdCon,
            "ldstr" => OpCode::LdStr,
            "ldi4" | "ldi32" | "ldc.i4" => OpCode::LdI4,
            "ldi8" | "ldi64" | "ldc.i8" => OpCode::LdI8,
            "ldr4" | "ldc.r4" => OpCode::LdR4,
            "ldr8" | "ldc.r8" => OpCode::LdR8,
            "ldtrue" => OpCode::LdTrue,
            "ldfalse" => OpCode::LdFalse,
            "ldnull" => OpCode::LdNull,

            "stloc" => OpCode::StLoc,
            "stfld" => OpCode::StFld,
            "starg" => OpCode::StArg,

            "add" => OpCode::Add,
            "sub" => OpCode::Sub,
            "mul" => OpCode::Mul,
            "div" => OpCode::Div,
            "rem" => OpCode::Rem,
            "neg" => OpCode::Neg,

            "ceq" => OpCode::Ceq,
            "cne" => OpCode::Cne,
            "clt" => OpCode::Clt,
            "cle" => OpCode::Cle,
            "cgt" => OpCode::Cgt,
            "cge" => OpCode::Cge,

            "ret" => OpCode::Ret,
            "br" => OpCode::Br,
            "brtrue" => OpCode::BrTrue,
            "brfalse" => OpCode::BrFalse,
            "beq" | "beq.s" => OpCode::Beq,
            "bne" | "bne.un" | "bne.s" => OpCode::Bne,
            "bgt" | "bgt.s" | "bgt.un" => OpCode::Bgt,
            "blt" | "blt.s" | "blt.un" => OpCode::Blt,
            "bge" | "bge.s" | "bge.un" => OpCode::Bge,
            "ble" | "ble.s" | "ble.un" => OpCode::Ble,

            "if" => OpCode::If,
            "while" => OpCode::While,
            "break" => OpCode::Break,
            "continue" => OpCode::Continue,
            "throw" => OpCode::Throw,

            "newobj" => OpCode::NewObj,
            "call" => OpCode::Call,
            "callvirt" => OpCode::CallVirt,
            "castclass" => OpCode::CastClass,
            "isinst" => OpCode::IsInst,

            "newarr" => OpCode::NewArr,
            "ldelem" => OpCode::LdElem,
            "stelem" => OpCode::StElem,
            "ldlen" => OpCode::LdLen,

            _ => {
                return Err(RuntimeError::new(
                    ErrorKind::BadOpcode,
                    format!("unknown opcode: {text}"),
                ))
            }
        };
        Ok(parsed)
    }

    /// The canonical mnemonic, used when serializing instructions.
    pub fn mnemonic(&self) -> &'static str {
        match self {
            OpCode::Nop => "nop",
            OpCode::Dup => "dup",
            OpCode::Pop => "pop",
            OpCode::LdArg => "ldarg",
            OpCode::LdLoc => "ldloc",
            OpCode::LdFld => "ldfld",
            OpCode::LdCon => "ldcon",
            OpCode::LdStr => "ldstr",
            OpCode::LdI4 => "ldi4",
            OpCode::LdI8 => "ldi8",
            OpCode::LdR4 => "ldr4",
            OpCode::LdR8 => "ldr8",
            OpCode::LdTrue => "ldtrue",
            OpCode::LdFalse => "ldfalse",
            OpCode::LdNull => "ldnull",
            OpCode::StLoc => "stloc",
            OpCode::StFld => "stfld",
            OpCode::StArg => "starg",
            OpCode::Add => "add",
            OpCode::Sub => "sub",
            OpCode::Mul => "mul",
            OpCode::Div => "div",
            OpCode::Rem => "rem",
            OpCode::Neg => "neg",
            OpCode::Ceq => "ceq",
            OpCode::Cne => "cne",
            OpCode::Clt => "clt",
            OpCode::Cle => "cle",
            OpCode::Cgt => "cgt",
            OpCode::Cge => "cge",
            OpCode::Ret => "ret",
            OpCode::Br => "br",
            OpCode::BrTrue => "brtrue",
            OpCode::BrFalse => "brfalse",
            OpCode::Beq => "beq",
            OpCode::Bne => "bne",
            OpCode::Bgt => "bgt",
            OpCode::Blt => "blt",
            OpCode::Bge => "bge",
            OpCode::Ble => "ble",
            OpCode::If => "if",
            OpCode::While => "while",
            OpCode::Break => "break",
            OpCode::Continue => "continue",
            OpCode::Throw => "throw",
            OpCode::NewObj => "newobj",
            OpCode::Call => "call",
            OpCode::CallVirt => "callvirt",
            OpCode::CastClass => "castclass",
            OpCode::IsInst => "isinst",
            OpCode::NewArr => "newarr",
            OpCode::LdElem => "ldelem",
            OpCode::StElem => "stelem",
            OpCode::LdLen => "ldlen",
        }
    }

    /// Whether this opcode is in the branch family handled by the dispatcher.
    pub fn is_branch(&self) -> bool {
        matches!(
            self,
            OpCode::Br
                | OpCode::BrTrue
                | OpCode::BrFalse
                | OpCode::Beq
                | OpCode::Bne
                | OpCode::Bgt
                | OpCode::Blt
                | OpCode::Bge
                | OpCode::Ble
        )
    }

    /// Whether this opcode pushes a boolean comparison result.
    pub fn is_comparison(&self) -> bool {
        matches!(
            self,
            OpCode::Ceq | OpCode::Cne | OpCode::Clt | OpCode::Cle | OpCode::Cgt | OpCode::Cge
        )
    }

    /// Whether this opcode is a pure load that a `while` loop with a binary
    /// condition may replay before each condition check.
    pub fn is_replayable_load(&self) -> bool {
        matches!(
            self,
            OpCode::LdLoc
                | OpCode::LdCon
                | OpCode::LdI4
                | OpCode::LdI8
                | OpCode::LdR4
                | OpCode::LdR8
                | OpCode::LdTrue
                | OpCode::LdFalse
                | OpCode::LdNull
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use core_types::ErrorKind;

    #[test]
    fn test_parse_is_case_insensitive() {
        assert_eq!(OpCode::parse("NOP").unwrap(), OpCode::Nop);
        assert_eq!(OpCode::parse("LdLoc").unwrap(), OpCode::LdLoc);
        assert_eq!(OpCode::parse("CALLVIRT").unwrap(), OpCode::CallVirt);
    }

    #[test]
    fn test_parse_aliases() {
        assert_eq!(OpCode::parse("ldc").unwrap(), OpCode::LdCon);
        assert_eq!(OpCode::parse("ldc.i4").unwrap(), OpCode::LdI4);
        assert_eq!(OpCode::parse("ldi32").unwrap(), OpCode::LdI4);
        assert_eq!(OpCode::parse("ldc.i8").unwrap(), OpCode::LdI8);
        assert_eq!(OpCode::parse("ldc.r4").unwrap(), OpCode::LdR4);
        assert_eq!(OpCode::parse("ldc.r8").unwrap(), OpCode::LdR8);
        assert_eq!(OpCode::parse("beq.s").unwrap(), OpCode::Beq);
        assert_eq!(OpCode::parse("bne.un").unwrap(), OpCode::Bne);
        assert_eq!(OpCode::parse("bgt.un").unwrap(), OpCode::Bgt);
        assert_eq!(OpCode::parse("ble.s").unwrap(), OpCode::Ble);
    }

    #[test]
    fn test_parse_unknown_opcode() {
        let err = OpCode::parse("frobnicate").unwrap_err();
        assert_eq!(err.kind, ErrorKind::BadOpcode);
    }

    #[test]
    fn test_mnemonics_reparse() {
        let all = [
            OpCode::Nop,
            OpCode::Dup,
            OpCode::LdArg,
            OpCode::LdCon,
            OpCode::LdI8,
            OpCode::StFld,
            OpCode::Rem,
            OpCode::Cge,
            OpCode::BrFalse,
            OpCode::Ble,
            OpCode::While,
            OpCode::NewObj,
            OpCode::CallVirt,
            OpCode::LdLen,
        ];
        for op in all {
            assert_eq!(OpCode::parse(op.mnemonic()).unwrap(), op);
        }
    }

    #[test]
    fn test_is_branch() {
        assert!(OpCode::Br.is_branch());
        assert!(OpCode::Ble.is_branch());
        assert!(!OpCode::Ret.is_branch());
        assert!(!OpCode::If.is_branch());
    }

    #[test]
    fn test_is_replayable_load() {
        assert!(OpCode::LdLoc.is_replayable_load());
        assert!(OpCode::LdI4.is_replayable_load());
        assert!(OpCode::LdNull.is_replayable_load());
        assert!(!OpCode::LdArg.is_replayable_load());
        assert!(!OpCode::LdStr.is_replayable_load());
        assert!(!OpCode::LdFld.is_replayable_load());
    }
}
