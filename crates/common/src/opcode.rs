//! Opcode definitions for the runner's bytecode (format version 15 and up).
//!
//! The opcode occupies bits 24–31 of every instruction word.

/// Identifies the operation an instruction word performs.
///
/// The `#[repr(u8)]` attribute pins each variant to its byte value in the
/// instruction word.
#[repr(u8)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Opcode {
    // Conversion
    /// Convert the top of stack between data types.
    Conv = 0x07,

    // Arithmetic
    /// Pop two values, push their product.
    Mul = 0x08,
    /// Pop two values, push their quotient.
    Div = 0x09,
    /// Pop two values, push the floored quotient (`div`).
    Rem = 0x0A,
    /// Pop two values, push the remainder (`mod`, `%`).
    Mod = 0x0B,
    /// Pop two values, push their sum or concatenation.
    Add = 0x0C,
    /// Pop two values, push their difference.
    Sub = 0x0D,

    // Bitwise
    /// Bitwise AND.
    And = 0x0E,
    /// Bitwise OR.
    Or = 0x0F,
    /// Bitwise XOR.
    Xor = 0x10,
    /// Arithmetic negation.
    Neg = 0x11,
    /// Logical NOT for booleans, bitwise NOT for numbers.
    Not = 0x12,
    /// Shift left.
    Shl = 0x13,
    /// Arithmetic shift right.
    Shr = 0x14,

    // Comparison
    /// Pop two values, push the result of the operator in the immediate.
    Cmp = 0x15,

    // Stack and variables
    /// Pop the top of stack into a variable.
    Pop = 0x45,
    /// Push the 16-bit immediate.
    PushI = 0x84,
    /// Duplicate the top of stack.
    Dup = 0x86,

    // Calls and control flow
    /// Call a function value taken from the stack.
    CallV = 0x99,
    /// Return the top of stack from the current code segment.
    Ret = 0x9C,
    /// Leave the current code segment without a value.
    Exit = 0x9D,
    /// Pop and discard the top of stack.
    PopZ = 0x9E,
    /// Unconditional branch.
    B = 0xB6,
    /// Branch if the popped value is true.
    Bt = 0xB7,
    /// Branch if the popped value is false.
    Bf = 0xB8,
    /// Enter a `with` block.
    PushEnv = 0xBA,
    /// Leave a `with` block.
    PopEnv = 0xBB,

    // Typed pushes
    /// Push a constant or a variable.
    Push = 0xC0,
    /// Push a local variable.
    PushLoc = 0xC1,
    /// Push a global variable.
    PushGlb = 0xC2,
    /// Push a built-in variable.
    PushBltn = 0xC3,

    /// Call a named function.
    Call = 0xD9,
    /// Extended operations (`chkindex`, `pushref`, ...).
    Break = 0xFF,
}

/// All known opcodes, in definition order. Useful for exhaustive testing.
pub const ALL_OPCODES: [Opcode; 33] = [
    Opcode::Conv,
    Opcode::Mul,
    Opcode::Div,
    Opcode::Rem,
    Opcode::Mod,
    Opcode::Add,
    Opcode::Sub,
    Opcode::And,
    Opcode::Or,
    Opcode::Xor,
    Opcode::Neg,
    Opcode::Not,
    Opcode::Shl,
    Opcode::Shr,
    Opcode::Cmp,
    Opcode::Pop,
    Opcode::PushI,
    Opcode::Dup,
    Opcode::CallV,
    Opcode::Ret,
    Opcode::Exit,
    Opcode::PopZ,
    Opcode::B,
    Opcode::Bt,
    Opcode::Bf,
    Opcode::PushEnv,
    Opcode::PopEnv,
    Opcode::Push,
    Opcode::PushLoc,
    Opcode::PushGlb,
    Opcode::PushBltn,
    Opcode::Call,
    Opcode::Break,
];

/// Unrecognised bytes are handed back so the decoder can keep them.
impl TryFrom<u8> for Opcode {
    type Error = u8;

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        match value {
            0x07 => Ok(Opcode::Conv),
            0x08 => Ok(Opcode::Mul),
            0x09 => Ok(Opcode::Div),
            0x0A => Ok(Opcode::Rem),
            0x0B => Ok(Opcode::Mod),
            0x0C => Ok(Opcode::Add),
            0x0D => Ok(Opcode::Sub),
            0x0E => Ok(Opcode::And),
            0x0F => Ok(Opcode::Or),
            0x10 => Ok(Opcode::Xor),
            0x11 => Ok(Opcode::Neg),
            0x12 => Ok(Opcode::Not),
            0x13 => Ok(Opcode::Shl),
            0x14 => Ok(Opcode::Shr),
            0x15 => Ok(Opcode::Cmp),
            0x45 => Ok(Opcode::Pop),
            0x84 => Ok(Opcode::PushI),
            0x86 => Ok(Opcode::Dup),
            0x99 => Ok(Opcode::CallV),
            0x9C => Ok(Opcode::Ret),
            0x9D => Ok(Opcode::Exit),
            0x9E => Ok(Opcode::PopZ),
            0xB6 => Ok(Opcode::B),
            0xB7 => Ok(Opcode::Bt),
            0xB8 => Ok(Opcode::Bf),
            0xBA => Ok(Opcode::PushEnv),
            0xBB => Ok(Opcode::PopEnv),
            0xC0 => Ok(Opcode::Push),
            0xC1 => Ok(Opcode::PushLoc),
            0xC2 => Ok(Opcode::PushGlb),
            0xC3 => Ok(Opcode::PushBltn),
            0xD9 => Ok(Opcode::Call),
            0xFF => Ok(Opcode::Break),
            other => Err(other),
        }
    }
}

impl Opcode {
    /// Returns the assembly mnemonic for this opcode.
    pub fn mnemonic(self) -> &'static str {
        match self {
            Opcode::Conv => "conv",
            Opcode::Mul => "mul",
            Opcode::Div => "div",
            Opcode::Rem => "rem",
            Opcode::Mod => "mod",
            Opcode::Add => "add",
            Opcode::Sub => "sub",
            Opcode::And => "and",
            Opcode::Or => "or",
            Opcode::Xor => "xor",
            Opcode::Neg => "neg",
            Opcode::Not => "not",
            Opcode::Shl => "shl",
            Opcode::Shr => "shr",
            Opcode::Cmp => "cmp",
            Opcode::Pop => "pop",
            Opcode::PushI => "pushi",
            Opcode::Dup => "dup",
            Opcode::CallV => "callv",
            Opcode::Ret => "ret",
            Opcode::Exit => "exit",
            Opcode::PopZ => "popz",
            Opcode::B => "b",
            Opcode::Bt => "bt",
            Opcode::Bf => "bf",
            Opcode::PushEnv => "pushenv",
            Opcode::PopEnv => "popenv",
            Opcode::Push => "push",
            Opcode::PushLoc => "pushloc",
            Opcode::PushGlb => "pushglb",
            Opcode::PushBltn => "pushbltn",
            Opcode::Call => "call",
            Opcode::Break => "break",
        }
    }

    /// Returns true for opcodes whose low 23 bits hold a branch displacement.
    pub fn is_branch(self) -> bool {
        matches!(
            self,
            Opcode::B | Opcode::Bt | Opcode::Bf | Opcode::PushEnv | Opcode::PopEnv
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn roundtrip_all_opcodes() {
        for &op in &ALL_OPCODES {
            assert_eq!(Opcode::try_from(op as u8), Ok(op), "failed for {op:?}");
        }
    }

    #[test]
    fn unknown_bytes_are_returned() {
        assert_eq!(Opcode::try_from(0x00), Err(0x00));
        assert_eq!(Opcode::try_from(0x05), Err(0x05));
        assert_eq!(Opcode::try_from(0x80), Err(0x80));
    }

    #[test]
    fn mnemonics_are_unique() {
        let mut names: Vec<&str> = ALL_OPCODES.iter().map(|op| op.mnemonic()).collect();
        names.sort_unstable();
        names.dedup();
        assert_eq!(names.len(), ALL_OPCODES.len());
    }

    #[test]
    fn branch_classification() {
        assert!(Opcode::B.is_branch());
        assert!(Opcode::Bf.is_branch());
        assert!(Opcode::PopEnv.is_branch());
        assert!(!Opcode::Call.is_branch());
        assert!(!Opcode::Cmp.is_branch());
    }
}
