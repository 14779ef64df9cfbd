//! Instruction words and decoded instructions.
//!
//! Every instruction starts with one 32-bit little-endian word:
//! ```text
//! Bits 24-31: opcode (u8)
//! Bits 16-23: argument (u8) - data types, one per nibble
//! Bits  0-15: immediate (i16)
//! ```
//! Some instructions are followed by a 4 or 8 byte operand. A decoded
//! [`Instruction`] carries its resolved operands, so executing it never
//! touches the byte stream again.

use std::fmt;
use std::rc::Rc;

use crate::data_type::DataType;
use crate::opcode::Opcode;
use crate::value::LValue;

/// The fixed 32-bit part of an instruction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Word {
    /// Raw opcode byte. May not name a known [`Opcode`].
    pub opcode: u8,
    /// Argument byte.
    pub argument: u8,
    /// Signed 16-bit immediate.
    pub immediate: i16,
}

impl Word {
    /// Create a word from its three fields.
    pub fn new(opcode: u8, argument: u8, immediate: i16) -> Self {
        Self {
            opcode,
            argument,
            immediate,
        }
    }

    /// Split a raw instruction word into its fields.
    pub fn from_raw(raw: u32) -> Self {
        Self {
            opcode: (raw >> 24) as u8,
            argument: (raw >> 16) as u8,
            immediate: raw as u16 as i16,
        }
    }

    /// Reassemble the raw instruction word.
    pub fn raw(self) -> u32 {
        ((self.opcode as u32) << 24) | ((self.argument as u32) << 16) | (self.immediate as u16 as u32)
    }

    /// Decode 4 bytes (little-endian).
    pub fn from_le_bytes(bytes: [u8; 4]) -> Self {
        Self::from_raw(u32::from_le_bytes(bytes))
    }

    /// Encode this word to 4 bytes (little-endian).
    pub fn to_le_bytes(self) -> [u8; 4] {
        self.raw().to_le_bytes()
    }

    /// Data type nibble in bits 16-19.
    pub fn first_type(self) -> u8 {
        self.argument & 0x0F
    }

    /// Data type nibble in bits 20-23.
    pub fn second_type(self) -> u8 {
        self.argument >> 4
    }

    /// Branch displacement in bytes: the low 23 bits, sign-extended, counted
    /// in 4-byte units.
    pub fn branch_displacement(self) -> i32 {
        ((self.raw() << 9) as i32) >> 7
    }

    /// Build a branch word from an opcode and a byte displacement.
    pub fn branch(opcode: Opcode, displacement: i32) -> Self {
        let units = ((displacement >> 2) as u32) & 0x007F_FFFF;
        Self::from_raw(((opcode as u32) << 24) | units)
    }
}

/// Storage class of a variable.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Scope {
    /// Shared by the whole session.
    Global,
    /// Shared by every execution of the defining script.
    Static,
    /// Owned by the active domain.
    Local,
}

impl Scope {
    pub fn name(self) -> &'static str {
        match self {
            Scope::Global => "global",
            Scope::Static => "static",
            Scope::Local => "local",
        }
    }
}

/// A variable reference resolved at decode time.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct VariableRef {
    pub name: Rc<str>,
    pub scope: Scope,
    /// Index into the variable table it was resolved from.
    pub index: usize,
}

impl fmt::Display for VariableRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}", self.scope.name(), self.name)
    }
}

/// Relational operator of a `cmp` instruction, stored in bits 8-15 of its
/// immediate.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Comparison {
    LessThan = 1,
    LessEqual = 2,
    Equal = 3,
    NotEqual = 4,
    GreaterEqual = 5,
    GreaterThan = 6,
}

impl TryFrom<u8> for Comparison {
    type Error = u8;

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        match value {
            1 => Ok(Comparison::LessThan),
            2 => Ok(Comparison::LessEqual),
            3 => Ok(Comparison::Equal),
            4 => Ok(Comparison::NotEqual),
            5 => Ok(Comparison::GreaterEqual),
            6 => Ok(Comparison::GreaterThan),
            other => Err(other),
        }
    }
}

impl Comparison {
    pub fn mnemonic(self) -> &'static str {
        match self {
            Comparison::LessThan => "lt",
            Comparison::LessEqual => "le",
            Comparison::Equal => "eq",
            Comparison::NotEqual => "ne",
            Comparison::GreaterEqual => "ge",
            Comparison::GreaterThan => "gt",
        }
    }
}

/// Two-operand arithmetic and bitwise operators.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum BinaryOp {
    Mul,
    Div,
    Rem,
    Mod,
    Add,
    Sub,
    And,
    Or,
    Xor,
    Shl,
    Shr,
}

impl BinaryOp {
    /// Applies the operator through the value model.
    pub fn apply(self, lhs: &LValue, rhs: &LValue) -> Result<LValue, crate::TypeMismatch> {
        match self {
            BinaryOp::Mul => lhs.mul(rhs),
            BinaryOp::Div => lhs.div(rhs),
            BinaryOp::Rem => lhs.rem(rhs),
            BinaryOp::Mod => lhs.modulo(rhs),
            BinaryOp::Add => lhs.add(rhs),
            BinaryOp::Sub => lhs.sub(rhs),
            BinaryOp::And => lhs.bit_and(rhs),
            BinaryOp::Or => lhs.bit_or(rhs),
            BinaryOp::Xor => lhs.bit_xor(rhs),
            BinaryOp::Shl => lhs.shl(rhs),
            BinaryOp::Shr => lhs.shr(rhs),
        }
    }
}

/// One-operand operators.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum UnaryOp {
    Neg,
    Not,
}

/// Condition under which a branch is taken.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum BranchCondition {
    Always,
    /// Taken when the popped value is exactly 1.0.
    IfTrue,
    /// Taken when the popped value is exactly 0.0.
    IfFalse,
}

/// Which push opcode produced a [`Instruction::Push`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PushKind {
    /// `push`: constant or variable in its declared scope.
    Plain,
    /// `pushloc`: variable forced to local scope.
    Local,
    /// `pushglb`: variable forced to global scope.
    Global,
    /// `pushbltn`: built-in variable.
    Builtin,
}

/// Operand of a push instruction.
#[derive(Debug, Clone, PartialEq)]
pub enum PushOperand {
    Value(LValue),
    Variable(VariableRef),
}

/// A decoded, self-contained instruction.
#[derive(Debug, Clone, PartialEq)]
pub enum Instruction {
    /// `pushi`: the immediate as an integer literal.
    PushImmediate { word: Word, value: LValue },
    /// `push`, `pushloc`, `pushglb`, `pushbltn`.
    Push {
        word: Word,
        kind: PushKind,
        operand: PushOperand,
    },
    /// `pop` into a variable.
    Pop { word: Word, variable: VariableRef },
    /// `popz`.
    PopDiscard { word: Word },
    /// `dup`: duplicate the top `count` values as a block.
    Duplicate { word: Word, count: usize },
    /// `conv`.
    Convert {
        word: Word,
        from: DataType,
        to: DataType,
    },
    Binary { word: Word, op: BinaryOp },
    Unary { word: Word, op: UnaryOp },
    Compare { word: Word, comparison: Comparison },
    /// `b`, `bt`, `bf`. `offset` is the target's byte offset inside the
    /// code segment; `target` is the instruction index it resolves to once
    /// the instruction belongs to a [`Program`](crate::Program).
    Branch {
        word: Word,
        condition: BranchCondition,
        offset: i64,
        target: usize,
    },
    /// `call`: named function with `argc` arguments on the stack.
    Call {
        word: Word,
        function: Rc<str>,
        argc: usize,
    },
    /// `ret`.
    Return { word: Word },
    /// `exit`.
    Exit { word: Word },
    /// A known opcode form the interpreter does not execute. Any trailing
    /// operand has already been consumed.
    Unsupported { word: Word, operand: Option<u32> },
    /// Opcode byte not recognised at all.
    Unknown { word: Word },
}

impl Instruction {
    /// The instruction word this was decoded from.
    pub fn word(&self) -> Word {
        match self {
            Instruction::PushImmediate { word, .. }
            | Instruction::Push { word, .. }
            | Instruction::Pop { word, .. }
            | Instruction::PopDiscard { word }
            | Instruction::Duplicate { word, .. }
            | Instruction::Convert { word, .. }
            | Instruction::Binary { word, .. }
            | Instruction::Unary { word, .. }
            | Instruction::Compare { word, .. }
            | Instruction::Branch { word, .. }
            | Instruction::Call { word, .. }
            | Instruction::Return { word }
            | Instruction::Exit { word }
            | Instruction::Unsupported { word, .. }
            | Instruction::Unknown { word } => *word,
        }
    }

    /// The opcode, if the word's opcode byte is a known one.
    pub fn opcode(&self) -> Option<Opcode> {
        Opcode::try_from(self.word().opcode).ok()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn split_word_fields() {
        let word = Word::from_raw(0xC0_05_FF_FF);
        assert_eq!(word.opcode, 0xC0);
        assert_eq!(word.argument, 0x05);
        assert_eq!(word.immediate, -1);
        assert_eq!(word.raw(), 0xC0_05_FF_FF);
    }

    #[test]
    fn little_endian_bytes() {
        let word = Word::new(Opcode::Push as u8, 0x05, -1);
        assert_eq!(word.to_le_bytes(), [0xFF, 0xFF, 0x05, 0xC0]);
        assert_eq!(Word::from_le_bytes([0xFF, 0xFF, 0x05, 0xC0]), word);
    }

    #[test]
    fn type_nibbles() {
        let word = Word::new(Opcode::Pop as u8, 0x52, 0);
        assert_eq!(word.first_type(), 0x2);
        assert_eq!(word.second_type(), 0x5);
    }

    #[test]
    fn forward_branch_displacement() {
        let word = Word::branch(Opcode::B, 12);
        assert_eq!(word.opcode, 0xB6);
        assert_eq!(word.branch_displacement(), 12);
    }

    #[test]
    fn backward_branch_displacement() {
        let word = Word::branch(Opcode::Bf, -8);
        assert_eq!(word.branch_displacement(), -8);
        // Only the low 23 bits carry the displacement.
        assert_eq!(word.raw() & 0xFF80_0000, 0xB800_0000);
    }

    #[test]
    fn comparison_codes() {
        assert_eq!(Comparison::try_from(1), Ok(Comparison::LessThan));
        assert_eq!(Comparison::try_from(6), Ok(Comparison::GreaterThan));
        assert_eq!(Comparison::try_from(0), Err(0));
        assert_eq!(Comparison::try_from(7), Err(7));
    }

    #[test]
    fn instruction_word_accessor() {
        let word = Word::new(Opcode::Add as u8, 0, 0);
        let instr = Instruction::Binary {
            word,
            op: BinaryOp::Add,
        };
        assert_eq!(instr.word(), word);
        assert_eq!(instr.opcode(), Some(Opcode::Add));

        let unknown = Instruction::Unknown {
            word: Word::new(0x42, 0, 0),
        };
        assert_eq!(unknown.opcode(), None);
    }

    #[test]
    fn binary_op_applies_value_model() {
        let sum = BinaryOp::Add
            .apply(&LValue::Real(5.0), &LValue::Real(3.0))
            .unwrap();
        assert_eq!(sum, LValue::Real(8.0));
        assert!(BinaryOp::Add
            .apply(&LValue::from("x"), &LValue::Real(1.0))
            .is_err());
    }

    #[test]
    fn variable_ref_display() {
        let var = VariableRef {
            name: Rc::from("score"),
            scope: Scope::Global,
            index: 3,
        };
        assert_eq!(var.to_string(), "global.score");
    }
}
