//! Decode and value errors shared by the Luna crates.

use thiserror::Error;

/// Errors that occur while turning instruction words into [`Instruction`]s.
///
/// `at` is always the byte offset of the offending instruction word inside
/// its code segment.
///
/// [`Instruction`]: crate::Instruction
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DecodeError {
    /// Argument nibble does not name a data type.
    #[error("unknown data type {value:#x} at offset {at:#x}")]
    UnknownDataType { at: usize, value: u8 },

    /// `cmp` immediate does not name a relational operator.
    #[error("unknown comparison {value:#x} at offset {at:#x}")]
    UnknownComparison { at: usize, value: u8 },

    /// The data type is valid but the opcode has no operand-fetch protocol
    /// for it, so the instruction length is unknown.
    #[error("unsupported {data_type} operand for opcode {opcode:#04x} at offset {at:#x}")]
    UnsupportedOperand {
        at: usize,
        opcode: u8,
        data_type: &'static str,
    },

    /// Trailing operand bytes run past the end of the code segment.
    #[error("truncated instruction at offset {at:#x}")]
    Truncated { at: usize },

    /// A branch displacement does not land on an instruction boundary.
    #[error("branch at offset {at:#x} targets {target} which is not an instruction boundary")]
    InvalidBranchTarget { at: usize, target: i64 },

    /// Entry point offset does not land on an instruction boundary.
    #[error("entry offset {offset:#x} is not an instruction boundary")]
    InvalidEntry { offset: usize },
}

/// An operator was applied to operand kinds it is not defined for.
///
/// The value model is total, but a handful of combinations (numeric plus
/// string, arithmetic on arrays) are defined to be errors.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("type mismatch: {left} {op} {right}")]
pub struct TypeMismatch {
    /// Operator symbol.
    pub op: &'static str,
    /// Kind name of the left (or only) operand.
    pub left: &'static str,
    /// Kind name of the right operand, empty for unary operators.
    pub right: &'static str,
}
