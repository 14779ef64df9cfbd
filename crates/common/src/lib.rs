//! Luna common types: bytecode encoding and the runtime value model.
//!
//! This crate provides the data structures shared by the loader and the
//! interpreter:
//!
//! - [`Opcode`] and [`DataType`]: the bytes of an instruction word
//! - [`Word`] and [`Instruction`]: raw and decoded instructions
//! - [`Program`]: a branch-resolved code segment
//! - [`LValue`]: the dynamically typed value every script manipulates
//! - [`DecodeError`] and [`TypeMismatch`]: shared error types
//!
//! # Dependencies
//!
//! This crate uses `thiserror` and has no other dependencies.

pub mod data_type;
pub mod error;
pub mod instruction;
pub mod opcode;
pub mod program;
pub mod value;

// Re-export commonly used types at the crate root.
pub use data_type::DataType;
pub use error::{DecodeError, TypeMismatch};
pub use instruction::{
    BinaryOp, BranchCondition, Comparison, Instruction, PushKind, PushOperand, Scope, UnaryOp,
    VariableRef, Word,
};
pub use opcode::Opcode;
pub use program::Program;
pub use value::LValue;
