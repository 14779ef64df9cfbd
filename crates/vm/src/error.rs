//! Runtime errors for the Luna interpreter.
//!
//! An error aborts the code segment that raised it and every frame above
//! it; the session itself stays usable. Instruction-level errors carry the byte
//! offset (`at`) of the instruction inside its code segment.

use luna_common::TypeMismatch;
use thiserror::Error;

/// Errors that occur while executing bytecode or a native function.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum RuntimeError {
    /// Pop below the current frame's stack base.
    #[error("stack underflow at offset {at}")]
    StackUnderflow { at: usize },

    /// `call` names neither a native nor a script.
    #[error("unknown function {name} at offset {at}")]
    UnknownFunction { at: usize, name: String },

    /// An operator was applied to operands it is not defined for.
    #[error("{source} at offset {at}")]
    TypeMismatch {
        at: usize,
        #[source]
        source: TypeMismatch,
    },

    /// Script calls nested deeper than the configured limit.
    #[error("call depth exceeded limit {limit} at offset {at}")]
    CallDepthExceeded { at: usize, limit: usize },

    #[error("unknown instance {id}")]
    UnknownInstance { id: i64 },

    #[error("unknown object {index}")]
    UnknownObject { index: i64 },

    #[error("unknown room {index}")]
    UnknownRoom { index: i64 },

    #[error("unknown code entry {name}")]
    UnknownCode { name: String },

    /// A native function rejected its arguments.
    #[error("{function}: {reason}")]
    InvalidArgument {
        function: &'static str,
        reason: String,
    },

    /// The native table declares a name twice.
    #[error("native function {name} registered twice")]
    DuplicateNative { name: &'static str },
}

impl RuntimeError {
    pub(crate) fn invalid(function: &'static str, reason: impl Into<String>) -> Self {
        RuntimeError::InvalidArgument {
            function,
            reason: reason.into(),
        }
    }
}
