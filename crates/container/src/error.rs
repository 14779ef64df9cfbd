//! Load errors for the container reader.
//!
//! Any of these aborts the load. Offsets are absolute file offsets.

use luna_common::DecodeError;
use thiserror::Error;

/// Errors that occur while loading a container.
#[derive(Debug, Error)]
pub enum LoadError {
    /// A read or a declared length runs past the data, or a field holds an
    /// impossible value.
    #[error("malformed container at offset {offset:#x}: {reason}")]
    MalformedContainer { offset: usize, reason: String },

    /// An index or address does not resolve inside its table.
    #[error("unresolved {table} reference {index}")]
    UnresolvedReference { table: &'static str, index: i64 },

    /// Bytecode older than version 15 uses a different instruction layout.
    #[error("unsupported bytecode version {version} (15 or later required)")]
    UnsupportedBytecode { version: u8 },

    /// An object's parent chain loops back on itself.
    #[error("object {object} has a cyclic parent chain")]
    CyclicInheritance { object: usize },

    /// A code entry failed to decode.
    #[error("failed to decode {code}: {source}")]
    Decode {
        code: String,
        #[source]
        source: DecodeError,
    },

    #[error(transparent)]
    Io(#[from] std::io::Error),
}

impl LoadError {
    pub(crate) fn malformed(offset: usize, reason: impl Into<String>) -> Self {
        LoadError::MalformedContainer {
            offset,
            reason: reason.into(),
        }
    }

    pub(crate) fn unresolved(table: &'static str, index: impl Into<i64>) -> Self {
        LoadError::UnresolvedReference {
            table,
            index: index.into(),
        }
    }
}
