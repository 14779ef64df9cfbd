//! Native function registry.
//!
//! Built once from an explicit table; a name declared twice is an error.
//! The session checks the container's function table against it at start.

use std::collections::HashMap;

use luna_common::LValue;

use crate::builtins;
use crate::domain::Domain;
use crate::error::RuntimeError;
use crate::session::Session;

/// Native handler.
///
/// Receives the session, the calling domain, the arguments (`args[0]` is
/// the first source-level argument), the argument count and the caller's
/// operand stack. The return value is pushed by the interpreter.
pub type NativeFn = fn(
    &mut Session,
    &mut Domain,
    &[LValue],
    usize,
    &mut Vec<LValue>,
) -> Result<LValue, RuntimeError>;

#[derive(Debug, Clone, Default)]
pub struct NativeRegistry {
    table: HashMap<&'static str, NativeFn>,
}

impl NativeRegistry {
    /// Registry holding every built-in function.
    pub fn standard() -> Result<Self, RuntimeError> {
        Self::from_table(builtins::table())
    }

    pub fn from_table<'a>(
        table: impl IntoIterator<Item = &'a (&'static str, NativeFn)>,
    ) -> Result<Self, RuntimeError> {
        let mut registry = Self::default();
        for &(name, handler) in table {
            registry.register(name, handler)?;
        }
        Ok(registry)
    }

    /// Adds a handler. Names are unique.
    pub fn register(&mut self, name: &'static str, handler: NativeFn) -> Result<(), RuntimeError> {
        if self.table.insert(name, handler).is_some() {
            return Err(RuntimeError::DuplicateNative { name });
        }
        Ok(())
    }

    pub fn get(&self, name: &str) -> Option<NativeFn> {
        self.table.get(name).copied()
    }

    pub fn contains(&self, name: &str) -> bool {
        self.table.contains_key(name)
    }

    pub fn len(&self) -> usize {
        self.table.len()
    }

    pub fn is_empty(&self) -> bool {
        self.table.is_empty()
    }

    /// Registered names, sorted.
    pub fn names(&self) -> Vec<&'static str> {
        let mut names: Vec<_> = self.table.keys().copied().collect();
        names.sort_unstable();
        names
    }
}
