//! Variable scope resolution.
//!
//! Global variables live in one session-wide map. Static variables live in
//! one map per defining code entry, created on first write. Local variables
//! live in whichever [`Domain`] is active.

use std::collections::HashMap;
use std::rc::Rc;

use luna_common::{LValue, Scope, VariableRef};

use crate::domain::Domain;

#[derive(Debug, Default)]
pub struct Scopes {
    globals: Domain,
    statics: HashMap<Rc<str>, Domain>,
}

impl Scopes {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn global(&self, name: &str) -> LValue {
        self.globals.get(name)
    }

    pub fn set_global(&mut self, name: impl Into<Rc<str>>, value: impl Into<LValue>) {
        self.globals.set(name, value);
    }

    /// Reads a static of `code`. Unset or never-written statics are `Undefined`.
    pub fn static_value(&self, code: &str, name: &str) -> LValue {
        self.statics
            .get(code)
            .map(|statics| statics.get(name))
            .unwrap_or_default()
    }

    pub fn set_static(&mut self, code: &Rc<str>, name: impl Into<Rc<str>>, value: LValue) {
        self.statics
            .entry(Rc::clone(code))
            .or_default()
            .set(name, value);
    }

    /// Reads `variable` as seen from code entry `code` running in `local`.
    pub fn read(&self, variable: &VariableRef, code: &str, local: &Domain) -> LValue {
        match variable.scope {
            Scope::Global => self.global(&variable.name),
            Scope::Static => self.static_value(code, &variable.name),
            Scope::Local => local.get(&variable.name),
        }
    }

    /// Writes `variable`, creating it if needed.
    pub fn write(&mut self, variable: &VariableRef, code: &Rc<str>, local: &mut Domain, value: LValue) {
        let name = Rc::clone(&variable.name);
        match variable.scope {
            Scope::Global => self.globals.set(name, value),
            Scope::Static => self.set_static(code, name, value),
            Scope::Local => local.set(name, value),
        }
    }
}
