//! Local variable storage.
//!
//! A domain is the variable map of one instance or one script call. It
//! remembers the instance it belongs to, if any. An instance's map is
//! reached through handles made with [`Domain::share`], so every event and
//! every frame acting on the instance writes to the same variables.

use std::cell::RefCell;
use std::collections::HashMap;
use std::rc::Rc;

use luna_common::LValue;

/// Instance ids start here and only grow.
pub const FIRST_INSTANCE_ID: u32 = 100_001;

#[derive(Debug, Default)]
pub struct Domain {
    vars: Rc<RefCell<HashMap<Rc<str>, LValue>>>,
    /// Owning instance.
    pub instance: Option<u32>,
}

impl Domain {
    pub fn new() -> Self {
        Self::default()
    }

    /// A fresh domain that acts for `instance`.
    pub fn for_instance(instance: Option<u32>) -> Self {
        Self {
            vars: Rc::default(),
            instance,
        }
    }

    /// Another handle on the same variables.
    pub fn share(&self) -> Self {
        Self {
            vars: Rc::clone(&self.vars),
            instance: self.instance,
        }
    }

    /// True when both handles reach the same variables.
    pub fn same_storage(&self, other: &Domain) -> bool {
        Rc::ptr_eq(&self.vars, &other.vars)
    }

    /// Reads a variable. Unset variables are `Undefined`.
    pub fn get(&self, name: &str) -> LValue {
        self.vars.borrow().get(name).cloned().unwrap_or_default()
    }

    pub fn set(&mut self, name: impl Into<Rc<str>>, value: impl Into<LValue>) {
        self.vars.borrow_mut().insert(name.into(), value.into());
    }

    pub fn contains(&self, name: &str) -> bool {
        self.vars.borrow().contains_key(name)
    }

    pub fn len(&self) -> usize {
        self.vars.borrow().len()
    }

    pub fn is_empty(&self) -> bool {
        self.vars.borrow().is_empty()
    }

    /// Numeric view of a variable, or `0.0`.
    pub fn number(&self, name: &str) -> f64 {
        self.vars.borrow().get(name).map_or(0.0, LValue::number_or_zero)
    }
}
