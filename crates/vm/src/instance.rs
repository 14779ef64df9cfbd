//! Live object instances.

use luna_common::LValue;

use crate::domain::Domain;

#[derive(Debug)]
pub struct Instance {
    pub id: u32,
    /// Index into the object table.
    pub object: usize,
    /// Survives room changes.
    pub persistent: bool,
    pub domain: Domain,
}

impl Instance {
    /// A fresh instance with its built-in variables set.
    pub fn new(id: u32, object: usize, persistent: bool, x: f64, y: f64, depth: f64) -> Self {
        let mut domain = Domain::for_instance(Some(id));
        domain.set("x", x);
        domain.set("y", y);
        domain.set("depth", depth);
        domain.set("object_index", object as f64);
        domain.set("id", f64::from(id));
        Self {
            id,
            object,
            persistent,
            domain,
        }
    }

    pub fn get(&self, name: &str) -> LValue {
        self.domain.get(name)
    }
}
