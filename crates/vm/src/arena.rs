//! Handle arenas for data structures created by bytecode.
//!
//! Bytecode only ever sees a numeric handle; the session owns the data.
//! Freed handles are reused lowest first.

#[derive(Debug, Clone)]
pub struct Arena<T> {
    slots: Vec<Option<T>>,
    free: Vec<usize>,
}

impl<T> Default for Arena<T> {
    fn default() -> Self {
        Self {
            slots: Vec::new(),
            free: Vec::new(),
        }
    }
}

impl<T> Arena<T> {
    pub fn new() -> Self {
        Self::default()
    }

    /// Stores a value and returns its handle.
    pub fn insert(&mut self, value: T) -> usize {
        self.free.sort_unstable_by(|a, b| b.cmp(a));
        match self.free.pop() {
            Some(handle) => {
                self.slots[handle] = Some(value);
                handle
            }
            None => {
                self.slots.push(Some(value));
                self.slots.len() - 1
            }
        }
    }

    pub fn get(&self, handle: usize) -> Option<&T> {
        self.slots.get(handle)?.as_ref()
    }

    pub fn get_mut(&mut self, handle: usize) -> Option<&mut T> {
        self.slots.get_mut(handle)?.as_mut()
    }

    pub fn remove(&mut self, handle: usize) -> Option<T> {
        let value = self.slots.get_mut(handle)?.take()?;
        self.free.push(handle);
        Some(value)
    }

    /// Number of live values.
    pub fn len(&self) -> usize {
        self.slots.len() - self.free.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
