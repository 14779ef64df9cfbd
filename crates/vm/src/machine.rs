//! Interpreter state: operand stack, current frame, caller frames.

use std::mem;
use std::rc::Rc;

use luna_common::{LValue, Program, VariableRef};

use crate::domain::Domain;
use crate::error::RuntimeError;
use crate::session::Session;

/// Default limit on nested script frames.
pub const DEFAULT_MAX_CALL_DEPTH: usize = 4096;

/// One active code segment.
#[derive(Debug)]
pub struct Frame {
    pub program: Rc<Program>,
    /// Index of the next instruction.
    pub pc: usize,
    pub domain: Domain,
    /// Stack height when the frame started; pops may not go below it.
    pub stack_base: usize,
}

impl Frame {
    pub fn new(program: Rc<Program>, domain: Domain, stack_base: usize) -> Self {
        Self {
            pc: program.entry,
            program,
            domain,
            stack_base,
        }
    }
}

/// Executes one code segment, and every script it calls, against a session.
///
/// Script calls push a frame instead of recursing on the host stack. All
/// frames share one operand stack.
pub struct Machine<'s> {
    pub(crate) session: &'s mut Session,
    pub(crate) stack: Vec<LValue>,
    pub(crate) frame: Frame,
    pub(crate) callers: Vec<Frame>,
    pub(crate) max_depth: usize,
}

impl<'s> Machine<'s> {
    pub fn new(session: &'s mut Session, program: Rc<Program>, domain: Domain) -> Self {
        let max_depth = session.config().max_call_depth;
        Self {
            session,
            stack: Vec::new(),
            frame: Frame::new(program, domain, 0),
            callers: Vec::new(),
            max_depth,
        }
    }

    /// Number of live frames, the current one included.
    pub fn depth(&self) -> usize {
        self.callers.len() + 1
    }

    /// Gives back the domain the machine was started with, whether or not
    /// execution finished.
    pub fn into_domain(mut self) -> Domain {
        if self.callers.is_empty() {
            self.frame.domain
        } else {
            self.callers.swap_remove(0).domain
        }
    }

    pub(crate) fn push(&mut self, value: LValue) {
        self.stack.push(value);
    }

    pub(crate) fn pop(&mut self, at: usize) -> Result<LValue, RuntimeError> {
        if self.stack.len() > self.frame.stack_base {
            if let Some(value) = self.stack.pop() {
                return Ok(value);
            }
        }
        Err(RuntimeError::StackUnderflow { at })
    }

    /// Copies the top `count` values.
    pub(crate) fn duplicate(&mut self, at: usize, count: usize) -> Result<(), RuntimeError> {
        let len = self.stack.len();
        if len < self.frame.stack_base + count {
            return Err(RuntimeError::StackUnderflow { at });
        }
        self.stack.extend_from_within(len - count..);
        Ok(())
    }

    pub(crate) fn read(&self, variable: &VariableRef) -> LValue {
        self.session
            .scopes
            .read(variable, &self.frame.program.name, &self.frame.domain)
    }

    pub(crate) fn write(&mut self, variable: &VariableRef, value: LValue) {
        self.session.scopes.write(
            variable,
            &self.frame.program.name,
            &mut self.frame.domain,
            value,
        );
    }

    /// Starts a script frame.
    pub(crate) fn enter(&mut self, at: usize, program: Rc<Program>, args: Vec<LValue>) -> Result<(), RuntimeError> {
        if self.depth() >= self.max_depth {
            return Err(RuntimeError::CallDepthExceeded {
                at,
                limit: self.max_depth,
            });
        }
        let mut domain = Domain::for_instance(self.frame.domain.instance);
        for (i, arg) in args.iter().enumerate() {
            domain.set(format!("argument{i}"), arg.clone());
        }
        domain.set("argument_count", args.len() as f64);
        domain.set("argument", LValue::Array(args));
        let frame = Frame::new(program, domain, self.stack.len());
        self.callers.push(mem::replace(&mut self.frame, frame));
        Ok(())
    }

    /// Ends the current frame with `value`. Returns the value when the
    /// outermost frame ends; otherwise pushes it for the caller.
    pub(crate) fn finish(&mut self, value: LValue) -> Option<LValue> {
        let Some(caller) = self.callers.pop() else {
            return Some(value);
        };
        let done = mem::replace(&mut self.frame, caller);
        self.stack.truncate(done.stack_base);
        self.stack.push(value);
        None
    }
}
