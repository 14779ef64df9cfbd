//! Decoded code segments.
//!
//! A program is the instruction list of one CODE entry together with the
//! byte offset every instruction was decoded from. Branches are resolved
//! from byte offsets to instruction indices when the program is built, so
//! the interpreter only ever jumps by index.

use std::rc::Rc;

use crate::error::DecodeError;
use crate::instruction::{Instruction, Word};

/// One decoded, branch-resolved code segment.
#[derive(Debug, Clone, PartialEq)]
pub struct Program {
    /// Name of the code entry (`gml_Script_foo`, `gml_Object_obj_Create_0`).
    pub name: Rc<str>,
    /// The instruction stream.
    pub instructions: Vec<Instruction>,
    /// Byte offset of each instruction inside the segment.
    pub offsets: Vec<usize>,
    /// Segment length in bytes.
    pub length: usize,
    /// Index of the first instruction to execute.
    pub entry: usize,
    /// Declared local variable count.
    pub locals: u16,
    /// Declared argument count.
    pub arguments: u16,
}

impl Program {
    /// Build a program from `(offset, instruction)` pairs in segment order.
    ///
    /// Every branch offset must either land on an instruction boundary or
    /// equal `length`, which means "fall off the end". The entry offset
    /// follows the same rule.
    pub fn new(
        name: impl Into<Rc<str>>,
        decoded: Vec<(usize, Instruction)>,
        length: usize,
        entry_offset: usize,
    ) -> Result<Self, DecodeError> {
        let (offsets, instructions): (Vec<usize>, Vec<Instruction>) = decoded.into_iter().unzip();
        let mut program = Self {
            name: name.into(),
            instructions,
            offsets,
            length,
            entry: 0,
            locals: 0,
            arguments: 0,
        };
        program.entry = program
            .index_of(entry_offset)
            .ok_or(DecodeError::InvalidEntry {
                offset: entry_offset,
            })?;
        program.resolve_branches()?;
        Ok(program)
    }

    /// Set the declared local and argument counts.
    pub fn with_frame(mut self, locals: u16, arguments: u16) -> Self {
        self.locals = locals;
        self.arguments = arguments;
        self
    }

    /// Instruction index for a byte offset. The segment length maps to
    /// `len()`, one past the last instruction.
    pub fn index_of(&self, offset: usize) -> Option<usize> {
        if offset == self.length {
            return Some(self.instructions.len());
        }
        self.offsets.binary_search(&offset).ok()
    }

    fn resolve_branches(&mut self) -> Result<(), DecodeError> {
        for i in 0..self.instructions.len() {
            let at = self.offsets[i];
            let resolved = match &self.instructions[i] {
                Instruction::Branch { offset, .. } => {
                    let offset = *offset;
                    let index = usize::try_from(offset)
                        .ok()
                        .and_then(|o| self.index_of(o))
                        .ok_or(DecodeError::InvalidBranchTarget { at, target: offset })?;
                    Some(index)
                }
                _ => None,
            };
            if let (Some(index), Instruction::Branch { target, .. }) =
                (resolved, &mut self.instructions[i])
            {
                *target = index;
            }
        }
        Ok(())
    }

    /// Number of instructions.
    pub fn len(&self) -> usize {
        self.instructions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.instructions.is_empty()
    }

    /// The instruction words in segment order.
    pub fn words(&self) -> impl Iterator<Item = Word> + '_ {
        self.instructions.iter().map(Instruction::word)
    }
}
