//! Fetch-execute loop and instruction dispatch.

use std::rc::Rc;

use luna_common::{
    BinaryOp, BranchCondition, Comparison, Instruction, LValue, Opcode, PushKind, PushOperand,
    UnaryOp, VariableRef,
};
use tracing::warn;

use crate::error::RuntimeError;
use crate::machine::Machine;

impl Machine<'_> {
    /// Runs until the outermost frame returns or exits.
    pub fn execute(&mut self) -> Result<LValue, RuntimeError> {
        loop {
            let program = Rc::clone(&self.frame.program);
            let Some(instr) = program.instructions.get(self.frame.pc) else {
                // Ran off the end, or branched to it.
                match self.finish(LValue::Undefined) {
                    Some(value) => return Ok(value),
                    None => continue,
                }
            };
            let at = program.offsets[self.frame.pc];
            self.frame.pc += 1;

            match instr {
                Instruction::PushImmediate { value, .. } => self.push(value.clone()),
                Instruction::Push { kind, operand, .. } => self.exec_push(*kind, operand),
                Instruction::Pop { variable, .. } => {
                    let value = self.pop(at)?;
                    self.write(variable, value);
                }
                Instruction::PopDiscard { .. } => {
                    self.pop(at)?;
                }
                Instruction::Duplicate { count, .. } => self.duplicate(at, *count)?,
                Instruction::Convert { to, .. } => {
                    let value = self.pop(at)?;
                    let converted = value
                        .convert(*to)
                        .map_err(|source| RuntimeError::TypeMismatch { at, source })?;
                    self.push(converted);
                }
                Instruction::Binary { op, .. } => self.exec_binary(at, *op)?,
                Instruction::Unary { op, .. } => self.exec_unary(at, *op)?,
                Instruction::Compare { comparison, .. } => self.exec_compare(at, *comparison)?,
                Instruction::Branch {
                    condition, target, ..
                } => self.exec_branch(at, *condition, *target)?,
                Instruction::Call { function, argc, .. } => self.exec_call(at, function, *argc)?,
                Instruction::Return { .. } => {
                    let value = self.pop(at)?;
                    if let Some(value) = self.finish(value) {
                        return Ok(value);
                    }
                }
                Instruction::Exit { .. } => {
                    if let Some(value) = self.finish(LValue::Undefined) {
                        return Ok(value);
                    }
                }
                Instruction::Unsupported { word, .. } => {
                    warn!(
                        code = %program.name,
                        offset = at,
                        mnemonic = Opcode::try_from(word.opcode).map_or("?", Opcode::mnemonic),
                        "skipping unsupported instruction"
                    );
                }
                Instruction::Unknown { word } => {
                    warn!(
                        code = %program.name,
                        offset = at,
                        word = word.raw(),
                        "skipping unknown opcode"
                    );
                }
            }
        }
    }

    fn exec_push(&mut self, kind: PushKind, operand: &PushOperand) {
        let value = match operand {
            PushOperand::Value(value) => value.clone(),
            PushOperand::Variable(variable) if kind == PushKind::Builtin => self.builtin(variable),
            PushOperand::Variable(variable) => self.read(variable),
        };
        self.push(value);
    }

    /// Built-in variables computed by the session; anything else reads
    /// through the normal scopes.
    fn builtin(&self, variable: &VariableRef) -> LValue {
        match &*variable.name {
            "current_time" => LValue::Real(self.session.elapsed_ms()),
            "room" => LValue::Real(self.session.room().map_or(-1.0, |room| room as f64)),
            _ => self.read(variable),
        }
    }

    fn exec_binary(&mut self, at: usize, op: BinaryOp) -> Result<(), RuntimeError> {
        let rhs = self.pop(at)?;
        let lhs = self.pop(at)?;
        let result = op
            .apply(&lhs, &rhs)
            .map_err(|source| RuntimeError::TypeMismatch { at, source })?;
        self.push(result);
        Ok(())
    }

    fn exec_unary(&mut self, at: usize, op: UnaryOp) -> Result<(), RuntimeError> {
        let value = self.pop(at)?;
        let result = match op {
            UnaryOp::Neg => value.neg(),
            UnaryOp::Not => value.not(),
        }
        .map_err(|source| RuntimeError::TypeMismatch { at, source })?;
        self.push(result);
        Ok(())
    }

    fn exec_compare(&mut self, at: usize, comparison: Comparison) -> Result<(), RuntimeError> {
        let rhs = self.pop(at)?;
        let lhs = self.pop(at)?;
        let truth = if lhs.compare(comparison, &rhs) { 1.0 } else { 0.0 };
        self.push(LValue::Real(truth));
        Ok(())
    }

    fn exec_branch(
        &mut self,
        at: usize,
        condition: BranchCondition,
        target: usize,
    ) -> Result<(), RuntimeError> {
        let taken = match condition {
            BranchCondition::Always => true,
            BranchCondition::IfTrue => self.pop(at)?.as_number() == Some(1.0),
            BranchCondition::IfFalse => self.pop(at)?.as_number() == Some(0.0),
        };
        if taken {
            self.frame.pc = target;
        }
        Ok(())
    }

    /// Natives first, then scripts.
    fn exec_call(&mut self, at: usize, function: &Rc<str>, argc: usize) -> Result<(), RuntimeError> {
        let mut args = Vec::with_capacity(argc);
        for _ in 0..argc {
            args.push(self.pop(at)?);
        }

        if let Some(native) = self.session.natives.get(function) {
            let result = native(
                self.session,
                &mut self.frame.domain,
                &args,
                argc,
                &mut self.stack,
            )?;
            self.push(result);
            return Ok(());
        }

        match self.session.script_program(function) {
            Some(program) => self.enter(at, program, args),
            None => Err(RuntimeError::UnknownFunction {
                at,
                name: function.to_string(),
            }),
        }
    }
}
