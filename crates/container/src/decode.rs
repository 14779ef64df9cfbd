//! Instruction decoder.
//!
//! Turns the bytecode of one code entry into a [`Program`]. Operands are
//! resolved here: string indices become text, variable and function
//! operands become names through the site tables, branch displacements
//! become byte offsets and then instruction indices.
//!
//! Variable and function sites are keyed by the address of the instruction
//! word, which is where VARI and FUNC reference chains point; the operand
//! that follows the word carries the distance to the next site.

use std::collections::HashMap;
use std::rc::Rc;

use luna_common::{
    BinaryOp, BranchCondition, Comparison, DataType, DecodeError, Instruction, LValue, Opcode,
    Program, PushKind, PushOperand, Scope, UnaryOp, VariableRef, Word,
};

use crate::error::LoadError;
use crate::game::{CodeEntry, Function, Variable};
use crate::load::LoadContext;
use crate::reader::ByteReader;

/// Read-only view of the tables the decoder resolves against.
pub(crate) struct Decoder<'a> {
    data: &'a [u8],
    strings: &'a [Rc<str>],
    variables: &'a [Variable],
    functions: &'a [Function],
    variable_sites: &'a HashMap<usize, usize>,
    function_sites: &'a HashMap<usize, usize>,
}

/// Failure while decoding one instruction, before it is tagged with the
/// code entry name.
enum Failure {
    Decode(DecodeError),
    Load(LoadError),
}

impl From<DecodeError> for Failure {
    fn from(e: DecodeError) -> Self {
        Failure::Decode(e)
    }
}

impl From<LoadError> for Failure {
    fn from(e: LoadError) -> Self {
        Failure::Load(e)
    }
}

impl<'a> Decoder<'a> {
    pub fn new(ctx: &'a LoadContext<'a>) -> Self {
        Self {
            data: ctx.data,
            strings: &ctx.game.strings,
            variables: &ctx.game.variables,
            functions: &ctx.game.functions,
            variable_sites: &ctx.variable_sites,
            function_sites: &ctx.function_sites,
        }
    }

    /// Decode a code entry into a branch-resolved program.
    pub fn decode(&self, entry: &CodeEntry) -> Result<Program, LoadError> {
        let tag = |source: DecodeError| LoadError::Decode {
            code: entry.name.to_string(),
            source,
        };
        let segment = &self.data[entry.address..entry.address + entry.length];
        let mut cursor = Cursor {
            reader: ByteReader::new(segment),
            at: 0,
        };

        let mut decoded = Vec::new();
        while cursor.reader.offset() < segment.len() {
            let at = cursor.reader.offset();
            cursor.at = at;
            let instr = match self.instruction(&mut cursor, entry.address + at) {
                Ok(instr) => instr,
                Err(Failure::Decode(e)) => return Err(tag(e)),
                Err(Failure::Load(e)) => return Err(e),
            };
            decoded.push((at, instr));
        }

        Program::new(Rc::clone(&entry.name), decoded, entry.length, entry.offset)
            .map(|p| p.with_frame(entry.locals, entry.arguments))
            .map_err(tag)
    }

    fn instruction(&self, cursor: &mut Cursor<'_>, address: usize) -> Result<Instruction, Failure> {
        let word = Word::from_raw(cursor.u32()?);
        let Ok(opcode) = Opcode::try_from(word.opcode) else {
            return Ok(Instruction::Unknown { word });
        };
        let at = cursor.at;

        let instr = match opcode {
            Opcode::Conv => Instruction::Convert {
                word,
                from: data_type(at, word.first_type())?,
                to: data_type(at, word.second_type())?,
            },
            Opcode::Mul => binary(word, BinaryOp::Mul),
            Opcode::Div => binary(word, BinaryOp::Div),
            Opcode::Rem => binary(word, BinaryOp::Rem),
            Opcode::Mod => binary(word, BinaryOp::Mod),
            Opcode::Add => binary(word, BinaryOp::Add),
            Opcode::Sub => binary(word, BinaryOp::Sub),
            Opcode::And => binary(word, BinaryOp::And),
            Opcode::Or => binary(word, BinaryOp::Or),
            Opcode::Xor => binary(word, BinaryOp::Xor),
            Opcode::Shl => binary(word, BinaryOp::Shl),
            Opcode::Shr => binary(word, BinaryOp::Shr),
            Opcode::Neg => Instruction::Unary {
                word,
                op: UnaryOp::Neg,
            },
            Opcode::Not => Instruction::Unary {
                word,
                op: UnaryOp::Not,
            },
            Opcode::Cmp => {
                let value = ((word.immediate >> 8) & 0xFF) as u8;
                let comparison = Comparison::try_from(value)
                    .map_err(|value| DecodeError::UnknownComparison { at, value })?;
                Instruction::Compare { word, comparison }
            }
            Opcode::Pop => match data_type(at, word.first_type())? {
                DataType::Variable => {
                    cursor.u32()?;
                    Instruction::Pop {
                        word,
                        variable: self.variable(address, None)?,
                    }
                }
                // Swap form: no operand, rejected at run time.
                DataType::Int16 => Instruction::Unsupported {
                    word,
                    operand: None,
                },
                other => return Err(unsupported(at, word, other).into()),
            },
            Opcode::PushI => Instruction::PushImmediate {
                word,
                value: LValue::Int32(word.immediate as i32),
            },
            Opcode::Dup => {
                if (word.immediate >> 8) & 0xFF != 0 {
                    Instruction::Unsupported {
                        word,
                        operand: None,
                    }
                } else {
                    Instruction::Duplicate {
                        word,
                        count: (word.immediate & 0xFF) as usize + 1,
                    }
                }
            }
            Opcode::Ret => Instruction::Return { word },
            Opcode::Exit => Instruction::Exit { word },
            Opcode::PopZ => Instruction::PopDiscard { word },
            Opcode::B | Opcode::Bt | Opcode::Bf => Instruction::Branch {
                word,
                condition: match opcode {
                    Opcode::Bt => BranchCondition::IfTrue,
                    Opcode::Bf => BranchCondition::IfFalse,
                    _ => BranchCondition::Always,
                },
                offset: at as i64 + word.branch_displacement() as i64,
                target: 0,
            },
            Opcode::CallV | Opcode::PushEnv | Opcode::PopEnv => Instruction::Unsupported {
                word,
                operand: None,
            },
            Opcode::Push => self.push(cursor, word, PushKind::Plain, address)?,
            Opcode::PushLoc => self.push(cursor, word, PushKind::Local, address)?,
            Opcode::PushGlb => self.push(cursor, word, PushKind::Global, address)?,
            Opcode::PushBltn => self.push(cursor, word, PushKind::Builtin, address)?,
            Opcode::Call => {
                cursor.u32()?;
                let index = *self
                    .function_sites
                    .get(&address)
                    .ok_or_else(|| LoadError::unresolved("function site", address as i64))?;
                Instruction::Call {
                    word,
                    function: Rc::clone(&self.functions[index].name),
                    argc: word.immediate as u16 as usize,
                }
            }
            Opcode::Break => {
                let operand = if word.first_type() == DataType::Int32 as u8 {
                    Some(cursor.u32()?)
                } else {
                    None
                };
                Instruction::Unsupported { word, operand }
            }
        };
        Ok(instr)
    }

    fn push(
        &self,
        cursor: &mut Cursor<'_>,
        word: Word,
        kind: PushKind,
        address: usize,
    ) -> Result<Instruction, Failure> {
        let at = cursor.at;
        let operand = match data_type(at, word.first_type())? {
            DataType::Int16 => PushOperand::Value(LValue::Int32(word.immediate as i32)),
            DataType::Double => PushOperand::Value(LValue::Real(f64::from_bits(cursor.u64()?))),
            DataType::Float => {
                PushOperand::Value(LValue::Real(f32::from_bits(cursor.u32()?) as f64))
            }
            DataType::Int32 => PushOperand::Value(LValue::Int32(cursor.u32()? as i32)),
            DataType::Int64 => PushOperand::Value(LValue::Int64(cursor.u64()? as i64)),
            DataType::Bool => PushOperand::Value(LValue::Bool(cursor.u32()? != 0)),
            DataType::String => {
                let index = cursor.u32()?;
                let text = self
                    .strings
                    .get(index as usize)
                    .ok_or_else(|| LoadError::unresolved("string", index))?;
                PushOperand::Value(LValue::String(Rc::clone(text)))
            }
            DataType::Variable => {
                cursor.u32()?;
                let forced = match kind {
                    PushKind::Local => Some(Scope::Local),
                    PushKind::Global => Some(Scope::Global),
                    PushKind::Plain | PushKind::Builtin => None,
                };
                PushOperand::Variable(self.variable(address, forced)?)
            }
            other => return Err(unsupported(at, word, other).into()),
        };
        Ok(Instruction::Push {
            word,
            kind,
            operand,
        })
    }

    fn variable(&self, address: usize, forced: Option<Scope>) -> Result<VariableRef, LoadError> {
        let index = *self
            .variable_sites
            .get(&address)
            .ok_or_else(|| LoadError::unresolved("variable site", address as i64))?;
        let variable = &self.variables[index];
        Ok(VariableRef {
            name: Rc::clone(&variable.name),
            scope: forced.unwrap_or(variable.scope),
            index,
        })
    }
}

/// Segment reader that reports overruns as truncation of the current
/// instruction.
struct Cursor<'a> {
    reader: ByteReader<'a>,
    /// Offset of the instruction being decoded.
    at: usize,
}

impl Cursor<'_> {
    fn u32(&mut self) -> Result<u32, DecodeError> {
        let at = self.at;
        self.reader.u32().map_err(|_| DecodeError::Truncated { at })
    }

    fn u64(&mut self) -> Result<u64, DecodeError> {
        let at = self.at;
        self.reader.u64().map_err(|_| DecodeError::Truncated { at })
    }
}

fn binary(word: Word, op: BinaryOp) -> Instruction {
    Instruction::Binary { word, op }
}

fn data_type(at: usize, nibble: u8) -> Result<DataType, DecodeError> {
    DataType::try_from(nibble).map_err(|value| DecodeError::UnknownDataType { at, value })
}

fn unsupported(at: usize, word: Word, data_type: DataType) -> DecodeError {
    DecodeError::UnsupportedOperand {
        at,
        opcode: word.opcode,
        data_type: data_type.name(),
    }
}
