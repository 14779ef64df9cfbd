//! Disassembler: decoded program → listing text.
//!
//! One instruction per line, prefixed with its byte offset. Mnemonics carry
//! their data type suffixes the way the argument byte encodes them
//! (`push.v`, `pop.v.i`, `conv.i.d`).

use std::fmt::Write as _;

use luna_common::{
    DataType, Instruction, LValue, Opcode, Program, PushOperand, Word,
};

/// Disassemble a program into listing text.
pub fn disassemble(program: &Program) -> String {
    let mut out = String::new();
    for (i, instr) in program.instructions.iter().enumerate() {
        let marker = if i == program.entry { ">" } else { " " };
        // Writing to a String cannot fail.
        let _ = writeln!(out, "{marker}{:06x}  {}", program.offsets[i], format_instruction(instr));
    }
    out
}

/// Format one instruction without its offset.
pub fn format_instruction(instr: &Instruction) -> String {
    let word = instr.word();
    let mnemonic = Opcode::try_from(word.opcode).map_or("?", Opcode::mnemonic);
    match instr {
        Instruction::PushImmediate { value, .. } => format!("pushi.e {value}"),
        Instruction::Push { operand, .. } => {
            format!("{mnemonic}.{} {}", suffix(word.first_type()), operand_text(operand))
        }
        Instruction::Pop { variable, .. } => format!("{}{variable}", typed2(mnemonic, word)),
        Instruction::PopDiscard { .. } | Instruction::Return { .. } | Instruction::Exit { .. } => {
            format!("{mnemonic}.{}", suffix(word.first_type()))
        }
        Instruction::Duplicate { count, .. } => {
            format!("{mnemonic}.{} {}", suffix(word.first_type()), count - 1)
        }
        Instruction::Convert { .. } | Instruction::Binary { .. } => typed2(mnemonic, word).trim_end().to_string(),
        Instruction::Unary { .. } => format!("{mnemonic}.{}", suffix(word.first_type())),
        Instruction::Compare { comparison, .. } => {
            format!("{}{}", typed2(mnemonic, word), comparison.mnemonic())
        }
        Instruction::Branch { offset, target, .. } => format!("{mnemonic} {offset:#x} ; [{target}]"),
        Instruction::Call { function, argc, .. } => format!("{mnemonic}.i {function}(argc={argc})"),
        Instruction::Unsupported { operand, .. } => match operand {
            Some(operand) => format!("{mnemonic} {operand:#x} ; unsupported"),
            None => format!("{mnemonic} ; unsupported"),
        },
        Instruction::Unknown { word } => format!(".word {:#010x}", word.raw()),
    }
}

/// `op.t1.t2 ` with a trailing space for an operand.
fn typed2(mnemonic: &str, word: Word) -> String {
    format!(
        "{mnemonic}.{}.{} ",
        suffix(word.first_type()),
        suffix(word.second_type())
    )
}

fn suffix(nibble: u8) -> &'static str {
    DataType::try_from(nibble).map_or("?", DataType::suffix)
}

fn operand_text(operand: &PushOperand) -> String {
    match operand {
        PushOperand::Value(LValue::String(text)) => format!("{text:?}"),
        PushOperand::Value(value) => value.to_string(),
        PushOperand::Variable(variable) => variable.to_string(),
    }
}
