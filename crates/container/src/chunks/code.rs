//! CODE: code entries and their bytecode.

use std::rc::Rc;

use tracing::debug;

use crate::chunk::Chunk;
use crate::decode::Decoder;
use crate::error::LoadError;
use crate::game::CodeEntry;
use crate::load::LoadContext;

const ARGUMENT_COUNT_MASK: u16 = 0x7FFF;

pub(crate) fn parse(ctx: &mut LoadContext<'_>, chunk: &Chunk) -> Result<(), LoadError> {
    // Compiled-to-native games ship an empty CODE chunk.
    if chunk.length == 0 {
        return Ok(());
    }
    let mut reader = chunk.reader(ctx.data);
    for address in reader.pointer_list()? {
        let entry = read_entry(ctx, chunk, address)?;
        let program = Decoder::new(ctx).decode(&entry)?;
        debug!(
            code = %entry.name,
            length = entry.length,
            instructions = program.len(),
            "decoded code entry"
        );
        ctx.game.code.push(entry);
        ctx.game.programs.push(Rc::new(program));
    }
    Ok(())
}

fn read_entry(ctx: &LoadContext<'_>, chunk: &Chunk, address: usize) -> Result<CodeEntry, LoadError> {
    let mut r = chunk.reader_at(ctx.data, address);
    let name = ctx.required_string(r.address()?, "code name")?;
    let length = r.u32()? as usize;
    let locals = r.u16()?;
    let arguments = r.u16()? & ARGUMENT_COUNT_MASK;
    let base = r.offset();
    let relative = r.i32()?;
    let offset = r.u32()? as usize;

    let blob = base as i64 + relative as i64;
    if blob < 0 || blob as u64 + length as u64 > ctx.data.len() as u64 {
        return Err(LoadError::malformed(
            base,
            format!("bytecode of {name} lies outside the container"),
        ));
    }
    Ok(CodeEntry {
        name,
        address: blob as usize,
        length,
        offset,
        locals,
        arguments,
    })
}
