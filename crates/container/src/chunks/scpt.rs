//! SCPT: script names and their code entries.

use crate::chunk::Chunk;
use crate::error::LoadError;
use crate::game::Script;
use crate::load::LoadContext;

const CONSTRUCTOR_FLAG: u32 = 0x8000_0000;

pub(crate) fn parse(ctx: &mut LoadContext<'_>, chunk: &Chunk) -> Result<(), LoadError> {
    let mut reader = chunk.reader(ctx.data);
    for address in reader.pointer_list()? {
        let mut r = chunk.reader_at(ctx.data, address);
        let name = ctx.required_string(r.address()?, "script name")?;
        let id = r.u32()?;
        ctx.game.scripts.push(Script {
            name,
            code: (id & !CONSTRUCTOR_FLAG) as usize,
            constructor: id & CONSTRUCTOR_FLAG != 0,
        });
    }
    Ok(())
}
