//! FUNC: the function table, its reference sites, and per-code local names.

use crate::chunk::Chunk;
use crate::chunks::walk_sites;
use crate::error::LoadError;
use crate::game::{CodeLocals, Function};
use crate::load::LoadContext;

pub(crate) fn parse(ctx: &mut LoadContext<'_>, chunk: &Chunk) -> Result<(), LoadError> {
    let mut r = chunk.reader(ctx.data);
    let count = r.u32()?;
    for _ in 0..count {
        let name = ctx.required_string(r.address()?, "function name")?;
        let occurrences = r.u32()?;
        let first_address = r.i32()?;

        let index = ctx.game.functions.len();
        walk_sites(ctx.data, first_address, occurrences, index, &mut ctx.function_sites)?;
        ctx.game.functions.push(Function { name });
    }

    if r.offset() >= chunk.end() {
        return Ok(());
    }
    let count = r.u32()?;
    for _ in 0..count {
        let local_count = r.u32()?;
        let code = ctx.required_string(r.address()?, "code name")?;
        let mut locals = Vec::new();
        for _ in 0..local_count {
            let index = r.u32()?;
            locals.push((index, ctx.required_string(r.address()?, "local name")?));
        }
        ctx.game.code_locals.push(CodeLocals { code, locals });
    }
    Ok(())
}
