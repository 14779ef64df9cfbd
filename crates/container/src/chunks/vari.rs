//! VARI: the variable table and its reference sites.

use crate::chunk::Chunk;
use crate::chunks::walk_sites;
use crate::error::LoadError;
use crate::game::Variable;
use crate::load::LoadContext;

const ENTRY_LEN: usize = 20;

pub(crate) fn parse(ctx: &mut LoadContext<'_>, chunk: &Chunk) -> Result<(), LoadError> {
    let mut r = chunk.reader(ctx.data);
    // instance_var_count, instance_var_count_max, max_local_var_count
    r.skip(12);
    while r.offset() + ENTRY_LEN <= chunk.end() {
        let name = ctx.required_string(r.address()?, "variable name")?;
        let instance_type = r.i32()?;
        let var_id = r.i32()?;
        let occurrences = r.u32()?;
        let first_address = r.i32()?;

        let index = ctx.game.variables.len();
        walk_sites(ctx.data, first_address, occurrences, index, &mut ctx.variable_sites)?;
        ctx.game.variables.push(Variable {
            name,
            instance_type,
            var_id,
            scope: Variable::scope_for(instance_type),
        });
    }
    Ok(())
}
