//! STRG: the string table.

use crate::chunk::Chunk;
use crate::error::LoadError;
use crate::load::LoadContext;

/// Entries point at the length field; everything else in the container
/// points at the character data four bytes later.
pub(crate) fn parse(ctx: &mut LoadContext<'_>, chunk: &Chunk) -> Result<(), LoadError> {
    let mut reader = chunk.reader(ctx.data);
    for address in reader.pointer_list()? {
        let text = reader.string_at(address + 4)?;
        ctx.string_addresses.insert(address + 4, ctx.game.strings.len());
        ctx.game.strings.push(text);
    }
    Ok(())
}
