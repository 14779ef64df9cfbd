//! GEN8: general information and the bytecode version.

use crate::chunk::Chunk;
use crate::error::LoadError;
use crate::game::{General, MIN_BYTECODE_VERSION};
use crate::load::LoadContext;

pub(crate) fn parse(ctx: &mut LoadContext<'_>, chunk: &Chunk) -> Result<(), LoadError> {
    let mut r = chunk.reader(ctx.data);
    let disable_debugger = r.u8()? != 0;
    let bytecode_version = r.u8()?;
    if bytecode_version < MIN_BYTECODE_VERSION {
        return Err(LoadError::UnsupportedBytecode {
            version: bytecode_version,
        });
    }
    r.skip(2);
    let filename = ctx.string(r.address()?)?;
    let config = ctx.string(r.address()?)?;
    let last_object = r.u32()?;
    let last_tile = r.u32()?;
    let game_id = r.u32()?;
    let mut guid = [0u8; 16];
    guid.copy_from_slice(r.bytes(16)?);
    let name = ctx.string(r.address()?)?;
    let version = (r.u32()?, r.u32()?, r.u32()?, r.u32()?);
    let window_width = r.u32()?;
    let window_height = r.u32()?;
    let info = r.u32()?;
    let license_crc = r.u32()?;
    let mut md5 = [0u8; 16];
    md5.copy_from_slice(r.bytes(16)?);
    let timestamp = r.u64()?;
    let display_name = ctx.string(r.address()?)?;
    let active_targets = r.u64()?;
    let function_classifications = r.u64()?;
    let steam_app_id = r.i32()?;
    let debugger_port = r.u32()?;
    let room_count = r.u32()?;
    let room_order = (0..room_count)
        .map(|_| -> Result<usize, LoadError> { Ok(r.u32()? as usize) })
        .collect::<Result<Vec<_>, _>>()?;

    ctx.game.general = General {
        disable_debugger,
        bytecode_version,
        filename,
        config,
        last_object,
        last_tile,
        game_id,
        guid,
        name,
        version,
        window_width,
        window_height,
        info,
        license_crc,
        md5,
        timestamp,
        display_name,
        active_targets,
        function_classifications,
        steam_app_id,
        debugger_port,
        room_order,
    };
    Ok(())
}
