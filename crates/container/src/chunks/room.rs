//! ROOM: rooms, their views and placed instances.

use crate::chunk::Chunk;
use crate::chunks::optional_index;
use crate::error::LoadError;
use crate::game::{Room, RoomInstance, View};
use crate::load::LoadContext;
use crate::reader::ByteReader;

/// First bytecode version whose room instances carry pre-create code.
const PRE_CREATE_VERSION: u8 = 16;

pub(crate) fn parse(ctx: &mut LoadContext<'_>, chunk: &Chunk) -> Result<(), LoadError> {
    let mut reader = chunk.reader(ctx.data);
    for address in reader.pointer_list()? {
        let room = read_room(ctx, chunk, address)?;
        ctx.game.rooms.push(room);
    }
    Ok(())
}

fn read_room(ctx: &LoadContext<'_>, chunk: &Chunk, address: usize) -> Result<Room, LoadError> {
    let mut r = chunk.reader_at(ctx.data, address);
    let name = ctx.required_string(r.address()?, "room name")?;
    let caption = ctx.string(r.address()?)?;
    let width = r.u32()?;
    let height = r.u32()?;
    let speed = r.u32()?;
    let persistent = r.bool32()?;
    let colour = r.u32()?;
    let draw_colour = r.bool32()?;
    let creation_code = optional_index(r.i32()?);
    let flags = r.u32()?;
    let _backgrounds = r.address()?;
    let views = r.address()?;
    let objects = r.address()?;
    let _tiles = r.address()?;
    let world = r.bool32()?;
    let bounds = (r.u32()?, r.u32()?, r.u32()?, r.u32()?);
    let gravity = (r.f32()?, r.f32()?);
    let meters_per_pixel = r.f32()?;

    let views = ByteReader::at(ctx.data, views)
        .pointer_list()?
        .into_iter()
        .map(|view| read_view(ctx.data, view))
        .collect::<Result<Vec<_>, _>>()?;
    let with_pre_create = ctx.bytecode_version() >= PRE_CREATE_VERSION;
    let instances = ByteReader::at(ctx.data, objects)
        .pointer_list()?
        .into_iter()
        .map(|instance| read_instance(ctx.data, instance, with_pre_create))
        .collect::<Result<Vec<_>, _>>()?;

    Ok(Room {
        name,
        caption,
        width,
        height,
        speed,
        persistent,
        colour,
        draw_colour,
        creation_code,
        flags,
        views,
        instances,
        world,
        bounds,
        gravity,
        meters_per_pixel,
    })
}

fn read_view(data: &[u8], address: usize) -> Result<View, LoadError> {
    let mut r = ByteReader::at(data, address);
    Ok(View {
        enabled: r.bool32()?,
        view: (r.i32()?, r.i32()?, r.i32()?, r.i32()?),
        port: (r.i32()?, r.i32()?, r.i32()?, r.i32()?),
        border: (r.u32()?, r.u32()?),
        speed: (r.i32()?, r.i32()?),
        follow: r.i32()?,
    })
}

fn read_instance(data: &[u8], address: usize, with_pre_create: bool) -> Result<RoomInstance, LoadError> {
    let mut r = ByteReader::at(data, address);
    let x = r.i32()?;
    let y = r.i32()?;
    let object = r.i32()?;
    let object = usize::try_from(object)
        .map_err(|_| LoadError::unresolved("object", object))?;
    let instance_id = r.u32()?;
    let creation_code = optional_index(r.i32()?);
    let scale = (r.f32()?, r.f32()?);
    let colour = r.u32()?;
    let rotation = r.f32()?;
    let pre_create_code = if with_pre_create {
        optional_index(r.i32()?)
    } else {
        None
    };
    Ok(RoomInstance {
        x,
        y,
        object,
        instance_id,
        creation_code,
        scale,
        colour,
        rotation,
        pre_create_code,
    })
}
