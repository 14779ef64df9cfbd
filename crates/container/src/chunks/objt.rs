//! OBJT: object definitions, physics properties and event handlers.

use crate::chunk::Chunk;
use crate::chunks::optional_index;
use crate::error::LoadError;
use crate::game::{Event, Object, Physics};
use crate::load::LoadContext;
use crate::reader::ByteReader;

/// Each action is 14 u32 fields; the code id is the ninth.
const ACTION_CODE_FIELD: usize = 8;

pub(crate) fn parse(ctx: &mut LoadContext<'_>, chunk: &Chunk) -> Result<(), LoadError> {
    let mut reader = chunk.reader(ctx.data);
    for address in reader.pointer_list()? {
        let object = read_object(ctx, chunk, address)?;
        ctx.game.objects.push(object);
    }
    Ok(())
}

fn read_object(ctx: &LoadContext<'_>, chunk: &Chunk, address: usize) -> Result<Object, LoadError> {
    let mut r = chunk.reader_at(ctx.data, address);
    let name = ctx.required_string(r.address()?, "object name")?;
    let sprite = r.i32()?;
    let visible = r.bool32()?;
    let solid = r.bool32()?;
    let depth = r.i32()?;
    let persistent = r.bool32()?;
    let parent = optional_index(r.i32()?);
    let mask = r.i32()?;

    let enabled = r.bool32()?;
    let sensor = r.bool32()?;
    let shape = r.u32()?;
    let density = r.f32()?;
    let restitution = r.f32()?;
    let group = r.u32()?;
    let linear_damping = r.f32()?;
    let angular_damping = r.f32()?;
    let vertex_count = r.i32()?;
    let friction = r.f32()?;
    let awake = r.bool32()?;
    let kinematic = r.bool32()?;
    let vertices = (0..vertex_count.max(0))
        .map(|_| -> Result<(f32, f32), LoadError> { Ok((r.f32()?, r.f32()?)) })
        .collect::<Result<Vec<_>, _>>()?;

    let events = r
        .pointer_list()?
        .into_iter()
        .map(|list| read_event_list(ctx.data, list))
        .collect::<Result<Vec<_>, _>>()?;

    Ok(Object {
        name,
        sprite,
        visible,
        solid,
        depth,
        persistent,
        parent,
        mask,
        physics: Physics {
            enabled,
            sensor,
            shape,
            density,
            restitution,
            group,
            linear_damping,
            angular_damping,
            friction,
            awake,
            kinematic,
            vertices,
        },
        events,
    })
}

fn read_event_list(data: &[u8], address: usize) -> Result<Vec<Event>, LoadError> {
    ByteReader::at(data, address)
        .pointer_list()?
        .into_iter()
        .map(|event| -> Result<Event, LoadError> {
            let mut r = ByteReader::at(data, event);
            let subtype = r.u32()?;
            let actions = r
                .pointer_list()?
                .into_iter()
                .map(|action| -> Result<usize, LoadError> {
                    let mut r = ByteReader::at(data, action + ACTION_CODE_FIELD * 4);
                    Ok(r.u32()? as usize)
                })
                .collect::<Result<Vec<_>, _>>()?;
            Ok(Event { subtype, actions })
        })
        .collect()
}
