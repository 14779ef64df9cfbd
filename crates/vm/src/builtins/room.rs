// Room functions

use luna_common::LValue;

use super::{get_index, get_integer, truth, Entry};
use crate::domain::Domain;
use crate::error::RuntimeError;
use crate::session::Session;

pub(super) const FUNCTIONS: &[Entry] = &[
    ("room_goto", room_goto),
    ("room_get_name", room_get_name),
    ("room_get_viewport", room_get_viewport),
];

/// Takes effect at the end of the frame.
fn room_goto(
    session: &mut Session,
    _domain: &mut Domain,
    args: &[LValue],
    _argc: usize,
    _stack: &mut Vec<LValue>,
) -> Result<LValue, RuntimeError> {
    let index = get_integer("room_goto", args, 0)?;
    let room = usize::try_from(index).map_err(|_| RuntimeError::UnknownRoom { index })?;
    session.goto_room(room)?;
    Ok(LValue::Undefined)
}

fn room_get_name(
    session: &mut Session,
    _domain: &mut Domain,
    args: &[LValue],
    _argc: usize,
    _stack: &mut Vec<LValue>,
) -> Result<LValue, RuntimeError> {
    let room = get_index("room_get_name", args, 0)?.and_then(|i| session.game().rooms.get(i));
    Ok(room.map_or(LValue::Undefined, |room| LValue::from(room.name.clone())))
}

/// `room_get_viewport(room, view)` → `[visible, x, y, width, height]` of
/// the view's port.
fn room_get_viewport(
    session: &mut Session,
    _domain: &mut Domain,
    args: &[LValue],
    _argc: usize,
    _stack: &mut Vec<LValue>,
) -> Result<LValue, RuntimeError> {
    let room = get_index("room_get_viewport", args, 0)?;
    let view = get_index("room_get_viewport", args, 1)?;
    let found = room
        .and_then(|r| session.game().rooms.get(r))
        .zip(view)
        .and_then(|(room, v)| room.views.get(v));
    Ok(found.map_or(LValue::Undefined, |view| {
        let (x, y, width, height) = view.port;
        LValue::Array(vec![
            truth(view.enabled),
            LValue::Real(f64::from(x)),
            LValue::Real(f64::from(y)),
            LValue::Real(f64::from(width)),
            LValue::Real(f64::from(height)),
        ])
    }))
}
