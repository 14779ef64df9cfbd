// Object table queries
// Unknown objects give -1 for index-valued queries and 0 for flags.

use luna_common::LValue;
use luna_container::Object;

use super::{get_index, truth, Entry};
use crate::domain::Domain;
use crate::error::RuntimeError;
use crate::session::Session;

pub(super) const FUNCTIONS: &[Entry] = &[
    ("object_exists", object_exists),
    ("object_get_name", object_get_name),
    ("object_get_mask", object_get_mask),
    ("object_get_parent", object_get_parent),
    ("object_get_persistent", object_get_persistent),
    ("object_get_physics", object_get_physics),
    ("object_get_solid", object_get_solid),
    ("object_get_sprite", object_get_sprite),
    ("object_get_visible", object_get_visible),
    ("object_is_ancestor", object_is_ancestor),
];

fn lookup<'s>(
    function: &'static str,
    session: &'s Session,
    args: &[LValue],
) -> Result<Option<&'s Object>, RuntimeError> {
    Ok(get_index(function, args, 0)?.and_then(|i| session.game().objects.get(i)))
}

fn object_exists(
    session: &mut Session,
    _domain: &mut Domain,
    args: &[LValue],
    _argc: usize,
    _stack: &mut Vec<LValue>,
) -> Result<LValue, RuntimeError> {
    Ok(truth(lookup("object_exists", session, args)?.is_some()))
}

fn object_get_name(
    session: &mut Session,
    _domain: &mut Domain,
    args: &[LValue],
    _argc: usize,
    _stack: &mut Vec<LValue>,
) -> Result<LValue, RuntimeError> {
    Ok(lookup("object_get_name", session, args)?
        .map_or(LValue::Undefined, |o| LValue::from(o.name.clone())))
}

fn object_get_mask(
    session: &mut Session,
    _domain: &mut Domain,
    args: &[LValue],
    _argc: usize,
    _stack: &mut Vec<LValue>,
) -> Result<LValue, RuntimeError> {
    let mask = lookup("object_get_mask", session, args)?.map_or(-1, |o| o.mask);
    Ok(LValue::Real(f64::from(mask)))
}

fn object_get_parent(
    session: &mut Session,
    _domain: &mut Domain,
    args: &[LValue],
    _argc: usize,
    _stack: &mut Vec<LValue>,
) -> Result<LValue, RuntimeError> {
    let parent = lookup("object_get_parent", session, args)?
        .and_then(|o| o.parent)
        .map_or(-1.0, |p| p as f64);
    Ok(LValue::Real(parent))
}

fn object_get_persistent(
    session: &mut Session,
    _domain: &mut Domain,
    args: &[LValue],
    _argc: usize,
    _stack: &mut Vec<LValue>,
) -> Result<LValue, RuntimeError> {
    Ok(truth(lookup("object_get_persistent", session, args)?.is_some_and(|o| o.persistent)))
}

fn object_get_physics(
    session: &mut Session,
    _domain: &mut Domain,
    args: &[LValue],
    _argc: usize,
    _stack: &mut Vec<LValue>,
) -> Result<LValue, RuntimeError> {
    Ok(truth(lookup("object_get_physics", session, args)?.is_some_and(|o| o.physics.enabled)))
}

fn object_get_solid(
    session: &mut Session,
    _domain: &mut Domain,
    args: &[LValue],
    _argc: usize,
    _stack: &mut Vec<LValue>,
) -> Result<LValue, RuntimeError> {
    Ok(truth(lookup("object_get_solid", session, args)?.is_some_and(|o| o.solid)))
}

fn object_get_sprite(
    session: &mut Session,
    _domain: &mut Domain,
    args: &[LValue],
    _argc: usize,
    _stack: &mut Vec<LValue>,
) -> Result<LValue, RuntimeError> {
    let sprite = lookup("object_get_sprite", session, args)?.map_or(-1, |o| o.sprite);
    Ok(LValue::Real(f64::from(sprite)))
}

fn object_get_visible(
    session: &mut Session,
    _domain: &mut Domain,
    args: &[LValue],
    _argc: usize,
    _stack: &mut Vec<LValue>,
) -> Result<LValue, RuntimeError> {
    Ok(truth(lookup("object_get_visible", session, args)?.is_some_and(|o| o.visible)))
}

/// `object_is_ancestor(obj, parent)`; an object is not its own ancestor.
fn object_is_ancestor(
    session: &mut Session,
    _domain: &mut Domain,
    args: &[LValue],
    _argc: usize,
    _stack: &mut Vec<LValue>,
) -> Result<LValue, RuntimeError> {
    let object = get_index("object_is_ancestor", args, 0)?;
    let parent = get_index("object_is_ancestor", args, 1)?;
    let game = session.game();
    let result = match (object, parent) {
        (Some(o), Some(p)) if o < game.objects.len() && p < game.objects.len() => {
            game.is_ancestor(o, p)
        }
        _ => false,
    };
    Ok(truth(result))
}
