// Instance functions: create, destroy, count, inherit

use luna_common::LValue;

use super::{get_index, get_integer, get_number, truth, Entry};
use crate::domain::Domain;
use crate::error::RuntimeError;
use crate::session::Session;

pub(super) const FUNCTIONS: &[Entry] = &[
    ("event_inherited", event_inherited),
    ("instance_create_depth", instance_create_depth),
    ("instance_destroy", instance_destroy),
    ("instance_exists", instance_exists),
    ("instance_number", instance_number),
];

fn event_inherited(
    session: &mut Session,
    _domain: &mut Domain,
    _args: &[LValue],
    _argc: usize,
    _stack: &mut Vec<LValue>,
) -> Result<LValue, RuntimeError> {
    session.event_inherited()?;
    Ok(LValue::Undefined)
}

/// `instance_create_depth(x, y, depth, obj)` → new instance id.
fn instance_create_depth(
    session: &mut Session,
    _domain: &mut Domain,
    args: &[LValue],
    _argc: usize,
    _stack: &mut Vec<LValue>,
) -> Result<LValue, RuntimeError> {
    const NAME: &str = "instance_create_depth";
    let x = get_number(NAME, args, 0)?;
    let y = get_number(NAME, args, 1)?;
    let depth = get_number(NAME, args, 2)?;
    let raw = get_integer(NAME, args, 3)?;
    let object = usize::try_from(raw).map_err(|_| RuntimeError::UnknownObject { index: raw })?;
    let id = session.spawn_instance(x, y, depth, object)?;
    Ok(LValue::Real(f64::from(id)))
}

/// With no argument destroys the calling instance.
fn instance_destroy(
    session: &mut Session,
    domain: &mut Domain,
    args: &[LValue],
    _argc: usize,
    _stack: &mut Vec<LValue>,
) -> Result<LValue, RuntimeError> {
    let id = if args.is_empty() {
        domain
            .instance
            .ok_or_else(|| RuntimeError::invalid("instance_destroy", "no calling instance"))?
    } else {
        let target = get_integer("instance_destroy", args, 0)?;
        u32::try_from(target).map_err(|_| RuntimeError::UnknownInstance { id: target })?
    };
    session.destroy_instance(id)?;
    Ok(LValue::Undefined)
}

fn instance_exists(
    session: &mut Session,
    _domain: &mut Domain,
    args: &[LValue],
    _argc: usize,
    _stack: &mut Vec<LValue>,
) -> Result<LValue, RuntimeError> {
    let target = get_integer("instance_exists", args, 0)?;
    Ok(truth(session.instance_exists(target)))
}

fn instance_number(
    session: &mut Session,
    _domain: &mut Domain,
    args: &[LValue],
    _argc: usize,
    _stack: &mut Vec<LValue>,
) -> Result<LValue, RuntimeError> {
    let count = get_index("instance_number", args, 0)?
        .map_or(0, |object| session.instance_number(object));
    Ok(LValue::Real(count as f64))
}
