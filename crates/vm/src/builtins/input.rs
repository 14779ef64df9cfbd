// Keyboard polling through the platform

use luna_common::LValue;

use super::{get_integer, truth, Entry};
use crate::domain::Domain;
use crate::error::RuntimeError;
use crate::session::Session;

pub(super) const FUNCTIONS: &[Entry] = &[
    ("keyboard_check", keyboard_check),
    ("keyboard_check_pressed", keyboard_check_pressed),
    ("keyboard_check_released", keyboard_check_released),
];

fn keyboard_check(
    session: &mut Session,
    _domain: &mut Domain,
    args: &[LValue],
    _argc: usize,
    _stack: &mut Vec<LValue>,
) -> Result<LValue, RuntimeError> {
    let key = get_integer("keyboard_check", args, 0)?;
    Ok(truth(session.platform.key_down(key)))
}

fn keyboard_check_pressed(
    session: &mut Session,
    _domain: &mut Domain,
    args: &[LValue],
    _argc: usize,
    _stack: &mut Vec<LValue>,
) -> Result<LValue, RuntimeError> {
    let key = get_integer("keyboard_check_pressed", args, 0)?;
    Ok(truth(session.platform.key_pressed(key)))
}

fn keyboard_check_released(
    session: &mut Session,
    _domain: &mut Domain,
    args: &[LValue],
    _argc: usize,
    _stack: &mut Vec<LValue>,
) -> Result<LValue, RuntimeError> {
    let key = get_integer("keyboard_check_released", args, 0)?;
    Ok(truth(session.platform.key_released(key)))
}
