// Drawing functions, forwarded to the renderer

use luna_common::LValue;

use super::{arg, get_flag, get_integer, get_number, Entry};
use crate::domain::Domain;
use crate::error::RuntimeError;
use crate::session::Session;

pub(super) const FUNCTIONS: &[Entry] = &[
    ("draw_set_circle_precision", draw_set_circle_precision),
    ("draw_circle", draw_circle),
    ("draw_rectangle", draw_rectangle),
    ("draw_text", draw_text),
    ("draw_sprite", draw_sprite),
];

/// Precision is a multiple of 4 between 4 and 64.
fn draw_set_circle_precision(
    session: &mut Session,
    _domain: &mut Domain,
    args: &[LValue],
    _argc: usize,
    _stack: &mut Vec<LValue>,
) -> Result<LValue, RuntimeError> {
    let precision = get_integer("draw_set_circle_precision", args, 0)?.clamp(4, 64) / 4 * 4;
    session.renderer.set_circle_precision(precision as u32);
    Ok(LValue::Undefined)
}

/// `draw_circle(x, y, r, outline)`
fn draw_circle(
    session: &mut Session,
    _domain: &mut Domain,
    args: &[LValue],
    _argc: usize,
    _stack: &mut Vec<LValue>,
) -> Result<LValue, RuntimeError> {
    const NAME: &str = "draw_circle";
    let x = get_number(NAME, args, 0)?;
    let y = get_number(NAME, args, 1)?;
    let radius = get_number(NAME, args, 2)?;
    let outline = get_flag(NAME, args, 3)?;
    session.renderer.draw_circle(x, y, radius, outline);
    Ok(LValue::Undefined)
}

/// `draw_rectangle(x1, y1, x2, y2, outline)`
fn draw_rectangle(
    session: &mut Session,
    _domain: &mut Domain,
    args: &[LValue],
    _argc: usize,
    _stack: &mut Vec<LValue>,
) -> Result<LValue, RuntimeError> {
    const NAME: &str = "draw_rectangle";
    let x1 = get_number(NAME, args, 0)?;
    let y1 = get_number(NAME, args, 1)?;
    let x2 = get_number(NAME, args, 2)?;
    let y2 = get_number(NAME, args, 3)?;
    let outline = get_flag(NAME, args, 4)?;
    session.renderer.draw_rectangle(x1, y1, x2, y2, outline);
    Ok(LValue::Undefined)
}

/// `draw_text(x, y, value)`; any value is drawn as its display text.
fn draw_text(
    session: &mut Session,
    _domain: &mut Domain,
    args: &[LValue],
    _argc: usize,
    _stack: &mut Vec<LValue>,
) -> Result<LValue, RuntimeError> {
    let x = get_number("draw_text", args, 0)?;
    let y = get_number("draw_text", args, 1)?;
    session.renderer.draw_text(x, y, &arg(args, 2).to_string());
    Ok(LValue::Undefined)
}

/// `draw_sprite(sprite, subimg, x, y)`
fn draw_sprite(
    session: &mut Session,
    _domain: &mut Domain,
    args: &[LValue],
    _argc: usize,
    _stack: &mut Vec<LValue>,
) -> Result<LValue, RuntimeError> {
    const NAME: &str = "draw_sprite";
    let sprite = get_integer(NAME, args, 0)?;
    let subimage = get_integer(NAME, args, 1)?;
    let x = get_number(NAME, args, 2)?;
    let y = get_number(NAME, args, 3)?;
    session.renderer.draw_sprite(sprite, subimage, x, y);
    Ok(LValue::Undefined)
}
