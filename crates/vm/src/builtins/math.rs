// Math functions
// Provides: max, min, abs, floor, lengthdir_x, lengthdir_y, irandom, random

use luna_common::LValue;
use rand::Rng;

use super::{get_integer, get_number, Entry};
use crate::domain::Domain;
use crate::error::RuntimeError;
use crate::session::Session;

pub(super) const FUNCTIONS: &[Entry] = &[
    ("max", math_max),
    ("min", math_min),
    ("abs", math_abs),
    ("floor", math_floor),
    ("lengthdir_x", lengthdir_x),
    ("lengthdir_y", lengthdir_y),
    ("irandom", irandom),
    ("random", random),
];

fn numbers(function: &'static str, args: &[LValue]) -> Result<Vec<f64>, RuntimeError> {
    if args.is_empty() {
        return Err(RuntimeError::invalid(function, "expected at least 1 argument(s)"));
    }
    (0..args.len()).map(|i| get_number(function, args, i)).collect()
}

fn math_max(
    _session: &mut Session,
    _domain: &mut Domain,
    args: &[LValue],
    _argc: usize,
    _stack: &mut Vec<LValue>,
) -> Result<LValue, RuntimeError> {
    let values = numbers("max", args)?;
    Ok(LValue::Real(values.into_iter().fold(f64::NEG_INFINITY, f64::max)))
}

fn math_min(
    _session: &mut Session,
    _domain: &mut Domain,
    args: &[LValue],
    _argc: usize,
    _stack: &mut Vec<LValue>,
) -> Result<LValue, RuntimeError> {
    let values = numbers("min", args)?;
    Ok(LValue::Real(values.into_iter().fold(f64::INFINITY, f64::min)))
}

fn math_abs(
    _session: &mut Session,
    _domain: &mut Domain,
    args: &[LValue],
    _argc: usize,
    _stack: &mut Vec<LValue>,
) -> Result<LValue, RuntimeError> {
    Ok(LValue::Real(get_number("abs", args, 0)?.abs()))
}

fn math_floor(
    _session: &mut Session,
    _domain: &mut Domain,
    args: &[LValue],
    _argc: usize,
    _stack: &mut Vec<LValue>,
) -> Result<LValue, RuntimeError> {
    Ok(LValue::Real(get_number("floor", args, 0)?.floor()))
}

/// Results within 0.0001 of an integer snap to it, so axis-aligned
/// directions give exact components.
fn snap(value: f64) -> f64 {
    let rounded = value.round();
    if (value - rounded).abs() < 0.0001 {
        rounded
    } else {
        value
    }
}

/// `lengthdir_x(len, dir)`, `dir` in degrees.
fn lengthdir_x(
    _session: &mut Session,
    _domain: &mut Domain,
    args: &[LValue],
    _argc: usize,
    _stack: &mut Vec<LValue>,
) -> Result<LValue, RuntimeError> {
    let length = get_number("lengthdir_x", args, 0)?;
    let direction = get_number("lengthdir_x", args, 1)?;
    Ok(LValue::Real(snap(length * direction.to_radians().cos())))
}

fn lengthdir_y(
    _session: &mut Session,
    _domain: &mut Domain,
    args: &[LValue],
    _argc: usize,
    _stack: &mut Vec<LValue>,
) -> Result<LValue, RuntimeError> {
    let length = get_number("lengthdir_y", args, 0)?;
    let direction = get_number("lengthdir_y", args, 1)?;
    Ok(LValue::Real(snap(length * direction.to_radians().sin())))
}

/// Integer in `0..n`; zero when `n` is not positive.
fn irandom(
    session: &mut Session,
    _domain: &mut Domain,
    args: &[LValue],
    _argc: usize,
    _stack: &mut Vec<LValue>,
) -> Result<LValue, RuntimeError> {
    let n = get_integer("irandom", args, 0)?;
    let value = if n > 0 { session.rng.random_range(0..n) } else { 0 };
    Ok(LValue::Real(value as f64))
}

/// Real in `[0, n)`.
fn random(
    session: &mut Session,
    _domain: &mut Domain,
    args: &[LValue],
    _argc: usize,
    _stack: &mut Vec<LValue>,
) -> Result<LValue, RuntimeError> {
    let n = get_number("random", args, 0)?;
    let unit: f64 = session.rng.random();
    Ok(LValue::Real(unit * n))
}
