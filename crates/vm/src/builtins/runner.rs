// Conversions, messages and program parameters

use luna_common::LValue;

use super::{arg, get_integer, Entry};
use crate::domain::Domain;
use crate::error::RuntimeError;
use crate::session::Session;

pub(super) const FUNCTIONS: &[Entry] = &[
    ("string", string),
    ("real", real),
    ("show_message", show_message),
    ("show_debug_message", show_debug_message),
    ("parameter_count", parameter_count),
    ("parameter_string", parameter_string),
];

fn string(
    _session: &mut Session,
    _domain: &mut Domain,
    args: &[LValue],
    _argc: usize,
    _stack: &mut Vec<LValue>,
) -> Result<LValue, RuntimeError> {
    Ok(LValue::from(arg(args, 0).to_string()))
}

/// Numbers pass through; strings are parsed after trimming.
fn real(
    _session: &mut Session,
    _domain: &mut Domain,
    args: &[LValue],
    _argc: usize,
    _stack: &mut Vec<LValue>,
) -> Result<LValue, RuntimeError> {
    let value = arg(args, 0);
    if let Some(number) = value.as_number() {
        return Ok(LValue::Real(number));
    }
    value
        .as_str()
        .and_then(|text| text.trim().parse::<f64>().ok())
        .map(LValue::Real)
        .ok_or_else(|| RuntimeError::invalid("real", format!("cannot convert \"{value}\" to a number")))
}

fn show_message(
    session: &mut Session,
    _domain: &mut Domain,
    args: &[LValue],
    _argc: usize,
    _stack: &mut Vec<LValue>,
) -> Result<LValue, RuntimeError> {
    session.platform.show_message(&arg(args, 0).to_string());
    Ok(LValue::Undefined)
}

fn show_debug_message(
    session: &mut Session,
    _domain: &mut Domain,
    args: &[LValue],
    _argc: usize,
    _stack: &mut Vec<LValue>,
) -> Result<LValue, RuntimeError> {
    session.platform.debug_message(&arg(args, 0).to_string());
    Ok(LValue::Undefined)
}

fn parameter_count(
    session: &mut Session,
    _domain: &mut Domain,
    _args: &[LValue],
    _argc: usize,
    _stack: &mut Vec<LValue>,
) -> Result<LValue, RuntimeError> {
    Ok(LValue::Real(session.config().parameters.len() as f64))
}

/// Zero-based; out of range gives the empty string.
fn parameter_string(
    session: &mut Session,
    _domain: &mut Domain,
    args: &[LValue],
    _argc: usize,
    _stack: &mut Vec<LValue>,
) -> Result<LValue, RuntimeError> {
    let index = get_integer("parameter_string", args, 0)?;
    let text = usize::try_from(index)
        .ok()
        .and_then(|i| session.parameter(i))
        .unwrap_or_default();
    Ok(LValue::from(text))
}
