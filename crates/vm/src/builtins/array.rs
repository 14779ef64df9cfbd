// Array functions

use luna_common::LValue;

use super::{arg, get_number, Entry};
use crate::domain::Domain;
use crate::error::RuntimeError;
use crate::session::Session;

/// Largest array `array_create` will allocate.
const MAX_ARRAY_LEN: usize = 1 << 24;

pub(super) const FUNCTIONS: &[Entry] = &[
    ("array_create", array_create),
    ("@@NewGMLArray@@", new_array),
    ("array_length", array_length),
];

/// `array_create(size, value = 0)`
fn array_create(
    _session: &mut Session,
    _domain: &mut Domain,
    args: &[LValue],
    _argc: usize,
    _stack: &mut Vec<LValue>,
) -> Result<LValue, RuntimeError> {
    const NAME: &str = "array_create";
    let requested = get_number(NAME, args, 0)?;
    if !requested.is_finite() || requested < 0.0 {
        return Err(RuntimeError::invalid(NAME, format!("invalid size {requested}")));
    }
    let size = requested as usize;
    if size > MAX_ARRAY_LEN {
        return Err(RuntimeError::invalid(
            NAME,
            format!("size {size} exceeds {MAX_ARRAY_LEN}"),
        ));
    }
    let fill = if args.len() > 1 {
        arg(args, 1)
    } else {
        LValue::Real(0.0)
    };
    let mut array = Vec::new();
    array
        .try_reserve_exact(size)
        .map_err(|e| RuntimeError::invalid(NAME, e.to_string()))?;
    array.resize(size, fill);
    Ok(LValue::Array(array))
}

/// Array literal: the arguments in order.
fn new_array(
    _session: &mut Session,
    _domain: &mut Domain,
    args: &[LValue],
    _argc: usize,
    _stack: &mut Vec<LValue>,
) -> Result<LValue, RuntimeError> {
    Ok(LValue::Array(args.to_vec()))
}

/// Zero for anything that is not an array.
fn array_length(
    _session: &mut Session,
    _domain: &mut Domain,
    args: &[LValue],
    _argc: usize,
    _stack: &mut Vec<LValue>,
) -> Result<LValue, RuntimeError> {
    let length = args.first().and_then(LValue::as_array).map_or(0, <[LValue]>::len);
    Ok(LValue::Real(length as f64))
}
