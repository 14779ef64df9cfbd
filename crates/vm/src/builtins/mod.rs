//! Built-in native functions, grouped by area.
//!
//! Each area exports a `FUNCTIONS` table; [`table`] chains them for the
//! registry. Handlers follow the [`NativeFn`] convention: `args[0]` is the
//! first argument as written in source.

mod array;
mod draw;
mod ds;
mod input;
mod instance;
mod math;
mod object;
mod room;
mod runner;

use luna_common::LValue;

use crate::error::RuntimeError;
use crate::registry::NativeFn;

pub(crate) type Entry = (&'static str, NativeFn);

/// Every built-in native.
pub(crate) fn table() -> impl Iterator<Item = &'static Entry> {
    instance::FUNCTIONS
        .iter()
        .chain(input::FUNCTIONS)
        .chain(draw::FUNCTIONS)
        .chain(math::FUNCTIONS)
        .chain(array::FUNCTIONS)
        .chain(runner::FUNCTIONS)
        .chain(room::FUNCTIONS)
        .chain(object::FUNCTIONS)
        .chain(ds::FUNCTIONS)
}

/// Argument `index`, or `Undefined` when it was not passed.
fn arg(args: &[LValue], index: usize) -> LValue {
    args.get(index).cloned().unwrap_or_default()
}

fn get_number(function: &'static str, args: &[LValue], index: usize) -> Result<f64, RuntimeError> {
    let Some(value) = args.get(index) else {
        return Err(RuntimeError::invalid(
            function,
            format!("expected at least {} argument(s)", index + 1),
        ));
    };
    value.as_number().ok_or_else(|| {
        RuntimeError::invalid(
            function,
            format!("argument {index} must be a number, got {}", value.kind_name()),
        )
    })
}

/// Numeric argument truncated toward zero.
fn get_integer(function: &'static str, args: &[LValue], index: usize) -> Result<i64, RuntimeError> {
    Ok(get_number(function, args, index)? as i64)
}

/// Numeric argument used as a table index or handle. Negative values have
/// no slot.
fn get_index(function: &'static str, args: &[LValue], index: usize) -> Result<Option<usize>, RuntimeError> {
    Ok(usize::try_from(get_integer(function, args, index)?).ok())
}

/// Optional flag argument; absent means false.
fn get_flag(function: &'static str, args: &[LValue], index: usize) -> Result<bool, RuntimeError> {
    if index >= args.len() {
        return Ok(false);
    }
    Ok(get_number(function, args, index)? >= 0.5)
}

/// Truth values handed back to bytecode.
fn truth(value: bool) -> LValue {
    LValue::Real(if value { 1.0 } else { 0.0 })
}
