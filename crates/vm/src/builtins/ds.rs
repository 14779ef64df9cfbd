// ds_list and ds_map: handles into session-owned arenas

use std::fmt::Display;

use luna_common::LValue;

use super::{arg, get_index, get_integer, truth, Entry};
use crate::domain::Domain;
use crate::error::RuntimeError;
use crate::session::{DsMap, Session};

pub(super) const FUNCTIONS: &[Entry] = &[
    ("ds_list_create", ds_list_create),
    ("ds_list_add", ds_list_add),
    ("ds_list_find_value", ds_list_find_value),
    ("ds_list_size", ds_list_size),
    ("ds_list_destroy", ds_list_destroy),
    ("ds_map_create", ds_map_create),
    ("ds_map_set", ds_map_set),
    ("ds_map_find_value", ds_map_find_value),
    ("ds_map_exists", ds_map_exists),
    ("ds_map_destroy", ds_map_destroy),
];

fn handle(function: &'static str, args: &[LValue]) -> Result<usize, RuntimeError> {
    let raw = get_integer(function, args, 0)?;
    usize::try_from(raw).map_err(|_| missing(function, raw))
}

fn missing(function: &'static str, handle: impl Display) -> RuntimeError {
    RuntimeError::invalid(function, format!("no data structure with handle {handle}"))
}

fn list<'s>(
    function: &'static str,
    session: &'s mut Session,
    args: &[LValue],
) -> Result<&'s mut Vec<LValue>, RuntimeError> {
    let handle = handle(function, args)?;
    session.lists.get_mut(handle).ok_or_else(|| missing(function, handle))
}

fn map<'s>(
    function: &'static str,
    session: &'s mut Session,
    args: &[LValue],
) -> Result<&'s mut DsMap, RuntimeError> {
    let handle = handle(function, args)?;
    session.maps.get_mut(handle).ok_or_else(|| missing(function, handle))
}

fn ds_list_create(
    session: &mut Session,
    _domain: &mut Domain,
    _args: &[LValue],
    _argc: usize,
    _stack: &mut Vec<LValue>,
) -> Result<LValue, RuntimeError> {
    Ok(LValue::Real(session.lists.insert(Vec::new()) as f64))
}

/// `ds_list_add(list, value, ...)` appends every value.
fn ds_list_add(
    session: &mut Session,
    _domain: &mut Domain,
    args: &[LValue],
    _argc: usize,
    _stack: &mut Vec<LValue>,
) -> Result<LValue, RuntimeError> {
    let list = list("ds_list_add", session, args)?;
    list.extend(args.iter().skip(1).cloned());
    Ok(LValue::Undefined)
}

/// Out of range positions give `Undefined`.
fn ds_list_find_value(
    session: &mut Session,
    _domain: &mut Domain,
    args: &[LValue],
    _argc: usize,
    _stack: &mut Vec<LValue>,
) -> Result<LValue, RuntimeError> {
    let position = get_index("ds_list_find_value", args, 1)?;
    let list = list("ds_list_find_value", session, args)?;
    Ok(position
        .and_then(|p| list.get(p).cloned())
        .unwrap_or_default())
}

fn ds_list_size(
    session: &mut Session,
    _domain: &mut Domain,
    args: &[LValue],
    _argc: usize,
    _stack: &mut Vec<LValue>,
) -> Result<LValue, RuntimeError> {
    let list = list("ds_list_size", session, args)?;
    Ok(LValue::Real(list.len() as f64))
}

fn ds_list_destroy(
    session: &mut Session,
    _domain: &mut Domain,
    args: &[LValue],
    _argc: usize,
    _stack: &mut Vec<LValue>,
) -> Result<LValue, RuntimeError> {
    let handle = handle("ds_list_destroy", args)?;
    session
        .lists
        .remove(handle)
        .ok_or_else(|| missing("ds_list_destroy", handle))?;
    Ok(LValue::Undefined)
}

fn ds_map_create(
    session: &mut Session,
    _domain: &mut Domain,
    _args: &[LValue],
    _argc: usize,
    _stack: &mut Vec<LValue>,
) -> Result<LValue, RuntimeError> {
    Ok(LValue::Real(session.maps.insert(DsMap::new()) as f64))
}

/// `ds_map_set(map, key, value)`; keys compare with language equality.
fn ds_map_set(
    session: &mut Session,
    _domain: &mut Domain,
    args: &[LValue],
    _argc: usize,
    _stack: &mut Vec<LValue>,
) -> Result<LValue, RuntimeError> {
    let key = arg(args, 1);
    let value = arg(args, 2);
    let map = map("ds_map_set", session, args)?;
    match map.iter_mut().find(|(k, _)| k.equals(&key)) {
        Some((_, slot)) => *slot = value,
        None => map.push((key, value)),
    }
    Ok(LValue::Undefined)
}

fn ds_map_find_value(
    session: &mut Session,
    _domain: &mut Domain,
    args: &[LValue],
    _argc: usize,
    _stack: &mut Vec<LValue>,
) -> Result<LValue, RuntimeError> {
    let key = arg(args, 1);
    let map = map("ds_map_find_value", session, args)?;
    Ok(map
        .iter()
        .find(|(k, _)| k.equals(&key))
        .map(|(_, v)| v.clone())
        .unwrap_or_default())
}

fn ds_map_exists(
    session: &mut Session,
    _domain: &mut Domain,
    args: &[LValue],
    _argc: usize,
    _stack: &mut Vec<LValue>,
) -> Result<LValue, RuntimeError> {
    let key = arg(args, 1);
    let map = map("ds_map_exists", session, args)?;
    Ok(truth(map.iter().any(|(k, _)| k.equals(&key))))
}

fn ds_map_destroy(
    session: &mut Session,
    _domain: &mut Domain,
    args: &[LValue],
    _argc: usize,
    _stack: &mut Vec<LValue>,
) -> Result<LValue, RuntimeError> {
    let handle = handle("ds_map_destroy", args)?;
    session
        .maps
        .remove(handle)
        .ok_or_else(|| missing("ds_map_destroy", handle))?;
    Ok(LValue::Undefined)
}
