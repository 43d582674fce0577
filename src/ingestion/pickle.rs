//! Pickle loading.
//!
//! The payload must be a list of record dicts (`df.to_dict("records")`) or a dict of columns
//! (`df.to_dict()` / `df.to_dict("list")`). Values may be plain Python objects or `datetime`,
//! `date`, `time`, `timedelta`, `Decimal` and pandas `Timestamp`/`NaT`; those are decoded by a
//! fallback pickle machine when `serde_pickle` meets a class reference. Pickled DataFrame
//! objects are rejected as malformed.

use std::collections::{BTreeMap, BTreeSet};
use std::fs;
use std::path::Path;

use serde_pickle::{DeOptions, ErrorCode, HashableValue, Value};

use crate::error::{IngestionError, IngestionResult};
use crate::types::{Cell, Frame};

use super::{non_empty, unpickle};

/// Load a pickle file into a [`Frame`].
pub fn load_pickle_from_path(path: impl AsRef<Path>) -> IngestionResult<Frame> {
    let bytes = fs::read(path)?;
    let value = match serde_pickle::value_from_slice(&bytes, DeOptions::new()) {
        Ok(value) => value,
        Err(serde_pickle::Error::Syntax(ErrorCode::UnresolvedGlobal)) => unpickle::decode(&bytes)?,
        Err(e) => return Err(e.into()),
    };
    pickle_value_to_frame(value)
}

/// Convert a decoded pickle value into a [`Frame`].
pub fn pickle_value_to_frame(value: Value) -> IngestionResult<Frame> {
    match value {
        Value::List(items) | Value::Tuple(items) => records_to_frame(items),
        Value::Dict(map) => Ok(columns_to_frame(map)),
        other => Err(IngestionError::malformed(format!(
            "pickle payload is not a table (expected list of dicts or dict of columns, got {})",
            kind(&other)
        ))),
    }
}

fn records_to_frame(items: Vec<Value>) -> IngestionResult<Frame> {
    let mut columns: Vec<String> = Vec::new();
    let mut records: Vec<BTreeMap<String, Value>> = Vec::with_capacity(items.len());

    for (idx0, item) in items.into_iter().enumerate() {
        let Value::Dict(map) = item else {
            return Err(IngestionError::malformed(format!("pickle row {} is not a dict", idx0 + 1)));
        };
        let record: BTreeMap<String, Value> = map.into_iter().map(|(k, v)| (key_text(&k), v)).collect();
        for k in record.keys() {
            if !columns.contains(k) {
                columns.push(k.clone());
            }
        }
        records.push(record);
    }

    let rows = records
        .iter()
        .map(|r| columns.iter().map(|c| r.get(c).and_then(value_cell)).collect())
        .collect();
    Ok(Frame::new(columns, rows))
}

fn columns_to_frame(map: BTreeMap<HashableValue, Value>) -> Frame {
    let columns: Vec<String> = map.keys().map(key_text).collect();

    let mut labels: BTreeSet<HashableValue> = BTreeSet::new();
    let mut positional = 0usize;
    for v in map.values() {
        match v {
            Value::Dict(inner) => labels.extend(inner.keys().cloned()),
            Value::List(items) | Value::Tuple(items) => positional = positional.max(items.len()),
            _ => positional = positional.max(1),
        }
    }

    let mut rows: Vec<Vec<Cell>> = Vec::new();
    for label in &labels {
        rows.push(
            map.values()
                .map(|v| match v {
                    Value::Dict(inner) => inner.get(label).and_then(value_cell),
                    _ => None,
                })
                .collect(),
        );
    }
    for i in 0..positional {
        rows.push(
            map.values()
                .map(|v| match v {
                    Value::List(items) | Value::Tuple(items) => items.get(i).and_then(value_cell),
                    Value::Dict(_) => None,
                    scalar if i == 0 => value_cell(scalar),
                    _ => None,
                })
                .collect(),
        );
    }
    Frame::new(columns, rows)
}

fn key_text(k: &HashableValue) -> String {
    match k {
        HashableValue::String(s) => s.clone(),
        HashableValue::I64(i) => i.to_string(),
        HashableValue::Int(i) => i.to_string(),
        HashableValue::F64(f) => python_float(*f),
        HashableValue::Bool(b) => python_bool(*b).to_string(),
        HashableValue::None => "None".to_string(),
        HashableValue::Bytes(b) => String::from_utf8_lossy(b).into_owned(),
        other => format!("{other:?}"),
    }
}

fn value_cell(v: &Value) -> Cell {
    match v {
        Value::None => None,
        Value::F64(f) if f.is_nan() => None,
        Value::F64(f) => Some(python_float(*f)),
        Value::Bool(b) => Some(python_bool(*b).to_string()),
        Value::I64(i) => Some(i.to_string()),
        Value::Int(i) => Some(i.to_string()),
        Value::String(s) => non_empty(s.as_str()),
        Value::Bytes(b) => non_empty(String::from_utf8_lossy(b)),
        other => Some(format!("{other:?}")),
    }
}

fn python_bool(b: bool) -> &'static str {
    if b { "True" } else { "False" }
}

fn python_float(f: f64) -> String {
    if f.is_finite() && f.fract() == 0.0 && f.abs() < 1e16 {
        format!("{f:.1}")
    } else {
        f.to_string()
    }
}

fn kind(v: &Value) -> &'static str {
    match v {
        Value::None => "None",
        Value::Bool(_) => "bool",
        Value::I64(_) | Value::Int(_) => "int",
        Value::F64(_) => "float",
        Value::Bytes(_) => "bytes",
        Value::String(_) => "str",
        Value::List(_) => "list",
        Value::Tuple(_) => "tuple",
        Value::Set(_) | Value::FrozenSet(_) => "set",
        Value::Dict(_) => "dict",
    }
}
