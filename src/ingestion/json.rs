//! JSON loading.
//!
//! Supported inputs:
//! - A JSON array of objects: `[{"a":1}, {"a":2}]`
//! - A single object: `{"a":1}`
//! - A column-oriented object: `{"a": {"0": 1, "1": 2}}` or `{"a": [1, 2]}`
//! - Newline-delimited JSON (NDJSON): `{"a":1}\n{"a":2}\n`
//!
//! Columns are the union of keys in first-seen order. Scalars are rendered as their JSON text;
//! nested objects and arrays are kept as serialized JSON.

use std::fs;
use std::path::Path;

use serde_json::{Map, Value};

use crate::error::{IngestionError, IngestionResult};
use crate::types::{Cell, Frame};

use super::non_empty;

/// Load a JSON file into a [`Frame`].
pub fn load_json_from_path(path: impl AsRef<Path>) -> IngestionResult<Frame> {
    let text = fs::read_to_string(path)?;
    load_json_from_str(&text)
}

/// Load JSON from an in-memory string into a [`Frame`].
pub fn load_json_from_str(input: &str) -> IngestionResult<Frame> {
    let trimmed = input.trim();
    if trimmed.is_empty() {
        return Err(IngestionError::malformed("json input is empty"));
    }

    // First try parsing as a single JSON value (array or object).
    if let Ok(v) = serde_json::from_str::<Value>(trimmed) {
        match v {
            Value::Array(items) => records_to_frame(&items),
            Value::Object(map) if is_column_oriented(&map) => Ok(columns_to_frame(&map)),
            v @ Value::Object(_) => records_to_frame(std::slice::from_ref(&v)),
            _ => Err(IngestionError::malformed(
                "json must be an object, an array of objects, or NDJSON",
            )),
        }
    } else {
        // Fall back to NDJSON.
        let mut values = Vec::new();
        for (i, line) in trimmed.lines().enumerate() {
            let line = line.trim();
            if line.is_empty() {
                continue;
            }
            let v = serde_json::from_str::<Value>(line).map_err(|e| {
                IngestionError::malformed(format!("invalid ndjson at line {}: {}", i + 1, e))
            })?;
            values.push(v);
        }
        records_to_frame(&values)
    }
}

fn is_column_oriented(map: &Map<String, Value>) -> bool {
    !map.is_empty() && map.values().all(|v| v.is_object() || v.is_array())
}

fn records_to_frame(values: &[Value]) -> IngestionResult<Frame> {
    let mut columns: Vec<String> = Vec::new();
    let mut records = Vec::with_capacity(values.len());

    for (idx0, v) in values.iter().enumerate() {
        let obj = v
            .as_object()
            .ok_or_else(|| IngestionError::malformed(format!("row {} is not a json object", idx0 + 1)))?;
        for key in obj.keys() {
            if !columns.iter().any(|c| c == key) {
                columns.push(key.clone());
            }
        }
        records.push(obj);
    }

    let rows = records
        .into_iter()
        .map(|obj| columns.iter().map(|c| obj.get(c).and_then(json_cell)).collect())
        .collect();
    Ok(Frame::new(columns, rows))
}

fn columns_to_frame(map: &Map<String, Value>) -> Frame {
    let columns: Vec<String> = map.keys().cloned().collect();

    // Row labels in first-seen order; arrays are labelled by position.
    let mut labels: Vec<String> = Vec::new();
    for v in map.values() {
        match v {
            Value::Object(inner) => {
                for k in inner.keys() {
                    if !labels.contains(k) {
                        labels.push(k.clone());
                    }
                }
            }
            Value::Array(items) => {
                for i in 0..items.len() {
                    let k = i.to_string();
                    if !labels.contains(&k) {
                        labels.push(k);
                    }
                }
            }
            _ => {}
        }
    }

    let rows = labels
        .iter()
        .map(|label| {
            map.values()
                .map(|v| match v {
                    Value::Object(inner) => inner.get(label).and_then(json_cell),
                    Value::Array(items) => label
                        .parse::<usize>()
                        .ok()
                        .and_then(|i| items.get(i))
                        .and_then(json_cell),
                    _ => None,
                })
                .collect()
        })
        .collect();
    Frame::new(columns, rows)
}

fn json_cell(v: &Value) -> Cell {
    match v {
        Value::Null => None,
        Value::String(s) => non_empty(s.as_str()),
        other => Some(other.to_string()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn records_union_keys_in_first_seen_order() {
        let f = load_json_from_str(r#"[{"b":1,"a":"x"},{"c":true}]"#).unwrap();
        assert_eq!(f.columns, vec!["b", "a", "c"]);
        assert_eq!(f.rows[0], vec![Some("1".into()), Some("x".into()), None]);
        assert_eq!(f.rows[1], vec![None, None, Some("true".into())]);
    }

    #[test]
    fn column_oriented_object() {
        let f = load_json_from_str(r#"{"id":{"0":1,"1":2},"name":{"0":"a","1":null}}"#).unwrap();
        assert_eq!(f.columns, vec!["id", "name"]);
        assert_eq!(f.row_count(), 2);
        assert_eq!(f.rows[1], vec![Some("2".into()), None]);
    }

    #[test]
    fn ndjson_fallback() {
        let f = load_json_from_str("{\"a\":1}\n\n{\"a\":2}\n").unwrap();
        assert_eq!(f.row_count(), 2);
    }

    #[test]
    fn scalar_rows_are_rejected() {
        let err = load_json_from_str("[1,2]").unwrap_err();
        assert!(err.to_string().contains("row 1 is not a json object"));
    }
}
