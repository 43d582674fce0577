//! Format loaders.
//!
//! Most callers should use [`load_frame`] (from [`unified`]) which:
//!
//! - detects the [`SourceFormat`] from the file extension
//! - loads the file into a text-only [`crate::types::Frame`]
//! - drops index-artifact columns (`Unnamed: 0`, ...)
//!
//! Format-specific functions are also available under:
//! - [`csv`]
//! - [`json`]
//! - [`parquet`]
//! - [`arrow_ipc`]
//! - [`pickle`]
//! - [`html`]
//! - `excel` (behind the `excel` feature)

pub mod arrow_ipc;
pub mod csv;
#[cfg(feature = "excel")]
pub mod excel;
pub mod html;
pub mod json;
pub mod observability;
pub mod parquet;
pub mod pickle;
pub mod unified;
mod unpickle;

pub use observability::{
    severity_for_error, CompositeObserver, FileObserver, IngestionContext, IngestionObserver, IngestionSeverity,
    IngestionStats, TracingObserver,
};
pub use unified::{load_frame, load_frame_as, SourceFormat};

use crate::types::Cell;

/// Markers that text formats treat as missing values.
const NULL_MARKERS: &[&str] = &[
    "", "#N/A", "#N/A N/A", "#NA", "-1.#IND", "-1.#QNAN", "-NaN", "-nan", "1.#IND", "1.#QNAN", "<NA>", "N/A",
    "NA", "NULL", "NaN", "None", "n/a", "nan", "null",
];

/// Convert a raw text field into a cell, mapping empty strings and null markers to `None`.
pub(crate) fn text_cell(raw: &str) -> Cell {
    if NULL_MARKERS.contains(&raw) {
        None
    } else {
        Some(raw.to_string())
    }
}

/// Convert an already-typed string value into a cell; only the empty string is null.
pub(crate) fn non_empty(s: impl Into<String>) -> Cell {
    let s = s.into();
    if s.is_empty() { None } else { Some(s) }
}

/// Header used for a blank column name at position `idx`.
pub(crate) fn blank_header(idx: usize) -> String {
    format!("Unnamed: {idx}")
}

/// Turn raw header cells into column names, naming blank ones by position.
pub(crate) fn header_names<'a, I>(raw: I) -> Vec<String>
where
    I: IntoIterator<Item = &'a str>,
{
    raw.into_iter()
        .enumerate()
        .map(|(i, h)| {
            let h = h.trim();
            if h.is_empty() { blank_header(i) } else { h.to_string() }
        })
        .collect()
}
