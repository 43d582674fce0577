//! Column-name normalization.
//!
//! Source files name the same field `Order ID`, `order-id` or `order.id`; everything downstream
//! works on the canonical form produced by [`sanitize`].

use std::collections::{HashMap, HashSet};

use crate::types::Frame;

/// Placeholder used when a header sanitizes to nothing.
pub const EMPTY_COLUMN_PLACEHOLDER: &str = "col";

/// Normalize a raw header into a lower-case `[a-z0-9_]` identifier.
///
/// Spaces, `:`, `-`, `.` and `/` become `_`; every other character outside ASCII alphanumerics
/// and `_` is dropped. An empty result becomes [`EMPTY_COLUMN_PLACEHOLDER`].
///
/// ```rust
/// use staging_ingest::columns::sanitize;
///
/// assert_eq!(sanitize("  Order ID "), "order_id");
/// assert_eq!(sanitize("Unnamed: 0"), "unnamed__0");
/// assert_eq!(sanitize("%%%"), "col");
/// ```
pub fn sanitize(name: &str) -> String {
    let out: String = name
        .trim()
        .to_lowercase()
        .chars()
        .map(|c| match c {
            ' ' | ':' | '-' | '.' | '/' => '_',
            other => other,
        })
        .filter(|c| c.is_ascii_alphanumeric() || *c == '_')
        .collect();

    if out.is_empty() {
        EMPTY_COLUMN_PLACEHOLDER.to_string()
    } else {
        out
    }
}

/// Make a sequence of tokens unique while preserving order.
///
/// The first occurrence of a token is kept as-is; the k-th repeat becomes `token_k`. A suffix
/// that would clash with another input token (or an earlier generated name) is skipped.
///
/// ```rust
/// use staging_ingest::columns::uniquify;
///
/// let out = uniquify(&["name".to_string(), "name".to_string()]);
/// assert_eq!(out, vec!["name", "name_1"]);
/// ```
pub fn uniquify(tokens: &[String]) -> Vec<String> {
    // First occurrences are never renamed, so reserve all of them up front.
    let mut taken: HashSet<String> = tokens.iter().cloned().collect();
    let mut first_seen: HashSet<&str> = HashSet::new();
    let mut repeats: HashMap<&str, usize> = HashMap::new();

    let mut out = Vec::with_capacity(tokens.len());
    for token in tokens {
        if first_seen.insert(token.as_str()) {
            out.push(token.clone());
            continue;
        }
        let k = repeats.entry(token.as_str()).or_insert(0);
        let candidate = loop {
            *k += 1;
            let candidate = format!("{token}_{k}");
            if !taken.contains(&candidate) {
                break candidate;
            }
        };
        taken.insert(candidate.clone());
        out.push(candidate);
    }
    out
}

/// Whether a column is index residue (`Unnamed: 0` and friends) rather than data.
pub fn is_index_artifact(name: &str) -> bool {
    let s = sanitize(name);
    s == "unnamed" || s.starts_with("unnamed_")
}

/// Sanitize and uniquify every column name of `frame` in place.
pub fn normalize_frame_columns(frame: &mut Frame) {
    let sanitized: Vec<String> = frame.columns.iter().map(|c| sanitize(c)).collect();
    frame.set_columns(uniquify(&sanitized));
}

#[cfg(test)]
mod tests {
    use super::*;

    fn strings(v: &[&str]) -> Vec<String> {
        v.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn sanitize_replaces_separators() {
        assert_eq!(sanitize("Order-ID"), "order_id");
        assert_eq!(sanitize("a.b/c:d"), "a_b_c_d");
        assert_eq!(sanitize("Price ($)"), "price_");
    }

    #[test]
    fn sanitize_drops_non_ascii() {
        assert_eq!(sanitize("Café"), "caf");
        assert_eq!(sanitize("日本"), "col");
    }

    #[test]
    fn sanitize_empty_becomes_placeholder() {
        assert_eq!(sanitize(""), "col");
        assert_eq!(sanitize("   "), "col");
    }

    #[test]
    fn uniquify_counts_repeats_per_token() {
        let out = uniquify(&strings(&["a", "b", "a", "a", "b"]));
        assert_eq!(out, strings(&["a", "b", "a_1", "a_2", "b_1"]));
    }

    #[test]
    fn uniquify_skips_suffixes_that_exist_in_input() {
        let out = uniquify(&strings(&["a", "a", "a_1"]));
        assert_eq!(out, strings(&["a", "a_2", "a_1"]));
    }

    #[test]
    fn index_artifacts_are_detected_after_sanitizing() {
        assert!(is_index_artifact("Unnamed: 0"));
        assert!(is_index_artifact("unnamed"));
        assert!(!is_index_artifact("name"));
        assert!(!is_index_artifact("unnamedish"));
    }
}
