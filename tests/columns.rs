use std::collections::HashSet;

use staging_ingest::columns::{normalize_frame_columns, sanitize, uniquify};
use staging_ingest::types::Frame;

const RAW_HEADERS: &[&str] = &[
    "Order ID",
    "order-id",
    "ORDER.ID",
    "  Estimated Arrival  ",
    "price ($)",
    "Unnamed: 0",
    "",
    "   ",
    "col",
    "Ünïcödé",
    "a/b:c",
    "already_clean_1",
];

fn owned(v: &[&str]) -> Vec<String> {
    v.iter().map(|s| s.to_string()).collect()
}

#[test]
fn sanitize_output_is_canonical() {
    for raw in RAW_HEADERS {
        let s = sanitize(raw);
        assert!(!s.is_empty(), "{raw:?} sanitized to empty");
        assert!(
            s.chars().all(|c| c.is_ascii_lowercase() || c.is_ascii_digit() || c == '_'),
            "{raw:?} -> {s:?}"
        );
        assert_eq!(sanitize(&s), s, "sanitize is not idempotent for {raw:?}");
    }
}

#[test]
fn uniquify_output_is_unique_and_keeps_first_occurrences() {
    let sanitized: Vec<String> = RAW_HEADERS.iter().map(|h| sanitize(h)).collect();
    let out = uniquify(&sanitized);

    assert_eq!(out.len(), sanitized.len());
    let distinct: HashSet<&String> = out.iter().collect();
    assert_eq!(distinct.len(), out.len());

    let mut seen = HashSet::new();
    for (input, output) in sanitized.iter().zip(out.iter()) {
        if seen.insert(input) {
            assert_eq!(input, output);
        } else {
            assert!(output.starts_with(&format!("{input}_")));
        }
    }
}

#[test]
fn uniquify_without_repeats_is_identity() {
    let input = owned(&["order_id", "user_id", "price"]);
    assert_eq!(uniquify(&input), input);
}

#[test]
fn normalizing_a_frame_renames_without_touching_rows() {
    let mut frame = Frame::new(
        owned(&["Order ID", "order id", "Price"]),
        vec![vec![Some("O1".into()), Some("O1-dup".into()), None]],
    );
    normalize_frame_columns(&mut frame);
    assert_eq!(frame.columns, owned(&["order_id", "order_id_1", "price"]));
    assert_eq!(frame.rows[0], vec![Some("O1".into()), Some("O1-dup".into()), None]);
}
