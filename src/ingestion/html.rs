//! HTML table loading: the first `<table>` element in the document becomes the frame.
//!
//! Header resolution, in order:
//! 1. the last row inside `<thead>`
//! 2. the first row, when every cell in it is a `<th>`
//! 3. positional names `0..n`

use std::fs;
use std::path::Path;

use scraper::{ElementRef, Html, Selector};

use crate::error::{IngestionError, IngestionResult};
use crate::types::{Cell, Frame};

use super::{header_names, text_cell};

/// Load the first table of an HTML file into a [`Frame`].
pub fn load_html_table_from_path(path: impl AsRef<Path>) -> IngestionResult<Frame> {
    let text = fs::read_to_string(path)?;
    load_html_table_from_str(&text)
}

/// Load the first table of an HTML document held in memory.
pub fn load_html_table_from_str(input: &str) -> IngestionResult<Frame> {
    let document = Html::parse_document(input);
    let table_sel = selector("table")?;
    let row_sel = selector("tr")?;
    let cell_sel = selector("th, td")?;

    let table = document
        .select(&table_sel)
        .next()
        .ok_or_else(|| IngestionError::malformed("no <table> element found"))?;

    let mut head: Option<Vec<String>> = None;
    let mut body: Vec<(bool, Vec<String>)> = Vec::new();
    for tr in table.select(&row_sel) {
        let cells: Vec<ElementRef<'_>> = tr.select(&cell_sel).collect();
        if cells.is_empty() {
            continue;
        }
        let texts: Vec<String> = cells.iter().map(|c| cell_text(c)).collect();
        if in_thead(&tr) {
            head = Some(texts);
        } else {
            let all_th = cells.iter().all(|c| c.value().name() == "th");
            body.push((all_th, texts));
        }
    }

    let header = match head {
        Some(h) => h,
        None if body.first().is_some_and(|(all_th, _)| *all_th) => body.remove(0).1,
        None => {
            let width = body.iter().map(|(_, r)| r.len()).max().unwrap_or(0);
            (0..width).map(|i| i.to_string()).collect()
        }
    };
    if header.is_empty() {
        return Err(IngestionError::malformed("first <table> has no rows"));
    }

    let columns = header_names(header.iter().map(String::as_str));
    let rows: Vec<Vec<Cell>> = body
        .into_iter()
        .map(|(_, texts)| texts.iter().map(|t| text_cell(t)).collect())
        .collect();

    Ok(Frame::new(columns, rows))
}

fn selector(css: &str) -> IngestionResult<Selector> {
    Selector::parse(css).map_err(|e| IngestionError::malformed(format!("invalid selector '{css}': {e:?}")))
}

fn in_thead(tr: &ElementRef<'_>) -> bool {
    tr.ancestors()
        .filter_map(|n| n.value().as_element())
        .any(|e| e.name() == "thead")
}

/// Text content with whitespace runs collapsed.
fn cell_text(el: &ElementRef<'_>) -> String {
    el.text()
        .flat_map(str::split_whitespace)
        .collect::<Vec<_>>()
        .join(" ")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn thead_supplies_header() {
        let html = r#"<html><body>
            <table><thead><tr><th>Order ID</th><th>Delay in Days</th></tr></thead>
            <tbody><tr><td>1</td><td> 3 </td></tr><tr><td>2</td><td></td></tr></tbody></table>
            <table><tr><td>ignored</td></tr></table>
        </body></html>"#;
        let f = load_html_table_from_str(html).unwrap();
        assert_eq!(f.columns, vec!["Order ID", "Delay in Days"]);
        assert_eq!(f.rows, vec![vec![Some("1".into()), Some("3".into())], vec![Some("2".into()), None]]);
    }

    #[test]
    fn leading_th_row_is_header_without_thead() {
        let html = "<table><tr><th></th><th>name</th></tr><tr><td>0</td><td>Ada</td></tr></table>";
        let f = load_html_table_from_str(html).unwrap();
        assert_eq!(f.columns, vec!["Unnamed: 0", "name"]);
        assert_eq!(f.row_count(), 1);
    }

    #[test]
    fn headerless_table_gets_positional_names() {
        let f = load_html_table_from_str("<table><tr><td>a</td><td>b</td></tr></table>").unwrap();
        assert_eq!(f.columns, vec!["0", "1"]);
        assert_eq!(f.row_count(), 1);
    }

    #[test]
    fn document_without_table_is_malformed() {
        assert!(load_html_table_from_str("<p>nothing</p>").is_err());
    }
}
