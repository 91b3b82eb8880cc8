//! Key fingerprints: the identity of a logical record within a table.
//!
//! A fingerprint is the canonical string of every key value joined with
//! [`SEPARATOR`]; backslashes and separators inside a value are escaped
//! with a backslash. Two rows are the same record iff their fingerprints
//! are equal, so `Int(1)`, `Float(1.0)` and `Text("1")` must (and do) agree;
//! see [`Value::canonical`].

use statmirror_core::{Row, Table, Value};

pub const SEPARATOR: char = '|';

/// Join canonical key values with [`SEPARATOR`].
pub fn fingerprint<'a>(values: impl IntoIterator<Item = &'a Value>) -> String {
    let mut out = String::new();
    for (i, value) in values.into_iter().enumerate() {
        if i > 0 {
            out.push(SEPARATOR);
        }
        for c in value.canonical().chars() {
            if c == SEPARATOR || c == '\\' {
                out.push('\\');
            }
            out.push(c);
        }
    }
    out
}

/// Fingerprint of `row` over the cells at `positions`.
pub fn row_fingerprint(row: &Row, positions: &[usize]) -> String {
    fingerprint(positions.iter().map(|&i| &row[i]))
}

/// Column positions of `key` in `table`, or the names that are missing.
pub fn key_positions(table: &Table, key: &[&str]) -> Result<Vec<usize>, Vec<String>> {
    let mut positions = Vec::with_capacity(key.len());
    let mut missing = Vec::new();
    for column in key {
        match table.column_index(column) {
            Some(i) => positions.push(i),
            None => missing.push(column.to_string()),
        }
    }
    if missing.is_empty() {
        Ok(positions)
    } else {
        Err(missing)
    }
}
