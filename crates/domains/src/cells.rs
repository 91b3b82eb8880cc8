// Cell-level coercions shared by the domain rules

use statmirror_core::{Table, Value};

/// Round to two decimal places, half away from zero.
pub(crate) fn round2(f: f64) -> f64 {
    (f * 100.0).round() / 100.0
}

/// `Int` when integral and in range, `Float` otherwise.
pub(crate) fn number_value(f: f64) -> Value {
    if f.fract() == 0.0 && f.abs() < 1e15 {
        Value::Int(f as i64)
    } else {
        Value::Float(f)
    }
}

/// Numeric value rounded to two decimals; non-numeric cells become `Null`.
pub(crate) fn amount(value: &Value) -> Value {
    value.as_f64().map(|f| Value::Float(round2(f))).unwrap_or(Value::Null)
}

/// Trimmed text of any non-null cell.
pub(crate) fn text(value: &Value) -> Option<String> {
    if value.is_null() {
        return None;
    }
    Some(value.text().trim().to_string())
}

/// Text that stands in for "no value" in exported sheets.
pub(crate) fn is_placeholder(s: &str) -> bool {
    s.is_empty() || s.eq_ignore_ascii_case("nan") || s == "None"
}

/// Capitalise the first letter of every word and lowercase the rest.
/// A word starts after any non-alphabetic character.
pub(crate) fn title_case(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    let mut in_word = false;
    for c in s.chars() {
        if c.is_alphabetic() {
            if in_word {
                out.extend(c.to_lowercase());
            } else {
                out.extend(c.to_uppercase());
            }
            in_word = true;
        } else {
            out.push(c);
            in_word = false;
        }
    }
    out
}

/// Rename by `mapping`, then keep the `wanted` columns that exist, in
/// order. Empty when none of them is present.
pub(crate) fn map_and_select(raw: &Table, mapping: &[(&str, &str)], wanted: &[&str]) -> Table {
    let mut table = raw.clone();
    let applied = table.rename_columns(mapping);
    tracing::debug!(?applied, "header mapping");

    let selected = table.select(wanted);
    if selected.width() == 0 {
        tracing::error!(columns = ?raw.columns(), "no expected column found");
        return Table::empty();
    }
    selected
}
