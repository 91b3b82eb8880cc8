// Basic cleaning applied to every parsed table before domain rules run

use statmirror_core::{Table, Value};

/// Trim text cells, then drop rows and columns that hold no data at all.
///
/// Text that is empty after trimming becomes `Null`.
pub fn clean_basic(mut table: Table) -> Table {
    let columns: Vec<String> = table.columns().to_vec();
    for column in &columns {
        table.map_column(column, |v| match v {
            Value::Text(s) => {
                let trimmed = s.trim();
                if trimmed.is_empty() {
                    Value::Null
                } else {
                    Value::Text(trimmed.to_string())
                }
            }
            other => other.clone(),
        });
    }

    let empty_rows = table.retain_rows(|row| row.iter().any(|v| !v.is_null()));

    let populated: Vec<bool> = (0..table.width())
        .map(|i| table.rows().iter().any(|row| !row[i].is_null()))
        .collect();
    let empty_columns = table.retain_columns(|i, _| populated[i]);

    if empty_rows > 0 || empty_columns > 0 {
        tracing::debug!(empty_rows, empty_columns, "dropped empty rows/columns");
    }

    table
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn trims_and_drops_empty_rows_and_columns() {
        let table = Table::with_rows(
            vec!["a".into(), "b".into(), "c".into()],
            vec![
                vec![Value::Text("  x ".into()), Value::Null, Value::Int(1)],
                vec![Value::Null, Value::Text("   ".into()), Value::Null],
                vec![Value::Text("y".into()), Value::Null, Value::Int(2)],
            ],
        );
        let cleaned = clean_basic(table);
        assert_eq!(cleaned.columns(), &["a".to_string(), "c".to_string()][..]);
        assert_eq!(cleaned.len(), 2);
        assert_eq!(cleaned.rows()[0][0], Value::Text("x".into()));
    }

    #[test]
    fn empty_table_stays_empty() {
        let cleaned = clean_basic(Table::empty());
        assert!(cleaned.is_empty());
        assert_eq!(cleaned.width(), 0);
    }
}
