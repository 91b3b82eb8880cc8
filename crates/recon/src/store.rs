// Persistent store: one SQLite relation per domain table

use std::path::Path;

use rusqlite::types::{Value as SqlValue, ValueRef};
use rusqlite::{params_from_iter, Connection};
use serde::Serialize;
use statmirror_core::{Row, Table, Value};

use crate::error::StoreError;

/// Implicit load timestamp column added to every table.
pub const LOADED_AT_COLUMN: &str = "loaded_at";

/// What the reconciliation engine needs from a persistent store.
pub trait TableStore {
    fn table_exists(&self, table: &str) -> Result<bool, StoreError>;

    /// Current column names of an existing table, in schema order.
    fn columns(&self, table: &str) -> Result<Vec<String>, StoreError>;

    /// Values of only the named columns for every persisted row.
    fn fetch_keys(&self, table: &str, columns: &[&str]) -> Result<Vec<Row>, StoreError>;

    /// Append all rows of `batch` atomically, creating or widening the table
    /// as needed. Returns the number of rows written.
    ///
    /// Values written to the `key` columns must read back through
    /// [`TableStore::fetch_keys`] with the same canonical form they had in
    /// the batch.
    fn insert_rows(&mut self, table: &str, batch: &Table, key: &[&str]) -> Result<usize, StoreError>;

    /// Row count and columns, or `None` if the table does not exist.
    fn describe(&self, table: &str) -> Result<Option<TableInfo>, StoreError>;
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TableInfo {
    pub name: String,
    pub rows: u64,
    pub columns: Vec<ColumnInfo>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ColumnInfo {
    pub name: String,
    pub sql_type: String,
}

/// SQLite-backed store. The connection closes when the store is dropped.
pub struct SqliteStore {
    conn: Connection,
}

impl SqliteStore {
    /// Open (or create) the database file, creating its parent directory.
    pub fn open(path: &Path) -> Result<Self, StoreError> {
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent)?;
        }
        let conn = Connection::open(path).map_err(|e| StoreError::Open {
            path: path.display().to_string(),
            message: e.to_string(),
        })?;
        tracing::debug!(path = %path.display(), "database opened");
        Ok(Self { conn })
    }

    pub fn open_in_memory() -> Result<Self, StoreError> {
        let conn = Connection::open_in_memory().map_err(|e| StoreError::Open {
            path: ":memory:".to_string(),
            message: e.to_string(),
        })?;
        Ok(Self { conn })
    }

    /// User tables in the database, sorted by name.
    pub fn table_names(&self) -> Result<Vec<String>, StoreError> {
        let mut stmt = self.conn.prepare(
            "SELECT name FROM sqlite_master WHERE type = 'table' AND name NOT LIKE 'sqlite_%' ORDER BY name",
        )?;
        let names = stmt
            .query_map([], |row| row.get::<_, String>(0))?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(names)
    }
}

impl TableStore for SqliteStore {
    fn table_exists(&self, table: &str) -> Result<bool, StoreError> {
        table_exists(&self.conn, table)
    }

    fn columns(&self, table: &str) -> Result<Vec<String>, StoreError> {
        Ok(table_columns(&self.conn, table)?.into_iter().map(|c| c.name).collect())
    }

    fn fetch_keys(&self, table: &str, columns: &[&str]) -> Result<Vec<Row>, StoreError> {
        let select = columns.iter().map(|c| quote_ident(c)).collect::<Vec<_>>().join(", ");
        let sql = format!("SELECT {select} FROM {}", quote_ident(table));
        let mut stmt = self.conn.prepare(&sql)?;
        let width = columns.len();
        let rows = stmt
            .query_map([], |row| {
                (0..width)
                    .map(|i| row.get_ref(i).map(from_sql))
                    .collect::<Result<Row, _>>()
            })?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(rows)
    }

    /// Key columns are created as TEXT and receive canonical strings, so
    /// `Int(5)` and `Text("05")` stay distinct once stored.
    fn insert_rows(&mut self, table: &str, batch: &Table, key: &[&str]) -> Result<usize, StoreError> {
        // Dropping the transaction without commit rolls everything back
        let tx = self.conn.transaction()?;

        let columns: Vec<(usize, &str)> = batch
            .columns()
            .iter()
            .enumerate()
            .filter(|(_, c)| c.as_str() != LOADED_AT_COLUMN)
            .map(|(i, c)| (i, c.as_str()))
            .collect();

        let column_type = |i: usize, name: &str| {
            if key.contains(&name) {
                "TEXT"
            } else {
                infer_column_type(batch, i)
            }
        };

        let mut schema = table_columns(&tx, table)?;
        if schema.is_empty() {
            let mut defs: Vec<String> = columns
                .iter()
                .map(|&(i, name)| format!("{} {}", quote_ident(name), column_type(i, name)))
                .collect();
            defs.push(format!("{} TEXT", quote_ident(LOADED_AT_COLUMN)));
            tx.execute_batch(&format!("CREATE TABLE {} ({})", quote_ident(table), defs.join(", ")))?;
            tracing::info!(table, columns = columns.len(), "created table");
        } else {
            let mut added = Vec::new();
            for &(i, name) in &columns {
                if !schema.iter().any(|c| c.name == name) {
                    added.push((name, column_type(i, name)));
                }
            }
            if !schema.iter().any(|c| c.name == LOADED_AT_COLUMN) {
                added.push((LOADED_AT_COLUMN, "TEXT"));
            }
            for (name, sql_type) in &added {
                tx.execute_batch(&format!(
                    "ALTER TABLE {} ADD COLUMN {} {}",
                    quote_ident(table),
                    quote_ident(name),
                    sql_type
                ))?;
                tracing::warn!(table, column = *name, "added column missing from table");
            }
        }
        schema = table_columns(&tx, table)?;

        let text_affinity: Vec<bool> = columns
            .iter()
            .map(|(_, name)| {
                schema
                    .iter()
                    .find(|c| c.name == *name)
                    .map(|c| c.sql_type.eq_ignore_ascii_case("TEXT"))
                    .unwrap_or(true)
            })
            .collect();

        // A numeric key column from an older schema would coerce "05" to 5
        for (&(i, name), &text) in columns.iter().zip(&text_affinity) {
            if text || !key.contains(&name) {
                continue;
            }
            if let Some(value) = batch.rows().iter().map(|r| &r[i]).find(|v| !numeric_round_trip(v)) {
                return Err(StoreError::KeyCoercion {
                    table: table.to_string(),
                    column: name.to_string(),
                    value: value.canonical(),
                });
            }
        }

        let mut names: Vec<String> = columns.iter().map(|(_, c)| quote_ident(c)).collect();
        names.push(quote_ident(LOADED_AT_COLUMN));
        let placeholders: Vec<String> = (1..=names.len()).map(|i| format!("?{i}")).collect();
        let sql = format!(
            "INSERT INTO {} ({}) VALUES ({})",
            quote_ident(table),
            names.join(", "),
            placeholders.join(", ")
        );

        let loaded_at = chrono::Utc::now().to_rfc3339();
        let mut written = 0;
        {
            let mut stmt = tx.prepare(&sql)?;
            for row in batch.rows() {
                let mut params: Vec<SqlValue> = columns
                    .iter()
                    .zip(&text_affinity)
                    .map(|(&(i, _), &text)| to_sql(&row[i], text))
                    .collect();
                params.push(SqlValue::Text(loaded_at.clone()));
                written += stmt.execute(params_from_iter(params))?;
            }
        }

        tx.commit()?;
        Ok(written)
    }

    fn describe(&self, table: &str) -> Result<Option<TableInfo>, StoreError> {
        if !table_exists(&self.conn, table)? {
            return Ok(None);
        }
        let rows: i64 = self
            .conn
            .query_row(&format!("SELECT COUNT(*) FROM {}", quote_ident(table)), [], |r| r.get(0))?;
        Ok(Some(TableInfo {
            name: table.to_string(),
            rows: rows.max(0) as u64,
            columns: table_columns(&self.conn, table)?,
        }))
    }
}

fn table_exists(conn: &Connection, table: &str) -> Result<bool, StoreError> {
    let count: i64 = conn.query_row(
        "SELECT COUNT(*) FROM sqlite_master WHERE type = 'table' AND name = ?1",
        [table],
        |r| r.get(0),
    )?;
    Ok(count > 0)
}

/// Empty when the table does not exist.
fn table_columns(conn: &Connection, table: &str) -> Result<Vec<ColumnInfo>, StoreError> {
    let mut stmt = conn.prepare(&format!("PRAGMA table_info({})", quote_ident(table)))?;
    let columns = stmt
        .query_map([], |row| {
            Ok(ColumnInfo {
                name: row.get(1)?,
                sql_type: row.get(2)?,
            })
        })?
        .collect::<Result<Vec<_>, _>>()?;
    Ok(columns)
}

pub(crate) fn quote_ident(name: &str) -> String {
    format!("\"{}\"", name.replace('"', "\"\""))
}

/// INTEGER when every non-null value is an integer, REAL when all are
/// numeric, TEXT otherwise (including all-null columns).
fn infer_column_type(batch: &Table, column: usize) -> &'static str {
    let mut sql_type = None;
    for row in batch.rows() {
        sql_type = match (sql_type, row[column].sql_type()) {
            (prev, None) => prev,
            (None, Some(t)) => Some(t),
            (Some(a), Some(b)) if a == b => Some(a),
            (Some("INTEGER"), Some("REAL")) | (Some("REAL"), Some("INTEGER")) => Some("REAL"),
            _ => return "TEXT",
        };
    }
    sql_type.unwrap_or("TEXT")
}

/// Bind a cell. Text-affinity columns receive the canonical string so a
/// later fetch fingerprints the same as the value that was inserted.
fn to_sql(value: &Value, text_affinity: bool) -> SqlValue {
    match value {
        Value::Null => SqlValue::Null,
        Value::Int(n) if !text_affinity => SqlValue::Integer(*n),
        Value::Float(f) if !text_affinity => SqlValue::Real(*f),
        other => SqlValue::Text(other.canonical()),
    }
}

/// Whether a value bound into a numeric-affinity column reads back with
/// the same canonical string. Text that SQLite would convert to a number
/// must already be in canonical numeric form.
fn numeric_round_trip(value: &Value) -> bool {
    let Value::Text(s) = value else {
        return true;
    };
    let stored = match s.trim().parse::<i64>() {
        Ok(n) => Value::Int(n),
        Err(_) => match s.trim().parse::<f64>() {
            Ok(f) if f.is_finite() => Value::Float(f),
            _ => return true,
        },
    };
    stored.canonical() == *s
}

fn from_sql(value: ValueRef<'_>) -> Value {
    match value {
        ValueRef::Null => Value::Null,
        ValueRef::Integer(n) => Value::Int(n),
        ValueRef::Real(f) => Value::Float(f),
        ValueRef::Text(bytes) | ValueRef::Blob(bytes) => {
            Value::Text(String::from_utf8_lossy(bytes).into_owned())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn cols(names: &[&str]) -> Vec<String> {
        names.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn quoting_doubles_embedded_quotes() {
        assert_eq!(quote_ident("plain"), "\"plain\"");
        assert_eq!(quote_ident("we\"ird"), "\"we\"\"ird\"");
    }

    #[test]
    fn column_type_inference() {
        let t = Table::with_rows(
            cols(&["i", "r", "t", "n", "mixed"]),
            vec![
                vec![Value::Int(1), Value::Int(1), "a".into(), Value::Null, Value::Int(1)],
                vec![Value::Int(2), Value::Float(2.5), Value::Null, Value::Null, "x".into()],
            ],
        );
        assert_eq!(infer_column_type(&t, 0), "INTEGER");
        assert_eq!(infer_column_type(&t, 1), "REAL");
        assert_eq!(infer_column_type(&t, 2), "TEXT");
        assert_eq!(infer_column_type(&t, 3), "TEXT");
        assert_eq!(infer_column_type(&t, 4), "TEXT");
    }

    #[test]
    fn creates_table_with_loaded_at() {
        let mut store = SqliteStore::open_in_memory().unwrap();
        assert!(!store.table_exists("paises").unwrap());

        let batch = Table::with_rows(cols(&["code", "name"]), vec![vec!["170".into(), "Colombia".into()]]);
        assert_eq!(store.insert_rows("paises", &batch, &["code"]).unwrap(), 1);

        assert!(store.table_exists("paises").unwrap());
        assert_eq!(store.columns("paises").unwrap(), cols(&["code", "name", LOADED_AT_COLUMN]));
        let info = store.describe("paises").unwrap().unwrap();
        assert_eq!(info.rows, 1);
        assert_eq!(info.columns[0].sql_type, "TEXT");
    }

    #[test]
    fn widens_existing_table() {
        let mut store = SqliteStore::open_in_memory().unwrap();
        let first = Table::with_rows(cols(&["code"]), vec![vec!["170".into()]]);
        store.insert_rows("paises", &first, &["code"]).unwrap();

        let second = Table::with_rows(cols(&["code", "valor"]), vec![vec!["076".into(), Value::Float(1.5)]]);
        store.insert_rows("paises", &second, &["code"]).unwrap();

        assert_eq!(store.columns("paises").unwrap(), cols(&["code", LOADED_AT_COLUMN, "valor"]));
        let keys = store.fetch_keys("paises", &["valor"]).unwrap();
        assert_eq!(keys, vec![vec![Value::Null], vec![Value::Float(1.5)]]);
    }

    #[test]
    fn values_read_back_with_same_canonical_form() {
        let mut store = SqliteStore::open_in_memory().unwrap();
        let date = chrono::NaiveDate::from_ymd_opt(2024, 6, 30).unwrap();
        let batch = Table::with_rows(
            cols(&["code", "fecha", "valor", "flag"]),
            vec![vec!["076".into(), Value::Date(date), Value::Float(12.0), Value::Bool(true)]],
        );
        store.insert_rows("t", &batch, &["code"]).unwrap();

        let fetched = store.fetch_keys("t", &["code", "fecha", "valor", "flag"]).unwrap();
        let canon: Vec<String> = fetched[0].iter().map(|v| v.canonical()).collect();
        assert_eq!(canon, vec!["076", "2024-06-30", "12", "true"]);
    }

    #[test]
    fn key_columns_are_created_as_text() {
        let mut store = SqliteStore::open_in_memory().unwrap();
        let batch = Table::with_rows(cols(&["anio", "valor"]), vec![vec![Value::Int(2024), Value::Int(7)]]);
        store.insert_rows("t", &batch, &["anio"]).unwrap();

        let info = store.describe("t").unwrap().unwrap();
        let types: Vec<&str> = info.columns.iter().map(|c| c.sql_type.as_str()).collect();
        assert_eq!(types, vec!["TEXT", "INTEGER", "TEXT"]);

        let wider = Table::with_rows(cols(&["anio", "mes"]), vec![vec![Value::Int(2024), Value::Int(1)]]);
        store.insert_rows("t", &wider, &["anio", "mes"]).unwrap();
        let mes = store.describe("t").unwrap().unwrap().columns.pop().unwrap();
        assert_eq!((mes.name.as_str(), mes.sql_type.as_str()), ("mes", "TEXT"));
    }

    #[test]
    fn numeric_key_column_rejects_values_it_would_rewrite() {
        let mut store = SqliteStore::open_in_memory().unwrap();
        store
            .conn
            .execute_batch("CREATE TABLE legacy (dep INTEGER, loaded_at TEXT); INSERT INTO legacy VALUES (5, NULL);")
            .unwrap();

        let fine = Table::with_rows(cols(&["dep"]), vec![vec!["7".into()], vec![Value::Int(8)]]);
        assert_eq!(store.insert_rows("legacy", &fine, &["dep"]).unwrap(), 2);

        let padded = Table::with_rows(cols(&["dep"]), vec![vec!["9".into()], vec!["05".into()]]);
        let err = store.insert_rows("legacy", &padded, &["dep"]).unwrap_err();
        assert!(matches!(&err, StoreError::KeyCoercion { column, value, .. } if column == "dep" && value == "05"));
        assert_eq!(store.describe("legacy").unwrap().unwrap().rows, 3);

        // Non-key columns keep SQLite's usual affinity rules
        assert_eq!(store.insert_rows("legacy", &padded, &[]).unwrap(), 2);
    }

    #[test]
    fn numeric_round_trip_cases() {
        assert!(numeric_round_trip(&Value::Int(5)));
        assert!(numeric_round_trip(&Value::Float(1.5)));
        assert!(numeric_round_trip(&"12".into()));
        assert!(numeric_round_trip(&"1.5".into()));
        assert!(numeric_round_trip(&"Antioquia".into()));
        assert!(!numeric_round_trip(&"05".into()));
        assert!(!numeric_round_trip(&"1.50".into()));
        assert!(!numeric_round_trip(&" 7".into()));
    }

    #[test]
    fn describe_missing_table_is_none() {
        let store = SqliteStore::open_in_memory().unwrap();
        assert!(store.describe("nope").unwrap().is_none());
        assert!(store.table_names().unwrap().is_empty());
    }
}
