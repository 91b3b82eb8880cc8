use std::collections::{HashMap, HashSet};

use crate::value::Value;

/// One row, aligned with the owning table's columns.
pub type Row = Vec<Value>;

/// Named columns plus rows of values.
///
/// Every row has exactly `columns.len()` cells; [`Table::push_row`] pads or
/// truncates to keep that invariant.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Table {
    columns: Vec<String>,
    rows: Vec<Row>,
}

impl Table {
    pub fn new(columns: Vec<String>) -> Self {
        Self { columns, rows: Vec::new() }
    }

    pub fn with_rows(columns: Vec<String>, rows: Vec<Row>) -> Self {
        let mut table = Self::new(columns);
        for row in rows {
            table.push_row(row);
        }
        table
    }

    /// A table with no columns and no rows ("nothing usable").
    pub fn empty() -> Self {
        Self::default()
    }

    pub fn columns(&self) -> &[String] {
        &self.columns
    }

    pub fn rows(&self) -> &[Row] {
        &self.rows
    }

    pub fn into_rows(self) -> Vec<Row> {
        self.rows
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn width(&self) -> usize {
        self.columns.len()
    }

    pub fn column_index(&self, name: &str) -> Option<usize> {
        self.columns.iter().position(|c| c == name)
    }

    pub fn has_column(&self, name: &str) -> bool {
        self.column_index(name).is_some()
    }

    pub fn push_row(&mut self, mut row: Row) {
        row.resize(self.columns.len(), Value::Null);
        self.rows.push(row);
    }

    pub fn get(&self, row: usize, column: &str) -> Option<&Value> {
        let idx = self.column_index(column)?;
        self.rows.get(row).and_then(|r| r.get(idx))
    }

    /// Values of one column, top to bottom.
    pub fn column_values(&self, column: &str) -> Option<Vec<&Value>> {
        let idx = self.column_index(column)?;
        Some(self.rows.iter().map(|r| &r[idx]).collect())
    }

    /// Rename columns per `mapping` (old → new). A rename whose target name
    /// is already taken is skipped, so the first matching source column wins.
    pub fn rename_columns(&mut self, mapping: &[(&str, &str)]) -> Vec<(String, String)> {
        let mut applied = Vec::new();
        for (from, to) in mapping {
            if self.has_column(to) {
                continue;
            }
            if let Some(idx) = self.column_index(from) {
                self.columns[idx] = to.to_string();
                applied.push((from.to_string(), to.to_string()));
            }
        }
        applied
    }

    /// Keep only `names` that exist, in the given order.
    pub fn select(&self, names: &[&str]) -> Table {
        let picked: Vec<(usize, &str)> = names
            .iter()
            .filter_map(|n| self.column_index(n).map(|i| (i, *n)))
            .collect();
        let columns = picked.iter().map(|(_, n)| n.to_string()).collect();
        let rows = self
            .rows
            .iter()
            .map(|r| picked.iter().map(|(i, _)| r[*i].clone()).collect())
            .collect();
        Table { columns, rows }
    }

    /// Keep rows for which `keep` returns true. Returns how many were removed.
    pub fn retain_rows(&mut self, mut keep: impl FnMut(&Row) -> bool) -> usize {
        let before = self.rows.len();
        self.rows.retain(|r| keep(r));
        before - self.rows.len()
    }

    /// Replace every value of `column` with `f(value)`. No-op if absent.
    pub fn map_column(&mut self, column: &str, mut f: impl FnMut(&Value) -> Value) -> bool {
        let Some(idx) = self.column_index(column) else {
            return false;
        };
        for row in &mut self.rows {
            row[idx] = f(&row[idx]);
        }
        true
    }

    /// Append a column computed from each row.
    pub fn add_column(&mut self, name: &str, mut f: impl FnMut(&Row) -> Value) {
        for row in &mut self.rows {
            let value = f(row);
            row.push(value);
        }
        self.columns.push(name.to_string());
    }

    pub fn drop_column(&mut self, name: &str) -> bool {
        let Some(idx) = self.column_index(name) else {
            return false;
        };
        self.columns.remove(idx);
        for row in &mut self.rows {
            row.remove(idx);
        }
        true
    }

    /// Keep only the column positions for which `keep` is true.
    pub fn retain_columns(&mut self, mut keep: impl FnMut(usize, &str) -> bool) -> usize {
        let mask: Vec<bool> = self
            .columns
            .iter()
            .enumerate()
            .map(|(i, c)| keep(i, c))
            .collect();
        let removed = mask.iter().filter(|k| !**k).count();
        if removed == 0 {
            return 0;
        }
        fn apply<T>(items: Vec<T>, mask: &[bool]) -> Vec<T> {
            items.into_iter().zip(mask).filter(|(_, k)| **k).map(|(x, _)| x).collect()
        }
        self.columns = apply(std::mem::take(&mut self.columns), &mask);
        for row in &mut self.rows {
            *row = apply(std::mem::take(row), &mask);
        }
        removed
    }

    /// Stable sort by the listed columns (absent columns are ignored).
    pub fn sort_by_columns(&mut self, columns: &[&str]) {
        let idxs: Vec<usize> = columns.iter().filter_map(|c| self.column_index(c)).collect();
        self.rows.sort_by(|a, b| {
            idxs.iter()
                .map(|&i| a[i].sort_cmp(&b[i]))
                .find(|o| o.is_ne())
                .unwrap_or(std::cmp::Ordering::Equal)
        });
    }

    /// Drop rows whose values in `columns` repeat an earlier row, compared
    /// by [`Value::canonical`]. Survivors keep their order. Returns how many
    /// rows were removed.
    ///
    /// Columns the table lacks are ignored; with none present nothing is
    /// removed.
    pub fn dedup_by_columns(&mut self, columns: &[&str]) -> usize {
        let idxs: Vec<usize> = columns.iter().filter_map(|c| self.column_index(c)).collect();
        if idxs.is_empty() {
            return 0;
        }
        let mut seen: HashSet<Vec<String>> = HashSet::new();
        self.retain_rows(|row| seen.insert(idxs.iter().map(|&i| row[i].canonical()).collect()))
    }

    /// Union by column name, in first-seen column order. Cells for columns
    /// a source table lacks are `Null`.
    pub fn concat(tables: impl IntoIterator<Item = Table>) -> Table {
        let mut out = Table::empty();
        let mut positions: HashMap<String, usize> = HashMap::new();

        for table in tables {
            for col in &table.columns {
                if !positions.contains_key(col) {
                    positions.insert(col.clone(), out.columns.len());
                    out.columns.push(col.clone());
                }
            }
            let width = out.columns.len();
            for row in &mut out.rows {
                row.resize(width, Value::Null);
            }

            let targets: Vec<usize> = table.columns.iter().map(|c| positions[c]).collect();
            for row in table.rows {
                let mut aligned = vec![Value::Null; width];
                for (value, &target) in row.into_iter().zip(&targets) {
                    aligned[target] = value;
                }
                out.rows.push(aligned);
            }
        }

        out
    }
}
