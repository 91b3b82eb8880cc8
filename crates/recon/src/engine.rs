use std::collections::HashSet;

use serde::Serialize;
use statmirror_core::Table;

use crate::error::ReconError;
use crate::fingerprint::{fingerprint, key_positions, row_fingerprint};
use crate::store::TableStore;

/// Outcome of one reconcile call.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct LoadReport {
    pub table: String,
    /// Rows in the batch as handed in.
    pub candidates: usize,
    /// Rows collapsed because an earlier batch row had the same key.
    pub batch_duplicates: usize,
    /// Rows dropped because their key is already persisted.
    pub existing_matches: usize,
    pub inserted: usize,
    /// Key columns actually compared against the table. Narrower than the
    /// declared key when the table lacks some key columns.
    pub key_used: Vec<String>,
    pub created_table: bool,
}

impl LoadReport {
    fn new(table: &str, key: &[&str], candidates: usize) -> Self {
        Self {
            table: table.to_string(),
            candidates,
            batch_duplicates: 0,
            existing_matches: 0,
            inserted: 0,
            key_used: key.iter().map(|k| k.to_string()).collect(),
            created_table: false,
        }
    }
}

/// Insert the rows of `batch` whose key is not yet persisted in `table`.
///
/// The batch is first collapsed on the full key (first row wins), then
/// compared against the key columns of the persisted rows. Only the key
/// columns are read from the store. All surviving rows are written in a
/// single transaction, or none are.
///
/// If the table exists but lacks some key columns, overlap is checked on
/// the columns it does have (logged as a warning); with none of them, all
/// rows count as new. This lenience can let duplicates through and is
/// reported in [`LoadReport::key_used`].
pub fn reconcile<S: TableStore + ?Sized>(
    store: &mut S,
    table: &str,
    key: &[&str],
    mut batch: Table,
) -> Result<LoadReport, ReconError> {
    if key.is_empty() {
        return Err(ReconError::EmptyKey { table: table.to_string() });
    }

    let mut report = LoadReport::new(table, key, batch.len());
    if batch.is_empty() {
        tracing::info!(table, "empty batch, nothing to load");
        return Ok(report);
    }

    if let Err(missing) = key_positions(&batch, key) {
        return Err(ReconError::MissingKeyColumns { table: table.to_string(), missing });
    }

    report.batch_duplicates = batch.dedup_by_columns(key);
    if report.batch_duplicates > 0 {
        tracing::info!(table, duplicates = report.batch_duplicates, "collapsed duplicate keys within batch");
    }

    let exists = store.table_exists(table)?;
    if exists {
        let persisted = store.columns(table)?;
        let (available, unverifiable): (Vec<&str>, Vec<&str>) =
            key.iter().copied().partition(|k| persisted.iter().any(|c| c == k));

        if !unverifiable.is_empty() {
            tracing::warn!(
                table,
                columns = ?unverifiable,
                "key column(s) missing from table, cannot verify overlap on them"
            );
        }
        report.key_used = available.iter().map(|k| k.to_string()).collect();

        if available.is_empty() {
            tracing::warn!(table, "no key column in table, treating every row as new");
        } else {
            let existing: HashSet<String> = store
                .fetch_keys(table, &available)?
                .iter()
                .map(|row| fingerprint(row))
                .collect();

            // Every available column is in the batch (checked above)
            let positions = key_positions(&batch, &available).unwrap_or_default();
            report.existing_matches = batch.retain_rows(|row| !existing.contains(&row_fingerprint(row, &positions)));
        }
    }

    if batch.is_empty() {
        tracing::info!(table, existing = report.existing_matches, "no new rows");
        return Ok(report);
    }

    report.inserted = store.insert_rows(table, &batch, key)?;
    report.created_table = !exists;
    tracing::info!(
        table,
        candidates = report.candidates,
        duplicates = report.batch_duplicates,
        existing = report.existing_matches,
        inserted = report.inserted,
        "load complete"
    );
    Ok(report)
}
