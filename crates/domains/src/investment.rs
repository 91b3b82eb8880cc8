//! Investment series sheets ("Series de datos").
//!
//! Both investment workbooks share one layout, read without a header:
//!
//! ```text
//! row 0   title
//! row 1   _      _      31/03/2023  30/06/2023  ...
//! row 2   column captions
//! row 3+  170    IED    1523.4      1610.09     ...
//! ```
//!
//! Column 0 is the country code, column 1 the series and every further
//! column one period. The last row is a source note.

use chrono::NaiveDate;
use statmirror_core::{ReadOptions, Table, Value};

use crate::cells::{amount, text};
use crate::DomainRule;

const KEY: &[&str] = &["cod_pais", "serie", "fecha"];
const SHEET: &str = "Series de datos";
const DATES_ROW: usize = 1;
const FIRST_DATA_ROW: usize = 3;
const FIRST_PERIOD_COLUMN: usize = 2;

/// Wide-to-long pivot of a country/series by period sheet.
pub struct SeriesPivot {
    table: &'static str,
    patterns: &'static [&'static str],
}

impl SeriesPivot {
    /// Foreign direct investment in Colombia by country of origin.
    pub fn fdi_by_origin() -> Self {
        Self {
            table: "ied_pais_origen_inversion",
            patterns: &["IED por país origen"],
        }
    }

    /// Colombian direct investment abroad by destination country.
    pub fn odi_by_destination() -> Self {
        Self {
            table: "idce_pais_destino_inversion",
            patterns: &["IDCE por país destino"],
        }
    }
}

/// Period date of a header cell: a native date or `dd/mm/yyyy` text.
fn period_date(value: &Value) -> Option<NaiveDate> {
    match value {
        Value::Date(d) => Some(*d),
        Value::Text(s) => NaiveDate::parse_from_str(s.trim(), "%d/%m/%Y").ok(),
        _ => None,
    }
}

impl DomainRule for SeriesPivot {
    fn table_name(&self) -> &'static str {
        self.table
    }

    fn key_columns(&self) -> &'static [&'static str] {
        KEY
    }

    fn file_patterns(&self) -> &'static [&'static str] {
        self.patterns
    }

    fn read_options(&self) -> ReadOptions {
        ReadOptions::default().header(None).skip_footer(1).sheet_name(SHEET)
    }

    fn transform(&self, raw: &Table) -> Table {
        let rows = raw.rows();
        if raw.width() <= FIRST_PERIOD_COLUMN || rows.len() <= FIRST_DATA_ROW {
            tracing::warn!(table = self.table, "sheet too small for a series layout");
            return Table::empty();
        }

        let mut periods = Vec::new();
        for (col, cell) in rows[DATES_ROW].iter().enumerate().skip(FIRST_PERIOD_COLUMN) {
            match period_date(cell) {
                Some(date) => periods.push((col, date)),
                None => tracing::warn!(table = self.table, column = col, value = %cell, "period header is not a date, dropped"),
            }
        }
        if periods.is_empty() {
            tracing::warn!(table = self.table, "no period columns found");
            return Table::empty();
        }

        let mut out = Table::new(["cod_pais", "serie", "fecha", "valor"].map(String::from).to_vec());
        let mut blank_keys = 0usize;
        for (col, date) in &periods {
            for row in &rows[FIRST_DATA_ROW..] {
                let (Some(country), Some(series)) = (text(&row[0]), text(&row[1])) else {
                    blank_keys += 1;
                    continue;
                };
                if country.is_empty() || series.is_empty() {
                    blank_keys += 1;
                    continue;
                }
                out.push_row(vec![
                    Value::Text(country),
                    Value::Text(series),
                    Value::Date(*date),
                    amount(&row[*col]),
                ]);
            }
        }
        if blank_keys > 0 {
            tracing::debug!(table = self.table, cells = blank_keys, "cells without country or series skipped");
        }

        out.dedup_by_columns(KEY);
        out.sort_by_columns(KEY);

        tracing::info!(table = self.table, periods = periods.len(), rows = out.len(), "series pivoted");
        out
    }
}
