//! Visitors by country of residence (tourism statistics workbook).

use statmirror_core::{ReadOptions, Table, Value};

use crate::cells::{is_placeholder, map_and_select, number_value, text, title_case};
use crate::DomainRule;

const KEY: &[&str] = &["anio", "mes", "pais", "continente_omt"];

const HEADER_MAPPING: &[(&str, &str)] = &[
    ("Año", "anio"),
    ("Mes", "mes"),
    ("País", "pais"),
    ("Pais", "pais"),
    ("Continente OMT", "continente_omt"),
    ("Viajeros", "viajeros"),
];

const COLUMNS: &[&str] = &["anio", "mes", "pais", "continente_omt", "viajeros"];

const YEARS: std::ops::RangeInclusive<f64> = 2000.0..=2030.0;

const MONTHS: [&str; 12] = [
    "enero", "febrero", "marzo", "abril", "mayo", "junio",
    "julio", "agosto", "septiembre", "octubre", "noviembre", "diciembre",
];

const MONTH_ABBREVIATIONS: [&str; 12] = [
    "ene", "feb", "mar", "abr", "may", "jun", "jul", "ago", "sep", "oct", "nov", "dic",
];

/// Full lowercase Spanish month name, from a name or its abbreviation.
fn month_name(raw: &str) -> Option<&'static str> {
    let m = raw.trim().to_lowercase();
    MONTHS
        .iter()
        .zip(MONTH_ABBREVIATIONS)
        .find(|(full, abbr)| **full == m || *abbr == m)
        .map(|(full, _)| *full)
}

pub struct VisitorsByResidence;

impl DomainRule for VisitorsByResidence {
    fn table_name(&self) -> &'static str {
        "visitantes_pais_residencia_turismo"
    }

    fn key_columns(&self) -> &'static [&'static str] {
        KEY
    }

    fn file_patterns(&self) -> &'static [&'static str] {
        &["OEE", "AV", "ESTADISTICAS", "TURISMO", "xlsx"]
    }

    fn read_options(&self) -> ReadOptions {
        ReadOptions::default()
            .header(Some(10))
            .skip_footer(5)
            .sheet_name("Visitantes Pais de Residencia")
    }

    fn transform(&self, raw: &Table) -> Table {
        let mut table = map_and_select(raw, HEADER_MAPPING, COLUMNS);
        if table.width() == 0 {
            return table;
        }
        let before = table.len();

        if let Some(idx) = table.column_index("anio") {
            table.map_column("anio", |v| v.as_f64().map(number_value).unwrap_or(Value::Null));
            table.retain_rows(|row| row[idx].as_f64().is_some_and(|y| YEARS.contains(&y)));
        }

        if let Some(idx) = table.column_index("mes") {
            table.map_column("mes", |v| match text(v) {
                Some(s) => Value::Text(month_name(&s).map(str::to_string).unwrap_or(s)),
                None => Value::Null,
            });
            table.retain_rows(|row| MONTHS.contains(&row[idx].text().as_str()));
        }

        if let Some(idx) = table.column_index("viajeros") {
            table.map_column("viajeros", |v| v.as_f64().map(number_value).unwrap_or(Value::Null));
            table.retain_rows(|row| row[idx].as_f64().is_some_and(|n| n >= 0.0));
        }

        for column in ["continente_omt", "pais"] {
            if let Some(idx) = table.column_index(column) {
                table.map_column(column, |v| match text(v) {
                    Some(s) => Value::Text(title_case(&s)),
                    None => Value::Null,
                });
                table.retain_rows(|row| !is_placeholder(row[idx].text().as_str()));
            }
        }

        let invalid = before - table.len();
        if invalid > 0 {
            tracing::info!(rows = invalid, "visitor rows failed validation");
        }

        let duplicates = table.dedup_by_columns(KEY);
        if duplicates > 0 {
            tracing::warn!(duplicates, "duplicate visitor rows dropped");
        }

        tracing::info!(rows = table.len(), "tourism visitors transformed");
        table
    }
}
