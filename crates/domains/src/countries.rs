//! Country codes and trade agreement membership (reference table).

use statmirror_core::{ReadOptions, Table, Value};

use crate::cells::{is_placeholder, map_and_select, text, title_case};
use crate::DomainRule;

const HEADER_MAPPING: &[(&str, &str)] = &[
    ("Cod. Pais", "codigo_pais"),
    ("País", "pais"),
    ("Pais", "pais"),
    ("Grupos DIE", "grupos_die"),
    ("AP", "ap"),
    ("AEC", "aec"),
    ("ACUERDOS", "acuerdos"),
    ("ALADI", "aladi"),
    ("CELAC", "celac"),
];

const COLUMNS: &[&str] = &["codigo_pais", "pais", "grupos_die", "ap", "aec", "acuerdos", "aladi", "celac"];

const AGREEMENT_COLUMNS: &[&str] = &["grupos_die", "ap", "aec", "acuerdos", "aladi", "celac"];

/// Code shared by the world aggregate and unassigned rows.
const WORLD_CODE: &str = "0";
const WORLD_NAME: &str = "Mundo";

/// Country code without leading zeros; all zeros collapse to `0`.
fn normalise_code(raw: &str) -> String {
    let stripped = raw.trim().trim_start_matches('0');
    if stripped.is_empty() {
        WORLD_CODE.to_string()
    } else {
        stripped.to_string()
    }
}

pub struct CountryAgreements;

impl DomainRule for CountryAgreements {
    fn table_name(&self) -> &'static str {
        "codigo_pais_acuerdos"
    }

    fn key_columns(&self) -> &'static [&'static str] {
        &["codigo_pais"]
    }

    fn file_patterns(&self) -> &'static [&'static str] {
        &["Código", "País", "Acuerdos"]
    }

    fn read_options(&self) -> ReadOptions {
        ReadOptions::default().header(Some(1))
    }

    fn transform(&self, raw: &Table) -> Table {
        let mut table = map_and_select(raw, HEADER_MAPPING, COLUMNS);
        if table.width() == 0 {
            return table;
        }

        if let Some(idx) = table.column_index("codigo_pais") {
            table.retain_rows(|row| !row[idx].is_blank());
            table.map_column("codigo_pais", |v| Value::Text(normalise_code(&v.text())));
        }

        if let Some(idx) = table.column_index("pais") {
            table.map_column("pais", |v| match text(v) {
                Some(s) => Value::Text(title_case(&s)),
                None => Value::Null,
            });
            table.retain_rows(|row| !is_placeholder(row[idx].text().as_str()));
        }

        // The world aggregate wins over any other row coded 0
        if let (Some(code), Some(name)) = (table.column_index("codigo_pais"), table.column_index("pais")) {
            let is_zero = |row: &Vec<Value>| row[code].text() == WORLD_CODE;
            let world: Vec<Vec<Value>> = table
                .rows()
                .iter()
                .filter(|row| is_zero(*row) && row[name].text() == WORLD_NAME)
                .cloned()
                .collect();
            if !world.is_empty() {
                table.retain_rows(|row| !is_zero(row));
                for row in world {
                    table.push_row(row);
                }
            }
        }

        for column in AGREEMENT_COLUMNS {
            table.map_column(column, |v| text(v).map(Value::Text).unwrap_or(Value::Null));
        }

        let duplicates = table.dedup_by_columns(&["codigo_pais"]);
        if duplicates > 0 {
            tracing::warn!(duplicates, "duplicate country codes dropped");
        }

        tracing::info!(rows = table.len(), "country reference transformed");
        table
    }
}
