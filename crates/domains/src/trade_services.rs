//! Services trade extract (DANE EMCES).

use statmirror_core::{ReadOptions, Table, Value};

use crate::cells::{is_placeholder, map_and_select, text};
use crate::DomainRule;

const HEADER_MAPPING: &[(&str, &str)] = &[
    ("FLUJO_COMERCIAL", "flujo_comercial"),
    ("PERIODO_MES", "periodo_mes"),
    ("CÓDIGO", "codigo"),
    ("CODIGO", "codigo"),
    ("DESCRIPCION_CABPS", "descripcion_cabps"),
    ("PAÍS", "pais"),
    ("PAIS", "pais"),
    ("NOMBRE_PAÍS", "nombre_pais"),
    ("NOMBRE_PAIS", "nombre_pais"),
    ("DEPARTAMENTO", "departamento"),
    ("NOMBRE_DEPARTAMENTO", "nombre_departamento"),
    ("TOTAL_EN_MILES_DE_DOLARES", "total_miles_dolares"),
];

const COLUMNS: &[&str] = &[
    "flujo_comercial",
    "periodo_mes",
    "codigo",
    "descripcion_cabps",
    "pais",
    "nombre_pais",
    "departamento",
    "nombre_departamento",
    "total_miles_dolares",
];

const UPPERCASED: &[&str] = &["flujo_comercial", "descripcion_cabps", "nombre_pais", "nombre_departamento"];

const VALID_FLOWS: &[&str] = &[
    "EXPORTACIONES",
    "IMPORTACIONES",
    "EXPORTACIÓN",
    "IMPORTACIÓN",
    "EXPORTACION",
    "IMPORTACION",
];

/// Target name for a header that matched no exact mapping, by keyword.
fn keyword_target(header: &str) -> Option<&'static str> {
    let h = header.trim().to_uppercase();
    let has = |k: &str| h.contains(k);
    let country = has("PAÍS") || has("PAIS");

    if has("FLUJO") || has("COMERCIAL") {
        Some("flujo_comercial")
    } else if has("PERIODO") || has("MES") {
        Some("periodo_mes")
    } else if has("CÓDIGO") || has("CODIGO") {
        Some("codigo")
    } else if has("DESCRIPCION") || has("CABPS") {
        Some("descripcion_cabps")
    } else if country && !has("NOMBRE") {
        Some("pais")
    } else if country {
        Some("nombre_pais")
    } else if has("DEPARTAMENTO") && !has("NOMBRE") {
        Some("departamento")
    } else if has("DEPARTAMENTO") {
        Some("nombre_departamento")
    } else if has("TOTAL") || has("MILES") || has("DOLARES") {
        Some("total_miles_dolares")
    } else {
        None
    }
}

/// Amount in thousands of dollars; a decimal comma is accepted.
fn thousands(value: &Value) -> Option<f64> {
    match value {
        Value::Text(s) => s.trim().replace(',', ".").parse::<f64>().ok().filter(|f| f.is_finite()),
        other => other.as_f64(),
    }
}

pub struct ServicesTrade;

impl DomainRule for ServicesTrade {
    fn table_name(&self) -> &'static str {
        "emces_servicios"
    }

    fn key_columns(&self) -> &'static [&'static str] {
        &["flujo_comercial", "periodo_mes", "codigo", "pais", "departamento"]
    }

    fn file_patterns(&self) -> &'static [&'static str] {
        &["DANE", "Datos_EMCES", "xlsx"]
    }

    fn read_options(&self) -> ReadOptions {
        ReadOptions::default().header(Some(6))
    }

    fn transform(&self, raw: &Table) -> Table {
        let mut source = raw.clone();
        // Notes below the data leave the first column blank
        let notes = source.retain_rows(|row| row.first().is_some_and(|v| !v.is_blank()));
        if notes > 0 {
            tracing::debug!(rows = notes, "trailing note rows dropped");
        }

        let exact: Vec<(&str, &str)> = HEADER_MAPPING
            .iter()
            .copied()
            .filter(|(from, _)| source.has_column(from))
            .collect();

        let mapping: Vec<(String, &str)> = if exact.is_empty() {
            tracing::warn!("no exact header match, falling back to keyword mapping");
            source
                .columns()
                .iter()
                .filter_map(|c| keyword_target(c).map(|t| (c.clone(), t)))
                .collect()
        } else {
            exact.iter().map(|(f, t)| (f.to_string(), *t)).collect()
        };
        let mapping: Vec<(&str, &str)> = mapping.iter().map(|(f, t)| (f.as_str(), *t)).collect();

        let mut table = map_and_select(&source, &mapping, COLUMNS);
        if table.width() == 0 {
            return table;
        }

        if let Some(idx) = table.column_index("total_miles_dolares") {
            table.map_column("total_miles_dolares", |v| thousands(v).map(Value::Float).unwrap_or(Value::Null));
            let dropped = table.retain_rows(|row| !row[idx].is_null());
            if dropped > 0 {
                tracing::info!(rows = dropped, "rows without amount dropped");
            }
        }

        if let Some(idx) = table.column_index("codigo") {
            table.map_column("codigo", |v| text(v).map(Value::Text).unwrap_or(Value::Null));
            let dropped = table.retain_rows(|row| !is_placeholder(row[idx].text().as_str()));
            if dropped > 0 {
                tracing::info!(rows = dropped, "rows without service code dropped");
            }
        }

        for column in UPPERCASED {
            table.map_column(column, |v| match text(v) {
                Some(s) => Value::Text(s.to_uppercase()),
                None => Value::Null,
            });
        }

        if let Some(idx) = table.column_index("flujo_comercial") {
            let dropped = table.retain_rows(|row| VALID_FLOWS.contains(&row[idx].text().as_str()));
            if dropped > 0 {
                tracing::info!(rows = dropped, "rows with unknown trade flow dropped");
            }
        }

        tracing::info!(rows = table.len(), columns = table.width(), "services trade transformed");
        table
    }
}
