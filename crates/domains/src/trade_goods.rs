//! Goods exports workbook ("OEE MA Exportaciones").
//!
//! The second sheet carries one row per product/country/department with a
//! measure column per period: `FOBDO24` is the 2024 FOB value in dollars,
//! `KNETO23EMZ` the January-March 2023 net weight. The rule pivots those
//! columns into one row per measure and period.

use std::sync::LazyLock;

use regex::Regex;
use statmirror_core::{ReadOptions, Table, Value};

use crate::cells::amount;
use crate::DomainRule;

/// Descriptive columns and their stored names.
const FIXED_COLUMNS: [(&str, &str); 16] = [
    ("NANDINA", "nandina"),
    ("partida", "partida"),
    ("TECNOLOGÍA", "tecnologia"),
    ("CLAS MIN", "clas_min"),
    ("DES CLAS MIN", "des_clas_min"),
    ("GRUPOS CLAS MIN", "grupos_clas_min"),
    ("MINEROS/NO MINEROS", "mineros_no_mineros"),
    ("CUCI_AGREGADO", "cuci_agregado"),
    ("PAIS", "cod_pais"),
    ("PAÍS", "pais"),
    ("GRUPO1", "grupo1"),
    ("GRUPO2", "grupo2"),
    ("GRUPO3", "grupo3"),
    ("DEPORIG", "deporig"),
    ("DEPARTAMENTO", "departamento"),
    ("región", "region"),
];

const KEY: &[&str] = &["nandina", "partida", "cod_pais", "deporig", "metrica", "anio", "periodo"];

/// Periodless measures are full-year figures.
const FULL_YEAR: &str = "ANUAL";

static MEASURE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^(FOBDO|KNETO)(\d{2})(\w*)$").expect("measure pattern"));

/// A parsed measure column name.
#[derive(Debug, Clone, PartialEq, Eq)]
struct Measure {
    metric: String,
    year: i64,
    period: String,
}

fn parse_measure(name: &str) -> Option<Measure> {
    let caps = MEASURE.captures(name)?;
    let year: i64 = caps[2].parse().ok()?;
    let period = match &caps[3] {
        "" => FULL_YEAR.to_string(),
        p => p.to_string(),
    };
    Some(Measure {
        metric: caps[1].to_string(),
        year: 2000 + year,
        period,
    })
}

pub struct GoodsExports;

impl DomainRule for GoodsExports {
    fn table_name(&self) -> &'static str {
        "oee_ma_exportaciones_bienes"
    }

    fn key_columns(&self) -> &'static [&'static str] {
        KEY
    }

    fn file_patterns(&self) -> &'static [&'static str] {
        &["OEE MA Exportaciones"]
    }

    fn read_options(&self) -> ReadOptions {
        ReadOptions::default().header(Some(0)).sheet_index(1)
    }

    fn transform(&self, raw: &Table) -> Table {
        let missing: Vec<&str> = FIXED_COLUMNS
            .iter()
            .map(|(source, _)| *source)
            .filter(|c| !raw.has_column(c))
            .collect();
        if !missing.is_empty() {
            tracing::warn!(?missing, "descriptive columns missing");
            return Table::empty();
        }

        let fixed: Vec<usize> = FIXED_COLUMNS
            .iter()
            .filter_map(|(source, _)| raw.column_index(source))
            .collect();

        let mut measures = Vec::new();
        for (i, name) in raw.columns().iter().enumerate() {
            if FIXED_COLUMNS.iter().any(|(source, _)| source == name) {
                continue;
            }
            match parse_measure(name) {
                Some(m) => measures.push((i, m)),
                None => tracing::warn!(column = %name, "unrecognised measure column dropped"),
            }
        }
        if measures.is_empty() {
            tracing::warn!("no measure columns to pivot");
            return Table::empty();
        }

        let mut columns: Vec<String> = FIXED_COLUMNS.iter().map(|(_, to)| to.to_string()).collect();
        columns.extend(["metrica", "anio", "periodo", "valor"].map(String::from));
        let mut out = Table::new(columns);

        for (col, measure) in &measures {
            for row in raw.rows() {
                let mut cells: Vec<Value> = fixed.iter().map(|&i| trim(&row[i])).collect();
                cells.push(Value::Text(measure.metric.clone()));
                cells.push(Value::Int(measure.year));
                cells.push(Value::Text(measure.period.clone()));
                cells.push(amount(&row[*col]));
                out.push_row(cells);
            }
        }

        let duplicates = out.dedup_by_columns(KEY);
        if duplicates > 0 {
            tracing::warn!(duplicates, "duplicate keys in export sheet");
        }
        out.sort_by_columns(KEY);

        tracing::info!(measures = measures.len(), rows = out.len(), "exports pivoted");
        out
    }
}

fn trim(value: &Value) -> Value {
    match value {
        Value::Text(s) => Value::Text(s.trim().to_string()),
        other => other.clone(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn raw(extra: &[&str], rows: Vec<(Vec<&str>, Vec<Value>)>) -> Table {
        let mut columns: Vec<String> = FIXED_COLUMNS.iter().map(|(s, _)| s.to_string()).collect();
        columns.extend(extra.iter().map(|c| c.to_string()));
        let rows = rows
            .into_iter()
            .map(|(fixed, values)| {
                let mut row: Vec<Value> = fixed.into_iter().map(Value::from).collect();
                row.resize(FIXED_COLUMNS.len(), Value::Null);
                row.extend(values);
                row
            })
            .collect();
        Table::with_rows(columns, rows)
    }

    fn fixed_row(nandina: &'static str, cod_pais: &'static str) -> Vec<&'static str> {
        let mut row = vec![""; FIXED_COLUMNS.len()];
        row[0] = nandina;
        row[1] = "0901";
        row[8] = cod_pais;
        row[9] = "Estados Unidos";
        row[13] = "05";
        row
    }

    #[test]
    fn measure_names() {
        assert_eq!(
            parse_measure("FOBDO24"),
            Some(Measure { metric: "FOBDO".into(), year: 2024, period: "ANUAL".into() })
        );
        assert_eq!(
            parse_measure("KNETO23EMZ"),
            Some(Measure { metric: "KNETO".into(), year: 2023, period: "EMZ".into() })
        );
        assert_eq!(parse_measure("FOBDO2024X!"), None);
        assert_eq!(parse_measure("TOTAL"), None);
    }

    #[test]
    fn pivots_measures_into_rows() {
        let table = raw(
            &["FOBDO24", "KNETO24EMZ"],
            vec![(fixed_row("0901110000", "249"), vec![Value::Float(1234.567), Value::Int(50)])],
        );

        let out = GoodsExports.transform(&table);

        assert_eq!(out.len(), 2);
        assert!(out.has_column("region"));
        assert!(!out.has_column("región"));
        assert_eq!(out.get(0, "metrica"), Some(&Value::Text("FOBDO".into())));
        assert_eq!(out.get(0, "anio"), Some(&Value::Int(2024)));
        assert_eq!(out.get(0, "periodo"), Some(&Value::Text("ANUAL".into())));
        assert_eq!(out.get(0, "valor"), Some(&Value::Float(1234.57)));
        assert_eq!(out.get(1, "periodo"), Some(&Value::Text("EMZ".into())));
        assert_eq!(out.get(1, "cod_pais"), Some(&Value::Text("249".into())));
    }

    #[test]
    fn unknown_measure_columns_are_dropped() {
        let table = raw(
            &["FOBDO24", "Observaciones"],
            vec![(fixed_row("0901110000", "249"), vec![Value::Int(10), "revisado".into()])],
        );
        let out = GoodsExports.transform(&table);
        assert_eq!(out.len(), 1);
        assert_eq!(out.get(0, "metrica"), Some(&Value::Text("FOBDO".into())));
    }

    #[test]
    fn non_numeric_value_is_null() {
        let table = raw(&["FOBDO24"], vec![(fixed_row("0901110000", "249"), vec!["-".into()])]);
        let out = GoodsExports.transform(&table);
        assert_eq!(out.get(0, "valor"), Some(&Value::Null));
    }

    #[test]
    fn duplicate_keys_keep_first_and_sort() {
        let table = raw(
            &["FOBDO24"],
            vec![
                (fixed_row("0901110000", "249"), vec![Value::Int(2)]),
                (fixed_row("0803901100", "249"), vec![Value::Int(3)]),
                (fixed_row("0901110000", "249"), vec![Value::Int(99)]),
            ],
        );
        let out = GoodsExports.transform(&table);
        assert_eq!(out.len(), 2);
        assert_eq!(out.get(0, "nandina"), Some(&Value::Text("0803901100".into())));
        assert_eq!(out.get(1, "valor"), Some(&Value::Float(2.0)));
    }

    #[test]
    fn missing_descriptive_column_yields_empty() {
        let table = Table::with_rows(
            vec!["NANDINA".into(), "FOBDO24".into()],
            vec![vec!["0901110000".into(), Value::Int(1)]],
        );
        assert!(GoodsExports.transform(&table).is_empty());
    }

    #[test]
    fn no_measure_yields_empty() {
        let table = raw(&[], vec![(fixed_row("0901110000", "249"), vec![])]);
        assert!(GoodsExports.transform(&table).is_empty());
    }
}
