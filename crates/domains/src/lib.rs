//! `statmirror-domains` - what each source folder means.
//!
//! A [`DomainRule`] knows which files of a folder it wants, how to read
//! them, how to turn the raw sheet into rows of its target table, and which
//! columns identify a record. The [`Registry`] maps folder names to rules.

mod cells;
pub mod countries;
pub mod investment;
pub mod registry;
pub mod tourism;
pub mod trade_goods;
pub mod trade_services;

use statmirror_core::{ReadOptions, Table};

pub use registry::Registry;

/// One source-to-table mapping.
///
/// `transform` is pure and never fails: a table with nothing usable comes
/// back empty, which callers treat as "zero rows", not as an error.
pub trait DomainRule: Send + Sync {
    /// Target table in the store.
    fn table_name(&self) -> &'static str;

    /// Columns whose values identify one record of the target table.
    fn key_columns(&self) -> &'static [&'static str];

    /// Case-insensitive substrings; a file qualifies if any of them occurs
    /// in its name.
    fn file_patterns(&self) -> &'static [&'static str];

    fn read_options(&self) -> ReadOptions;

    fn transform(&self, raw: &Table) -> Table;

    fn matches(&self, file_name: &str) -> bool {
        let name = file_name.to_lowercase();
        self.file_patterns()
            .iter()
            .any(|p| name.contains(&p.to_lowercase()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct Probe;

    impl DomainRule for Probe {
        fn table_name(&self) -> &'static str {
            "probe"
        }
        fn key_columns(&self) -> &'static [&'static str] {
            &["id"]
        }
        fn file_patterns(&self) -> &'static [&'static str] {
            &["IDCE por país", "Datos_EMCES"]
        }
        fn read_options(&self) -> ReadOptions {
            ReadOptions::default()
        }
        fn transform(&self, raw: &Table) -> Table {
            raw.clone()
        }
    }

    #[test]
    fn matching_ignores_case() {
        assert!(Probe.matches("idce POR PAÍS destino 2024.xlsx"));
        assert!(Probe.matches("DATOS_emces_2023.csv"));
    }

    #[test]
    fn any_pattern_is_enough() {
        assert!(Probe.matches("Anexo Datos_EMCES.xlsx"));
        assert!(!Probe.matches("IDCE por pais destino.xlsx"));
        assert!(!Probe.matches("informe.pdf"));
    }
}
