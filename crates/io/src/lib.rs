// Source file parsing: raw bytes in, cleaned tables out

pub mod clean;
pub mod csv;
pub mod error;
pub mod grid;
pub mod xlsx;

use statmirror_core::{ReadOptions, Table};

pub use clean::clean_basic;
pub use error::ParseError;

/// File formats the parser understands, keyed by extension.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SourceFormat {
    Workbook,
    Csv,
}

impl SourceFormat {
    pub fn from_file_name(name: &str) -> Option<Self> {
        let ext = name.rsplit_once('.')?.1.to_ascii_lowercase();
        match ext.as_str() {
            "xlsx" | "xlsm" | "xls" | "xlsb" | "ods" => Some(Self::Workbook),
            "csv" => Some(Self::Csv),
            _ => None,
        }
    }
}

/// Parse a downloaded file into a table.
///
/// Returns `Ok(None)` for unsupported extensions so callers can skip the
/// file without treating it as an error.
pub fn parse(bytes: &[u8], file_name: &str, options: &ReadOptions) -> Result<Option<Table>, ParseError> {
    let Some(format) = SourceFormat::from_file_name(file_name) else {
        tracing::warn!(file = file_name, "unsupported file type, skipping");
        return Ok(None);
    };

    let grid = match format {
        SourceFormat::Workbook => xlsx::read_grid(bytes, &options.sheet)?,
        SourceFormat::Csv => csv::read_grid(bytes)?,
    };

    let table = grid::to_table(grid, options);
    tracing::info!(
        file = file_name,
        rows = table.len(),
        columns = table.width(),
        "file read"
    );
    Ok(Some(table))
}
