// Workbook reading (xlsx, xlsm, xls, xlsb, ods) via calamine
//
// Files arrive as downloaded bytes, so the workbook is opened from memory.
// Cells are placed at their absolute position: a sheet whose data starts at
// C5 still yields a grid whose row 0 is the sheet's first row, so header
// row indices match what a user sees in Excel.

use std::io::Cursor;

use calamine::{open_workbook_auto_from_rs, Data, Reader};
use chrono::{Days, NaiveDate};
use statmirror_core::{SheetSelector, Value};

use crate::error::ParseError;
use crate::grid::Grid;

/// Read one sheet of a workbook into a positional grid.
pub fn read_grid(bytes: &[u8], selector: &SheetSelector) -> Result<Grid, ParseError> {
    let mut workbook = open_workbook_auto_from_rs(Cursor::new(bytes))?;
    let sheet_names = workbook.sheet_names();

    let sheet_name = match selector {
        SheetSelector::Index(i) => sheet_names.get(*i).cloned(),
        SheetSelector::Name(name) => sheet_names.iter().find(|s| *s == name).cloned(),
    };
    let Some(sheet_name) = sheet_name else {
        return Err(ParseError::SheetNotFound {
            sheet: selector.to_string(),
            available: sheet_names,
        });
    };

    let range = workbook
        .worksheet_range(&sheet_name)
        .map_err(|e| ParseError::Sheet {
            sheet: sheet_name.clone(),
            message: e.to_string(),
        })?;

    // Range start offset (data may not begin at A1)
    let (start_row, start_col) = range.start().unwrap_or((0, 0));
    let (start_row, start_col) = (start_row as usize, start_col as usize);

    let mut grid: Grid = vec![Vec::new(); start_row];
    for row in range.rows() {
        let mut cells = vec![Value::Null; start_col];
        cells.extend(row.iter().map(cell_value));
        grid.push(cells);
    }

    tracing::debug!(
        sheet = %sheet_name,
        rows = grid.len(),
        "sheet loaded"
    );
    Ok(grid)
}

fn cell_value(cell: &Data) -> Value {
    match cell {
        Data::Empty => Value::Null,
        Data::String(s) => {
            if s.is_empty() {
                Value::Null
            } else {
                Value::Text(s.clone())
            }
        }
        Data::Float(n) => float_value(*n),
        Data::Int(n) => Value::Int(*n),
        Data::Bool(b) => Value::Bool(*b),
        // Error cells (#N/A, #REF!) carry no data
        Data::Error(_) => Value::Null,
        Data::DateTime(dt) => serial_to_date(dt.as_f64()).map(Value::Date).unwrap_or(Value::Null),
        Data::DateTimeIso(s) => s
            .get(..10)
            .and_then(|d| NaiveDate::parse_from_str(d, "%Y-%m-%d").ok())
            .map(Value::Date)
            .unwrap_or_else(|| Value::Text(s.clone())),
        Data::DurationIso(s) => Value::Text(s.clone()),
    }
}

/// Integral floats come back as integers so codes like 170 stay `170`.
fn float_value(n: f64) -> Value {
    if n.is_finite() && n.fract() == 0.0 && n.abs() < 1e15 {
        Value::Int(n as i64)
    } else {
        Value::Float(n)
    }
}

/// Excel serial day number (1900 system) to a calendar date. The time of
/// day is dropped.
pub(crate) fn serial_to_date(serial: f64) -> Option<NaiveDate> {
    if !serial.is_finite() || serial < 0.0 {
        return None;
    }
    // 1899-12-30 absorbs Excel's phantom 1900-02-29
    let epoch = NaiveDate::from_ymd_opt(1899, 12, 30)?;
    epoch.checked_add_days(Days::new(serial.floor() as u64))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn serial_dates() {
        assert_eq!(serial_to_date(45292.0), NaiveDate::from_ymd_opt(2024, 1, 1));
        assert_eq!(serial_to_date(45292.75), NaiveDate::from_ymd_opt(2024, 1, 1));
        assert_eq!(serial_to_date(61.0), NaiveDate::from_ymd_opt(1900, 3, 1));
        assert_eq!(serial_to_date(-1.0), None);
    }

    #[test]
    fn integral_floats_become_ints() {
        assert_eq!(cell_value(&Data::Float(170.0)), Value::Int(170));
        assert_eq!(cell_value(&Data::Float(0.5)), Value::Float(0.5));
        assert_eq!(cell_value(&Data::String(String::new())), Value::Null);
        assert_eq!(cell_value(&Data::Empty), Value::Null);
    }

    #[test]
    fn iso_datetime_keeps_date_part() {
        let v = cell_value(&Data::DateTimeIso("2023-06-30T00:00:00".into()));
        assert_eq!(v, Value::Date(NaiveDate::from_ymd_opt(2023, 6, 30).unwrap()));
    }

    #[test]
    fn garbage_bytes_are_a_workbook_error() {
        let err = read_grid(b"definitely not a workbook", &SheetSelector::default()).unwrap_err();
        assert!(matches!(err, ParseError::Workbook(_)));
    }
}
