// Positional cell grid -> named table, honouring header row and footer rows

use std::collections::HashMap;

use statmirror_core::{ReadOptions, Table, Value};

/// Rows of cells addressed from absolute row/column 0.
pub type Grid = Vec<Vec<Value>>;

/// Apply header and footer options to a raw grid.
///
/// With a header row, its cells become column names and only the rows
/// below it are data. Without one, columns are named by position.
pub fn to_table(mut grid: Grid, options: &ReadOptions) -> Table {
    let width = grid.iter().map(|r| r.len()).max().unwrap_or(0);

    let (columns, mut data) = match options.header {
        Some(header_row) => {
            if header_row >= grid.len() {
                return Table::empty();
            }
            let data = grid.split_off(header_row + 1);
            let header = grid.pop().unwrap_or_default();
            (header_names(&header, width), data)
        }
        None => ((0..width).map(|i| i.to_string()).collect(), grid),
    };

    let keep = data.len().saturating_sub(options.skip_footer);
    data.truncate(keep);

    Table::with_rows(columns, data)
}

/// Column names from a header row: blank cells become `Unnamed: <i>`,
/// repeated names get `.1`, `.2`, ... suffixes.
fn header_names(header: &[Value], width: usize) -> Vec<String> {
    let mut seen: HashMap<String, usize> = HashMap::new();
    let mut names = Vec::with_capacity(width);

    for i in 0..width {
        let base = match header.get(i) {
            Some(v) if !v.is_blank() => v.text().trim().to_string(),
            _ => format!("Unnamed: {i}"),
        };
        let count = seen.entry(base.clone()).or_insert(0);
        let name = if *count == 0 { base.clone() } else { format!("{base}.{count}") };
        *count += 1;
        names.push(name);
    }

    names
}
