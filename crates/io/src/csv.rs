// CSV/TSV reading into a positional grid

use statmirror_core::Value;

use crate::error::ParseError;
use crate::grid::Grid;

/// Decode, sniff the delimiter, and read every record as a grid row.
pub fn read_grid(bytes: &[u8]) -> Result<Grid, ParseError> {
    let content = decode_utf8(bytes);
    let delimiter = sniff_delimiter(&content);

    let mut reader = csv::ReaderBuilder::new()
        .delimiter(delimiter)
        .has_headers(false)
        .flexible(true)
        .from_reader(content.as_bytes());

    let mut grid = Grid::new();
    for result in reader.records() {
        let record = result?;
        grid.push(record.iter().map(infer_value).collect());
    }

    Ok(grid)
}

/// Pick the delimiter whose multi-field count repeats on the most of the
/// first ten lines. Comma when nothing splits.
fn sniff_delimiter(content: &str) -> u8 {
    const CANDIDATES: [u8; 4] = [b'\t', b';', b',', b'|'];
    let sample: Vec<&str> = content.lines().take(10).collect();

    let field_count = |line: &str, delimiter: u8| {
        csv::ReaderBuilder::new()
            .delimiter(delimiter)
            .has_headers(false)
            .flexible(true)
            .from_reader(line.as_bytes())
            .records()
            .next()
            .and_then(|r| r.ok())
            .map_or(1, |r| r.len())
    };

    // Lines agreeing with the widest split, weighted by that width
    let score = |delimiter: u8| {
        let counts: Vec<usize> = sample.iter().map(|line| field_count(line, delimiter)).collect();
        let widest = counts.iter().copied().filter(|&c| c > 1).max().unwrap_or(0);
        counts.iter().filter(|&&c| c == widest).count() * widest
    };

    let mut best = (b',', 0);
    for delimiter in CANDIDATES {
        let s = score(delimiter);
        if s > best.1 {
            best = (delimiter, s);
        }
    }
    best.0
}

/// Bytes as UTF-8 text, without a BOM.
fn decode_utf8(bytes: &[u8]) -> String {
    match std::str::from_utf8(bytes) {
        Ok(s) => s.strip_prefix('\u{feff}').unwrap_or(s).to_string(),
        Err(_) => {
            // Excel on Windows exports CP-1252
            let (decoded, _, _) = encoding_rs::WINDOWS_1252.decode(bytes);
            decoded.into_owned()
        }
    }
}

/// Type a raw CSV field. Codes with leading zeros stay text.
fn infer_value(field: &str) -> Value {
    let trimmed = field.trim();
    if trimmed.is_empty() {
        return Value::Null;
    }

    let digits = trimmed.trim_start_matches('-');
    let leading_zero = digits.len() > 1 && digits.starts_with('0') && !digits.starts_with("0.");
    if leading_zero {
        return Value::Text(field.to_string());
    }

    if let Ok(n) = trimmed.parse::<i64>() {
        return Value::Int(n);
    }
    match trimmed.parse::<f64>() {
        Ok(f) if f.is_finite() => Value::Float(f),
        _ => Value::Text(field.to_string()),
    }
}
