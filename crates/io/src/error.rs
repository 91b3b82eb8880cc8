use std::fmt;

#[derive(Debug)]
pub enum ParseError {
    /// Workbook container could not be opened (corrupt or wrong format).
    Workbook(String),
    /// Requested sheet is not in the workbook.
    SheetNotFound { sheet: String, available: Vec<String> },
    /// Sheet exists but could not be read.
    Sheet { sheet: String, message: String },
    /// CSV decoding error.
    Csv(String),
}

impl fmt::Display for ParseError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Workbook(msg) => write!(f, "cannot open workbook: {msg}"),
            Self::SheetNotFound { sheet, available } => {
                write!(f, "sheet {sheet} not found (available: {})", available.join(", "))
            }
            Self::Sheet { sheet, message } => write!(f, "cannot read sheet '{sheet}': {message}"),
            Self::Csv(msg) => write!(f, "CSV error: {msg}"),
        }
    }
}

impl std::error::Error for ParseError {}

impl From<calamine::Error> for ParseError {
    fn from(e: calamine::Error) -> Self {
        Self::Workbook(e.to_string())
    }
}

impl From<::csv::Error> for ParseError {
    fn from(e: ::csv::Error) -> Self {
        Self::Csv(e.to_string())
    }
}
