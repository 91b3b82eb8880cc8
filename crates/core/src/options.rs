/// Which worksheet of a workbook to read.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SheetSelector {
    /// Zero-based sheet position.
    Index(usize),
    /// Exact sheet name.
    Name(String),
}

impl Default for SheetSelector {
    fn default() -> Self {
        Self::Index(0)
    }
}

impl std::fmt::Display for SheetSelector {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Index(i) => write!(f, "#{i}"),
            Self::Name(name) => write!(f, "'{name}'"),
        }
    }
}

/// How a domain wants its source files read.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReadOptions {
    /// Zero-based row holding column names; `None` means no header row.
    pub header: Option<usize>,
    /// Trailing data rows to discard (notes, totals, sources).
    pub skip_footer: usize,
    /// Sheet to read for workbook formats. Ignored for CSV.
    pub sheet: SheetSelector,
}

impl Default for ReadOptions {
    fn default() -> Self {
        Self {
            header: Some(0),
            skip_footer: 0,
            sheet: SheetSelector::default(),
        }
    }
}

impl ReadOptions {
    pub fn header(mut self, row: Option<usize>) -> Self {
        self.header = row;
        self
    }

    pub fn skip_footer(mut self, rows: usize) -> Self {
        self.skip_footer = rows;
        self
    }

    pub fn sheet_index(mut self, index: usize) -> Self {
        self.sheet = SheetSelector::Index(index);
        self
    }

    pub fn sheet_name(mut self, name: &str) -> Self {
        self.sheet = SheetSelector::Name(name.to_string());
        self
    }
}
