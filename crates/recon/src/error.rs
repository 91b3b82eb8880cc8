use std::fmt;

/// Failure talking to the persistent store.
#[derive(Debug)]
pub enum StoreError {
    /// Database file could not be opened.
    Open { path: String, message: String },
    /// Filesystem error preparing the database location.
    Io(String),
    /// SQL statement failed.
    Sql(String),
    /// A key value would be altered by a numeric key column's type.
    KeyCoercion { table: String, column: String, value: String },
}

impl fmt::Display for StoreError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Open { path, message } => write!(f, "cannot open database '{path}': {message}"),
            Self::Io(msg) => write!(f, "IO error: {msg}"),
            Self::Sql(msg) => write!(f, "database error: {msg}"),
            Self::KeyCoercion { table, column, value } => write!(
                f,
                "table '{table}': key column '{column}' is numeric and would store '{value}' differently"
            ),
        }
    }
}

impl std::error::Error for StoreError {}

impl From<rusqlite::Error> for StoreError {
    fn from(e: rusqlite::Error) -> Self {
        Self::Sql(e.to_string())
    }
}

impl From<std::io::Error> for StoreError {
    fn from(e: std::io::Error) -> Self {
        Self::Io(e.to_string())
    }
}

#[derive(Debug)]
pub enum ReconError {
    /// Reconcile was called with no key columns.
    EmptyKey { table: String },
    /// Key columns absent from the batch.
    MissingKeyColumns { table: String, missing: Vec<String> },
    /// Existence check, key fetch or insert failed. Nothing was written.
    Store(StoreError),
}

impl fmt::Display for ReconError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::EmptyKey { table } => write!(f, "table '{table}': key has no columns"),
            Self::MissingKeyColumns { table, missing } => {
                write!(f, "table '{table}': key column(s) missing from batch: {}", missing.join(", "))
            }
            Self::Store(e) => write!(f, "{e}"),
        }
    }
}

impl std::error::Error for ReconError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::Store(e) => Some(e),
            _ => None,
        }
    }
}

impl From<StoreError> for ReconError {
    fn from(e: StoreError) -> Self {
        Self::Store(e)
    }
}
