//! `statmirror-recon` - incremental-load reconciliation.
//!
//! Decides which rows of a transformed batch are new relative to a
//! persisted table, using the domain's composite key, and inserts only
//! those, atomically.

pub mod engine;
pub mod error;
pub mod fingerprint;
pub mod store;

pub use engine::{reconcile, LoadReport};
pub use error::{ReconError, StoreError};
pub use fingerprint::fingerprint;
pub use store::{ColumnInfo, SqliteStore, TableInfo, TableStore, LOADED_AT_COLUMN};
