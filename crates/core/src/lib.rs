//! `statmirror-core` - data model shared by every stage of the pipeline.
//!
//! Parsed spreadsheets, domain-transformed batches and persisted key sets
//! are all expressed as [`Table`]s of [`Value`]s.

pub mod options;
pub mod table;
pub mod value;

pub use options::{ReadOptions, SheetSelector};
pub use table::{Row, Table};
pub use value::Value;
