//! `statmirror` - mirrors statistical workbooks from a SharePoint library
//! into a local SQLite database, inserting only records not already loaded.

pub mod orchestrator;

pub use orchestrator::{FolderOutcome, Orchestrator, RuleOutcome, RunConfig, RunReport};
