//! One loader run: folders → rules → files → one reconciled batch per rule.
//!
//! Everything is sequential. Failures are contained at the narrowest level:
//! a bad file is skipped, a failed rule fails its folder, a failed folder
//! never stops its siblings.

use std::collections::HashMap;

use serde::Serialize;
use statmirror_core::Table;
use statmirror_domains::{DomainRule, Registry};
use statmirror_io::clean_basic;
use statmirror_recon::{reconcile, TableStore};
use statmirror_remote::RemoteSource;

/// What to process.
#[derive(Debug, Clone, Default)]
pub struct RunConfig {
    /// Library folder whose subfolders are the domains.
    pub base_folder: String,
    /// Only these folders when non-empty.
    pub folders: Vec<String>,
}

/// Result of one rule over one folder.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RuleOutcome {
    pub table: String,
    /// Files whose name matched the rule's patterns.
    pub files_matched: usize,
    /// Files that contributed rows to the batch.
    pub files_used: usize,
    /// Rows in the combined batch.
    pub rows: usize,
    pub inserted: usize,
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl RuleOutcome {
    fn new(table: &str) -> Self {
        Self {
            table: table.to_string(),
            files_matched: 0,
            files_used: 0,
            rows: 0,
            inserted: 0,
            success: true,
            error: None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FolderOutcome {
    pub folder: String,
    /// All rules of the folder succeeded.
    pub success: bool,
    pub rules: Vec<RuleOutcome>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct RunReport {
    pub folders: Vec<FolderOutcome>,
    /// Folders found in the library with no rules registered.
    pub skipped: Vec<String>,
}

impl RunReport {
    pub fn succeeded(&self) -> usize {
        self.folders.iter().filter(|f| f.success).count()
    }

    pub fn total(&self) -> usize {
        self.folders.len()
    }

    pub fn inserted(&self) -> usize {
        self.folders
            .iter()
            .flat_map(|f| f.rules.iter())
            .map(|r| r.inserted)
            .sum()
    }
}

/// Drives a run against a remote source and a store.
pub struct Orchestrator<R, S> {
    config: RunConfig,
    source: R,
    store: S,
    registry: Registry,
}

impl<R: RemoteSource, S: TableStore> Orchestrator<R, S> {
    pub fn new(config: RunConfig, source: R, store: S, registry: Registry) -> Self {
        Self { config, source, store, registry }
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    pub fn into_store(self) -> S {
        self.store
    }

    /// Process every registered subfolder of the base folder, in listing order.
    pub fn run(&mut self) -> RunReport {
        let mut report = RunReport::default();
        let base = self.config.base_folder.clone();

        let folders = match self.source.list_folders(&base) {
            Ok(folders) => folders,
            Err(e) => {
                tracing::error!(folder = %base, error = %e, "cannot list base folder");
                return report;
            }
        };

        for folder in folders {
            if !self.config.folders.is_empty() && !self.config.folders.contains(&folder) {
                tracing::debug!(folder = %folder, "not selected");
                continue;
            }
            match self.run_folder(&folder) {
                Some(outcome) => report.folders.push(outcome),
                None => report.skipped.push(folder),
            }
        }

        for outcome in &report.folders {
            let inserted: usize = outcome.rules.iter().map(|r| r.inserted).sum();
            if outcome.success {
                tracing::info!(folder = %outcome.folder, inserted, "folder succeeded");
            } else {
                tracing::error!(folder = %outcome.folder, "folder failed");
            }
        }
        tracing::info!(
            succeeded = report.succeeded(),
            total = report.total(),
            skipped = report.skipped.len(),
            "run complete"
        );
        report
    }

    /// Process one folder of the base folder by name. `None` when no rule
    /// is registered for it.
    pub fn run_folder(&mut self, folder: &str) -> Option<FolderOutcome> {
        let Some(rules) = self.registry.rules_for(folder) else {
            tracing::warn!(folder, "no rules registered, skipping");
            return None;
        };
        let path = join_path(&self.config.base_folder, folder);
        tracing::info!(folder, rules = rules.len(), "processing folder");

        let files = match self.source.list_files(&path) {
            Ok(files) => files,
            Err(e) => {
                tracing::error!(folder, error = %e, "cannot list files");
                Vec::new()
            }
        };

        let mut downloads = Downloads::default();
        let mut outcomes = Vec::with_capacity(rules.len());
        for rule in rules {
            let outcome = load_rule(
                rule.as_ref(),
                &path,
                &files,
                &self.source,
                &mut self.store,
                &mut downloads,
            );
            outcomes.push(outcome);
        }

        Some(FolderOutcome {
            folder: folder.to_string(),
            success: outcomes.iter().all(|o| o.success),
            rules: outcomes,
        })
    }
}

/// File contents fetched for the current folder, shared by its rules.
/// A failed download is remembered as `None` and not retried.
#[derive(Default)]
struct Downloads(HashMap<String, Option<Vec<u8>>>);

impl Downloads {
    fn get<R: RemoteSource>(&mut self, source: &R, path: &str, name: &str) -> Option<&[u8]> {
        self.0
            .entry(name.to_string())
            .or_insert_with(|| match source.fetch_file(path, name) {
                Ok(bytes) => Some(bytes),
                Err(e) => {
                    tracing::error!(file = name, error = %e, "download failed, skipping file");
                    None
                }
            })
            .as_deref()
    }
}

fn load_rule<R: RemoteSource, S: TableStore>(
    rule: &dyn DomainRule,
    path: &str,
    files: &[String],
    source: &R,
    store: &mut S,
    downloads: &mut Downloads,
) -> RuleOutcome {
    let table_name = rule.table_name();
    let mut outcome = RuleOutcome::new(table_name);
    let options = rule.read_options();

    let matching: Vec<&String> = files.iter().filter(|f| rule.matches(f)).collect();
    outcome.files_matched = matching.len();
    if matching.is_empty() {
        tracing::info!(table = table_name, "no matching files");
        return outcome;
    }

    let mut parts = Vec::new();
    for name in matching {
        let Some(bytes) = downloads.get(source, path, name) else {
            continue;
        };
        let raw = match statmirror_io::parse(bytes, name, &options) {
            Ok(Some(raw)) => raw,
            Ok(None) => continue,
            Err(e) => {
                tracing::warn!(file = %name, table = table_name, error = %e, "cannot read file, skipping");
                continue;
            }
        };

        let transformed = rule.transform(&clean_basic(raw));
        if transformed.is_empty() {
            tracing::warn!(file = %name, table = table_name, "no usable rows");
            continue;
        }
        tracing::debug!(file = %name, table = table_name, rows = transformed.len(), "file transformed");
        parts.push(transformed);
    }

    outcome.files_used = parts.len();
    let batch = Table::concat(parts);
    outcome.rows = batch.len();
    if batch.is_empty() {
        tracing::warn!(table = table_name, "no valid data in folder");
        return outcome;
    }

    match reconcile(store, table_name, rule.key_columns(), batch) {
        Ok(report) => outcome.inserted = report.inserted,
        Err(e) => {
            tracing::error!(table = table_name, error = %e, "load failed");
            outcome.success = false;
            outcome.error = Some(e.to_string());
        }
    }
    outcome
}

fn join_path(base: &str, folder: &str) -> String {
    let base = base.trim_end_matches('/');
    if base.is_empty() {
        folder.to_string()
    } else {
        format!("{base}/{folder}")
    }
}
