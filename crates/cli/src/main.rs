// statmirror CLI - load new rows from the shared statistics library

mod exit_codes;
mod logging;

use std::path::{Path, PathBuf};
use std::process::ExitCode;

use clap::{Parser, Subcommand};
use statmirror_cli::{Orchestrator, RunConfig, RunReport};
use statmirror_config::{ConfigError, RemoteSettings, Settings};
use statmirror_domains::Registry;
use statmirror_recon::{SqliteStore, TableInfo, TableStore};
use statmirror_remote::{Credentials, SharePointClient};

use exit_codes::{EXIT_ERROR, EXIT_SUCCESS, EXIT_USAGE};

#[derive(Parser)]
#[command(name = "statmirror")]
#[command(about = "Mirror statistical workbooks from SharePoint into SQLite, loading only new records")]
#[command(version)]
#[command(subcommand_required = false)]
struct Cli {
    /// Config file (default: <config dir>/statmirror/config.toml)
    #[arg(long, global = true, env = "STATMIRROR_CONFIG")]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Load every registered folder (the default command)
    #[command(after_help = "\
Examples:
  statmirror run
  statmirror run --folder 3-Inversion --folder Ajustes
  statmirror run --json > last_run.json")]
    Run {
        /// Only process this folder (repeatable)
        #[arg(long = "folder", value_name = "NAME")]
        folders: Vec<String>,

        /// Print the run report as JSON on stdout
        #[arg(long)]
        json: bool,
    },

    /// List registered folders, target tables, keys and file patterns
    Domains,

    /// Validate configuration without connecting anywhere
    Check,

    /// Show row counts and columns of mirrored tables
    #[command(after_help = "\
Examples:
  statmirror tables
  statmirror tables codigo_pais_acuerdos --json")]
    Tables {
        /// Tables to describe (default: all)
        names: Vec<String>,

        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    let config = cli.config.as_deref();

    let result = match cli.command {
        None => cmd_run(config, Vec::new(), false),
        Some(Commands::Run { folders, json }) => cmd_run(config, folders, json),
        Some(Commands::Domains) => cmd_domains(),
        Some(Commands::Check) => cmd_check(config),
        Some(Commands::Tables { names, json }) => cmd_tables(config, names, json),
    };

    match result {
        Ok(()) => ExitCode::from(EXIT_SUCCESS),
        Err(CliError { code, message, hint }) => {
            if !message.is_empty() {
                eprintln!("error: {}", message);
            }
            if let Some(hint) = hint {
                eprintln!("hint:  {}", hint);
            }
            ExitCode::from(code)
        }
    }
}

#[derive(Debug)]
pub struct CliError {
    pub code: u8,
    pub message: String,
    pub hint: Option<String>,
}

impl CliError {
    pub fn error(msg: impl Into<String>) -> Self {
        Self { code: EXIT_ERROR, message: msg.into(), hint: None }
    }

    pub fn usage(msg: impl Into<String>) -> Self {
        Self { code: EXIT_USAGE, message: msg.into(), hint: None }
    }

    pub fn with_hint(mut self, hint: impl Into<String>) -> Self {
        self.hint = Some(hint.into());
        self
    }
}

impl From<ConfigError> for CliError {
    fn from(err: ConfigError) -> Self {
        match err {
            ConfigError::Missing(names) => {
                // One line per key, the message itself stays empty
                for name in &names {
                    eprintln!("error: {name} is not configured");
                }
                Self::error("").with_hint("set it in the environment, a .env file, or the config file")
            }
            other => Self::error(other.to_string()),
        }
    }
}

// ============================================================================
// run
// ============================================================================

fn cmd_run(config: Option<&Path>, folders: Vec<String>, json: bool) -> Result<(), CliError> {
    let settings = Settings::load(config)?;
    logging::init(&settings.logging.level, settings.logging.file.as_deref())?;
    let remote = settings.validate()?;

    let registry = Registry::standard();
    if let Some(unknown) = folders.iter().find(|f| registry.rules_for(f).is_none()) {
        return Err(CliError::usage(format!("no rules registered for folder '{unknown}'"))
            .with_hint("run `statmirror domains` to list known folders"));
    }

    let store = SqliteStore::open(&settings.database.path).map_err(|e| {
        CliError::error(format!("cannot open database: {e}"))
            .with_hint("check DATABASE_PATH and that its directory is writable")
    })?;
    let client = SharePointClient::new(&remote.site_url, credentials(&remote))
        .map_err(|e| CliError::error(e.to_string()).with_hint("check SHAREPOINT_SITE_URL"))?;

    tracing::info!(
        site = %remote.site_url,
        base_folder = %remote.base_folder,
        database = %settings.database.path.display(),
        "starting run"
    );

    let run_config = RunConfig { base_folder: remote.base_folder.clone(), folders };
    let mut orchestrator = Orchestrator::new(run_config, client, store, registry);
    let report = orchestrator.run();

    if json {
        let out = serde_json::to_string_pretty(&report)
            .map_err(|e| CliError::error(format!("cannot serialise report: {e}")))?;
        println!("{out}");
    } else {
        print_summary(&report);
    }
    Ok(())
}

fn credentials(remote: &RemoteSettings) -> Credentials {
    let mut creds = Credentials::new(remote.username.clone(), remote.password.clone());
    creds.tenant = remote.tenant.clone();
    creds.client_id = remote.client_id.clone();
    creds.access_token = remote.access_token.clone();
    creds
}

fn print_summary(report: &RunReport) {
    println!("ETL completed: {}/{} folders succeeded", report.succeeded(), report.total());
    for folder in &report.folders {
        let inserted: usize = folder.rules.iter().map(|r| r.inserted).sum();
        if folder.success {
            println!("  ok      {} ({} new rows)", folder.folder, inserted);
        } else {
            println!("  FAILED  {}", folder.folder);
            for rule in folder.rules.iter().filter(|r| !r.success) {
                println!("          {}: {}", rule.table, rule.error.as_deref().unwrap_or("unknown error"));
            }
        }
    }
    for folder in &report.skipped {
        println!("  skipped {} (no rules)", folder);
    }
}

// ============================================================================
// domains / check / tables
// ============================================================================

fn cmd_domains() -> Result<(), CliError> {
    let registry = Registry::standard();
    for (folder, rules) in registry.folders() {
        println!("{folder}");
        for rule in rules {
            println!("  {}", rule.table_name());
            println!("    key:   {}", rule.key_columns().join(", "));
            println!("    files: {}", rule.file_patterns().join(" | "));
        }
    }
    Ok(())
}

fn cmd_check(config: Option<&Path>) -> Result<(), CliError> {
    let settings = Settings::load(config)?;
    let remote = settings.validate()?;

    let auth = if remote.access_token.is_some() { "access token" } else { "password grant" };
    println!("configuration OK");
    println!("  site:        {}", remote.site_url);
    println!("  base folder: {}", remote.base_folder);
    println!("  auth:        {} (tenant {})", auth, remote.tenant);
    println!("  database:    {}", settings.database.path.display());
    match &settings.logging.file {
        Some(file) => println!("  log:         {} ({})", file.display(), settings.logging.level),
        None => println!("  log:         stderr ({})", settings.logging.level),
    }
    Ok(())
}

fn cmd_tables(config: Option<&Path>, names: Vec<String>, json: bool) -> Result<(), CliError> {
    let settings = Settings::load(config)?;
    let path = &settings.database.path;
    if !path.exists() {
        return Err(CliError::error(format!("database not found: {}", path.display()))
            .with_hint("run `statmirror run` first"));
    }
    let store = SqliteStore::open(path).map_err(|e| CliError::error(format!("cannot open database: {e}")))?;

    let names = if names.is_empty() {
        store.table_names().map_err(|e| CliError::error(e.to_string()))?
    } else {
        names
    };

    let mut infos: Vec<TableInfo> = Vec::with_capacity(names.len());
    for name in &names {
        match store.describe(name).map_err(|e| CliError::error(e.to_string()))? {
            Some(info) => infos.push(info),
            None => return Err(CliError::usage(format!("no such table: {name}"))),
        }
    }

    if json {
        let out = serde_json::to_string_pretty(&infos)
            .map_err(|e| CliError::error(format!("cannot serialise tables: {e}")))?;
        println!("{out}");
        return Ok(());
    }

    if infos.is_empty() {
        println!("no tables");
    }
    for info in &infos {
        println!("{} ({} rows)", info.name, info.rows);
        for column in &info.columns {
            println!("  {:<28} {}", column.name, column.sql_type);
        }
    }
    Ok(())
}
