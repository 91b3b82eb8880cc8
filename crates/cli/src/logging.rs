// Tracing subscriber for the binary: stderr plus an optional log file

use std::fs::{self, OpenOptions};
use std::path::Path;
use std::sync::Mutex;

use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use crate::CliError;

/// Install the global subscriber. `RUST_LOG` wins over `level`.
pub fn init(level: &str, file: Option<&Path>) -> Result<(), CliError> {
    let filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(level.trim().to_lowercase()))
        .map_err(|e| CliError::error(format!("invalid log level '{level}': {e}")))?;

    let file_layer = match file {
        Some(path) => {
            if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
                fs::create_dir_all(parent).map_err(|e| {
                    CliError::error(format!("cannot create log directory {}: {e}", parent.display()))
                })?;
            }
            let log = OpenOptions::new()
                .create(true)
                .append(true)
                .open(path)
                .map_err(|e| CliError::error(format!("cannot open log file {}: {e}", path.display())))?;
            Some(fmt::layer().with_ansi(false).with_writer(Mutex::new(log)))
        }
        None => None,
    };

    tracing_subscriber::registry()
        .with(filter)
        .with(fmt::layer().with_writer(std::io::stderr).with_target(false))
        .with(file_layer)
        .try_init()
        .map_err(|e| CliError::error(format!("cannot install logger: {e}")))
}
