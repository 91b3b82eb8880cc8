// Loader settings
// Loaded from ~/.config/statmirror/config.toml, then overridden by environment
// variables (a .env file in the working directory is read first).

use serde::Deserialize;
use std::fs;
use std::path::{Path, PathBuf};

const ENV_SITE_URL: &str = "SHAREPOINT_SITE_URL";
const ENV_USERNAME: &str = "SHAREPOINT_USERNAME";
const ENV_PASSWORD: &str = "SHAREPOINT_PASSWORD";
const ENV_TENANT: &str = "SHAREPOINT_TENANT";
const ENV_CLIENT_ID: &str = "SHAREPOINT_CLIENT_ID";
const ENV_ACCESS_TOKEN: &str = "SHAREPOINT_ACCESS_TOKEN";
const ENV_BASE_FOLDER: &str = "SHAREPOINT_BASE_FOLDER";
const ENV_DATABASE_PATH: &str = "DATABASE_PATH";
const ENV_LOGGING_LEVEL: &str = "LOGGING_LEVEL";
const ENV_LOGGING_FILE: &str = "LOGGING_FILE";

#[derive(Debug)]
pub enum ConfigError {
    /// Config file could not be read.
    Read { path: PathBuf, message: String },
    /// Config file is not valid TOML for [`Settings`].
    Parse { path: PathBuf, message: String },
    /// Required settings are absent; holds their environment variable names.
    Missing(Vec<&'static str>),
}

impl std::fmt::Display for ConfigError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Read { path, message } => write!(f, "cannot read {}: {}", path.display(), message),
            Self::Parse { path, message } => write!(f, "invalid config {}: {}", path.display(), message),
            Self::Missing(names) => write!(f, "missing required configuration: {}", names.join(", ")),
        }
    }
}

impl std::error::Error for ConfigError {}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct Settings {
    pub sharepoint: SharePointSettings,
    pub database: DatabaseSettings,
    pub logging: LoggingSettings,
}

#[derive(Clone, Deserialize)]
#[serde(default)]
pub struct SharePointSettings {
    pub site_url: Option<String>,
    pub username: Option<String>,
    pub password: Option<String>,
    pub tenant: String,
    pub client_id: Option<String>,
    pub access_token: Option<String>,
    /// Folder under the document library holding one subfolder per domain
    pub base_folder: String,
}

impl Default for SharePointSettings {
    fn default() -> Self {
        Self {
            site_url: None,
            username: None,
            password: None,
            tenant: "organizations".to_string(),
            client_id: None,
            access_token: None,
            base_folder: "Documentos Compartidos".to_string(),
        }
    }
}

impl std::fmt::Debug for SharePointSettings {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SharePointSettings")
            .field("site_url", &self.site_url)
            .field("username", &self.username)
            .field("password", &self.password.as_ref().map(|_| "***"))
            .field("tenant", &self.tenant)
            .field("client_id", &self.client_id)
            .field("access_token", &self.access_token.as_ref().map(|_| "***"))
            .field("base_folder", &self.base_folder)
            .finish()
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct DatabaseSettings {
    pub path: PathBuf,
}

impl Default for DatabaseSettings {
    fn default() -> Self {
        Self { path: PathBuf::from("statmirror.db") }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct LoggingSettings {
    /// Default filter when RUST_LOG is unset
    pub level: String,
    /// Log file; `None` logs to stderr only
    pub file: Option<PathBuf>,
}

impl Default for LoggingSettings {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            file: Some(PathBuf::from("logs/etl_process.log")),
        }
    }
}

/// SharePoint settings after validation: everything required is present.
#[derive(Clone)]
pub struct RemoteSettings {
    pub site_url: String,
    pub username: String,
    pub password: String,
    pub tenant: String,
    pub client_id: Option<String>,
    pub access_token: Option<String>,
    pub base_folder: String,
}

impl Settings {
    /// Default config file location
    pub fn config_path() -> PathBuf {
        dirs::config_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join("statmirror")
            .join("config.toml")
    }

    /// Load settings from `.env`, the config file and the process environment.
    ///
    /// An explicit `path` must exist; the default location is optional.
    pub fn load(path: Option<&Path>) -> Result<Self, ConfigError> {
        match dotenvy::dotenv() {
            Ok(env_path) => tracing::debug!(path = %env_path.display(), "loaded .env file"),
            Err(_) => tracing::debug!("no .env file"),
        }
        Self::load_with(path, |key| std::env::var(key).ok())
    }

    /// Like [`Settings::load`] with an explicit variable lookup and no `.env`.
    pub fn load_with(path: Option<&Path>, lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let mut settings = match path {
            Some(p) => Self::from_file(p)?,
            None => {
                let default = Self::config_path();
                if default.exists() {
                    Self::from_file(&default)?
                } else {
                    Self::default()
                }
            }
        };
        settings.apply_env(lookup);
        Ok(settings)
    }

    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let contents = fs::read_to_string(path).map_err(|e| ConfigError::Read {
            path: path.to_path_buf(),
            message: e.to_string(),
        })?;
        let settings = toml::from_str(&contents).map_err(|e: toml::de::Error| ConfigError::Parse {
            path: path.to_path_buf(),
            message: e.to_string(),
        })?;
        tracing::debug!(path = %path.display(), "loaded config file");
        Ok(settings)
    }

    /// Environment variables win over file values. Empty values clear
    /// optional settings.
    pub fn apply_env(&mut self, lookup: impl Fn(&str) -> Option<String>) {
        let sp = &mut self.sharepoint;
        if let Some(v) = lookup(ENV_SITE_URL) {
            sp.site_url = non_blank(v);
        }
        if let Some(v) = lookup(ENV_USERNAME) {
            sp.username = non_blank(v);
        }
        if let Some(v) = lookup(ENV_PASSWORD) {
            sp.password = non_blank(v);
        }
        if let Some(v) = lookup(ENV_TENANT).and_then(non_blank) {
            sp.tenant = v;
        }
        if let Some(v) = lookup(ENV_CLIENT_ID) {
            sp.client_id = non_blank(v);
        }
        if let Some(v) = lookup(ENV_ACCESS_TOKEN) {
            sp.access_token = non_blank(v);
        }
        if let Some(v) = lookup(ENV_BASE_FOLDER).and_then(non_blank) {
            sp.base_folder = v;
        }
        if let Some(v) = lookup(ENV_DATABASE_PATH).and_then(non_blank) {
            self.database.path = PathBuf::from(v);
        }
        if let Some(v) = lookup(ENV_LOGGING_LEVEL).and_then(non_blank) {
            self.logging.level = v;
        }
        if let Some(v) = lookup(ENV_LOGGING_FILE) {
            self.logging.file = non_blank(v).map(PathBuf::from);
        }
    }

    /// Check that every required SharePoint setting is present. The error
    /// lists all missing variables, not just the first.
    pub fn validate(&self) -> Result<RemoteSettings, ConfigError> {
        let sp = &self.sharepoint;
        let present = |v: &Option<String>| v.as_deref().is_some_and(|s| !s.trim().is_empty());

        let mut missing = Vec::new();
        if !present(&sp.site_url) {
            missing.push(ENV_SITE_URL);
        }
        if !present(&sp.username) {
            missing.push(ENV_USERNAME);
        }
        if !present(&sp.password) {
            missing.push(ENV_PASSWORD);
        }
        if !present(&sp.access_token) && !present(&sp.client_id) {
            missing.push(ENV_CLIENT_ID);
        }
        if !missing.is_empty() {
            return Err(ConfigError::Missing(missing));
        }

        Ok(RemoteSettings {
            site_url: sp.site_url.clone().unwrap_or_default(),
            username: sp.username.clone().unwrap_or_default(),
            password: sp.password.clone().unwrap_or_default(),
            tenant: sp.tenant.clone(),
            client_id: sp.client_id.clone(),
            access_token: sp.access_token.clone(),
            base_folder: sp.base_folder.clone(),
        })
    }
}

fn non_blank(v: String) -> Option<String> {
    let trimmed = v.trim();
    if trimmed.is_empty() {
        None
    } else {
        Some(trimmed.to_string())
    }
}
