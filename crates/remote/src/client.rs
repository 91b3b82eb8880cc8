//! SharePoint REST client (blocking).
//!
//! Folder paths are relative to the site's document library. The bearer
//! token is acquired on the first request and reused afterwards.

use std::cell::RefCell;
use std::time::Duration;

use serde::Deserialize;

use crate::auth::{acquire_token, Credentials, DEFAULT_LOGIN_BASE};
use crate::error::RemoteError;
use crate::RemoteSource;

const ACCEPT_JSON: &str = "application/json;odata=nometadata";

/// SharePoint document library client.
pub struct SharePointClient {
    http: reqwest::blocking::Client,
    /// Site URL without trailing slash
    site_url: String,
    /// Scheme and host of the site, the token audience
    origin: String,
    /// Server-relative path of the library root, e.g. `/sites/OEE/Shared Documents`
    library_root: String,
    login_base: String,
    creds: Credentials,
    token: RefCell<Option<String>>,
}

#[derive(Debug, Deserialize)]
struct ListResponse {
    value: Vec<ListEntry>,
}

#[derive(Debug, Deserialize)]
struct ListEntry {
    #[serde(rename = "Name")]
    name: String,
}

impl SharePointClient {
    pub fn new(site_url: &str, creds: Credentials) -> Result<Self, RemoteError> {
        Self::with_login_base(site_url, creds, DEFAULT_LOGIN_BASE)
    }

    /// Like [`SharePointClient::new`] with a different identity endpoint.
    pub fn with_login_base(site_url: &str, creds: Credentials, login_base: &str) -> Result<Self, RemoteError> {
        let parsed = reqwest::Url::parse(site_url).map_err(|e| RemoteError::InvalidUrl(format!("{site_url}: {e}")))?;
        let host = parsed
            .host_str()
            .ok_or_else(|| RemoteError::InvalidUrl(format!("{site_url}: no host")))?;
        let origin = match parsed.port() {
            Some(port) => format!("{}://{}:{}", parsed.scheme(), host, port),
            None => format!("{}://{}", parsed.scheme(), host),
        };

        let site_path = parsed.path().trim_end_matches('/').to_string();
        // Personal (OneDrive) sites name their library "Documents"
        let library = if site_path.contains("/personal/") { "Documents" } else { "Shared Documents" };

        let http = reqwest::blocking::Client::builder()
            .user_agent(format!("statmirror/{}", env!("CARGO_PKG_VERSION")))
            .timeout(Duration::from_secs(120))
            .build()
            .map_err(|e| RemoteError::Network(e.to_string()))?;

        Ok(Self {
            http,
            site_url: site_url.trim_end_matches('/').to_string(),
            origin,
            library_root: format!("{site_path}/{library}"),
            login_base: login_base.to_string(),
            creds,
            token: RefCell::new(None),
        })
    }

    /// Server-relative path of a library folder.
    pub fn folder_path(&self, folder: &str) -> String {
        let folder = folder.trim_matches('/');
        if folder.is_empty() {
            self.library_root.clone()
        } else {
            format!("{}/{}", self.library_root, folder)
        }
    }

    // ── Internal helpers ────────────────────────────────────────────

    fn bearer(&self) -> Result<String, RemoteError> {
        if let Some(token) = self.token.borrow().as_ref() {
            return Ok(token.clone());
        }
        let token = acquire_token(&self.http, &self.login_base, &self.creds, &self.origin)?;
        tracing::info!(site = %self.site_url, "SharePoint session established");
        *self.token.borrow_mut() = Some(token.clone());
        Ok(token)
    }

    /// GET `_api/web/<endpoint>` with the server-relative path bound to `@a1`.
    fn get(&self, endpoint: &str, server_relative: &str) -> Result<reqwest::blocking::Response, RemoteError> {
        let token = self.bearer()?;
        let url = format!(
            "{}/_api/web/{}?@a1='{}'",
            self.site_url,
            endpoint,
            urlencoding::encode(&server_relative.replace('\'', "''"))
        );

        let response = self
            .http
            .get(&url)
            .bearer_auth(&token)
            .header("Accept", ACCEPT_JSON)
            .send()
            .map_err(|e| RemoteError::Network(e.to_string()))?;

        let status = response.status().as_u16();
        if !response.status().is_success() {
            let body = response.text().unwrap_or_default();
            return Err(RemoteError::Http(status, body));
        }

        Ok(response)
    }

    fn list(&self, folder: &str, kind: &str) -> Result<Vec<String>, RemoteError> {
        let path = self.folder_path(folder);
        tracing::debug!(path = %path, kind, "listing");
        let endpoint = format!("GetFolderByServerRelativePath(decodedurl=@a1)/{kind}");
        let resp = self.get(&endpoint, &path)?;
        let list: ListResponse = resp.json().map_err(|e| RemoteError::Parse(e.to_string()))?;
        Ok(list.value.into_iter().map(|e| e.name).collect())
    }
}

impl RemoteSource for SharePointClient {
    fn list_folders(&self, path: &str) -> Result<Vec<String>, RemoteError> {
        let folders = self.list(path, "Folders")?;
        tracing::info!(path, count = folders.len(), "folders found");
        Ok(folders)
    }

    fn list_files(&self, path: &str) -> Result<Vec<String>, RemoteError> {
        let files = self.list(path, "Files")?;
        tracing::info!(path, count = files.len(), "files found");
        Ok(files)
    }

    fn fetch_file(&self, path: &str, name: &str) -> Result<Vec<u8>, RemoteError> {
        let file_path = format!("{}/{}", self.folder_path(path), name);
        let resp = self.get("GetFileByServerRelativePath(decodedurl=@a1)/$value", &file_path)?;
        let bytes = resp.bytes().map_err(|e| RemoteError::Network(e.to_string()))?;
        if bytes.is_empty() {
            return Err(RemoteError::EmptyFile(file_path));
        }
        tracing::info!(file = name, bytes = bytes.len(), "downloaded");
        Ok(bytes.to_vec())
    }
}
