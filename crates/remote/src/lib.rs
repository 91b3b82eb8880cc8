//! Remote document library access.
//!
//! [`RemoteSource`] is the capability the loader needs; [`SharePointClient`]
//! implements it over the SharePoint REST API with a blocking reqwest
//! client (no Tokio runtime required).

pub mod auth;
pub mod client;
pub mod error;

pub use auth::Credentials;
pub use client::SharePointClient;
pub use error::RemoteError;

/// Folder listing and file download, addressed by folder path relative to
/// the document library root.
pub trait RemoteSource {
    /// Names of the immediate subfolders of `path`.
    fn list_folders(&self, path: &str) -> Result<Vec<String>, RemoteError>;

    /// Names of the files directly inside `path`.
    fn list_files(&self, path: &str) -> Result<Vec<String>, RemoteError>;

    /// Full content of `path/name`.
    fn fetch_file(&self, path: &str, name: &str) -> Result<Vec<u8>, RemoteError>;
}
