//! Session credentials and bearer token acquisition.
//!
//! A pre-issued access token is used as-is. Otherwise the token comes from
//! an OAuth2 resource-owner password grant against the Microsoft identity
//! platform for the configured tenant.

use crate::error::RemoteError;

pub const DEFAULT_LOGIN_BASE: &str = "https://login.microsoftonline.com";
pub const DEFAULT_TENANT: &str = "organizations";

/// Credentials for one SharePoint site.
#[derive(Clone)]
pub struct Credentials {
    pub username: String,
    pub password: String,
    /// Directory tenant (GUID, domain, or `organizations`)
    pub tenant: String,
    /// Azure AD application allowed to use the password grant
    pub client_id: Option<String>,
    /// Pre-issued bearer token; skips the password grant
    pub access_token: Option<String>,
}

impl Credentials {
    pub fn new(username: String, password: String) -> Self {
        Self {
            username,
            password,
            tenant: DEFAULT_TENANT.to_string(),
            client_id: None,
            access_token: None,
        }
    }
}

impl std::fmt::Debug for Credentials {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Credentials")
            .field("username", &self.username)
            .field("password", &"***")
            .field("tenant", &self.tenant)
            .field("client_id", &self.client_id)
            .field("access_token", &self.access_token.as_ref().map(|_| "***"))
            .finish()
    }
}

/// Obtain a bearer token for `resource` (the site origin, e.g.
/// `https://contoso.sharepoint.com`).
pub fn acquire_token(
    http: &reqwest::blocking::Client,
    login_base: &str,
    creds: &Credentials,
    resource: &str,
) -> Result<String, RemoteError> {
    if let Some(token) = creds.access_token.as_deref().filter(|t| !t.trim().is_empty()) {
        return Ok(token.trim().to_string());
    }

    let client_id = creds.client_id.as_deref().ok_or_else(|| {
        RemoteError::NotAuthenticated("no access token and no client id configured".into())
    })?;

    let token_url = format!("{}/{}/oauth2/v2.0/token", login_base.trim_end_matches('/'), creds.tenant);
    let scope = format!("{}/.default", resource.trim_end_matches('/'));

    let resp = http
        .post(&token_url)
        .form(&[
            ("grant_type", "password"),
            ("client_id", client_id),
            ("username", creds.username.as_str()),
            ("password", creds.password.as_str()),
            ("scope", scope.as_str()),
        ])
        .send()
        .map_err(|e| RemoteError::Network(e.to_string()))?;

    let status = resp.status().as_u16();
    let body: serde_json::Value = resp.json().unwrap_or(serde_json::Value::Null);
    if status != 200 {
        let msg = body["error_description"]
            .as_str()
            .or_else(|| body["error"].as_str())
            .unwrap_or("unknown error");
        return Err(RemoteError::NotAuthenticated(format!("token request failed ({}): {}", status, msg)));
    }

    body["access_token"]
        .as_str()
        .map(String::from)
        .ok_or_else(|| RemoteError::Parse("token response missing access_token".into()))
}
