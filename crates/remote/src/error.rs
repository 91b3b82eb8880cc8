/// Error type for remote source operations.
#[derive(Debug)]
pub enum RemoteError {
    /// No usable credentials, or the token request was refused
    NotAuthenticated(String),
    /// Site URL could not be parsed
    InvalidUrl(String),
    /// Network error
    Network(String),
    /// HTTP error with status code
    Http(u16, String),
    /// JSON parsing error
    Parse(String),
    /// Download succeeded but returned no bytes
    EmptyFile(String),
}

impl std::fmt::Display for RemoteError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            RemoteError::NotAuthenticated(msg) => write!(f, "Not authenticated: {}", msg),
            RemoteError::InvalidUrl(msg) => write!(f, "Invalid site URL: {}", msg),
            RemoteError::Network(msg) => write!(f, "Network error: {}", msg),
            RemoteError::Http(code, msg) => write!(f, "HTTP {}: {}", code, msg),
            RemoteError::Parse(msg) => write!(f, "Parse error: {}", msg),
            RemoteError::EmptyFile(name) => write!(f, "Empty file: {}", name),
        }
    }
}

impl std::error::Error for RemoteError {}
