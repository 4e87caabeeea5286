//! Error types for the OAuth adapter and config store.

/// Result type alias for this crate.
pub type Result<T> = std::result::Result<T, OAuthError>;

/// Errors that can occur talking to the identity provider or the config files.
#[derive(Debug, thiserror::Error)]
pub enum OAuthError {
    /// Network/HTTP transport error.
    #[error("Network error: {0}")]
    Network(String),

    /// Identity provider answered with a non-200 status.
    #[error("Provider returned {status}: {message}")]
    Provider { status: u16, message: String },

    /// Invalid request or input document.
    #[error("Invalid request: {0}")]
    InvalidRequest(String),

    /// Configuration error.
    #[error("Config error: {0}")]
    Config(String),

    /// Reading or writing a config file failed.
    #[error("Storage error: {0}")]
    Storage(String),

    /// Serialization error.
    #[error("Serialization error: {0}")]
    Serialization(String),
}

impl From<reqwest::Error> for OAuthError {
    fn from(e: reqwest::Error) -> Self {
        OAuthError::Network(e.to_string())
    }
}

impl OAuthError {
    /// Provider status code, if this error came from a non-200 response.
    pub fn provider_status(&self) -> Option<u16> {
        match self {
            OAuthError::Provider { status, .. } => Some(*status),
            _ => None,
        }
    }
}
