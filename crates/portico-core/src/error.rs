//! Error types for Portico

use thiserror::Error;

/// Result type alias using Portico's Error
pub type Result<T> = std::result::Result<T, Error>;

/// Portico error types
#[derive(Error, Debug)]
pub enum Error {
    // Authentication errors (E001-E099)
    #[error("Authentication failed: {0}")]
    Authentication(String),

    #[error("Session is invalid or has expired. Log in again.")]
    SessionExpired,

    // Verification errors (E100-E199)
    #[error("{message}")]
    Verification { code: i32, message: String },

    // Network errors (E200-E299)
    #[error("Network error: {0}. Check your connection to the ERP backend.")]
    Network(#[from] reqwest::Error),

    // Backend envelope errors (E300-E399)
    #[error("Backend error {code}: {message}")]
    Api { code: i32, message: String },

    // Credential store errors (E400-E499)
    #[error("Credential store error: {0}")]
    CredentialStore(String),

    // Config errors (E600-E699)
    #[error("Configuration error: {0}")]
    Config(String),

    // Input errors (E800-E899)
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    // Generic errors
    #[error("{0}")]
    Other(String),

    #[error(transparent)]
    Io(#[from] std::io::Error),
}

impl Error {
    /// Get error code for this error type
    pub fn code(&self) -> &'static str {
        match self {
            Self::Authentication(_) => "E001",
            Self::SessionExpired => "E002",
            Self::Verification { .. } => "E100",
            Self::Network(_) => "E200",
            Self::Api { .. } => "E300",
            Self::CredentialStore(_) => "E400",
            Self::Config(_) => "E600",
            Self::InvalidInput(_) => "E800",
            Self::Other(_) | Self::Io(_) => "E9999",
        }
    }

    /// Build a verification error with the upstream's numeric code 0
    pub fn verification(message: impl Into<String>) -> Self {
        Self::Verification {
            code: 0,
            message: message.into(),
        }
    }
}
