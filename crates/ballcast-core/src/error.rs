//! Error types for Ballcast Core

use thiserror::Error;

/// Result type alias for ballcast operations
pub type Result<T> = std::result::Result<T, Error>;

/// Ballcast error types
#[derive(Error, Debug)]
pub enum Error {
    // Configuration errors
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("Configuration file {path} not found")]
    ConfigNotFound { path: String },

    #[error("Unable to parse configuration file: {0}")]
    ConfigParse(#[from] serde_json::Error),

    // Catalog errors
    #[error("Failed to fetch schedule from {url}: {source}")]
    CatalogFetch { url: String, source: reqwest::Error },

    #[error("Failed to decode schedule: {0}")]
    CatalogDecode(String),

    // Network errors
    #[error("Network error: {0}")]
    Network(#[from] reqwest::Error),

    #[error("Invalid URL: {0}")]
    InvalidUrl(String),

    // Refresh errors
    #[error("Refresh cancelled")]
    Cancelled,

    // Subprocess errors
    #[error("Unable to find {program} in path")]
    ProgramNotFound { program: String },

    #[error("Process error: {0}")]
    Process(String),

    // Internal errors
    #[error("Internal error: {0}")]
    Internal(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl Error {
    /// Create a subprocess error
    pub fn process(msg: impl Into<String>) -> Self {
        Error::Process(msg.into())
    }

    /// Returns true if the next refresh cycle may succeed where this one failed
    pub fn is_recoverable(&self) -> bool {
        matches!(
            self,
            Error::CatalogFetch { .. } | Error::CatalogDecode(_) | Error::Network(_)
        )
    }

    /// Returns the error code for logs
    pub fn error_code(&self) -> &'static str {
        match self {
            Error::InvalidConfig(_) => "INVALID_CONFIG",
            Error::ConfigNotFound { .. } => "CONFIG_NOT_FOUND",
            Error::ConfigParse(_) => "CONFIG_PARSE",
            Error::CatalogFetch { .. } => "CATALOG_FETCH",
            Error::CatalogDecode(_) => "CATALOG_DECODE",
            Error::Network(_) => "NETWORK",
            Error::InvalidUrl(_) => "INVALID_URL",
            Error::Cancelled => "CANCELLED",
            Error::ProgramNotFound { .. } => "PROGRAM_NOT_FOUND",
            Error::Process(_) => "PROCESS",
            Error::Internal(_) => "INTERNAL",
            Error::Io(_) => "IO",
        }
    }
}

/// Failure of a single manifest fetch against one CDN variant
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum FetchError {
    #[error("request timed out")]
    Timeout,

    #[error("connection failed: {0}")]
    Connect(String),

    #[error("unexpected status {0}")]
    Status(u16),

    #[error("failed to read body: {0}")]
    Body(String),

    #[error("request failed: {0}")]
    Request(String),
}

impl FetchError {
    /// Systemic failures point at the network or the CDN itself rather than
    /// at a clean "no stream" answer.
    pub fn is_systemic(&self) -> bool {
        matches!(
            self,
            FetchError::Timeout | FetchError::Connect(_) | FetchError::Request(_)
        )
    }
}

impl From<reqwest::Error> for FetchError {
    fn from(e: reqwest::Error) -> Self {
        if e.is_timeout() {
            FetchError::Timeout
        } else if e.is_connect() {
            FetchError::Connect(e.to_string())
        } else if e.is_body() || e.is_decode() {
            FetchError::Body(e.to_string())
        } else if let Some(status) = e.status() {
            FetchError::Status(status.as_u16())
        } else {
            FetchError::Request(e.to_string())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_codes() {
        assert_eq!(Error::Cancelled.error_code(), "CANCELLED");
        assert_eq!(
            Error::InvalidConfig("statsURL".into()).error_code(),
            "INVALID_CONFIG"
        );
        assert_eq!(Error::CatalogDecode("eof".into()).error_code(), "CATALOG_DECODE");
    }

    #[test]
    fn test_recoverable() {
        assert!(Error::CatalogDecode("eof".into()).is_recoverable());
        assert!(!Error::Cancelled.is_recoverable());
        assert!(!Error::InvalidConfig("x".into()).is_recoverable());
    }

    #[test]
    fn test_fetch_error_systemic() {
        assert!(FetchError::Timeout.is_systemic());
        assert!(FetchError::Connect("refused".into()).is_systemic());
        assert!(!FetchError::Status(404).is_systemic());
        assert!(!FetchError::Body("truncated".into()).is_systemic());
    }
}
