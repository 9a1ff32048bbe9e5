//! Error types for the scenario harness
//!
//! Faults raised while talking to the system under test are converted into
//! FAIL records by the harness; only configuration and startup faults reach
//! `main` and end the process.

use std::io;
use thiserror::Error;

/// Result type alias using our Error type
pub type Result<T> = std::result::Result<T, Error>;

/// Main error type for the scenario harness
#[derive(Error, Debug)]
pub enum Error {
    // === Transport Errors ===
    #[error("Request to {url} failed: {message}")]
    Transport { url: String, message: String },

    #[error("Request to {url} timed out after {secs} seconds")]
    Timeout { url: String, secs: u64 },

    // === Response Errors ===
    #[error("Failed to decode response body: {0}")]
    Decode(String),

    /// Response shape a procedure cannot continue from
    #[error("Expectation failed: {0}")]
    Expectation(String),

    // === Setup Errors ===
    #[error("Setup failed: {0}")]
    Setup(String),

    #[error("No credential available. The login step must succeed before '{0}' can run")]
    MissingCredential(String),

    // === Configuration Errors ===
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Invalid configuration file: {0}")]
    ConfigParse(String),

    #[error("Invalid base URL '{url}': {reason}")]
    InvalidBaseUrl { url: String, reason: String },

    #[error("Unknown suite '{name}'. Available: {available}")]
    UnknownSuite { name: String, available: String },

    #[error("Failed to parse scenario file: {0}")]
    ScenarioParse(String),

    // === IO Errors ===
    #[error("IO error: {0}")]
    Io(#[from] io::Error),

    #[error("Failed to read file '{path}': {error}")]
    FileRead { path: String, error: String },

    // === Serialization Errors ===
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    // === Internal Errors ===
    #[error("Internal error: {0}")]
    Internal(String),
}

/// Coarse classification of a fault as seen from a scenario
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize)]
#[serde(rename_all = "snake_case")]
pub enum FaultKind {
    /// The server could not be reached or did not answer in time
    Transport,
    /// The body could not be decoded
    Decode,
    /// Status or body differed from what the scenario expects
    Expectation,
    /// No usable authenticated context
    Setup,
    Other,
}

impl Error {
    /// Build a transport error from a reqwest failure, separating timeouts
    pub fn from_reqwest(url: &str, err: reqwest::Error, timeout_secs: u64) -> Self {
        if err.is_timeout() {
            Self::Timeout {
                url: url.to_string(),
                secs: timeout_secs,
            }
        } else if err.is_decode() {
            Self::Decode(err.to_string())
        } else {
            Self::Transport {
                url: url.to_string(),
                message: err.to_string(),
            }
        }
    }

    /// Create an unknown suite error listing the available ones
    pub fn unknown_suite<S: AsRef<str>>(name: &str, available: &[S]) -> Self {
        Self::UnknownSuite {
            name: name.to_string(),
            available: available
                .iter()
                .map(|s| s.as_ref())
                .collect::<Vec<_>>()
                .join(", "),
        }
    }

    /// Classify the error for reporting
    pub fn kind(&self) -> FaultKind {
        match self {
            Error::Transport { .. } | Error::Timeout { .. } => FaultKind::Transport,
            Error::Decode(_) | Error::Json(_) => FaultKind::Decode,
            Error::Expectation(_) => FaultKind::Expectation,
            Error::Setup(_) | Error::MissingCredential(_) => FaultKind::Setup,
            _ => FaultKind::Other,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_kind_classification() {
        let timeout = Error::Timeout {
            url: "http://localhost/api/me".into(),
            secs: 5,
        };
        assert_eq!(timeout.kind(), FaultKind::Transport);
        assert_eq!(Error::Decode("eof".into()).kind(), FaultKind::Decode);
        assert_eq!(
            Error::MissingCredential("GET /me".into()).kind(),
            FaultKind::Setup
        );
        assert_eq!(Error::Config("bad".into()).kind(), FaultKind::Other);
    }

    #[test]
    fn test_unknown_suite_lists_available() {
        let err = Error::unknown_suite("billing", &["payments", "corporate-quotes"]);
        let msg = err.to_string();
        assert!(msg.contains("billing"));
        assert!(msg.contains("payments, corporate-quotes"));
    }

    #[test]
    fn test_timeout_message_mentions_deadline() {
        let err = Error::Timeout {
            url: "http://localhost:8001/api/corporate/quotes".into(),
            secs: 3,
        };
        assert!(err.to_string().contains("timed out after 3 seconds"));
    }
}
