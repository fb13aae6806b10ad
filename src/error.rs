//! Error types
//!
//! Every failure is returned to the immediate caller. Nothing in this crate
//! retries or swallows an error.

use crate::api::versions::{ApiVersion, VersionWindow};
use thiserror::Error;

pub type Result<T> = std::result::Result<T, Error>;

#[derive(Debug, Error)]
pub enum Error {
    /// Local validation of a caller-supplied value failed before any request was made
    #[error("invalid input: {0}")]
    InvalidInput(String),

    /// The negotiated API version matches no registered window for the operation
    #[error("API version '{version}' is not supported on '{method}' method")]
    VersionNotFoundForApiMethod { method: String, version: ApiVersion },

    /// Two windows registered under the same operation name intersect
    #[error("overlapping version windows for '{method}': {first} and {second}")]
    OverlappingVersions {
        method: String,
        first: VersionWindow,
        second: VersionWindow,
    },

    /// Semantic validation of a domain-specific argument failed
    #[error("{0}")]
    Command(String),

    #[error("not found: {0}")]
    NotFound(String),

    /// Non-success status other than 404
    #[error("API request failed: {status} - {message}")]
    Api { status: u16, message: String },

    /// Response body did not carry the expected top-level key
    #[error("response is missing the '{0}' key")]
    MissingKey(String),

    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl Error {
    pub(crate) fn invalid_input(msg: impl Into<String>) -> Self {
        Self::InvalidInput(msg.into())
    }

    pub(crate) fn command(msg: impl Into<String>) -> Self {
        Self::Command(msg.into())
    }
}

/// Format an error for display on a terminal
///
/// Transport details stay in the log; the user gets a short, stable message.
pub fn format_error(error: &Error) -> String {
    match error {
        Error::NotFound(what) => format!("Resource not found: {}", truncate(what, 80)),
        Error::Api { status: 401, .. } => {
            "Authentication failed. Check OS_AUTH_TOKEN or the configured token.".to_string()
        }
        Error::Api { status: 403, .. } => {
            "Permission denied. Check your project role assignments.".to_string()
        }
        Error::Api { status: 409, message } => {
            format!("Resource conflict: {}", truncate(message, 80))
        }
        Error::Api { status: 413 | 429, .. } => {
            "Rate limit or quota exceeded. Please try again later.".to_string()
        }
        Error::Api { status, .. } if *status >= 500 => {
            "Share service temporarily unavailable. Please try again.".to_string()
        }
        Error::Api { status, message } => format!("Request failed ({}): {}", status, truncate(message, 80)),
        Error::Http(_) => "Request failed. Check the endpoint and your network connection.".to_string(),
        other => truncate(&other.to_string(), 120),
    }
}

fn truncate(text: &str, max: usize) -> String {
    let sanitized: String = text
        .chars()
        .filter(|c| c.is_ascii_graphic() || *c == ' ')
        .collect();

    if sanitized.chars().count() > max {
        let head: String = sanitized.chars().take(max).collect();
        format!("{}...", head)
    } else {
        sanitized
    }
}
