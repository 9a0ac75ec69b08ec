//! Remediation error types.

use std::path::PathBuf;
use std::time::Duration;

use thiserror::Error;

/// Failure reported by a remediator. Never rolls the breaker back to ARMED.
#[derive(Debug, Error)]
pub enum RemediationError {
    #[error("remediation timed out after {0:?}")]
    Timeout(Duration),

    #[error("request to remediation endpoint failed: {0}")]
    Transport(#[from] reqwest::Error),

    #[error("remediation endpoint rejected request with status {status}: {body}")]
    Rejected { status: u16, body: String },

    #[error("invalid remediation endpoint '{url}': {reason}")]
    InvalidEndpoint { url: String, reason: String },

    #[error("failed to read credentials from {path:?}: {source}")]
    Credentials {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

/// Failure resolving the remediation target at startup.
#[derive(Debug, Error)]
pub enum TargetError {
    #[error("remediation target is empty")]
    Empty,

    #[error("'{0}' is not a valid namespace name")]
    Invalid(String),

    #[error("no namespace configured and {path:?} is unreadable: {source}")]
    Unresolved {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}
