//! Configuration validation.
//!
//! # Responsibilities
//! - Semantic validation (serde handles syntactic)
//! - Validate value ranges (threshold > 0, timeouts > 0)
//! - Check addresses and URLs parse
//!
//! # Design Decisions
//! - Returns all validation errors, not just first
//! - Validation is pure function: BreakerConfig → Result<(), Vec<ValidationError>>
//! - Runs before config is accepted into the system

use std::net::SocketAddr;

use thiserror::Error;
use url::Url;

use crate::breaker::MAX_WINDOW;
use crate::config::schema::{BreakerConfig, RemediationKind, PLACEHOLDER_API_KEY};
use crate::remediation::RemediationTarget;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    #[error("threshold.max_events must be at least 1")]
    ZeroMaxEvents,

    #[error("threshold.window_secs must be at least 1")]
    ZeroWindow,

    #[error("threshold.window_secs must be at most {max}")]
    WindowTooLong { max: u64 },

    #[error("remediation.timeout_secs must be at least 1")]
    ZeroRemediationTimeout,

    #[error("receiver.request_timeout_secs must be at least 1")]
    ZeroRequestTimeout,

    #[error("receiver.request_timeout_secs ({request}) must exceed remediation.timeout_secs ({remediation})")]
    RequestTimeoutTooShort { request: u64, remediation: u64 },

    #[error("remediation.namespace '{0}' is not a valid namespace name")]
    InvalidNamespace(String),

    #[error("{field} '{value}' is not a valid socket address")]
    InvalidAddress { field: &'static str, value: String },

    #[error("{field} '{value}' is not a valid URL")]
    InvalidUrl { field: &'static str, value: String },

    #[error("webhook.url is required when remediation.kind = \"webhook\"")]
    MissingWebhookUrl,

    #[error("admin.api_key must be changed from the placeholder when the admin API is enabled")]
    PlaceholderApiKey,
}

pub fn validate_config(config: &BreakerConfig) -> Result<(), Vec<ValidationError>> {
    let mut errors = Vec::new();

    if config.threshold.max_events == 0 {
        errors.push(ValidationError::ZeroMaxEvents);
    }
    if config.threshold.window_secs == 0 {
        errors.push(ValidationError::ZeroWindow);
    }
    if config.threshold.window_secs > MAX_WINDOW.as_secs() {
        errors.push(ValidationError::WindowTooLong {
            max: MAX_WINDOW.as_secs(),
        });
    }
    if config.remediation.timeout_secs == 0 {
        errors.push(ValidationError::ZeroRemediationTimeout);
    }
    if config.receiver.request_timeout_secs == 0 {
        errors.push(ValidationError::ZeroRequestTimeout);
    }
    if config.receiver.request_timeout_secs != 0
        && config.receiver.request_timeout_secs <= config.remediation.timeout_secs
    {
        errors.push(ValidationError::RequestTimeoutTooShort {
            request: config.receiver.request_timeout_secs,
            remediation: config.remediation.timeout_secs,
        });
    }

    let namespace = config.remediation.namespace.trim();
    if !namespace.is_empty() && RemediationTarget::new(namespace).is_err() {
        errors.push(ValidationError::InvalidNamespace(namespace.to_string()));
    }

    check_address(&mut errors, "listener.bind_address", &config.listener.bind_address);
    if config.observability.metrics_enabled {
        check_address(&mut errors, "observability.metrics_address", &config.observability.metrics_address);
    }

    match config.remediation.kind {
        RemediationKind::Webhook if config.webhook.url.trim().is_empty() => {
            errors.push(ValidationError::MissingWebhookUrl);
        }
        RemediationKind::Webhook => check_url(&mut errors, "webhook.url", &config.webhook.url),
        RemediationKind::Kubernetes => check_url(&mut errors, "kubernetes.api_url", &config.kubernetes.api_url),
        RemediationKind::DryRun => {}
    }

    if config.admin.enabled && (config.admin.api_key.is_empty() || config.admin.api_key == PLACEHOLDER_API_KEY) {
        errors.push(ValidationError::PlaceholderApiKey);
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}

fn check_address(errors: &mut Vec<ValidationError>, field: &'static str, value: &str) {
    if value.parse::<SocketAddr>().is_err() {
        errors.push(ValidationError::InvalidAddress {
            field,
            value: value.to_string(),
        });
    }
}

fn check_url(errors: &mut Vec<ValidationError>, field: &'static str, value: &str) {
    if Url::parse(value).is_err() {
        errors.push(ValidationError::InvalidUrl {
            field,
            value: value.to_string(),
        });
    }
}
