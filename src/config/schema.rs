//! Configuration schema definitions.
//!
//! This module defines the complete configuration structure for the breaker.
//! All types derive Serde traits for deserialization from config files.

use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::breaker::{BreakerError, Threshold};

/// Root configuration for the loop breaker.
#[derive(Debug, Clone, Deserialize, Serialize, Default)]
#[serde(default)]
pub struct BreakerConfig {
    /// Listener configuration (bind address).
    pub listener: ListenerConfig,

    /// Event rate threshold.
    pub threshold: ThresholdConfig,

    /// Which remediation to run and against what.
    pub remediation: RemediationConfig,

    /// Kubernetes API access for namespace deletion.
    pub kubernetes: KubernetesConfig,

    /// Alert endpoint for webhook remediation.
    pub webhook: WebhookConfig,

    /// Inbound event handling.
    pub receiver: ReceiverConfig,

    /// Observability settings.
    pub observability: ObservabilityConfig,

    pub admin: AdminConfig,
}

/// Listener configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ListenerConfig {
    /// Bind address (e.g., "0.0.0.0:8080").
    pub bind_address: String,
}

impl Default for ListenerConfig {
    fn default() -> Self {
        Self {
            bind_address: "0.0.0.0:8080".to_string(),
        }
    }
}

/// Event rate threshold.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ThresholdConfig {
    /// Events per window that trip the breaker (inclusive).
    pub max_events: u64,

    /// Window length in seconds; the counter resets at this period.
    pub window_secs: u64,
}

impl Default for ThresholdConfig {
    fn default() -> Self {
        Self {
            max_events: 100,
            window_secs: 1,
        }
    }
}

impl ThresholdConfig {
    pub fn to_threshold(&self) -> Result<Threshold, BreakerError> {
        Threshold::new(self.max_events, Duration::from_secs(self.window_secs))
    }
}

/// Remediation strategy.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum RemediationKind {
    /// Delete the target namespace.
    Kubernetes,
    /// POST an alert to `webhook.url`.
    Webhook,
    /// Log only.
    #[default]
    DryRun,
}

impl std::str::FromStr for RemediationKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "kubernetes" => Ok(Self::Kubernetes),
            "webhook" => Ok(Self::Webhook),
            "dry_run" | "dry-run" => Ok(Self::DryRun),
            other => Err(format!("unknown remediation kind '{}'", other)),
        }
    }
}

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct RemediationConfig {
    pub kind: RemediationKind,

    /// Target namespace. Empty means the namespace this pod runs in.
    pub namespace: String,

    /// Upper bound on a single remediation call, in seconds.
    pub timeout_secs: u64,
}

impl Default for RemediationConfig {
    fn default() -> Self {
        Self {
            kind: RemediationKind::DryRun,
            namespace: String::new(),
            timeout_secs: 30,
        }
    }
}

impl RemediationConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}

/// Kubernetes API access. Defaults match an in-cluster service account.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct KubernetesConfig {
    /// API server base URL.
    pub api_url: String,

    /// Bearer token file; `None` sends no credentials (e.g. behind `kubectl proxy`).
    pub token_path: Option<String>,

    /// PEM bundle trusted for the API server.
    pub ca_path: Option<String>,

    /// File holding the pod's own namespace, used when `remediation.namespace` is empty.
    pub namespace_path: String,

    /// Deletion propagation policy (Foreground, Background, Orphan).
    pub propagation_policy: String,
}

const SERVICE_ACCOUNT_DIR: &str = "/var/run/secrets/kubernetes.io/serviceaccount";

impl Default for KubernetesConfig {
    fn default() -> Self {
        Self {
            api_url: "https://kubernetes.default.svc".to_string(),
            token_path: Some(format!("{}/token", SERVICE_ACCOUNT_DIR)),
            ca_path: Some(format!("{}/ca.crt", SERVICE_ACCOUNT_DIR)),
            namespace_path: format!("{}/namespace", SERVICE_ACCOUNT_DIR),
            propagation_policy: "Foreground".to_string(),
        }
    }
}

#[derive(Debug, Clone, Deserialize, Serialize, Default)]
#[serde(default)]
pub struct WebhookConfig {
    pub url: String,
}

/// Inbound event handling.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ReceiverConfig {
    /// Reply to each event with the event itself (binary content mode).
    pub reply_with_event: bool,

    /// Largest event body read, in bytes. Bigger events are still counted, without their data.
    pub max_body_bytes: usize,

    /// Request timeout in seconds. Must cover remediation.timeout_secs for the tripping request.
    pub request_timeout_secs: u64,
}

impl Default for ReceiverConfig {
    fn default() -> Self {
        Self {
            reply_with_event: false,
            max_body_bytes: 1024 * 1024,
            request_timeout_secs: 60,
        }
    }
}

/// Log output format.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum LogFormat {
    #[default]
    Pretty,
    Json,
}

/// Observability configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ObservabilityConfig {
    /// Log level (trace, debug, info, warn, error).
    pub log_level: String,

    pub log_format: LogFormat,

    /// Enable metrics endpoint.
    pub metrics_enabled: bool,

    /// Metrics endpoint bind address.
    pub metrics_address: String,
}

impl Default for ObservabilityConfig {
    fn default() -> Self {
        Self {
            log_level: "info".to_string(),
            log_format: LogFormat::Pretty,
            metrics_enabled: false,
            metrics_address: "0.0.0.0:9090".to_string(),
        }
    }
}

/// Admin API configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct AdminConfig {
    /// Mount the /admin routes.
    pub enabled: bool,

    /// API key for authentication (Bearer token).
    pub api_key: String,
}

/// Placeholder key rejected by validation when the admin API is enabled.
pub const PLACEHOLDER_API_KEY: &str = "CHANGE_ME_IN_PRODUCTION";

impl Default for AdminConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            api_key: PLACEHOLDER_API_KEY.to_string(),
        }
    }
}
