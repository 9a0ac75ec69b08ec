//! Remediation collaborators.
//!
//! # Data Flow
//! ```text
//! Breaker trips (ARMED → TRIPPED)
//!     → Remediator::remediate(target), once, bounded by timeout
//!         kubernetes.rs: DELETE /api/v1/namespaces/{target}
//!         webhook.rs:    POST alert JSON to an external endpoint
//!         dry_run.rs:    log only
//!     → RemediationReport returned inside the Outcome
//! ```
//!
//! # Design Decisions
//! - The target is resolved once at startup and never changes
//! - Implementations do not retry; the breaker decides when to call again
//! - A 404 from the Kubernetes API counts as success (namespace already gone)

pub mod dry_run;
pub mod error;
pub mod kubernetes;
pub mod target;
pub mod webhook;

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;

use crate::config::{BreakerConfig, RemediationKind};

pub use dry_run::DryRunRemediator;
pub use error::{RemediationError, TargetError};
pub use kubernetes::KubernetesNamespaceRemediator;
pub use target::RemediationTarget;
pub use webhook::WebhookRemediator;

/// The action taken when a runaway loop is detected.
#[async_trait]
pub trait Remediator: Send + Sync {
    /// Short name used in logs and metric labels.
    fn name(&self) -> &'static str;

    async fn remediate(&self, target: &RemediationTarget) -> Result<(), RemediationError>;
}

/// What happened when the breaker invoked its remediator.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RemediationReport {
    pub target: RemediationTarget,
    pub remediator: &'static str,
    /// `None` on success.
    pub error: Option<String>,
    pub elapsed: Duration,
}

impl RemediationReport {
    pub fn succeeded(&self) -> bool {
        self.error.is_none()
    }
}

/// Build the remediator selected in the configuration.
pub fn from_config(config: &BreakerConfig) -> Result<Arc<dyn Remediator>, RemediationError> {
    let remediator: Arc<dyn Remediator> = match config.remediation.kind {
        RemediationKind::Kubernetes => {
            Arc::new(KubernetesNamespaceRemediator::new(&config.kubernetes)?)
        }
        RemediationKind::Webhook => Arc::new(WebhookRemediator::new(&config.webhook)?),
        RemediationKind::DryRun => Arc::new(DryRunRemediator::new()),
    };

    tracing::info!(remediator = remediator.name(), "Remediator configured");
    Ok(remediator)
}
