//! Startup orchestration.
//!
//! # Responsibilities
//! - Turn a validated configuration into a ready breaker
//! - Resolve the remediation target exactly once
//!
//! # Design Decisions
//! - Fail fast: any startup error is fatal
//! - Subsystems initialize in order, not concurrently

use std::path::Path;
use std::sync::Arc;

use thiserror::Error;

use crate::breaker::{Breaker, BreakerError, TracingObserver};
use crate::config::BreakerConfig;
use crate::remediation::{self, RemediationError, RemediationTarget, TargetError};

#[derive(Debug, Error)]
pub enum StartupError {
    #[error("invalid threshold: {0}")]
    Threshold(#[from] BreakerError),

    #[error("cannot resolve remediation target: {0}")]
    Target(#[from] TargetError),

    #[error("cannot build remediator: {0}")]
    Remediator(#[from] RemediationError),
}

/// Build the breaker described by `config`.
pub fn build_breaker(config: &BreakerConfig) -> Result<Arc<Breaker>, StartupError> {
    let threshold = config.threshold.to_threshold()?;
    let target = RemediationTarget::resolve(
        &config.remediation.namespace,
        Path::new(&config.kubernetes.namespace_path),
    )?;
    let remediator = remediation::from_config(config)?;

    tracing::info!(
        namespace = %target,
        remediator = remediator.name(),
        max_events = threshold.max_events(),
        window_secs = threshold.window().as_secs(),
        "Breaker armed"
    );

    let breaker = Breaker::new(threshold, target, remediator)
        .with_remediation_timeout(config.remediation.timeout())
        .with_observer(Arc::new(TracingObserver));
    Ok(Arc::new(breaker))
}
