//! Log-only remediation for rollouts and testing.

use std::sync::atomic::{AtomicU64, Ordering};

use async_trait::async_trait;

use crate::remediation::{RemediationError, RemediationTarget, Remediator};

/// Logs what would have been deleted and counts invocations.
#[derive(Debug, Default)]
pub struct DryRunRemediator {
    invocations: AtomicU64,
}

impl DryRunRemediator {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn invocations(&self) -> u64 {
        self.invocations.load(Ordering::Relaxed)
    }
}

#[async_trait]
impl Remediator for DryRunRemediator {
    fn name(&self) -> &'static str {
        "dry_run"
    }

    async fn remediate(&self, target: &RemediationTarget) -> Result<(), RemediationError> {
        let n = self.invocations.fetch_add(1, Ordering::Relaxed) + 1;
        tracing::warn!(namespace = %target, invocation = n, "Dry run: namespace would be deleted");
        Ok(())
    }
}
