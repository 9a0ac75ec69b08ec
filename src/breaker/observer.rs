//! Transition notification hooks.

use crate::breaker::state::{BreakerState, Transition};

/// Receives every ARMED → TRIPPED and TRIPPED → ARMED transition.
///
/// Called synchronously while the breaker lock is held, so notifications arrive
/// in the order the transitions happened. Implementations must return quickly
/// and must not call back into the breaker.
pub trait TransitionObserver: Send + Sync {
    fn on_transition(&self, transition: &Transition);
}

/// Logs transitions through `tracing`.
#[derive(Debug, Default, Clone, Copy)]
pub struct TracingObserver;

impl TransitionObserver for TracingObserver {
    fn on_transition(&self, transition: &Transition) {
        match transition.to {
            BreakerState::Tripped => tracing::warn!(
                from = %transition.from,
                to = %transition.to,
                count = transition.count,
                "Breaker tripped"
            ),
            BreakerState::Armed => tracing::info!(
                from = %transition.from,
                to = %transition.to,
                count = transition.count,
                "Breaker re-armed"
            ),
        }
    }
}
