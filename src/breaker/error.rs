//! Breaker construction errors.

use thiserror::Error;

/// Errors raised while building a breaker. All of them are fatal at startup.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum BreakerError {
    #[error("threshold max_events must be at least 1")]
    ZeroMaxEvents,

    #[error("threshold window must be longer than zero")]
    ZeroWindow,

    #[error("threshold window must not exceed {max:?}")]
    WindowTooLong { max: std::time::Duration },
}
