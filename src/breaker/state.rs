//! Breaker state, thresholds and observation outcomes.

use std::fmt;
use std::time::Duration;

use serde::Serialize;

use crate::breaker::error::BreakerError;
use crate::remediation::RemediationReport;

/// Whether remediation may still fire in the current window.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum BreakerState {
    /// Remediation has not fired in the current window.
    Armed,
    /// Remediation fired (or is in flight) for the current window.
    Tripped,
}

impl BreakerState {
    pub fn as_str(&self) -> &'static str {
        match self {
            BreakerState::Armed => "armed",
            BreakerState::Tripped => "tripped",
        }
    }
}

impl fmt::Display for BreakerState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Longest accepted window.
pub const MAX_WINDOW: Duration = Duration::from_secs(86_400);

/// Maximum number of events tolerated within one window.
///
/// Immutable once built; `new` rejects a zero count and a window that is zero
/// or longer than [`MAX_WINDOW`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Threshold {
    max_events: u64,
    window: Duration,
}

impl Threshold {
    pub fn new(max_events: u64, window: Duration) -> Result<Self, BreakerError> {
        if max_events == 0 {
            return Err(BreakerError::ZeroMaxEvents);
        }
        if window.is_zero() {
            return Err(BreakerError::ZeroWindow);
        }
        if window > MAX_WINDOW {
            return Err(BreakerError::WindowTooLong { max: MAX_WINDOW });
        }
        Ok(Self { max_events, window })
    }

    pub fn max_events(&self) -> u64 {
        self.max_events
    }

    pub fn window(&self) -> Duration {
        self.window
    }

    /// Inclusive: the event that brings the count to `max_events` breaches.
    pub fn is_breached(&self, count: u64) -> bool {
        count >= self.max_events
    }
}

/// The part of an inbound event the breaker cares about.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ObservedEvent {
    pub id: String,
    pub source: String,
}

impl ObservedEvent {
    pub fn new(id: impl Into<String>, source: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            source: source.into(),
        }
    }
}

/// Result of observing one event. Events are never rejected.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Outcome {
    Accepted,
    /// This event tripped the breaker; carries the result of the single remediation call.
    AcceptedAndTripped(RemediationReport),
}

impl Outcome {
    pub fn is_tripped(&self) -> bool {
        matches!(self, Outcome::AcceptedAndTripped(_))
    }

    pub fn report(&self) -> Option<&RemediationReport> {
        match self {
            Outcome::Accepted => None,
            Outcome::AcceptedAndTripped(report) => Some(report),
        }
    }
}

/// A state change, handed to every registered observer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Transition {
    pub from: BreakerState,
    pub to: BreakerState,
    /// Window count at the moment of the transition.
    pub count: u64,
}
