//! Runaway event loop detection.
//!
//! # Data Flow
//! ```text
//! Inbound event (http receiver)
//!     → engine.rs Breaker::observe
//!         → window.rs record (count += 1)
//!         → threshold check + ARMED → TRIPPED (same critical section)
//!         → on trip: remediation (outside the lock, bounded by timeout)
//!     → Outcome returned to caller, event always accepted
//!
//! Reset timer (reset.rs):
//!     every window period
//!     → Breaker::reset_window
//!         → window.rs reset (count = 0, new window start)
//!         → TRIPPED → ARMED
//! ```
//!
//! # State Machine
//! ```text
//! ARMED   --(count >= max_events)--> TRIPPED --(timer reset)--> ARMED
//! ARMED   --(count <  max_events)--> ARMED
//! TRIPPED --(any further observe)--> TRIPPED (no remediation)
//! ```
//!
//! # Design Decisions
//! - Counter and state share one mutex; a reset can never split a check from its transition
//! - Fixed windows, not sliding: a burst straddling a reset boundary is counted in two windows
//! - Remediation failure keeps the breaker TRIPPED until the next reset (no retry storm)
//! - The lock is never held across an await point

pub mod engine;
pub mod error;
pub mod observer;
pub mod reset;
pub mod state;
pub mod window;

pub use engine::{Breaker, BreakerSnapshot};
pub use error::BreakerError;
pub use observer::{TracingObserver, TransitionObserver};
pub use reset::ResetLoop;
pub use state::{BreakerState, ObservedEvent, Outcome, Threshold, Transition, MAX_WINDOW};
pub use window::{WindowCounter, WindowSnapshot};
