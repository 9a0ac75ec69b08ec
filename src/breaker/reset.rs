//! Periodic window reset.
//!
//! # Responsibilities
//! - Call `Breaker::reset_window` once per window period
//! - Stop when the shutdown signal fires (or its sender is dropped)

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::broadcast;
use tokio::task::JoinHandle;
use tokio::time::{self, Instant, MissedTickBehavior};

use crate::breaker::engine::Breaker;

pub struct ResetLoop {
    breaker: Arc<Breaker>,
    period: Duration,
}

impl ResetLoop {
    /// Reset every `threshold.window` of the given breaker.
    pub fn new(breaker: Arc<Breaker>) -> Self {
        let period = breaker.threshold().window();
        Self { breaker, period }
    }

    pub fn period(&self) -> Duration {
        self.period
    }

    pub fn spawn(self, shutdown: broadcast::Receiver<()>) -> JoinHandle<()> {
        tokio::spawn(self.run(shutdown))
    }

    pub async fn run(self, mut shutdown: broadcast::Receiver<()>) {
        tracing::info!(period_ms = crate::breaker::engine::millis(self.period), "Window reset loop starting");

        // The first window opened when the breaker was built; don't reset it immediately.
        let mut ticker = time::interval_at(Instant::now() + self.period, self.period);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

        loop {
            tokio::select! {
                _ = ticker.tick() => {
                    self.breaker.reset_window();
                }
                _ = shutdown.recv() => {
                    tracing::info!("Window reset loop received shutdown signal, exiting loop");
                    break;
                }
            }
        }
    }
}
