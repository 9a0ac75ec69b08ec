//! The breaker: counting, threshold evaluation and remediation gating.

use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::{Duration, SystemTime, UNIX_EPOCH};

use serde::Serialize;
use tokio::time::Instant;

use crate::breaker::observer::TransitionObserver;
use crate::breaker::state::{BreakerState, ObservedEvent, Outcome, Threshold, Transition};
use crate::breaker::window::WindowCounter;
use crate::observability::metrics;
use crate::remediation::{RemediationError, RemediationReport, RemediationTarget, Remediator};

/// Default bound on a single remediation call.
pub const DEFAULT_REMEDIATION_TIMEOUT: Duration = Duration::from_secs(30);

/// Everything guarded by the breaker lock. Counter and state change together.
#[derive(Debug)]
struct Inner {
    counter: WindowCounter,
    state: BreakerState,
    events_total: u64,
    trips_total: u64,
    resets_total: u64,
}

/// Diagnostic view of the breaker.
#[derive(Debug, Clone, Serialize)]
pub struct BreakerSnapshot {
    pub state: BreakerState,
    pub count: u64,
    pub max_events: u64,
    pub window_ms: u64,
    #[serde(skip)]
    pub window_start: Instant,
    /// Wall-clock window start in milliseconds since the Unix epoch.
    pub window_started_at_ms: u64,
    pub target: RemediationTarget,
    pub remediator: &'static str,
    pub events_total: u64,
    pub trips_total: u64,
    pub resets_total: u64,
}

/// Detects runaway event loops and fires remediation at most once per window.
pub struct Breaker {
    threshold: Threshold,
    target: RemediationTarget,
    remediator: Arc<dyn Remediator>,
    remediation_timeout: Duration,
    observers: Vec<Arc<dyn TransitionObserver>>,
    inner: Mutex<Inner>,
}

impl Breaker {
    /// Create an ARMED breaker with an empty window.
    pub fn new(threshold: Threshold, target: RemediationTarget, remediator: Arc<dyn Remediator>) -> Self {
        Self {
            threshold,
            target,
            remediator,
            remediation_timeout: DEFAULT_REMEDIATION_TIMEOUT,
            observers: Vec::new(),
            inner: Mutex::new(Inner {
                counter: WindowCounter::new(),
                state: BreakerState::Armed,
                events_total: 0,
                trips_total: 0,
                resets_total: 0,
            }),
        }
    }

    pub fn with_remediation_timeout(mut self, timeout: Duration) -> Self {
        self.remediation_timeout = timeout;
        self
    }

    pub fn with_observer(mut self, observer: Arc<dyn TransitionObserver>) -> Self {
        self.observers.push(observer);
        self
    }

    pub fn threshold(&self) -> Threshold {
        self.threshold
    }

    pub fn target(&self) -> &RemediationTarget {
        &self.target
    }

    /// Count an event and, if it is the one that reaches the threshold while
    /// ARMED, trip the breaker and run remediation before returning.
    ///
    /// Never fails and never rejects the event.
    pub async fn observe(&self, event: &ObservedEvent) -> Outcome {
        let (count, tripped) = {
            let mut inner = self.lock();
            inner.events_total = inner.events_total.saturating_add(1);
            let count = inner.counter.record();

            let tripped = self.threshold.is_breached(count) && inner.state == BreakerState::Armed;
            if tripped {
                inner.state = BreakerState::Tripped;
                inner.trips_total += 1;
                // Notified under the lock so observers see transitions in order.
                self.notify(&Transition {
                    from: BreakerState::Armed,
                    to: BreakerState::Tripped,
                    count,
                });
            }
            (count, tripped)
        };

        metrics::record_event(count);
        tracing::debug!(
            event_id = %event.id,
            event_source = %event.source,
            count,
            max_events = self.threshold.max_events(),
            "Event observed"
        );

        if !tripped {
            return Outcome::Accepted;
        }

        metrics::record_trip();
        Outcome::AcceptedAndTripped(self.remediate().await)
    }

    /// Start a new window and re-arm. Returns the TRIPPED → ARMED transition, if any.
    pub fn reset_window(&self) -> Option<Transition> {
        let (count, transition) = {
            let mut inner = self.lock();
            let count = inner.counter.count();
            inner.counter.reset();
            inner.resets_total += 1;
            let previous = std::mem::replace(&mut inner.state, BreakerState::Armed);

            let transition = (previous != BreakerState::Armed).then(|| Transition {
                from: previous,
                to: BreakerState::Armed,
                count,
            });
            if let Some(transition) = &transition {
                self.notify(transition);
            }
            (count, transition)
        };

        metrics::record_window_reset();
        tracing::trace!(count, "Window reset");
        transition
    }

    pub fn state(&self) -> BreakerState {
        self.lock().state
    }

    pub fn snapshot(&self) -> BreakerSnapshot {
        let inner = self.lock();
        let window = inner.counter.snapshot();
        BreakerSnapshot {
            state: inner.state,
            count: window.count,
            max_events: self.threshold.max_events(),
            window_ms: millis(self.threshold.window()),
            window_start: window.window_start,
            window_started_at_ms: millis(window.window_started_at.duration_since(UNIX_EPOCH).unwrap_or_default()),
            target: self.target.clone(),
            remediator: self.remediator.name(),
            events_total: inner.events_total,
            trips_total: inner.trips_total,
            resets_total: inner.resets_total,
        }
    }

    async fn remediate(&self) -> RemediationReport {
        tracing::warn!(
            namespace = %self.target,
            remediator = self.remediator.name(),
            max_events = self.threshold.max_events(),
            window_ms = millis(self.threshold.window()),
            "Event threshold reached, remediating"
        );

        let started = Instant::now();
        let result = match tokio::time::timeout(self.remediation_timeout, self.remediator.remediate(&self.target)).await {
            Ok(result) => result,
            Err(_) => Err(RemediationError::Timeout(self.remediation_timeout)),
        };
        let elapsed = started.elapsed();

        metrics::record_remediation(self.remediator.name(), result.is_ok(), elapsed);
        let error = match result {
            Ok(()) => {
                tracing::info!(namespace = %self.target, elapsed_ms = millis(elapsed), "Remediation succeeded");
                None
            }
            Err(e) => {
                tracing::error!(
                    namespace = %self.target,
                    error = %e,
                    "Remediation failed; breaker stays tripped until the next window"
                );
                Some(e.to_string())
            }
        };

        RemediationReport {
            target: self.target.clone(),
            remediator: self.remediator.name(),
            error,
            elapsed,
        }
    }

    /// Called with the breaker lock held.
    fn notify(&self, transition: &Transition) {
        metrics::set_state(transition.to);
        for observer in &self.observers {
            observer.on_transition(transition);
        }
    }

    // A panic while holding the lock leaves {count, state} consistent, so recover it.
    fn lock(&self) -> MutexGuard<'_, Inner> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

pub(crate) fn millis(duration: Duration) -> u64 {
    u64::try_from(duration.as_millis()).unwrap_or(u64::MAX)
}

impl std::fmt::Debug for Breaker {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Breaker")
            .field("threshold", &self.threshold)
            .field("target", &self.target)
            .field("remediator", &self.remediator.name())
            .field("remediation_timeout", &self.remediation_timeout)
            .finish_non_exhaustive()
    }
}

impl BreakerSnapshot {
    /// Wall-clock window start, truncated to milliseconds.
    pub fn window_started_at(&self) -> SystemTime {
        UNIX_EPOCH + Duration::from_millis(self.window_started_at_ms)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use std::sync::atomic::{AtomicUsize, Ordering};

    /// Counts calls; optionally fails or hangs.
    #[derive(Default)]
    struct FakeRemediator {
        calls: AtomicUsize,
        fail: bool,
        hang: bool,
    }

    #[async_trait]
    impl Remediator for FakeRemediator {
        fn name(&self) -> &'static str {
            "fake"
        }

        async fn remediate(&self, _target: &RemediationTarget) -> Result<(), RemediationError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            if self.hang {
                std::future::pending::<()>().await;
            }
            if self.fail {
                return Err(RemediationError::Rejected {
                    status: 503,
                    body: "unreachable".into(),
                });
            }
            Ok(())
        }
    }

    #[derive(Default)]
    struct RecordingObserver(Mutex<Vec<Transition>>);

    impl TransitionObserver for RecordingObserver {
        fn on_transition(&self, transition: &Transition) {
            self.0.lock().unwrap().push(*transition);
        }
    }

    fn breaker(max_events: u64, remediator: Arc<FakeRemediator>) -> Breaker {
        let threshold = Threshold::new(max_events, Duration::from_secs(1)).unwrap();
        Breaker::new(threshold, RemediationTarget::new("looping").unwrap(), remediator)
    }

    fn event(n: usize) -> ObservedEvent {
        ObservedEvent::new(format!("evt-{}", n), "test")
    }

    #[tokio::test]
    async fn test_below_threshold_stays_armed() {
        let remediator = Arc::new(FakeRemediator::default());
        let breaker = breaker(5, remediator.clone());

        for n in 0..4 {
            assert_eq!(breaker.observe(&event(n)).await, Outcome::Accepted);
        }

        assert_eq!(breaker.state(), BreakerState::Armed);
        assert_eq!(breaker.snapshot().count, 4);
        assert_eq!(remediator.calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_event_reaching_threshold_trips_once() {
        let remediator = Arc::new(FakeRemediator::default());
        let breaker = breaker(3, remediator.clone());

        let mut outcomes = Vec::new();
        for n in 0..6 {
            outcomes.push(breaker.observe(&event(n)).await.is_tripped());
        }

        assert_eq!(outcomes, vec![false, false, true, false, false, false]);
        assert_eq!(breaker.state(), BreakerState::Tripped);
        assert_eq!(breaker.snapshot().count, 6);
        assert_eq!(remediator.calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_single_event_threshold_trips_first_event() {
        let remediator = Arc::new(FakeRemediator::default());
        let breaker = breaker(1, remediator.clone());

        let outcome = breaker.observe(&event(0)).await;
        let report = outcome.report().expect("first event should trip");
        assert!(report.succeeded());
        assert_eq!(report.target.as_str(), "looping");
        assert_eq!(report.remediator, "fake");
    }

    #[tokio::test]
    async fn test_reset_rearms_and_clears_count() {
        let remediator = Arc::new(FakeRemediator::default());
        let breaker = breaker(2, remediator.clone());

        breaker.observe(&event(0)).await;
        assert!(breaker.observe(&event(1)).await.is_tripped());

        let transition = breaker.reset_window().expect("tripped breaker should re-arm");
        assert_eq!(transition.from, BreakerState::Tripped);
        assert_eq!(transition.to, BreakerState::Armed);
        assert_eq!(transition.count, 2);

        let snap = breaker.snapshot();
        assert_eq!(snap.count, 0);
        assert_eq!(snap.state, BreakerState::Armed);
        assert_eq!(snap.resets_total, 1);

        breaker.observe(&event(2)).await;
        assert!(breaker.observe(&event(3)).await.is_tripped());
        assert_eq!(remediator.calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn test_reset_while_armed_reports_no_transition() {
        let breaker = breaker(10, Arc::new(FakeRemediator::default()));
        breaker.observe(&event(0)).await;

        assert!(breaker.reset_window().is_none());
        assert_eq!(breaker.snapshot().count, 0);
    }

    #[tokio::test]
    async fn test_failed_remediation_stays_tripped_without_retry() {
        let remediator = Arc::new(FakeRemediator {
            fail: true,
            ..Default::default()
        });
        let breaker = breaker(2, remediator.clone());

        breaker.observe(&event(0)).await;
        let outcome = breaker.observe(&event(1)).await;

        let report = outcome.report().expect("second event should trip");
        assert!(!report.succeeded());
        assert!(report.error.as_deref().unwrap().contains("503"));
        assert_eq!(breaker.state(), BreakerState::Tripped);

        assert_eq!(breaker.observe(&event(2)).await, Outcome::Accepted);
        assert_eq!(remediator.calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_hung_remediation_times_out() {
        let remediator = Arc::new(FakeRemediator {
            hang: true,
            ..Default::default()
        });
        let breaker = breaker(1, remediator.clone()).with_remediation_timeout(Duration::from_secs(5));

        let outcome = breaker.observe(&event(0)).await;
        let report = outcome.report().unwrap();
        assert!(report.error.as_deref().unwrap().contains("timed out"));
        assert!(report.elapsed >= Duration::from_secs(5));
        assert_eq!(breaker.state(), BreakerState::Tripped);
    }

    #[tokio::test]
    async fn test_observers_see_both_transitions() {
        let observer = Arc::new(RecordingObserver::default());
        let breaker = breaker(1, Arc::new(FakeRemediator::default())).with_observer(observer.clone());

        breaker.observe(&event(0)).await;
        breaker.observe(&event(1)).await;
        breaker.reset_window();
        breaker.reset_window();

        let seen = observer.0.lock().unwrap().clone();
        assert_eq!(
            seen,
            vec![
                Transition { from: BreakerState::Armed, to: BreakerState::Tripped, count: 1 },
                Transition { from: BreakerState::Tripped, to: BreakerState::Armed, count: 2 },
            ]
        );
    }

    /// Remembers the destination of the last transition it was told about.
    #[derive(Default)]
    struct LastStateObserver(Mutex<Option<BreakerState>>);

    impl TransitionObserver for LastStateObserver {
        fn on_transition(&self, transition: &Transition) {
            *self.0.lock().unwrap() = Some(transition.to);
        }
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_trip_racing_reset_notifies_in_order() {
        for _ in 0..500 {
            let observer = Arc::new(LastStateObserver::default());
            let breaker =
                Arc::new(breaker(1, Arc::new(FakeRemediator::default())).with_observer(observer.clone()));

            let observing = {
                let breaker = breaker.clone();
                tokio::spawn(async move { breaker.observe(&event(0)).await })
            };
            let resetting = {
                let breaker = breaker.clone();
                tokio::spawn(async move { breaker.reset_window() })
            };
            observing.await.unwrap();
            resetting.await.unwrap();

            let last = *observer.0.lock().unwrap();
            assert_eq!(last, Some(breaker.state()));
        }
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_concurrent_observes_count_exactly_and_trip_once() {
        let remediator = Arc::new(FakeRemediator::default());
        let breaker = Arc::new(breaker(50, remediator.clone()));

        let handles: Vec<_> = (0..200)
            .map(|n| {
                let breaker = breaker.clone();
                tokio::spawn(async move { breaker.observe(&event(n)).await })
            })
            .collect();

        let mut tripped = 0;
        for handle in handles {
            if handle.await.unwrap().is_tripped() {
                tripped += 1;
            }
        }

        assert_eq!(tripped, 1);
        assert_eq!(breaker.snapshot().count, 200);
        assert_eq!(breaker.snapshot().events_total, 200);
        assert_eq!(remediator.calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_resets_racing_observes_never_double_trip_a_window() {
        let remediator = Arc::new(FakeRemediator::default());
        let breaker = Arc::new(breaker(5, remediator.clone()));

        let resetter = {
            let breaker = breaker.clone();
            tokio::spawn(async move {
                for _ in 0..50 {
                    breaker.reset_window();
                    tokio::task::yield_now().await;
                }
            })
        };
        let observers: Vec<_> = (0..8)
            .map(|t| {
                let breaker = breaker.clone();
                tokio::spawn(async move {
                    for n in 0..100 {
                        breaker.observe(&event(t * 100 + n)).await;
                    }
                })
            })
            .collect();

        resetter.await.unwrap();
        for o in observers {
            o.await.unwrap();
        }

        let snap = breaker.snapshot();
        assert_eq!(snap.events_total, 800);
        // At most one trip per window: the initial one plus one per reset.
        assert!(snap.trips_total <= snap.resets_total + 1);
        assert_eq!(remediator.calls.load(Ordering::SeqCst) as u64, snap.trips_total);
    }
}
