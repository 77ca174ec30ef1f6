//! Breaker state machine shared by the blocking and async breakers.
//!
//! # State Transitions
//! ```text
//! Closed   → Open:     consecutive_failures >= max_failures
//! Open     → HalfOpen: first call after open_until
//! HalfOpen → Closed:   consecutive_successes >= max_consecutive_successes
//! HalfOpen → Open:     any failed probe
//! ```
//!
//! `BreakerCore` holds no lock of its own. Callers own it behind their mutex and
//! keep that mutex held from [`BreakerCore::admit`] until the outcome has been
//! recorded, so hooks fire inside the critical section.

use super::hooks::{Hooks, Transition};
use crate::config::{CircuitBreakerConfig, CloseNotification};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::{Duration, Instant};
use tracing::{debug, info};

// Stand-in deadline for cooldowns too large to add to an Instant.
const FAR_FUTURE: Duration = Duration::from_secs(100 * 365 * 24 * 60 * 60);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CircuitState {
    #[default]
    Closed,
    Open,
    HalfOpen,
}

impl fmt::Display for CircuitState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CircuitState::Closed => f.write_str("closed"),
            CircuitState::Open => f.write_str("open"),
            CircuitState::HalfOpen => f.write_str("half_open"),
        }
    }
}

/// Point-in-time view of a breaker for monitoring.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CircuitBreakerSnapshot {
    pub state: CircuitState,
    pub max_failures: u32,
    pub max_consecutive_successes: u32,
    pub timeout_ms: u64,
    pub consecutive_failures: u32,
    pub consecutive_successes: u32,
    pub total_failures: u64,
    pub total_successes: u64,
    /// Remaining open time in ms, if currently open.
    pub open_remaining_ms: Option<u64>,
}

/// Lifetime counters. Only ever incremented; readable without the state lock.
#[derive(Debug, Default)]
pub(crate) struct LifetimeCounters {
    failures: AtomicU64,
    successes: AtomicU64,
}

impl LifetimeCounters {
    pub(crate) fn failures(&self) -> u64 {
        self.failures.load(Ordering::Relaxed)
    }

    pub(crate) fn successes(&self) -> u64 {
        self.successes.load(Ordering::Relaxed)
    }

    fn record(&self, succeeded: bool) {
        let counter = if succeeded {
            &self.successes
        } else {
            &self.failures
        };
        counter.fetch_add(1, Ordering::Relaxed);
    }
}

/// What a call is allowed to do, decided at entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Admission {
    /// Open and inside the cooldown: do not run the operation.
    Rejected,
    /// HalfOpen: run once, then pause.
    Probe,
    /// Closed: run once.
    Normal,
}

#[derive(Debug, Default)]
pub(crate) struct BreakerCore {
    state: CircuitState,
    consecutive_failures: u32,
    consecutive_successes: u32,
    open_until: Option<Instant>,
    pub(crate) hooks: Hooks,
}

impl BreakerCore {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    pub(crate) fn state(&self) -> CircuitState {
        self.state
    }

    pub(crate) fn consecutive_failures(&self) -> u32 {
        self.consecutive_failures
    }

    pub(crate) fn consecutive_successes(&self) -> u32 {
        self.consecutive_successes
    }

    /// Decide whether the call may run. An Open breaker whose cooldown has
    /// passed moves to HalfOpen here and the call becomes the probe.
    pub(crate) fn admit(&mut self, now: Instant) -> Admission {
        match self.state {
            CircuitState::Closed => Admission::Normal,
            CircuitState::HalfOpen => Admission::Probe,
            CircuitState::Open => match self.open_until {
                Some(until) if now <= until => {
                    debug!(
                        remaining_ms = until.duration_since(now).as_millis() as u64,
                        "circuit breaker open, rejecting call"
                    );
                    Admission::Rejected
                }
                _ => {
                    self.state = CircuitState::HalfOpen;
                    info!("circuit breaker half-open, probing");
                    self.hooks.fire(Transition::HalfOpened);
                    Admission::Probe
                }
            },
        }
    }

    /// Apply the outcome of an admitted call.
    pub(crate) fn record(
        &mut self,
        cfg: &CircuitBreakerConfig,
        totals: &LifetimeCounters,
        admission: Admission,
        succeeded: bool,
    ) {
        if admission == Admission::Rejected {
            return;
        }
        totals.record(succeeded);

        match (admission, succeeded) {
            (Admission::Normal, true) => self.reset(cfg),
            (Admission::Normal, false) => {
                self.consecutive_failures = self.consecutive_failures.saturating_add(1);
                if self.consecutive_failures >= cfg.max_failures {
                    self.trip(cfg);
                }
            }
            (Admission::Probe, true) => {
                self.consecutive_successes = self.consecutive_successes.saturating_add(1);
                debug!(
                    consecutive_successes = self.consecutive_successes,
                    required = cfg.max_consecutive_successes,
                    "probe succeeded"
                );
                if self.consecutive_successes >= cfg.max_consecutive_successes {
                    self.reset(cfg);
                }
            }
            (Admission::Probe, false) => {
                debug!("probe failed");
                self.trip(cfg);
            }
            (Admission::Rejected, _) => {}
        }
    }

    fn trip(&mut self, cfg: &CircuitBreakerConfig) {
        let now = Instant::now();
        info!(
            from = %self.state,
            consecutive_failures = self.consecutive_failures,
            timeout_ms = cfg.timeout.as_millis() as u64,
            "circuit breaker opened"
        );
        self.state = CircuitState::Open;
        self.consecutive_failures = 0;
        self.consecutive_successes = 0;
        // A zero cooldown leaves the deadline unset so the next call always probes.
        self.open_until = if cfg.timeout.is_zero() {
            None
        } else {
            Some(
                now.checked_add(cfg.timeout)
                    .or_else(|| now.checked_add(FAR_FUTURE))
                    .unwrap_or(now),
            )
        };
        self.hooks.fire(Transition::Opened);
    }

    fn reset(&mut self, cfg: &CircuitBreakerConfig) {
        let was = self.state;
        self.state = CircuitState::Closed;
        self.consecutive_failures = 0;
        self.consecutive_successes = 0;

        let transitioned = was != CircuitState::Closed;
        if transitioned {
            info!(from = %was, "circuit breaker closed");
        }
        if transitioned || cfg.close_notification == CloseNotification::EveryReset {
            self.hooks.fire(Transition::Closed);
        }
    }

    pub(crate) fn snapshot(
        &self,
        cfg: &CircuitBreakerConfig,
        totals: &LifetimeCounters,
        now: Instant,
    ) -> CircuitBreakerSnapshot {
        let open_remaining_ms = match (self.state, self.open_until) {
            (CircuitState::Open, Some(until)) if now <= until => {
                Some(until.duration_since(now).as_millis() as u64)
            }
            _ => None,
        };
        CircuitBreakerSnapshot {
            state: self.state,
            max_failures: cfg.max_failures,
            max_consecutive_successes: cfg.max_consecutive_successes,
            timeout_ms: cfg.timeout.as_millis() as u64,
            consecutive_failures: self.consecutive_failures,
            consecutive_successes: self.consecutive_successes,
            total_failures: totals.failures(),
            total_successes: totals.successes(),
            open_remaining_ms,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::{Arc, Mutex};

    fn cfg(max_failures: u32, timeout: Duration, successes: u32) -> CircuitBreakerConfig {
        CircuitBreakerConfig::new()
            .with_max_failures(max_failures)
            .with_timeout(timeout)
            .with_max_consecutive_successes(successes)
    }

    fn run(
        core: &mut BreakerCore,
        cfg: &CircuitBreakerConfig,
        totals: &LifetimeCounters,
        ok: bool,
    ) -> Admission {
        let admission = core.admit(Instant::now());
        core.record(cfg, totals, admission, ok);
        admission
    }

    fn assert_counters_exclusive(core: &BreakerCore) {
        assert!(
            core.consecutive_failures == 0 || core.consecutive_successes == 0,
            "both consecutive counters positive: {:?}",
            core
        );
    }

    #[test]
    fn test_initial_state() {
        let core = BreakerCore::new();
        assert_eq!(core.state(), CircuitState::Closed);
        assert_eq!(core.consecutive_failures(), 0);
        assert_eq!(core.consecutive_successes(), 0);
        assert!(core.open_until.is_none());
    }

    #[test]
    fn test_trips_at_threshold() {
        let cfg = cfg(3, Duration::from_secs(60), 1);
        let totals = LifetimeCounters::default();
        let mut core = BreakerCore::new();

        run(&mut core, &cfg, &totals, false);
        run(&mut core, &cfg, &totals, false);
        assert_eq!(core.state(), CircuitState::Closed);
        assert_eq!(core.consecutive_failures(), 2);

        run(&mut core, &cfg, &totals, false);
        assert_eq!(core.state(), CircuitState::Open);
        assert_eq!(core.consecutive_failures(), 0);
        assert!(core.open_until.is_some());
        assert_eq!(totals.failures(), 3);
    }

    #[test]
    fn test_zero_max_failures_trips_on_first_failure() {
        let cfg = cfg(0, Duration::from_secs(60), 1);
        let totals = LifetimeCounters::default();
        let mut core = BreakerCore::new();

        run(&mut core, &cfg, &totals, false);
        assert_eq!(core.state(), CircuitState::Open);
    }

    #[test]
    fn test_rejected_call_changes_nothing() {
        let cfg = cfg(1, Duration::from_secs(60), 1);
        let totals = LifetimeCounters::default();
        let mut core = BreakerCore::new();
        run(&mut core, &cfg, &totals, false);

        let admission = run(&mut core, &cfg, &totals, true);
        assert_eq!(admission, Admission::Rejected);
        assert_eq!(core.state(), CircuitState::Open);
        assert_eq!(totals.successes(), 0);
        assert_eq!(totals.failures(), 1);
    }

    #[test]
    fn test_open_with_unset_deadline_goes_half_open() {
        let mut core = BreakerCore {
            state: CircuitState::Open,
            ..BreakerCore::default()
        };
        assert_eq!(core.admit(Instant::now()), Admission::Probe);
        assert_eq!(core.state(), CircuitState::HalfOpen);
    }

    #[test]
    fn test_deadline_boundary_is_inclusive() {
        let now = Instant::now();
        let mut core = BreakerCore {
            state: CircuitState::Open,
            open_until: Some(now),
            ..BreakerCore::default()
        };
        assert_eq!(core.admit(now), Admission::Rejected);
        assert_eq!(core.admit(now + Duration::from_nanos(1)), Admission::Probe);
    }

    #[test]
    fn test_zero_timeout_admits_even_at_trip_instant() {
        let cfg = cfg(1, Duration::ZERO, 1);
        let totals = LifetimeCounters::default();
        let mut core = BreakerCore::new();
        let before_trip = Instant::now();

        run(&mut core, &cfg, &totals, false);
        assert_eq!(core.state(), CircuitState::Open);
        assert!(core.open_until.is_none());
        assert!(core.snapshot(&cfg, &totals, before_trip).open_remaining_ms.is_none());

        // Same clock reading as the trip, or earlier: still admitted as a trial call.
        assert_eq!(core.admit(before_trip), Admission::Probe);
        assert_eq!(core.state(), CircuitState::HalfOpen);
    }

    #[test]
    fn test_half_open_needs_consecutive_successes() {
        let cfg = cfg(1, Duration::ZERO, 3);
        let totals = LifetimeCounters::default();
        let mut core = BreakerCore::new();
        run(&mut core, &cfg, &totals, false);
        assert_eq!(core.state(), CircuitState::Open);

        assert_eq!(run(&mut core, &cfg, &totals, true), Admission::Probe);
        assert_eq!(core.state(), CircuitState::HalfOpen);
        run(&mut core, &cfg, &totals, true);
        assert_eq!(core.consecutive_successes(), 2);
        assert_counters_exclusive(&core);
        run(&mut core, &cfg, &totals, true);
        assert_eq!(core.state(), CircuitState::Closed);
        assert_eq!(core.consecutive_successes(), 0);
        assert_eq!(core.consecutive_failures(), 0);
    }

    #[test]
    fn test_failed_probe_retrips_and_moves_deadline() {
        let cfg = cfg(1, Duration::from_millis(20), 3);
        let totals = LifetimeCounters::default();
        let mut core = BreakerCore::new();
        run(&mut core, &cfg, &totals, false);
        let first_deadline = core.open_until.unwrap();

        std::thread::sleep(Duration::from_millis(30));
        run(&mut core, &cfg, &totals, true);
        assert_eq!(core.state(), CircuitState::HalfOpen);
        assert_eq!(core.consecutive_successes(), 1);

        run(&mut core, &cfg, &totals, false);
        assert_eq!(core.state(), CircuitState::Open);
        assert_eq!(core.consecutive_successes(), 0);
        assert!(core.open_until.unwrap() > first_deadline);
        assert_eq!(totals.failures(), 2);
        assert_eq!(totals.successes(), 1);
    }

    #[test]
    fn test_close_notification_modes() {
        let closes = Arc::new(Mutex::new(0u32));
        let mut core = BreakerCore::new();
        let c = closes.clone();
        core.hooks
            .set(Transition::Closed, Arc::new(move || *c.lock().unwrap() += 1));
        let totals = LifetimeCounters::default();

        let edge = CircuitBreakerConfig::new();
        run(&mut core, &edge, &totals, true);
        run(&mut core, &edge, &totals, true);
        assert_eq!(*closes.lock().unwrap(), 0);

        let level =
            CircuitBreakerConfig::new().with_close_notification(CloseNotification::EveryReset);
        run(&mut core, &level, &totals, true);
        run(&mut core, &level, &totals, true);
        assert_eq!(*closes.lock().unwrap(), 2);
    }

    #[test]
    fn test_huge_timeout_does_not_overflow() {
        let cfg = cfg(1, Duration::MAX, 1);
        let totals = LifetimeCounters::default();
        let mut core = BreakerCore::new();
        run(&mut core, &cfg, &totals, false);
        assert_eq!(core.state(), CircuitState::Open);
        assert_eq!(run(&mut core, &cfg, &totals, true), Admission::Rejected);
    }

    #[test]
    fn test_snapshot_reports_remaining_only_while_open() {
        let cfg = cfg(1, Duration::from_secs(30), 1);
        let totals = LifetimeCounters::default();
        let mut core = BreakerCore::new();

        let snap = core.snapshot(&cfg, &totals, Instant::now());
        assert_eq!(snap.state, CircuitState::Closed);
        assert!(snap.open_remaining_ms.is_none());

        run(&mut core, &cfg, &totals, false);
        let snap = core.snapshot(&cfg, &totals, Instant::now());
        assert_eq!(snap.state, CircuitState::Open);
        assert_eq!(snap.timeout_ms, 30_000);
        assert_eq!(snap.total_failures, 1);
        let remaining = snap.open_remaining_ms.unwrap();
        assert!(remaining > 0 && remaining <= 30_000);
    }

    #[test]
    fn test_state_display() {
        assert_eq!(CircuitState::Closed.to_string(), "closed");
        assert_eq!(CircuitState::Open.to_string(), "open");
        assert_eq!(CircuitState::HalfOpen.to_string(), "half_open");
    }
}
