use super::hooks::{Callback, StateListener, Transition};
use super::state::{
    Admission, BreakerCore, CircuitBreakerSnapshot, CircuitState, LifetimeCounters,
};
use crate::config::CircuitBreakerConfig;
use crate::BreakerError;
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::{Duration, Instant};
use tracing::warn;

/// Blocking circuit breaker.
///
/// - Counts consecutive failures while Closed and opens at `max_failures`
/// - Rejects calls while Open, until `timeout` has passed since the trip
/// - Probes one call at a time while HalfOpen, pausing `pause_time` after each
///
/// One mutex is held for the whole of [`execute`](Self::execute), including the
/// operation, hooks and the post-probe pause. At most one operation runs
/// through a given breaker at any time, so a slow operation delays every
/// caller.
#[derive(Debug)]
pub struct CircuitBreaker {
    cfg: CircuitBreakerConfig,
    core: Mutex<BreakerCore>,
    totals: LifetimeCounters,
}

impl CircuitBreaker {
    /// Build a breaker from the four tuning values. No validation is done:
    /// `max_failures == 0` trips on the first failure and
    /// `max_consecutive_successes == 0` closes on the first good probe.
    pub fn new(
        max_failures: u32,
        timeout: Duration,
        pause_time: Duration,
        max_consecutive_successes: u32,
    ) -> Self {
        Self::with_config(CircuitBreakerConfig {
            max_failures,
            timeout,
            pause_time,
            max_consecutive_successes,
            ..CircuitBreakerConfig::default()
        })
    }

    pub fn with_config(cfg: CircuitBreakerConfig) -> Self {
        Self {
            cfg,
            core: Mutex::new(BreakerCore::new()),
            totals: LifetimeCounters::default(),
        }
    }

    pub fn config(&self) -> &CircuitBreakerConfig {
        &self.cfg
    }

    // A panic inside an operation or hook poisons the mutex; the state itself
    // is still consistent because nothing was recorded for that call.
    fn lock(&self) -> MutexGuard<'_, BreakerCore> {
        self.core.lock().unwrap_or_else(|poisoned| {
            warn!("circuit breaker lock poisoned, recovering");
            poisoned.into_inner()
        })
    }

    /// Run `operation` under the breaker.
    ///
    /// Returns `Err(BreakerError::Open)` without calling `operation` while the
    /// breaker is Open. Otherwise `operation` runs exactly once and its result
    /// comes back unchanged (errors wrapped in `BreakerError::Operation`).
    pub fn execute<T, E, F>(&self, operation: F) -> Result<T, BreakerError<E>>
    where
        F: FnOnce() -> Result<T, E>,
    {
        let mut core = self.lock();
        let admission = core.admit(Instant::now());
        if admission == Admission::Rejected {
            return Err(BreakerError::Open);
        }

        let outcome = operation();
        core.record(&self.cfg, &self.totals, admission, outcome.is_ok());

        if admission == Admission::Probe && !self.cfg.pause_time.is_zero() {
            std::thread::sleep(self.cfg.pause_time);
        }
        drop(core);

        outcome.map_err(BreakerError::Operation)
    }

    /// Replace the hook run when the breaker opens.
    ///
    /// The hook runs while the breaker lock is held and must not call back
    /// into the same breaker.
    pub fn set_on_open<F>(&self, callback: F)
    where
        F: Fn() + Send + Sync + 'static,
    {
        self.set_hook(Transition::Opened, Arc::new(callback));
    }

    /// Replace the hook run when the breaker closes.
    ///
    /// The hook runs while the breaker lock is held and must not call back
    /// into the same breaker.
    pub fn set_on_close<F>(&self, callback: F)
    where
        F: Fn() + Send + Sync + 'static,
    {
        self.set_hook(Transition::Closed, Arc::new(callback));
    }

    /// Replace the hook run when the breaker goes half-open.
    ///
    /// The hook runs while the breaker lock is held and must not call back
    /// into the same breaker.
    pub fn set_on_half_open<F>(&self, callback: F)
    where
        F: Fn() + Send + Sync + 'static,
    {
        self.set_hook(Transition::HalfOpened, Arc::new(callback));
    }

    fn set_hook(&self, transition: Transition, callback: Callback) {
        self.lock().hooks.set(transition, callback);
    }

    /// Register an observer. Listeners run after the closure hooks, in
    /// registration order.
    pub fn add_listener(&self, listener: Arc<dyn StateListener>) {
        self.lock().hooks.add_listener(listener);
    }

    pub fn clear_hooks(&self) {
        self.lock().hooks.clear();
    }

    pub fn state(&self) -> CircuitState {
        self.lock().state()
    }

    pub fn consecutive_failures(&self) -> u32 {
        self.lock().consecutive_failures()
    }

    pub fn consecutive_successes(&self) -> u32 {
        self.lock().consecutive_successes()
    }

    /// Lifetime count of failed operation runs. Does not take the lock.
    pub fn total_failures(&self) -> u64 {
        self.totals.failures()
    }

    /// Lifetime count of successful operation runs. Does not take the lock.
    pub fn total_successes(&self) -> u64 {
        self.totals.successes()
    }

    pub fn snapshot(&self) -> CircuitBreakerSnapshot {
        self.lock().snapshot(&self.cfg, &self.totals, Instant::now())
    }
}

impl Default for CircuitBreaker {
    fn default() -> Self {
        Self::with_config(CircuitBreakerConfig::default())
    }
}
