//! 异步熔断器：在 tokio 运行时中使用，锁跨越 await 持有。
//!
//! Async circuit breaker for tokio.
//!
//! Same state machine, counters and hooks as [`CircuitBreaker`](super::CircuitBreaker).
//! The lock is a `tokio::sync::Mutex` held across the operation's `.await` and
//! across the post-probe pause (`tokio::time::sleep`), so mutual exclusion is
//! preserved without blocking a runtime worker thread.
//!
//! Dropping the future returned by [`AsyncCircuitBreaker::execute`] while the
//! operation is pending releases the lock and records no outcome.

use super::hooks::{Callback, StateListener, Transition};
use super::state::{
    Admission, BreakerCore, CircuitBreakerSnapshot, CircuitState, LifetimeCounters,
};
use crate::config::CircuitBreakerConfig;
use crate::BreakerError;
use std::future::Future;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::Mutex;

#[derive(Debug)]
pub struct AsyncCircuitBreaker {
    cfg: CircuitBreakerConfig,
    core: Mutex<BreakerCore>,
    totals: LifetimeCounters,
}

impl AsyncCircuitBreaker {
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

    /// Run the future produced by `operation` under the breaker.
    ///
    /// `operation` is only called when the breaker admits the call.
    pub async fn execute<T, E, F, Fut>(&self, operation: F) -> Result<T, BreakerError<E>>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<T, E>>,
    {
        let mut core = self.core.lock().await;
        let admission = core.admit(Instant::now());
        if admission == Admission::Rejected {
            return Err(BreakerError::Open);
        }

        let outcome = operation().await;
        core.record(&self.cfg, &self.totals, admission, outcome.is_ok());

        if admission == Admission::Probe && !self.cfg.pause_time.is_zero() {
            tokio::time::sleep(self.cfg.pause_time).await;
        }
        drop(core);

        outcome.map_err(BreakerError::Operation)
    }

    /// Runs with the breaker lock held; the hook must not call back into
    /// the same breaker.
    pub async fn set_on_open<F>(&self, callback: F)
    where
        F: Fn() + Send + Sync + 'static,
    {
        self.set_hook(Transition::Opened, Arc::new(callback)).await;
    }

    /// Runs with the breaker lock held; the hook must not call back into
    /// the same breaker.
    pub async fn set_on_close<F>(&self, callback: F)
    where
        F: Fn() + Send + Sync + 'static,
    {
        self.set_hook(Transition::Closed, Arc::new(callback)).await;
    }

    /// Runs with the breaker lock held; the hook must not call back into
    /// the same breaker.
    pub async fn set_on_half_open<F>(&self, callback: F)
    where
        F: Fn() + Send + Sync + 'static,
    {
        self.set_hook(Transition::HalfOpened, Arc::new(callback)).await;
    }

    async fn set_hook(&self, transition: Transition, callback: Callback) {
        self.core.lock().await.hooks.set(transition, callback);
    }

    pub async fn add_listener(&self, listener: Arc<dyn StateListener>) {
        self.core.lock().await.hooks.add_listener(listener);
    }

    pub async fn clear_hooks(&self) {
        self.core.lock().await.hooks.clear();
    }

    pub async fn state(&self) -> CircuitState {
        self.core.lock().await.state()
    }

    pub async fn consecutive_failures(&self) -> u32 {
        self.core.lock().await.consecutive_failures()
    }

    pub async fn consecutive_successes(&self) -> u32 {
        self.core.lock().await.consecutive_successes()
    }

    pub fn total_failures(&self) -> u64 {
        self.totals.failures()
    }

    pub fn total_successes(&self) -> u64 {
        self.totals.successes()
    }

    pub async fn snapshot(&self) -> CircuitBreakerSnapshot {
        self.core
            .lock()
            .await
            .snapshot(&self.cfg, &self.totals, Instant::now())
    }
}

impl Default for AsyncCircuitBreaker {
    fn default() -> Self {
        Self::with_config(CircuitBreakerConfig::default())
    }
}
