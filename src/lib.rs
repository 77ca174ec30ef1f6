//! # safecircuit
//!
//! 基于连续失败计数的熔断器：失败达到阈值后快速失败，冷却后半开探测恢复。
//!
//! A circuit breaker that guards an arbitrary fallible operation. After
//! `max_failures` consecutive failures it opens and rejects calls without
//! running them; once `timeout` has passed, the next call probes the operation
//! and `max_consecutive_successes` good probes close it again.
//!
//! ## Core Behavior
//!
//! - **One lock per breaker**: the operation, hooks and post-probe pause all run
//!   while the breaker's lock is held, so at most one operation runs through a
//!   breaker at a time
//! - **No background work**: transitions only happen inside `execute`
//! - **Errors pass through**: the operation's error comes back unchanged in
//!   [`BreakerError::Operation`]; the only error the breaker makes is
//!   [`BreakerError::Open`]
//! - **Consecutive counts only**: no failure-rate windows, no error classification
//!
//! ## Quick Start
//!
//! ```rust
//! use safecircuit::{CircuitBreaker, CircuitBreakerConfig};
//! use std::time::Duration;
//!
//! let config = CircuitBreakerConfig::new()
//!     .with_max_failures(5)
//!     .with_timeout(Duration::from_secs(30))
//!     .with_max_consecutive_successes(2);
//! let breaker = CircuitBreaker::with_config(config);
//!
//! match breaker.execute(|| std::fs::metadata("/")) {
//!     Ok(meta) => assert!(meta.is_dir()),
//!     Err(e) if e.is_open() => { /* not attempted */ }
//!     Err(e) => eprintln!("attempted and failed: {}", e),
//! }
//! ```
//!
//! ## Module Organization
//!
//! | Module | Description |
//! |--------|-------------|
//! | [`resilience`] | Breakers, state machine, hooks, snapshots |
//! | [`config`] | Tuning values, serde and environment loading |
//! | [`error`] | Crate error types |

pub mod config;
pub mod resilience;

// Re-export main types for convenience
pub use config::{CircuitBreakerConfig, CloseNotification};
pub use resilience::{
    AsyncCircuitBreaker, CircuitBreaker, CircuitBreakerSnapshot, CircuitState, StateListener,
};

/// Result type alias for the library
pub type Result<T> = std::result::Result<T, Error>;

/// Error type for the library
pub mod error;
pub use error::{BreakerError, Error, ErrorContext};
