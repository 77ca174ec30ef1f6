//! 弹性模式模块：熔断器状态机、阻塞与异步两种执行器以及状态转换钩子。
//!
//! # Circuit Breaker Module
//!
//! Wraps a fallible operation and stops calling it after repeated failures,
//! then probes for recovery after a cooldown.
//!
//! ## Key Components
//!
//! | Component | Description |
//! |-----------|-------------|
//! | [`CircuitBreaker`] | Blocking breaker (`std::sync::Mutex`, `std::thread::sleep`) |
//! | [`AsyncCircuitBreaker`] | Tokio breaker (`tokio::sync::Mutex`, `tokio::time::sleep`) |
//! | [`StateListener`] | Observer notified on open / close / half-open |
//! | [`CircuitBreakerSnapshot`] | Counters and remaining cooldown for monitoring |
//!
//! ## States
//!
//! - **Closed**: calls run; consecutive failures are counted
//! - **Open**: calls fail fast with [`BreakerError::Open`](crate::BreakerError::Open)
//! - **Half-Open**: calls run one at a time as probes
//!
//! Transitions only happen inside `execute`. A breaker left Open with no
//! traffic stays Open; the next call after the cooldown becomes the probe.
//!
//! ```rust
//! use safecircuit::{BreakerError, CircuitBreaker, CircuitState};
//! use std::time::Duration;
//!
//! let breaker = CircuitBreaker::new(2, Duration::from_secs(30), Duration::ZERO, 1);
//! breaker.set_on_open(|| eprintln!("backend marked down"));
//!
//! for _ in 0..2 {
//!     let res = breaker.execute(|| Err::<(), _>("connection refused"));
//!     assert_eq!(res, Err(BreakerError::Operation("connection refused")));
//! }
//! assert_eq!(breaker.state(), CircuitState::Open);
//! assert!(breaker.execute(|| Ok::<_, &str>(())).unwrap_err().is_open());
//! ```

pub mod async_breaker;
pub mod circuit_breaker;
pub mod hooks;
pub mod state;

pub use async_breaker::AsyncCircuitBreaker;
pub use circuit_breaker::CircuitBreaker;
pub use hooks::StateListener;
pub use state::{CircuitBreakerSnapshot, CircuitState};
