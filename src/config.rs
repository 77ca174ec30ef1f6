//! 熔断器配置：阈值、冷却时间、探测间隔以及环境变量加载。
//!
//! Breaker configuration.
//!
//! Values can be built in code, deserialized (durations are integer
//! milliseconds), or read from the environment:
//!
//! | Variable | Field | Default |
//! |----------|-------|---------|
//! | `SAFECIRCUIT_MAX_FAILURES` | `max_failures` | 5 |
//! | `SAFECIRCUIT_TIMEOUT_MS` | `timeout` | 30000 |
//! | `SAFECIRCUIT_PAUSE_MS` | `pause_time` | 0 |
//! | `SAFECIRCUIT_MAX_CONSECUTIVE_SUCCESSES` | `max_consecutive_successes` | 1 |
//! | `SAFECIRCUIT_CLOSE_NOTIFICATION` | `close_notification` | `transition` |

use crate::{Error, ErrorContext, Result};
use serde::{Deserialize, Serialize};
use std::env::VarError;
use std::fmt;
use std::str::FromStr;
use std::time::Duration;

/// Default environment variable prefix used by [`CircuitBreakerConfig::from_env`].
pub const ENV_PREFIX: &str = "SAFECIRCUIT";

/// When the close hook fires.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CloseNotification {
    /// Only when the breaker actually leaves Open or HalfOpen.
    #[default]
    Transition,
    /// On every reset, including each success while already Closed.
    EveryReset,
}

impl fmt::Display for CloseNotification {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CloseNotification::Transition => f.write_str("transition"),
            CloseNotification::EveryReset => f.write_str("every_reset"),
        }
    }
}

impl FromStr for CloseNotification {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "transition" | "edge" => Ok(CloseNotification::Transition),
            "every_reset" | "every-reset" | "level" => Ok(CloseNotification::EveryReset),
            other => Err(format!(
                "unknown close notification mode '{}' (expected 'transition' or 'every_reset')",
                other
            )),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct CircuitBreakerConfig {
    /// Consecutive failures while Closed that trip the breaker. `0` trips on the first failure.
    pub max_failures: u32,
    /// How long the breaker stays Open before a probe is allowed.
    #[serde(rename = "timeout_ms", with = "duration_ms")]
    pub timeout: Duration,
    /// Delay enforced after every HalfOpen probe, while the lock is still held.
    #[serde(rename = "pause_ms", with = "duration_ms")]
    pub pause_time: Duration,
    /// Consecutive successful probes needed to close again. `0` behaves like `1`.
    pub max_consecutive_successes: u32,
    pub close_notification: CloseNotification,
}

impl Default for CircuitBreakerConfig {
    fn default() -> Self {
        Self {
            max_failures: 5,
            timeout: Duration::from_secs(30),
            pause_time: Duration::ZERO,
            max_consecutive_successes: 1,
            close_notification: CloseNotification::Transition,
        }
    }
}

impl CircuitBreakerConfig {
    /// Create a new config with default values
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_max_failures(mut self, max_failures: u32) -> Self {
        self.max_failures = max_failures;
        self
    }

    /// Set the open-state cooldown
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Set the post-probe pause
    pub fn with_pause_time(mut self, pause_time: Duration) -> Self {
        self.pause_time = pause_time;
        self
    }

    pub fn with_max_consecutive_successes(mut self, n: u32) -> Self {
        self.max_consecutive_successes = n;
        self
    }

    pub fn with_close_notification(mut self, mode: CloseNotification) -> Self {
        self.close_notification = mode;
        self
    }

    /// Load from `SAFECIRCUIT_*` environment variables, keeping defaults for unset ones.
    pub fn from_env() -> Result<Self> {
        Self::from_env_with_prefix(ENV_PREFIX)
    }

    /// Same as [`from_env`](Self::from_env) with a custom prefix (`<PREFIX>_MAX_FAILURES`, ...).
    pub fn from_env_with_prefix(prefix: &str) -> Result<Self> {
        let mut cfg = Self::default();
        if let Some(v) = read_env::<u32>(prefix, "MAX_FAILURES")? {
            cfg.max_failures = v;
        }
        if let Some(ms) = read_env::<u64>(prefix, "TIMEOUT_MS")? {
            cfg.timeout = Duration::from_millis(ms);
        }
        if let Some(ms) = read_env::<u64>(prefix, "PAUSE_MS")? {
            cfg.pause_time = Duration::from_millis(ms);
        }
        if let Some(v) = read_env::<u32>(prefix, "MAX_CONSECUTIVE_SUCCESSES")? {
            cfg.max_consecutive_successes = v;
        }
        if let Some(mode) = read_env::<CloseNotification>(prefix, "CLOSE_NOTIFICATION")? {
            cfg.close_notification = mode;
        }
        Ok(cfg)
    }
}

fn read_env<T>(prefix: &str, key: &str) -> Result<Option<T>>
where
    T: FromStr,
    T::Err: fmt::Display,
{
    let name = format!("{}_{}", prefix, key);
    match std::env::var(&name) {
        Ok(raw) => raw.trim().parse::<T>().map(Some).map_err(|e| {
            Error::configuration_with_context(
                format!("invalid value for {}", name),
                ErrorContext::new()
                    .with_field_path(name.clone())
                    .with_details(format!("{:?}: {}", raw, e))
                    .with_source("config::from_env"),
            )
        }),
        Err(VarError::NotPresent) => Ok(None),
        Err(VarError::NotUnicode(_)) => Err(Error::configuration_with_context(
            format!("{} is not valid unicode", name),
            ErrorContext::new()
                .with_field_path(name.clone())
                .with_source("config::from_env"),
        )),
    }
}

mod duration_ms {
    use serde::{Deserialize, Deserializer, Serializer};
    use std::time::Duration;

    pub fn serialize<S: Serializer>(d: &Duration, s: S) -> Result<S::Ok, S::Error> {
        s.serialize_u64(u64::try_from(d.as_millis()).unwrap_or(u64::MAX))
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(d: D) -> Result<Duration, D::Error> {
        u64::deserialize(d).map(Duration::from_millis)
    }
}
