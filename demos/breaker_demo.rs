//! Circuit Breaker Demo
//!
//! Walks a breaker through Closed → Open → Half-Open → Closed against a
//! simulated backend, printing every transition.
//!
//! Usage:
//!   RUST_LOG=safecircuit=debug cargo run --example breaker_demo

use safecircuit::{BreakerError, CircuitBreaker, CircuitBreakerConfig, StateListener};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tracing_subscriber::EnvFilter;

struct Announcer;

impl StateListener for Announcer {
    fn on_open(&self) {
        println!("  >> circuit OPEN: backend marked down");
    }
    fn on_close(&self) {
        println!("  >> circuit CLOSED: backend recovered");
    }
    fn on_half_open(&self) {
        println!("  >> circuit HALF-OPEN: sending probe");
    }
}

fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .init();

    println!("=== safecircuit demo ===\n");

    let config = CircuitBreakerConfig::new()
        .with_max_failures(3)
        .with_timeout(Duration::from_millis(500))
        .with_pause_time(Duration::from_millis(100))
        .with_max_consecutive_successes(2);
    println!("Configuration: {:?}\n", config);

    let breaker = CircuitBreaker::with_config(config);
    breaker.add_listener(Arc::new(Announcer));

    let backend_up = AtomicBool::new(false);
    let call_backend = || {
        if backend_up.load(Ordering::SeqCst) {
            Ok("200 OK")
        } else {
            Err("503 Service Unavailable")
        }
    };

    for i in 1..=5 {
        report(i, breaker.execute(call_backend));
    }

    println!("\nWaiting for the cooldown and bringing the backend back...\n");
    std::thread::sleep(Duration::from_millis(600));
    backend_up.store(true, Ordering::SeqCst);

    for i in 6..=8 {
        report(i, breaker.execute(call_backend));
    }

    let snap = breaker.snapshot();
    println!("\nFinal snapshot: {:?}", snap);
}

fn report(i: u32, res: Result<&str, BreakerError<&str>>) {
    match res {
        Ok(body) => println!("Request {}: {}", i, body),
        Err(BreakerError::Open) => println!("Request {}: BLOCKED by circuit breaker", i),
        Err(BreakerError::Operation(e)) => println!("Request {}: FAILED ({})", i, e),
    }
}
