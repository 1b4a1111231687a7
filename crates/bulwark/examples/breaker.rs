// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

//! Circuit breaker example that simulates an outage and a recovery while logging every
//! state change:
//!
//! 1. The dependency fails and the circuit opens
//! 2. Calls are rejected without reaching the dependency
//! 3. After the open timeout a probe is let through
//! 4. The dependency has recovered and the circuit closes
//!
//! Run with `cargo run --example breaker --features logs`.

use std::sync::atomic::{AtomicBool, Ordering};
use std::thread;
use std::time::Duration;

use bulwark::PolicyContext;
use bulwark::breaker::CircuitBreaker;

fn main() {
    tracing_subscriber::fmt().with_target(false).init();

    let context = PolicyContext::default().name("example").enable_logs();
    let breaker = CircuitBreaker::builder("dependency")
        .context(&context)
        .failure_threshold(3)
        .success_threshold(1)
        .open_timeout(Duration::from_millis(300))
        .build();

    let healthy = AtomicBool::new(false);
    let call = || {
        breaker.execute(|| {
            if healthy.load(Ordering::SeqCst) {
                Ok("pong")
            } else {
                Err("connection refused")
            }
        })
    };

    for _ in 0..5 {
        match call() {
            Ok(reply) => println!("reply: {reply}"),
            Err(error) => println!("error: {error}"),
        }
    }

    println!("state: {}, waiting for the open timeout", breaker.state());
    healthy.store(true, Ordering::SeqCst);
    thread::sleep(Duration::from_millis(350));

    match call() {
        Ok(reply) => println!("probe reply: {reply}"),
        Err(error) => println!("probe error: {error}"),
    }

    println!("state: {}", breaker.state());
}
