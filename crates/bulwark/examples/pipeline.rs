// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

//! Pipeline example that protects a simulated flaky price service by:
//!
//! 1. Bounding concurrent calls with a bulkhead
//! 2. Failing fast through a circuit breaker once the service keeps failing
//! 3. Retrying transient failures with exponential backoff
//! 4. Answering with a cached price when everything else failed

use std::sync::atomic::{AtomicU32, Ordering};
use std::time::Duration;

use bulwark::breaker::CircuitBreaker;
use bulwark::bulkhead::Bulkhead;
use bulwark::fallback::Fallback;
use bulwark::retry::Retry;
use bulwark::{Error, PolicyContext};

const CACHED_PRICE: u32 = 999;

fn main() {
    let context = PolicyContext::default().name("pricing");

    let bulkhead = Bulkhead::builder("pricing_bulkhead")
        .context(&context)
        .max_concurrent(4)
        .build();
    let breaker = CircuitBreaker::builder("pricing_breaker")
        .context(&context)
        .failure_threshold(4)
        .open_timeout(Duration::from_millis(200))
        .on_opened(|args| println!("circuit opened after {} consecutive failures", args.consecutive_failures()))
        .on_closed(|_| println!("circuit closed, the price service recovered"))
        .build();
    let retry = Retry::builder("pricing_retry")
        .context(&context)
        .max_retries(2)
        .initial_delay(Duration::from_millis(10))
        // Rejections will not go away by retrying immediately.
        .retry_if(|error: &Error<PriceError>, _| !error.is_policy())
        .on_retry(|error, args| println!("attempt {} failed ({error}), retrying in {:?}", args.attempt(), args.delay()))
        .build();
    let fallback = Fallback::builder("pricing_fallback")
        .context(&context)
        .with(|error: Error<PriceError>, _| {
            println!("serving cached price because of: {error}");
            CACHED_PRICE
        })
        .build();

    let service = FlakyPriceService::default();

    for request in 0..12 {
        let price = fallback.execute(|| {
            retry.execute(|| {
                breaker
                    .execute(|| bulkhead.execute(|| service.price(request)))
                    .map_err(Error::flatten)
            })
        });

        println!("request {request}: price {price}");
    }

    println!();
    println!("breaker: {:?}", breaker.stats());
    println!("retry: {:?}", retry.stats());
    println!("fallback: {:?}", fallback.stats());
}

#[derive(Debug, thiserror::Error)]
#[error("price service unavailable")]
struct PriceError;

/// Succeeds for the first few calls, then goes down.
#[derive(Debug, Default)]
struct FlakyPriceService {
    calls: AtomicU32,
}

impl FlakyPriceService {
    fn price(&self, request: u32) -> Result<u32, PriceError> {
        let call = self.calls.fetch_add(1, Ordering::SeqCst);
        if call < 4 { Ok(100 + request) } else { Err(PriceError) }
    }
}
