// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

//! Integration tests for the fallback policy using only the public API.

use bulwark::fallback::Fallback;

#[test]
fn always_failing_returns_default() {
    let fallback = Fallback::builder("defaults").value(vec![0_u8; 4]).build();

    for _ in 0..5 {
        assert_eq!(fallback.execute(|| Err::<Vec<u8>, _>("no data")), vec![0_u8; 4]);
    }

    let stats = fallback.stats();
    assert_eq!(stats.total_invocations, 5);
    assert_eq!(stats.fallback_used, stats.total_invocations);
}

#[test]
fn mixed_outcomes_are_counted() {
    let fallback = Fallback::builder("mixed")
        .with(|error: String, _| error.len())
        .build();

    assert_eq!(fallback.execute(|| Ok(10)), 10);
    assert_eq!(fallback.execute(|| Err("broken".to_string())), 6);

    let stats = fallback.stats();
    assert_eq!(stats.total_invocations, 2);
    assert_eq!(stats.fallback_used, 1);
}
