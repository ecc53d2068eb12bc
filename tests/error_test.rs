use std::time::Duration;

use chatguard::{GuardError, RateLimitDecision};

#[test]
fn error_display() {
    let err = GuardError::Backend("connection refused".into());
    assert_eq!(err.to_string(), "cache backend unavailable: connection refused");

    let err = GuardError::Configuration("bad ttl".into());
    assert_eq!(err.to_string(), "configuration error: bad ttl");

    let err = GuardError::Store("timeout".into());
    assert_eq!(err.to_string(), "store error: timeout");
}

#[test]
fn json_errors_convert() {
    let parse: Result<u32, _> = serde_json::from_str("nope");
    let err: GuardError = parse.unwrap_err().into();
    assert!(matches!(err, GuardError::Json(_)));
    assert!(!err.is_backend());
}

#[test]
fn rate_limited_carries_retry_hint() {
    let decision = RateLimitDecision {
        allowed: false,
        limit: Some(30),
        remaining: Some(0),
        reset_epoch_ms: 12_000,
    };
    let err = GuardError::RateLimited {
        retry_after: decision.retry_after(9_500),
        decision,
    };
    assert_eq!(err.retry_after(), Some(Duration::from_secs(3)));
    assert!(err.to_string().starts_with("rate limited"));
    assert_eq!(GuardError::Backend("x".into()).retry_after(), None);
}
