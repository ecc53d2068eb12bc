//! Tests for TOML configuration loading and validation.

use std::io::Write;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use chatguard::clock::ManualClock;
use chatguard::{Bucket, CacheKey, Config, GuardBuilder, GuardError, Namespace};

fn write_config(content: &str) -> tempfile::NamedTempFile {
    let mut file = tempfile::NamedTempFile::new().unwrap();
    file.write_all(content.as_bytes()).unwrap();
    file
}

#[test]
fn load_explicit_path() {
    let file = write_config(
        r#"
[cache]
max_entries = 500

[cache.ttl]
profile = 600
messages = 15

[rate_limit.buckets.server-create]
max_requests = 2
window_secs = 7200

[metrics]
capacity = 250
"#,
    );

    let config = Config::load(Some(file.path())).unwrap();
    assert!(config.cache.enabled);
    assert_eq!(config.cache.max_entries, 500);
    assert_eq!(config.cache.ttl.ttl(Namespace::Profile), Duration::from_secs(600));
    assert_eq!(config.cache.ttl.ttl(Namespace::Messages), Duration::from_secs(15));
    // Omitted TTLs keep their defaults.
    assert_eq!(config.cache.ttl.ttl(Namespace::Channel), Duration::from_secs(120));
    assert_eq!(config.metrics.capacity, 250);

    let limits = config.limiter_config().unwrap();
    let server_create = limits.get(Bucket::ServerCreate).unwrap();
    assert_eq!(server_create.max_requests, 2);
    assert_eq!(server_create.window(), Duration::from_secs(7200));
    assert_eq!(limits.get(Bucket::Messages), Some(Bucket::Messages.default_config()));
}

#[test]
fn missing_explicit_path_is_an_error() {
    let dir = tempfile::tempdir().unwrap();
    let result = Config::load(Some(dir.path().join("absent.toml").as_path()));
    assert!(matches!(result, Err(GuardError::Configuration(_))));
}

#[test]
fn malformed_toml_is_an_error() {
    let file = write_config("[cache\nenabled = true");
    let err = Config::load(Some(file.path())).unwrap_err();
    assert!(err.to_string().contains("Failed to parse config"));
}

#[test]
fn unknown_bucket_is_an_error() {
    let result = Config::from_toml_str(
        r#"
[rate_limit.buckets.emoji]
max_requests = 1
window_secs = 1
"#,
    );
    assert!(matches!(result, Err(GuardError::Configuration(_))));
}

#[test]
fn zero_window_is_an_error() {
    let result = Config::from_toml_str(
        r#"
[rate_limit.buckets.messages]
max_requests = 30
window_secs = 0
"#,
    );
    assert!(matches!(result, Err(GuardError::Configuration(_))));
}

#[test]
fn message_ttl_must_be_shortest() {
    let result = Config::from_toml_str(
        r#"
[cache.ttl]
messages = 120
channel = 120
"#,
    );
    let err = result.unwrap_err();
    assert!(err.to_string().contains("must be shorter"), "{err}");
}

#[test]
fn zero_ttl_is_an_error() {
    let result = Config::from_toml_str("[cache.ttl]\nprofile = 0\n");
    assert!(matches!(result, Err(GuardError::Configuration(_))));
}

#[test]
fn zero_metrics_capacity_is_an_error() {
    let result = Config::from_toml_str("[metrics]\ncapacity = 0\n");
    assert!(matches!(result, Err(GuardError::Configuration(_))));
}

#[test]
fn disabled_sections_build_degraded_guard() {
    let config = Config::from_toml_str(
        r#"
[cache]
enabled = false

[rate_limit]
enabled = false
"#,
    )
    .unwrap();

    let guard = GuardBuilder::from_config(&config).unwrap().build().unwrap();
    assert!(!guard.cache().is_enabled());
    assert!(!guard.limiter().is_enabled());
}

#[test]
fn default_config_builds_live_guard() {
    let guard = GuardBuilder::from_config(&Config::default())
        .unwrap()
        .build()
        .unwrap();
    assert!(guard.cache().is_enabled());
    assert!(guard.limiter().is_enabled());
    assert_eq!(guard.metrics().capacity(), 1_000);
}

#[tokio::test]
async fn clock_set_after_from_config_drives_cache_ttl() {
    let clock = Arc::new(ManualClock::new(1_700_000_000_000));
    let guard = GuardBuilder::from_config(&Config::default())
        .unwrap()
        .clock(clock.clone())
        .build()
        .unwrap();
    let loads = Arc::new(AtomicUsize::new(0));
    let key = CacheKey::profile("u1");

    let read = || {
        let loads = Arc::clone(&loads);
        guard.read("profile:load", &key, move || async move {
            Ok(loads.fetch_add(1, Ordering::SeqCst))
        })
    };

    assert_eq!(read().await.unwrap(), 0);
    assert_eq!(read().await.unwrap(), 0);

    clock.advance(guard.cache().ttl_for(Namespace::Profile));
    assert_eq!(read().await.unwrap(), 1);
    assert_eq!(loads.load(Ordering::SeqCst), 2);
}
