//! Integration tests for retry flights
//!
//! Loads policies from a YAML file on disk and drives async flights through
//! the public driver under paused tokio time.

use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::Arc;
use std::time::Duration;

use camino::Utf8PathBuf;
use rebound_core::retry::{run_flight, RetryError, StatsObserver};
use rebound_core::types::DelayStrategy;
use rebound_core::{Error, RetryConfigLoader};
use tempfile::TempDir;
use tokio::time::Instant;

// ─── Helpers ───────────────────────────────────────────────────────────────

const POLICIES: &str = r#"
default:
  max-retries: 1
  strategy: constant
  base-delay-ms: 50
operations:
  upload:
    max-retries: 3
    strategy: constant
    base-delay-ms: 1000
  sync:
    max-retries: 2
    strategy: exponential
    base-delay-ms: 500
    max-delay-ms: 4000
"#;

fn write_policies(dir: &TempDir, content: &str) -> RetryConfigLoader {
    let path = Utf8PathBuf::try_from(dir.path().to_path_buf()).unwrap();
    std::fs::write(path.join("rebound.yaml"), content).unwrap();
    RetryConfigLoader::with_dir(path)
}

/// Run an operation that fails `failures` times, recording when each call starts
async fn fail_times(
    config: rebound_core::retry::RetryConfig,
    failures: u32,
) -> (Result<u32, RetryError<String>>, Vec<Duration>, Arc<StatsObserver>) {
    let observer = Arc::new(StatsObserver::new());
    let calls = Arc::new(AtomicU32::new(0));
    let start = Instant::now();
    let mut offsets = Vec::new();

    let result = run_flight(config, observer.clone(), || {
        offsets.push(start.elapsed());
        let calls = calls.clone();
        async move {
            let n = calls.fetch_add(1, Ordering::SeqCst) + 1;
            if n <= failures {
                Err(format!("failure {}", n))
            } else {
                Ok(n)
            }
        }
    })
    .await;

    (result, offsets, observer)
}

// ─── Loaded policies ───────────────────────────────────────────────────────

#[test]
fn test_policies_load_from_disk() {
    let dir = TempDir::new().unwrap();
    let loader = write_policies(&dir, POLICIES);

    let config = loader.load().unwrap();

    assert_eq!(config.default.max_retries, 1);
    assert_eq!(config.policy_for("upload").max_retries, 3);
    assert_eq!(config.policy_for("sync").strategy, DelayStrategy::Exponential);
    // Built-in call sites survive unless overridden
    assert!(config.operations.contains_key("download"));
    // Unknown call sites fall back to the default policy
    assert_eq!(config.policy_for("unknown"), &config.default);
}

#[test]
fn test_invalid_policy_file_is_rejected() {
    let dir = TempDir::new().unwrap();
    let loader = write_policies(
        &dir,
        "operations:\n  sync:\n    base-delay-ms: 5000\n    max-delay-ms: 100\n",
    );

    let err = loader.load().unwrap_err();
    assert!(matches!(err, Error::InvalidConfig { .. }));
    assert!(err.to_string().contains("sync"));
}

// ─── Flights ───────────────────────────────────────────────────────────────

#[tokio::test(start_paused = true)]
async fn test_constant_policy_exhausts_after_three_retries() {
    let dir = TempDir::new().unwrap();
    let config = write_policies(&dir, POLICIES).load().unwrap();
    let upload = config.policy_for("upload").to_config();

    let (result, offsets, observer) = fail_times(upload, 10).await;

    let err = result.unwrap_err();
    assert!(err.is_exhausted());
    assert_eq!(err.retries(), 3);
    assert_eq!(err.into_source(), "failure 4");

    let ms: Vec<u128> = offsets.iter().map(Duration::as_millis).collect();
    assert_eq!(ms, vec![0, 1000, 2000, 3000]);

    assert_eq!(observer.retries(), 3);
    assert_eq!(observer.forwards(), 1);
    assert_eq!(observer.successes(), 0);
}

#[tokio::test(start_paused = true)]
async fn test_exponential_policy_doubles_then_forwards() {
    let dir = TempDir::new().unwrap();
    let config = write_policies(&dir, POLICIES).load().unwrap();
    let sync = config.policy_for("sync").to_config();

    let (result, offsets, _) = fail_times(sync, 10).await;

    let err = result.unwrap_err();
    assert_eq!(err.retries(), 2);
    assert_eq!(err.into_source(), "failure 3");

    let ms: Vec<u128> = offsets.iter().map(Duration::as_millis).collect();
    assert_eq!(ms, vec![0, 500, 1500]);
}

#[tokio::test(start_paused = true)]
async fn test_flight_recovers_within_budget() {
    let dir = TempDir::new().unwrap();
    let config = write_policies(&dir, POLICIES).load().unwrap();
    let upload = config.policy_for("upload").to_config();

    let (result, offsets, observer) = fail_times(upload, 2).await;

    assert_eq!(result.unwrap(), 3);
    assert_eq!(offsets.len(), 3);
    assert_eq!(observer.retries(), 2);
    assert_eq!(observer.successes(), 1);
    assert_eq!(observer.forwards(), 0);
}

#[tokio::test(start_paused = true)]
async fn test_independent_flights_do_not_interfere() {
    let dir = TempDir::new().unwrap();
    let config = write_policies(&dir, POLICIES).load().unwrap();

    let (upload, sync) = tokio::join!(
        fail_times(config.policy_for("upload").to_config(), 1),
        fail_times(config.policy_for("sync").to_config(), 10),
    );

    assert_eq!(upload.0.unwrap(), 2);
    assert_eq!(upload.2.flights(), 1);

    let err = sync.0.unwrap_err();
    assert_eq!(err.retries(), 2);
    assert_eq!(sync.2.flights(), 1);
}
