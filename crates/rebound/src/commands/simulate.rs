//! Simulate command
//!
//! Drives an operation that fails a fixed number of times through a real
//! retry flight, so a policy's timing can be observed end to end.

use anyhow::Result;
use camino::Utf8Path;
use rebound_core::retry::{run_flight, RetryError, TracingObserver};
use rebound_core::types::RetryPolicy;
use tokio::time::Instant;

use super::policy;
use crate::cli::SimulateArgs;
use crate::output;

pub async fn run(args: SimulateArgs, config_dir: Option<&Utf8Path>) -> Result<()> {
    let policy = policy::resolve(config_dir, &args.policy)?;
    let name = args.policy.display_name();

    output::header(&format!("Simulating '{}'", name));
    output::kv("Max retries", &policy.max_retries.to_string());
    output::kv("Strategy", &policy.strategy.to_string());
    output::kv("Failures", &args.failures.to_string());
    println!();

    match simulate(name, &policy, args.failures).await {
        Ok(attempt) => {
            output::success(&format!(
                "Succeeded on attempt {} after {} retries",
                attempt,
                attempt - 1
            ));
        }
        Err(err) => {
            output::error(&format!("Gave up: {}", err));
            anyhow::bail!(
                "'{}' exhausted its retry budget after {} retries",
                name,
                err.retries()
            );
        }
    }

    Ok(())
}

/// Run one flight of an operation that fails `failures` times
///
/// Returns the number of the attempt that succeeded.
pub async fn simulate(
    name: &str,
    policy: &RetryPolicy,
    failures: u32,
) -> std::result::Result<u32, RetryError<String>> {
    let start = Instant::now();
    let mut launched = 0u32;

    run_flight(policy.to_config(), TracingObserver::new(name), || {
        launched += 1;
        let attempt = launched;
        output::info(&format!(
            "Attempt {} at {}",
            attempt,
            output::format_millis(start.elapsed())
        ));

        async move {
            if attempt <= failures {
                Err(format!("simulated failure {}", attempt))
            } else {
                Ok(attempt)
            }
        }
    })
    .await
}
