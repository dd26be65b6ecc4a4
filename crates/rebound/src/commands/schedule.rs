//! Schedule command

use std::time::Duration;

use anyhow::Result;
use camino::Utf8Path;
use rebound_core::retry::DelayPolicy;
use rebound_core::types::{DelayStrategy, RetryPolicy};
use serde::Serialize;

use super::policy;
use crate::cli::ScheduleArgs;
use crate::output;

/// Delay table for one policy
#[derive(Debug, Serialize)]
#[serde(rename_all = "kebab-case")]
pub struct ScheduleReport {
    pub policy: String,
    pub max_retries: u32,
    pub strategy: String,
    pub retries: Vec<ScheduleRow>,
    /// More retries exist than were listed
    pub truncated: bool,
    /// Number of the failure that is forwarded to the caller
    pub forwarded_failure: u64,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "kebab-case")]
pub struct ScheduleRow {
    pub retry: u32,
    pub delay_ms: u64,
    /// Sum of all delays up to and including this retry
    pub elapsed_ms: u64,
}

pub fn run(args: ScheduleArgs, config_dir: Option<&Utf8Path>) -> Result<()> {
    let policy = policy::resolve(config_dir, &args.policy)?;
    let report = build(args.policy.display_name(), &policy, args.limit);

    if args.json {
        println!("{}", serde_json::to_string_pretty(&report)?);
        return Ok(());
    }

    output::header(&format!("Retry schedule for '{}'", report.policy));
    output::kv("Max retries", &report.max_retries.to_string());
    output::kv("Strategy", &report.strategy);
    output::kv("Base delay", &format!("{}ms", policy.base_delay_ms));
    if policy.strategy == DelayStrategy::Exponential {
        output::kv("Cap", &format!("{}ms", policy.max_delay_ms));
    }

    println!();
    println!("  {:>7}  {:>10}  {:>10}", "retry", "delay", "elapsed");
    for row in &report.retries {
        println!(
            "  {:>7}  {:>10}  {:>10}",
            row.retry,
            format!("{}ms", row.delay_ms),
            format!("{}ms", row.elapsed_ms)
        );
    }
    println!();

    if report.truncated {
        output::info(&format!(
            "Showing the first {} of {} retries",
            report.retries.len(),
            report.max_retries
        ));
    }

    output::info(&format!(
        "Failure {} is forwarded to the caller",
        report.forwarded_failure
    ));

    Ok(())
}

/// Compute the delay before each retry without running anything
pub fn build(name: &str, policy: &RetryPolicy, limit: u32) -> ScheduleReport {
    let backoff = policy.backoff();
    let listed = policy.max_retries.min(limit);

    let mut elapsed = Duration::ZERO;
    let retries = (1..=listed)
        .map(|retry| {
            let delay = backoff.delay_for_attempt(retry);
            elapsed = elapsed.saturating_add(delay);
            ScheduleRow {
                retry,
                delay_ms: output::millis(delay),
                elapsed_ms: output::millis(elapsed),
            }
        })
        .collect();

    ScheduleReport {
        policy: name.to_string(),
        max_retries: policy.max_retries,
        strategy: policy.strategy.to_string(),
        retries,
        truncated: listed < policy.max_retries,
        forwarded_failure: u64::from(policy.max_retries) + 1,
    }
}
