//! Policy resolution shared by the commands

use anyhow::{Context, Result};
use camino::Utf8Path;
use rebound_core::types::RetryPolicy;
use rebound_core::RetryConfigLoader;

use crate::cli::PolicyArgs;

/// Load the selected policy and apply flag overrides
///
/// Precedence (low to high): built-in defaults, `rebound.yaml`, `REBOUND_*`
/// environment variables, command-line flags.
pub fn resolve(config_dir: Option<&Utf8Path>, args: &PolicyArgs) -> Result<RetryPolicy> {
    let loader = match config_dir {
        Some(dir) => RetryConfigLoader::with_dir(dir),
        None => RetryConfigLoader::new().context("Failed to locate config directory")?,
    };

    let config = loader
        .load()
        .with_context(|| format!("Failed to load policies from {}", loader.policy_path()))?;

    let mut policy = match &args.policy {
        Some(name) => config.named(name)?.clone(),
        None => config.default.clone(),
    };
    apply_overrides(&mut policy, args);

    policy
        .validate()
        .with_context(|| format!("Invalid policy '{}'", args.display_name()))?;

    tracing::debug!(policy = args.display_name(), ?policy, "resolved retry policy");
    Ok(policy)
}

fn apply_overrides(policy: &mut RetryPolicy, args: &PolicyArgs) {
    if let Some(max_retries) = args.max_retries {
        policy.max_retries = max_retries;
    }
    if let Some(strategy) = args.strategy {
        policy.strategy = strategy;
    }
    if let Some(base_ms) = args.base_ms {
        policy.base_delay_ms = base_ms;
    }
    if let Some(cap_ms) = args.cap_ms {
        policy.max_delay_ms = cap_ms;
    }
}
