//! Retry policy configuration types
//!
//! These types are the file/env representation of a call site's retry
//! budget and delay policy. They convert into the coordinator's
//! [`RetryConfig`](crate::retry::RetryConfig).

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::time::Duration;

use crate::error::{Error, Result};
use crate::retry::{constant_delay, exponential_delay, Backoff, RetryConfig};

/// Retry policy configurations
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct RetryPoliciesConfig {
    /// Default retry policy
    #[serde(default)]
    pub default: RetryPolicy,

    /// Per-call-site retry policies
    #[serde(default)]
    pub operations: HashMap<String, RetryPolicy>,
}

impl Default for RetryPoliciesConfig {
    fn default() -> Self {
        let mut operations = HashMap::new();

        // Downloads back off exponentially up to 30s
        operations.insert(
            "download".to_string(),
            RetryPolicy {
                max_retries: 3,
                strategy: DelayStrategy::Exponential,
                base_delay_ms: 1000,
                max_delay_ms: 30000,
            },
        );

        Self {
            default: RetryPolicy::default(),
            operations,
        }
    }
}

impl RetryPoliciesConfig {
    /// Policy for a call site, falling back to the default policy
    pub fn policy_for(&self, operation: &str) -> &RetryPolicy {
        self.operations.get(operation).unwrap_or(&self.default)
    }

    /// Policy for a call site that must be configured explicitly
    pub fn named(&self, operation: &str) -> Result<&RetryPolicy> {
        self.operations
            .get(operation)
            .ok_or_else(|| Error::unknown_policy(operation))
    }

    /// Validate the default and every per-call-site policy
    pub fn validate(&self) -> Result<()> {
        self.default.validate()?;
        for (name, policy) in &self.operations {
            policy
                .validate()
                .map_err(|e| Error::invalid_config(format!("policy '{}': {}", name, e)))?;
        }
        Ok(())
    }
}

/// Retry policy for a call site
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct RetryPolicy {
    /// Maximum number of retries, not counting the original attempt
    #[serde(default = "default_max_retries")]
    pub max_retries: u32,

    /// Delay strategy
    #[serde(default)]
    pub strategy: DelayStrategy,

    /// Delay before the first retry, in milliseconds
    #[serde(default = "default_base_delay")]
    pub base_delay_ms: u64,

    /// Upper bound on exponential delays, in milliseconds
    #[serde(default = "default_max_delay")]
    pub max_delay_ms: u64,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_retries: default_max_retries(),
            strategy: DelayStrategy::default(),
            base_delay_ms: default_base_delay(),
            max_delay_ms: default_max_delay(),
        }
    }
}

fn default_max_retries() -> u32 {
    3
}
fn default_base_delay() -> u64 {
    1000
}
fn default_max_delay() -> u64 {
    30000
}

impl RetryPolicy {
    /// Check the policy for inconsistent values
    pub fn validate(&self) -> Result<()> {
        if self.strategy == DelayStrategy::Exponential && self.max_delay_ms < self.base_delay_ms {
            return Err(Error::invalid_config(format!(
                "max-delay-ms ({}) must not be below base-delay-ms ({})",
                self.max_delay_ms, self.base_delay_ms
            )));
        }
        Ok(())
    }

    /// The delay policy this configuration describes
    pub fn backoff(&self) -> Backoff {
        let base = Duration::from_millis(self.base_delay_ms);
        match self.strategy {
            DelayStrategy::Constant => constant_delay(base).into(),
            DelayStrategy::Exponential => {
                exponential_delay(base, Duration::from_millis(self.max_delay_ms)).into()
            }
        }
    }

    /// Build the coordinator configuration for this policy
    pub fn to_config(&self) -> RetryConfig<Backoff> {
        RetryConfig::new(self.max_retries, self.backoff())
    }
}

/// Delay strategy
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "kebab-case")]
pub enum DelayStrategy {
    /// Fixed delay between retries
    Constant,

    /// Doubling delay clamped at `max-delay-ms` (default)
    #[default]
    Exponential,
}

impl std::str::FromStr for DelayStrategy {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_ascii_lowercase().as_str() {
            "constant" | "fixed" => Ok(DelayStrategy::Constant),
            "exponential" => Ok(DelayStrategy::Exponential),
            other => Err(Error::invalid_config(format!(
                "unknown delay strategy '{}', expected 'constant' or 'exponential'",
                other
            ))),
        }
    }
}

impl std::fmt::Display for DelayStrategy {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            DelayStrategy::Constant => write!(f, "constant"),
            DelayStrategy::Exponential => write!(f, "exponential"),
        }
    }
}
