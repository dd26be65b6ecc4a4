//! # rebound-core
//!
//! Single-flight retry coordination providing:
//! - Pure delay policies (constant, exponential with cap)
//! - A message-routed retry coordinator that never blocks the host
//! - Retry policy configuration types and a hierarchical YAML/env loader
//! - A tokio host driver for running async operations through the coordinator

pub mod config;
pub mod error;
pub mod retry;
pub mod types;

pub use config::RetryConfigLoader;
pub use error::{Error, Result};
