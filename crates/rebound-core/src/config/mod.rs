//! Retry policy loading

mod loader;

pub use loader::{RetryConfigLoader, POLICY_FILE};
