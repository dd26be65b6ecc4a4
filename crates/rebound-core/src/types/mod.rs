//! Type definitions for retry configuration

mod retry_policy;

pub use retry_policy::*;
