//! CLI command implementations

pub mod policy;
pub mod schedule;
pub mod simulate;
