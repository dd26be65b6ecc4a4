//! CLI argument parsing with clap

use camino::Utf8PathBuf;
use clap::{Args, Parser, Subcommand};
use rebound_core::types::DelayStrategy;

/// Rebound - exercise retry policies from the command line
#[derive(Parser, Debug)]
#[command(name = "rebound")]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
pub struct Cli {
    /// Increase verbosity (-v, -vv, -vvv)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Suppress output
    #[arg(short, long, global = true)]
    pub quiet: bool,

    /// Directory containing rebound.yaml (default: ~/.rebound)
    #[arg(short, long, global = true)]
    pub config: Option<Utf8PathBuf>,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Run a simulated operation that fails a fixed number of times
    Simulate(SimulateArgs),

    /// Print the delay before each retry of a policy
    Schedule(ScheduleArgs),
}

/// Policy selection shared by every command
///
/// Flags override the values loaded for the selected policy.
#[derive(Args, Debug, Clone, Default)]
pub struct PolicyArgs {
    /// Named call-site policy from rebound.yaml (default policy if omitted)
    #[arg(short, long)]
    pub policy: Option<String>,

    /// Override the number of retries after the original attempt
    #[arg(long)]
    pub max_retries: Option<u32>,

    /// Override the delay strategy (constant, exponential)
    #[arg(long)]
    pub strategy: Option<DelayStrategy>,

    /// Override the base delay in milliseconds
    #[arg(long)]
    pub base_ms: Option<u64>,

    /// Override the exponential delay cap in milliseconds
    #[arg(long)]
    pub cap_ms: Option<u64>,
}

impl PolicyArgs {
    /// Name shown in output and logs
    pub fn display_name(&self) -> &str {
        self.policy.as_deref().unwrap_or("default")
    }
}

#[derive(Args, Debug)]
pub struct SimulateArgs {
    #[command(flatten)]
    pub policy: PolicyArgs,

    /// Number of times the operation fails before succeeding
    #[arg(short, long, default_value_t = 2)]
    pub failures: u32,
}

#[derive(Args, Debug)]
pub struct ScheduleArgs {
    #[command(flatten)]
    pub policy: PolicyArgs,

    /// Maximum number of retries to list
    #[arg(long, default_value_t = 20)]
    pub limit: u32,

    /// Output as JSON
    #[arg(long)]
    pub json: bool,
}
