//! CLI command implementations.

pub mod counters;
pub mod master;

use clap::Args;

/// Arguments for the get command.
#[derive(Args)]
pub struct GetArgs {
    /// Identities to read, e.g. `user:id=1`.
    #[arg(required = true)]
    pub identities: Vec<String>,
}

/// Arguments for the incr command.
#[derive(Args)]
pub struct IncrArgs {
    /// Identity to increment.
    pub identity: String,
}

/// Arguments for the flush command.
#[derive(Args)]
pub struct FlushArgs {
    /// Skip the safety check.
    #[arg(short, long)]
    pub yes: bool,
}
