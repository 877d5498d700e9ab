//! Vercache CLI - Operator tool for the version store.
//!
//! Commands:
//! - `vercache status` - Show the master version state
//! - `vercache get` - Read identity counters
//! - `vercache incr` - Increment an identity counter
//! - `vercache disable` / `vercache enable` - Switch caching off or on store-wide
//! - `vercache invalidate-all` - Install a fresh master version
//! - `vercache flush` - Reset every counter

mod commands;
mod context;
mod output;

use anyhow::Result;
use clap::{Parser, Subcommand};

use commands::{FlushArgs, GetArgs, IncrArgs};
use vercache_observability::{init_logging, LogFormat};

/// Vercache CLI - Inspect and control version-stamped caching
#[derive(Parser)]
#[command(name = "vercache")]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
struct Cli {
    /// Enable verbose output
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Use JSON output format
    #[arg(long, global = true)]
    json: bool,

    /// Config file path
    #[arg(short, long, global = true)]
    config: Option<String>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Show the master version state
    Status,

    /// Read the counters of one or more identities
    Get(GetArgs),

    /// Increment the counter of an identity
    Incr(IncrArgs),

    /// Switch caching off for every client of the store
    Disable,

    /// Switch caching back on
    Enable,

    /// Invalidate every cached entry by installing a fresh master version
    ///
    /// Fails while caching is disabled; run `enable` instead, which installs a fresh
    /// master version as well.
    InvalidateAll,

    /// Reset every counter in the version store
    Flush(FlushArgs),
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let format = if cli.json { LogFormat::Json } else { LogFormat::Human };
    let filter = if cli.verbose { "debug" } else { "warn" };
    let output = output::Output::new(cli.verbose, cli.json);
    if let Err(e) = init_logging(format, filter) {
        output.debug(&format!("Logging not initialised: {}", e));
    }

    let ctx = match context::Context::load(cli.config.as_deref(), output.clone()) {
        Ok(ctx) => ctx,
        Err(e) => {
            output.error(&format!("{:#}", e));
            std::process::exit(1);
        }
    };

    let result = match cli.command {
        Commands::Status => commands::master::status(&ctx).await,
        Commands::Get(args) => commands::counters::get(args, &ctx).await,
        Commands::Incr(args) => commands::counters::incr(args, &ctx).await,
        Commands::Disable => commands::master::disable(&ctx).await,
        Commands::Enable => commands::master::enable(&ctx).await,
        Commands::InvalidateAll => commands::master::invalidate_all(&ctx).await,
        Commands::Flush(args) => commands::counters::flush(args, &ctx).await,
    };

    if let Err(e) = result {
        ctx.output.error(&format!("{:#}", e));
        std::process::exit(1);
    }

    Ok(())
}
