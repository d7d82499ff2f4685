//! Offline CLI - Command line tool for the storefront offline runtime.
//!
//! Commands:
//! - `offline classify` - Show the routing class and cache key of a request
//! - `offline config` - Manage configuration
//! - `offline simulate` - Install, activate and fetch against an origin

mod commands;
mod config;
mod context;
mod output;

use anyhow::Result;
use clap::{Parser, Subcommand};
use offline_observability::{init_logging, LogLevel};

use commands::{ClassifyArgs, ConfigArgs, SimulateArgs};

/// Offline CLI - Inspect and simulate the storefront offline runtime
#[derive(Parser)]
#[command(name = "offline")]
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
    /// Show how a request would be classified and keyed
    Classify(ClassifyArgs),

    /// Manage configuration
    Config(ConfigArgs),

    /// Run install, activate and fetches against a live origin
    Simulate(SimulateArgs),
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // Setup output formatting
    let output = output::Output::new(cli.verbose, cli.json);

    // Load config
    let config_path = cli.config.as_deref();
    let ctx = match context::Context::load(config_path, output.clone()) {
        Ok(ctx) => ctx,
        Err(e) => {
            output.error(&format!("{:#}", e));
            std::process::exit(1);
        }
    };

    let mut logging = ctx.config.logging.clone();
    if cli.verbose {
        logging.level = LogLevel::Debug;
    }
    init_logging(&logging);

    // Execute command
    let result = match cli.command {
        Commands::Classify(args) => commands::classify::run(args, &ctx).await,
        Commands::Config(args) => commands::config::run(args, &ctx).await,
        Commands::Simulate(args) => commands::simulate::run(args, &ctx).await,
    };

    if let Err(e) = result {
        ctx.output.error(&format!("{:#}", e));
        std::process::exit(1);
    }

    Ok(())
}
