//! CLI command implementations.

pub mod classify;
pub mod config;
pub mod simulate;

use clap::{Args, Subcommand};

/// Arguments for the classify command.
#[derive(Args)]
pub struct ClassifyArgs {
    /// Absolute request URL.
    pub url: String,

    /// HTTP method.
    #[arg(short, long, default_value = "GET")]
    pub method: String,

    /// Accept header value.
    #[arg(short, long)]
    pub accept: Option<String>,

    /// Request destination (document, image, script, style, ...).
    #[arg(short, long)]
    pub destination: Option<String>,

    /// Request mode (navigate, same-origin, cors, no-cors).
    #[arg(long)]
    pub mode: Option<String>,
}

/// Arguments for the config command.
#[derive(Args)]
pub struct ConfigArgs {
    #[command(subcommand)]
    pub command: ConfigCommand,
}

#[derive(Subcommand)]
pub enum ConfigCommand {
    /// Show current configuration.
    Show,
    /// Initialize a new config file.
    Init {
        /// Force overwrite existing config.
        #[arg(short, long)]
        force: bool,
    },
    /// Validate the config file.
    Validate,
}

/// Arguments for the simulate command.
#[derive(Args)]
pub struct SimulateArgs {
    /// Origin to install from and fetch against.
    #[arg(short, long)]
    pub origin: String,

    /// Paths to fetch after activation.
    #[arg(default_values_t = ["/".to_string()])]
    pub paths: Vec<String>,

    /// Re-run the fetches with the network cut off.
    #[arg(long)]
    pub offline: bool,
}
