//! Huginn CLI - inspect and follow remote application config
//!
//! This is the main entry point for the huginn command-line interface.

mod cli;
mod commands;
mod output;
mod version;

use anyhow::Result;
use clap::Parser;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use cli::{Cli, Commands};

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    init_tracing(cli.verbose, cli.quiet);

    match cli.command {
        Commands::Version(args) => commands::version::run(args),
        Commands::Secrets(cmd) => commands::secrets::run(cmd, cli.config.as_deref()).await,
        Commands::Parameters(cmd) => commands::parameters::run(cmd, cli.config.as_deref()).await,
        Commands::Watch(cmd) => commands::watch::run(cmd, cli.config.as_deref()).await,
    }
}

/// Initialize tracing with appropriate verbosity
///
/// `RUST_LOG` takes precedence over the flags when set.
fn init_tracing(verbose: u8, quiet: bool) {
    let level = if quiet {
        "error"
    } else {
        match verbose {
            0 => "info",
            1 => "debug",
            _ => "trace",
        }
    };

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));

    tracing_subscriber::registry()
        .with(fmt::layer().with_target(false).with_writer(std::io::stderr))
        .with(filter)
        .init();
}
