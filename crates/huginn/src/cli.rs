//! CLI argument parsing with clap

use camino::Utf8PathBuf;
use clap::{Args, Parser, Subcommand};

pub use crate::commands::parameters::ParametersCommands;
pub use crate::commands::secrets::SecretsCommands;
pub use crate::commands::watch::WatchCommands;

/// Huginn - keep application config in sync with its remote stores
#[derive(Parser, Debug)]
#[command(name = "huginn")]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
pub struct Cli {
    /// Increase verbosity (-v, -vv)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Only log errors
    #[arg(short, long, global = true)]
    pub quiet: bool,

    /// Path to huginn.yaml config file
    #[arg(short, long, global = true)]
    pub config: Option<Utf8PathBuf>,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Show version information
    Version(VersionArgs),

    /// Read secrets and maintain their stage labels
    #[command(subcommand)]
    Secrets(SecretsCommands),

    /// Read parameters below a path
    #[command(subcommand)]
    Parameters(ParametersCommands),

    /// Follow a secret, parameter path or local file until interrupted
    #[command(subcommand)]
    Watch(WatchCommands),
}

#[derive(Args, Debug)]
pub struct VersionArgs {
    /// Output as JSON
    #[arg(long)]
    pub json: bool,
}
