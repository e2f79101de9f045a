//! Watch commands: follow a source until interrupted

use anyhow::{Context, Result};
use camino::Utf8Path;
use clap::{Args, Subcommand};
use huginn_aws::{ParameterStoreProvider, SecretsProvider};
use huginn_core::ConfigFormat;
use huginn_watch::{LiveConfig, LiveConfigBuilder};
use std::path::PathBuf;

use super::{load_config, parameter_settings, secret_settings};
use crate::output;

#[derive(Subcommand, Debug)]
pub enum WatchCommands {
    /// Poll a secret and report new versions
    Secret(WatchSecretArgs),

    /// Poll a parameter path and report created, updated and deleted keys
    Parameters(WatchParametersArgs),

    /// Follow a local config file
    File(WatchFileArgs),
}

#[derive(Args, Debug)]
pub struct WatchSecretArgs {
    /// Secret name or ARN (overrides huginn.yaml)
    #[arg(long)]
    pub secret_id: Option<String>,

    /// AWS region (AWS_REGION still wins)
    #[arg(long)]
    pub region: Option<String>,

    /// Seconds between polls; values of 1 or less are ignored
    #[arg(long)]
    pub interval_secs: Option<u64>,

    /// Maintain timestamp stage labels on every poll
    #[arg(long)]
    pub update_stage: bool,

    /// Format of the secret text
    #[arg(long)]
    pub format: Option<ConfigFormat>,
}

#[derive(Args, Debug)]
pub struct WatchParametersArgs {
    /// Base path (overrides huginn.yaml)
    #[arg(long)]
    pub path: Option<String>,

    /// AWS region (AWS_REGION still wins)
    #[arg(long)]
    pub region: Option<String>,

    /// Seconds between polls; values of 1 or less are ignored
    #[arg(long)]
    pub interval_secs: Option<u64>,
}

#[derive(Args, Debug)]
pub struct WatchFileArgs {
    /// Config file (defaults to local.path in huginn.yaml, then ./app.yaml)
    #[arg(long)]
    pub path: Option<PathBuf>,

    /// Quiet window for coalescing file events, in milliseconds
    #[arg(long)]
    pub debounce_ms: Option<u64>,
}

pub async fn run(cmd: WatchCommands, config: Option<&Utf8Path>) -> Result<()> {
    match cmd {
        WatchCommands::Secret(args) => secret(args, config).await,
        WatchCommands::Parameters(args) => parameters(args, config).await,
        WatchCommands::File(args) => file(args, config).await,
    }
}

async fn secret(args: WatchSecretArgs, config: Option<&Utf8Path>) -> Result<()> {
    let config = load_config(config)?;
    let mut settings = secret_settings(&config, args.secret_id, args.region)?;
    if let Some(secs) = args.interval_secs {
        settings = settings.with_watch_interval_secs(secs);
    }
    if args.update_stage {
        settings = settings.with_update_stage(true);
    }

    let provider = SecretsProvider::connect(settings)
        .await?
        .on_change(|snapshot| {
            output::info(&format!(
                "{} is now at version {} ({})",
                snapshot.secret_id(),
                snapshot.version_id(),
                snapshot.version_stages().join(", ")
            ));
        });

    let mut builder = LiveConfigBuilder::from_settings(&config.local());
    if let Some(format) = args.format {
        builder = builder.format(format);
    }

    let live = builder
        .open_remote(provider)
        .await
        .context("Failed to load secret")?;

    follow(live).await
}

async fn parameters(args: WatchParametersArgs, config: Option<&Utf8Path>) -> Result<()> {
    let config = load_config(config)?;
    let mut settings = parameter_settings(&config, args.path, args.region)?;
    if let Some(secs) = args.interval_secs {
        settings = settings.with_watch_interval_secs(secs);
    }

    let provider = ParameterStoreProvider::connect(settings)
        .await?
        .on_change(|_, changes| {
            for key in &changes.created {
                output::info(&format!("created {}", key));
            }
            for key in &changes.updated {
                output::info(&format!("updated {}", key));
            }
            for key in &changes.deleted {
                output::info(&format!("deleted {}", key));
            }
        });

    let live = LiveConfig::builder()
        .open_remote(provider)
        .await
        .context("Failed to load parameters")?;

    follow(live).await
}

async fn file(args: WatchFileArgs, config: Option<&Utf8Path>) -> Result<()> {
    let config = load_config(config)?;
    let mut local = config.local();
    if let Some(path) = args.path {
        local.path = path;
        local.format = None;
    }
    if let Some(ms) = args.debounce_ms {
        local.debounce_ms = ms;
    }

    let live = LiveConfigBuilder::from_settings(&local)
        .on_file_change(|change| {
            output::info(&format!("{} changed ({:?})", change.path.display(), change.kind));
        })
        .open_file()
        .await
        .with_context(|| format!("Failed to load {}", local.path.display()))?;

    follow(live).await
}

/// Report the loaded view, then block until Ctrl-C
async fn follow(live: LiveConfig) -> Result<()> {
    let keys = match live.snapshot() {
        serde_json::Value::Object(map) => map.len(),
        _ => 0,
    };
    output::success(&format!(
        "Loaded {} ({} top-level keys), watching for changes. Press Ctrl-C to stop.",
        live.origin(),
        keys
    ));

    tokio::signal::ctrl_c()
        .await
        .context("Failed to listen for Ctrl-C")?;

    live.stop().await;
    output::info("Stopped");
    Ok(())
}
