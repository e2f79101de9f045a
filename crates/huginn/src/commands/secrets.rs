//! Secrets Manager commands

use anyhow::{Context, Result};
use camino::Utf8Path;
use clap::{Args, Subcommand};
use huginn_aws::{RotationReport, SecretsProvider};
use huginn_core::SecretSnapshot;
use serde_json::json;

use super::{load_config, secret_settings};
use crate::output;

#[derive(Subcommand, Debug)]
pub enum SecretsCommands {
    /// Fetch the current version of a secret
    Get(GetArgs),

    /// Label the current version with its creation time and prune old labels
    UpdateStages(UpdateStagesArgs),
}

#[derive(Args, Debug)]
pub struct GetArgs {
    /// Secret name or ARN (overrides huginn.yaml)
    #[arg(long)]
    pub secret_id: Option<String>,

    /// AWS region (AWS_REGION still wins)
    #[arg(long)]
    pub region: Option<String>,

    /// Print the secret value (WARNING: insecure)
    #[arg(long)]
    pub show_value: bool,

    /// Output as JSON
    #[arg(long)]
    pub json: bool,
}

#[derive(Args, Debug)]
pub struct UpdateStagesArgs {
    /// Secret name or ARN (overrides huginn.yaml)
    #[arg(long)]
    pub secret_id: Option<String>,

    /// Number of stage labels to keep (3-17)
    #[arg(long)]
    pub keep_stages: Option<usize>,

    /// AWS region (AWS_REGION still wins)
    #[arg(long)]
    pub region: Option<String>,

    /// Output as JSON
    #[arg(long)]
    pub json: bool,
}

pub async fn run(cmd: SecretsCommands, config: Option<&Utf8Path>) -> Result<()> {
    match cmd {
        SecretsCommands::Get(args) => get(args, config).await,
        SecretsCommands::UpdateStages(args) => update_stages(args, config).await,
    }
}

async fn get(args: GetArgs, config: Option<&Utf8Path>) -> Result<()> {
    let config = load_config(config)?;
    // Reading never rotates; that is what update-stages is for
    let settings =
        secret_settings(&config, args.secret_id, args.region)?.with_update_stage(false);

    let spinner = output::spinner("Fetching secret...");
    let result = async {
        let provider = SecretsProvider::connect(settings).await?;
        provider.fetch_secret().await
    }
    .await;
    spinner.finish_and_clear();

    let snapshot = result.context("Failed to fetch secret")?;

    if args.json {
        let mut doc = snapshot_json(&snapshot);
        if args.show_value {
            doc["value"] = json!(snapshot.value().as_str());
        }
        println!("{}", serde_json::to_string_pretty(&doc)?);
        return Ok(());
    }

    output::header(&format!("Secret {}", snapshot.secret_id()));
    print_snapshot(&snapshot);
    output::kv(
        "Value",
        output::reveal(snapshot.value().as_str(), args.show_value),
    );

    Ok(())
}

async fn update_stages(args: UpdateStagesArgs, config: Option<&Utf8Path>) -> Result<()> {
    let config = load_config(config)?;
    let mut settings = secret_settings(&config, args.secret_id, args.region)?;
    if let Some(keep) = args.keep_stages {
        settings = settings.with_keep_stages(keep);
    }

    let spinner = output::spinner("Updating version stages...");
    let result = async {
        let provider = SecretsProvider::connect(settings).await?;
        provider.update_stages().await
    }
    .await;
    spinner.finish_and_clear();

    let (snapshot, report) = result.context("Failed to update version stages")?;

    if args.json {
        let mut doc = snapshot_json(&snapshot);
        doc["detached"] = json!(report
            .detached
            .iter()
            .map(|m| json!({"version_id": m.version_id, "label": m.label}))
            .collect::<Vec<_>>());
        doc["attached"] = json!(report.attached.as_ref().map(|m| &m.label));
        doc["failures"] = json!(report.failures);
        println!("{}", serde_json::to_string_pretty(&doc)?);
        return Ok(());
    }

    output::header(&format!("Secret {}", snapshot.secret_id()));
    print_snapshot(&snapshot);
    print_report(&report);

    Ok(())
}

fn snapshot_json(snapshot: &SecretSnapshot) -> serde_json::Value {
    json!({
        "secret_id": snapshot.secret_id(),
        "version_id": snapshot.version_id(),
        "created_at": snapshot.created_at().map(|t| t.to_rfc3339()),
        "version_stages": snapshot.version_stages(),
    })
}

fn print_snapshot(snapshot: &SecretSnapshot) {
    output::kv("Version", snapshot.version_id());
    if let Some(created) = snapshot.created_at() {
        output::kv("Created", &created.to_rfc3339());
    }
    output::kv("Stages", &snapshot.version_stages().join(", "));
}

fn print_report(report: &RotationReport) {
    println!();
    match &report.attached {
        Some(stage) => output::success(&format!("Attached {}", stage.label)),
        None if report.failures == 0 => output::info("Current version already labelled"),
        None => {}
    }

    for stage in &report.detached {
        output::info(&format!("Detached {} from {}", stage.label, stage.version_id));
    }

    if report.failures > 0 {
        output::warning(&format!(
            "{} stage update(s) failed, see log for details",
            report.failures
        ));
    }
}
