//! Parameter Store commands

use anyhow::{Context, Result};
use camino::Utf8Path;
use clap::{Args, Subcommand};
use huginn_aws::ParameterStoreProvider;
use serde_json::json;

use super::{load_config, parameter_settings};
use crate::output;

#[derive(Subcommand, Debug)]
pub enum ParametersCommands {
    /// Fetch every parameter directly below a path
    Get(GetArgs),
}

#[derive(Args, Debug)]
pub struct GetArgs {
    /// Base path, e.g. /my-app/prod (overrides huginn.yaml)
    #[arg(long)]
    pub path: Option<String>,

    /// AWS region (AWS_REGION still wins)
    #[arg(long)]
    pub region: Option<String>,

    /// Print parameter values (WARNING: SecureString values are decrypted)
    #[arg(long)]
    pub show_values: bool,

    /// Output as JSON
    #[arg(long)]
    pub json: bool,
}

pub async fn run(cmd: ParametersCommands, config: Option<&Utf8Path>) -> Result<()> {
    match cmd {
        ParametersCommands::Get(args) => get(args, config).await,
    }
}

async fn get(args: GetArgs, config: Option<&Utf8Path>) -> Result<()> {
    let config = load_config(config)?;
    let settings = parameter_settings(&config, args.path, args.region)?;

    let spinner = output::spinner("Fetching parameters...");
    let result = async {
        let provider = ParameterStoreProvider::connect(settings).await?;
        provider.fetch_parameters().await
    }
    .await;
    spinner.finish_and_clear();

    let parameters = result.context("Failed to fetch parameters")?;

    if args.json {
        let entries: serde_json::Map<_, _> = parameters
            .iter()
            .map(|p| {
                (
                    p.key.clone(),
                    json!({
                        "name": p.name,
                        "version": p.version,
                        "value": output::reveal(p.value_or_empty(), args.show_values),
                        "last_modified": p.last_modified.map(|t| t.to_rfc3339()),
                    }),
                )
            })
            .collect();
        println!("{}", serde_json::to_string_pretty(&entries)?);
        return Ok(());
    }

    output::header(&format!(
        "{} parameters under {}",
        parameters.len(),
        parameters.base_path()
    ));

    for parameter in parameters.iter() {
        output::kv(
            &format!("{} (v{})", parameter.key, parameter.version),
            output::reveal(parameter.value_or_empty(), args.show_values),
        );
    }

    Ok(())
}
