//! Command implementations

pub mod parameters;
pub mod secrets;
pub mod version;
pub mod watch;

use anyhow::{Context, Result};
use camino::Utf8Path;
use huginn_core::config::{ParameterStoreSettings, SecretsSettings};
use huginn_core::HuginnConfig;

fn load_config(path: Option<&Utf8Path>) -> Result<HuginnConfig> {
    HuginnConfig::load_or_default(path).context("Failed to load huginn config")
}

/// Secret settings from `huginn.yaml`, with command-line overrides applied
fn secret_settings(
    config: &HuginnConfig,
    secret_id: Option<String>,
    region: Option<String>,
) -> Result<SecretsSettings> {
    let mut settings = match (config.secrets(), secret_id) {
        (Some(mut settings), Some(id)) => {
            settings.secret_id = id;
            settings
        }
        (Some(settings), None) => settings,
        (None, Some(id)) => SecretsSettings::new(id).with_aws(config.aws().clone()),
        (None, None) => anyhow::bail!(
            "No secret given; pass --secret-id or set secret.secret-id in huginn.yaml"
        ),
    };

    if let Some(region) = region {
        settings = settings.with_region(region);
    }

    Ok(settings)
}

/// Parameter-store settings from `huginn.yaml`, with command-line overrides
/// applied
fn parameter_settings(
    config: &HuginnConfig,
    path: Option<String>,
    region: Option<String>,
) -> Result<ParameterStoreSettings> {
    let mut settings = match (config.parameter_store(), path) {
        (Some(settings), Some(path)) => ParameterStoreSettings {
            base_path: path,
            ..settings
        },
        (Some(settings), None) => settings,
        (None, Some(path)) => ParameterStoreSettings::new(path).with_aws(config.aws().clone()),
        (None, None) => anyhow::bail!(
            "No parameter path given; pass --path or set parameter-store.base-path in huginn.yaml"
        ),
    };

    if let Some(region) = region {
        settings = settings.with_region(region);
    }

    Ok(settings)
}
