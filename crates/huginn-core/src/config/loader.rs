//! Configuration file loading

use super::settings::{AwsSettings, LocalFileSettings, ParameterStoreSettings, SecretsSettings};
use crate::error::{Error, Result};
use camino::{Utf8Path, Utf8PathBuf};
use serde::Deserialize;
use std::fs;

/// Configuration file names to search for
const CONFIG_FILE_NAMES: &[&str] = &["huginn.yaml", "huginn.yml"];

/// Contents of `huginn.yaml`
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct HuginnConfigFile {
    /// Shared by the secret and parameter-store sections
    #[serde(default)]
    pub aws: AwsSettings,

    #[serde(default)]
    pub secret: Option<SecretsSettings>,

    #[serde(default)]
    pub parameter_store: Option<ParameterStoreSettings>,

    #[serde(default)]
    pub local: Option<LocalFileSettings>,
}

/// Loaded Huginn configuration
#[derive(Debug, Clone, Default)]
pub struct HuginnConfig {
    pub config: HuginnConfigFile,

    /// `None` when no file was found and defaults are in use
    pub config_path: Option<Utf8PathBuf>,
}

impl HuginnConfig {
    /// Load configuration from the specified path or search for it
    pub fn load(path: Option<&Utf8Path>) -> Result<Self> {
        let (config_path, content) = match path {
            Some(p) => {
                let content = fs::read_to_string(p).map_err(|e| {
                    if e.kind() == std::io::ErrorKind::NotFound {
                        Error::config_not_found(p.as_str())
                    } else {
                        Error::Io(e)
                    }
                })?;
                (p.to_owned(), content)
            }
            None => Self::find_config(&current_dir()?)?,
        };

        Self::parse(config_path, &content)
    }

    /// Like [`HuginnConfig::load`], but a missing file found by searching
    /// yields defaults instead of an error. An explicit path must exist.
    pub fn load_or_default(path: Option<&Utf8Path>) -> Result<Self> {
        match Self::load(path) {
            Err(Error::ConfigNotFound { .. }) if path.is_none() => {
                tracing::debug!("No huginn config file found, using defaults");
                Ok(Self::default())
            }
            other => other,
        }
    }

    /// Search `start` and its parents for a config file
    pub fn discover(start: &Utf8Path) -> Result<Self> {
        let (config_path, content) = Self::find_config(start)?;
        Self::parse(config_path, &content)
    }

    fn parse(config_path: Utf8PathBuf, content: &str) -> Result<Self> {
        let config: HuginnConfigFile = if content.trim().is_empty() {
            HuginnConfigFile::default()
        } else {
            serde_yaml_ng::from_str(content)?
        };

        tracing::debug!("Loaded configuration from {}", config_path);

        Ok(Self {
            config,
            config_path: Some(config_path),
        })
    }

    fn find_config(start: &Utf8Path) -> Result<(Utf8PathBuf, String)> {
        let mut current = start;

        loop {
            for name in CONFIG_FILE_NAMES {
                let path = current.join(name);
                if path.exists() {
                    let content = fs::read_to_string(&path)?;
                    return Ok((path, content));
                }
            }

            match current.parent() {
                Some(parent) => current = parent,
                None => break,
            }
        }

        Err(Error::config_not_found(
            "huginn.yaml (searched current and parent directories)",
        ))
    }

    /// Secret settings with the shared AWS section applied
    pub fn secrets(&self) -> Option<SecretsSettings> {
        self.config
            .secret
            .clone()
            .map(|s| s.with_aws(self.config.aws.clone()))
    }

    /// Parameter-store settings with the shared AWS section applied
    pub fn parameter_store(&self) -> Option<ParameterStoreSettings> {
        self.config
            .parameter_store
            .clone()
            .map(|p| p.with_aws(self.config.aws.clone()))
    }

    pub fn local(&self) -> LocalFileSettings {
        self.config.local.clone().unwrap_or_default()
    }

    pub fn aws(&self) -> &AwsSettings {
        &self.config.aws
    }
}

fn current_dir() -> Result<Utf8PathBuf> {
    let cwd = std::env::current_dir().map_err(Error::Io)?;
    Utf8PathBuf::try_from(cwd)
        .map_err(|_| Error::invalid_config("Current directory path is not valid UTF-8"))
}
