//! Provider and local-file settings
//!
//! Every type deserializes from the matching `huginn.yaml` section with
//! kebab-case keys and falls back to the defaults below for missing keys.

use crate::error::{Error, Result};
use crate::format::ConfigFormat;
use crate::security::SecureString;
use serde::Deserialize;
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Region used when neither the config nor the environment names one
pub const DEFAULT_REGION: &str = "us-east-1";

/// Environment variable that overrides the configured region
pub const REGION_ENV: &str = "AWS_REGION";

/// Stage labels kept per secret when rotation is enabled
pub const DEFAULT_KEEP_STAGES: usize = 10;

/// Secrets Manager allows 20 labels per secret; two are reserved for the
/// live labels and one for the label being attached
const KEEP_STAGES_RANGE: std::ops::RangeInclusive<usize> = 3..=17;

pub const DEFAULT_WATCH_INTERVAL_SECS: u64 = 5;

pub const DEFAULT_DEBOUNCE_MS: u64 = 200;

pub const DEFAULT_LOCAL_FILE: &str = "./app.yaml";

/// Region and credentials shared by all AWS-backed providers
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct AwsSettings {
    #[serde(default = "default_region")]
    pub region: String,

    /// Static credentials are used only when both key parts are set;
    /// otherwise the default AWS credential chain applies
    #[serde(default)]
    pub access_key_id: Option<String>,

    #[serde(default)]
    pub secret_access_key: Option<SecureString>,

    #[serde(default)]
    pub session_token: Option<SecureString>,
}

impl Default for AwsSettings {
    fn default() -> Self {
        Self {
            region: default_region(),
            access_key_id: None,
            secret_access_key: None,
            session_token: None,
        }
    }
}

/// Static AWS credentials
#[derive(Debug, Clone)]
pub struct StaticCredentials {
    pub access_key_id: String,
    pub secret_access_key: SecureString,
    pub session_token: Option<SecureString>,
}

impl AwsSettings {
    pub fn with_region(mut self, region: impl Into<String>) -> Self {
        self.region = region.into();
        self
    }

    pub fn with_credentials(
        mut self,
        access_key_id: impl Into<String>,
        secret_access_key: impl Into<SecureString>,
        session_token: Option<SecureString>,
    ) -> Self {
        self.access_key_id = Some(access_key_id.into());
        self.secret_access_key = Some(secret_access_key.into());
        self.session_token = session_token;
        self
    }

    /// Region to connect to; `AWS_REGION` wins over the configured value
    pub fn resolved_region(&self) -> String {
        match std::env::var(REGION_ENV) {
            Ok(region) if !region.is_empty() => region,
            _ => self.region.clone(),
        }
    }

    /// Static credentials when both the key id and secret key are present
    pub fn static_credentials(&self) -> Option<StaticCredentials> {
        match (&self.access_key_id, &self.secret_access_key) {
            (Some(id), Some(secret)) if !id.is_empty() && !secret.is_empty() => {
                Some(StaticCredentials {
                    access_key_id: id.clone(),
                    secret_access_key: secret.clone(),
                    session_token: self.session_token.clone(),
                })
            }
            _ => None,
        }
    }
}

/// Settings for a Secrets Manager provider
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct SecretsSettings {
    pub secret_id: String,

    /// Filled from the top-level `aws` section by the loader
    #[serde(skip)]
    pub aws: AwsSettings,

    /// Maintain timestamp stage labels and prune old ones on every fetch
    #[serde(default)]
    pub update_stage: bool,

    #[serde(default = "default_keep_stages")]
    pub keep_stages: usize,

    #[serde(default = "default_watch_interval")]
    pub watch_interval_secs: u64,
}

impl SecretsSettings {
    pub fn new(secret_id: impl Into<String>) -> Self {
        Self {
            secret_id: secret_id.into(),
            aws: AwsSettings::default(),
            update_stage: false,
            keep_stages: DEFAULT_KEEP_STAGES,
            watch_interval_secs: DEFAULT_WATCH_INTERVAL_SECS,
        }
    }

    pub fn with_aws(mut self, aws: AwsSettings) -> Self {
        self.aws = aws;
        self
    }

    pub fn with_region(mut self, region: impl Into<String>) -> Self {
        self.aws.region = region.into();
        self
    }

    pub fn with_update_stage(mut self, update_stage: bool) -> Self {
        self.update_stage = update_stage;
        self
    }

    pub fn with_keep_stages(mut self, keep_stages: usize) -> Self {
        self.keep_stages = keep_stages;
        self
    }

    /// Set the poll interval; values of one second or less are ignored
    pub fn with_watch_interval_secs(mut self, secs: u64) -> Self {
        if secs > 1 {
            self.watch_interval_secs = secs;
        }
        self
    }

    pub fn watch_interval(&self) -> Duration {
        watch_interval(self.watch_interval_secs)
    }

    pub fn validate(&self) -> Result<()> {
        if self.secret_id.trim().is_empty() {
            return Err(Error::invalid_config("secret-id must not be empty"));
        }

        if !KEEP_STAGES_RANGE.contains(&self.keep_stages) {
            return Err(Error::invalid_config(format!(
                "keep-stages must be between {} and {}, got {}",
                KEEP_STAGES_RANGE.start(),
                KEEP_STAGES_RANGE.end(),
                self.keep_stages
            )));
        }

        Ok(())
    }
}

/// Settings for an SSM Parameter Store provider
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct ParameterStoreSettings {
    /// Path prefix, e.g. `/<project>/<env>/`
    pub base_path: String,

    /// Filled from the top-level `aws` section by the loader
    #[serde(skip)]
    pub aws: AwsSettings,

    #[serde(default = "default_watch_interval")]
    pub watch_interval_secs: u64,
}

impl ParameterStoreSettings {
    pub fn new(base_path: impl AsRef<str>) -> Self {
        Self {
            base_path: normalize_base_path(base_path.as_ref()),
            aws: AwsSettings::default(),
            watch_interval_secs: DEFAULT_WATCH_INTERVAL_SECS,
        }
    }

    pub fn with_aws(mut self, aws: AwsSettings) -> Self {
        self.aws = aws;
        self
    }

    pub fn with_region(mut self, region: impl Into<String>) -> Self {
        self.aws.region = region.into();
        self
    }

    /// Set the poll interval; values of one second or less are ignored
    pub fn with_watch_interval_secs(mut self, secs: u64) -> Self {
        if secs > 1 {
            self.watch_interval_secs = secs;
        }
        self
    }

    /// Base path with a guaranteed trailing slash
    pub fn base_path(&self) -> String {
        normalize_base_path(&self.base_path)
    }

    pub fn watch_interval(&self) -> Duration {
        watch_interval(self.watch_interval_secs)
    }

    pub fn validate(&self) -> Result<()> {
        if self.base_path.trim().is_empty() {
            return Err(Error::invalid_config("base-path must not be empty"));
        }
        Ok(())
    }
}

/// Settings for a local config file
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct LocalFileSettings {
    #[serde(default = "default_local_file")]
    pub path: PathBuf,

    /// Detected from the extension when unset
    #[serde(default)]
    pub format: Option<ConfigFormat>,

    #[serde(default = "default_debounce_ms")]
    pub debounce_ms: u64,
}

impl Default for LocalFileSettings {
    fn default() -> Self {
        Self {
            path: default_local_file(),
            format: None,
            debounce_ms: default_debounce_ms(),
        }
    }
}

impl LocalFileSettings {
    pub fn new(path: impl AsRef<Path>) -> Self {
        Self {
            path: path.as_ref().to_path_buf(),
            ..Self::default()
        }
    }

    pub fn format(&self) -> ConfigFormat {
        self.format
            .or_else(|| ConfigFormat::from_path(&self.path))
            .unwrap_or_default()
    }

    pub fn debounce(&self) -> Duration {
        Duration::from_millis(self.debounce_ms)
    }
}

/// Append the trailing slash the store expects on path prefixes
pub fn normalize_base_path(base_path: &str) -> String {
    if base_path.is_empty() || base_path.ends_with('/') {
        base_path.to_string()
    } else {
        format!("{}/", base_path)
    }
}

fn watch_interval(secs: u64) -> Duration {
    if secs > 1 {
        Duration::from_secs(secs)
    } else {
        Duration::from_secs(DEFAULT_WATCH_INTERVAL_SECS)
    }
}

fn default_region() -> String {
    DEFAULT_REGION.to_string()
}
fn default_keep_stages() -> usize {
    DEFAULT_KEEP_STAGES
}
fn default_watch_interval() -> u64 {
    DEFAULT_WATCH_INTERVAL_SECS
}
fn default_debounce_ms() -> u64 {
    DEFAULT_DEBOUNCE_MS
}
fn default_local_file() -> PathBuf {
    PathBuf::from(DEFAULT_LOCAL_FILE)
}
