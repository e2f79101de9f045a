//! Secrets Manager provider

use super::rotation::{RotationReport, StageRotator};
use crate::client::SecretsClient;
use crate::sdk::{load_sdk_config, AwsSecretsClient};
use async_trait::async_trait;
use huginn_core::config::SecretsSettings;
use huginn_core::{
    BackendError, Error, Result, SecretChange, SecretSnapshot, SecretVersionTracker, WatchSource,
};
use std::time::Duration;
use tracing::{debug, info};

type SecretCallback = Box<dyn Fn(&SecretSnapshot) + Send + Sync>;

/// Reads one secret's `AWSCURRENT` version
///
/// With `update_stage` enabled, every fetch also runs a [`StageRotator`]
/// pass so the live version carries its timestamp label.
pub struct SecretsProvider<C = AwsSecretsClient> {
    settings: SecretsSettings,
    client: C,
    rotator: StageRotator,
    on_change: Option<SecretCallback>,
}

impl SecretsProvider<AwsSecretsClient> {
    /// Validate `settings` and connect with the AWS SDK
    pub async fn connect(settings: SecretsSettings) -> Result<Self> {
        settings.validate()?;
        let sdk_config = load_sdk_config(&settings.aws).await;
        Self::with_client(settings, AwsSecretsClient::new(&sdk_config))
    }
}

impl<C: SecretsClient> SecretsProvider<C> {
    pub fn with_client(settings: SecretsSettings, client: C) -> Result<Self> {
        settings.validate()?;

        let rotator = StageRotator::new(&settings.secret_id, settings.keep_stages);
        debug!(
            "Secrets provider for {} (update stage: {}, keep stages: {})",
            settings.secret_id, settings.update_stage, settings.keep_stages
        );

        Ok(Self {
            settings,
            client,
            rotator,
            on_change: None,
        })
    }

    /// Callback invoked from the watch loop after a new version was delivered
    pub fn on_change(mut self, callback: impl Fn(&SecretSnapshot) + Send + Sync + 'static) -> Self {
        self.on_change = Some(Box::new(callback));
        self
    }

    pub fn settings(&self) -> &SecretsSettings {
        &self.settings
    }

    pub fn secret_id(&self) -> &str {
        &self.settings.secret_id
    }

    pub fn client(&self) -> &C {
        &self.client
    }

    /// Fetch the current secret, rotating stage labels when enabled
    pub async fn fetch_secret(&self) -> Result<SecretSnapshot> {
        let snapshot = self.read_current().await?;

        if self.settings.update_stage {
            self.rotator.rotate(&self.client, &snapshot).await;
        }

        Ok(snapshot)
    }

    /// Run a rotation pass for the current version, regardless of
    /// `update_stage`
    pub async fn update_stages(&self) -> Result<(SecretSnapshot, RotationReport)> {
        let snapshot = self.read_current().await?;
        let report = self.rotator.rotate(&self.client, &snapshot).await;
        Ok((snapshot, report))
    }

    async fn read_current(&self) -> Result<SecretSnapshot> {
        let secret_id = &self.settings.secret_id;

        let output = self
            .client
            .get_secret_value(secret_id)
            .await
            .map_err(|e| Error::remote("GetSecretValue", secret_id, e))?;

        let value = match output.value {
            Some(value) if !value.is_empty() => value,
            _ => return Err(Error::empty_secret_value(secret_id)),
        };

        let version_id = output.version_id.ok_or_else(|| {
            Error::remote(
                "GetSecretValue",
                secret_id,
                BackendError::other("response carried no version id"),
            )
        })?;

        Ok(SecretSnapshot::new(
            secret_id.as_str(),
            value,
            version_id,
            output.created_at,
            output.version_stages,
        ))
    }
}

#[async_trait]
impl<C: SecretsClient + 'static> WatchSource for SecretsProvider<C> {
    type Snapshot = SecretSnapshot;
    type Tracker = SecretVersionTracker;

    fn name(&self) -> String {
        format!("aws-secrets:{}", self.settings.secret_id)
    }

    fn watch_interval(&self) -> Duration {
        self.settings.watch_interval()
    }

    fn tracker(&self) -> SecretVersionTracker {
        SecretVersionTracker::new()
    }

    async fn fetch(&self) -> Result<SecretSnapshot> {
        self.fetch_secret().await
    }

    fn encode(&self, snapshot: &SecretSnapshot) -> Result<Vec<u8>> {
        Ok(snapshot.to_bytes())
    }

    fn notify(&self, snapshot: &SecretSnapshot, change: &SecretChange) {
        info!(
            "Secret {} changed: {} -> {}",
            self.settings.secret_id,
            change.previous_version.as_deref().unwrap_or("none"),
            change.version_id
        );

        if let Some(callback) = &self.on_change {
            callback(snapshot);
        }
    }
}

impl<C> std::fmt::Debug for SecretsProvider<C> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SecretsProvider")
            .field("settings", &self.settings)
            .field("on_change", &self.on_change.is_some())
            .finish_non_exhaustive()
    }
}
