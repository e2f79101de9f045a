//! SSM Parameter Store provider

use crate::client::ParameterClient;
use crate::sdk::{load_sdk_config, AwsParameterClient};
use async_trait::async_trait;
use huginn_core::config::ParameterStoreSettings;
use huginn_core::types::relative_key;
use huginn_core::{
    ChangeSet, ConfigFormat, Error, Parameter, ParameterSet, ParameterVersionTracker, Result,
    WatchSource,
};
use std::time::Duration;
use tracing::{debug, info};

type ParameterCallback = Box<dyn Fn(&ParameterSet, &ChangeSet) + Send + Sync>;

/// Reads every parameter directly below a base path
///
/// Keys are the parameter names with the base path removed. The emitted
/// payload is a JSON object of key to value.
pub struct ParameterStoreProvider<C = AwsParameterClient> {
    settings: ParameterStoreSettings,
    base_path: String,
    client: C,
    on_change: Option<ParameterCallback>,
}

impl ParameterStoreProvider<AwsParameterClient> {
    /// Validate `settings` and connect with the AWS SDK
    pub async fn connect(settings: ParameterStoreSettings) -> Result<Self> {
        settings.validate()?;
        let sdk_config = load_sdk_config(&settings.aws).await;
        Self::with_client(settings, AwsParameterClient::new(&sdk_config))
    }
}

impl<C: ParameterClient> ParameterStoreProvider<C> {
    pub fn with_client(settings: ParameterStoreSettings, client: C) -> Result<Self> {
        settings.validate()?;

        Ok(Self {
            base_path: settings.base_path(),
            settings,
            client,
            on_change: None,
        })
    }

    /// Callback invoked from the watch loop after a changed set was delivered
    pub fn on_change(
        mut self,
        callback: impl Fn(&ParameterSet, &ChangeSet) + Send + Sync + 'static,
    ) -> Self {
        self.on_change = Some(Box::new(callback));
        self
    }

    pub fn settings(&self) -> &ParameterStoreSettings {
        &self.settings
    }

    /// Normalized base path, always ending in `/`
    pub fn base_path(&self) -> &str {
        &self.base_path
    }

    pub fn client(&self) -> &C {
        &self.client
    }

    /// Read all pages; a partial traversal is never returned
    pub async fn fetch_parameters(&self) -> Result<ParameterSet> {
        let mut parameters = Vec::new();
        let mut page_token = None;

        loop {
            let page = self
                .client
                .get_parameters_by_path(&self.base_path, page_token)
                .await
                .map_err(|e| Error::remote("GetParametersByPath", &self.base_path, e))?;

            for raw in page.parameters {
                let Some(name) = raw.name else {
                    debug!("Skipping unnamed parameter under {}", self.base_path);
                    continue;
                };

                parameters.push(Parameter {
                    key: relative_key(&self.base_path, &name).into_owned(),
                    name,
                    value: raw.value,
                    version: raw.version,
                    last_modified: raw.last_modified,
                });
            }

            match page.next_token {
                Some(token) if !token.is_empty() => page_token = Some(token),
                _ => break,
            }
        }

        if parameters.is_empty() {
            return Err(Error::empty_parameters(&self.base_path));
        }

        let set = ParameterSet::new(&self.base_path, parameters);
        debug!("Fetched {} parameters under {}", set.len(), self.base_path);
        Ok(set)
    }
}

#[async_trait]
impl<C: ParameterClient + 'static> WatchSource for ParameterStoreProvider<C> {
    type Snapshot = ParameterSet;
    type Tracker = ParameterVersionTracker;

    fn name(&self) -> String {
        format!("aws-parameterstore:{}", self.base_path)
    }

    fn watch_interval(&self) -> Duration {
        self.settings.watch_interval()
    }

    fn tracker(&self) -> ParameterVersionTracker {
        ParameterVersionTracker::new()
    }

    fn payload_format(&self) -> Option<ConfigFormat> {
        Some(ConfigFormat::Json)
    }

    async fn fetch(&self) -> Result<ParameterSet> {
        self.fetch_parameters().await
    }

    fn encode(&self, snapshot: &ParameterSet) -> Result<Vec<u8>> {
        snapshot.to_json()
    }

    fn notify(&self, snapshot: &ParameterSet, changes: &ChangeSet) {
        info!(
            "Parameters under {} changed: {} created, {} updated, {} deleted",
            self.base_path,
            changes.created.len(),
            changes.updated.len(),
            changes.deleted.len()
        );

        if let Some(callback) = &self.on_change {
            callback(snapshot, changes);
        }
    }
}

impl<C> std::fmt::Debug for ParameterStoreProvider<C> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ParameterStoreProvider")
            .field("base_path", &self.base_path)
            .field("on_change", &self.on_change.is_some())
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::client::{MockParameterClient, ParameterPage, RawParameter};
    use huginn_core::BackendError;

    fn raw(name: &str, value: Option<&str>, version: i64) -> RawParameter {
        RawParameter {
            name: Some(name.to_string()),
            value: value.map(str::to_string),
            version,
            last_modified: None,
        }
    }

    #[tokio::test]
    async fn test_fetch_follows_pages_and_strips_base_path() {
        let mut client = MockParameterClient::new();
        client
            .expect_get_parameters_by_path()
            .withf(|path, token| path.to_string() == "/app/prod/" && token.is_none())
            .times(1)
            .returning(|_, _| {
                Ok(ParameterPage {
                    parameters: vec![raw("/app/prod/db_host", Some("db.local"), 3)],
                    next_token: Some("t1".to_string()),
                })
            });
        client
            .expect_get_parameters_by_path()
            .withf(|_, token| token.as_deref() == Some("t1"))
            .times(1)
            .returning(|_, _| {
                Ok(ParameterPage {
                    parameters: vec![
                        raw("/app/prod/feature", None, 1),
                        RawParameter::default(),
                    ],
                    next_token: None,
                })
            });

        let provider =
            ParameterStoreProvider::with_client(ParameterStoreSettings::new("/app/prod"), client)
                .unwrap();
        let set = provider.fetch_parameters().await.unwrap();

        assert_eq!(set.len(), 2);
        assert_eq!(set.value("db_host"), "db.local");
        assert_eq!(set.get("db_host").unwrap().version, 3);
        assert!(set.exists("feature"));
        assert_eq!(set.value("feature"), "");
        assert_eq!(set.value_by_full_path("/app/prod/db_host"), "db.local");
    }

    #[tokio::test]
    async fn test_empty_traversal_is_distinct_error() {
        let mut client = MockParameterClient::new();
        client
            .expect_get_parameters_by_path()
            .returning(|_, _| Ok(ParameterPage::default()));

        let provider =
            ParameterStoreProvider::with_client(ParameterStoreSettings::new("/none/"), client)
                .unwrap();

        assert!(matches!(
            provider.fetch_parameters().await,
            Err(Error::EmptyParameters { ref base_path }) if base_path == "/none/"
        ));
    }

    #[tokio::test]
    async fn test_page_error_discards_partial_results() {
        let mut client = MockParameterClient::new();
        client
            .expect_get_parameters_by_path()
            .withf(|_, token| token.is_none())
            .returning(|_, _| {
                Ok(ParameterPage {
                    parameters: vec![raw("/p/a", Some("1"), 1)],
                    next_token: Some("next".to_string()),
                })
            });
        client
            .expect_get_parameters_by_path()
            .withf(|_, token| token.is_some())
            .returning(|_, _| Err(BackendError::other("timeout")));

        let provider =
            ParameterStoreProvider::with_client(ParameterStoreSettings::new("/p"), client)
                .unwrap();
        let err = provider.fetch_parameters().await.unwrap_err();

        assert!(err.to_string().starts_with("GetParametersByPath /p/:"));
    }

    #[tokio::test]
    async fn test_encode_is_json_key_values() {
        let mut client = MockParameterClient::new();
        client.expect_get_parameters_by_path().returning(|_, _| {
            Ok(ParameterPage {
                parameters: vec![raw("/p/a", Some("1"), 1), raw("/p/b", None, 1)],
                next_token: None,
            })
        });

        let provider =
            ParameterStoreProvider::with_client(ParameterStoreSettings::new("/p"), client)
                .unwrap();
        let set = WatchSource::fetch(&provider).await.unwrap();
        let payload: serde_json::Value =
            serde_json::from_slice(&provider.encode(&set).unwrap()).unwrap();

        assert_eq!(payload, serde_json::json!({"a": "1", "b": ""}));
        assert_eq!(provider.payload_format(), Some(ConfigFormat::Json));
        assert_eq!(provider.name(), "aws-parameterstore:/p/");
    }
}
