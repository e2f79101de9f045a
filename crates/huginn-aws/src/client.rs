//! Remote store seams
//!
//! The providers only talk to AWS through these traits. `sdk` holds the
//! real implementations; tests plug in fakes or mocks.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use huginn_core::{BackendError, SecretVersionEntry};

/// Result of reading the `AWSCURRENT` version of a secret
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SecretValue {
    /// Secret text; `None` when the store returned no string
    pub value: Option<String>,
    pub version_id: Option<String>,
    pub created_at: Option<DateTime<Utc>>,
    pub version_stages: Vec<String>,
}

/// One page of a secret's version history
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SecretVersionPage {
    pub entries: Vec<SecretVersionEntry>,
    pub next_token: Option<String>,
}

/// A parameter as returned by the store, name not yet made relative
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RawParameter {
    pub name: Option<String>,
    pub value: Option<String>,
    pub version: i64,
    pub last_modified: Option<DateTime<Utc>>,
}

/// One page of a path traversal
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ParameterPage {
    pub parameters: Vec<RawParameter>,
    pub next_token: Option<String>,
}

/// Secrets Manager operations used by the secrets provider and rotation
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait SecretsClient: Send + Sync {
    /// Read the version currently labelled `AWSCURRENT`
    async fn get_secret_value(&self, secret_id: &str) -> Result<SecretValue, BackendError>;

    async fn list_secret_versions(
        &self,
        secret_id: &str,
        page_size: i32,
        page_token: Option<String>,
    ) -> Result<SecretVersionPage, BackendError>;

    /// Move `label` onto `version_id`, detaching it from wherever it was
    async fn attach_stage(
        &self,
        secret_id: &str,
        version_id: &str,
        label: &str,
    ) -> Result<(), BackendError>;

    async fn detach_stage(
        &self,
        secret_id: &str,
        version_id: &str,
        label: &str,
    ) -> Result<(), BackendError>;
}

/// SSM Parameter Store operations used by the parameter-store provider
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait ParameterClient: Send + Sync {
    /// Decrypted read of one page of the parameters directly below `path`
    async fn get_parameters_by_path(
        &self,
        path: &str,
        page_token: Option<String>,
    ) -> Result<ParameterPage, BackendError>;
}
