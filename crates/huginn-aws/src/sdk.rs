//! AWS SDK implementations of the client seams

use crate::client::{
    ParameterClient, ParameterPage, RawParameter, SecretValue, SecretVersionPage, SecretsClient,
};
use async_trait::async_trait;
use aws_config::{BehaviorVersion, SdkConfig};
use aws_sdk_secretsmanager::config::{Credentials, Region};
use aws_sdk_secretsmanager::error::{DisplayErrorContext, ProvideErrorMetadata, SdkError};
use aws_sdk_secretsmanager::primitives::DateTime as AwsDateTime;
use chrono::{DateTime, Utc};
use huginn_core::config::AwsSettings;
use huginn_core::{BackendError, BackendErrorKind, SecretVersionEntry};
use tracing::debug;

/// Stage read by every secret fetch
const CURRENT_STAGE: &str = "AWSCURRENT";

/// Page size for parameter traversal; the service maximum
const PARAMETER_PAGE_SIZE: i32 = 10;

/// Build the shared SDK configuration for `settings`
///
/// `AWS_REGION` overrides the configured region. Static credentials are used
/// when both key parts are set, otherwise the default provider chain.
pub async fn load_sdk_config(settings: &AwsSettings) -> SdkConfig {
    let region = settings.resolved_region();
    debug!("Using AWS region: {}", region);

    let mut loader = aws_config::defaults(BehaviorVersion::latest()).region(Region::new(region));

    if let Some(creds) = settings.static_credentials() {
        debug!("Using static credentials for key {}", creds.access_key_id);
        loader = loader.credentials_provider(Credentials::new(
            creds.access_key_id,
            creds.secret_access_key.as_str(),
            creds.session_token.map(|t| t.as_str().to_string()),
            None,
            "huginn-static",
        ));
    }

    loader.load().await
}

/// Secrets Manager client
#[derive(Debug, Clone)]
pub struct AwsSecretsClient {
    client: aws_sdk_secretsmanager::Client,
}

impl AwsSecretsClient {
    pub fn new(config: &SdkConfig) -> Self {
        Self {
            client: aws_sdk_secretsmanager::Client::new(config),
        }
    }
}

#[async_trait]
impl SecretsClient for AwsSecretsClient {
    async fn get_secret_value(&self, secret_id: &str) -> Result<SecretValue, BackendError> {
        let output = self
            .client
            .get_secret_value()
            .secret_id(secret_id)
            .version_stage(CURRENT_STAGE)
            .send()
            .await
            .map_err(backend_error)?;

        let value = output.secret_string().map(str::to_string).or_else(|| {
            output
                .secret_binary()
                .map(|blob| String::from_utf8_lossy(blob.as_ref()).into_owned())
        });

        Ok(SecretValue {
            value,
            version_id: output.version_id().map(str::to_string),
            created_at: output.created_date().and_then(to_chrono),
            version_stages: output.version_stages().to_vec(),
        })
    }

    async fn list_secret_versions(
        &self,
        secret_id: &str,
        page_size: i32,
        page_token: Option<String>,
    ) -> Result<SecretVersionPage, BackendError> {
        let output = self
            .client
            .list_secret_version_ids()
            .secret_id(secret_id)
            .max_results(page_size)
            .set_next_token(page_token)
            .send()
            .await
            .map_err(backend_error)?;

        let entries = output
            .versions()
            .iter()
            .filter_map(|v| {
                let version_id = v.version_id()?;
                Some(SecretVersionEntry::new(
                    version_id,
                    v.created_date().and_then(to_chrono),
                    v.version_stages().to_vec(),
                ))
            })
            .collect();

        Ok(SecretVersionPage {
            entries,
            next_token: output.next_token().map(str::to_string),
        })
    }

    async fn attach_stage(
        &self,
        secret_id: &str,
        version_id: &str,
        label: &str,
    ) -> Result<(), BackendError> {
        self.client
            .update_secret_version_stage()
            .secret_id(secret_id)
            .version_stage(label)
            .move_to_version_id(version_id)
            .send()
            .await
            .map_err(backend_error)?;
        Ok(())
    }

    async fn detach_stage(
        &self,
        secret_id: &str,
        version_id: &str,
        label: &str,
    ) -> Result<(), BackendError> {
        self.client
            .update_secret_version_stage()
            .secret_id(secret_id)
            .version_stage(label)
            .remove_from_version_id(version_id)
            .send()
            .await
            .map_err(backend_error)?;
        Ok(())
    }
}

/// SSM Parameter Store client
#[derive(Debug, Clone)]
pub struct AwsParameterClient {
    client: aws_sdk_ssm::Client,
}

impl AwsParameterClient {
    pub fn new(config: &SdkConfig) -> Self {
        Self {
            client: aws_sdk_ssm::Client::new(config),
        }
    }
}

#[async_trait]
impl ParameterClient for AwsParameterClient {
    async fn get_parameters_by_path(
        &self,
        path: &str,
        page_token: Option<String>,
    ) -> Result<ParameterPage, BackendError> {
        let output = self
            .client
            .get_parameters_by_path()
            .path(path)
            .with_decryption(true)
            .max_results(PARAMETER_PAGE_SIZE)
            .set_next_token(page_token)
            .send()
            .await
            .map_err(backend_error)?;

        let parameters = output
            .parameters()
            .iter()
            .map(|p| RawParameter {
                name: p.name().map(str::to_string),
                value: p.value().map(str::to_string),
                version: p.version(),
                last_modified: p.last_modified_date().and_then(to_chrono),
            })
            .collect();

        Ok(ParameterPage {
            parameters,
            next_token: output.next_token().map(str::to_string),
        })
    }
}

/// Classify an SDK failure by its service error code
fn backend_error<E, R>(err: SdkError<E, R>) -> BackendError
where
    E: ProvideErrorMetadata + std::error::Error + Send + Sync + 'static,
    R: std::fmt::Debug,
{
    let kind = err.code().map(classify).unwrap_or(BackendErrorKind::Other);
    BackendError::new(kind, DisplayErrorContext(&err).to_string())
}

fn classify(code: &str) -> BackendErrorKind {
    match code {
        "ResourceNotFoundException" | "ParameterNotFound" | "ParameterVersionNotFound" => {
            BackendErrorKind::NotFound
        }
        "InvalidParameterException" | "ValidationException" => BackendErrorKind::InvalidParameter,
        "AccessDeniedException"
        | "UnrecognizedClientException"
        | "ExpiredTokenException"
        | "InvalidSignatureException" => BackendErrorKind::AccessDenied,
        "ThrottlingException" | "TooManyUpdates" => BackendErrorKind::Throttled,
        _ => BackendErrorKind::Other,
    }
}

fn to_chrono(dt: &AwsDateTime) -> Option<DateTime<Utc>> {
    DateTime::from_timestamp(dt.secs(), dt.subsec_nanos())
}
