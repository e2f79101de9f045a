//! In-memory stand-ins for the AWS stores

#![allow(dead_code)]

use async_trait::async_trait;
use chrono::{DateTime, Duration, TimeZone, Utc};
use huginn_aws::{
    ParameterClient, ParameterPage, RawParameter, SecretValue, SecretVersionPage, SecretsClient,
};
use huginn_core::{BackendError, SecretVersionEntry};
use std::collections::BTreeMap;
use std::sync::Mutex;

pub fn base_time() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2024, 3, 15, 9, 30, 0).unwrap()
}

#[derive(Debug, Clone)]
struct StoredVersion {
    id: String,
    value: String,
    created_at: DateTime<Utc>,
    stages: Vec<String>,
}

/// Secrets Manager with label semantics close to the real service
#[derive(Debug, Default)]
pub struct FakeSecretsStore {
    versions: Mutex<Vec<StoredVersion>>,
    pub update_calls: Mutex<usize>,
}

impl FakeSecretsStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a version and move `AWSCURRENT`/`AWSPREVIOUS` like PutSecretValue
    pub fn put(&self, id: &str, value: &str, minutes_after_base: i64) {
        let mut versions = self.versions.lock().unwrap();

        for v in versions.iter_mut() {
            v.stages.retain(|s| s != "AWSPREVIOUS");
        }
        for v in versions.iter_mut() {
            if let Some(pos) = v.stages.iter().position(|s| s == "AWSCURRENT") {
                v.stages[pos] = "AWSPREVIOUS".to_string();
            }
        }

        versions.push(StoredVersion {
            id: id.to_string(),
            value: value.to_string(),
            created_at: base_time() + Duration::minutes(minutes_after_base),
            stages: vec!["AWSCURRENT".to_string()],
        });
    }

    /// Attach an extra label directly, bypassing rotation
    pub fn label(&self, id: &str, label: &str) {
        let mut versions = self.versions.lock().unwrap();
        if let Some(v) = versions.iter_mut().find(|v| v.id == id) {
            v.stages.push(label.to_string());
        }
    }

    pub fn stages_of(&self, id: &str) -> Vec<String> {
        self.versions
            .lock()
            .unwrap()
            .iter()
            .find(|v| v.id == id)
            .map(|v| v.stages.clone())
            .unwrap_or_default()
    }

    pub fn entries(&self) -> Vec<SecretVersionEntry> {
        self.versions
            .lock()
            .unwrap()
            .iter()
            .map(|v| SecretVersionEntry::new(&v.id, Some(v.created_at), v.stages.clone()))
            .collect()
    }

    pub fn update_calls(&self) -> usize {
        *self.update_calls.lock().unwrap()
    }
}

#[async_trait]
impl SecretsClient for FakeSecretsStore {
    async fn get_secret_value(&self, secret_id: &str) -> Result<SecretValue, BackendError> {
        let versions = self.versions.lock().unwrap();
        let current = versions
            .iter()
            .find(|v| v.stages.iter().any(|s| s == "AWSCURRENT"))
            .ok_or_else(|| BackendError::not_found(format!("{} has no current version", secret_id)))?;

        Ok(SecretValue {
            value: Some(current.value.clone()),
            version_id: Some(current.id.clone()),
            created_at: Some(current.created_at),
            version_stages: current.stages.clone(),
        })
    }

    async fn list_secret_versions(
        &self,
        _secret_id: &str,
        page_size: i32,
        page_token: Option<String>,
    ) -> Result<SecretVersionPage, BackendError> {
        let entries = self.entries();
        let start: usize = page_token.map(|t| t.parse().unwrap_or(0)).unwrap_or(0);
        let end = (start + page_size as usize).min(entries.len());

        Ok(SecretVersionPage {
            entries: entries[start..end].to_vec(),
            next_token: (end < entries.len()).then(|| end.to_string()),
        })
    }

    async fn attach_stage(
        &self,
        _secret_id: &str,
        version_id: &str,
        label: &str,
    ) -> Result<(), BackendError> {
        *self.update_calls.lock().unwrap() += 1;
        let mut versions = self.versions.lock().unwrap();

        if !versions.iter().any(|v| v.id == version_id) {
            return Err(BackendError::invalid_parameter(format!(
                "unknown version {}",
                version_id
            )));
        }

        for v in versions.iter_mut() {
            v.stages.retain(|s| s != label);
            if v.id == version_id {
                v.stages.push(label.to_string());
            }
        }
        Ok(())
    }

    async fn detach_stage(
        &self,
        _secret_id: &str,
        version_id: &str,
        label: &str,
    ) -> Result<(), BackendError> {
        *self.update_calls.lock().unwrap() += 1;
        let mut versions = self.versions.lock().unwrap();

        let version = versions
            .iter_mut()
            .find(|v| v.id == version_id && v.stages.iter().any(|s| s == label))
            .ok_or_else(|| {
                BackendError::invalid_parameter(format!(
                    "Staging label {} isn't currently attached to version {}",
                    label, version_id
                ))
            })?;

        version.stages.retain(|s| s != label);
        Ok(())
    }
}

/// Parameter Store holding full names, paged like the real service
#[derive(Debug, Default)]
pub struct FakeParameterStore {
    parameters: Mutex<BTreeMap<String, (Option<String>, i64)>>,
    pub page_size: usize,
}

impl FakeParameterStore {
    pub fn new(page_size: usize) -> Self {
        Self {
            parameters: Mutex::new(BTreeMap::new()),
            page_size,
        }
    }

    /// Create or overwrite, bumping the version like PutParameter
    pub fn put(&self, name: &str, value: &str) {
        let mut parameters = self.parameters.lock().unwrap();
        let version = parameters.get(name).map(|(_, v)| v + 1).unwrap_or(1);
        parameters.insert(name.to_string(), (Some(value.to_string()), version));
    }

    pub fn delete(&self, name: &str) {
        self.parameters.lock().unwrap().remove(name);
    }
}

#[async_trait]
impl ParameterClient for FakeParameterStore {
    async fn get_parameters_by_path(
        &self,
        path: &str,
        page_token: Option<String>,
    ) -> Result<ParameterPage, BackendError> {
        let matching: Vec<RawParameter> = self
            .parameters
            .lock()
            .unwrap()
            .iter()
            .filter(|(name, _)| name.starts_with(path))
            .map(|(name, (value, version))| RawParameter {
                name: Some(name.clone()),
                value: value.clone(),
                version: *version,
                last_modified: Some(base_time()),
            })
            .collect();

        let start: usize = page_token.map(|t| t.parse().unwrap_or(0)).unwrap_or(0);
        let end = (start + self.page_size).min(matching.len());

        Ok(ParameterPage {
            parameters: matching[start..end].to_vec(),
            next_token: (end < matching.len()).then(|| end.to_string()),
        })
    }
}
