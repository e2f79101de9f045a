//! Parameter sets fetched under a base path

use crate::error::Result;
use chrono::{DateTime, Utc};
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::collections::{BTreeMap, HashMap};

/// One parameter under a base path
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Parameter {
    /// Key relative to the base path
    pub key: String,
    /// Full remote name (`base_path + key`)
    pub name: String,
    /// `None` for a no-value placeholder
    pub value: Option<String>,
    /// Remote-assigned, increases on every write to this key
    pub version: i64,
    pub last_modified: Option<DateTime<Utc>>,
}

impl Parameter {
    /// Value, or the empty string for a placeholder
    pub fn value_or_empty(&self) -> &str {
        self.value.as_deref().unwrap_or("")
    }
}

/// All parameters under one base path, produced by a complete paginated
/// fetch and never modified afterwards
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParameterSet {
    base_path: String,
    parameters: BTreeMap<String, Parameter>,
}

impl ParameterSet {
    pub fn new(base_path: impl Into<String>, parameters: impl IntoIterator<Item = Parameter>) -> Self {
        Self {
            base_path: base_path.into(),
            parameters: parameters
                .into_iter()
                .map(|p| (p.key.clone(), p))
                .collect(),
        }
    }

    pub fn base_path(&self) -> &str {
        &self.base_path
    }

    pub fn len(&self) -> usize {
        self.parameters.len()
    }

    pub fn is_empty(&self) -> bool {
        self.parameters.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Parameter> {
        self.parameters.values()
    }

    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.parameters.keys().map(String::as_str)
    }

    pub fn get(&self, key: &str) -> Option<&Parameter> {
        self.parameters.get(key)
    }

    pub fn exists(&self, key: &str) -> bool {
        self.parameters.contains_key(key)
    }

    /// Value for `key`, empty when the key is missing or has no value
    pub fn value(&self, key: &str) -> &str {
        self.get(key).map(Parameter::value_or_empty).unwrap_or("")
    }

    /// Remote name for a relative key
    pub fn full_path(&self, key: &str) -> String {
        format!("{}{}", self.base_path, key)
    }

    /// Relative key for a remote name
    pub fn relative_key<'a>(&self, name: &'a str) -> std::borrow::Cow<'a, str> {
        relative_key(&self.base_path, name)
    }

    pub fn get_by_full_path(&self, name: &str) -> Option<&Parameter> {
        self.get(&self.relative_key(name))
    }

    pub fn exists_by_full_path(&self, name: &str) -> bool {
        self.exists(&self.relative_key(name))
    }

    pub fn value_by_full_path(&self, name: &str) -> &str {
        self.value(&self.relative_key(name))
    }

    /// Version of every key, the state the diff engine compares against
    pub fn versions(&self) -> HashMap<String, i64> {
        self.parameters
            .iter()
            .map(|(k, p)| (k.clone(), p.version))
            .collect()
    }

    /// Key to value map, placeholders rendered as empty strings
    pub fn key_values(&self) -> BTreeMap<String, String> {
        self.parameters
            .iter()
            .map(|(k, p)| (k.clone(), p.value_or_empty().to_string()))
            .collect()
    }

    /// JSON object of key to value, the payload handed to the config view
    pub fn to_json(&self) -> Result<Vec<u8>> {
        Ok(serde_json::to_vec(&self.key_values())?)
    }

    /// Decode the key to value map into a user type
    pub fn decode<T: DeserializeOwned>(&self) -> Result<T> {
        let value = serde_json::to_value(self.key_values())?;
        Ok(serde_json::from_value(value)?)
    }
}

/// Strip `base_path` from a remote parameter name
pub fn relative_key<'a>(base_path: &str, name: &'a str) -> std::borrow::Cow<'a, str> {
    match name.strip_prefix(base_path) {
        Some(key) => std::borrow::Cow::Borrowed(key),
        None if !base_path.is_empty() => std::borrow::Cow::Owned(name.replacen(base_path, "", 1)),
        None => std::borrow::Cow::Borrowed(name),
    }
}
