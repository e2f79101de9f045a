//! Payload formats understood by the live config view

use crate::error::{Error, Result};
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::str::FromStr;

/// Encoding of a config payload (local file or secret text)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ConfigFormat {
    #[default]
    Yaml,
    Json,
    Toml,
}

impl ConfigFormat {
    /// Detect the format from a file extension
    pub fn from_path(path: &Path) -> Option<Self> {
        match path.extension().and_then(|ext| ext.to_str()) {
            Some("json") => Some(ConfigFormat::Json),
            Some("yaml") | Some("yml") => Some(ConfigFormat::Yaml),
            Some("toml") => Some(ConfigFormat::Toml),
            _ => None,
        }
    }

    /// Parse a payload into a JSON value tree
    pub fn parse(&self, bytes: &[u8]) -> Result<serde_json::Value> {
        let value = match self {
            ConfigFormat::Json => serde_json::from_slice(bytes)?,
            ConfigFormat::Yaml if bytes.iter().all(u8::is_ascii_whitespace) => {
                serde_json::Value::Null
            }
            ConfigFormat::Yaml => serde_yaml_ng::from_slice(bytes)?,
            ConfigFormat::Toml => {
                let text = std::str::from_utf8(bytes).map_err(|e| {
                    Error::invalid_config(format!("TOML payload is not valid UTF-8: {}", e))
                })?;
                toml::from_str(text)?
            }
        };

        // An empty document is an empty config, not a scalar
        Ok(match value {
            serde_json::Value::Null => serde_json::Value::Object(Default::default()),
            other => other,
        })
    }
}

impl FromStr for ConfigFormat {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_ascii_lowercase().as_str() {
            "yaml" | "yml" => Ok(ConfigFormat::Yaml),
            "json" => Ok(ConfigFormat::Json),
            "toml" => Ok(ConfigFormat::Toml),
            other => Err(Error::unsupported_format(other)),
        }
    }
}

impl std::fmt::Display for ConfigFormat {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ConfigFormat::Yaml => write!(f, "yaml"),
            ConfigFormat::Json => write!(f, "json"),
            ConfigFormat::Toml => write!(f, "toml"),
        }
    }
}
