//! Error types for huginn-core

use std::fmt;
use thiserror::Error;

/// Result type alias using huginn-core's Error type
pub type Result<T> = std::result::Result<T, Error>;

/// Core error types for Huginn
#[derive(Error, Debug)]
pub enum Error {
    /// A call to the remote store failed
    #[error("{operation} {identifier}: {source}")]
    Remote {
        operation: &'static str,
        identifier: String,
        #[source]
        source: BackendError,
    },

    /// Secret fetch returned a present-but-empty value
    #[error("Secret value is empty: {secret_id}")]
    EmptySecretValue { secret_id: String },

    /// Parameter traversal yielded no parameters
    #[error("No parameters found under path: {base_path}")]
    EmptyParameters { base_path: String },

    /// Configuration file not found
    #[error("Configuration file not found: {path}")]
    ConfigNotFound { path: String },

    /// Invalid configuration value
    #[error("Invalid configuration: {message}")]
    InvalidConfig { message: String },

    /// Unknown payload format
    #[error("Unsupported config format: {format}. Valid formats: yaml, json, toml")]
    UnsupportedFormat { format: String },

    /// File watching failed
    #[error("Watch error: {message}")]
    Watch { message: String },

    /// YAML parsing error
    #[error("YAML parsing error: {0}")]
    YamlParse(#[from] serde_yaml_ng::Error),

    /// JSON parsing error
    #[error("JSON parsing error: {0}")]
    JsonParse(#[from] serde_json::Error),

    /// TOML parsing error
    #[error("TOML parsing error: {0}")]
    TomlParse(#[from] toml::de::Error),

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl Error {
    /// Wrap a backend failure with the operation and identifier it hit
    pub fn remote(
        operation: &'static str,
        identifier: impl Into<String>,
        source: BackendError,
    ) -> Self {
        Self::Remote {
            operation,
            identifier: identifier.into(),
            source,
        }
    }

    /// Create an empty secret value error
    pub fn empty_secret_value(secret_id: impl Into<String>) -> Self {
        Self::EmptySecretValue {
            secret_id: secret_id.into(),
        }
    }

    /// Create an empty parameters error
    pub fn empty_parameters(base_path: impl Into<String>) -> Self {
        Self::EmptyParameters {
            base_path: base_path.into(),
        }
    }

    /// Create a config not found error
    pub fn config_not_found(path: impl Into<String>) -> Self {
        Self::ConfigNotFound { path: path.into() }
    }

    /// Create an invalid config error
    pub fn invalid_config(message: impl Into<String>) -> Self {
        Self::InvalidConfig {
            message: message.into(),
        }
    }

    /// Create an unsupported format error
    pub fn unsupported_format(format: impl Into<String>) -> Self {
        Self::UnsupportedFormat {
            format: format.into(),
        }
    }

    /// Create a watch error
    pub fn watch(message: impl Into<String>) -> Self {
        Self::Watch {
            message: message.into(),
        }
    }

    /// The backend error behind a `Remote` failure, if any
    pub fn backend(&self) -> Option<&BackendError> {
        match self {
            Self::Remote { source, .. } => Some(source),
            _ => None,
        }
    }
}

/// Classification of a remote store failure
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BackendErrorKind {
    /// The identifier does not exist
    NotFound,
    /// The store rejected a parameter, e.g. a stage label that is not attached
    InvalidParameter,
    /// Credentials were missing or lacked permission
    AccessDenied,
    /// Request was throttled
    Throttled,
    /// Anything else (network, service, decoding)
    Other,
}

impl fmt::Display for BackendErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            BackendErrorKind::NotFound => write!(f, "not found"),
            BackendErrorKind::InvalidParameter => write!(f, "invalid parameter"),
            BackendErrorKind::AccessDenied => write!(f, "access denied"),
            BackendErrorKind::Throttled => write!(f, "throttled"),
            BackendErrorKind::Other => write!(f, "error"),
        }
    }
}

/// Error reported by a remote store client
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("{kind}: {message}")]
pub struct BackendError {
    pub kind: BackendErrorKind,
    pub message: String,
}

impl BackendError {
    pub fn new(kind: BackendErrorKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
        }
    }

    pub fn not_found(message: impl Into<String>) -> Self {
        Self::new(BackendErrorKind::NotFound, message)
    }

    pub fn invalid_parameter(message: impl Into<String>) -> Self {
        Self::new(BackendErrorKind::InvalidParameter, message)
    }

    pub fn other(message: impl Into<String>) -> Self {
        Self::new(BackendErrorKind::Other, message)
    }

    pub fn is_invalid_parameter(&self) -> bool {
        self.kind == BackendErrorKind::InvalidParameter
    }
}
