//! # huginn-core
//!
//! Core library for Huginn providing:
//! - Snapshot types for secrets and parameter sets
//! - The parameter diff engine and per-provider change trackers
//! - The `WatchSource` seam polled by `huginn-watch`
//! - Settings types and `huginn.yaml` loading
//! - Payload formats and the shared error type

pub mod config;
pub mod diff;
pub mod error;
pub mod format;
pub mod security;
pub mod source;
pub mod tracker;
pub mod types;

pub use config::{
    AwsSettings, HuginnConfig, LocalFileSettings, ParameterStoreSettings, SecretsSettings,
};
pub use diff::compute_changes;
pub use error::{BackendError, BackendErrorKind, Error, Result};
pub use format::ConfigFormat;
pub use security::SecureString;
pub use source::WatchSource;
pub use tracker::{ChangeTracker, ParameterVersionTracker, SecretChange, SecretVersionTracker};
pub use types::{ChangeSet, Parameter, ParameterSet, SecretSnapshot, SecretVersionEntry};
