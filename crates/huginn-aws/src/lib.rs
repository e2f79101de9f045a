//! # huginn-aws
//!
//! AWS-backed remote sources for Huginn:
//! - [`SecretsProvider`]: a single Secrets Manager secret, with optional
//!   timestamp stage labelling and pruning of old labels
//! - [`ParameterStoreProvider`]: every SSM parameter under a base path
//!
//! Both implement [`huginn_core::WatchSource`]. The AWS calls go through the
//! [`SecretsClient`] and [`ParameterClient`] traits so they can be replaced
//! in tests.

pub mod client;
pub mod parameters;
pub mod sdk;
pub mod secrets;

pub use client::{
    ParameterClient, ParameterPage, RawParameter, SecretValue, SecretVersionPage, SecretsClient,
};
pub use parameters::ParameterStoreProvider;
pub use sdk::{load_sdk_config, AwsParameterClient, AwsSecretsClient};
pub use secrets::{RotationReport, SecretsProvider, StageMove, StageRotator};
