//! Version information for the huginn CLI

use serde::Serialize;

/// Sources this build can follow
const SOURCES: &[&str] = &["aws-secrets", "aws-parameterstore", "file"];

#[derive(Debug, Clone, Serialize)]
pub struct VersionInfo {
    pub version: String,

    /// Minimum supported Rust version
    pub rust_version: String,

    pub repository: String,

    pub sources: Vec<String>,
}

impl VersionInfo {
    pub fn current() -> Self {
        Self {
            version: env!("CARGO_PKG_VERSION").to_string(),
            rust_version: env!("CARGO_PKG_RUST_VERSION").to_string(),
            repository: option_env!("CARGO_PKG_REPOSITORY")
                .unwrap_or_default()
                .to_string(),
            sources: SOURCES.iter().map(|s| s.to_string()).collect(),
        }
    }
}

impl std::fmt::Display for VersionInfo {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "huginn {}", self.version)
    }
}
