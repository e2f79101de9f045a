//! Secret snapshots and version history entries

use crate::security::SecureString;
use chrono::{DateTime, Utc};

/// Stage label the store keeps on the live version
pub const STAGE_CURRENT: &str = "AWSCURRENT";

/// Stage label the store keeps on the version replaced by the live one
pub const STAGE_PREVIOUS: &str = "AWSPREVIOUS";

/// Format of the per-version label derived from a creation timestamp
const STAMP_FORMAT: &str = "v%Y.%m%d.%H%M%S";

/// Sortable, second-precision label for a version created at `created_at`
///
/// `2024-03-15T09:30:00Z` becomes `v2024.0315.093000`.
pub fn stamp_label(created_at: &DateTime<Utc>) -> String {
    created_at.format(STAMP_FORMAT).to_string()
}

/// Whether the label is one of the two labels rotation never touches
pub fn is_live_stage(label: &str) -> bool {
    label == STAGE_CURRENT || label == STAGE_PREVIOUS
}

/// A secret value as fetched from the store, immutable once built
#[derive(Debug, Clone)]
pub struct SecretSnapshot {
    secret_id: String,
    value: SecureString,
    version_id: String,
    created_at: Option<DateTime<Utc>>,
    version_stages: Vec<String>,
}

impl SecretSnapshot {
    pub fn new(
        secret_id: impl Into<String>,
        value: impl Into<SecureString>,
        version_id: impl Into<String>,
        created_at: Option<DateTime<Utc>>,
        version_stages: Vec<String>,
    ) -> Self {
        Self {
            secret_id: secret_id.into(),
            value: value.into(),
            version_id: version_id.into(),
            created_at,
            version_stages,
        }
    }

    pub fn secret_id(&self) -> &str {
        &self.secret_id
    }

    pub fn value(&self) -> &SecureString {
        &self.value
    }

    pub fn version_id(&self) -> &str {
        &self.version_id
    }

    pub fn created_at(&self) -> Option<&DateTime<Utc>> {
        self.created_at.as_ref()
    }

    pub fn version_stages(&self) -> &[String] {
        &self.version_stages
    }

    pub fn has_stage(&self, label: &str) -> bool {
        self.version_stages.iter().any(|s| s == label)
    }

    /// Timestamp label this version should carry, if the store reported a
    /// creation date
    pub fn stamp_label(&self) -> Option<String> {
        self.created_at.as_ref().map(stamp_label)
    }

    /// Raw secret text, the payload handed to the config view
    pub fn to_bytes(&self) -> Vec<u8> {
        self.value.as_bytes().to_vec()
    }
}

/// One entry of a secret's version history
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SecretVersionEntry {
    pub version_id: String,
    pub created_at: Option<DateTime<Utc>>,
    pub stages: Vec<String>,
}

impl SecretVersionEntry {
    pub fn new(
        version_id: impl Into<String>,
        created_at: Option<DateTime<Utc>>,
        stages: Vec<String>,
    ) -> Self {
        Self {
            version_id: version_id.into(),
            created_at,
            stages,
        }
    }

    pub fn has_stage(&self, label: &str) -> bool {
        self.stages.iter().any(|s| s == label)
    }

    /// Holds `AWSCURRENT` or `AWSPREVIOUS`
    pub fn holds_live_stage(&self) -> bool {
        self.stages.iter().any(|s| is_live_stage(s))
    }
}
