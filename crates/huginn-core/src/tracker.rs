//! Per-provider memory of the last observed remote state
//!
//! A tracker is owned by exactly one watch loop. It is replaced wholesale on
//! every successful poll and never touched when a fetch fails.

use crate::diff::compute_changes;
use crate::types::{ChangeSet, ParameterSet, SecretSnapshot};
use std::collections::HashMap;

/// Remembers the last observed snapshot and reports when a new one differs
pub trait ChangeTracker: Send + 'static {
    type Snapshot;
    type Changes: Send + 'static;

    /// Record `snapshot` as the known state without reporting anything
    fn seed(&mut self, snapshot: &Self::Snapshot);

    /// Replace the known state with `snapshot`, returning the changes if it
    /// differs from what was remembered
    fn observe(&mut self, snapshot: &Self::Snapshot) -> Option<Self::Changes>;
}

/// Version transition of a watched secret
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SecretChange {
    pub previous_version: Option<String>,
    pub version_id: String,
}

/// Compares secret version identifiers
#[derive(Debug, Default)]
pub struct SecretVersionTracker {
    version_id: Option<String>,
}

impl SecretVersionTracker {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn version_id(&self) -> Option<&str> {
        self.version_id.as_deref()
    }
}

impl ChangeTracker for SecretVersionTracker {
    type Snapshot = SecretSnapshot;
    type Changes = SecretChange;

    fn seed(&mut self, snapshot: &SecretSnapshot) {
        self.version_id = Some(snapshot.version_id().to_string());
    }

    fn observe(&mut self, snapshot: &SecretSnapshot) -> Option<SecretChange> {
        if self.version_id.as_deref() == Some(snapshot.version_id()) {
            return None;
        }

        let previous_version = self.version_id.replace(snapshot.version_id().to_string());
        Some(SecretChange {
            previous_version,
            version_id: snapshot.version_id().to_string(),
        })
    }
}

/// Diffs parameter versions key by key
#[derive(Debug, Default)]
pub struct ParameterVersionTracker {
    versions: HashMap<String, i64>,
}

impl ParameterVersionTracker {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn versions(&self) -> &HashMap<String, i64> {
        &self.versions
    }
}

impl ChangeTracker for ParameterVersionTracker {
    type Snapshot = ParameterSet;
    type Changes = ChangeSet;

    fn seed(&mut self, snapshot: &ParameterSet) {
        self.versions = snapshot.versions();
    }

    fn observe(&mut self, snapshot: &ParameterSet) -> Option<ChangeSet> {
        let changes = compute_changes(&self.versions, snapshot);
        self.versions = snapshot.versions();

        changes.has_changes().then_some(changes)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::Parameter;

    fn secret(version: &str) -> SecretSnapshot {
        SecretSnapshot::new("/app/test", "a: 1", version, None, vec![])
    }

    fn params(entries: &[(&str, i64)]) -> ParameterSet {
        ParameterSet::new(
            "/app/",
            entries.iter().map(|(k, v)| Parameter {
                key: k.to_string(),
                name: format!("/app/{}", k),
                value: Some("x".to_string()),
                version: *v,
                last_modified: None,
            }),
        )
    }

    #[test]
    fn test_secret_tracker_only_reports_new_versions() {
        let mut tracker = SecretVersionTracker::new();
        tracker.seed(&secret("v1"));

        assert_eq!(tracker.observe(&secret("v1")), None);

        let change = tracker.observe(&secret("v2")).unwrap();
        assert_eq!(change.previous_version.as_deref(), Some("v1"));
        assert_eq!(change.version_id, "v2");
        assert_eq!(tracker.version_id(), Some("v2"));

        assert_eq!(tracker.observe(&secret("v2")), None);
    }

    #[test]
    fn test_unseeded_secret_tracker_reports_first_observation() {
        let mut tracker = SecretVersionTracker::new();
        let change = tracker.observe(&secret("v1")).unwrap();
        assert_eq!(change.previous_version, None);
    }

    #[test]
    fn test_parameter_tracker_replaces_state_wholesale() {
        let mut tracker = ParameterVersionTracker::new();
        tracker.seed(&params(&[("a", 1), ("b", 1)]));

        assert!(tracker.observe(&params(&[("a", 1), ("b", 1)])).is_none());

        let changes = tracker.observe(&params(&[("a", 2)])).unwrap();
        assert_eq!(changes.updated, vec!["a"]);
        assert_eq!(changes.deleted, vec!["b"]);

        // b is forgotten, not merged
        assert_eq!(tracker.versions().len(), 1);
        let changes = tracker.observe(&params(&[("a", 2), ("b", 1)])).unwrap();
        assert_eq!(changes.created, vec!["b"]);
    }
}
