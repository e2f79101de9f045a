//! Parameter set diffing
//!
//! Compares the versions remembered from the previous poll with a freshly
//! fetched [`ParameterSet`]. Only version integers are compared, so a key
//! deleted and re-created between two polls shows up as updated.

use crate::types::{ChangeSet, ParameterSet};
use std::collections::HashMap;

/// Compute created, updated and deleted keys between `previous` and `current`
pub fn compute_changes(previous: &HashMap<String, i64>, current: &ParameterSet) -> ChangeSet {
    let mut changes = ChangeSet::default();

    for (key, version) in previous {
        match current.get(key) {
            Some(parameter) if parameter.version != *version => {
                changes.updated.push(key.clone());
            }
            Some(_) => {}
            None => changes.deleted.push(key.clone()),
        }
    }

    for key in current.keys() {
        changes.current.push(key.to_string());
        if !previous.contains_key(key) {
            changes.created.push(key.to_string());
        }
    }

    // HashMap iteration order is random
    changes.updated.sort();
    changes.deleted.sort();

    changes
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::Parameter;
    use proptest::prelude::*;
    use std::collections::HashSet;

    fn set(entries: &[(&str, &str, i64)]) -> ParameterSet {
        ParameterSet::new(
            "/app/",
            entries.iter().map(|(k, v, version)| Parameter {
                key: k.to_string(),
                name: format!("/app/{}", k),
                value: Some(v.to_string()),
                version: *version,
                last_modified: None,
            }),
        )
    }

    #[test]
    fn test_update_create_scenario() {
        let first = set(&[("foo", "1", 1), ("bar", "2", 1)]);
        let second = set(&[("foo", "1", 1), ("bar", "3", 2), ("baz", "x", 1)]);

        let changes = compute_changes(&first.versions(), &second);

        assert_eq!(changes.updated, vec!["bar"]);
        assert_eq!(changes.created, vec!["baz"]);
        assert!(changes.deleted.is_empty());
        assert_eq!(changes.current, vec!["bar", "baz", "foo"]);
        assert!(changes.has_changes());
    }

    #[test]
    fn test_deleted_keys() {
        let first = set(&[("foo", "1", 1), ("bar", "2", 1)]);
        let second = set(&[("foo", "1", 1)]);

        let changes = compute_changes(&first.versions(), &second);

        assert_eq!(changes.deleted, vec!["bar"]);
        assert!(changes.created.is_empty());
        assert!(changes.updated.is_empty());
        assert_eq!(changes.current, vec!["foo"]);
    }

    #[test]
    fn test_unchanged_versions_only_in_current() {
        let first = set(&[("foo", "1", 4)]);
        // Value differs but version does not: not a change
        let second = set(&[("foo", "changed", 4)]);

        let changes = compute_changes(&first.versions(), &second);

        assert!(!changes.has_changes());
        assert_eq!(changes.current, vec!["foo"]);
    }

    #[test]
    fn test_empty_previous_reports_everything_created() {
        let second = set(&[("a", "1", 1), ("b", "2", 7)]);
        let changes = compute_changes(&HashMap::new(), &second);

        assert_eq!(changes.created, vec!["a", "b"]);
        assert_eq!(changes.current, changes.created);
    }

    #[test]
    fn test_recreated_key_reported_as_update() {
        let first = set(&[("foo", "1", 1)]);
        let second = set(&[("foo", "1", 1)]);
        let mut previous = first.versions();
        // foo was deleted and re-created remotely; the store restarts at 1
        // but our memory holds 3
        previous.insert("foo".to_string(), 3);

        let changes = compute_changes(&previous, &second);

        assert_eq!(changes.updated, vec!["foo"]);
        assert!(changes.created.is_empty());
        assert!(changes.deleted.is_empty());
    }

    fn arb_versions() -> impl Strategy<Value = HashMap<String, i64>> {
        prop::collection::hash_map("[a-f]{1,2}", 1i64..4, 0..12)
    }

    proptest! {
        #[test]
        fn prop_change_set_invariants(previous in arb_versions(), next in arb_versions()) {
            let snapshot = ParameterSet::new(
                "/p/",
                next.iter().map(|(k, v)| Parameter {
                    key: k.clone(),
                    name: format!("/p/{}", k),
                    value: None,
                    version: *v,
                    last_modified: None,
                }),
            );

            let changes = compute_changes(&previous, &snapshot);

            let current: HashSet<_> = changes.current.iter().collect();
            let created: HashSet<_> = changes.created.iter().collect();
            let deleted: HashSet<_> = changes.deleted.iter().collect();

            prop_assert!(created.is_subset(&current));
            prop_assert!(created.is_disjoint(&deleted));
            prop_assert_eq!(current.len(), next.len());
            for key in &changes.deleted {
                prop_assert!(!next.contains_key(key));
                prop_assert!(previous.contains_key(key));
            }
            for key in &changes.updated {
                prop_assert!(current.contains(key));
                prop_assert_ne!(previous[key], next[key]);
            }

            // Same inputs, same output
            prop_assert_eq!(compute_changes(&previous, &snapshot), changes);
        }
    }
}
