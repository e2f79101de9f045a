//! Change sets produced by comparing parameter versions

use serde::Serialize;

/// Keys of a parameter set grouped by how they changed since the last poll
///
/// Every list is sorted. `created`, `updated` and `deleted` are disjoint;
/// `created` and `updated` are subsets of `current`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ChangeSet {
    /// All keys present in the newest snapshot
    pub current: Vec<String>,
    pub created: Vec<String>,
    pub updated: Vec<String>,
    pub deleted: Vec<String>,
}

impl ChangeSet {
    /// Whether anything was created, updated or deleted
    pub fn has_changes(&self) -> bool {
        !(self.created.is_empty() && self.updated.is_empty() && self.deleted.is_empty())
    }
}
