//! Version-stage rotation
//!
//! Secrets Manager allows at most 20 stage labels per secret. When stage
//! updates are enabled, every version gets a label derived from its creation
//! time and the oldest labels are detached so the total stays under
//! `keep_stages`. `AWSCURRENT` and `AWSPREVIOUS` are never touched.
//!
//! Mutations are independent and unsynchronized between processes. A label
//! that another process already moved is rejected with an invalid-parameter
//! error, which is expected and only logged at debug level.

use crate::client::SecretsClient;
use huginn_core::types::is_live_stage;
use huginn_core::{BackendError, Error, Result, SecretSnapshot, SecretVersionEntry};
use std::collections::HashSet;
use tracing::{debug, info, warn};

/// Page size for version history listing
pub const LIST_PAGE_SIZE: i32 = 100;

/// A single label placed on or removed from a version
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StageMove {
    pub version_id: String,
    pub label: String,
}

/// Outcome of one rotation pass
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RotationReport {
    pub detached: Vec<StageMove>,
    pub attached: Option<StageMove>,
    /// Mutations the store rejected
    pub failures: usize,
}

/// Select the history entries whose labels must be detached
///
/// Nothing is excess while the history holds at most `keep_stages` entries.
/// Otherwise at most `keep_stages - 2` distinct labels other than
/// `AWSCURRENT` and `AWSPREVIOUS` may stay attached across the history.
/// Extra labels on the two live versions and the `pending` label about to be
/// attached count against that budget first; they cannot be detached here.
/// The remaining entries are ordered newest first and kept whole while their
/// labels fit; the first one that does not fit and everything older is
/// excess. Unlabelled and live entries are never selected.
///
/// Entries without a creation time have no place in that order and sort as
/// oldest, so their labels are the first to go.
pub fn excess_entries(
    mut entries: Vec<SecretVersionEntry>,
    keep_stages: usize,
    pending: Option<&str>,
) -> Vec<SecretVersionEntry> {
    if entries.len() <= keep_stages {
        return Vec::new();
    }

    let mut reserved: HashSet<String> = entries
        .iter()
        .filter(|e| e.holds_live_stage())
        .flat_map(|e| e.stages.iter())
        .filter(|s| !is_live_stage(s))
        .cloned()
        .collect();
    reserved.extend(pending.map(str::to_string));

    entries.sort_by(|a, b| b.created_at.cmp(&a.created_at));
    entries.retain(|e| !e.stages.is_empty() && !e.holds_live_stage());

    let budget = keep_stages.saturating_sub(2);
    let mut used = reserved.len();
    let mut kept = 0;

    for entry in &entries {
        let labels = entry.stages.iter().filter(|s| !reserved.contains(*s)).count();
        if used + labels > budget {
            break;
        }
        used += labels;
        kept += 1;
    }

    entries.split_off(kept)
}

/// Applies stage rotation to one secret
#[derive(Debug, Clone)]
pub struct StageRotator {
    secret_id: String,
    keep_stages: usize,
}

impl StageRotator {
    pub fn new(secret_id: impl Into<String>, keep_stages: usize) -> Self {
        Self {
            secret_id: secret_id.into(),
            keep_stages,
        }
    }

    pub fn keep_stages(&self) -> usize {
        self.keep_stages
    }

    /// Full version history, all pages
    pub async fn list_versions<C>(&self, client: &C) -> Result<Vec<SecretVersionEntry>>
    where
        C: SecretsClient + ?Sized,
    {
        let mut entries = Vec::new();
        let mut page_token = None;

        loop {
            let page = client
                .list_secret_versions(&self.secret_id, LIST_PAGE_SIZE, page_token)
                .await
                .map_err(|e| Error::remote("ListSecretVersionIds", &self.secret_id, e))?;

            entries.extend(page.entries);

            match page.next_token {
                Some(token) if !token.is_empty() => page_token = Some(token),
                _ => break,
            }
        }

        Ok(entries)
    }

    /// Detach every label of every excess history entry
    ///
    /// Returns `None` when the history is within `keep_stages` and nothing
    /// was examined. Fails only when the history cannot be listed; individual
    /// detach failures are logged and counted.
    pub async fn prune<C>(&self, client: &C) -> Result<Option<RotationReport>>
    where
        C: SecretsClient + ?Sized,
    {
        self.prune_for(client, None).await
    }

    async fn prune_for<C>(
        &self,
        client: &C,
        pending: Option<&str>,
    ) -> Result<Option<RotationReport>>
    where
        C: SecretsClient + ?Sized,
    {
        let entries = self.list_versions(client).await?;
        let total = entries.len();

        if total <= self.keep_stages {
            debug!(
                "{} has {} versions, within {}; no rotation needed",
                self.secret_id, total, self.keep_stages
            );
            return Ok(None);
        }

        let excess = excess_entries(entries, self.keep_stages, pending);
        let mut report = RotationReport::default();

        if excess.is_empty() {
            debug!("No stages to prune for {} ({} versions)", self.secret_id, total);
            return Ok(Some(report));
        }

        for entry in excess {
            for label in &entry.stages {
                match client
                    .detach_stage(&self.secret_id, &entry.version_id, label)
                    .await
                {
                    Ok(()) => {
                        info!(
                            "Detached stage {} from version {} of {}",
                            label, entry.version_id, self.secret_id
                        );
                        report.detached.push(StageMove {
                            version_id: entry.version_id.clone(),
                            label: label.clone(),
                        });
                    }
                    Err(e) => {
                        self.log_failure("detach", label, &e);
                        report.failures += 1;
                    }
                }
            }
        }

        Ok(Some(report))
    }

    /// Label `snapshot` with its creation timestamp, pruning old labels first
    ///
    /// Does nothing when the version already carries its label, the store
    /// reported no creation time, or the history is within `keep_stages`.
    /// A listing failure skips pruning but the label is still attached.
    pub async fn rotate<C>(&self, client: &C, snapshot: &SecretSnapshot) -> RotationReport
    where
        C: SecretsClient + ?Sized,
    {
        let Some(label) = snapshot.stamp_label() else {
            debug!(
                "Version {} of {} has no creation date, skipping stage update",
                snapshot.version_id(),
                self.secret_id
            );
            return RotationReport::default();
        };

        if snapshot.has_stage(&label) {
            return RotationReport::default();
        }

        let mut report = match self.prune_for(client, Some(&label)).await {
            Ok(Some(report)) => report,
            Ok(None) => return RotationReport::default(),
            Err(e) => {
                warn!("Skipping stage pruning: {}", e);
                RotationReport::default()
            }
        };

        match client
            .attach_stage(&self.secret_id, snapshot.version_id(), &label)
            .await
        {
            Ok(()) => {
                info!(
                    "Attached stage {} to version {} of {}",
                    label,
                    snapshot.version_id(),
                    self.secret_id
                );
                report.attached = Some(StageMove {
                    version_id: snapshot.version_id().to_string(),
                    label,
                });
            }
            Err(e) => {
                self.log_failure("attach", &label, &e);
                report.failures += 1;
            }
        }

        report
    }

    fn log_failure(&self, action: &str, label: &str, err: &BackendError) {
        // Another process moved the label first
        if err.is_invalid_parameter() {
            debug!(
                "Could not {} stage {} on {}: {}",
                action, label, self.secret_id, err
            );
        } else {
            warn!(
                "Failed to {} stage {} on {}: {}",
                action, label, self.secret_id, err
            );
        }
    }
}
