//! Remote sources that can be polled by a watch loop

use crate::error::Result;
use crate::format::ConfigFormat;
use crate::tracker::ChangeTracker;
use async_trait::async_trait;
use std::time::Duration;

/// A remote snapshot source polled on a fixed interval
///
/// Implemented by the secrets and parameter-store providers. The watch loop
/// owns the tracker; the source itself stays stateless between polls.
#[async_trait]
pub trait WatchSource: Send + Sync + 'static {
    type Snapshot: Send + Sync + 'static;
    type Tracker: ChangeTracker<Snapshot = Self::Snapshot>;

    /// Identifier used in logs, e.g. `aws-secrets:/app/prod/db`
    fn name(&self) -> String;

    /// Delay between two poll cycles
    fn watch_interval(&self) -> Duration;

    /// Fresh, unseeded tracker for this source's snapshots
    fn tracker(&self) -> Self::Tracker;

    /// Payload format the source emits, or `None` to use the caller's
    fn payload_format(&self) -> Option<ConfigFormat> {
        None
    }

    /// Fetch a complete snapshot from the remote store
    async fn fetch(&self) -> Result<Self::Snapshot>;

    /// Serialize a snapshot into the payload pushed to the config view
    fn encode(&self, snapshot: &Self::Snapshot) -> Result<Vec<u8>>;

    /// Called after a changed snapshot has been delivered
    fn notify(
        &self,
        _snapshot: &Self::Snapshot,
        _changes: &<Self::Tracker as ChangeTracker>::Changes,
    ) {
    }
}
