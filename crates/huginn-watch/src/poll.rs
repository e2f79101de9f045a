//! Poll-watch loop
//!
//! One tokio task per source. Every interval the source is fetched and the
//! snapshot compared with the tracker's memory; only changed snapshots are
//! encoded and pushed. The result channel holds a single payload, so a slow
//! consumer holds the loop back instead of letting payloads pile up.

use huginn_core::{ChangeTracker, WatchSource};
use std::sync::Arc;
use tokio::sync::{mpsc, oneshot};
use tokio::task::JoinHandle;
use tokio::time::{self, Instant, MissedTickBehavior};
use tracing::{debug, error, info};

/// Encoded snapshot pushed to the consumer
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RemoteResponse {
    pub value: Vec<u8>,
}

/// Control handle of a running watch loop
///
/// Dropping the handle stops the loop at its next tick boundary.
#[derive(Debug)]
pub struct WatchHandle {
    quit: Option<oneshot::Sender<()>>,
    task: JoinHandle<()>,
}

impl WatchHandle {
    /// Signal the loop and wait for it to exit
    ///
    /// An in-flight fetch or send finishes first.
    pub async fn stop(mut self) {
        if let Some(quit) = self.quit.take() {
            let _ = quit.send(());
        }
        if let Err(e) = (&mut self.task).await {
            error!("Watch task failed: {}", e);
        }
    }

    /// Wait for the loop to exit on its own, e.g. after the receiver is
    /// dropped
    pub async fn wait(mut self) {
        if let Err(e) = (&mut self.task).await {
            error!("Watch task failed: {}", e);
        }
    }

    pub fn is_finished(&self) -> bool {
        self.task.is_finished()
    }
}

/// Start polling `source`
///
/// `tracker` should already be seeded with the snapshot the caller loaded at
/// startup; an unseeded tracker reports the first poll as a change.
pub fn watch<S: WatchSource>(
    source: Arc<S>,
    tracker: S::Tracker,
) -> (mpsc::Receiver<RemoteResponse>, WatchHandle) {
    let (tx, rx) = mpsc::channel(1);
    let (quit_tx, quit_rx) = oneshot::channel();

    let task = tokio::spawn(run(source, tracker, tx, quit_rx));

    (
        rx,
        WatchHandle {
            quit: Some(quit_tx),
            task,
        },
    )
}

async fn run<S: WatchSource>(
    source: Arc<S>,
    mut tracker: S::Tracker,
    tx: mpsc::Sender<RemoteResponse>,
    mut quit: oneshot::Receiver<()>,
) {
    let name = source.name();
    let period = source.watch_interval();

    let mut ticker = time::interval_at(Instant::now() + period, period);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);

    info!("Watching {} every {:?}", name, period);

    loop {
        tokio::select! {
            biased;
            _ = &mut quit => {
                debug!("Stop requested for {}", name);
                break;
            }
            _ = ticker.tick() => {}
        }

        let snapshot = match source.fetch().await {
            Ok(snapshot) => snapshot,
            Err(e) => {
                error!("Failed to fetch {}: {}", name, e);
                continue;
            }
        };

        let Some(changes) = tracker.observe(&snapshot) else {
            continue;
        };

        let value = match source.encode(&snapshot) {
            Ok(value) => value,
            Err(e) => {
                error!("Failed to encode {}: {}", name, e);
                continue;
            }
        };

        if tx.send(RemoteResponse { value }).await.is_err() {
            debug!("Receiver for {} dropped", name);
            break;
        }

        source.notify(&snapshot, &changes);
    }

    info!("Stopped watching {}", name);
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use huginn_core::{Error, Result, SecretSnapshot, SecretVersionTracker};
    use std::collections::VecDeque;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Mutex;
    use std::time::Duration;

    /// Replays a scripted sequence of versions, then fails forever
    struct Scripted {
        script: Mutex<VecDeque<Option<&'static str>>>,
        fetches: AtomicUsize,
        notified: AtomicUsize,
    }

    impl Scripted {
        fn new(script: &[Option<&'static str>]) -> Self {
            Self {
                script: Mutex::new(script.iter().copied().collect()),
                fetches: AtomicUsize::new(0),
                notified: AtomicUsize::new(0),
            }
        }
    }

    fn snapshot(version: &str) -> SecretSnapshot {
        SecretSnapshot::new("s", format!("value: {}", version), version, None, vec![])
    }

    #[async_trait]
    impl WatchSource for Scripted {
        type Snapshot = SecretSnapshot;
        type Tracker = SecretVersionTracker;

        fn name(&self) -> String {
            "scripted".to_string()
        }

        fn watch_interval(&self) -> Duration {
            Duration::from_secs(5)
        }

        fn tracker(&self) -> SecretVersionTracker {
            SecretVersionTracker::new()
        }

        async fn fetch(&self) -> Result<SecretSnapshot> {
            self.fetches.fetch_add(1, Ordering::SeqCst);
            match self.script.lock().unwrap().pop_front() {
                Some(Some(version)) => Ok(snapshot(version)),
                _ => Err(Error::watch("scripted failure")),
            }
        }

        fn encode(&self, snapshot: &SecretSnapshot) -> Result<Vec<u8>> {
            Ok(snapshot.to_bytes())
        }

        fn notify(&self, _snapshot: &SecretSnapshot, _changes: &huginn_core::SecretChange) {
            self.notified.fetch_add(1, Ordering::SeqCst);
        }
    }

    fn seeded(source: &Scripted, version: &str) -> SecretVersionTracker {
        let mut tracker = source.tracker();
        tracker.seed(&snapshot(version));
        tracker
    }

    #[tokio::test(start_paused = true)]
    async fn test_only_changed_versions_are_emitted() {
        let source = Arc::new(Scripted::new(&[
            Some("v1"),
            None,
            Some("v2"),
            Some("v2"),
            Some("v3"),
        ]));
        let tracker = seeded(&source, "v1");

        let (mut rx, handle) = watch(Arc::clone(&source), tracker);

        assert_eq!(rx.recv().await.unwrap().value, b"value: v2");
        assert_eq!(rx.recv().await.unwrap().value, b"value: v3");

        // Later polls keep failing: no further emissions, loop keeps running
        let idle = time::timeout(Duration::from_secs(60), rx.recv()).await;
        assert!(idle.is_err());
        assert!(!handle.is_finished());
        assert!(source.fetches.load(Ordering::SeqCst) > 5);
        assert_eq!(source.notified.load(Ordering::SeqCst), 2);

        handle.stop().await;
        assert!(rx.recv().await.is_none());
    }

    #[tokio::test(start_paused = true)]
    async fn test_first_poll_waits_one_interval() {
        let source = Arc::new(Scripted::new(&[Some("v2")]));
        let (mut rx, handle) = watch(Arc::clone(&source), seeded(&source, "v1"));

        time::sleep(Duration::from_millis(4900)).await;
        assert_eq!(source.fetches.load(Ordering::SeqCst), 0);

        let started = Instant::now();
        rx.recv().await.unwrap();
        assert!(started.elapsed() <= Duration::from_millis(200));

        handle.stop().await;
    }

    #[tokio::test(start_paused = true)]
    async fn test_dropped_receiver_ends_loop() {
        let source = Arc::new(Scripted::new(&[Some("v2"), Some("v3")]));
        let (rx, handle) = watch(Arc::clone(&source), seeded(&source, "v1"));
        drop(rx);

        time::timeout(Duration::from_secs(30), handle.wait())
            .await
            .unwrap();
        assert_eq!(source.notified.load(Ordering::SeqCst), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_dropped_handle_ends_loop() {
        let source = Arc::new(Scripted::new(&[]));
        let (mut rx, handle) = watch(Arc::clone(&source), seeded(&source, "v1"));
        drop(handle);

        // Sender is released once the task exits
        let closed = time::timeout(Duration::from_secs(30), rx.recv()).await.unwrap();
        assert!(closed.is_none());
    }
}
