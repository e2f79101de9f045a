//! Per-path debouncing of file notifications
//!
//! Editors often emit several events for one save (truncate, write, chmod,
//! rename). Each notification re-arms a timer for its path; the callback
//! runs once the path has been quiet for the whole window, with the last
//! notification received.

use huginn_core::{Error, Result};
use notify::EventKind;
use std::any::Any;
use std::collections::HashMap;
use std::panic::{self, AssertUnwindSafe};
use std::path::PathBuf;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;
use tokio::runtime::Handle;
use tokio::task::JoinHandle;
use tracing::{debug, error};

/// Default quiet window
pub const DEFAULT_DEBOUNCE: Duration = Duration::from_millis(200);

/// A file-system notification for a watched path
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileChange {
    pub path: PathBuf,
    pub kind: EventKind,
}

impl FileChange {
    pub fn new(path: impl Into<PathBuf>, kind: EventKind) -> Self {
        Self {
            path: path.into(),
            kind,
        }
    }
}

type Callback = dyn Fn(&FileChange) + Send + Sync;

struct PendingTimer {
    generation: u64,
    task: JoinHandle<()>,
}

struct Inner {
    wait: Duration,
    callback: Box<Callback>,
    pending: Mutex<HashMap<PathBuf, PendingTimer>>,
    generation: AtomicU64,
    runtime: Handle,
}

/// Coalesces bursts of notifications per path
///
/// Cheap to clone; clones share the timer map. Timers run on the tokio
/// runtime that was current when the debouncer was created, so `notify` may
/// be called from any thread.
#[derive(Clone)]
pub struct Debouncer {
    inner: Arc<Inner>,
}

impl Debouncer {
    /// Must be called from within a tokio runtime
    pub fn new(
        wait: Duration,
        on_stable_change: impl Fn(&FileChange) + Send + Sync + 'static,
    ) -> Result<Self> {
        let runtime = Handle::try_current()
            .map_err(|e| Error::watch(format!("debouncer requires a tokio runtime: {}", e)))?;

        Ok(Self {
            inner: Arc::new(Inner {
                wait,
                callback: Box::new(on_stable_change),
                pending: Mutex::new(HashMap::new()),
                generation: AtomicU64::new(0),
                runtime,
            }),
        })
    }

    pub fn wait(&self) -> Duration {
        self.inner.wait
    }

    /// Record a notification, restarting the quiet window for its path
    pub fn notify(&self, change: FileChange) {
        let generation = self.inner.generation.fetch_add(1, Ordering::Relaxed) + 1;

        // Held until the new timer is registered so it cannot fire first
        let mut pending = self.inner.lock_pending();

        if let Some(previous) = pending.remove(&change.path) {
            previous.task.abort();
        }

        let path = change.path.clone();
        let inner = Arc::clone(&self.inner);
        let task = self.inner.runtime.spawn(async move {
            tokio::time::sleep(inner.wait).await;
            inner.fire(change, generation);
        });

        pending.insert(path, PendingTimer { generation, task });
    }

    /// Number of paths with an armed timer
    pub fn pending(&self) -> usize {
        self.inner.lock_pending().len()
    }

    /// Drop every armed timer without firing it
    pub fn cancel(&self) {
        let mut pending = self.inner.lock_pending();
        for (_, timer) in pending.drain() {
            timer.task.abort();
        }
    }
}

impl Inner {
    fn lock_pending(&self) -> MutexGuard<'_, HashMap<PathBuf, PendingTimer>> {
        self.pending.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn fire(&self, change: FileChange, generation: u64) {
        {
            let mut pending = self.lock_pending();
            match pending.get(&change.path) {
                Some(timer) if timer.generation == generation => {
                    pending.remove(&change.path);
                }
                // Superseded by a later notification
                _ => return,
            }
        }

        debug!("Stable change on {}", change.path.display());

        if let Err(panic) = panic::catch_unwind(AssertUnwindSafe(|| (self.callback)(&change))) {
            error!(
                "File change callback panicked for {}: {}",
                change.path.display(),
                panic_message(&*panic)
            );
        }
    }
}

pub(crate) fn panic_message(panic: &(dyn Any + Send)) -> &str {
    panic
        .downcast_ref::<&str>()
        .copied()
        .or_else(|| panic.downcast_ref::<String>().map(String::as_str))
        .unwrap_or("non-string panic payload")
}

impl std::fmt::Debug for Debouncer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Debouncer")
            .field("wait", &self.inner.wait)
            .field("pending", &self.pending())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use notify::event::{CreateKind, ModifyKind};
    use tokio::time::{sleep, Instant};

    type Fired = Arc<Mutex<Vec<(FileChange, Instant)>>>;

    fn recording(wait: Duration) -> (Debouncer, Fired) {
        let fired: Fired = Arc::default();
        let sink = Arc::clone(&fired);
        let debouncer = Debouncer::new(wait, move |change| {
            sink.lock().unwrap().push((change.clone(), Instant::now()));
        })
        .unwrap();
        (debouncer, fired)
    }

    fn created(path: &str) -> FileChange {
        FileChange::new(path, EventKind::Create(CreateKind::File))
    }

    fn modified(path: &str) -> FileChange {
        FileChange::new(path, EventKind::Modify(ModifyKind::Any))
    }

    #[tokio::test(start_paused = true)]
    async fn test_burst_fires_once_with_last_payload() {
        let (debouncer, fired) = recording(Duration::from_millis(200));

        for _ in 0..4 {
            debouncer.notify(created("/a"));
            sleep(Duration::from_millis(10)).await;
        }
        debouncer.notify(modified("/a"));
        let last = Instant::now();

        sleep(Duration::from_millis(500)).await;

        let fired = fired.lock().unwrap();
        assert_eq!(fired.len(), 1);
        assert_eq!(fired[0].0, modified("/a"));
        assert!(fired[0].1.duration_since(last) >= Duration::from_millis(200));
        assert_eq!(debouncer.pending(), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_paths_do_not_coalesce() {
        let (debouncer, fired) = recording(Duration::from_millis(200));

        for _ in 0..3 {
            debouncer.notify(modified("/a"));
            debouncer.notify(modified("/b"));
            sleep(Duration::from_millis(10)).await;
        }
        sleep(Duration::from_millis(300)).await;

        let mut paths: Vec<_> = fired
            .lock()
            .unwrap()
            .iter()
            .map(|(c, _)| c.path.clone())
            .collect();
        paths.sort();
        assert_eq!(paths, vec![PathBuf::from("/a"), PathBuf::from("/b")]);
    }

    #[tokio::test(start_paused = true)]
    async fn test_separate_bursts_fire_separately() {
        let (debouncer, fired) = recording(DEFAULT_DEBOUNCE);

        debouncer.notify(modified("/a"));
        sleep(Duration::from_millis(300)).await;
        debouncer.notify(modified("/a"));
        sleep(Duration::from_millis(300)).await;

        assert_eq!(fired.lock().unwrap().len(), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn test_panicking_callback_is_contained() {
        let calls = Arc::new(AtomicU64::new(0));
        let counter = Arc::clone(&calls);
        let debouncer = Debouncer::new(Duration::from_millis(50), move |change| {
            counter.fetch_add(1, Ordering::SeqCst);
            if change.path == PathBuf::from("/boom") {
                panic!("callback failure");
            }
        })
        .unwrap();

        debouncer.notify(modified("/boom"));
        sleep(Duration::from_millis(100)).await;
        debouncer.notify(modified("/fine"));
        sleep(Duration::from_millis(100)).await;

        assert_eq!(calls.load(Ordering::SeqCst), 2);
        assert_eq!(debouncer.pending(), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_cancel_drops_armed_timers() {
        let (debouncer, fired) = recording(Duration::from_millis(100));

        debouncer.notify(modified("/a"));
        assert_eq!(debouncer.pending(), 1);
        debouncer.cancel();
        sleep(Duration::from_millis(300)).await;

        assert!(fired.lock().unwrap().is_empty());
    }

    #[test]
    fn test_requires_runtime() {
        assert!(matches!(
            Debouncer::new(DEFAULT_DEBOUNCE, |_| {}),
            Err(Error::Watch { .. })
        ));
    }
}
