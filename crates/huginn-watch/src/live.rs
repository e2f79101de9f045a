//! Live config view
//!
//! A [`LiveConfig`] holds the most recent snapshot of a local file or a
//! remote source, deep-merged over caller defaults, and keeps it current in
//! the background. Readers never block on the backing store.

use crate::debounce::{panic_message, Debouncer, FileChange, DEFAULT_DEBOUNCE};
use crate::file::FileWatcher;
use crate::poll::{self, WatchHandle};
use huginn_core::config::{LocalFileSettings, DEFAULT_LOCAL_FILE};
use huginn_core::{ChangeTracker, ConfigFormat, Error, Result, WatchSource};
use serde::de::DeserializeOwned;
use serde_json::{Map, Value};
use std::panic::{self, AssertUnwindSafe};
use std::path::PathBuf;
use std::sync::{Arc, PoisonError, RwLock};
use std::time::Duration;
use tokio::runtime::Handle;
use tokio::sync::Mutex;
use tokio::task::JoinHandle;
use tracing::{debug, error, info, warn};

type FileCallback = Arc<dyn Fn(&FileChange) + Send + Sync>;

/// Builder for [`LiveConfig`]
pub struct LiveConfigBuilder {
    format: Option<ConfigFormat>,
    file: PathBuf,
    defaults: Value,
    on_file_change: Option<FileCallback>,
    debounce: Duration,
}

impl Default for LiveConfigBuilder {
    fn default() -> Self {
        Self {
            format: None,
            file: PathBuf::from(DEFAULT_LOCAL_FILE),
            defaults: Value::Object(Map::new()),
            on_file_change: None,
            debounce: DEFAULT_DEBOUNCE,
        }
    }
}

impl LiveConfigBuilder {
    /// Builder preloaded from a `local` settings section
    pub fn from_settings(settings: &LocalFileSettings) -> Self {
        Self {
            format: settings.format,
            file: settings.path.clone(),
            debounce: settings.debounce(),
            ..Self::default()
        }
    }

    /// Payload format; detected from the file extension, else YAML
    pub fn format(mut self, format: ConfigFormat) -> Self {
        self.format = Some(format);
        self
    }

    pub fn file(mut self, path: impl Into<PathBuf>) -> Self {
        self.file = path.into();
        self
    }

    /// Values every loaded snapshot is merged over
    pub fn defaults(mut self, defaults: Value) -> Self {
        merge(&mut self.defaults, defaults);
        self
    }

    /// Default for a single dotted key, e.g. `server.port`
    pub fn default_value(mut self, key: &str, value: impl Into<Value>) -> Self {
        let nested = key
            .split('.')
            .rev()
            .fold(value.into(), |inner, segment| {
                let mut map = Map::new();
                map.insert(segment.to_string(), inner);
                Value::Object(map)
            });
        merge(&mut self.defaults, nested);
        self
    }

    /// Called after each debounced file change has been applied
    pub fn on_file_change(mut self, callback: impl Fn(&FileChange) + Send + Sync + 'static) -> Self {
        self.on_file_change = Some(Arc::new(callback));
        self
    }

    pub fn debounce(mut self, wait: Duration) -> Self {
        self.debounce = wait;
        self
    }

    fn resolved_format(&self) -> ConfigFormat {
        self.format
            .or_else(|| ConfigFormat::from_path(&self.file))
            .unwrap_or_default()
    }

    /// Load the local file and watch it
    ///
    /// A missing or unparsable file at startup is an error. Later parse
    /// failures keep the previous view.
    pub async fn open_file(self) -> Result<LiveConfig> {
        let format = self.resolved_format();
        let bytes = tokio::fs::read(&self.file).await?;

        let state = Arc::new(ViewState::new(self.defaults, format));
        state.apply(&bytes)?;

        let runtime = Handle::try_current()
            .map_err(|e| Error::watch(format!("file watching requires a tokio runtime: {}", e)))?;
        let reload = Arc::new(FileReload {
            path: self.file.clone(),
            state: Arc::clone(&state),
            callback: self.on_file_change,
            running: Mutex::new(()),
        });
        let debouncer = Debouncer::new(self.debounce, move |change| {
            let reload = Arc::clone(&reload);
            let change = change.clone();
            runtime.spawn(async move { reload.run(change).await });
        })?;

        let watcher = FileWatcher::watch(&self.file, debouncer.clone())?;
        let origin = format!("file:{}", self.file.display());
        info!("Loaded {} ({})", origin, format);

        Ok(LiveConfig {
            origin,
            state,
            watching: Mutex::new(Some(Watching::File {
                _watcher: watcher,
                debouncer,
            })),
        })
    }

    /// Load `source` once and keep polling it
    ///
    /// The initial fetch is an error when it fails. Sources with a fixed
    /// payload format (parameter sets are JSON) override the builder's.
    pub async fn open_remote<S: WatchSource>(self, source: S) -> Result<LiveConfig> {
        let source = Arc::new(source);
        let origin = source.name();
        let format = source
            .payload_format()
            .unwrap_or_else(|| self.resolved_format());

        let initial = source.fetch().await?;
        let mut tracker = source.tracker();
        tracker.seed(&initial);

        let state = Arc::new(ViewState::new(self.defaults, format));
        state.apply(&source.encode(&initial)?)?;
        info!("Loaded {} ({})", origin, format);

        let (mut rx, handle) = poll::watch(source, tracker);

        let consumer_state = Arc::clone(&state);
        let consumer_origin = origin.clone();
        let consumer = tokio::spawn(async move {
            while let Some(response) = rx.recv().await {
                match consumer_state.apply(&response.value) {
                    Ok(()) => debug!("Applied update from {}", consumer_origin),
                    Err(e) => warn!(
                        "Keeping previous config, update from {} failed: {}",
                        consumer_origin, e
                    ),
                }
            }
        });

        Ok(LiveConfig {
            origin,
            state,
            watching: Mutex::new(Some(Watching::Remote { handle, consumer })),
        })
    }
}

enum Watching {
    File {
        _watcher: FileWatcher,
        debouncer: Debouncer,
    },
    Remote {
        handle: WatchHandle,
        consumer: JoinHandle<()>,
    },
}

/// Re-reads the watched file and applies it to the view
struct FileReload {
    path: PathBuf,
    state: Arc<ViewState>,
    callback: Option<FileCallback>,
    // Reloads apply in the order they were triggered
    running: Mutex<()>,
}

impl FileReload {
    async fn run(&self, change: FileChange) {
        let _running = self.running.lock().await;

        match tokio::fs::read(&self.path)
            .await
            .map_err(Error::from)
            .and_then(|bytes| self.state.apply(&bytes))
        {
            Ok(()) => info!("Reloaded {}", self.path.display()),
            Err(e) => warn!(
                "Keeping previous config, reload of {} failed: {}",
                self.path.display(),
                e
            ),
        }

        if let Some(callback) = &self.callback {
            if let Err(panic) = panic::catch_unwind(AssertUnwindSafe(|| callback(&change))) {
                error!(
                    "File change callback panicked for {}: {}",
                    change.path.display(),
                    panic_message(&*panic)
                );
            }
        }
    }
}

struct ViewState {
    defaults: Value,
    format: ConfigFormat,
    view: RwLock<Value>,
}

impl ViewState {
    fn new(defaults: Value, format: ConfigFormat) -> Self {
        Self {
            view: RwLock::new(defaults.clone()),
            defaults,
            format,
        }
    }

    /// Parse and swap in a new view; on error the old view stays
    fn apply(&self, bytes: &[u8]) -> Result<()> {
        let loaded = self.format.parse(bytes)?;
        let mut merged = self.defaults.clone();
        merge(&mut merged, loaded);

        *self.view.write().unwrap_or_else(PoisonError::into_inner) = merged;
        Ok(())
    }

    fn read<R>(&self, f: impl FnOnce(&Value) -> R) -> R {
        f(&self.view.read().unwrap_or_else(PoisonError::into_inner))
    }
}

/// The current config, kept in sync with its backing store
pub struct LiveConfig {
    origin: String,
    state: Arc<ViewState>,
    watching: Mutex<Option<Watching>>,
}

impl LiveConfig {
    pub fn builder() -> LiveConfigBuilder {
        LiveConfigBuilder::default()
    }

    /// Where the view comes from, e.g. `file:./app.yaml`
    pub fn origin(&self) -> &str {
        &self.origin
    }

    pub fn format(&self) -> ConfigFormat {
        self.state.format
    }

    /// Value at a dotted key path, deserialized into `T`
    ///
    /// Returns `None` when the key is missing or has a different shape.
    pub fn get<T: DeserializeOwned>(&self, key: &str) -> Option<T> {
        self.state
            .read(|view| lookup(view, key).cloned())
            .and_then(|value| serde_json::from_value(value).ok())
    }

    /// Scalar at `key` rendered as a string
    pub fn get_string(&self, key: &str) -> Option<String> {
        self.state.read(|view| match lookup(view, key)? {
            Value::String(s) => Some(s.clone()),
            Value::Number(n) => Some(n.to_string()),
            Value::Bool(b) => Some(b.to_string()),
            _ => None,
        })
    }

    pub fn contains(&self, key: &str) -> bool {
        self.state.read(|view| lookup(view, key).is_some())
    }

    /// Deserialize the whole view
    pub fn decode<T: DeserializeOwned>(&self) -> Result<T> {
        let snapshot = self.snapshot();
        Ok(serde_json::from_value(snapshot)?)
    }

    /// Copy of the current view
    pub fn snapshot(&self) -> Value {
        self.state.read(Value::clone)
    }

    /// Whether background watching is still active
    pub async fn is_watching(&self) -> bool {
        self.watching.lock().await.is_some()
    }

    /// Stop background updates; the last view stays readable
    pub async fn stop(&self) {
        let Some(watching) = self.watching.lock().await.take() else {
            return;
        };

        match watching {
            Watching::File { debouncer, .. } => debouncer.cancel(),
            Watching::Remote { handle, consumer } => {
                handle.stop().await;
                if let Err(e) = consumer.await {
                    warn!("Config consumer for {} failed: {}", self.origin, e);
                }
            }
        }

        info!("Stopped watching {}", self.origin);
    }
}

impl std::fmt::Debug for LiveConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LiveConfig")
            .field("origin", &self.origin)
            .field("format", &self.state.format)
            .finish_non_exhaustive()
    }
}

fn lookup<'a>(view: &'a Value, key: &str) -> Option<&'a Value> {
    if key.is_empty() {
        return Some(view);
    }
    key.split('.')
        .try_fold(view, |node, segment| node.as_object()?.get(segment))
}

/// Merge `overlay` into `base`; objects merge key by key, anything else
/// replaces
fn merge(base: &mut Value, overlay: Value) {
    match (base, overlay) {
        (Value::Object(base), Value::Object(overlay)) => {
            for (key, value) in overlay {
                match base.get_mut(&key) {
                    Some(existing) => merge(existing, value),
                    None => {
                        base.insert(key, value);
                    }
                }
            }
        }
        (base, overlay) => *base = overlay,
    }
}
