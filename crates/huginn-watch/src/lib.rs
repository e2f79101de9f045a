//! # huginn-watch
//!
//! Keeps a config view in sync with its backing store:
//! - [`watch`]: the poll-watch loop driving a [`huginn_core::WatchSource`]
//! - [`Debouncer`] and [`FileWatcher`]: coalesced local file notifications
//! - [`LiveConfig`]: the merged, always-current view callers read from

pub mod debounce;
pub mod file;
pub mod live;
pub mod poll;

pub use debounce::{Debouncer, FileChange, DEFAULT_DEBOUNCE};
pub use file::FileWatcher;
pub use live::{LiveConfig, LiveConfigBuilder};
pub use poll::{watch, RemoteResponse, WatchHandle};
