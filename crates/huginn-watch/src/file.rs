//! Local config file watching

use crate::debounce::{Debouncer, FileChange};
use huginn_core::{Error, Result};
use notify::{Event, EventKind, RecommendedWatcher, RecursiveMode, Watcher};
use std::path::{Path, PathBuf};
use tracing::{debug, warn};

/// Watches one file and feeds its create/modify/remove events to a
/// [`Debouncer`]
///
/// The parent directory is watched rather than the file itself, so saves
/// that replace the file through a rename keep being seen. Dropping the
/// watcher stops watching.
pub struct FileWatcher {
    path: PathBuf,
    _watcher: RecommendedWatcher,
}

impl FileWatcher {
    pub fn watch(path: impl AsRef<Path>, debouncer: Debouncer) -> Result<Self> {
        let path = resolve(path.as_ref())?;
        let parent = path
            .parent()
            .ok_or_else(|| Error::watch(format!("{} has no parent directory", path.display())))?
            .to_path_buf();

        let target = path.clone();
        let mut watcher = notify::recommended_watcher(move |res: notify::Result<Event>| match res {
            Ok(event) => {
                if !matches!(
                    event.kind,
                    EventKind::Create(_) | EventKind::Modify(_) | EventKind::Remove(_)
                ) {
                    return;
                }
                if event.paths.iter().any(|p| p == &target) {
                    debouncer.notify(FileChange::new(target.clone(), event.kind));
                }
            }
            Err(e) => warn!("Watch error on {}: {}", target.display(), e),
        })
        .map_err(|e| Error::watch(format!("failed to create file watcher: {}", e)))?;

        watcher
            .watch(&parent, RecursiveMode::NonRecursive)
            .map_err(|e| Error::watch(format!("failed to watch {}: {}", parent.display(), e)))?;

        debug!("Watching {} for changes", path.display());

        Ok(Self {
            path,
            _watcher: watcher,
        })
    }

    /// Absolute path of the watched file
    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl std::fmt::Debug for FileWatcher {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FileWatcher")
            .field("path", &self.path)
            .finish_non_exhaustive()
    }
}

/// Absolute path with the parent directory canonicalized, matching the paths
/// the OS reports in events
fn resolve(path: &Path) -> Result<PathBuf> {
    let absolute = std::path::absolute(path)?;
    let file_name = absolute
        .file_name()
        .ok_or_else(|| Error::watch(format!("{} does not name a file", path.display())))?
        .to_owned();

    let parent = match absolute.parent() {
        Some(parent) => parent.canonicalize()?,
        None => return Err(Error::watch(format!("{} has no parent directory", path.display()))),
    };

    Ok(parent.join(file_name))
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_resolve_relative_to_canonical_parent() {
        let dir = TempDir::new().unwrap();
        let nested = dir.path().join("sub");
        std::fs::create_dir(&nested).unwrap();

        let resolved = resolve(&nested.join("..").join("sub").join("app.yaml")).unwrap();

        assert_eq!(
            resolved,
            nested.canonicalize().unwrap().join("app.yaml")
        );
    }

    #[test]
    fn test_resolve_missing_parent_fails() {
        let dir = TempDir::new().unwrap();
        assert!(resolve(&dir.path().join("missing").join("app.yaml")).is_err());
    }
}
