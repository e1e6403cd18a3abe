//! State file storage.
//!
//! The whole snapshot lives in one JSON object at `<project>/.dotrun.json`:
//!
//! ```json
//! {
//!   "node":   { "dependencies": {..}, "installed_packages": {..}, "lockfile_hash": ".." },
//!   "python": { "dependencies": {},   "installed_packages": [..], "lockfile_hash": ".." }
//! }
//! ```
//!
//! Every operation re-reads the file; nothing is cached between calls. There
//! is no cross-process locking, so concurrent invocations are last-writer-wins.

use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use tracing::{debug, warn};

use crate::consts::STATE_FILENAME;

use super::types::{DependencyState, PersistedSnapshot, StateError, StateKey};

/// Read-one/write-one access to the persisted snapshot of a project.
#[derive(Debug, Clone)]
pub struct StateStore {
  path: PathBuf,
}

impl StateStore {
  pub fn new(path: PathBuf) -> Self {
    Self { path }
  }

  /// Store at the default location inside a project directory.
  pub fn for_project(root: &Path) -> Self {
    Self::new(root.join(STATE_FILENAME))
  }

  pub fn path(&self) -> &Path {
    &self.path
  }

  /// Load the full snapshot.
  ///
  /// Returns an empty snapshot if the file doesn't exist. A file that is not
  /// a JSON object is treated the same way, so the next install overwrites
  /// it. A single malformed ecosystem entry only empties that entry.
  pub fn load(&self) -> Result<PersistedSnapshot, StateError> {
    let content = match fs::read_to_string(&self.path) {
      Ok(content) => content,
      Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(PersistedSnapshot::default()),
      Err(e) => return Err(StateError::Read(e)),
    };

    match serde_json::from_str(&content) {
      Ok(snapshot) => Ok(snapshot),
      Err(e) => {
        warn!(path = %self.path.display(), error = %e, "ignoring unreadable state file");
        Ok(PersistedSnapshot::default())
      }
    }
  }

  /// Get the persisted state for one ecosystem, if any.
  pub fn get(&self, key: StateKey) -> Result<Option<DependencyState>, StateError> {
    Ok(self.load()?.get(key).cloned())
  }

  /// Set the persisted state for one ecosystem, keeping every other entry.
  ///
  /// Uses atomic write (write to temp, then rename) so a failed write never
  /// leaves a truncated state file behind.
  pub fn set(&self, key: StateKey, state: DependencyState) -> Result<(), StateError> {
    let mut snapshot = self.load()?;
    snapshot.set(key, state);

    let content = serde_json::to_string_pretty(&snapshot).map_err(StateError::Serialize)?;
    let temp_path = self.path.with_extension("json.tmp");

    fs::write(&temp_path, content).map_err(StateError::Write)?;
    fs::rename(&temp_path, &self.path).map_err(StateError::Write)?;

    debug!(key = %key, path = %self.path.display(), "state saved");
    Ok(())
  }

  /// Delete the state file.
  ///
  /// Returns `false` if there was nothing to delete.
  pub fn remove(&self) -> Result<bool, StateError> {
    match fs::remove_file(&self.path) {
      Ok(()) => Ok(true),
      Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(false),
      Err(e) => Err(StateError::Remove(e)),
    }
  }
}
