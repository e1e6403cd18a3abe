use std::collections::{BTreeMap, BTreeSet};
use std::fmt;
use std::io;

use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;
use thiserror::Error;
use tracing::warn;

use crate::util::hash::ContentHash;

/// Which ecosystem a persisted entry belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum StateKey {
  Node,
  Python,
}

impl StateKey {
  pub fn as_str(self) -> &'static str {
    match self {
      StateKey::Node => "node",
      StateKey::Python => "python",
    }
  }
}

impl fmt::Display for StateKey {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.write_str(self.as_str())
  }
}

/// What is actually present on disk for an ecosystem.
///
/// Node records `name -> version` from each package's metadata; Python records
/// the names of the `*-info` metadata directories, which already carry versions.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum InstalledPackages {
  Versions(BTreeMap<String, String>),
  Names(BTreeSet<String>),
}

impl InstalledPackages {
  pub fn len(&self) -> usize {
    match self {
      InstalledPackages::Versions(map) => map.len(),
      InstalledPackages::Names(set) => set.len(),
    }
  }

  pub fn is_empty(&self) -> bool {
    self.len() == 0
  }
}

/// Fingerprint of one ecosystem's dependency state.
///
/// Two states are equal only if all three fields match; that comparison is
/// the whole change-detection rule.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DependencyState {
  /// Declared dependencies, direct and development merged.
  pub dependencies: BTreeMap<String, String>,
  pub installed_packages: InstalledPackages,
  pub lockfile_hash: Option<ContentHash>,
}

/// On-disk record of the last successful install per ecosystem.
///
/// Keys this version does not know about are carried through untouched. An
/// ecosystem entry that does not parse reads as absent without affecting the
/// others, so only that ecosystem reinstalls.
#[derive(Debug, Default, Clone, PartialEq, Serialize, Deserialize)]
pub struct PersistedSnapshot {
  #[serde(default, deserialize_with = "lenient_state", skip_serializing_if = "Option::is_none")]
  pub node: Option<DependencyState>,

  #[serde(default, deserialize_with = "lenient_state", skip_serializing_if = "Option::is_none")]
  pub python: Option<DependencyState>,

  #[serde(flatten)]
  pub other: BTreeMap<String, Value>,
}

impl PersistedSnapshot {
  pub fn get(&self, key: StateKey) -> Option<&DependencyState> {
    match key {
      StateKey::Node => self.node.as_ref(),
      StateKey::Python => self.python.as_ref(),
    }
  }

  pub fn set(&mut self, key: StateKey, state: DependencyState) {
    match key {
      StateKey::Node => self.node = Some(state),
      StateKey::Python => self.python = Some(state),
    }
  }
}

fn lenient_state<'de, D>(deserializer: D) -> Result<Option<DependencyState>, D::Error>
where
  D: Deserializer<'de>,
{
  let Some(value) = Option::<Value>::deserialize(deserializer)? else {
    return Ok(None);
  };

  match serde_json::from_value(value) {
    Ok(state) => Ok(Some(state)),
    Err(e) => {
      warn!(error = %e, "discarding unreadable state entry");
      Ok(None)
    }
  }
}

#[derive(Debug, Error)]
pub enum StateError {
  #[error("failed to read state file: {0}")]
  Read(#[source] io::Error),

  #[error("failed to write state file: {0}")]
  Write(#[source] io::Error),

  #[error("failed to serialize state: {0}")]
  Serialize(#[source] serde_json::Error),

  #[error("failed to remove state file: {0}")]
  Remove(#[source] io::Error),
}
