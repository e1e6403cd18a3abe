use std::collections::BTreeMap;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use serde::Deserialize;
use thiserror::Error;

use crate::consts::PACKAGE_JSON;

#[derive(Debug, Error)]
pub enum ManifestError {
  #[error("package.json not found in {}", .0.display())]
  NotFound(PathBuf),

  #[error("failed to read {}: {source}", path.display())]
  Read {
    path: PathBuf,
    #[source]
    source: io::Error,
  },

  #[error("failed to parse {}: {source}", path.display())]
  Parse {
    path: PathBuf,
    #[source]
    source: serde_json::Error,
  },
}

/// Read-only view of `package.json`.
///
/// Only the fields the orchestrator needs are modelled; everything else in
/// the file is ignored.
#[derive(Debug, Default, Clone, PartialEq, Deserialize)]
pub struct ProjectManifest {
  /// Script name -> shell command.
  #[serde(default)]
  pub scripts: BTreeMap<String, String>,

  #[serde(default)]
  pub dependencies: BTreeMap<String, String>,

  #[serde(default, rename = "devDependencies")]
  pub dev_dependencies: BTreeMap<String, String>,
}

impl ProjectManifest {
  pub fn path(root: &Path) -> PathBuf {
    root.join(PACKAGE_JSON)
  }

  pub fn exists(root: &Path) -> bool {
    Self::path(root).is_file()
  }

  /// Load the manifest from a project directory.
  pub fn load(root: &Path) -> Result<Self, ManifestError> {
    let path = Self::path(root);

    let content = match fs::read_to_string(&path) {
      Ok(content) => content,
      Err(e) if e.kind() == io::ErrorKind::NotFound => return Err(ManifestError::NotFound(root.to_path_buf())),
      Err(source) => return Err(ManifestError::Read { path, source }),
    };

    serde_json::from_str(&content).map_err(|source| ManifestError::Parse { path, source })
  }

  pub fn has_script(&self, name: &str) -> bool {
    self.scripts.contains_key(name)
  }

  /// Direct and development dependencies in one map.
  ///
  /// A package listed in both keeps its development constraint.
  pub fn declared_dependencies(&self) -> BTreeMap<String, String> {
    let mut merged = self.dependencies.clone();
    merged.extend(self.dev_dependencies.clone());
    merged
  }
}
