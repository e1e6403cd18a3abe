use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};

use serde::Deserialize;
use tracing::debug;
use walkdir::DirEntry;

use super::{Ecosystem, EcosystemError};
use crate::consts::{NODE_MODULES_DIR, PACKAGE_JSON, YARN_LOCK};
use crate::manifest::ProjectManifest;
use crate::settings::Settings;
use crate::state::{DependencyState, InstalledPackages, StateKey};
use crate::util::hash::hash_file;
use crate::util::walk::{entry_name, scan_dir};

/// JavaScript dependencies managed by yarn.
#[derive(Debug, Clone)]
pub struct NodeEcosystem {
  root: PathBuf,
  yarn: String,
}

/// The part of an installed package's `package.json` we read.
#[derive(Debug, Deserialize)]
struct InstalledMeta {
  name: String,
  version: String,
}

impl NodeEcosystem {
  pub fn new(root: &Path, settings: &Settings) -> Self {
    Self {
      root: root.to_path_buf(),
      yarn: settings.yarn.clone(),
    }
  }

  /// Name to version of every package under `node_modules`, including
  /// `@scope/name` packages one level down.
  pub fn installed_packages(&self) -> Result<BTreeMap<String, String>, EcosystemError> {
    let mut installed = BTreeMap::new();
    let modules = self.root.join(NODE_MODULES_DIR);

    let entries = scan_dir(&modules, 2, |entry| entry.depth() == 1 || in_scope_dir(entry)).map_err(|source| {
      EcosystemError::Scan {
        path: modules.clone(),
        source,
      }
    })?;

    for entry in entries {
      if entry.depth() == 1 && is_scope(&entry_name(&entry)) {
        continue;
      }
      insert_package(&mut installed, entry.path());
    }

    Ok(installed)
  }
}

impl Ecosystem for NodeEcosystem {
  fn key(&self) -> StateKey {
    StateKey::Node
  }

  fn label(&self) -> &'static str {
    "Node"
  }

  fn manifest_path(&self) -> PathBuf {
    self.root.join(PACKAGE_JSON)
  }

  fn is_required(&self) -> bool {
    true
  }

  fn current_state(&self) -> Result<DependencyState, EcosystemError> {
    let manifest = ProjectManifest::load(&self.root)?;

    Ok(DependencyState {
      dependencies: manifest.declared_dependencies(),
      installed_packages: InstalledPackages::Versions(self.installed_packages()?),
      lockfile_hash: hash_file(&self.root.join(YARN_LOCK))?,
    })
  }

  fn install_commands(&self) -> Vec<Vec<String>> {
    vec![vec![self.yarn.clone(), "install".to_string()]]
  }
}

fn is_scope(name: &str) -> bool {
  name.starts_with('@')
}

fn in_scope_dir(entry: &DirEntry) -> bool {
  entry
    .path()
    .parent()
    .and_then(Path::file_name)
    .is_some_and(|parent| is_scope(&parent.to_string_lossy()))
}

/// Record one package directory. Entries without a readable `package.json`
/// (`.bin`, `.yarn-integrity`, half-removed packages) are skipped.
fn insert_package(installed: &mut BTreeMap<String, String>, dir: &Path) {
  let manifest = dir.join(PACKAGE_JSON);
  let meta = fs::read_to_string(&manifest)
    .ok()
    .and_then(|content| serde_json::from_str::<InstalledMeta>(&content).ok());

  match meta {
    Some(meta) => {
      installed.insert(meta.name, meta.version);
    }
    None => debug!(path = %dir.display(), "skipping node_modules entry without package metadata"),
  }
}
