use std::collections::{BTreeMap, BTreeSet};
use std::path::{Path, PathBuf};

use super::{Ecosystem, EcosystemError};
use crate::consts::{REQUIREMENTS_TXT, VENV_DIR};
use crate::env::CommandEnv;
use crate::settings::Settings;
use crate::state::{DependencyState, InstalledPackages, StateKey};
use crate::util::hash::hash_file;
use crate::util::walk::{entry_name, scan_dir};

const METADATA_SUFFIXES: [&str; 2] = [".dist-info", ".egg-info"];

/// Python dependencies installed with pip into a project-local virtualenv.
///
/// Optional: a project without `requirements.txt` skips this ecosystem.
#[derive(Debug, Clone)]
pub struct PythonEcosystem {
  root: PathBuf,
  venv: PathBuf,
  virtualenv: String,
  python: String,
  pip: String,
}

impl PythonEcosystem {
  pub fn new(root: &Path, settings: &Settings) -> Self {
    Self {
      root: root.to_path_buf(),
      venv: root.join(VENV_DIR),
      virtualenv: settings.virtualenv.clone(),
      python: settings.python.clone(),
      pip: settings.pip.clone(),
    }
  }

  /// Basenames of the package metadata directories in every
  /// `site-packages` of the virtualenv.
  pub fn installed_packages(&self) -> Result<BTreeSet<String>, EcosystemError> {
    let lib = self.venv.join("lib");

    // lib/python*/site-packages/<metadata dir>
    let entries = scan_dir(&lib, 3, |entry| match entry.depth() {
      1 => entry_name(entry).starts_with("python"),
      2 => entry_name(entry) == "site-packages",
      _ => true,
    })
    .map_err(|source| EcosystemError::Scan {
      path: lib.clone(),
      source,
    })?;

    Ok(
      entries
        .iter()
        .filter(|entry| entry.depth() == 3)
        .map(entry_name)
        .filter(|name| METADATA_SUFFIXES.iter().any(|suffix| name.ends_with(suffix)))
        .collect(),
    )
  }

  fn pip_program(&self) -> String {
    let in_venv = self.venv.join("bin").join(&self.pip);
    if in_venv.is_file() {
      in_venv.display().to_string()
    } else {
      self.pip.clone()
    }
  }
}

impl Ecosystem for PythonEcosystem {
  fn key(&self) -> StateKey {
    StateKey::Python
  }

  fn label(&self) -> &'static str {
    "Python"
  }

  fn manifest_path(&self) -> PathBuf {
    self.root.join(REQUIREMENTS_TXT)
  }

  fn is_required(&self) -> bool {
    false
  }

  fn environment_dir(&self) -> Option<PathBuf> {
    Some(self.venv.clone())
  }

  fn setup_command(&self, env: &CommandEnv) -> Result<Option<Vec<String>>, EcosystemError> {
    if self.venv.is_dir() {
      return Ok(None);
    }

    let python = which::which_in(&self.python, env.vars.get("PATH"), &self.root).map_err(|_| {
      EcosystemError::MissingTool {
        tool: self.python.clone(),
      }
    })?;

    Ok(Some(vec![
      self.virtualenv.clone(),
      "--always-copy".to_string(),
      "--python".to_string(),
      python.display().to_string(),
      self.venv.display().to_string(),
    ]))
  }

  fn current_state(&self) -> Result<DependencyState, EcosystemError> {
    Ok(DependencyState {
      dependencies: BTreeMap::new(),
      installed_packages: InstalledPackages::Names(self.installed_packages()?),
      lockfile_hash: hash_file(&self.root.join(REQUIREMENTS_TXT))?,
    })
  }

  fn install_commands(&self) -> Vec<Vec<String>> {
    vec![vec![
      self.pip_program(),
      "install".to_string(),
      "--requirement".to_string(),
      REQUIREMENTS_TXT.to_string(),
    ]]
  }
}
