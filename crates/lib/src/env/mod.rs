//! Environment handed to every spawned command.
//!
//! The ambient process environment is captured once and never modified.
//! Project `.env` and `.env.local` files and caller overrides are layered on
//! top, in that order, into an immutable [`ProjectEnv`]. Each spawn then asks
//! for a fresh [`CommandEnv`], which adds the virtual environment activation
//! if one exists at that moment.

use std::collections::BTreeMap;
use std::ffi::OsString;
use std::path::{Path, PathBuf};

use tracing::{debug, warn};

use crate::consts::{DOTENV_FILES, VENV_DIR};

/// Merged project environment.
#[derive(Debug, Clone)]
pub struct ProjectEnv {
  root: PathBuf,
  vars: BTreeMap<String, String>,
}

/// A one-off environment for a single child process.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommandEnv {
  pub vars: BTreeMap<String, String>,
  /// Set when the project's virtual environment was activated.
  pub virtualenv: Option<PathBuf>,
}

impl ProjectEnv {
  /// Layer the project's dotenv files and `overrides` over the current
  /// process environment.
  pub fn load(root: &Path, overrides: &BTreeMap<String, String>) -> Self {
    let base = std::env::vars_os().filter_map(|(key, value)| Some((key.into_string().ok()?, value.into_string().ok()?)));
    Self::with_base(root, base, overrides)
  }

  /// Same as [`ProjectEnv::load`] with an explicit base environment.
  pub fn with_base(
    root: &Path,
    base: impl IntoIterator<Item = (String, String)>,
    overrides: &BTreeMap<String, String>,
  ) -> Self {
    let mut vars: BTreeMap<String, String> = base.into_iter().collect();

    for name in DOTENV_FILES {
      let pairs = read_dotenv(&root.join(name));
      if !pairs.is_empty() {
        debug!(file = name, count = pairs.len(), "loaded dotenv file");
      }
      vars.extend(pairs);
    }

    vars.extend(overrides.iter().map(|(k, v)| (k.clone(), v.clone())));

    Self {
      root: root.to_path_buf(),
      vars,
    }
  }

  pub fn root(&self) -> &Path {
    &self.root
  }

  pub fn vars(&self) -> &BTreeMap<String, String> {
    &self.vars
  }

  pub fn get(&self, key: &str) -> Option<&str> {
    self.vars.get(key).map(String::as_str)
  }

  pub fn venv_path(&self) -> PathBuf {
    self.root.join(VENV_DIR)
  }

  /// Build the environment for one spawn.
  ///
  /// When `<venv>/bin/python3` exists this does what an `activate` script
  /// would: sets `VIRTUAL_ENV`, puts `<venv>/bin` first on `PATH` and drops
  /// `PYTHONHOME`.
  pub fn for_command(&self) -> CommandEnv {
    let mut vars = self.vars.clone();
    let venv = self.venv_path();

    if !venv.join("bin").join("python3").is_file() {
      return CommandEnv { vars, virtualenv: None };
    }

    let bin = venv.join("bin");
    let path = match vars.get("PATH") {
      Some(existing) => prepend_path(&bin, existing),
      None => bin.display().to_string(),
    };

    vars.insert("VIRTUAL_ENV".to_string(), venv.display().to_string());
    vars.insert("PATH".to_string(), path);
    vars.remove("PYTHONHOME");

    CommandEnv {
      vars,
      virtualenv: Some(venv),
    }
  }
}

fn prepend_path(dir: &Path, existing: &str) -> String {
  let entries = std::iter::once(dir.to_path_buf()).chain(std::env::split_paths(existing));
  std::env::join_paths(entries)
    .map(OsString::into_string)
    .ok()
    .and_then(Result::ok)
    .unwrap_or_else(|| format!("{}:{}", dir.display(), existing))
}

/// Parse a dotenv file into key/value pairs.
///
/// A missing file yields nothing. A malformed file is reported and ignored
/// as a whole.
fn read_dotenv(path: &Path) -> Vec<(String, String)> {
  let iter = match dotenvy::from_path_iter(path) {
    Ok(iter) => iter,
    Err(e) if e.not_found() => return Vec::new(),
    Err(e) => {
      warn!(path = %path.display(), error = %e, "failed to open dotenv file");
      return Vec::new();
    }
  };

  match iter.collect::<Result<Vec<_>, _>>() {
    Ok(pairs) => pairs,
    Err(e) => {
      warn!(path = %path.display(), error = %e, "ignoring malformed dotenv file");
      Vec::new()
    }
  }
}
