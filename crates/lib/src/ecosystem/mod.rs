//! Dependency convergence per ecosystem.
//!
//! An [`Ecosystem`] knows how to fingerprint its dependency state and which
//! commands install it. [`Installer::ensure_installed`] is the one algorithm
//! shared by all of them:
//!
//! 1. Skip (or fail, if the ecosystem is required) when its manifest is absent.
//! 2. Create the ecosystem's environment if it needs one and it is missing.
//!    This happens even when forced, since nothing can be compared without it.
//! 3. Unless forced, compare the current fingerprint with the persisted one
//!    and stop if they are equal.
//! 4. Run the install commands, then fingerprint again and persist.
//!
//! A failed or cancelled install returns before step 4 persists anything, so
//! the old snapshot stays and the next run detects the change again. An
//! interrupt received at any point, even between commands, counts as
//! cancelled.

mod node;
mod python;

use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use thiserror::Error;
use tracing::{info, warn};

pub use node::NodeEcosystem;
pub use python::PythonEcosystem;

use crate::env::{CommandEnv, ProjectEnv};
use crate::manifest::ManifestError;
use crate::process::{ProcessError, ProcessRunner};
use crate::state::{DependencyState, StateError, StateKey, StateStore};
use crate::util::hash::HashError;

#[derive(Debug, Error)]
pub enum EcosystemError {
  #[error("{file} not found in {}", dir.display())]
  ManifestMissing { file: String, dir: PathBuf },

  #[error(transparent)]
  Manifest(#[from] ManifestError),

  #[error(transparent)]
  Hash(#[from] HashError),

  #[error(transparent)]
  State(#[from] StateError),

  #[error(transparent)]
  Process(#[from] ProcessError),

  #[error("failed to scan installed packages in {}: {source}", path.display())]
  Scan {
    path: PathBuf,
    #[source]
    source: walkdir::Error,
  },

  #[error("{tool} not found on PATH")]
  MissingTool { tool: String },
}

/// One dependency-management toolchain.
pub trait Ecosystem {
  fn key(&self) -> StateKey;

  /// Human-readable name used in log notes.
  fn label(&self) -> &'static str;

  /// The file that declares this ecosystem's dependencies.
  fn manifest_path(&self) -> PathBuf;

  /// Whether a missing manifest is an error rather than a skip.
  fn is_required(&self) -> bool;

  /// Directory the ecosystem installs into, if it manages one.
  fn environment_dir(&self) -> Option<PathBuf> {
    None
  }

  /// Command that creates the environment, if it needs creating right now.
  fn setup_command(&self, _env: &CommandEnv) -> Result<Option<Vec<String>>, EcosystemError> {
    Ok(None)
  }

  /// Fingerprint what is declared and what is installed at this moment.
  fn current_state(&self) -> Result<DependencyState, EcosystemError>;

  /// Commands that converge the installed state, run in order.
  fn install_commands(&self) -> Vec<Vec<String>>;
}

/// Why an install ran. Affects reporting only.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InstallTrigger {
  Forced,
  ChangesDetected,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InstallOutcome {
  /// Optional ecosystem without a manifest.
  Skipped,
  UpToDate,
  Installed(InstallTrigger),
}

/// Runs the convergence algorithm against one project.
pub struct Installer<'a> {
  root: &'a Path,
  env: &'a ProjectEnv,
  store: &'a StateStore,
  runner: &'a ProcessRunner,
}

impl<'a> Installer<'a> {
  pub fn new(root: &'a Path, env: &'a ProjectEnv, store: &'a StateStore, runner: &'a ProcessRunner) -> Self {
    Self {
      root,
      env,
      store,
      runner,
    }
  }

  pub async fn ensure_installed(&self, ecosystem: &dyn Ecosystem, force: bool) -> Result<InstallOutcome, EcosystemError> {
    let label = ecosystem.label();
    let manifest = ecosystem.manifest_path();
    self.runner.check_cancelled(label)?;

    if !manifest.is_file() {
      let file = file_name(&manifest);
      if ecosystem.is_required() {
        return Err(EcosystemError::ManifestMissing {
          file,
          dir: self.root.to_path_buf(),
        });
      }
      info!("No {file} found");
      return Ok(InstallOutcome::Skipped);
    }

    if let Some(setup) = ecosystem.setup_command(&self.env.for_command())? {
      info!("Creating {label} environment");
      if let Err(e) = self.runner.run(&setup, self.root, &self.env.for_command(), true).await {
        if let Some(dir) = ecosystem.environment_dir() {
          remove_partial_environment(&dir);
        }
        return Err(e.into());
      }
    }

    let trigger = if force {
      InstallTrigger::Forced
    } else {
      let current = ecosystem.current_state()?;
      let previous = self.store.get(ecosystem.key())?;
      if previous.as_ref() == Some(&current) {
        info!("{label} dependencies up to date");
        return Ok(InstallOutcome::UpToDate);
      }
      InstallTrigger::ChangesDetected
    };

    match trigger {
      InstallTrigger::Forced => info!("Installing {label} dependencies (forced)"),
      InstallTrigger::ChangesDetected => info!("{label} dependencies have changed, reinstalling"),
    }

    for command in ecosystem.install_commands() {
      self.runner.run(&command, self.root, &self.env.for_command(), true).await?;
    }

    // The install itself changes what is on disk, so fingerprint afterwards.
    let state = ecosystem.current_state()?;
    self.runner.check_cancelled(label)?;
    self.store.set(ecosystem.key(), state)?;

    Ok(InstallOutcome::Installed(trigger))
  }
}

fn file_name(path: &Path) -> String {
  path
    .file_name()
    .map(|name| name.to_string_lossy().into_owned())
    .unwrap_or_else(|| path.display().to_string())
}

fn remove_partial_environment(dir: &Path) {
  match fs::remove_dir_all(dir) {
    Ok(()) => info!(path = %dir.display(), "removed partially created environment"),
    Err(e) if e.kind() == io::ErrorKind::NotFound => {}
    Err(e) => warn!(path = %dir.display(), error = %e, "failed to remove partially created environment"),
  }
}
