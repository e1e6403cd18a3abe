//! The project orchestrator.
//!
//! A [`Project`] ties one project directory to its environment, settings,
//! state file and process runner, and implements the user-facing operations:
//! running a script, installing, `exec` and `clean`.
//!
//! Every operation ends in [`Project::finish`], which terminates all
//! background processes before returning, whatever the outcome. A user
//! interrupt is additionally followed by the cancellation grace delay and
//! reported as [`ProjectError::Cancelled`].
//!
//! Interrupts arrive through the project's [`CancellationToken`]. The caller
//! wires it to Ctrl-C with [`spawn_interrupt_listener`](crate::process::spawn_interrupt_listener);
//! the token is checked between steps as well as while commands run.

mod types;

use std::collections::BTreeMap;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

pub use types::*;

use crate::consts::{NODE_MODULES_DIR, VENV_DIR};
use crate::ecosystem::{Installer, NodeEcosystem, PythonEcosystem};
use crate::env::{CommandEnv, ProjectEnv};
use crate::manifest::ProjectManifest;
use crate::process::{ProcessError, ProcessRunner};
use crate::settings::{Settings, compose_file};
use crate::state::StateStore;

const CLEAN_SCRIPT: &str = "clean";
const DEFAULT_SHELL: &str = "bash";

pub struct Project {
  root: PathBuf,
  env: ProjectEnv,
  settings: Settings,
  store: StateStore,
  runner: ProcessRunner,
}

impl Project {
  /// Open the project in `dir` with the current process environment.
  pub fn open(dir: &Path, overrides: &BTreeMap<String, String>) -> Result<Self, ProjectError> {
    let root = dunce::canonicalize(dir).map_err(|source| ProjectError::Directory {
      path: dir.to_path_buf(),
      source,
    })?;

    let env = ProjectEnv::load(&root, overrides);
    let settings = Settings::from_env(&env);
    Ok(Self::with_settings(env, settings))
  }

  /// Build a project from an already merged environment.
  pub fn with_settings(env: ProjectEnv, settings: Settings) -> Self {
    let root = env.root().to_path_buf();
    Self {
      store: StateStore::for_project(&root),
      runner: ProcessRunner::new(settings.terminate_timeout),
      root,
      env,
      settings,
    }
  }

  pub fn root(&self) -> &Path {
    &self.root
  }

  pub fn settings(&self) -> &Settings {
    &self.settings
  }

  pub fn store(&self) -> &StateStore {
    &self.store
  }

  /// Cancelling this token interrupts whatever the project is doing.
  pub fn cancellation_token(&self) -> CancellationToken {
    self.runner.cancellation().clone()
  }

  /// Run a `package.json` script, installing dependencies first unless
  /// `skip_install` is set.
  pub async fn start(&mut self, script: &str, args: &[String], skip_install: bool) -> Result<(), ProjectError> {
    let manifest = ProjectManifest::load(&self.root)?;
    if !manifest.has_script(script) {
      return Err(ProjectError::ScriptNotFound {
        script: script.to_string(),
      });
    }

    let result = match self.runner.check_cancelled(script) {
      Ok(()) => self.run_script(script, args, skip_install).await,
      Err(e) => Err(e.into()),
    };
    self.finish(result).await
  }

  /// Force a reinstall of every ecosystem.
  pub async fn install(&mut self, force: bool) -> Result<InstallReport, ProjectError> {
    ProjectManifest::load(&self.root)?;
    let result = match self.runner.check_cancelled("install") {
      Ok(()) => self.converge(force).await,
      Err(e) => Err(e.into()),
    };
    self.finish(result).await
  }

  /// Run an arbitrary command in the project environment. No install is
  /// performed. An empty command opens a shell.
  pub async fn exec(&mut self, command: &[String]) -> Result<(), ProjectError> {
    let command = if command.is_empty() {
      vec![DEFAULT_SHELL.to_string()]
    } else {
      command.to_vec()
    };

    let result = self
      .runner
      .run(&command, &self.root, &self.env.for_command(), true)
      .await
      .map(|_| ())
      .map_err(ProjectError::from);
    self.finish(result).await
  }

  /// Remove everything `dotrun` created for this project.
  ///
  /// Each step is best-effort. Only a user interrupt makes this fail.
  pub async fn clean(&mut self) -> Result<(), ProjectError> {
    let result = self.run_clean().await;
    self.finish(result).await
  }

  async fn run_script(&mut self, script: &str, args: &[String], skip_install: bool) -> Result<(), ProjectError> {
    if skip_install {
      debug!("skipping dependency install");
    } else {
      self.converge(false).await?;
    }

    if self.settings.is_compose_action(script) {
      self.start_compose().await?;
    }

    self.runner.check_cancelled(script)?;
    let mut command = vec![self.settings.yarn.clone(), "run".to_string(), script.to_string()];
    command.extend(args.iter().cloned());

    match self.runner.run(&command, &self.root, &self.env.for_command(), true).await {
      Ok(_) => Ok(()),
      Err(ProcessError::Failed { code, .. }) => Err(ProjectError::ScriptFailed {
        script: script.to_string(),
        code,
      }),
      Err(e) => Err(e.into()),
    }
  }

  /// Converge Node, then Python.
  async fn converge(&self, force: bool) -> Result<InstallReport, ProjectError> {
    let installer = Installer::new(&self.root, &self.env, &self.store, &self.runner);

    let node = installer
      .ensure_installed(&NodeEcosystem::new(&self.root, &self.settings), force)
      .await?;
    let python = installer
      .ensure_installed(&PythonEcosystem::new(&self.root, &self.settings), force)
      .await?;

    Ok(InstallReport { node, python })
  }

  /// Bring the compose stack up in the background, if the project has one
  /// and the binary is available.
  async fn start_compose(&mut self) -> Result<(), ProjectError> {
    let Some(file) = compose_file(&self.root) else {
      debug!("no docker-compose file, not starting services");
      return Ok(());
    };
    let Some(binary) = self.settings.available_compose_binary() else {
      info!(file = %file.display(), "docker-compose not available, not starting services");
      return Ok(());
    };

    let binary = binary.display().to_string();
    let env = self.env.for_command();

    for action in ["pull", "stop"] {
      self.best_effort(&[binary.clone(), action.to_string()], &env).await?;
    }

    if let Err(e) = self.runner.run_background(&[binary, "up".to_string()], &self.root, &env) {
      warn!(error = %e, "failed to start docker-compose services");
      return Ok(());
    }

    let wait = self.settings.compose_wait;
    info!("Waiting {}s for docker-compose services", wait.as_secs());
    let cancel = self.runner.cancellation();
    tokio::select! {
      biased;
      _ = cancel.cancelled() => {
        warn!("cancelled - exiting");
        Err(ProjectError::Cancelled)
      }
      _ = tokio::time::sleep(wait) => Ok(()),
    }
  }

  async fn run_clean(&mut self) -> Result<(), ProjectError> {
    let env = self.env.for_command();

    match ProjectManifest::load(&self.root) {
      Ok(manifest) if manifest.has_script(CLEAN_SCRIPT) => {
        let command = [self.settings.yarn.clone(), "run".to_string(), CLEAN_SCRIPT.to_string()];
        self.best_effort(&command, &env).await?;
      }
      Ok(_) => info!("No clean script found"),
      Err(e) => info!("Not running clean script: {e}"),
    }

    match self.store.remove() {
      Ok(true) => info!(path = %self.store.path().display(), "Removed state file"),
      Ok(false) => {}
      Err(e) => warn!(error = %e, "failed to remove state file"),
    }

    for dir in [NODE_MODULES_DIR, VENV_DIR] {
      remove_dir_best_effort(&self.root.join(dir));
    }

    if compose_file(&self.root).is_some()
      && let Some(binary) = self.settings.available_compose_binary()
    {
      let command = [binary.display().to_string(), "down".to_string()];
      self.best_effort(&command, &env).await?;
    }

    Ok(())
  }

  /// Run a command whose failure is only worth a warning. Cancellation still
  /// propagates.
  async fn best_effort(&self, command: &[String], env: &CommandEnv) -> Result<(), ProjectError> {
    match self.runner.run(command, &self.root, env, false).await {
      Ok(_) => Ok(()),
      Err(e) if e.is_cancelled() => Err(e.into()),
      Err(e) => {
        warn!(error = %e, "continuing after failed command");
        Ok(())
      }
    }
  }

  /// Terminate background processes and normalise cancellation.
  async fn finish<T>(&mut self, result: Result<T, ProjectError>) -> Result<T, ProjectError> {
    self.runner.terminate_all().await;

    match result {
      Err(e) if e.is_cancelled() => {
        tokio::time::sleep(self.settings.cancel_grace).await;
        Err(ProjectError::Cancelled)
      }
      other => other,
    }
  }
}

fn remove_dir_best_effort(dir: &Path) {
  match fs::remove_dir_all(dir) {
    Ok(()) => info!(path = %dir.display(), "Removed"),
    Err(e) if e.kind() == io::ErrorKind::NotFound => {}
    Err(e) => warn!(path = %dir.display(), error = %e, "failed to remove"),
  }
}
