//! Runtime configuration.
//!
//! There is no settings file: everything is read from the merged project
//! environment, so `.env`, `.env.local` and `--env` can all tune behavior.

use std::path::{Path, PathBuf};
use std::time::Duration;

use tracing::warn;

use crate::consts::COMPOSE_FILES;
use crate::env::ProjectEnv;

pub const COMPOSE_ACTIONS_VAR: &str = "DOTRUN_DOCKER_COMPOSE_ACTIONS";
pub const COMPOSE_WAIT_VAR: &str = "DOTRUN_DOCKER_COMPOSE_WAIT_SECONDS";
pub const COMPOSE_BINARY_VAR: &str = "DOTRUN_DOCKER_COMPOSE_BINARY";

const DEFAULT_COMPOSE_ACTIONS: &str = "start:serve";
const DEFAULT_COMPOSE_WAIT_SECS: u64 = 2;

#[derive(Debug, Clone)]
pub struct Settings {
  pub yarn: String,
  pub virtualenv: String,
  pub python: String,
  pub pip: String,

  /// Compose binary, if one was configured or found on `PATH`.
  pub compose_binary: Option<PathBuf>,
  /// Scripts that bring the compose stack up in the background.
  pub compose_actions: Vec<String>,
  /// How long to let the compose stack settle before running the script.
  pub compose_wait: Duration,

  /// Pause after a user interrupt before giving control back.
  pub cancel_grace: Duration,
  /// How long a background process gets to exit after SIGTERM.
  pub terminate_timeout: Duration,
}

impl Default for Settings {
  fn default() -> Self {
    Self {
      yarn: "yarn".to_string(),
      virtualenv: "virtualenv".to_string(),
      python: "python3".to_string(),
      pip: "pip3".to_string(),
      compose_binary: None,
      compose_actions: split_actions(DEFAULT_COMPOSE_ACTIONS),
      compose_wait: Duration::from_secs(DEFAULT_COMPOSE_WAIT_SECS),
      cancel_grace: Duration::from_secs(1),
      terminate_timeout: Duration::from_secs(5),
    }
  }
}

impl Settings {
  /// Resolve settings from a project environment.
  pub fn from_env(env: &ProjectEnv) -> Self {
    let mut settings = Self::default();

    if let Some(actions) = env.get(COMPOSE_ACTIONS_VAR) {
      settings.compose_actions = split_actions(actions);
    }

    if let Some(raw) = env.get(COMPOSE_WAIT_VAR) {
      match raw.trim().parse::<u64>() {
        Ok(secs) => settings.compose_wait = Duration::from_secs(secs),
        Err(_) => warn!(
          value = raw,
          default = DEFAULT_COMPOSE_WAIT_SECS,
          "invalid {COMPOSE_WAIT_VAR}, using default"
        ),
      }
    }

    settings.compose_binary = match env.get(COMPOSE_BINARY_VAR) {
      Some(path) if !path.is_empty() => Some(PathBuf::from(path)),
      _ => which::which_in("docker-compose", env.get("PATH"), env.root()).ok(),
    };

    settings
  }

  pub fn is_compose_action(&self, script: &str) -> bool {
    self.compose_actions.iter().any(|action| action == script)
  }

  /// The compose binary, only if it actually exists.
  pub fn available_compose_binary(&self) -> Option<&Path> {
    self.compose_binary.as_deref().filter(|path| path.is_file())
  }
}

/// The project's compose descriptor, if it has one.
pub fn compose_file(root: &Path) -> Option<PathBuf> {
  COMPOSE_FILES.iter().map(|name| root.join(name)).find(|path| path.is_file())
}

fn split_actions(raw: &str) -> Vec<String> {
  raw
    .split(':')
    .map(str::trim)
    .filter(|s| !s.is_empty())
    .map(String::from)
    .collect()
}
