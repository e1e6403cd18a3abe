//! Types for the project orchestrator.

use std::io;
use std::path::PathBuf;

use thiserror::Error;

use crate::ecosystem::{EcosystemError, InstallOutcome};
use crate::manifest::ManifestError;
use crate::process::{ProcessError, describe_code};

/// Exit code used when the user interrupts a run.
pub const CANCELLED_EXIT_CODE: u8 = 130;

#[derive(Debug, Error)]
pub enum ProjectError {
  #[error("failed to open project directory {}: {source}", path.display())]
  Directory {
    path: PathBuf,
    #[source]
    source: io::Error,
  },

  #[error(transparent)]
  Manifest(#[from] ManifestError),

  #[error("script `{script}` not found in package.json")]
  ScriptNotFound { script: String },

  #[error("dependency install failed: {0}")]
  Install(#[from] EcosystemError),

  #[error("script `{script}` failed with {}", describe_code(.code))]
  ScriptFailed { script: String, code: Option<i32> },

  #[error(transparent)]
  Process(#[from] ProcessError),

  #[error("cancelled")]
  Cancelled,
}

impl ProjectError {
  /// Process exit code for this error.
  ///
  /// A failing script or `exec` command passes its own code through. A
  /// command killed by a signal maps to 1.
  pub fn exit_code(&self) -> u8 {
    match self {
      ProjectError::Cancelled => CANCELLED_EXIT_CODE,
      ProjectError::ScriptFailed { code, .. } | ProjectError::Process(ProcessError::Failed { code, .. }) => {
        code.and_then(|code| u8::try_from(code).ok()).filter(|code| *code != 0).unwrap_or(1)
      }
      _ => 1,
    }
  }

  /// Whether this error stems from a user interrupt.
  pub fn is_cancelled(&self) -> bool {
    match self {
      ProjectError::Cancelled => true,
      ProjectError::Process(e) | ProjectError::Install(EcosystemError::Process(e)) => e.is_cancelled(),
      _ => false,
    }
  }
}

/// What `install` did for each ecosystem.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct InstallReport {
  pub node: InstallOutcome,
  pub python: InstallOutcome,
}
