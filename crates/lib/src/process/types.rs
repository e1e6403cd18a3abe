//! Types for foreground and background command execution.

use std::io;

use thiserror::Error;

/// How a foreground command finished, when the caller asked to keep going on
/// failure.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunStatus {
  Success,
  /// Non-zero exit; `code` is `None` when the child was killed by a signal.
  Failed { code: Option<i32> },
}

impl RunStatus {
  pub fn is_success(self) -> bool {
    matches!(self, RunStatus::Success)
  }
}

/// Identifies a background process owned by a [`ProcessRunner`](super::ProcessRunner).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct BackgroundHandle {
  pub(super) id: usize,
  pid: Option<u32>,
}

impl BackgroundHandle {
  pub(super) fn new(id: usize, pid: Option<u32>) -> Self {
    Self { id, pid }
  }

  /// OS process id, if the child was still running when spawned.
  pub fn pid(&self) -> Option<u32> {
    self.pid
  }
}

#[derive(Debug, Error)]
pub enum ProcessError {
  #[error("no command given")]
  EmptyCommand,

  #[error("command not found: {program}")]
  NotFound { program: String },

  #[error("failed to start `{cmd}`: {source}")]
  Spawn {
    cmd: String,
    #[source]
    source: io::Error,
  },

  #[error("failed waiting for `{cmd}`: {source}")]
  Wait {
    cmd: String,
    #[source]
    source: io::Error,
  },

  /// Command exited with a non-zero status.
  #[error("`{cmd}` exited with {}", describe_code(.code))]
  Failed { cmd: String, code: Option<i32> },

  /// The user interrupted the command.
  #[error("`{cmd}` cancelled")]
  Cancelled { cmd: String },
}

impl ProcessError {
  pub fn is_cancelled(&self) -> bool {
    matches!(self, ProcessError::Cancelled { .. })
  }
}

/// "exit code N", or "a signal" when the process was killed.
pub(crate) fn describe_code(code: &Option<i32>) -> String {
  match code {
    Some(code) => format!("exit code {code}"),
    None => "a signal".to_string(),
  }
}
