//! Running external commands.
//!
//! Foreground commands are awaited to completion. A user interrupt is
//! delivered through a [`CancellationToken`]: a running command is stopped
//! and the run surfaces as [`ProcessError::Cancelled`]. Background
//! commands are owned by the [`ProcessRunner`] that started them and are
//! terminated through it, or killed when the runner is dropped.
//!
//! Every child gets exactly the environment map it is given (`env_clear` and
//! then the map), and bare program names are looked up on that map's `PATH`.

mod types;

use std::collections::BTreeMap;
use std::io;
use std::path::{Path, PathBuf};
use std::process::{ExitStatus, Stdio};
use std::time::Duration;

use tokio::process::{Child, Command};
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

pub use types::*;
pub(crate) use types::describe_code;

use crate::env::CommandEnv;

/// Cancel `token` on the first Ctrl-C.
///
/// Spawn one per invocation, before any work starts, so an interrupt that
/// arrives between two commands is not lost.
pub fn spawn_interrupt_listener(token: CancellationToken) -> JoinHandle<()> {
  tokio::spawn(async move {
    match tokio::signal::ctrl_c().await {
      Ok(()) => {
        debug!("interrupt received");
        token.cancel();
      }
      Err(e) => error!(error = %e, "failed to install Ctrl-C handler"),
    }
  })
}

#[derive(Debug)]
struct BackgroundProcess {
  handle: BackgroundHandle,
  child: Child,
  cmd: String,
}

/// Spawns commands and owns the background ones.
#[derive(Debug)]
pub struct ProcessRunner {
  background: Vec<BackgroundProcess>,
  next_id: usize,
  terminate_timeout: Duration,
  cancel: CancellationToken,
}

impl Default for ProcessRunner {
  fn default() -> Self {
    Self::new(Duration::from_secs(5))
  }
}

impl ProcessRunner {
  /// `terminate_timeout` is how long a background process gets between
  /// SIGTERM and a hard kill.
  pub fn new(terminate_timeout: Duration) -> Self {
    Self {
      background: Vec::new(),
      next_id: 0,
      terminate_timeout,
      cancel: CancellationToken::new(),
    }
  }

  /// Share `cancel` instead of the runner's own token.
  pub fn with_cancellation(mut self, cancel: CancellationToken) -> Self {
    self.cancel = cancel;
    self
  }

  /// The token that cancels this runner's foreground commands.
  pub fn cancellation(&self) -> &CancellationToken {
    &self.cancel
  }

  /// Run a command to completion.
  ///
  /// With `exit_on_error`, a non-zero exit is returned as
  /// [`ProcessError::Failed`]; without it the failure is logged and returned
  /// as [`RunStatus::Failed`] so the caller can carry on. Cancellation is
  /// always an error, and once the runner is cancelled nothing new is spawned.
  pub async fn run(
    &self,
    command: &[String],
    cwd: &Path,
    env: &CommandEnv,
    exit_on_error: bool,
  ) -> Result<RunStatus, ProcessError> {
    let cmd_line = command.join(" ");
    self.check_cancelled(&cmd_line)?;
    log_step(&cmd_line, env);

    let mut child = build_command(command, cwd, &env.vars)?
      .spawn()
      .map_err(|source| ProcessError::Spawn {
        cmd: cmd_line.clone(),
        source,
      })?;

    let waited = tokio::select! {
      biased;
      _ = self.cancel.cancelled() => None,
      status = child.wait() => Some(status),
    };

    let status = match waited {
      Some(status) => status.map_err(|source| ProcessError::Wait {
        cmd: cmd_line.clone(),
        source,
      })?,
      None => {
        warn!(cmd = %cmd_line, "cancelled - exiting");
        if let Err(e) = stop_child(&mut child, self.terminate_timeout).await {
          debug!(cmd = %cmd_line, error = %e, "failed to stop cancelled command");
        }
        return Err(ProcessError::Cancelled { cmd: cmd_line });
      }
    };

    if status.success() {
      return Ok(RunStatus::Success);
    }

    // A terminal Ctrl-C reaches the child too, and it may exit before the
    // listener has fired.
    if killed_by_interrupt(&status) {
      warn!(cmd = %cmd_line, "interrupted - exiting");
      self.cancel.cancel();
      return Err(ProcessError::Cancelled { cmd: cmd_line });
    }

    let code = status.code();
    if exit_on_error {
      error!(cmd = %cmd_line, code = ?code, "command failed");
      return Err(ProcessError::Failed { cmd: cmd_line, code });
    }

    warn!(cmd = %cmd_line, code = ?code, "command failed, continuing");
    Ok(RunStatus::Failed { code })
  }

  /// Fail with [`ProcessError::Cancelled`] if an interrupt was received.
  ///
  /// `step` names what would have run next.
  pub fn check_cancelled(&self, step: &str) -> Result<(), ProcessError> {
    if self.cancel.is_cancelled() {
      warn!(step, "cancelled - exiting");
      return Err(ProcessError::Cancelled { cmd: step.to_string() });
    }
    Ok(())
  }

  /// Start a command without waiting for it.
  pub fn run_background(
    &mut self,
    command: &[String],
    cwd: &Path,
    env: &CommandEnv,
  ) -> Result<BackgroundHandle, ProcessError> {
    let cmd_line = command.join(" ");
    log_step(&cmd_line, env);

    let mut cmd = build_command(command, cwd, &env.vars)?;
    cmd.stdin(Stdio::null());

    let child = cmd.spawn().map_err(|source| ProcessError::Spawn {
      cmd: cmd_line.clone(),
      source,
    })?;

    let handle = BackgroundHandle::new(self.next_id, child.id());
    self.next_id += 1;

    debug!(cmd = %cmd_line, pid = ?handle.pid(), "background process started");
    self.background.push(BackgroundProcess {
      handle,
      child,
      cmd: cmd_line,
    });

    Ok(handle)
  }

  /// Number of background processes not yet terminated.
  pub fn outstanding(&self) -> usize {
    self.background.len()
  }

  /// Terminate one background process.
  ///
  /// Returns `false` if the handle was already terminated.
  pub async fn terminate(&mut self, handle: BackgroundHandle) -> bool {
    let Some(index) = self.background.iter().position(|p| p.handle == handle) else {
      return false;
    };

    let process = self.background.remove(index);
    self.stop(process).await;
    true
  }

  /// Terminate every outstanding background process.
  ///
  /// Safe to call repeatedly, and for processes that already exited.
  pub async fn terminate_all(&mut self) {
    for process in std::mem::take(&mut self.background) {
      self.stop(process).await;
    }
  }

  async fn stop(&self, mut process: BackgroundProcess) {
    info!(cmd = %process.cmd, "stopping background process");
    if let Err(e) = stop_child(&mut process.child, self.terminate_timeout).await {
      warn!(cmd = %process.cmd, error = %e, "failed to stop background process");
    }
  }
}

fn log_step(cmd_line: &str, env: &CommandEnv) {
  match &env.virtualenv {
    Some(venv) => info!(virtualenv = %venv.display(), "$ {cmd_line}"),
    None => info!("$ {cmd_line}"),
  }
}

#[cfg(unix)]
fn killed_by_interrupt(status: &ExitStatus) -> bool {
  use std::os::unix::process::ExitStatusExt;

  status.signal() == Some(nix::sys::signal::Signal::SIGINT as i32)
}

#[cfg(not(unix))]
fn killed_by_interrupt(_status: &ExitStatus) -> bool {
  false
}

fn build_command(command: &[String], cwd: &Path, env: &BTreeMap<String, String>) -> Result<Command, ProcessError> {
  let (program, args) = command.split_first().ok_or(ProcessError::EmptyCommand)?;
  let program = resolve_program(program, cwd, env)?;

  debug!(program = %program.display(), cwd = %cwd.display(), "spawning process");

  let mut cmd = Command::new(program);
  cmd
    .args(args)
    .current_dir(cwd)
    .env_clear()
    .envs(env)
    .kill_on_drop(true);

  Ok(cmd)
}

/// Resolve a program against the child's `PATH` rather than ours.
fn resolve_program(program: &str, cwd: &Path, env: &BTreeMap<String, String>) -> Result<PathBuf, ProcessError> {
  if Path::new(program).components().count() > 1 {
    return Ok(cwd.join(program));
  }

  which::which_in(program, env.get("PATH"), cwd).map_err(|_| ProcessError::NotFound {
    program: program.to_string(),
  })
}

/// Ask a child to exit, then kill it if it does not within `timeout`.
async fn stop_child(child: &mut Child, timeout: Duration) -> io::Result<()> {
  if child.try_wait()?.is_some() {
    return Ok(());
  }

  send_terminate(child);

  match tokio::time::timeout(timeout, child.wait()).await {
    Ok(status) => status.map(|_| ()),
    Err(_) => {
      debug!(pid = ?child.id(), "process ignored SIGTERM, killing");
      child.kill().await
    }
  }
}

#[cfg(unix)]
fn send_terminate(child: &mut Child) {
  use nix::sys::signal::{Signal, kill};
  use nix::unistd::Pid;

  let Some(pid) = child.id() else {
    return;
  };

  if let Err(e) = kill(Pid::from_raw(pid as i32), Signal::SIGTERM) {
    debug!(pid, error = %e, "failed to send SIGTERM");
  }
}

#[cfg(not(unix))]
fn send_terminate(child: &mut Child) {
  if let Err(e) = child.start_kill() {
    debug!(error = %e, "failed to kill process");
  }
}
