//! Command implementations.
//!
//! Each command opens the project, builds a tokio runtime and blocks on one
//! [`Project`] operation. Ctrl-C is watched for the whole of that operation
//! and cancels the project's token.

mod clean;
mod exec;
mod install;
mod run;

use std::collections::BTreeMap;
use std::future::Future;
use std::path::PathBuf;

use anyhow::{Context, Result};
use tokio_util::sync::CancellationToken;
use tracing::debug;

use dotrun_lib::process::spawn_interrupt_listener;
use dotrun_lib::project::Project;

pub use clean::cmd_clean;
pub use exec::cmd_exec;
pub use install::cmd_install;
pub use run::cmd_run;

/// Options shared by every command.
pub struct ProjectOptions {
  pub directory: PathBuf,
  pub overrides: BTreeMap<String, String>,
  pub skip_install: bool,
}

impl ProjectOptions {
  pub fn open(&self) -> Result<Project> {
    let project = Project::open(&self.directory, &self.overrides)?;
    debug!(root = %project.root().display(), "opened project");
    Ok(project)
  }
}

/// Run a future to completion on a fresh runtime, cancelling `cancel` on
/// Ctrl-C.
pub fn block_on<F: Future>(cancel: CancellationToken, future: F) -> Result<F::Output> {
  let rt = tokio::runtime::Runtime::new().context("Failed to create async runtime")?;
  Ok(rt.block_on(async move {
    let listener = spawn_interrupt_listener(cancel);
    let output = future.await;
    listener.abort();
    output
  }))
}
