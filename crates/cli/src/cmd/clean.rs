//! Implementation of the `dotrun clean` command.

use anyhow::Result;

use super::{ProjectOptions, block_on};
use crate::output::print_success;

/// Remove dependencies, the virtualenv, the state file and any compose
/// services. Missing pieces are not an error.
pub fn cmd_clean(options: &ProjectOptions) -> Result<()> {
  let mut project = options.open()?;
  block_on(project.cancellation_token(), project.clean())??;

  print_success(&format!("Cleaned {}", project.root().display()));
  Ok(())
}
