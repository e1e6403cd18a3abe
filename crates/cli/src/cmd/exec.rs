//! Implementation of the `dotrun exec` command.

use anyhow::Result;

use super::{ProjectOptions, block_on};

pub fn cmd_exec(options: &ProjectOptions, command: &[String]) -> Result<()> {
  let mut project = options.open()?;
  block_on(project.cancellation_token(), project.exec(command))??;
  Ok(())
}
