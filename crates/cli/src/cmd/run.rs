//! Implementation of `dotrun <script>`.

use anyhow::Result;

use super::{ProjectOptions, block_on};

/// Run a `package.json` script after making sure dependencies are current.
///
/// The script's own exit code becomes ours when it fails.
pub fn cmd_run(options: &ProjectOptions, script: &str, args: &[String]) -> Result<()> {
  let mut project = options.open()?;
  block_on(project.cancellation_token(), project.start(script, args, options.skip_install))??;
  Ok(())
}
