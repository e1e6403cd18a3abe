//! Implementation of the `dotrun install` command.
//!
//! Always reinstalls: change detection is bypassed, and the fresh state is
//! recorded afterwards so the next `dotrun <script>` sees nothing to do.

use std::time::Instant;

use anyhow::Result;

use dotrun_lib::ecosystem::InstallOutcome;

use super::{ProjectOptions, block_on};
use crate::output::{format_duration, print_info, print_success};

pub fn cmd_install(options: &ProjectOptions) -> Result<()> {
  let mut project = options.open()?;

  let started = Instant::now();
  let report = block_on(project.cancellation_token(), project.install(true))??;

  for (label, outcome) in [("Node", report.node), ("Python", report.python)] {
    match outcome {
      InstallOutcome::Installed(_) => print_success(&format!("{label} dependencies installed")),
      InstallOutcome::UpToDate => print_info(&format!("{label} dependencies up to date")),
      InstallOutcome::Skipped => print_info(&format!("{label} dependencies skipped")),
    }
  }
  print_info(&format!("Done in {}", format_duration(started.elapsed())));

  Ok(())
}
