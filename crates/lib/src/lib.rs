//! dotrun-lib: dependency convergence and script running for dotrun.
//!
//! This crate provides the pieces the `dotrun` binary is built from:
//! - `state`: the per-project `.dotrun.json` snapshot of dependency state
//! - `ecosystem`: change detection and install for Node and Python
//! - `process`: foreground and background command execution
//! - `project`: the orchestrator behind `dotrun <script>`, `install`, `exec`
//!   and `clean`

pub mod consts;
pub mod ecosystem;
pub mod env;
pub mod manifest;
pub mod process;
pub mod project;
pub mod settings;
pub mod state;
pub mod util;
