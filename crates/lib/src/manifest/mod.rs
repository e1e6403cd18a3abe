//! The project's package descriptor.
//!
//! `package.json` is read fresh on every call; nothing about it is cached
//! between operations so edits made by scripts are always seen.

mod types;

pub use types::*;
