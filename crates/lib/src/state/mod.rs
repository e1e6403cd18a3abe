//! Persisted dependency state.
//!
//! Each ecosystem's last successful install is fingerprinted as a
//! [`DependencyState`] and stored under its [`StateKey`] in the project's
//! state file. Comparing a freshly computed state against the stored one is
//! how reinstalls are decided.

mod store;
mod types;

pub use store::StateStore;
pub use types::*;
