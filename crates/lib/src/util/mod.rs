//! Shared utilities.
//!
//! Content hashing and directory scans, plus stub tools and helpers for
//! tests.

pub mod hash;
pub mod walk;
