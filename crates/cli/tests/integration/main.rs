//! End-to-end tests driving the `dotrun` binary against stub package
//! managers.

#![cfg(unix)]

mod clean_tests;
mod common;
mod interrupt_tests;
mod run_tests;
