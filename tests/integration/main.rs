//! Integration tests for conductor
//!
//! These tests run the daemon in-process on an ephemeral port and drive
//! it through the HTTP client, alongside end-to-end checks of the
//! registry, hook routing, triage and planning layers.

// Test utilities and common setup
mod common;

mod cache_tests;
mod client_tests;
mod daemon_tests;
mod hooks_tests;
mod planning_tests;
mod registry_tests;
mod workspace_tests;

// Re-export common utilities for use by test modules
pub use common::*;
