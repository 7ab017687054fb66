// Library exports for conductor
// This allows the modules to be imported in tests and external code

pub mod cache;
pub mod config;
pub mod coordination;
pub mod daemon;
pub mod hooks;
pub mod planning;
pub mod triage;
pub mod utils;
pub mod workspace;
