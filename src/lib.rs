// ABOUTME: Library root for dvm - exposes public types for testing.
// ABOUTME: The main binary is in main.rs.

pub mod config;
pub mod mounts;
pub mod naming;
pub mod platform;
pub mod runtime;
pub mod shell;
pub mod ssh_agent;
pub mod term;
