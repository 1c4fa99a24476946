// ABOUTME: Library root for shipline - exposes public types for testing.
// ABOUTME: The main binary is in main.rs.

pub mod backend;
pub mod config;
pub mod diagnostics;
pub mod error;
pub mod hooks;
pub mod output;
pub mod pipeline;
pub mod types;
