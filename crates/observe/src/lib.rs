//! Logging initialisation shared by the binaries and tests of the workspace.

pub mod config;
pub mod tracing;

pub use config::Config;
