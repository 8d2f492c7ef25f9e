//! User interface and interaction
//!
//! This module contains the components used by the command line consumer:
//! CLI parsing, terminal colors and progress reporting.

pub mod cli;
pub mod color;
pub mod progress;

// Re-export commonly used items
pub use cli::{Cli, cli_to_config, validate_cli_args};
pub use progress::ProgressReporter;
