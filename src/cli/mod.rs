//! CLI module for the Kafka GitOps tool.
//!
//! This module provides the command-line interface for validating state
//! files and planning and applying changes to a cluster.

mod commands;
mod output;

pub use commands::{Cli, Commands, OutputFormat};
pub use output::OutputFormatter;
