//! CLI command definitions.
//!
//! This module defines all CLI commands and their arguments using clap.

use clap::{Parser, Subcommand};
use std::path::PathBuf;

use crate::planner::PlanOptions;

/// Kafka GitOps - Declarative topic and ACL management for Kafka clusters.
#[derive(Parser, Debug)]
#[command(name = "kafka-gitops")]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
pub struct Cli {
    /// Path to the desired state file.
    #[arg(
        short,
        long,
        global = true,
        env = "KAFKA_GITOPS_STATE_FILE",
        default_value = "state.yaml"
    )]
    pub file: PathBuf,

    /// Enable verbose output.
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Never delete topics or ACLs.
    #[arg(long, global = true)]
    pub no_delete: bool,

    /// Do not plan or apply ACLs.
    #[arg(long, global = true)]
    pub skip_acls: bool,

    /// Do not plan or apply topics.
    #[arg(long, global = true)]
    pub skip_topics: bool,

    /// Output format (text, json).
    #[arg(long, global = true, default_value = "text")]
    pub output: OutputFormat,

    /// Subcommand to execute.
    #[command(subcommand)]
    pub command: Commands,
}

/// Available CLI commands.
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Validate the desired state file.
    Validate {
        /// Show all warnings, not just errors.
        #[arg(short, long)]
        warnings: bool,
    },

    /// Generate and display an execution plan.
    Plan {
        /// Write the plan to this file.
        #[arg(short, long)]
        out: Option<PathBuf>,

        /// Keep unchanged entries in the written plan.
        #[arg(long)]
        include_unchanged: bool,
    },

    /// Apply changes to the cluster.
    Apply {
        /// Apply a previously written plan instead of planning afresh.
        #[arg(short, long)]
        plan: Option<PathBuf>,

        /// Skip confirmation prompt.
        #[arg(short, long)]
        yes: bool,
    },

    /// Create missing Confluent Cloud service accounts.
    Account,
}

/// Output format options.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, clap::ValueEnum)]
pub enum OutputFormat {
    /// Human-readable text output.
    #[default]
    Text,
    /// JSON output for scripting.
    Json,
}

impl Cli {
    /// Parses CLI arguments from the command line.
    #[must_use]
    pub fn parse_args() -> Self {
        Self::parse()
    }

    /// Returns the plan options selected by the global flags.
    #[must_use]
    pub const fn plan_options(&self) -> PlanOptions {
        PlanOptions {
            delete_disabled: self.no_delete,
            skip_topics: self.skip_topics,
            skip_acls: self.skip_acls,
        }
    }
}
