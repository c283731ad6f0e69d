//! CLI argument parsing.

use clap::{Parser, Subcommand};
use std::path::PathBuf;

/// Manage Cognito User Pool identity provider links declaratively.
#[derive(Debug, Parser)]
#[command(name = "idp-linkctl")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// Enable protocol-level diagnostics (forces DEBUG logging).
    #[arg(long)]
    pub debug: bool,

    /// Path to the JSON configuration document.
    #[arg(short, long, env = "IDP_LINK_CONFIG")]
    pub config: Option<PathBuf>,

    /// Subcommand to execute.
    #[command(subcommand)]
    pub command: Command,
}

/// CLI commands.
#[derive(Debug, Subcommand)]
pub enum Command {
    /// Print provider metadata and the link resource schema as JSON.
    Schema,

    /// Show the changes apply would make, without refreshing.
    Plan,

    /// Refresh state and converge the directory on the declared links.
    Apply,

    /// Probe every managed link and drop the ones that are gone.
    Refresh,

    /// Unlink every managed link.
    Destroy,

    /// Record an existing link under NAME by its ID.
    Import {
        /// Resource name to record the link under.
        name: String,

        /// Link ID (`pool:destination-value:source-value`).
        id: String,
    },
}

impl Command {
    /// Whether the command needs a configuration document
    pub fn needs_config(&self) -> bool {
        !matches!(self, Command::Schema)
    }
}
