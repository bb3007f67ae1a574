//! CLI module for Engage.

pub mod commands;
mod output;

pub use output::Output;

use clap::{Parser, Subcommand};

/// Engage - knowledge-base, RAG chat and review-form backend
///
/// Serves the REST API used by chat widgets and review forms.
#[derive(Parser, Debug)]
#[command(name = "engage")]
#[command(version, about, long_about = None)]
pub struct Cli {
    /// Increase verbosity (-v for info, -vv for debug, -vvv for trace)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Path to configuration file
    #[arg(short, long, global = true)]
    pub config: Option<String>,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Start the HTTP API server
    Serve {
        /// Host to bind to (overrides HOST and the config file)
        #[arg(long)]
        host: Option<String>,

        /// Port to bind to (overrides PORT and the config file)
        #[arg(short, long)]
        port: Option<u16>,
    },

    /// Check configuration and connectivity to external services
    Doctor,

    /// Manage configuration
    Config {
        #[command(subcommand)]
        action: ConfigAction,
    },
}

#[derive(Subcommand, Debug)]
pub enum ConfigAction {
    /// Show current configuration with secrets masked
    Show,

    /// Show configuration file path
    Path,

    /// Write a default configuration file
    Init {
        /// Overwrite an existing file
        #[arg(short, long)]
        force: bool,
    },
}
