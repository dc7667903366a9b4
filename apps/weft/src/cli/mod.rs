//! # Weft CLI Module
//!
//! This module implements the CLI interface for Weft.
//!
//! ## Available Commands
//!
//! - `server` - Start the HTTP server
//! - `run` - Execute a script of graph and cache operations
//! - `match` - Test a wildcard pattern against names
//! - `classify` - Report starting tier and context weight for keys
//! - (no subcommand) - Show the built-in default tuning

mod commands;

use clap::{Parser, Subcommand};
use std::path::PathBuf;
use weft_core::WeftError;

pub use commands::*;

// =============================================================================
// CLI STRUCTURE
// =============================================================================

/// Weft - Dependency-Aware State Server
///
/// An in-process reactive fact graph and tiered cache.
/// Facts recompute on demand when their inputs change; cache entries
/// migrate between retention tiers by access frequency and key structure.
#[derive(Parser, Debug)]
#[command(name = "weft")]
#[command(version, about, long_about = None)]
pub struct Cli {
    /// Suppress banner output
    #[arg(short, long, global = true)]
    pub quiet: bool,

    /// Output in JSON format (for programmatic access)
    #[arg(long, global = true)]
    pub json_mode: bool,

    /// Subcommand to execute
    #[command(subcommand)]
    pub command: Option<Commands>,
}

/// Available CLI commands.
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Start HTTP server
    Server {
        /// Host to bind to
        #[arg(short = 'H', long, default_value = "127.0.0.1")]
        host: String,

        /// Port to bind to
        #[arg(short, long, default_value = "8080")]
        port: u16,

        /// TOML file with server and cache tuning overrides
        #[arg(short, long)]
        config: Option<PathBuf>,
    },

    /// Execute a script of operations against fresh in-memory instances
    Run {
        /// Path to the script file (JSON array of operations)
        #[arg(short, long)]
        file: PathBuf,
    },

    /// Test a wildcard pattern against names
    Match {
        /// Pattern to test, e.g. "tavolo.*.stato"
        pattern: String,

        /// Names to match against the pattern
        names: Vec<String>,
    },

    /// Report the starting tier and context weight of keys
    Classify {
        /// Keys to classify
        keys: Vec<String>,
    },
}

// =============================================================================
// COMMAND EXECUTION
// =============================================================================

/// Execute the CLI with parsed arguments.
pub async fn execute(cli: Cli) -> Result<(), WeftError> {
    let json_mode = cli.json_mode;

    match cli.command {
        Some(Commands::Server { host, port, config }) => {
            cmd_server(&host, port, config.as_deref()).await
        }
        Some(Commands::Run { file }) => cmd_run(&file, json_mode),
        Some(Commands::Match { pattern, names }) => cmd_match(&pattern, &names, json_mode),
        Some(Commands::Classify { keys }) => cmd_classify(&keys, json_mode),
        None => {
            // No subcommand - show the built-in tuning by default
            cmd_defaults(json_mode)
        }
    }
}
