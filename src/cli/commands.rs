//! CLI command definitions using clap.
//!
//! Defines the main CLI structure and subcommands:
//! - run: poll every account until Ctrl-C (default)
//! - once: one cycle per account, then exit
//! - check: load and pair credentials, no network

use clap::{Parser, Subcommand};
use std::path::PathBuf;

/// Pinpoll - multi-account task polling client
#[derive(Parser, Debug)]
#[command(name = "pinpoll")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// Optional config file path
    #[arg(short, long, global = true)]
    pub config: Option<PathBuf>,

    /// Verbose output
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Token file, one bearer token per line (overrides config)
    #[arg(short, long, global = true)]
    pub tokens: Option<PathBuf>,

    /// Proxy file, one proxy per line (overrides config)
    #[arg(short, long, global = true)]
    pub proxies: Option<PathBuf>,

    /// Subcommand to execute
    #[command(subcommand)]
    pub command: Option<Commands>,
}

impl Cli {
    /// Check if verbose mode is enabled
    pub fn is_verbose(&self) -> bool {
        self.verbose
    }
}

/// Main subcommands
#[derive(Subcommand, Debug, Clone, PartialEq, Eq)]
pub enum Commands {
    /// Poll every account until interrupted
    Run,

    /// Run a fixed number of cycles per account, then exit
    Once {
        /// Cycles per account
        #[arg(short = 'n', long, default_value_t = 1)]
        cycles: u64,
    },

    /// Load and pair credentials without contacting the service
    Check,
}
