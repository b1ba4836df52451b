//! CLI module for pinpoll - command-line interface and subcommands.
//!
//! Runs the account loops by default, with subcommands for a single pass and
//! for checking credential files without touching the network.

pub mod commands;

pub use commands::Cli;
