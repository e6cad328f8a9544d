//! CLI interface for Waypoint
//!
//! This module provides the command-line interface using clap's derive API.
//! It defines all commands and global flags for driving a conductor run.

use clap::{Parser, Subcommand};
use std::path::PathBuf;

/// Waypoint plan-and-execute agent
///
/// Plans an objective into steps, executes them one at a time with the
/// configured tools, and replans until the objective is answered.
#[derive(Parser, Debug)]
#[command(name = "waypoint")]
#[command(version, about, long_about = None)]
pub struct Cli {
    /// Output in JSON format
    #[arg(long, global = true)]
    pub json: bool,

    /// Set log level (error, warn, info, debug, trace)
    #[arg(long, global = true, value_name = "LEVEL")]
    pub log: Option<String>,

    /// Specify alternate configuration file
    #[arg(long, global = true, value_name = "PATH")]
    pub config: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Command,
}

/// Available commands
#[derive(Subcommand, Debug)]
pub enum Command {
    /// Execute one run for an objective
    ///
    /// Each argument falls back to the pipeline task input of the same
    /// meaning, so the binary can run as an Azure Pipelines task step.
    Run {
        /// The objective to accomplish
        #[arg(env = "INPUT_PROMPT")]
        objective: String,

        /// Run mode (decision, execution)
        #[arg(long, env = "INPUT_MODE")]
        mode: String,

        /// Additional context as a JSON object
        #[arg(long, value_name = "JSON", env = "INPUT_ADDITIONALCONTEXT")]
        context: Option<String>,
    },

    /// List enabled tools
    Tools,

    /// Manage configuration
    Config {
        #[command(subcommand)]
        action: ConfigAction,
    },
}

/// Configuration management actions
#[derive(Subcommand, Debug)]
pub enum ConfigAction {
    /// Show current configuration
    Show,

    /// Print the configuration file path
    Path,
}
