//! CLI argument parsing

use clap::{Parser, Subcommand};
use std::path::PathBuf;

use crate::config::{COMPOSE_FILE_ENV, DEFAULT_LOG_TAIL};

#[derive(Parser)]
#[command(name = "onion-portal")]
#[command(author, version, about = "Run the Tor/I2P browser stack and keep the I2P proxy settings in line", long_about = None)]
pub struct Args {
    #[command(subcommand)]
    pub command: SubCommand,

    /// Compose file describing the stack (defaults to docker-compose.yml next to the binary)
    #[arg(long, global = true, env = COMPOSE_FILE_ENV, value_name = "PATH")]
    pub compose_file: Option<PathBuf>,

    /// Output format as JSON
    #[arg(long, global = true)]
    pub json: bool,

    /// Verbose output
    #[arg(short, long, global = true)]
    pub verbose: bool,
}

#[derive(Subcommand)]
pub enum SubCommand {
    /// Build and start the stack, then sync the I2P browser proxy settings
    Up {
        /// Seconds to wait for the I2P browser to be running
        #[arg(long, default_value = "120", value_name = "SECS")]
        timeout: u64,

        /// Milliseconds between readiness checks
        #[arg(long, default_value = "2000", value_name = "MS")]
        poll_interval: u64,
    },

    /// Stop and remove the stack
    Down,

    /// Show the state of the stack's containers
    Status,

    /// Show recent logs (follows until Ctrl+C)
    Logs {
        /// Number of lines to show per service
        #[arg(long, default_value_t = DEFAULT_LOG_TAIL)]
        tail: u32,

        /// Print and exit instead of following
        #[arg(long)]
        no_follow: bool,
    },

    /// Sync the I2P browser proxy settings on a running stack
    SyncPrefs,

    /// Show the proxy preference policy
    Prefs {
        /// Also print the patch script sent to the container
        #[arg(long)]
        script: bool,
    },

    /// List service URLs
    Urls,

    /// Interactive menu
    Menu,
}
