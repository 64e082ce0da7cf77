use std::path::PathBuf;

use clap::{Parser, Subcommand};
use clap_complete::Shell;

#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
pub struct Args {
    #[command(subcommand)]
    pub command: Commands,

    /// Path to the configuration file
    #[arg(short, long, global = true, env = "PCSLOGIN_CONFIG")]
    pub config: Option<PathBuf>,

    /// Enable debug logging
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Only log errors
    #[arg(short, long, global = true, conflicts_with = "verbose")]
    pub quiet: bool,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Log in by scanning a QR code with the Baidu Netdisk app
    Login {
        /// Where to save the QR code image
        #[arg(long)]
        image: Option<PathBuf>,

        /// Seconds between two status polls
        #[arg(long)]
        poll_interval: Option<u64>,

        /// Give up after this many seconds without confirmation
        #[arg(long)]
        poll_timeout: Option<u64>,

        /// Print the resulting credential as JSON
        #[arg(long)]
        json: bool,
    },

    /// Show the stored accounts
    Who,

    /// Print the bdstoken of the active account
    Bdstoken,

    /// Show or reset the configuration
    Config {
        #[arg(long)]
        show: bool,

        #[arg(long)]
        reset: bool,
    },

    /// Generate shell completions
    Completions { shell: Shell },
}
