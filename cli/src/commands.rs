pub mod info;
pub mod run;

use std::path::PathBuf;

use clap::{ArgAction, Parser, Subcommand};
use qualisys_common::network::ConnectionUrl;

#[derive(Parser, Debug)]
#[command(name = "skybrush-qualisys")]
#[command(about = "Streams rigid body poses from Qualisys Track Manager.")]
pub struct CommandLine {
    #[command(subcommand)]
    pub command: Commands,

    /// Print received frames as JSON lines on standard output
    #[arg(long, global = true)]
    pub json: bool,

    /// Show debug messages
    #[arg(short, long, global = true, action = ArgAction::Count, conflicts_with = "quiet")]
    pub verbose: u8,

    /// Only show warnings and errors
    #[arg(short, long, global = true, action = ArgAction::Count)]
    pub quiet: u8,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// List the available extensions and their configuration schema
    #[command(alias = "i")]
    Info,
    /// Run the extensions enabled in the configuration file
    #[command(alias = "r")]
    Run {
        /// JSON configuration file; without it only `qualisys` runs, with defaults
        #[arg(short, long, env = "QUALISYS_CONFIG")]
        config: Option<PathBuf>,

        /// Overrides the connection URL of the `qualisys` extension
        #[arg(long)]
        connection: Option<ConnectionUrl>,
    },
}

impl CommandLine {
    pub fn parse_args() -> Self {
        Self::parse()
    }
}

// ╔════════════════════════════════════════════╗
// ║ ████████╗███████╗███████╗████████╗███████╗ ║
// ║ ╚══██╔══╝██╔════╝██╔════╝╚══██╔══╝██╔════╝ ║
// ║    ██║   █████╗  ███████╗   ██║   ███████╗ ║
// ║    ██║   ██╔══╝  ╚════██║   ██║   ╚════██║ ║
// ║    ██║   ███████╗███████║   ██║   ███████║ ║
// ║    ╚═╝   ╚══════╝╚══════╝   ╚═╝   ╚══════╝ ║
// ╚════════════════════════════════════════════╝
