use clap::{Parser, Subcommand};
use framekeeper_common::CodecFamily;
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "framekeeper")]
#[command(
    author,
    version,
    about = "Preservation transcoding with frame-level verification"
)]
pub struct Cli {
    /// Path to config file
    #[arg(short, long, global = true, env = "FRAMEKEEPER_CONFIG")]
    pub config: Option<PathBuf>,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Take one source asset through transcode, verification and conformance.
    /// The exit code reports the terminal state.
    Process {
        /// Source asset inside the arrivals directory
        #[arg(required = true)]
        input: PathBuf,
    },

    /// Probe a media file and display its profile
    Probe {
        /// File to probe
        #[arg(required = true)]
        file: PathBuf,

        /// Output as JSON
        #[arg(long)]
        json: bool,
    },

    /// Show the preset and encoder arguments a file would get, without encoding
    Resolve {
        /// File to resolve
        #[arg(required = true)]
        file: PathBuf,

        /// Target codec family (defaults to the configured one)
        #[arg(long)]
        codec: Option<CodecFamily>,
    },

    /// Compare the clamped frame digests of two files
    Verify {
        /// Source asset
        source: PathBuf,

        /// Derived asset
        derived: PathBuf,
    },

    /// Check a file against conformance policies
    Check {
        /// File to check
        #[arg(required = true)]
        file: PathBuf,

        /// Policy document (repeatable; defaults to the configured ones)
        #[arg(long)]
        policy: Vec<PathBuf>,
    },

    /// Check that required external tools are available
    CheckTools,

    /// Validate configuration file
    Validate {
        /// Config file to validate (uses default if not specified)
        config: Option<PathBuf>,
    },

    /// Display version information
    Version,
}
