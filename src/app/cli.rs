//! Command-Line Interface

use clap::{Parser, Subcommand};
use std::path::PathBuf;

/// motion-sense - Debounced moving/stationary detection from location streams
#[derive(Parser, Debug)]
#[command(name = "motion-sense")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// Subcommand to run
    #[command(subcommand)]
    pub command: Commands,

    /// Enable verbose output
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Config file path
    #[arg(short, long, global = true)]
    pub config: Option<PathBuf>,
}

/// Available commands
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Classify a live sample stream from stdin (JSON lines)
    Watch {
        /// Save the captured samples as a track log (name without extension)
        #[arg(short, long)]
        output: Option<String>,

        /// Note to store in the track metadata
        #[arg(short, long)]
        note: Option<String>,
    },

    /// Replay a track log through the classifier in real time
    Replay {
        /// Input track log file
        #[arg(short, long)]
        input: PathBuf,

        /// Playback rate multiplier (default from config)
        #[arg(short, long)]
        rate: Option<f64>,

        /// Ignore recorded pacing and replay flat-out
        #[arg(long)]
        fast: bool,
    },

    /// Analyze a track log offline and report motion statistics
    Analyze {
        /// Input track log file
        input: PathBuf,
    },

    /// List saved track logs
    List {
        /// Show detailed information
        #[arg(short, long)]
        detailed: bool,
    },

    /// Initialize configuration
    Init {
        /// Force overwrite existing config
        #[arg(short, long)]
        force: bool,
    },

    /// View or modify configuration
    Config {
        #[command(subcommand)]
        action: ConfigAction,
    },
}

/// Config subcommands
#[derive(Subcommand, Debug)]
pub enum ConfigAction {
    /// Show current configuration
    Show,

    /// Set a configuration value
    Set {
        /// Configuration key (e.g., "classifier.decay_secs")
        key: String,

        /// Value to set
        value: String,
    },

    /// Get a specific configuration value
    Get {
        /// Configuration key
        key: String,
    },

    /// Reset configuration to defaults
    Reset {
        /// Skip confirmation prompt
        #[arg(short, long)]
        force: bool,
    },
}

impl Cli {
    /// Parse command line arguments
    pub fn parse_args() -> Self {
        Self::parse()
    }

    /// Get the track log directory
    pub fn tracks_dir() -> PathBuf {
        dirs::home_dir()
            .map(|h| h.join(".motion_sense").join("tracks"))
            .unwrap_or_else(|| PathBuf::from("tracks"))
    }
}
