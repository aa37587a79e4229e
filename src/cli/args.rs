//! CLI argument definitions using clap

use std::path::PathBuf;

use clap::{ArgAction, Parser, Subcommand, ValueHint};

/// Log template miner: learns a generalized tree of templates from raw logs and emits a parser specification
#[derive(Parser, Debug)]
#[command(name = "logsmith")]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
pub struct Cli {
    /// Enable debug logging, repeat for more detail
    #[arg(short, long, global = true, action = ArgAction::Count)]
    pub debug: u8,

    /// Configuration file (default: ./logsmith.toml, then global config)
    #[arg(short, long, global = true, value_hint = ValueHint::FilePath)]
    pub config: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Option<Commands>,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Mine templates and write all configured artifacts
    Mine {
        /// Log file or directory (overrides input_file from config)
        #[arg(value_hint = ValueHint::AnyPath)]
        input: Option<PathBuf>,
    },

    /// Mine and print the template tree to stdout
    Tree {
        /// Log file or directory (overrides input_file from config)
        #[arg(value_hint = ValueHint::AnyPath)]
        input: Option<PathBuf>,
    },

    /// Mine and print one template per line to stdout
    Templates {
        /// Log file or directory (overrides input_file from config)
        #[arg(value_hint = ValueHint::AnyPath)]
        input: Option<PathBuf>,
    },

    /// Manage settings
    Config {
        #[command(subcommand)]
        command: ConfigCommands,
    },

    /// Generate shell completions
    Completion {
        /// Shell type
        #[arg(value_enum)]
        shell: clap_complete::Shell,
    },
}

/// Config subcommands
#[derive(Subcommand, Debug)]
pub enum ConfigCommands {
    /// Show merged config
    Show,

    /// Create config template
    Init {
        /// Create global config
        #[arg(short, long)]
        global: bool,
    },

    /// Show config paths
    Path,
}
