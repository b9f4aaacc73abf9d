//! CLI argument definitions using clap

use std::path::PathBuf;

use clap::{Parser, Subcommand, ValueEnum, ValueHint};

use crate::domain::AggregationMode;

/// Hierarchical document lines: propagate edits, aggregate totals, keep indices and flat lists in sync
#[derive(Parser, Debug)]
#[command(name = "linetree")]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
pub struct Cli {
    /// Debug level: -d info, -dd debug, -ddd trace
    #[arg(short = 'd', long = "debug", global = true, action = clap::ArgAction::Count)]
    pub debug: u8,

    /// Account config file (default: <document dir>/.linetree.toml)
    #[arg(long, global = true, value_hint = ValueHint::FilePath, env = "LINETREE_ACCOUNT_CONFIG")]
    pub account_config: Option<PathBuf>,

    /// Write the resulting document here instead of in place
    #[arg(short, long, global = true, value_hint = ValueHint::FilePath)]
    pub output: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Option<Commands>,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Apply one edit payload to a document
    Recompute {
        /// Document file (JSON)
        #[arg(value_hint = ValueHint::FilePath)]
        document: PathBuf,
        /// Edit payload file (JSON), one line flagged "changed"
        #[arg(short, long, value_hint = ValueHint::FilePath)]
        edit: PathBuf,
    },

    /// Recalculate all prices and re-stamp top-level indices
    Reprice {
        /// Document file (JSON)
        #[arg(value_hint = ValueHint::FilePath)]
        document: PathBuf,
    },

    /// Print the flat line list as JSON
    Flatten {
        /// Document file (JSON)
        #[arg(value_hint = ValueHint::FilePath)]
        document: PathBuf,
        /// Override the configured aggregation mode
        #[arg(short, long, value_enum)]
        mode: Option<ModeArg>,
    },

    /// Show the line hierarchy as a tree
    Tree {
        /// Document file (JSON)
        #[arg(value_hint = ValueHint::FilePath)]
        document: PathBuf,
    },

    /// Print the start index of a new line
    #[command(name = "next-index")]
    NextIndex {
        /// Document file (JSON)
        #[arg(value_hint = ValueHint::FilePath)]
        document: PathBuf,
        /// Index of the parent line (default: new top-level line)
        #[arg(short, long)]
        parent: Option<String>,
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

#[derive(Subcommand, Debug)]
pub enum ConfigCommands {
    /// Show merged config
    Show {
        /// Document whose account config applies
        #[arg(value_hint = ValueHint::FilePath)]
        document: Option<PathBuf>,
    },

    /// Print a commented config template
    Template,

    /// Show config paths
    Path {
        /// Document whose account config applies
        #[arg(value_hint = ValueHint::FilePath)]
        document: Option<PathBuf>,
    },
}

/// Aggregation mode as spelled on the command line.
#[derive(ValueEnum, Debug, Clone, Copy, PartialEq, Eq)]
pub enum ModeArg {
    All,
    OnlyLeaves,
    OnlyTopLevel,
}

impl From<ModeArg> for AggregationMode {
    fn from(mode: ModeArg) -> Self {
        match mode {
            ModeArg::All => AggregationMode::All,
            ModeArg::OnlyLeaves => AggregationMode::OnlyLeaves,
            ModeArg::OnlyTopLevel => AggregationMode::OnlyTopLevel,
        }
    }
}
