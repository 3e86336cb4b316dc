//! CLI argument definitions using clap

use std::path::PathBuf;

use clap::{ArgAction, Args, Parser, Subcommand, ValueHint};

/// Suppress low-value page sections by tagging them, on recorded page trees
#[derive(Parser, Debug)]
#[command(name = "declutter")]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
pub struct Cli {
    /// Verbosity: -d info, -dd debug, -ddd trace
    #[arg(short, long, action = ArgAction::Count, global = true)]
    pub debug: u8,

    /// Local config file, layered over the global one
    #[arg(short, long, global = true, value_hint = ValueHint::FilePath)]
    pub config: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Option<Commands>,
}

/// Page signals; override the `[page]` table of a tree file.
#[derive(Args, Debug, Clone, Default)]
pub struct PageArgs {
    /// Page title (article mode when it ends with the site suffix)
    #[arg(long)]
    pub title: Option<String>,

    /// Current path (feed mode when it equals the feed path)
    #[arg(long)]
    pub path: Option<String>,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Run one sweep over a tree file, or every tree file in a directory
    Sweep {
        /// Tree file or directory
        #[arg(value_hint = ValueHint::AnyPath)]
        input: PathBuf,
        #[command(flatten)]
        page: PageArgs,
    },

    /// Show a tree, marked nodes highlighted
    Tree {
        /// Tree file
        #[arg(value_hint = ValueHint::FilePath)]
        file: PathBuf,
        #[command(flatten)]
        page: PageArgs,
        /// Sweep before printing
        #[arg(long)]
        sweep: bool,
    },

    /// Replay a mutation script against a tree on a virtual clock
    Replay {
        /// Tree file
        #[arg(value_hint = ValueHint::FilePath)]
        file: PathBuf,
        /// Mutation script
        #[arg(value_hint = ValueHint::FilePath)]
        script: PathBuf,
        #[command(flatten)]
        page: PageArgs,
    },

    /// List the rule table
    Rules,

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
    /// Show effective settings
    Show,
    /// Print a commented config template
    Template,
    /// Show global config path
    Path,
}
