//! CLI argument definitions using clap

use std::path::PathBuf;

use clap::{Parser, Subcommand, ValueEnum, ValueHint};

use crate::application::ExportFormat;
use crate::domain::EditOp;

/// Work-breakdown-structure editor: build, reorder and export WBS documents
#[derive(Parser, Debug)]
#[command(name = "wbsed")]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
pub struct Cli {
    /// Verbosity (-v info, -vv debug, -vvv trace)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Project directory for `.wbsed.toml` and untitled documents (default: cwd)
    #[arg(short = 'C', long, global = true)]
    pub project_dir: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Option<Commands>,
}

/// Items are addressed by their display number (root is 0).
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Create a new document (untitled<n>.wbs when no file is given)
    New {
        #[arg(value_hint = ValueHint::FilePath)]
        file: Option<PathBuf>,
        /// Root item name
        #[arg(long)]
        root: Option<String>,
    },

    /// Show the document as an outline
    Show {
        #[arg(value_hint = ValueHint::FilePath)]
        file: PathBuf,
    },

    /// Show the document as a table
    Table {
        #[arg(value_hint = ValueHint::FilePath)]
        file: PathBuf,
        /// Collapse these items
        #[arg(long, value_delimiter = ',')]
        collapse: Vec<usize>,
    },

    /// Add an item below (or next to) another one
    Add {
        #[arg(value_hint = ValueHint::FilePath)]
        file: PathBuf,
        /// Parent item, or the preceding sibling with --sibling
        item: usize,
        /// Item name
        #[arg(short, long)]
        name: Option<String>,
        /// Insert as next sibling instead of last child
        #[arg(long)]
        sibling: bool,
        /// Duration in hours
        #[arg(short, long)]
        duration: Option<f64>,
        /// Resource expression, e.g. "Bob[50%], Ann"
        #[arg(short, long)]
        resource: Option<String>,
    },

    /// Run a structural edit (shift-in, delete-node, ...)
    Edit {
        #[arg(value_hint = ValueHint::FilePath)]
        file: PathBuf,
        /// Operation name
        op: EditOp,
        item: usize,
        /// Skip the confirmation of destructive edits
        #[arg(short, long)]
        yes: bool,
    },

    /// Press a key chord with one item selected (alt+up, delete, ...)
    Key {
        #[arg(value_hint = ValueHint::FilePath)]
        file: PathBuf,
        item: usize,
        chord: String,
        /// Skip the confirmation of destructive edits
        #[arg(short, long)]
        yes: bool,
    },

    /// Set a field of an item
    Set {
        #[arg(value_hint = ValueHint::FilePath)]
        file: PathBuf,
        item: usize,
        #[arg(value_enum)]
        field: FieldName,
        value: String,
    },

    /// Move an item below another parent (appended last)
    Move {
        #[arg(value_hint = ValueHint::FilePath)]
        file: PathBuf,
        item: usize,
        parent: usize,
    },

    /// Duplicate an item (with --deep: including its subtree)
    Duplicate {
        #[arg(value_hint = ValueHint::FilePath)]
        file: PathBuf,
        item: usize,
        /// Copy the whole subtree
        #[arg(long)]
        deep: bool,
        /// Target parent for deep copies (default: the item's parent)
        #[arg(long, requires = "deep")]
        to: Option<usize>,
    },

    /// Export as indented text or CSV
    Export {
        #[arg(value_hint = ValueHint::FilePath)]
        file: PathBuf,
        /// Output format (default from config)
        #[arg(short, long)]
        format: Option<ExportFormat>,
        /// Output file (default: stdout)
        #[arg(short, long, value_hint = ValueHint::FilePath)]
        output: Option<PathBuf>,
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

#[derive(ValueEnum, Clone, Copy, Debug, PartialEq, Eq)]
pub enum FieldName {
    Name,
    Duration,
    Resource,
    Notes1,
    Notes2,
    Color,
    /// Color of the item and all its siblings
    GroupColor,
    /// Comma-separated display numbers
    Predecessors,
}

#[derive(Subcommand, Debug)]
pub enum ConfigCommands {
    /// Show merged config
    Show,

    /// Show config paths
    Path,

    /// Print a config template
    Template,
}
