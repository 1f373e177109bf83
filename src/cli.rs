use clap::{Args, Parser, Subcommand};
use clap_complete::Shell;

use crate::config::ColorMode;

#[derive(Parser)]
#[command(name = "stackview")]
#[command(author = "Alberto Cavalcante")]
#[command(version)]
#[command(
    about = "Resource tree and structural diffs for infrastructure change runs",
    long_about = None
)]
#[command(propagate_version = true)]
pub struct Cli {
    /// Verbosity level
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Suppress non-essential output
    #[arg(short, long, global = true)]
    pub quiet: bool,

    /// When to use colors (overrides config)
    #[arg(long, value_enum, global = true)]
    pub color: Option<ColorMode>,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand)]
pub enum Command {
    /// Reconcile an event log and print the resource tree
    Show(ShowArgs),

    /// Print the property diff of one resource, or of every changed one
    Diff(DiffArgs),

    /// Follow an event log that is still being written
    Watch(WatchArgs),

    /// Generate shell completions
    Completions {
        /// Shell to generate completions for
        #[arg(value_enum)]
        shell: Shell,
    },
}

/// Options shared by commands that render the tree
#[derive(Args, Debug, Clone, Default)]
pub struct ViewArgs {
    /// Include resources without changes
    #[arg(short, long)]
    pub all: bool,

    /// Only show resources whose type, name or message contains TEXT
    #[arg(short, long, value_name = "TEXT")]
    pub filter: Option<String>,

    /// Rows per frame (overrides config)
    #[arg(long, value_name = "N")]
    pub height: Option<usize>,

    /// Run kind to report (preview, update, refresh, destroy)
    #[arg(long)]
    pub kind: Option<String>,

    /// Show secret values instead of masking them
    #[arg(long)]
    pub reveal_secrets: bool,
}

#[derive(Args, Debug)]
pub struct ShowArgs {
    /// Engine event log (one JSON event per line, `-` for stdin)
    pub log: Option<String>,

    #[command(flatten)]
    pub view: ViewArgs,

    /// Move the cursor to the resource with this URN, or whose name contains it
    #[arg(short, long, value_name = "URN|NAME")]
    pub select: Option<String>,

    /// Also print the diff of the selected resource
    #[arg(short, long)]
    pub diff: bool,

    /// Print the frame as JSON
    #[arg(long)]
    pub json: bool,
}

#[derive(Args, Debug)]
pub struct DiffArgs {
    /// Engine event log (one JSON event per line, `-` for stdin)
    pub log: String,

    /// Resource URN, or a substring of its name
    #[arg(required_unless_present = "all_resources")]
    pub target: Option<String>,

    /// Diff every changed resource
    #[arg(long, conflicts_with = "target")]
    pub all_resources: bool,

    /// Include unchanged properties
    #[arg(short, long)]
    pub unchanged: bool,

    /// Show secret values instead of masking them
    #[arg(long)]
    pub reveal_secrets: bool,

    /// Print the diff as JSON
    #[arg(long)]
    pub json: bool,
}

#[derive(Args, Debug)]
pub struct WatchArgs {
    /// Engine event log being written by a running engine
    pub log: Option<String>,

    #[command(flatten)]
    pub view: ViewArgs,

    /// Give up after this many seconds
    #[arg(long, value_name = "SECS")]
    pub timeout: Option<u64>,

    /// Poll interval in milliseconds at end of file
    #[arg(long, default_value_t = 100, value_name = "MS")]
    pub poll: u64,
}
