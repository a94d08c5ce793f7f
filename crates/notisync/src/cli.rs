//! Clap derive structures for the `notisync` CLI.
//!
//! Defines the command tree, global flags, and shared value enums.

use clap::{Args, Parser, Subcommand, ValueEnum};

use notisync_core::{Category, Priority, ReadStatus};

// ── Top-Level CLI ────────────────────────────────────────────────────

/// notisync -- a terminal client for your notification inbox
#[derive(Debug, Parser)]
#[command(
    name = "notisync",
    version,
    about = "Read and manage notifications from the command line",
    long_about = "Browse, triage, and live-follow a notification inbox.\n\n\
        One-shot commands talk to the REST API; `watch` keeps a push\n\
        connection open with a polling fallback.",
    propagate_version = true,
    subcommand_required = true,
    arg_required_else_help = true
)]
pub struct Cli {
    #[command(flatten)]
    pub global: GlobalOpts,

    #[command(subcommand)]
    pub command: Command,
}

// ── Global Options ───────────────────────────────────────────────────

#[derive(Debug, Args)]
pub struct GlobalOpts {
    /// Server profile to use
    #[arg(long, short = 'p', env = "NOTISYNC_PROFILE", global = true)]
    pub profile: Option<String>,

    /// REST API root (overrides profile)
    #[arg(long, env = "NOTISYNC_API_URL", global = true)]
    pub api_url: Option<String>,

    /// Bearer token (overrides profile, token_env, NOTISYNC_TOKEN, and keyring)
    #[arg(long, global = true)]
    pub token: Option<String>,

    /// Output format [default: config `defaults.output`, else table]
    #[arg(long, short = 'o', env = "NOTISYNC_OUTPUT", global = true)]
    pub output: Option<OutputFormat>,

    /// When to use color output [default: config `defaults.color`, else auto]
    #[arg(long, global = true)]
    pub color: Option<ColorMode>,

    /// Increase verbosity (-v, -vv, -vvv)
    #[arg(long, short = 'v', action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Suppress non-error output
    #[arg(long, short = 'q', global = true)]
    pub quiet: bool,

    /// Request timeout in seconds (overrides profile)
    #[arg(long, env = "NOTISYNC_TIMEOUT", global = true)]
    pub timeout: Option<u64>,
}

// ── Output & Color Enums ─────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum OutputFormat {
    /// Pretty table (default, interactive)
    Table,
    /// Pretty-printed JSON
    Json,
    /// Compact single-line JSON
    JsonCompact,
    /// YAML
    Yaml,
    /// Plain text, one value per line (scripting)
    Plain,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum ColorMode {
    /// Auto-detect (color if terminal is interactive)
    Auto,
    /// Always emit color codes
    Always,
    /// Never emit color codes
    Never,
}

// ── Top-Level Command Enum ───────────────────────────────────────────

#[derive(Debug, Subcommand)]
pub enum Command {
    /// List notifications
    #[command(alias = "ls")]
    List(ListArgs),

    /// Show a notification and mark it read
    Open(IdArg),

    /// Mark a notification as read
    Read(IdArg),

    /// Mark a notification as unread
    Unread(IdArg),

    /// Delete a notification
    #[command(alias = "rm")]
    Delete(IdArg),

    /// Mark every notification as read
    ReadAll,

    /// Delete every notification
    Clear,

    /// Follow the inbox live until interrupted
    Watch(WatchArgs),

    /// Manage CLI configuration and profiles
    Config(ConfigArgs),

    /// Generate shell completions
    Completions(CompletionsArgs),
}

// ── Notification commands ────────────────────────────────────────────

#[derive(Debug, Args)]
pub struct ListArgs {
    /// Only this category
    #[arg(long = "type", short = 't', value_enum)]
    pub kind: Option<CategoryArg>,

    /// Only read or unread entries
    #[arg(long, short = 's', value_enum)]
    pub status: Option<StatusArg>,

    /// Only this priority
    #[arg(long, value_enum)]
    pub priority: Option<PriorityArg>,

    /// Case-insensitive match on title or description
    #[arg(long)]
    pub search: Option<String>,

    /// Page to show (1-based)
    #[arg(long, default_value = "1", value_parser = clap::value_parser!(u32).range(1..))]
    pub page: u32,

    /// Page size (overrides profile)
    #[arg(long, short = 'l', value_parser = clap::value_parser!(u32).range(1..=200))]
    pub limit: Option<u32>,

    /// Fetch every page
    #[arg(long, conflicts_with = "page")]
    pub all_pages: bool,
}

#[derive(Debug, Args)]
pub struct IdArg {
    /// Notification ID
    pub id: String,
}

#[derive(Debug, Args)]
pub struct WatchArgs {
    /// Print the inbox after every change, not just the counters
    #[arg(long)]
    pub full: bool,
}

/// Category choices for `--type`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum CategoryArg {
    Activity,
    Group,
    System,
}

impl From<CategoryArg> for Category {
    fn from(arg: CategoryArg) -> Self {
        match arg {
            CategoryArg::Activity => Self::Activity,
            CategoryArg::Group => Self::Group,
            CategoryArg::System => Self::System,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum StatusArg {
    Read,
    Unread,
}

impl From<StatusArg> for ReadStatus {
    fn from(arg: StatusArg) -> Self {
        match arg {
            StatusArg::Read => Self::Read,
            StatusArg::Unread => Self::Unread,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum PriorityArg {
    High,
    Normal,
    Low,
}

impl From<PriorityArg> for Priority {
    fn from(arg: PriorityArg) -> Self {
        match arg {
            PriorityArg::High => Self::High,
            PriorityArg::Normal => Self::Normal,
            PriorityArg::Low => Self::Low,
        }
    }
}

// ── Config ───────────────────────────────────────────────────────────

#[derive(Debug, Args)]
pub struct ConfigArgs {
    #[command(subcommand)]
    pub command: ConfigCommand,
}

#[derive(Debug, Subcommand)]
pub enum ConfigCommand {
    /// Print the config file location
    Path,

    /// Display current resolved configuration
    Show,

    /// Create initial config file with guided setup
    Init,

    /// Store a bearer token in the system keyring
    SetToken {
        /// Token to store (prompted when omitted)
        #[arg(long)]
        value: Option<String>,
    },
}

// ── Completions ──────────────────────────────────────────────────────

#[derive(Debug, Args)]
pub struct CompletionsArgs {
    /// Shell to generate completions for
    pub shell: clap_complete::Shell,
}
