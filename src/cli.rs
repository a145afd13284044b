use clap::{Args as ClapArgs, Parser, Subcommand};
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(name = "autorerename")]
#[command(author, version, long_about = None)]
#[command(about = "Rename files with regex rules and keep a log of every rename")]
pub struct Args {
    /// Increase verbosity (-v, -vv, -vvv)
    #[arg(short, long, global = true, action = clap::ArgAction::Count)]
    pub verbose: u8,

    /// Config file to use instead of the default search
    #[arg(long, global = true, value_name = "FILE", env = "AUTORERENAME_CONFIG")]
    pub config: Option<PathBuf>,

    /// Rule database to use
    #[arg(long, global = true, value_name = "FILE")]
    pub rules_db: Option<PathBuf>,

    /// Action log to use
    #[arg(long, global = true, value_name = "FILE")]
    pub action_log: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Manage the rule catalog
    #[command(subcommand)]
    Rule(RuleCommand),

    /// Apply rules to the given paths
    Rename(RenameArgs),

    /// Apply rules to the files found under directories
    Scan(ScanArgs),

    /// Inspect or wipe the action log
    #[command(subcommand)]
    Log(LogCommand),
}

#[derive(Subcommand, Debug)]
pub enum RuleCommand {
    /// Add a rule
    Add(RuleAddArgs),

    /// Remove a rule by id or name
    Remove {
        /// Rule id or name
        rule: String,
    },

    /// List the rules in insertion order
    List,

    /// Show which rules apply to paths and what they would produce
    Test {
        /// Paths to check; they do not need to exist
        #[arg(required = true)]
        paths: Vec<PathBuf>,
    },
}

#[derive(ClapArgs, Debug)]
pub struct RuleAddArgs {
    /// Regular expression identifying the files
    pub pattern: String,

    /// Template for the new name, e.g. "{stem:u}.{ext}"
    pub template: String,

    /// Identifier for the rule (generated when omitted)
    #[arg(long)]
    pub id: Option<String>,

    /// Human-readable name for the rule
    #[arg(long)]
    pub name: Option<String>,

    /// Number of parent directories included in matching
    #[arg(long, default_value = "0", allow_negative_numbers = true)]
    pub height: i64,
}

#[derive(ClapArgs, Debug)]
pub struct SelectArgs {
    /// Only use the rule with this id or name
    #[arg(long, conflicts_with = "pattern")]
    pub rule: Option<String>,

    /// One-off pattern instead of the catalog (needs --template)
    #[arg(long, requires = "template")]
    pub pattern: Option<String>,

    /// Template for the one-off pattern
    #[arg(long, requires = "pattern")]
    pub template: Option<String>,

    /// Height for the one-off pattern [default: 0]
    #[arg(long, requires = "pattern", allow_negative_numbers = true)]
    pub height: Option<i64>,

    /// Report what would be renamed without touching the filesystem
    #[arg(short, long)]
    pub simulate: bool,

    /// Ask before each rename
    #[arg(short, long)]
    pub confirm: bool,
}

#[derive(ClapArgs, Debug)]
pub struct RenameArgs {
    /// Files to rename
    #[arg(required = true)]
    pub paths: Vec<PathBuf>,

    #[command(flatten)]
    pub select: SelectArgs,
}

#[derive(ClapArgs, Debug)]
pub struct ScanArgs {
    /// Directories to scan
    #[arg(required = true)]
    pub roots: Vec<PathBuf>,

    /// Descend into subdirectories
    #[arg(short, long)]
    pub recursive: bool,

    /// Maximum depth when recursive
    #[arg(long, requires = "recursive")]
    pub max_depth: Option<usize>,

    #[command(flatten)]
    pub select: SelectArgs,
}

#[derive(Subcommand, Debug)]
pub enum LogCommand {
    /// Print every recorded rename attempt
    Show {
        /// Only show attempts without a recorded outcome
        #[arg(long)]
        incomplete: bool,
    },

    /// Delete the action log
    Clear,
}
