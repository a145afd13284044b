pub mod action;
pub mod apply;
pub mod cli;
pub mod config;
pub mod error;
pub mod logging;
pub mod output;
pub mod prompt;
pub mod rule;
pub mod scanner;
pub mod store;

pub use action::{
    ActionLogError, ActionLogReader, ActionLogWriter, ActionMode, EntryOrigin, LogLine, Renamer,
    RuleOrigin,
};
pub use apply::{ApplyError, ApplyOptions, ApplySummary, Candidate, Orchestrator, RuleSource};
pub use config::{Config, ConfigError, Overrides};
pub use error::{AppError, ExitCode};
pub use rule::{Catalog, PathMatch, Rule, RuleError, RuleSpec, TemplateError, MANUAL_RULE_ID};
pub use scanner::{scan, scan_directory, ScanOptions, ScannerError};
pub use store::StoreError;
