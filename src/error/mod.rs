mod codes;

pub use codes::ExitCode;

use crate::action::ActionLogError;
use crate::apply::ApplyError;
use crate::config::ConfigError;
use crate::rule::RuleError;
use crate::scanner::ScannerError;
use crate::store::StoreError;
use std::path::PathBuf;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum AppError {
    #[error("No rule matches '{0}'")]
    RuleNotFound(String),

    #[error("A rule with id '{0}' already exists")]
    DuplicateRule(String),

    #[error(transparent)]
    Rule(#[from] RuleError),

    #[error("Path not found: {path}")]
    PathNotFound { path: PathBuf },

    #[error("Path is not a directory: {path}")]
    NotADirectory { path: PathBuf },

    #[error(transparent)]
    Store(#[from] StoreError),

    #[error(transparent)]
    ActionLog(#[from] ActionLogError),

    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl AppError {
    pub fn exit_code(&self) -> ExitCode {
        match self {
            AppError::RuleNotFound(_) | AppError::DuplicateRule(_) => ExitCode::CommandFailed,
            AppError::Rule(_) => ExitCode::InvalidRule,
            AppError::PathNotFound { .. } | AppError::NotADirectory { .. } => {
                ExitCode::PathNotFound
            }
            AppError::Store(_) => ExitCode::RuleDatabaseError,
            AppError::ActionLog(_) => ExitCode::ActionLogError,
            AppError::Config(_) => ExitCode::ConfigError,
            AppError::Io(_) => ExitCode::IoError,
        }
    }

    pub fn detailed_message(&self) -> String {
        match self {
            AppError::RuleNotFound(key) => {
                format!(
                    "No rule has the id or name '{}'.\n\n\
                     Run `autorerename rule list` to see the registered rules.",
                    key
                )
            }

            AppError::DuplicateRule(id) => {
                format!(
                    "A rule with id '{}' already exists; the catalog was not changed.\n\n\
                     Choose another id, or omit --id to generate one.",
                    id
                )
            }

            AppError::Rule(RuleError::Pattern { pattern, source }) => {
                format!(
                    "The pattern is not a valid regular expression:\n  {}\n\n{}",
                    pattern, source
                )
            }

            AppError::Rule(RuleError::Template { template, source }) => {
                format!(
                    "The rename template cannot be used:\n  {}\n  {}\n\n\
                     Fields look like {{1}}, {{name}} or {{name:u}} (u, l, c).",
                    template, source
                )
            }

            AppError::Rule(err @ (RuleError::InvalidHeight(_) | RuleError::ReservedId(_))) => {
                err.to_string()
            }

            AppError::PathNotFound { path } => {
                format!(
                    "The specified path does not exist:\n  {}\n\n\
                     Please verify the path and try again.",
                    path.display()
                )
            }

            AppError::NotADirectory { path } => {
                format!(
                    "The specified path is not a directory:\n  {}\n\n\
                     Please provide a valid directory path.",
                    path.display()
                )
            }

            AppError::Store(err) => {
                format!(
                    "{}\n\n\
                     The rule database is left untouched. Fix or move it aside \
                     to start with an empty catalog.",
                    err
                )
            }

            AppError::ActionLog(ActionLogError::CorruptLog) => String::from(
                "The action log does not start with an entry marker and cannot be read.\n\n\
                 Run `autorerename log clear` to discard it.",
            ),

            AppError::ActionLog(err) => err.to_string(),

            AppError::Config(err) => {
                format!(
                    "{}\n\n\
                     Expected keys: rules_db, action_log (paths, relative to the file).",
                    err
                )
            }

            AppError::Io(err) => format!("I/O error: {}", err),
        }
    }
}

impl From<ScannerError> for AppError {
    fn from(err: ScannerError) -> Self {
        match err {
            ScannerError::PathNotFound(path) => AppError::PathNotFound { path },
            ScannerError::NotADirectory(path) => AppError::NotADirectory { path },
        }
    }
}

impl From<ApplyError> for AppError {
    fn from(err: ApplyError) -> Self {
        match err {
            ApplyError::Log(e) => AppError::ActionLog(e),
            ApplyError::Io(e) => AppError::Io(e),
        }
    }
}
