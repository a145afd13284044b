mod log;
mod renamer;
mod types;

pub use log::{clear, ActionLogReader, ActionLogWriter, EntryRecord};
pub use renamer::Renamer;
pub use types::{ActionMode, EntryOrigin, LogLine, RuleOrigin, ENTRY_SENTINEL};

use thiserror::Error;

#[derive(Error, Debug)]
pub enum ActionLogError {
    #[error("Action log does not start with an entry marker")]
    CorruptLog,

    #[error("Malformed action log entry: {0}")]
    Format(String),

    #[error("Action log I/O error: {0}")]
    Io(#[from] std::io::Error),
}
