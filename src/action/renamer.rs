use chrono::Local;
use std::fs;
use std::io;
use std::path::Path;
use tracing::{debug, info, warn};

use super::log::{ActionLogWriter, EntryRecord};
use super::{ActionLogError, ActionMode};

/// Performs renames, logging each one before and after it happens.
///
/// Owning the log writer means a renamer cannot exist without an open log.
pub struct Renamer {
    log: ActionLogWriter,
}

impl Renamer {
    pub fn new(log: ActionLogWriter) -> Self {
        Self { log }
    }

    /// Rename `source` to `dest`, or only record the attempt when `mode` is
    /// simulated.
    ///
    /// Filesystem failures become a `false` outcome; only failures to write
    /// the log itself are errors.
    pub fn rename(
        &mut self,
        source: &Path,
        dest: &Path,
        rule_id: &str,
        mode: ActionMode,
    ) -> Result<bool, ActionLogError> {
        self.log.append_entry(&EntryRecord {
            when: Local::now(),
            rule_id,
            mode,
            source,
            dest,
        })?;

        let success = if mode.simulated {
            true
        } else {
            match move_path(source, dest) {
                Ok(()) => {
                    info!("Renamed {:?} -> {:?}", source, dest);
                    true
                }
                Err(e) => {
                    warn!("Cannot rename {:?} -> {:?}: {}", source, dest, e);
                    false
                }
            }
        };

        self.log.append_outcome(success)?;
        Ok(success)
    }

    /// Flush and close the underlying log
    pub fn finish(self) -> Result<(), ActionLogError> {
        debug!("Closing action log {:?}", self.log.path());
        self.log.close()
    }
}

fn move_path(source: &Path, dest: &Path) -> io::Result<()> {
    if dest.symlink_metadata().is_ok() {
        return Err(io::Error::new(
            io::ErrorKind::AlreadyExists,
            "destination already exists",
        ));
    }

    if source.symlink_metadata().is_err() {
        return Err(io::Error::new(
            io::ErrorKind::NotFound,
            "source no longer exists",
        ));
    }

    if let Some(parent) = dest.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent)?;
    }

    fs::rename(source, dest)
}
