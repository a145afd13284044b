//! Append-only action log.
//!
//! The log is a stream of JSON values, one per line. Each entry starts with
//! [`ENTRY_SENTINEL`], followed by the seven values written before a rename
//! is attempted and, once it has been, a boolean outcome. An entry that ends
//! without an outcome records a run that stopped mid-rename.

use chrono::{DateTime, Local};
use serde_json::{json, Value};
use std::fs::{self, File, OpenOptions};
use std::io::{self, BufRead, BufReader, BufWriter, Read, Seek, SeekFrom, Split, Write};
use std::path::{Path, PathBuf};
use tracing::{debug, trace, warn};

use super::types::{ActionMode, LogLine, BEFORE_FIELDS, ENTRY_SENTINEL};
use super::ActionLogError;

/// The fields recorded before a rename is attempted
#[derive(Debug, Clone)]
pub struct EntryRecord<'a> {
    pub when: DateTime<Local>,
    pub rule_id: &'a str,
    pub mode: ActionMode,
    pub source: &'a Path,
    pub dest: &'a Path,
}

fn absolute(path: &Path) -> PathBuf {
    std::path::absolute(path).unwrap_or_else(|_| path.to_path_buf())
}

/// Whether `file` has content whose last line is unterminated
fn ends_mid_line(file: &mut File) -> io::Result<bool> {
    if file.metadata()?.len() == 0 {
        return Ok(false);
    }
    let mut last = [0u8; 1];
    file.seek(SeekFrom::End(-1))?;
    file.read_exact(&mut last)?;
    Ok(last[0] != b'\n')
}

fn is_sentinel(value: &Value) -> bool {
    value.as_u64() == Some(ENTRY_SENTINEL)
}

/// Writing side of the action log.
///
/// The stream is flushed when the writer is closed or dropped.
pub struct ActionLogWriter {
    path: PathBuf,
    out: BufWriter<File>,
}

impl ActionLogWriter {
    /// Open `path` for appending, creating it if needed
    pub fn open(path: &Path) -> Result<Self, ActionLogError> {
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent)?;
        }

        let mut file = OpenOptions::new()
            .create(true)
            .read(true)
            .append(true)
            .open(path)?;
        if ends_mid_line(&mut file)? {
            warn!("Action log {:?} ends with a torn value, starting a new line", path);
            file.write_all(b"\n")?;
        }
        debug!("Opened action log {:?} for append", path);

        Ok(Self {
            path: path.to_path_buf(),
            out: BufWriter::new(file),
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Append one value to the stream
    pub fn write(&mut self, value: &Value) -> Result<(), ActionLogError> {
        serde_json::to_writer(&mut self.out, value).map_err(io::Error::from)?;
        self.out.write_all(b"\n")?;
        Ok(())
    }

    /// Start a new entry with everything known before the rename.
    ///
    /// The stream is flushed so the intent is on disk before the
    /// filesystem is touched.
    pub fn append_entry(&mut self, record: &EntryRecord<'_>) -> Result<(), ActionLogError> {
        let before = [
            json!(ENTRY_SENTINEL),
            json!(record.when.to_rfc3339()),
            json!(record.rule_id),
            json!(record.mode.bits()),
            json!(absolute(record.source).to_string_lossy()),
            json!(absolute(record.dest).to_string_lossy()),
            json!(record.source.to_string_lossy()),
            json!(record.dest.to_string_lossy()),
        ];
        debug_assert_eq!(before.len(), BEFORE_FIELDS + 1);

        for value in &before {
            self.write(value)?;
        }
        self.out.flush()?;
        Ok(())
    }

    /// Complete the most recent entry and flush
    pub fn append_outcome(&mut self, success: bool) -> Result<(), ActionLogError> {
        self.write(&Value::Bool(success))?;
        self.out.flush()?;
        Ok(())
    }

    /// Flush and release the log
    pub fn close(mut self) -> Result<(), ActionLogError> {
        self.out.flush()?;
        Ok(())
    }
}

impl Drop for ActionLogWriter {
    fn drop(&mut self) {
        if let Err(e) = self.out.flush() {
            warn!("Failed to flush action log {:?}: {}", self.path, e);
        }
    }
}

/// Reading side of the action log, yielding one [`LogLine`] per entry.
///
/// A value that cannot be parsed was torn by an interrupted write. The
/// entry it belongs to is dropped, unless only its outcome was lost, and
/// reading resumes at the next entry marker.
pub struct ActionLogReader {
    lines: Split<BufReader<Box<dyn Read>>>,
    line_no: usize,
    started: bool,
    resync: bool,
    finished: bool,
    pending: Vec<Value>,
}

impl ActionLogReader {
    /// Open `path` for reading. A missing log reads as empty.
    pub fn open(path: &Path) -> Result<Self, ActionLogError> {
        let source: Box<dyn Read> = match File::open(path) {
            Ok(file) => Box::new(file),
            Err(e) if e.kind() == io::ErrorKind::NotFound => {
                debug!("No action log at {:?}", path);
                Box::new(io::empty())
            }
            Err(e) => return Err(e.into()),
        };

        Ok(Self::from_reader(source))
    }

    pub fn from_reader(source: Box<dyn Read>) -> Self {
        Self {
            lines: BufReader::new(source).split(b'\n'),
            line_no: 0,
            started: false,
            resync: false,
            finished: false,
            pending: Vec::new(),
        }
    }

    /// Turn the values gathered since the last marker into an entry.
    ///
    /// A group cut short before all of its leading fields were written
    /// never reached the rename, so it is dropped.
    fn take_pending(&mut self) -> Option<Result<LogLine, ActionLogError>> {
        if self.pending.is_empty() {
            return None;
        }
        if self.pending.len() < BEFORE_FIELDS {
            warn!(
                fields = self.pending.len(),
                line = self.line_no,
                "Dropping truncated entry in action log"
            );
            self.pending.clear();
            return None;
        }
        // A torn entry marker can still parse as a number.
        if self.pending.len() > BEFORE_FIELDS + 1 {
            warn!(
                stray = self.pending.len() - BEFORE_FIELDS - 1,
                line = self.line_no,
                "Ignoring stray values after action log entry"
            );
            self.pending.truncate(BEFORE_FIELDS + 1);
        }
        Some(LogLine::from_values(std::mem::take(&mut self.pending)))
    }

    fn take_tail(&mut self) -> Option<Result<LogLine, ActionLogError>> {
        self.finished = true;
        self.take_pending()
    }

    fn skip_torn_value(&mut self, error: serde_json::Error) {
        warn!(line = self.line_no, "Skipping unreadable action log value: {}", error);
        if self.pending.len() < BEFORE_FIELDS {
            self.pending.clear();
        }
        self.resync = true;
    }
}

impl Iterator for ActionLogReader {
    type Item = Result<LogLine, ActionLogError>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.finished {
            return None;
        }

        loop {
            let raw = match self.lines.next() {
                None => return self.take_tail(),
                Some(Err(e)) => {
                    self.finished = true;
                    return Some(Err(e.into()));
                }
                Some(Ok(raw)) => raw,
            };
            self.line_no += 1;

            if raw.iter().all(u8::is_ascii_whitespace) {
                continue;
            }

            let value: Value = match serde_json::from_slice(&raw) {
                Ok(value) => value,
                Err(_) if !self.started => {
                    self.finished = true;
                    return Some(Err(ActionLogError::CorruptLog));
                }
                Err(e) => {
                    self.skip_torn_value(e);
                    continue;
                }
            };

            if !self.started {
                self.started = true;
                if !is_sentinel(&value) {
                    self.finished = true;
                    return Some(Err(ActionLogError::CorruptLog));
                }
                continue;
            }

            if is_sentinel(&value) {
                self.resync = false;
                if let Some(line) = self.take_pending() {
                    return Some(line);
                }
                continue;
            }

            if self.resync {
                trace!(line = self.line_no, "Skipping value of a torn entry");
                continue;
            }

            self.pending.push(value);
        }
    }
}

/// Delete the log at `path`. Succeeds when there was nothing to delete.
pub fn clear(path: &Path) -> Result<bool, ActionLogError> {
    match fs::remove_file(path) {
        Ok(()) => {
            debug!("Cleared action log {:?}", path);
            Ok(true)
        }
        Err(e) if e.kind() == io::ErrorKind::NotFound => {
            debug!("No action log at {:?} to clear", path);
            Ok(true)
        }
        Err(e) => Err(e.into()),
    }
}
