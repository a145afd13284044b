use chrono::{DateTime, FixedOffset};
use serde_json::Value;
use std::path::PathBuf;

use super::ActionLogError;

/// Marks the start of every entry in the action log.
///
/// Mode bitmasks stay below 8 and every other field is a string or a
/// boolean, so this value can never be mistaken for field data.
pub const ENTRY_SENTINEL: u64 = 0x1100FE;

/// Where the rule behind an action came from
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RuleOrigin {
    /// A rule stored in the catalog
    Registered,
    /// A one-off rule given on the command line
    Manual,
}

/// How the renamed path was obtained
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EntryOrigin {
    /// Discovered by scanning a directory
    Found,
    /// Named literally by the operator
    Given,
}

/// The three independent axes describing a rename attempt
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ActionMode {
    pub simulated: bool,
    pub rule_origin: RuleOrigin,
    pub entry_origin: EntryOrigin,
}

impl ActionMode {
    const RENAMED: u64 = 0b001;
    const MANUAL: u64 = 0b010;
    const GIVEN: u64 = 0b100;
    const ALL: u64 = Self::RENAMED | Self::MANUAL | Self::GIVEN;

    pub fn new(simulated: bool, rule_origin: RuleOrigin, entry_origin: EntryOrigin) -> Self {
        Self {
            simulated,
            rule_origin,
            entry_origin,
        }
    }

    /// Encoding stored in the action log
    pub fn bits(&self) -> u64 {
        let mut bits = 0;
        if !self.simulated {
            bits |= Self::RENAMED;
        }
        if self.rule_origin == RuleOrigin::Manual {
            bits |= Self::MANUAL;
        }
        if self.entry_origin == EntryOrigin::Given {
            bits |= Self::GIVEN;
        }
        bits
    }

    pub fn from_bits(bits: u64) -> Option<Self> {
        if bits & !Self::ALL != 0 {
            return None;
        }

        Some(Self {
            simulated: bits & Self::RENAMED == 0,
            rule_origin: if bits & Self::MANUAL != 0 {
                RuleOrigin::Manual
            } else {
                RuleOrigin::Registered
            },
            entry_origin: if bits & Self::GIVEN != 0 {
                EntryOrigin::Given
            } else {
                EntryOrigin::Found
            },
        })
    }

    /// Three-letter status code: outcome, rule origin, entry origin.
    ///
    /// Outcome is `!` for a failure, `S` for a simulated success and `#` for
    /// a real one; then `m`/`r` for manual or registered rules and `s`/`i`
    /// for scanned or operator-given paths.
    pub fn status_code(&self, success: bool) -> String {
        let outcome = match (success, self.simulated) {
            (false, _) => '!',
            (true, true) => 'S',
            (true, false) => '#',
        };
        let rule = match self.rule_origin {
            RuleOrigin::Manual => 'm',
            RuleOrigin::Registered => 'r',
        };
        let entry = match self.entry_origin {
            EntryOrigin::Found => 's',
            EntryOrigin::Given => 'i',
        };
        [outcome, rule, entry].iter().collect()
    }
}

/// One rename attempt read back from the action log
#[derive(Debug, Clone, PartialEq)]
pub struct LogLine {
    pub when: String,
    pub rule_id: String,
    pub mode: ActionMode,
    pub abs_source: PathBuf,
    pub abs_dest: PathBuf,
    pub source: PathBuf,
    pub dest: PathBuf,
    outcome: Option<bool>,
}

/// Number of values written before the rename is attempted
pub(crate) const BEFORE_FIELDS: usize = 7;

impl LogLine {
    /// Outcome of the attempt; `None` when the process stopped before
    /// recording it
    pub fn success(&self) -> Option<bool> {
        self.outcome
    }

    pub fn is_complete(&self) -> bool {
        self.outcome.is_some()
    }

    pub fn datetime(&self) -> Option<DateTime<FixedOffset>> {
        DateTime::parse_from_rfc3339(&self.when).ok()
    }

    pub(crate) fn from_values(values: Vec<Value>) -> Result<Self, ActionLogError> {
        if values.len() < BEFORE_FIELDS || values.len() > BEFORE_FIELDS + 1 {
            return Err(ActionLogError::Format(format!(
                "entry has {} fields, expected {} or {}",
                values.len(),
                BEFORE_FIELDS,
                BEFORE_FIELDS + 1
            )));
        }

        let mut fields = values.into_iter();
        let mut text = |what: &str| -> Result<String, ActionLogError> {
            match fields.next() {
                Some(Value::String(s)) => Ok(s),
                other => Err(ActionLogError::Format(format!(
                    "expected text for {}, found {:?}",
                    what, other
                ))),
            }
        };

        let when = text("timestamp")?;
        let rule_id = text("rule id")?;

        let mode = match fields.next() {
            Some(Value::Number(n)) => n.as_u64().and_then(ActionMode::from_bits),
            _ => None,
        }
        .ok_or_else(|| ActionLogError::Format("invalid action mode".to_string()))?;

        let mut path = |what: &str| -> Result<PathBuf, ActionLogError> {
            match fields.next() {
                Some(Value::String(s)) => Ok(PathBuf::from(s)),
                other => Err(ActionLogError::Format(format!(
                    "expected path for {}, found {:?}",
                    what, other
                ))),
            }
        };

        let abs_source = path("absolute source")?;
        let abs_dest = path("absolute destination")?;
        let source = path("source")?;
        let dest = path("destination")?;

        let outcome = match fields.next() {
            None => None,
            Some(Value::Bool(b)) => Some(b),
            Some(other) => {
                return Err(ActionLogError::Format(format!(
                    "expected outcome, found {:?}",
                    other
                )))
            }
        };

        Ok(Self {
            when,
            rule_id,
            mode,
            abs_source,
            abs_dest,
            source,
            dest,
            outcome,
        })
    }
}
