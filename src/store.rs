//! Persistence of the rule catalog.
//!
//! The database is a JSON document `{"version": 1, "rules": [...]}`. There is
//! no migration: any other version is refused.

use serde::{Deserialize, Serialize};
use std::fs::{self, File};
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::{debug, info, warn};

use crate::rule::{Catalog, Rule, RuleError, RuleSpec};

pub const RULE_DB_VERSION: u32 = 1;

#[derive(Error, Debug)]
pub enum StoreError {
    #[error("Invalid rule database {path}: {message}")]
    Format { path: PathBuf, message: String },

    #[error("Unsupported rule database version {found} in {path} (expected {expected})")]
    VersionMismatch {
        path: PathBuf,
        expected: u32,
        found: u32,
    },

    #[error("Invalid rule '{id}' in {path}: {source}")]
    InvalidRule {
        path: PathBuf,
        id: String,
        #[source]
        source: RuleError,
    },

    #[error("I/O error on rule database {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RuleRecord {
    pub guid: String,
    pub pattern: String,
    pub template: String,
    pub name: Option<String>,
    pub height: i64,
}

impl From<&Rule> for RuleRecord {
    fn from(rule: &Rule) -> Self {
        Self {
            guid: rule.id().to_string(),
            pattern: rule.pattern_text().to_string(),
            template: rule.template_text().to_string(),
            name: rule.name().map(str::to_string),
            height: rule.height() as i64,
        }
    }
}

#[derive(Debug, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
struct RuleDatabase {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    version: Option<u32>,
    rules: Vec<RuleRecord>,
}

/// Write the catalog to `path`.
///
/// The new content goes to a sibling temporary file first, so a failed
/// write never replaces the previous database.
pub fn save(path: &Path, catalog: &Catalog) -> Result<(), StoreError> {
    let io_err = |source| StoreError::Io {
        path: path.to_path_buf(),
        source,
    };

    let database = RuleDatabase {
        version: Some(RULE_DB_VERSION),
        rules: catalog.iter().map(RuleRecord::from).collect(),
    };

    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent).map_err(io_err)?;
    }

    let temp_path = path.with_extension("json.tmp");
    {
        let file = File::create(&temp_path).map_err(io_err)?;
        let mut writer = BufWriter::new(file);
        serde_json::to_writer_pretty(&mut writer, &database).map_err(|e| StoreError::Io {
            path: path.to_path_buf(),
            source: e.into(),
        })?;
        writer.flush().map_err(io_err)?;
    }

    fs::rename(&temp_path, path).map_err(io_err)?;

    info!("Saved {} rules to {:?}", catalog.len(), path);
    Ok(())
}

/// Read a catalog from `path`.
///
/// A missing or empty file is a fresh, empty catalog.
pub fn load(path: &Path) -> Result<Catalog, StoreError> {
    let content = match fs::read(path) {
        Ok(content) => content,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
            debug!("No rule database at {:?}, starting empty", path);
            return Ok(Catalog::new());
        }
        Err(source) => {
            return Err(StoreError::Io {
                path: path.to_path_buf(),
                source,
            })
        }
    };

    if content.is_empty() {
        debug!("Rule database {:?} is empty", path);
        return Ok(Catalog::new());
    }

    let database: RuleDatabase =
        serde_json::from_slice(&content).map_err(|e| StoreError::Format {
            path: path.to_path_buf(),
            message: e.to_string(),
        })?;

    if let Some(found) = database.version.filter(|v| *v != RULE_DB_VERSION) {
        return Err(StoreError::VersionMismatch {
            path: path.to_path_buf(),
            expected: RULE_DB_VERSION,
            found,
        });
    }

    let mut catalog = Catalog::new();
    for record in database.rules {
        let spec = RuleSpec {
            pattern: record.pattern,
            template: record.template,
            id: Some(record.guid.clone()),
            name: record.name,
            height: record.height,
        };

        let added = catalog.add(spec).map_err(|source| StoreError::InvalidRule {
            path: path.to_path_buf(),
            id: record.guid.clone(),
            source,
        })?;

        if added.is_none() {
            warn!(id = %record.guid, "Duplicate rule in database, keeping the first");
        }
    }

    info!("Loaded {} rules from {:?}", catalog.len(), path);
    Ok(catalog)
}
