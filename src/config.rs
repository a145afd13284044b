use serde::Deserialize;
use std::fs;
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::{debug, info};

pub const APP_DIR: &str = "autorerename";
pub const PROJECT_DIR: &str = ".autorerename";
pub const CONFIG_FILE: &str = "config.toml";
pub const DEFAULT_RULES_DB: &str = ".autorerename/rules.json";
pub const DEFAULT_ACTION_LOG: &str = ".autorerename/actions.log";

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Cannot read config file {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Invalid config file {path}: {message}")]
    Parse { path: PathBuf, message: String },

    #[error("Cannot determine the current directory: {0}")]
    CurrentDir(#[source] std::io::Error),
}

/// On-disk configuration. Relative paths are relative to the file itself.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ConfigFile {
    pub rules_db: Option<PathBuf>,
    pub action_log: Option<PathBuf>,
}

/// Resolved locations of the rule database and the action log
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Config {
    pub source: Option<PathBuf>,
    pub rule_db_path: PathBuf,
    pub action_log_path: PathBuf,
}

/// Explicit choices from the command line
#[derive(Debug, Clone, Default)]
pub struct Overrides {
    pub config: Option<PathBuf>,
    pub rules_db: Option<PathBuf>,
    pub action_log: Option<PathBuf>,
}

/// Config files tried in order when none is given
pub fn search_paths(cwd: &Path) -> Vec<PathBuf> {
    let mut paths = vec![cwd.join(PROJECT_DIR).join(CONFIG_FILE)];
    if let Some(dir) = dirs::data_dir() {
        paths.push(dir.join(APP_DIR).join(CONFIG_FILE));
    }
    if let Some(dir) = dirs::config_dir() {
        paths.push(dir.join(APP_DIR).join(CONFIG_FILE));
    }
    paths
}

fn anchor(base: &Path, path: &Path) -> PathBuf {
    if path.is_absolute() {
        path.to_path_buf()
    } else {
        base.join(path)
    }
}

pub fn read_config_file(path: &Path) -> Result<ConfigFile, ConfigError> {
    let content = fs::read_to_string(path).map_err(|source| ConfigError::Read {
        path: path.to_path_buf(),
        source,
    })?;

    toml::from_str(&content).map_err(|e| ConfigError::Parse {
        path: path.to_path_buf(),
        message: e.to_string(),
    })
}

impl Config {
    /// Resolve paths against `cwd`, the config file and the overrides
    pub fn resolve_in(cwd: &Path, overrides: &Overrides) -> Result<Self, ConfigError> {
        let source = match &overrides.config {
            Some(path) => Some(anchor(cwd, path)),
            None => search_paths(cwd).into_iter().find(|p| p.is_file()),
        };

        let (file, base) = match &source {
            Some(path) => {
                info!("Using config file {:?}", path);
                // A project config lives inside `.autorerename/`; its
                // defaults are relative to the project root.
                let dir = path.parent().unwrap_or(cwd);
                let base = if dir.file_name().is_some_and(|n| n == PROJECT_DIR) {
                    dir.parent().unwrap_or(dir)
                } else {
                    dir
                };
                (read_config_file(path)?, base.to_path_buf())
            }
            None => {
                debug!("No config file found, using defaults");
                (ConfigFile::default(), cwd.to_path_buf())
            }
        };

        let file_dir = source
            .as_deref()
            .and_then(Path::parent)
            .unwrap_or(cwd)
            .to_path_buf();

        let rule_db_path = match (&overrides.rules_db, &file.rules_db) {
            (Some(path), _) => anchor(cwd, path),
            (None, Some(path)) => anchor(&file_dir, path),
            (None, None) => base.join(DEFAULT_RULES_DB),
        };

        let action_log_path = match (&overrides.action_log, &file.action_log) {
            (Some(path), _) => anchor(cwd, path),
            (None, Some(path)) => anchor(&file_dir, path),
            (None, None) => base.join(DEFAULT_ACTION_LOG),
        };

        debug!(rules = ?rule_db_path, log = ?action_log_path, "Resolved paths");

        Ok(Self {
            source,
            rule_db_path,
            action_log_path,
        })
    }

    pub fn resolve(overrides: &Overrides) -> Result<Self, ConfigError> {
        let cwd = std::env::current_dir().map_err(ConfigError::CurrentDir)?;
        Self::resolve_in(&cwd, overrides)
    }
}
