mod catalog;
mod template;

pub use catalog::{Applicable, Catalog, RuleSpec};
pub use template::{Conversion, Template, TemplateError};

use regex::{CaptureLocations, Regex};
use std::path::{Component, Path, PathBuf};
use thiserror::Error;
use tracing::debug;

/// Identifier recorded for one-off rules that never enter a catalog
pub const MANUAL_RULE_ID: &str = "manual";

#[derive(Error, Debug)]
pub enum RuleError {
    #[error("Invalid pattern '{pattern}': {source}")]
    Pattern {
        pattern: String,
        #[source]
        source: regex::Error,
    },

    #[error("Invalid template '{template}': {source}")]
    Template {
        template: String,
        #[source]
        source: TemplateError,
    },

    #[error("Height must not be negative (got {0})")]
    InvalidHeight(i64),

    #[error("'{0}' cannot be used as a rule id")]
    ReservedId(String),
}

/// A successful match of a rule against the selected tail of a path
#[derive(Debug, Clone)]
pub struct PathMatch {
    subject: String,
    locations: CaptureLocations,
}

impl PathMatch {
    pub(crate) fn search(pattern: &Regex, subject: String) -> Option<Self> {
        let mut locations = pattern.capture_locations();
        pattern.captures_read(&mut locations, &subject)?;
        Some(Self { subject, locations })
    }

    /// The text the pattern ran against
    pub fn subject(&self) -> &str {
        &self.subject
    }

    /// Text of capture group `index`, `None` if it did not participate
    pub fn group(&self, index: usize) -> Option<&str> {
        self.locations
            .get(index)
            .map(|(start, end)| &self.subject[start..end])
    }

    fn prefix(&self) -> &str {
        let (start, _) = self.locations.get(0).unwrap_or((0, 0));
        &self.subject[..start]
    }

    fn suffix(&self) -> &str {
        let (_, end) = self
            .locations
            .get(0)
            .unwrap_or((self.subject.len(), self.subject.len()));
        &self.subject[end..]
    }
}

/// A compiled pattern paired with a rename template.
///
/// `height` selects how many parent directories take part in matching:
/// with `/home/user/folder/file`, height 0 matches against `file`, height 1
/// against `folder/file`, height 2 against `user/folder/file`.
#[derive(Debug, Clone)]
pub struct Rule {
    id: String,
    name: Option<String>,
    pattern: Regex,
    template: Template,
    height: usize,
}

impl Rule {
    pub fn new(pattern: &str, template: &str, height: i64) -> Result<Self, RuleError> {
        let height = usize::try_from(height).map_err(|_| RuleError::InvalidHeight(height))?;

        let compiled = Regex::new(pattern).map_err(|source| RuleError::Pattern {
            pattern: pattern.to_string(),
            source,
        })?;

        let template = Template::parse(template).map_err(|source| RuleError::Template {
            template: template.to_string(),
            source,
        })?;

        Ok(Self {
            id: String::new(),
            name: None,
            pattern: compiled,
            template,
            height,
        })
    }

    /// Build a one-off rule that is not stored in any catalog
    pub fn manual(pattern: &str, template: &str, height: i64) -> Result<Self, RuleError> {
        let mut rule = Self::new(pattern, template, height)?;
        rule.id = MANUAL_RULE_ID.to_string();
        Ok(rule)
    }

    pub(crate) fn assign_identity(&mut self, id: String, name: Option<String>) {
        self.id = id;
        self.name = name;
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn name(&self) -> Option<&str> {
        self.name.as_deref()
    }

    pub fn pattern_text(&self) -> &str {
        self.pattern.as_str()
    }

    pub fn template_text(&self) -> &str {
        self.template.as_str()
    }

    pub fn height(&self) -> usize {
        self.height
    }

    /// `id:name` when the rule is named, otherwise just the id
    pub fn name_prefix(&self) -> String {
        match &self.name {
            Some(name) => format!("{}:{}", self.id, name),
            None => self.id.clone(),
        }
    }

    /// Whether `key` is this rule's identifier or name
    pub fn answers_to(&self, key: &str) -> bool {
        self.id == key || self.name.as_deref() == Some(key)
    }

    /// Split `path` into the untouched ancestor and the trailing
    /// `height + 1` segments the pattern runs against.
    ///
    /// Returns `None` when the path is too short for this rule.
    fn split(&self, path: &Path) -> Option<(PathBuf, PathBuf)> {
        let components: Vec<Component> = path.components().collect();
        let wanted = self.height + 1;
        if components.len() < wanted {
            return None;
        }

        let (root, tail) = components.split_at(components.len() - wanted);
        if !tail.iter().all(|c| matches!(c, Component::Normal(_))) {
            return None;
        }

        Some((root.iter().collect(), tail.iter().collect()))
    }

    /// Run the pattern against the selected tail of `path`.
    ///
    /// The path does not need to exist. A path with too few segments for
    /// this rule's height is simply not matched, and neither is one whose
    /// selected segments are not valid UTF-8, since no name built from
    /// them could keep the original bytes.
    pub fn matches(&self, path: &Path) -> Option<PathMatch> {
        let (_, analysed) = self.split(path)?;
        let Some(subject) = analysed.to_str() else {
            debug!(path = ?path, rule = %self.id, "Skipping path that is not valid UTF-8");
            return None;
        };
        PathMatch::search(&self.pattern, subject.to_string())
    }

    /// Compute the destination for `path` from a match of this rule.
    ///
    /// Only the matched span is replaced: text before and after the match
    /// within the analysed segments is kept, as is every ancestor above them.
    pub fn format(&self, path: &Path, matched: &PathMatch) -> Result<PathBuf, RuleError> {
        let expanded = self
            .template
            .expand(&self.pattern, matched)
            .map_err(|source| RuleError::Template {
                template: self.template.as_str().to_string(),
                source,
            })?;

        let (root, _) = self.split(path).unwrap_or_default();
        let renamed = format!("{}{}{}", matched.prefix(), expanded, matched.suffix());

        Ok(root.join(renamed))
    }
}
