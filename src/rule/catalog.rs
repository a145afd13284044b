use chrono::Local;
use indexmap::IndexMap;
use sha2::{Digest, Sha256};
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};

use super::{PathMatch, Rule, RuleError, MANUAL_RULE_ID};

const GENERATED_ID_LEN: usize = 12;

/// Everything needed to add a rule to a catalog
#[derive(Debug, Clone, Default)]
pub struct RuleSpec {
    pub pattern: String,
    pub template: String,
    pub id: Option<String>,
    pub name: Option<String>,
    pub height: i64,
}

impl RuleSpec {
    pub fn new(pattern: impl Into<String>, template: impl Into<String>) -> Self {
        Self {
            pattern: pattern.into(),
            template: template.into(),
            ..Default::default()
        }
    }

    pub fn with_id(mut self, id: impl Into<String>) -> Self {
        self.id = Some(id.into());
        self
    }

    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    pub fn with_height(mut self, height: i64) -> Self {
        self.height = height;
        self
    }
}

/// A rule that applies to a path, with the match it produced
#[derive(Debug)]
pub struct Applicable<'a> {
    pub rule: &'a Rule,
    pub path: &'a Path,
    pub matched: PathMatch,
}

impl Applicable<'_> {
    pub fn destination(&self) -> Result<PathBuf, RuleError> {
        self.rule.format(self.path, &self.matched)
    }
}

/// Rules keyed by identifier, kept in insertion order
#[derive(Debug, Default)]
pub struct Catalog {
    rules: IndexMap<String, Rule>,
}

impl Catalog {
    pub fn new() -> Self {
        Self::default()
    }

    /// Compile and insert a rule.
    ///
    /// Returns `Ok(None)` without touching the catalog when an explicit id
    /// is already taken.
    pub fn add(&mut self, spec: RuleSpec) -> Result<Option<&Rule>, RuleError> {
        let mut rule = Rule::new(&spec.pattern, &spec.template, spec.height)?;

        let id = match spec.id {
            Some(id) if id.is_empty() || id == MANUAL_RULE_ID => {
                return Err(RuleError::ReservedId(id));
            }
            Some(id) if self.rules.contains_key(&id) => {
                warn!(id = %id, "Rule already exists, not adding");
                return Ok(None);
            }
            Some(id) => id,
            None => {
                let id = self.generate_id(&spec.pattern, &spec.template);
                info!(id = %id, "Generated identifier for rule");
                id
            }
        };

        rule.assign_identity(id.clone(), spec.name);
        info!(id = %id, pattern = %rule.pattern_text(), "Added rule");

        let (index, _) = self.rules.insert_full(id, rule);
        Ok(self.rules.get_index(index).map(|(_, rule)| rule))
    }

    fn generate_id(&self, pattern: &str, template: &str) -> String {
        let mut attempt: u64 = 0;
        loop {
            let mut hasher = Sha256::new();
            hasher.update(pattern.as_bytes());
            hasher.update(template.as_bytes());
            hasher.update(Local::now().to_rfc3339().as_bytes());
            hasher.update(attempt.to_le_bytes());
            let digest = format!("{:x}", hasher.finalize());
            let id = digest[..GENERATED_ID_LEN].to_string();

            if !self.rules.contains_key(&id) {
                return id;
            }
            debug!(id = %id, "Generated identifier collides, retrying");
            attempt += 1;
        }
    }

    /// Remove a rule by identifier, falling back to name
    pub fn remove(&mut self, key: &str) -> bool {
        if self.rules.shift_remove(key).is_some() {
            info!(id = %key, "Removed rule");
            return true;
        }

        let by_name = self
            .rules
            .values()
            .find(|r| r.name() == Some(key))
            .map(|r| r.id().to_string());

        match by_name {
            Some(id) => {
                self.rules.shift_remove(&id);
                info!(id = %id, name = %key, "Removed rule");
                true
            }
            None => {
                warn!(key = %key, "No such rule");
                false
            }
        }
    }

    /// Look up a rule by identifier, falling back to name
    pub fn get(&self, key: &str) -> Option<&Rule> {
        self.rules
            .get(key)
            .or_else(|| self.rules.values().find(|r| r.name() == Some(key)))
    }

    /// Every rule that matches `path`, in insertion order.
    ///
    /// With `filter`, only rules whose id or name equals it are tried.
    pub fn find_applying<'a>(
        &'a self,
        path: &'a Path,
        filter: Option<&'a str>,
    ) -> impl Iterator<Item = Applicable<'a>> + 'a {
        self.rules
            .values()
            .filter(move |rule| filter.map_or(true, |key| rule.answers_to(key)))
            .filter_map(move |rule| {
                rule.matches(path).map(|matched| Applicable {
                    rule,
                    path,
                    matched,
                })
            })
    }

    /// The first rule that matches `path`
    pub fn find_rule_for<'a>(&'a self, path: &'a Path) -> Option<Applicable<'a>> {
        self.find_applying(path, None).next()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Rule> {
        self.rules.values()
    }

    pub fn len(&self) -> usize {
        self.rules.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rules.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_add_generates_identifier() {
        let mut catalog = Catalog::new();
        let id = catalog
            .add(RuleSpec::new(r"(.*)\.txt", "{1}.md"))
            .unwrap()
            .unwrap()
            .id()
            .to_string();

        assert_eq!(id.len(), 12);
        assert!(id.chars().all(|c| c.is_ascii_hexdigit()));
        assert_eq!(catalog.len(), 1);
    }

    #[test]
    fn test_generated_identifiers_are_unique() {
        let mut catalog = Catalog::new();
        for _ in 0..20 {
            catalog.add(RuleSpec::new("a", "b")).unwrap().unwrap();
        }
        assert_eq!(catalog.len(), 20);
    }

    #[test]
    fn test_duplicate_identifier_rejected() {
        let mut catalog = Catalog::new();
        catalog
            .add(RuleSpec::new("first", "1").with_id("same"))
            .unwrap()
            .unwrap();

        let second = catalog.add(RuleSpec::new("second", "2").with_id("same")).unwrap();

        assert!(second.is_none());
        assert_eq!(catalog.len(), 1);
        assert_eq!(catalog.get("same").unwrap().pattern_text(), "first");
    }

    #[test]
    fn test_reserved_identifiers_rejected() {
        let mut catalog = Catalog::new();

        let manual = catalog.add(RuleSpec::new("a", "b").with_id(MANUAL_RULE_ID));
        assert!(matches!(manual, Err(RuleError::ReservedId(ref id)) if id == "manual"));

        let empty = catalog.add(RuleSpec::new("a", "b").with_id(""));
        assert!(matches!(empty, Err(RuleError::ReservedId(ref id)) if id.is_empty()));

        assert!(catalog.is_empty());
    }

    #[test]
    fn test_add_invalid_pattern() {
        let mut catalog = Catalog::new();
        let result = catalog.add(RuleSpec::new("[oops", "x"));
        assert!(matches!(result, Err(RuleError::Pattern { .. })));
        assert!(catalog.is_empty());
    }

    #[test]
    fn test_add_negative_height() {
        let mut catalog = Catalog::new();
        let result = catalog.add(RuleSpec::new("a", "b").with_height(-2));
        assert!(matches!(result, Err(RuleError::InvalidHeight(-2))));
    }

    #[test]
    fn test_remove_by_id_and_name() {
        let mut catalog = Catalog::new();
        catalog.add(RuleSpec::new("a", "b").with_id("r1")).unwrap();
        catalog
            .add(RuleSpec::new("c", "d").with_id("r2").with_name("music"))
            .unwrap();

        assert!(catalog.remove("r1"));
        assert!(catalog.remove("music"));
        assert!(catalog.is_empty());
    }

    #[test]
    fn test_remove_nonexistent() {
        let mut catalog = Catalog::new();
        catalog.add(RuleSpec::new("a", "b")).unwrap();

        assert!(!catalog.remove("nonexistent"));
        assert_eq!(catalog.len(), 1);
    }

    #[test]
    fn test_remove_keeps_insertion_order() {
        let mut catalog = Catalog::new();
        for id in ["a", "b", "c"] {
            catalog.add(RuleSpec::new(".", "x").with_id(id)).unwrap();
        }
        catalog.remove("b");

        let ids: Vec<&str> = catalog.iter().map(Rule::id).collect();
        assert_eq!(ids, vec!["a", "c"]);
    }

    #[test]
    fn test_find_applying_returns_all_in_order() {
        let mut catalog = Catalog::new();
        catalog.add(RuleSpec::new(r"\.txt$", "x").with_id("txt")).unwrap();
        catalog.add(RuleSpec::new(r"\.md$", "x").with_id("md")).unwrap();
        catalog.add(RuleSpec::new(r"^report", "x").with_id("report")).unwrap();

        let path = Path::new("/tmp/report.txt");
        let ids: Vec<&str> = catalog
            .find_applying(path, None)
            .map(|a| a.rule.id())
            .collect();

        assert_eq!(ids, vec!["txt", "report"]);
    }

    #[test]
    fn test_find_applying_with_filter() {
        let mut catalog = Catalog::new();
        catalog.add(RuleSpec::new(r"\.txt$", "x").with_id("txt")).unwrap();
        catalog
            .add(RuleSpec::new(r"^report", "x").with_id("report").with_name("reports"))
            .unwrap();

        let path = Path::new("report.txt");
        let by_name: Vec<&str> = catalog
            .find_applying(path, Some("reports"))
            .map(|a| a.rule.id())
            .collect();
        assert_eq!(by_name, vec!["report"]);

        assert_eq!(catalog.find_applying(path, Some("missing")).count(), 0);
    }

    #[test]
    fn test_find_rule_for() {
        let mut catalog = Catalog::new();
        catalog.add(RuleSpec::new(r"\.md$", "x").with_id("md")).unwrap();
        catalog
            .add(RuleSpec::new(r"(?P<n>.*)\.txt", "{n:u}.md").with_id("txt"))
            .unwrap();

        let path = Path::new("notes.txt");
        let found = catalog.find_rule_for(path).unwrap();
        assert_eq!(found.rule.id(), "txt");
        assert_eq!(found.destination().unwrap(), PathBuf::from("NOTES.md"));

        assert!(catalog.find_rule_for(Path::new("image.png")).is_none());
    }
}
