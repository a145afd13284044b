//! Drives rules over candidate paths and hands matches to the renamer.

use std::io::{self, Write};
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::{debug, info, warn};

use crate::action::{ActionLogError, ActionMode, EntryOrigin, Renamer, RuleOrigin};
use crate::output::Output;
use crate::prompt::{Decision, Prompt};
use crate::rule::{Catalog, Rule};

#[derive(Error, Debug)]
pub enum ApplyError {
    #[error(transparent)]
    Log(#[from] ActionLogError),

    #[error("Terminal I/O error: {0}")]
    Io(#[from] io::Error),
}

/// Where the rules come from for a pass
#[derive(Debug, Clone, Copy)]
pub enum RuleSource<'a> {
    /// Catalog rules, optionally narrowed to one id or name
    Catalog {
        catalog: &'a Catalog,
        only: Option<&'a str>,
    },
    /// A single one-off rule
    Manual(&'a Rule),
}

impl<'a> RuleSource<'a> {
    fn origin(&self) -> RuleOrigin {
        match self {
            RuleSource::Catalog { .. } => RuleOrigin::Registered,
            RuleSource::Manual(_) => RuleOrigin::Manual,
        }
    }

    /// Every applying rule for `path` with the destination it produces,
    /// or the reason it could not produce one
    fn destinations<'s>(&'s self, path: &'s Path) -> Vec<(&'s Rule, Result<PathBuf, String>)> {
        match *self {
            RuleSource::Catalog { catalog, only } => catalog
                .find_applying(path, only)
                .map(|hit| (hit.rule, hit.destination().map_err(|e| e.to_string())))
                .collect(),
            RuleSource::Manual(rule) => rule
                .matches(path)
                .map(|m| (rule, rule.format(path, &m).map_err(|e| e.to_string())))
                .into_iter()
                .collect(),
        }
    }
}

/// A path to try the rules against
#[derive(Debug, Clone)]
pub struct Candidate {
    pub path: PathBuf,
    pub origin: EntryOrigin,
}

impl Candidate {
    pub fn given(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            origin: EntryOrigin::Given,
        }
    }

    pub fn found(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            origin: EntryOrigin::Found,
        }
    }
}

#[derive(Debug, Clone, Copy, Default)]
pub struct ApplyOptions {
    pub simulate: bool,
    pub confirm: bool,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ApplySummary {
    pub files: usize,
    pub attempts: usize,
    pub succeeded: usize,
    pub failed: usize,
    pub aborted: bool,
}

/// One pass of rules over a batch of candidates
pub struct Orchestrator<'a, W: Write> {
    rules: RuleSource<'a>,
    renamer: &'a mut Renamer,
    prompt: Option<&'a mut dyn Prompt>,
    output: &'a mut Output<W>,
    options: ApplyOptions,
}

impl<'a, W: Write> Orchestrator<'a, W> {
    pub fn new(
        rules: RuleSource<'a>,
        renamer: &'a mut Renamer,
        output: &'a mut Output<W>,
        options: ApplyOptions,
    ) -> Self {
        Self {
            rules,
            renamer,
            prompt: None,
            output,
            options,
        }
    }

    /// Ask `prompt` before each rename when confirmation is enabled
    pub fn with_prompt(mut self, prompt: &'a mut dyn Prompt) -> Self {
        self.prompt = Some(prompt);
        self
    }

    pub fn run(
        &mut self,
        candidates: impl IntoIterator<Item = Candidate>,
    ) -> Result<ApplySummary, ApplyError> {
        let mut summary = ApplySummary::default();

        for candidate in candidates {
            summary.files += 1;
            if !self.apply_one(&candidate, &mut summary)? {
                info!("Aborted by operator");
                summary.aborted = true;
                break;
            }
        }

        info!(
            files = summary.files,
            attempts = summary.attempts,
            succeeded = summary.succeeded,
            failed = summary.failed,
            "Pass complete"
        );
        Ok(summary)
    }

    /// Try the applying rules on one file. Returns `false` to abort the batch.
    fn apply_one(
        &mut self,
        candidate: &Candidate,
        summary: &mut ApplySummary,
    ) -> Result<bool, ApplyError> {
        let source = &candidate.path;
        let mode = ActionMode::new(self.options.simulate, self.rules.origin(), candidate.origin);

        let rules = self.rules;
        let hits = rules.destinations(source);
        if hits.is_empty() {
            debug!("No rule applies to {:?}", source);
        }

        for (rule, dest) in hits {
            let dest = match dest {
                Ok(dest) => dest,
                Err(reason) => {
                    warn!("Rule {} cannot name {:?}: {}", rule.id(), source, reason);
                    self.output.format_failure(&rule.name_prefix(), source, &reason)?;
                    summary.failed += 1;
                    continue;
                }
            };

            if self.options.confirm {
                if let Some(prompt) = self.prompt.as_mut() {
                    match prompt.decide(source, &dest, rule)? {
                        Decision::Accept => {}
                        Decision::Discard => continue,
                        Decision::Skip => break,
                        Decision::Abort => return Ok(false),
                    }
                }
            }

            summary.attempts += 1;
            let success = self.renamer.rename(source, &dest, rule.id(), mode)?;
            self.output
                .status(mode, success, &rule.name_prefix(), source, &dest)?;

            if success {
                summary.succeeded += 1;
            } else {
                summary.failed += 1;
            }

            // A file is renamed at most once per pass; simulations report
            // every applying rule.
            if success && !mode.simulated {
                break;
            }
        }

        Ok(true)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::action::{ActionLogReader, ActionLogWriter, LogLine};
    use crate::rule::RuleSpec;
    use std::fs;
    use std::path::Path;
    use tempfile::{tempdir, TempDir};

    struct Scripted(Vec<Decision>);

    impl Prompt for Scripted {
        fn decide(&mut self, _: &Path, _: &Path, _: &Rule) -> io::Result<Decision> {
            Ok(self.0.remove(0))
        }
    }

    struct Fixture {
        dir: TempDir,
        catalog: Catalog,
    }

    impl Fixture {
        fn new() -> Self {
            Self {
                dir: tempdir().unwrap(),
                catalog: Catalog::new(),
            }
        }

        fn rule(&mut self, id: &str, pattern: &str, template: &str) {
            self.catalog
                .add(RuleSpec::new(pattern, template).with_id(id))
                .unwrap()
                .unwrap();
        }

        fn file(&self, name: &str) -> PathBuf {
            let path = self.dir.path().join(name);
            fs::write(&path, name).unwrap();
            path
        }

        fn log_path(&self) -> PathBuf {
            self.dir.path().join("actions.log")
        }

        fn run(
            &self,
            candidates: Vec<Candidate>,
            options: ApplyOptions,
            prompt: Option<&mut dyn Prompt>,
        ) -> (ApplySummary, String) {
            let mut renamer = Renamer::new(ActionLogWriter::open(&self.log_path()).unwrap());
            let mut output = Output::new(Vec::new(), false);
            let summary = {
                let source = RuleSource::Catalog {
                    catalog: &self.catalog,
                    only: None,
                };
                let mut orchestrator =
                    Orchestrator::new(source, &mut renamer, &mut output, options);
                if let Some(prompt) = prompt {
                    orchestrator = orchestrator.with_prompt(prompt);
                }
                orchestrator.run(candidates).unwrap()
            };
            renamer.finish().unwrap();
            (summary, String::from_utf8(output.into_inner()).unwrap())
        }

        fn log(&self) -> Vec<LogLine> {
            ActionLogReader::open(&self.log_path())
                .unwrap()
                .collect::<Result<_, _>>()
                .unwrap()
        }
    }

    fn real() -> ApplyOptions {
        ApplyOptions::default()
    }

    fn simulated() -> ApplyOptions {
        ApplyOptions {
            simulate: true,
            confirm: false,
        }
    }

    fn confirming() -> ApplyOptions {
        ApplyOptions {
            simulate: false,
            confirm: true,
        }
    }

    #[test]
    fn test_stop_after_first_real_success() {
        let mut fx = Fixture::new();
        fx.rule("collide", r"report_v(\d)\.txt", "taken.txt");
        fx.rule("fresh", r"report_v(\d)\.txt", "report-{1}.txt");
        fx.rule("never", r"report", "never.txt");
        let source = fx.file("report_v2.txt");
        fx.file("taken.txt");

        let (summary, output) = fx.run(vec![Candidate::given(&source)], real(), None);

        assert_eq!(summary.attempts, 2);
        assert_eq!(summary.succeeded, 1);
        assert_eq!(summary.failed, 1);
        assert!(fx.dir.path().join("report-2.txt").exists());
        assert!(!fx.dir.path().join("never.txt").exists());
        assert_eq!(fs::read_to_string(fx.dir.path().join("taken.txt")).unwrap(), "taken.txt");

        let lines: Vec<&str> = output.lines().collect();
        assert!(lines[0].starts_with("!ri [collide]"));
        assert!(lines[1].starts_with("#ri [fresh]"));

        let log = fx.log();
        assert_eq!(log.len(), 2);
        assert_eq!(log[0].success(), Some(false));
        assert_eq!(log[1].success(), Some(true));
    }

    #[test]
    fn test_simulation_reports_every_rule() {
        let mut fx = Fixture::new();
        fx.rule("one", r"(?P<n>.*)\.txt", "{n:u}.md");
        fx.rule("two", r"notes", "memo");
        let source = fx.file("notes.txt");

        let (summary, output) = fx.run(vec![Candidate::found(&source)], simulated(), None);

        assert_eq!(summary.attempts, 2);
        assert_eq!(summary.succeeded, 2);
        assert!(source.exists());
        assert!(output.contains("Srs [one]"));
        assert!(output.contains("NOTES.md"));
        assert!(output.contains("Srs [two]"));
        assert!(output.contains("memo.txt"));
        assert!(fx.log().iter().all(|l| l.mode.simulated));
    }

    #[test]
    fn test_files_without_matching_rule_are_untouched() {
        let mut fx = Fixture::new();
        fx.rule("txt", r"\.txt$", "x.txt");
        let source = fx.file("image.png");

        let (summary, output) = fx.run(vec![Candidate::found(&source)], real(), None);

        assert_eq!(summary.files, 1);
        assert_eq!(summary.attempts, 0);
        assert!(output.is_empty());
        assert!(fx.log().is_empty());
    }

    #[test]
    fn test_batch_continues_after_failure() {
        let mut fx = Fixture::new();
        fx.rule("up", r"(?P<n>.*)\.txt", "{n:u}.txt");
        let missing = fx.dir.path().join("gone.txt");
        let present = fx.file("here.txt");

        let (summary, _) = fx.run(
            vec![Candidate::given(&missing), Candidate::given(&present)],
            real(),
            None,
        );

        assert_eq!(summary.failed, 1);
        assert_eq!(summary.succeeded, 1);
        assert!(fx.dir.path().join("HERE.txt").exists());
    }

    #[test]
    fn test_template_failure_is_reported_and_skipped() {
        let mut fx = Fixture::new();
        fx.rule("bad", r"(?P<n>.*)\.txt", "{missing}.txt");
        fx.rule("good", r"(?P<n>.*)\.txt", "{n}.md");
        let source = fx.file("a.txt");

        let (summary, output) = fx.run(vec![Candidate::given(&source)], real(), None);

        assert_eq!(summary.failed, 1);
        assert_eq!(summary.succeeded, 1);
        assert!(output.lines().next().unwrap().starts_with("! [bad]"));
        assert!(fx.dir.path().join("a.md").exists());
    }

    #[test]
    fn test_confirm_discard_tries_next_rule() {
        let mut fx = Fixture::new();
        fx.rule("first", r"(?P<n>.*)\.txt", "{n}-1.txt");
        fx.rule("second", r"(?P<n>.*)\.txt", "{n}-2.txt");
        let source = fx.file("a.txt");

        let mut prompt = Scripted(vec![Decision::Discard, Decision::Accept]);
        let (summary, _) = fx.run(
            vec![Candidate::given(&source)],
            confirming(),
            Some(&mut prompt),
        );

        assert_eq!(summary.attempts, 1);
        assert!(fx.dir.path().join("a-2.txt").exists());
        assert!(!fx.dir.path().join("a-1.txt").exists());
    }

    #[test]
    fn test_confirm_skip_moves_to_next_file() {
        let mut fx = Fixture::new();
        fx.rule("first", r"(?P<n>.*)\.txt", "{n}-1.txt");
        fx.rule("second", r"(?P<n>.*)\.txt", "{n}-2.txt");
        let a = fx.file("a.txt");
        let b = fx.file("b.txt");

        let mut prompt = Scripted(vec![Decision::Skip, Decision::Accept]);
        let (summary, _) = fx.run(
            vec![Candidate::given(&a), Candidate::given(&b)],
            confirming(),
            Some(&mut prompt),
        );

        assert_eq!(summary.attempts, 1);
        assert!(a.exists());
        assert!(fx.dir.path().join("b-1.txt").exists());
    }

    #[test]
    fn test_confirm_abort_stops_batch() {
        let mut fx = Fixture::new();
        fx.rule("first", r"(?P<n>.*)\.txt", "{n}-1.txt");
        let a = fx.file("a.txt");
        let b = fx.file("b.txt");

        let mut prompt = Scripted(vec![Decision::Abort]);
        let (summary, _) = fx.run(
            vec![Candidate::given(&a), Candidate::given(&b)],
            confirming(),
            Some(&mut prompt),
        );

        assert!(summary.aborted);
        assert_eq!(summary.files, 1);
        assert_eq!(summary.attempts, 0);
        assert!(a.exists());
        assert!(b.exists());
        assert!(fx.log().is_empty());
    }

    #[cfg(unix)]
    #[test]
    fn test_non_utf8_file_name_is_left_alone() {
        use std::ffi::OsStr;
        use std::os::unix::ffi::OsStrExt;

        let mut fx = Fixture::new();
        fx.rule("md", r"(.*)\.txt", "{1}.md");
        let source = fx.dir.path().join(OsStr::from_bytes(b"caf\xe9.txt"));
        fs::write(&source, "x").unwrap();

        let (summary, output) = fx.run(vec![Candidate::found(&source)], real(), None);

        assert_eq!(summary.attempts, 0);
        assert!(output.is_empty());
        assert!(source.exists());
        assert_eq!(fs::read_dir(fx.dir.path()).unwrap().count(), 1);
    }

    #[test]
    fn test_manual_rule_source() {
        let fx = Fixture::new();
        let source = fx.file("song.mp3");
        let rule = Rule::manual(r"(?P<n>\w+)\.mp3", "{n:c}.mp3", 0).unwrap();

        let mut renamer = Renamer::new(ActionLogWriter::open(&fx.log_path()).unwrap());
        let mut output = Output::new(Vec::new(), false);
        let summary = Orchestrator::new(
            RuleSource::Manual(&rule),
            &mut renamer,
            &mut output,
            real(),
        )
        .run(vec![Candidate::given(&source)])
        .unwrap();
        renamer.finish().unwrap();

        assert_eq!(summary.succeeded, 1);
        assert!(fx.dir.path().join("Song.mp3").exists());
        let text = String::from_utf8(output.into_inner()).unwrap();
        assert!(text.starts_with("#mi [manual]"));

        let log = fx.log();
        assert_eq!(log[0].rule_id, "manual");
        assert_eq!(log[0].mode.rule_origin, RuleOrigin::Manual);
    }
}
