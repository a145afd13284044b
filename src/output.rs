//! Human-readable output: per-attempt status lines and listings.

use colored::Colorize;
use std::io::{self, IsTerminal, Write};
use std::path::Path;

use crate::action::{ActionMode, LogLine};
use crate::rule::Rule;

/// Check if we should use colors on stdout
pub fn should_use_colors() -> bool {
    // https://no-color.org/
    if std::env::var("NO_COLOR").is_ok() {
        return false;
    }
    if std::env::var("FORCE_COLOR").is_ok() {
        return true;
    }
    io::stdout().is_terminal()
}

/// Styled writer for command results
pub struct Output<W: Write> {
    writer: W,
    colors: bool,
}

impl Output<io::Stdout> {
    pub fn stdout() -> Self {
        let colors = should_use_colors();
        if !colors {
            colored::control::set_override(false);
        }
        Self::new(io::stdout(), colors)
    }
}

impl<W: Write> Output<W> {
    pub fn new(writer: W, colors: bool) -> Self {
        Self { writer, colors }
    }

    pub fn into_inner(self) -> W {
        self.writer
    }

    /// One line per rename attempt: `<code> [rule] source -> dest`
    pub fn status(
        &mut self,
        mode: ActionMode,
        success: bool,
        rule: &str,
        source: &Path,
        dest: &Path,
    ) -> io::Result<()> {
        let code = mode.status_code(success);
        let source = source.display().to_string();
        let dest = dest.display().to_string();

        if self.colors {
            let code = if !success {
                code.red().bold()
            } else if mode.simulated {
                code.yellow().bold()
            } else {
                code.green().bold()
            };
            writeln!(
                self.writer,
                "{} [{}] {} {} {}",
                code,
                rule.dimmed(),
                source.dimmed(),
                "->".cyan(),
                dest
            )
        } else {
            writeln!(self.writer, "{} [{}] {} -> {}", code, rule, source, dest)
        }
    }

    /// Report a file a rule matched but could not produce a name for
    pub fn format_failure(&mut self, rule: &str, source: &Path, reason: &str) -> io::Result<()> {
        let source = source.display().to_string();
        if self.colors {
            writeln!(
                self.writer,
                "{} [{}] {}: {}",
                "!".red().bold(),
                rule.dimmed(),
                source,
                reason.red()
            )
        } else {
            writeln!(self.writer, "! [{}] {}: {}", rule, source, reason)
        }
    }

    pub fn rule(&mut self, rule: &Rule) -> io::Result<()> {
        let name = rule.name().unwrap_or("-");
        if self.colors {
            writeln!(
                self.writer,
                "{}  {}  h={}  {}  {}  {}",
                rule.id().bold(),
                name.cyan(),
                rule.height(),
                rule.pattern_text(),
                "=>".dimmed(),
                rule.template_text()
            )
        } else {
            writeln!(
                self.writer,
                "{}  {}  h={}  {}  =>  {}",
                rule.id(),
                name,
                rule.height(),
                rule.pattern_text(),
                rule.template_text()
            )
        }
    }

    /// A rule that would apply to `source`, with what it would produce
    pub fn candidate(&mut self, rule: &Rule, source: &Path, dest: &Path) -> io::Result<()> {
        let source = source.display().to_string();
        let dest = dest.display().to_string();
        if self.colors {
            writeln!(
                self.writer,
                "[{}] {} {} {}",
                rule.name_prefix().bold(),
                source.dimmed(),
                "->".cyan(),
                dest
            )
        } else {
            writeln!(
                self.writer,
                "[{}] {} -> {}",
                rule.name_prefix(),
                source,
                dest
            )
        }
    }

    pub fn log_line(&mut self, line: &LogLine) -> io::Result<()> {
        let outcome = match line.success() {
            Some(true) => "ok",
            Some(false) => "failed",
            None => "incomplete",
        };
        let source = line.abs_source.display().to_string();
        let dest = line.abs_dest.display().to_string();
        let code = line.mode.status_code(line.success().unwrap_or(false));

        if self.colors {
            let outcome = match line.success() {
                Some(true) => outcome.green(),
                Some(false) => outcome.red(),
                None => outcome.yellow().bold(),
            };
            writeln!(
                self.writer,
                "{} {} {:<10} [{}] {} {} {}",
                line.when.dimmed(),
                code,
                outcome,
                line.rule_id,
                source,
                "->".cyan(),
                dest
            )
        } else {
            writeln!(
                self.writer,
                "{} {} {:<10} [{}] {} -> {}",
                line.when, code, outcome, line.rule_id, source, dest
            )
        }
    }

    pub fn message(&mut self, msg: &str) -> io::Result<()> {
        writeln!(self.writer, "{}", msg)
    }
}
