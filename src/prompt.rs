//! Interactive confirmation of individual renames.

use std::io::{self, BufRead, Write};
use std::path::Path;

use crate::rule::Rule;

/// What the operator wants done with a proposed rename
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Decision {
    /// Perform this rename
    Accept,
    /// Drop this rename and try the next rule for the same file
    Discard,
    /// Stop trying rules for this file
    Skip,
    /// Stop the whole batch
    Abort,
}

pub trait Prompt {
    fn decide(&mut self, source: &Path, dest: &Path, rule: &Rule) -> io::Result<Decision>;
}

/// Parse one answer line; `None` if it is not understood
pub fn parse_decision(answer: &str) -> Option<Decision> {
    match answer.trim().to_lowercase().as_str() {
        "y" | "yes" => Some(Decision::Accept),
        "n" | "no" | "d" | "discard" => Some(Decision::Discard),
        "s" | "skip" => Some(Decision::Skip),
        "a" | "q" | "abort" | "quit" => Some(Decision::Abort),
        _ => None,
    }
}

/// Asks on a line-based terminal. End of input aborts.
pub struct LinePrompt<R, W> {
    input: R,
    output: W,
}

impl LinePrompt<io::StdinLock<'static>, io::Stderr> {
    pub fn stdio() -> Self {
        Self::new(io::stdin().lock(), io::stderr())
    }
}

impl<R: BufRead, W: Write> LinePrompt<R, W> {
    pub fn new(input: R, output: W) -> Self {
        Self { input, output }
    }
}

impl<R: BufRead, W: Write> Prompt for LinePrompt<R, W> {
    fn decide(&mut self, source: &Path, dest: &Path, rule: &Rule) -> io::Result<Decision> {
        writeln!(
            self.output,
            "[{}] {} -> {}",
            rule.name_prefix(),
            source.display(),
            dest.display()
        )?;

        let mut line = String::new();
        loop {
            write!(
                self.output,
                "Rename? [y]es / [n]o, try next rule / [s]kip file / [a]bort: "
            )?;
            self.output.flush()?;

            line.clear();
            if self.input.read_line(&mut line)? == 0 {
                writeln!(self.output)?;
                return Ok(Decision::Abort);
            }

            match parse_decision(&line) {
                Some(decision) => return Ok(decision),
                None => writeln!(self.output, "Unrecognized answer: {}", line.trim())?,
            }
        }
    }
}
