//! Consumes one compile cycle's raw output lines into a [`CompilationOutcome`].

use std::path::PathBuf;
use std::sync::LazyLock;
use std::time::Duration;

use regex::Regex;

use crate::problem::{Diagnostic, Problem};
use crate::report::ProblematicFile;
use crate::types::{Location, Typing};

/// How many context lines fcsh prints after a located diagnostic header.
/// The second one is the offending source line.
const CONTEXT_BLOCK_LINES: usize = 4;

struct LinePatterns {
    configuration_load: Regex,
    target_id: Regex,
    recompile_note: Regex,
    reason_note: Regex,
    byte_count: Regex,
    nothing_changed: Regex,
    files_changed: Regex,
    located_problem: Regex,
    global_error: Regex,
    file_problem: Regex,
}

impl LinePatterns {
    fn new() -> Self {
        Self {
            configuration_load: Regex::new(r"^Loading configuration file ")
                .expect("valid configuration regex"),
            target_id: Regex::new(r"^fcsh: Assigned \d+ as the compile target id")
                .expect("valid target id regex"),
            recompile_note: Regex::new(r"^Recompile: ").expect("valid recompile regex"),
            reason_note: Regex::new(r"^Reason: ").expect("valid reason regex"),
            byte_count: Regex::new(r"\(\d+ bytes\)$").expect("valid byte count regex"),
            nothing_changed: Regex::new(r"^Nothing has changed ").expect("valid no-op regex"),
            files_changed: Regex::new(r"^Files changed: (\d+) Files affected: (\d+)")
                .expect("valid files changed regex"),
            located_problem: Regex::new(r"^(.*?)\((\d+)\): col: (\d+) (.*)$")
                .expect("valid located problem regex"),
            global_error: Regex::new(r"^Error: (.*)$").expect("valid global error regex"),
            file_problem: Regex::new(r"^(.*?): (.*)$").expect("valid file problem regex"),
        }
    }
}

static LINE_PATTERNS: LazyLock<LinePatterns> = LazyLock::new(LinePatterns::new);

/// Immutable per-cycle configuration, fixed at construction.
#[derive(Debug, Clone, Copy, Default)]
pub struct ParserOptions {
    pub typing: Typing,
    /// Echo each consumed line at debug level.
    pub echo_lines: bool,
}

/// Everything one compile cycle produced. Built incrementally while lines
/// stream in, read-only once the cycle ends.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CompilationOutcome {
    success: bool,
    recompiled_file_count: Option<usize>,
    files: Vec<ProblematicFile>,
    unrecognized_lines: Vec<String>,
    elapsed: Duration,
}

impl CompilationOutcome {
    /// False unless the byte-count confirmation for a completed link was seen.
    #[must_use]
    pub fn success(&self) -> bool {
        self.success
    }

    /// True for the first compile of a session: no recompiled-file count was
    /// ever reported.
    #[must_use]
    pub fn bootstrap(&self) -> bool {
        self.recompiled_file_count.is_none()
    }

    #[must_use]
    pub fn recompilation(&self) -> bool {
        !self.bootstrap()
    }

    #[must_use]
    pub fn did_anything(&self) -> bool {
        self.bootstrap() || self.recompiled_file_count.unwrap_or(0) > 0
    }

    #[must_use]
    pub fn recompiled_file_count(&self) -> Option<usize> {
        self.recompiled_file_count
    }

    /// Problematic files in first-reference order.
    #[must_use]
    pub fn files(&self) -> &[ProblematicFile] {
        &self.files
    }

    /// Lines that matched no known shape, in arrival order. Never discarded
    /// silently so protocol drift stays visible.
    #[must_use]
    pub fn unrecognized_lines(&self) -> &[String] {
        &self.unrecognized_lines
    }

    #[must_use]
    pub fn problem_count(&self) -> usize {
        self.files.iter().map(|f| f.diagnostics().len()).sum()
    }

    #[must_use]
    pub fn has_problems(&self) -> bool {
        !self.files.is_empty()
    }

    #[must_use]
    pub fn elapsed(&self) -> Duration {
        self.elapsed
    }

    pub fn set_elapsed(&mut self, elapsed: Duration) {
        self.elapsed = elapsed;
    }
}

/// One-shot parser for a single compile cycle's output.
pub struct OutputParser {
    options: ParserOptions,
    source_directories: Vec<PathBuf>,
    outcome: CompilationOutcome,
}

impl OutputParser {
    #[must_use]
    pub fn new(options: ParserOptions, source_directories: Vec<PathBuf>) -> Self {
        Self {
            options,
            source_directories,
            outcome: CompilationOutcome::default(),
        }
    }

    /// Classify every line, in order. Line shapes are tested top-down; each
    /// consumes one line except a located diagnostic header, which also
    /// consumes its fixed-format context block.
    #[must_use]
    pub fn parse(mut self, lines: &[String]) -> CompilationOutcome {
        let p = &*LINE_PATTERNS;
        let mut index = 0;
        while index < lines.len() {
            let line = lines[index].trim_end_matches('\r');
            index += 1;
            if self.options.echo_lines {
                tracing::debug!(">> {line}");
            }

            if p.configuration_load.is_match(line)
                || p.target_id.is_match(line)
                || p.recompile_note.is_match(line)
                || p.reason_note.is_match(line)
                || line.trim().is_empty()
            {
                continue;
            }
            if p.byte_count.is_match(line) {
                self.outcome.success = true;
                continue;
            }
            if p.nothing_changed.is_match(line) {
                self.outcome.recompiled_file_count = Some(0);
                continue;
            }
            if let Some(c) = p.files_changed.captures(line) {
                let changed: usize = c[1].parse().unwrap_or(0);
                let affected: usize = c[2].parse().unwrap_or(0);
                self.outcome.recompiled_file_count = Some(changed + affected);
                continue;
            }
            if let Some(c) = p.located_problem.captures(line) {
                let (Ok(line_number), Ok(column)) =
                    (c[2].parse::<u32>(), c[3].parse::<u32>())
                else {
                    self.outcome.unrecognized_lines.push(line.to_string());
                    continue;
                };
                let context_end = lines.len().min(index + CONTEXT_BLOCK_LINES);
                let context = &lines[index..context_end];
                index = context_end;
                // A truncated context block at stream end still yields the
                // classified diagnostic, just without a location.
                let location = context.get(1).map(|source_line| Location {
                    line_number,
                    // Reported one-based; stored zero-based.
                    column_number: column.saturating_sub(1),
                    source_line: source_line.trim_end_matches('\r').to_string(),
                });
                self.insert(
                    Some(c[1].to_string()),
                    Diagnostic::new(Problem::classify(&c[4]), location),
                );
                continue;
            }
            if let Some(c) = p.global_error.captures(line) {
                self.insert(None, Diagnostic::new(Problem::classify(&c[1]), None));
                continue;
            }
            if let Some(c) = p.file_problem.captures(line) {
                self.insert(
                    Some(c[1].to_string()),
                    Diagnostic::new(Problem::classify(&c[2]), None),
                );
                continue;
            }
            self.outcome.unrecognized_lines.push(line.to_string());
        }
        self.outcome
    }

    fn insert(&mut self, file_name: Option<String>, diagnostic: Diagnostic) {
        if self.options.typing == Typing::Dynamic
            && matches!(diagnostic.problem(), Problem::MissingReturnType(_))
        {
            return;
        }
        let index = match self
            .outcome
            .files
            .iter()
            .position(|f| f.file_name() == file_name.as_deref())
        {
            Some(index) => index,
            None => {
                self.outcome
                    .files
                    .push(ProblematicFile::new(file_name, self.source_directories.clone()));
                self.outcome.files.len() - 1
            }
        };
        self.outcome.files[index].push(diagnostic);
    }
}
