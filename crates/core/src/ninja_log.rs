//! Reader for `.ninja_log` files.
//!
//! Ninja appends to the same log across invocations, so one file usually holds
//! several builds back to back. Records are written when a command completes,
//! which keeps end times ordered within one build but not across builds. The
//! reader splits the log into [`BuildSession`]s on two signals:
//!
//! - an end time lower than the previous line's end time, and
//! - a command hash already seen in the current session with different
//!   start/end times (catches short incremental builds whose end times never
//!   went backwards).

use crate::error::{AnalysisError, Result};
use std::collections::HashMap;
use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::Path;

/// The only log format version the reader accepts.
pub const NINJA_LOG_HEADER: &str = "# ninja log v5";

const FIELD_COUNT: usize = 5;

/// One build command: its timing and every output it produced.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BuildStepRecord {
    start_ms: u64,
    end_ms: u64,
    outputs: Vec<String>,
}

impl BuildStepRecord {
    fn new(start_ms: u64, end_ms: u64) -> Self {
        Self {
            start_ms,
            end_ms,
            outputs: Vec::new(),
        }
    }

    /// Start time in seconds
    pub fn start(&self) -> f64 {
        self.start_ms as f64 / 1000.0
    }

    /// End time in seconds
    pub fn end(&self) -> f64 {
        self.end_ms as f64 / 1000.0
    }

    /// Duration in seconds
    pub fn duration(&self) -> f64 {
        self.end() - self.start()
    }

    /// Duration in milliseconds. The reader never keeps a step whose end
    /// precedes its start.
    pub fn duration_ms(&self) -> u64 {
        self.end_ms - self.start_ms
    }

    /// Outputs in the order the log listed them. More than one output means a
    /// single command fanned out (precompiled headers, for example).
    pub fn outputs(&self) -> &[String] {
        &self.outputs
    }
}

/// Records belonging to one build invocation, keyed by command hash.
#[derive(Debug, Clone, Default)]
pub struct BuildSession {
    records: Vec<BuildStepRecord>,
    by_hash: HashMap<String, usize>,
}

impl BuildSession {
    pub fn records(&self) -> &[BuildStepRecord] {
        &self.records
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn get(&self, cmdhash: &str) -> Option<&BuildStepRecord> {
        self.by_hash.get(cmdhash).map(|&idx| &self.records[idx])
    }

    /// Output name to duration. A later record naming the same output wins.
    pub fn durations(&self) -> DurationIndex {
        let mut by_output = HashMap::new();
        for record in &self.records {
            for output in &record.outputs {
                by_output.insert(output.clone(), record.duration_ms());
            }
        }
        DurationIndex { by_output }
    }

    fn add(&mut self, step: LogLine<'_>) {
        let idx = match self.by_hash.get(step.cmdhash) {
            Some(&idx) => idx,
            None => {
                self.records.push(BuildStepRecord::new(step.start_ms, step.end_ms));
                let idx = self.records.len() - 1;
                self.by_hash.insert(step.cmdhash.to_string(), idx);
                idx
            }
        };
        self.records[idx].outputs.push(step.output.to_string());
    }

    fn conflicts_with(&self, step: &LogLine<'_>) -> bool {
        self.get(step.cmdhash)
            .is_some_and(|record| record.start_ms != step.start_ms || record.end_ms != step.end_ms)
    }
}

/// Build step durations indexed by output name.
#[derive(Debug, Clone, Default)]
pub struct DurationIndex {
    by_output: HashMap<String, u64>,
}

impl DurationIndex {
    pub fn duration_ms(&self, output: &str) -> Option<u64> {
        self.by_output.get(output).copied()
    }

    pub fn contains(&self, output: &str) -> bool {
        self.by_output.contains_key(output)
    }

    pub fn len(&self) -> usize {
        self.by_output.len()
    }

    pub fn is_empty(&self) -> bool {
        self.by_output.is_empty()
    }
}

#[derive(Debug, Clone, Copy, Default)]
pub struct ReadOptions {
    /// Keep every record in one session instead of splitting on build
    /// boundaries.
    pub show_all: bool,
}

/// A parsed `.ninja_log`, split into build sessions in log order.
#[derive(Debug, Clone, Default)]
pub struct NinjaLog {
    sessions: Vec<BuildSession>,
    skipped_lines: usize,
}

impl NinjaLog {
    /// Read a log from disk. A missing file surfaces as
    /// [`AnalysisError::IoError`] with kind `NotFound` so callers can decide
    /// how to report it.
    pub fn open(path: impl AsRef<Path>, options: ReadOptions) -> Result<Self> {
        let file = File::open(path.as_ref())?;
        Self::from_reader(BufReader::new(file), options)
    }

    pub fn parse(text: &str, options: ReadOptions) -> Result<Self> {
        Self::from_reader(text.as_bytes(), options)
    }

    pub fn from_reader<R: BufRead>(reader: R, options: ReadOptions) -> Result<Self> {
        let mut lines = reader.lines();

        let header = lines.next().transpose()?.unwrap_or_default();
        let header = header.trim_end_matches(['\r', '\n']);
        if header != NINJA_LOG_HEADER {
            return Err(AnalysisError::UnsupportedLogVersion {
                found: header.to_string(),
            });
        }

        let mut sessions = Vec::new();
        let mut current = BuildSession::default();
        let mut skipped_lines = 0;
        let mut last_end_seen = 0u64;

        for (idx, line) in lines.enumerate() {
            let line = line?;
            let Some(step) = LogLine::parse(&line) else {
                // Truncated or corrupt lines show up when ninja is killed mid-write.
                log::debug!("Skipping malformed log line {}: {line:?}", idx + 2);
                skipped_lines += 1;
                continue;
            };

            if !options.show_all {
                let regressed = step.end_ms < last_end_seen;
                if (regressed || current.conflicts_with(&step)) && !current.is_empty() {
                    log::debug!(
                        "Build boundary before log line {} ({} records in previous session)",
                        idx + 2,
                        current.len()
                    );
                    sessions.push(std::mem::take(&mut current));
                }
            }

            last_end_seen = step.end_ms;
            current.add(step);
        }

        if !current.is_empty() {
            sessions.push(current);
        }

        Ok(Self {
            sessions,
            skipped_lines,
        })
    }

    pub fn sessions(&self) -> &[BuildSession] {
        &self.sessions
    }

    /// The most recent build in the log.
    pub fn last_session(&self) -> Option<&BuildSession> {
        self.sessions.last()
    }

    /// Durations of the most recent build.
    pub fn durations(&self) -> DurationIndex {
        self.last_session()
            .map(BuildSession::durations)
            .unwrap_or_default()
    }

    pub fn skipped_lines(&self) -> usize {
        self.skipped_lines
    }
}

struct LogLine<'a> {
    start_ms: u64,
    end_ms: u64,
    output: &'a str,
    cmdhash: &'a str,
}

impl<'a> LogLine<'a> {
    /// `start_ms \t end_ms \t restat \t output \t cmdhash`. The restat
    /// timestamp is ignored. A step that ends before it starts is corrupt.
    fn parse(line: &'a str) -> Option<Self> {
        let fields: Vec<&str> = line.trim().split('\t').collect();
        if fields.len() != FIELD_COUNT {
            return None;
        }
        let start_ms: u64 = fields[0].parse().ok()?;
        let end_ms: u64 = fields[1].parse().ok()?;
        if end_ms < start_ms {
            return None;
        }
        Some(Self {
            start_ms,
            end_ms,
            output: fields[3],
            cmdhash: fields[4],
        })
    }
}
