//! Compile cost report: one CSV row per compile command timed in the last
//! build.
//!
//! ```text
//! name,t_ms,num_dependent_lines,num_lines,num_deps
//! ../../base/foo.cc,2250,180432,312,611
//! ```
//!
//! Fields are quoted when needed, so paths containing commas survive a
//! round trip through [`crate::FrameSeries`].

use serde::Serialize;
use std::io::Write;

use crate::commands::CompileCommand;
use crate::deps::DependencyIndex;
use crate::error::Result;
use crate::line_count::{LineCountCache, LineCounter};
use crate::ninja_log::DurationIndex;

/// Column header shared by the cost report and animation frames.
pub const REPORT_HEADER: &str = "name,t_ms,num_dependent_lines,num_lines,num_deps";

pub const REPORT_COLUMNS: [&str; 5] = [
    "name",
    "t_ms",
    "num_dependent_lines",
    "num_lines",
    "num_deps",
];

/// Cost of compiling one object. Serializes in [`REPORT_COLUMNS`] order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ReportRow {
    #[serde(rename = "name")]
    pub source_path: String,
    #[serde(rename = "t_ms")]
    pub duration_ms: u64,
    #[serde(rename = "num_dependent_lines")]
    pub dependency_line_total: usize,
    #[serde(rename = "num_lines")]
    pub source_line_count: usize,
    #[serde(rename = "num_deps")]
    pub dependency_count: usize,
}

/// CSV writer for report-shaped output. The header is written explicitly so
/// an empty report still carries it.
pub(crate) fn report_writer<W: Write>(out: W) -> csv::Writer<W> {
    csv::WriterBuilder::new().has_headers(false).from_writer(out)
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ReportSummary {
    /// Rows written
    pub rows: usize,
    /// Compile commands without a timing in the last build
    pub untimed: usize,
}

/// Joins durations, dependencies and compile commands into report rows.
pub struct ReportBuilder<'a> {
    durations: &'a DurationIndex,
    deps: &'a DependencyIndex,
}

impl<'a> ReportBuilder<'a> {
    pub fn new(durations: &'a DurationIndex, deps: &'a DependencyIndex) -> Self {
        Self { durations, deps }
    }

    /// Row for one compile command, or `None` when the object was not built
    /// in the logged session.
    pub fn row<C: LineCounter>(
        &self,
        command: &CompileCommand,
        lines: &mut LineCountCache<C>,
    ) -> Result<Option<ReportRow>> {
        let Some(duration_ms) = self.durations.duration_ms(&command.object) else {
            return Ok(None);
        };

        let deps = self.deps.deps_of(&command.object);
        let source_line_count = lines.get(&command.source)?;
        let mut dependency_line_total = 0;
        for dep in deps {
            dependency_line_total += lines.get(dep)?;
        }

        Ok(Some(ReportRow {
            source_path: command.source.clone(),
            duration_ms,
            dependency_line_total,
            source_line_count,
            dependency_count: deps.len(),
        }))
    }

    /// Write the header and one row per timed command, in command order.
    /// Rows go out as soon as they are computed.
    pub fn write<W: Write, C: LineCounter>(
        &self,
        out: &mut W,
        commands: &[CompileCommand],
        lines: &mut LineCountCache<C>,
    ) -> Result<ReportSummary> {
        let mut summary = ReportSummary::default();
        let mut writer = report_writer(out);
        writer.write_record(REPORT_COLUMNS)?;
        for command in commands {
            match self.row(command, lines)? {
                Some(row) => {
                    writer.serialize(&row)?;
                    summary.rows += 1;
                }
                None => {
                    log::debug!("No timing for {}, skipping", command.object);
                    summary.untimed += 1;
                }
            }
        }
        writer.flush()?;
        Ok(summary)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::line_count::FsLineCounter;
    use crate::ninja_log::{NinjaLog, ReadOptions};
    use crate::AnalysisError;
    use pretty_assertions::assert_eq;
    use std::fs;
    use std::io;

    /// Accepts nothing, like stdout piped into a reader that already exited.
    struct ClosedPipe;

    impl Write for ClosedPipe {
        fn write(&mut self, _buf: &[u8]) -> io::Result<usize> {
            Err(io::Error::from(io::ErrorKind::BrokenPipe))
        }

        fn flush(&mut self) -> io::Result<()> {
            Err(io::Error::from(io::ErrorKind::BrokenPipe))
        }
    }

    fn command(object: &str, source: &str) -> CompileCommand {
        CompileCommand {
            object: object.to_string(),
            source: source.to_string(),
        }
    }

    #[test]
    fn single_timed_object() {
        let temp = tempfile::tempdir().unwrap();
        fs::write(temp.path().join("foo.h"), "1\n2\n3\n4\n5\n6\n7\n8\n9\n10\n").unwrap();
        fs::write(temp.path().join("foo.cpp"), "a\nb\nc\nd\ne\n").unwrap();

        let log = NinjaLog::parse("# ninja log v5\n0\t250\t0\tfoo.obj\tH1\n", ReadOptions::default())
            .unwrap();
        let durations = log.durations();
        let deps = DependencyIndex::parse("foo.obj:\nfoo.h\n\n");
        let mut lines = LineCountCache::with_counter(FsLineCounter::with_base(temp.path()));

        let mut out = Vec::new();
        let summary = ReportBuilder::new(&durations, &deps)
            .write(&mut out, &[command("foo.obj", "foo.cpp")], &mut lines)
            .unwrap();

        assert_eq!(
            String::from_utf8(out).unwrap(),
            "name,t_ms,num_dependent_lines,num_lines,num_deps\nfoo.cpp,250,10,5,1\n"
        );
        assert_eq!(summary, ReportSummary { rows: 1, untimed: 0 });
    }

    #[test]
    fn untimed_objects_are_left_out_without_touching_files() {
        let temp = tempfile::tempdir().unwrap();
        fs::write(temp.path().join("a.cc"), "x\n").unwrap();

        let log = NinjaLog::parse("# ninja log v5\n0\t10\t0\ta.obj\th\n", ReadOptions::default())
            .unwrap();
        let durations = log.durations();
        let deps = DependencyIndex::default();
        let mut lines = LineCountCache::with_counter(FsLineCounter::with_base(temp.path()));

        let mut out = Vec::new();
        let summary = ReportBuilder::new(&durations, &deps)
            .write(
                &mut out,
                &[command("a.obj", "a.cc"), command("b.obj", "does-not-exist.cc")],
                &mut lines,
            )
            .unwrap();

        let text = String::from_utf8(out).unwrap();
        assert_eq!(text.lines().collect::<Vec<_>>(), vec![REPORT_HEADER, "a.cc,10,0,1,0"]);
        assert_eq!(summary.untimed, 1);
    }

    #[test]
    fn shared_headers_are_counted_per_object() {
        let temp = tempfile::tempdir().unwrap();
        fs::write(temp.path().join("common.h"), "1\n2\n").unwrap();
        fs::write(temp.path().join("a.cc"), "1\n").unwrap();
        fs::write(temp.path().join("b.cc"), "1\n2\n3\n").unwrap();

        let log = NinjaLog::parse(
            "# ninja log v5\n0\t10\t0\ta.obj\th1\n0\t20\t0\tb.obj\th2\n",
            ReadOptions::default(),
        )
        .unwrap();
        let durations = log.durations();
        let deps = DependencyIndex::parse("a.obj:\ncommon.h\n\nb.obj:\ncommon.h\ncommon.h\n\n");
        let mut lines = LineCountCache::with_counter(FsLineCounter::with_base(temp.path()));
        let builder = ReportBuilder::new(&durations, &deps);

        let b = builder.row(&command("b.obj", "b.cc"), &mut lines).unwrap().unwrap();
        assert_eq!(
            b,
            ReportRow {
                source_path: "b.cc".to_string(),
                duration_ms: 20,
                dependency_line_total: 4,
                source_line_count: 3,
                dependency_count: 2,
            }
        );
        let a = builder.row(&command("a.obj", "a.cc"), &mut lines).unwrap().unwrap();
        assert_eq!(a.dependency_line_total, 2);
        assert_eq!(lines.len(), 3);
    }

    #[test]
    fn missing_dependency_aborts() {
        let temp = tempfile::tempdir().unwrap();
        fs::write(temp.path().join("a.cc"), "x\n").unwrap();

        let log = NinjaLog::parse("# ninja log v5\n0\t10\t0\ta.obj\th\n", ReadOptions::default())
            .unwrap();
        let durations = log.durations();
        let deps = DependencyIndex::parse("a.obj:\ngone.h\n\n");
        let mut lines = LineCountCache::with_counter(FsLineCounter::with_base(temp.path()));

        let err = ReportBuilder::new(&durations, &deps)
            .write(&mut Vec::<u8>::new(), &[command("a.obj", "a.cc")], &mut lines)
            .unwrap_err();
        assert!(matches!(err, AnalysisError::LineCount { .. }));
        assert!(err.to_string().contains("gone.h"));
    }

    #[test]
    fn source_paths_with_commas_are_quoted() {
        let temp = tempfile::tempdir().unwrap();
        fs::write(temp.path().join("a,b.cpp"), "1\n2\n").unwrap();

        let log = NinjaLog::parse("# ninja log v5\n0\t40\t0\tab.obj\th\n", ReadOptions::default())
            .unwrap();
        let durations = log.durations();
        let deps = DependencyIndex::default();
        let mut lines = LineCountCache::with_counter(FsLineCounter::with_base(temp.path()));

        let mut out = Vec::new();
        ReportBuilder::new(&durations, &deps)
            .write(&mut out, &[command("ab.obj", "a,b.cpp")], &mut lines)
            .unwrap();

        assert_eq!(
            String::from_utf8(out).unwrap(),
            format!("{REPORT_HEADER}\n\"a,b.cpp\",40,0,2,0\n")
        );
    }

    #[test]
    fn empty_report_still_has_header() {
        let durations = DurationIndex::default();
        let deps = DependencyIndex::default();
        let mut lines = LineCountCache::new();

        let mut out = Vec::new();
        let summary = ReportBuilder::new(&durations, &deps)
            .write(&mut out, &[], &mut lines)
            .unwrap();
        assert_eq!(String::from_utf8(out).unwrap(), format!("{REPORT_HEADER}\n"));
        assert_eq!(summary, ReportSummary::default());
    }

    #[test]
    fn closed_output_surfaces_as_broken_pipe() {
        let durations = DurationIndex::default();
        let deps = DependencyIndex::default();
        let mut lines = LineCountCache::new();

        let err = ReportBuilder::new(&durations, &deps)
            .write(&mut ClosedPipe, &[], &mut lines)
            .unwrap_err();
        match err {
            AnalysisError::IoError(err) => assert_eq!(err.kind(), io::ErrorKind::BrokenPipe),
            other => panic!("unexpected error: {other}"),
        }
    }
}
