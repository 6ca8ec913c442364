//! # Build Cost Core
//!
//! Correlates the artifacts of a ninja build into a per-object compile cost
//! report.
//!
//! ## Pipeline
//!
//! ```text
//! .ninja_log ──────> NinjaLog (sessions) ──> DurationIndex ──┐
//! ninja -t deps ───> DependencyIndex ────────────────────────┼──> ReportBuilder ──> CSV
//! ninja -t commands> scan_commands ──> [CompileCommand] ─────┘        │
//!                                                              LineCountCache
//! ```
//!
//! ## Example
//!
//! ```no_run
//! use buildcost_core::{
//!     scan_commands, DependencyIndex, LineCountCache, NinjaLog, ReadOptions, ReportBuilder,
//!     DEFAULT_COMPILER,
//! };
//!
//! fn main() -> anyhow::Result<()> {
//!     let log = NinjaLog::open(".ninja_log", ReadOptions::default())?;
//!     let durations = log.durations();
//!     let deps = DependencyIndex::parse(&std::fs::read_to_string("deps.txt")?);
//!     let commands = std::fs::read_to_string("commands.txt")?;
//!     let commands = scan_commands(commands.lines(), DEFAULT_COMPILER);
//!
//!     let mut lines = LineCountCache::new();
//!     let summary = ReportBuilder::new(&durations, &deps).write(
//!         &mut std::io::stdout(),
//!         &commands,
//!         &mut lines,
//!     )?;
//!     eprintln!("{} rows", summary.rows);
//!     Ok(())
//! }
//! ```

mod anim;
mod commands;
mod deps;
mod error;
mod line_count;
mod ninja_log;
mod report;

pub use anim::{ease_weight, frame_file_name, FrameRow, FrameSeries, DEFAULT_FRAME_COUNT};
pub use commands::{parse_compile_command, scan_commands, CompileCommand, DEFAULT_COMPILER};
pub use deps::DependencyIndex;
pub use error::{AnalysisError, Result};
pub use line_count::{count_lines, FsLineCounter, LineCountCache, LineCounter};
pub use ninja_log::{
    BuildSession, BuildStepRecord, DurationIndex, NinjaLog, ReadOptions, NINJA_LOG_HEADER,
};
pub use report::{ReportBuilder, ReportRow, ReportSummary, REPORT_COLUMNS, REPORT_HEADER};
