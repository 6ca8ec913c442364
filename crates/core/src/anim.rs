//! Animation frames between two cost reports.
//!
//! Given a "before" and an "after" report of the same build, produces a series
//! of intermediate reports whose numbers ease from the first to the second.
//! The weight follows half a cosine period so the animation accelerates and
//! decelerates smoothly instead of jumping.

use std::f64::consts::PI;
use std::io::Write;

use crate::error::{AnalysisError, Result};
use crate::report::{report_writer, REPORT_COLUMNS};

/// Frames written when the caller does not ask for a specific count.
pub const DEFAULT_FRAME_COUNT: usize = 45;

const VALUE_COLUMNS: usize = 4;

/// One data row of a cost report.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FrameRow {
    pub name: String,
    pub values: [u64; VALUE_COLUMNS],
}

type RawRow = (String, u64, u64, u64, u64);

/// Data rows of a report CSV with the line each one started on. The header
/// line is skipped.
fn read_rows(text: &str) -> Result<Vec<(usize, FrameRow)>> {
    let mut reader = csv::ReaderBuilder::new()
        .has_headers(true)
        .trim(csv::Trim::All)
        .from_reader(text.as_bytes());

    let mut rows = Vec::new();
    for record in reader.records() {
        let record = record.map_err(row_error)?;
        let line = record.position().map_or(0, |pos| pos.line() as usize);
        let (name, t_ms, dep_lines, lines, deps): RawRow = record
            .deserialize(None)
            .map_err(|err| AnalysisError::malformed_row(line, err.to_string()))?;
        rows.push((
            line,
            FrameRow {
                name,
                values: [t_ms, dep_lines, lines, deps],
            },
        ));
    }
    Ok(rows)
}

fn row_error(err: csv::Error) -> AnalysisError {
    match err.position() {
        Some(pos) => AnalysisError::malformed_row(pos.line() as usize, err.to_string()),
        None => err.into(),
    }
}

/// Weight of the start report in frame `index` of `frame_count`: 1.0 for the
/// first frame, 0.0 for the last.
pub fn ease_weight(index: usize, frame_count: usize) -> f64 {
    let span = frame_count.saturating_sub(1).max(1) as f64;
    let theta = index as f64 * PI / span;
    (theta.cos() + 1.0) / 2.0
}

pub fn frame_file_name(index: usize) -> String {
    format!("anim-frame{index}.csv")
}

/// Paired rows of two reports, checked to line up row by row.
#[derive(Debug, Clone)]
pub struct FrameSeries {
    start: Vec<FrameRow>,
    end: Vec<FrameRow>,
}

impl FrameSeries {
    /// Both inputs are complete report CSVs including the header line. Rows
    /// are matched by position, and must name the same source at each
    /// position: one source can produce several objects, so matching by name
    /// alone would be ambiguous.
    pub fn parse(start_csv: &str, end_csv: &str) -> Result<Self> {
        let start_rows = read_rows(start_csv)?;
        let end_rows = read_rows(end_csv)?;
        if start_rows.len() != end_rows.len() {
            return Err(AnalysisError::frame_mismatch(format!(
                "start has {} rows, end has {}",
                start_rows.len(),
                end_rows.len()
            )));
        }

        let mut start = Vec::with_capacity(start_rows.len());
        let mut end = Vec::with_capacity(end_rows.len());
        for ((line_no, a), (_, b)) in start_rows.into_iter().zip(end_rows) {
            if a.name != b.name {
                return Err(AnalysisError::frame_mismatch(format!(
                    "line {line_no}: {} does not match {}",
                    a.name, b.name
                )));
            }
            start.push(a);
            end.push(b);
        }

        Ok(Self { start, end })
    }

    pub fn len(&self) -> usize {
        self.start.len()
    }

    pub fn is_empty(&self) -> bool {
        self.start.is_empty()
    }

    /// Rows of frame `index` out of `frame_count`.
    pub fn frame(&self, index: usize, frame_count: usize) -> Result<Vec<FrameRow>> {
        if frame_count < 2 {
            return Err(AnalysisError::InvalidFrameCount(frame_count));
        }
        let t = ease_weight(index, frame_count);
        let t2 = 1.0 - t;

        Ok(self
            .start
            .iter()
            .zip(&self.end)
            .map(|(a, b)| {
                let mut values = [0u64; VALUE_COLUMNS];
                for (col, value) in values.iter_mut().enumerate() {
                    *value = (a.values[col] as f64 * t + b.values[col] as f64 * t2) as u64;
                }
                FrameRow {
                    name: a.name.clone(),
                    values,
                }
            })
            .collect())
    }

    pub fn write_frame<W: Write>(&self, out: &mut W, index: usize, frame_count: usize) -> Result<()> {
        let rows = self.frame(index, frame_count)?;
        let mut writer = report_writer(out);
        writer.write_record(REPORT_COLUMNS)?;
        for row in rows {
            let [t_ms, dep_lines, lines, deps] = row.values;
            writer.serialize((&row.name, t_ms, dep_lines, lines, deps))?;
        }
        writer.flush()?;
        Ok(())
    }
}
