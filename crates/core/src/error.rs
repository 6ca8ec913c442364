use std::path::PathBuf;
use thiserror::Error;

pub type Result<T> = std::result::Result<T, AnalysisError>;

#[derive(Error, Debug)]
pub enum AnalysisError {
    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("CSV error: {0}")]
    Csv(#[source] csv::Error),

    /// The first line of the build log is not a header we know how to read
    #[error("unrecognized ninja log version {found:?}")]
    UnsupportedLogVersion { found: String },

    /// A source or dependency file could not be read while counting lines
    #[error("cannot count lines of {}: {source}", path.display())]
    LineCount {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Two report snapshots cannot be interpolated against each other
    #[error("frame input mismatch: {0}")]
    FrameMismatch(String),

    /// A report CSV row could not be parsed
    #[error("malformed report row {line}: {reason}")]
    MalformedRow { line: usize, reason: String },

    /// Easing needs a first and a last frame
    #[error("frame count must be at least 2, got {0}")]
    InvalidFrameCount(usize),
}

impl From<csv::Error> for AnalysisError {
    fn from(err: csv::Error) -> Self {
        // Write failures (a closed stdout) keep their io kind.
        let io_kind = match err.kind() {
            csv::ErrorKind::Io(io) => Some(io.kind()),
            _ => None,
        };
        match io_kind {
            Some(kind) => Self::IoError(std::io::Error::new(kind, err)),
            None => Self::Csv(err),
        }
    }
}

impl AnalysisError {
    pub fn frame_mismatch(msg: impl Into<String>) -> Self {
        Self::FrameMismatch(msg.into())
    }

    pub fn malformed_row(line: usize, reason: impl Into<String>) -> Self {
        Self::MalformedRow {
            line,
            reason: reason.into(),
        }
    }
}
