//! Line counts of sources and headers, memoized per path.
//!
//! A header included by many objects is read once per run. Counting works on
//! bytes, so files that are not UTF-8 still count.

use crate::error::{AnalysisError, Result};
use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};

/// Source of line counts for the cache.
pub trait LineCounter {
    fn count_lines(&self, path: &Path) -> std::io::Result<usize>;
}

/// Counts lines of files on disk, resolving relative paths against `base`.
#[derive(Debug, Clone, Default)]
pub struct FsLineCounter {
    base: Option<PathBuf>,
}

impl FsLineCounter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_base(base: impl AsRef<Path>) -> Self {
        Self {
            base: Some(base.as_ref().to_path_buf()),
        }
    }

    fn resolve(&self, path: &Path) -> PathBuf {
        match &self.base {
            Some(base) if path.is_relative() => base.join(path),
            _ => path.to_path_buf(),
        }
    }
}

impl LineCounter for FsLineCounter {
    fn count_lines(&self, path: &Path) -> std::io::Result<usize> {
        let bytes = fs::read(self.resolve(path))?;
        Ok(count_lines(&bytes))
    }
}

/// Number of lines a line reader would yield: one per newline, plus a final
/// unterminated line if present.
pub fn count_lines(bytes: &[u8]) -> usize {
    let newlines = bytes.iter().filter(|&&b| b == b'\n').count();
    match bytes.last() {
        Some(b'\n') | None => newlines,
        Some(_) => newlines + 1,
    }
}

/// Memoized line counts for one analysis run. Entries are never invalidated.
pub struct LineCountCache<C = FsLineCounter> {
    counter: C,
    counts: HashMap<PathBuf, usize>,
}

impl LineCountCache<FsLineCounter> {
    pub fn new() -> Self {
        Self::with_counter(FsLineCounter::new())
    }
}

impl Default for LineCountCache<FsLineCounter> {
    fn default() -> Self {
        Self::new()
    }
}

impl<C: LineCounter> LineCountCache<C> {
    pub fn with_counter(counter: C) -> Self {
        Self {
            counter,
            counts: HashMap::new(),
        }
    }

    /// Line count of `path`; the file is read on first lookup only.
    pub fn get(&mut self, path: impl AsRef<Path>) -> Result<usize> {
        let path = path.as_ref();
        if let Some(&count) = self.counts.get(path) {
            return Ok(count);
        }

        let count = self
            .counter
            .count_lines(path)
            .map_err(|source| AnalysisError::LineCount {
                path: path.to_path_buf(),
                source,
            })?;
        self.counts.insert(path.to_path_buf(), count);
        Ok(count)
    }

    pub fn len(&self) -> usize {
        self.counts.len()
    }

    pub fn is_empty(&self) -> bool {
        self.counts.is_empty()
    }
}
