//! Parser for `ninja -t deps` output.
//!
//! ```text
//! obj/foo.obj: #deps 2, deps mtime 1234 (VALID)
//!     ../../foo.h
//!     ../../bar.h
//!
//! ```
//!
//! Files pulled in redundantly or through a precompiled header are not
//! listed by ninja, so they do not count here either.

use std::collections::HashMap;
use std::io::{BufRead, Read};

use crate::error::Result;

/// Object file name to the dependency paths ninja recorded for it.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DependencyIndex {
    by_object: HashMap<String, Vec<String>>,
}

impl DependencyIndex {
    pub fn parse(text: &str) -> Self {
        Self::from_lines(text.split_inclusive('\n'))
    }

    pub fn from_reader<R: BufRead>(mut reader: R) -> Result<Self> {
        let mut text = String::new();
        reader.read_to_string(&mut text)?;
        Ok(Self::parse(&text))
    }

    /// Lines may keep their `\n`. A carriage return is part of the line:
    /// `"x\r"` is a dependency, a lone `"\r"` closes the entry.
    pub fn from_lines<'a>(lines: impl IntoIterator<Item = &'a str>) -> Self {
        let mut by_object = HashMap::new();
        let mut active: Option<(String, Vec<String>)> = None;

        for line in lines {
            let line = line.strip_suffix('\n').unwrap_or(line);
            if let Some((object, _)) = line.split_once(':') {
                if let Some((dropped, _)) = active.replace((object.to_string(), Vec::new())) {
                    log::debug!("Entry {dropped} was not closed before {object}, dropping it");
                }
            } else if line.len() >= 2 {
                match active.as_mut() {
                    Some((_, deps)) => deps.push(line.trim().to_string()),
                    None => log::debug!("Dependency {line:?} outside of any entry"),
                }
            } else if let Some((object, deps)) = active.take() {
                by_object.insert(object, deps);
            }
        }

        // An entry without a closing blank line is never committed.
        if let Some((object, _)) = active {
            log::debug!("Entry {object} not terminated by a blank line, dropping it");
        }

        Self { by_object }
    }

    pub fn get(&self, object: &str) -> Option<&[String]> {
        self.by_object.get(object).map(Vec::as_slice)
    }

    /// Dependencies of `object`, empty when ninja listed none.
    pub fn deps_of(&self, object: &str) -> &[String] {
        self.get(object).unwrap_or(&[])
    }

    pub fn len(&self) -> usize {
        self.by_object.len()
    }

    pub fn is_empty(&self) -> bool {
        self.by_object.is_empty()
    }
}
