use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::Path;

use crate::error::TraceError;

/// Line source for one trace, counting lines from 1.
#[derive(Debug)]
pub struct TraceReader<R> {
    inner: R,
    name: String,
    line_number: usize,
}

impl TraceReader<BufReader<File>> {
    pub fn open(path: &Path) -> Result<Self, TraceError> {
        let file = File::open(path).map_err(|source| TraceError::Open {
            path: path.to_path_buf(),
            source,
        })?;
        Ok(Self::new(BufReader::new(file), path.display().to_string()))
    }
}

impl<R: BufRead> TraceReader<R> {
    pub fn new(inner: R, name: impl Into<String>) -> Self {
        Self {
            inner,
            name: name.into(),
            line_number: 0,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Number of the last line returned.
    pub fn line_number(&self) -> usize {
        self.line_number
    }

    /// Next line without its terminator, or `None` at end of file.
    pub fn next_line(&mut self) -> Result<Option<(usize, String)>, TraceError> {
        let mut line = String::new();
        let read = self.inner.read_line(&mut line).map_err(|source| TraceError::Read {
            name: self.name.clone(),
            line: self.line_number + 1,
            source,
        })?;
        if read == 0 {
            return Ok(None);
        }
        if line.ends_with('\n') {
            line.pop();
            if line.ends_with('\r') {
                line.pop();
            }
        }
        self.line_number += 1;
        Ok(Some((self.line_number, line)))
    }
}

impl<R: BufRead + 'static> TraceReader<R> {
    /// Erase the concrete source type.
    pub fn boxed(self) -> TraceReader<Box<dyn BufRead>> {
        TraceReader {
            inner: Box::new(self.inner),
            name: self.name,
            line_number: self.line_number,
        }
    }
}
