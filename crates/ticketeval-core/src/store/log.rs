use std::fs::{File, OpenOptions};
use std::io::{BufRead, BufReader, Write};
use std::path::{Path, PathBuf};

use serde::de::DeserializeOwned;
use serde::Serialize;

use crate::error::{EvalError, Result};

/// Append-only JSONL log. Every entry is written as one line and flushed
/// before `append` returns.
pub struct AppendLog {
    path: PathBuf,
    file: File,
}

impl AppendLog {
    pub fn open(path: &Path) -> Result<Self> {
        let file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(path)
            .map_err(|e| EvalError::io_operation("open log", path.display(), e))?;

        Ok(Self {
            path: path.to_path_buf(),
            file,
        })
    }

    pub fn append<T: Serialize>(&mut self, entry: &T) -> Result<()> {
        let line = serde_json::to_string(entry)?;
        writeln!(self.file, "{}", line)
            .and_then(|_| self.file.flush())
            .map_err(|e| EvalError::io_operation("write to", self.path.display(), e))
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Read every entry of a log. A missing file reads as empty.
    pub fn read_all<T: DeserializeOwned>(path: &Path) -> Result<Vec<T>> {
        if !path.exists() {
            return Ok(Vec::new());
        }

        let reader = BufReader::new(File::open(path)?);
        let mut entries = Vec::new();
        for line in reader.lines() {
            let line = line?;
            if line.trim().is_empty() {
                continue;
            }
            entries.push(serde_json::from_str(&line)?);
        }
        Ok(entries)
    }
}
