//! Durable run artifacts
//!
//! Each run owns one directory under the runs root:
//!
//! ```text
//! <runs_dir>/<run_id>/
//!   run.json               manifest (status, fingerprints)
//!   config.json            run configuration
//!   rules.json             rule set snapshot
//!   raw_outputs.jsonl      {id, raw_text, latency_ms}, appended per sample
//!   parsed_outputs.jsonl   {id, parsed, parse_error}, appended per sample
//!   eval.json              metrics
//!   eval_summary.json      failure digest
//!   failures.json          failure list
//! ```

pub mod log;
pub mod manifest;

use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use chrono::Utc;
use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::Value;
use walkdir::WalkDir;

use crate::error::{EvalError, Result};

pub use log::AppendLog;
pub use manifest::{Fingerprints, RunManifest, RunStatus};

pub const MANIFEST_FILE: &str = "run.json";
pub const CONFIG_FILE: &str = "config.json";
pub const RULES_FILE: &str = "rules.json";
pub const RAW_OUTPUTS_FILE: &str = "raw_outputs.jsonl";
pub const PARSED_OUTPUTS_FILE: &str = "parsed_outputs.jsonl";
pub const METRICS_FILE: &str = "eval.json";
pub const SUMMARY_FILE: &str = "eval_summary.json";
pub const FAILURES_FILE: &str = "failures.json";

/// Generate a run id: `<YYYYmmdd_HHMMSS>_<ulid>`
pub fn generate_run_id() -> String {
    let now = Utc::now();
    format!(
        "{}_{}",
        now.format("%Y%m%d_%H%M%S"),
        ulid::Ulid::new().to_string().to_lowercase()
    )
}

fn validate_run_id(run_id: &str) -> Result<()> {
    let valid = !run_id.is_empty()
        && run_id
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '-');
    if valid {
        Ok(())
    } else {
        Err(EvalError::invalid_value("run id", run_id))
    }
}

/// Directory of all runs
#[derive(Debug, Clone)]
pub struct RunStore {
    runs_dir: PathBuf,
}

impl RunStore {
    pub fn new(runs_dir: &Path) -> Self {
        Self {
            runs_dir: runs_dir.to_path_buf(),
        }
    }

    pub fn runs_dir(&self) -> &Path {
        &self.runs_dir
    }

    /// Create a fresh run directory with a generated id
    pub fn create_run(&self) -> Result<RunHandle> {
        self.create_run_with_id(&generate_run_id())
    }

    /// Create a run directory. An existing directory is never reused.
    pub fn create_run_with_id(&self, run_id: &str) -> Result<RunHandle> {
        validate_run_id(run_id)?;
        fs::create_dir_all(&self.runs_dir)
            .map_err(|e| EvalError::io_operation("create", self.runs_dir.display(), e))?;

        let dir = self.runs_dir.join(run_id);
        match fs::create_dir(&dir) {
            Ok(()) => {}
            Err(e) if e.kind() == ErrorKind::AlreadyExists => {
                return Err(EvalError::already_exists("run", run_id));
            }
            Err(e) => return Err(EvalError::io_operation("create", dir.display(), e)),
        }

        tracing::debug!(run_id, dir = %dir.display(), "created run directory");
        Ok(RunHandle {
            run_id: run_id.to_string(),
            dir,
        })
    }

    /// Open an existing run
    pub fn open(&self, run_id: &str) -> Result<RunHandle> {
        validate_run_id(run_id).map_err(|_| EvalError::not_found("run", run_id))?;

        let dir = self.runs_dir.join(run_id);
        if !dir.is_dir() {
            return Err(EvalError::not_found("run", run_id));
        }
        Ok(RunHandle {
            run_id: run_id.to_string(),
            dir,
        })
    }

    /// Ids of all runs, oldest first
    pub fn list_runs(&self) -> Vec<String> {
        if !self.runs_dir.exists() {
            return Vec::new();
        }

        let mut runs: Vec<String> = WalkDir::new(&self.runs_dir)
            .min_depth(1)
            .max_depth(1)
            .into_iter()
            .filter_map(|e| e.ok())
            .filter(|e| e.file_type().is_dir())
            .filter_map(|e| e.file_name().to_str().map(str::to_string))
            .collect();
        runs.sort();
        runs
    }
}

/// One run's artifact directory
#[derive(Debug, Clone)]
pub struct RunHandle {
    run_id: String,
    dir: PathBuf,
}

impl RunHandle {
    pub fn run_id(&self) -> &str {
        &self.run_id
    }

    pub fn path(&self, artifact: &str) -> PathBuf {
        self.dir.join(artifact)
    }

    /// Write a pretty-printed JSON artifact
    pub fn write_json<T: Serialize + ?Sized>(&self, artifact: &str, value: &T) -> Result<()> {
        let path = self.path(artifact);
        let content = serde_json::to_string_pretty(value)?;
        fs::write(&path, content).map_err(|e| EvalError::io_operation("write", path.display(), e))
    }

    /// Write a text artifact verbatim
    pub fn write_text(&self, artifact: &str, content: &str) -> Result<()> {
        let path = self.path(artifact);
        fs::write(&path, content).map_err(|e| EvalError::io_operation("write", path.display(), e))
    }

    /// Read a JSON artifact; `None` when it does not exist
    pub fn read_json<T: DeserializeOwned>(&self, artifact: &str) -> Result<Option<T>> {
        let path = self.path(artifact);
        if !path.exists() {
            return Ok(None);
        }
        let content = fs::read_to_string(&path)
            .map_err(|e| EvalError::io_operation("read", path.display(), e))?;
        Ok(Some(serde_json::from_str(&content)?))
    }

    /// Read a JSON artifact as a value; missing files read as `{}`
    pub fn read_json_or_empty(&self, artifact: &str) -> Result<Value> {
        Ok(self
            .read_json(artifact)?
            .unwrap_or_else(|| Value::Object(Default::default())))
    }

    pub fn open_log(&self, artifact: &str) -> Result<AppendLog> {
        AppendLog::open(&self.path(artifact))
    }

    pub fn write_manifest(&self, manifest: &RunManifest) -> Result<()> {
        self.write_json(MANIFEST_FILE, manifest)
    }

    pub fn read_manifest(&self) -> Result<Option<RunManifest>> {
        self.read_json(MANIFEST_FILE)
    }
}
