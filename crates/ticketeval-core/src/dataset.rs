//! Evaluation samples and the JSONL sample source
//!
//! Each non-blank line of `bugs.jsonl` is one [`Sample`]. A malformed line, or a
//! video sample without `video_path`, fails the whole load: a run never starts
//! on a partially-read dataset. Lines whose `input_type` is neither `text` nor
//! `video` are skipped with a warning.

use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::error::{EvalError, Result};

/// Dataset file name inside each dataset version directory
pub const DATASET_FILE: &str = "bugs.jsonl";

/// Kind of input a sample carries
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum InputType {
    Text,
    Video,
}

impl InputType {
    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "text" => Some(InputType::Text),
            "video" => Some(InputType::Video),
            _ => None,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            InputType::Text => "text",
            InputType::Video => "video",
        }
    }
}

impl fmt::Display for InputType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Reference values used to grade a sample's severity
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Gold {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub severity: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub severity_min: Option<String>,
}

/// One labeled evaluation sample
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Sample {
    pub id: String,

    pub input_type: InputType,

    /// Bug description for text samples, a hint for video samples
    #[serde(default)]
    pub input: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub video_path: Option<String>,

    #[serde(default)]
    pub gold: Gold,

    #[serde(default)]
    pub meta: Map<String, Value>,

    /// `video_path` resolved against the data root at load time
    #[serde(skip)]
    pub video: Option<PathBuf>,
}

impl Sample {
    /// Text used for keyword severity heuristics
    pub fn hint(&self) -> &str {
        &self.input
    }
}

/// Ordered samples of one dataset version
#[derive(Debug, Clone)]
pub struct SampleSource {
    pub path: PathBuf,
    pub samples: Vec<Sample>,
}

impl SampleSource {
    /// Load every sample from a JSONL file, resolving video paths against `root`
    pub fn load(path: &Path, root: &Path) -> Result<Self> {
        let content = fs::read_to_string(path)
            .map_err(|e| EvalError::io_operation("read dataset", path.display(), e))?;
        let samples = parse_samples(&content, path, root)?;

        tracing::debug!(path = %path.display(), samples = samples.len(), "loaded dataset");

        Ok(Self {
            path: path.to_path_buf(),
            samples,
        })
    }

    /// Keep samples matching `input_types` (empty = all), capped at `max_samples`,
    /// in file order
    pub fn select(&self, input_types: &[InputType], max_samples: usize) -> Vec<Sample> {
        self.samples
            .iter()
            .filter(|s| input_types.is_empty() || input_types.contains(&s.input_type))
            .take(max_samples)
            .cloned()
            .collect()
    }
}

fn parse_samples(content: &str, path: &Path, root: &Path) -> Result<Vec<Sample>> {
    let mut samples = Vec::new();

    for (i, line) in content.lines().enumerate() {
        let line_no = i + 1;
        let line = line.trim();
        if line.is_empty() {
            continue;
        }

        let invalid = |reason: String| EvalError::InvalidDataset {
            path: path.to_path_buf(),
            line: line_no,
            reason,
        };

        let value: Value =
            serde_json::from_str(line).map_err(|e| invalid(format!("invalid JSONL: {}", e)))?;

        if let Some(input_type) = value.get("input_type").and_then(Value::as_str) {
            if InputType::parse(input_type).is_none() {
                tracing::warn!(
                    path = %path.display(),
                    line = line_no,
                    id = value.get("id").and_then(serde_json::Value::as_str).unwrap_or_default(),
                    input_type,
                    "skipping sample with unknown input_type"
                );
                continue;
            }
        }

        let mut sample: Sample =
            serde_json::from_value(value).map_err(|e| invalid(format!("invalid sample: {}", e)))?;

        if sample.input_type == InputType::Video {
            let video_path = sample
                .video_path
                .as_deref()
                .filter(|p| !p.trim().is_empty())
                .ok_or_else(|| invalid(format!("missing video_path for item {}", sample.id)))?;
            sample.video = Some(root.join(video_path));
        }

        samples.push(sample);
    }

    Ok(samples)
}
