//! Per-sample evaluation records and the lines written to run artifacts

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::classify::FailureType;
use crate::dataset::{Gold, InputType, Sample};
use crate::ticket::Ticket;

/// Characters of sample input kept in a failure entry
pub const INPUT_PREVIEW_CHARS: usize = 500;

/// Characters of raw model output kept in a failure entry
pub const RAW_PREVIEW_CHARS: usize = 800;

/// Prefix of `parse_error` on samples whose model call failed
pub const INFERENCE_ERROR_PREFIX: &str = "inference_error";

/// Outcome of evaluating one sample. Never mutated once built.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Record {
    pub id: String,
    pub input_type: InputType,
    #[serde(default)]
    pub meta: Map<String, Value>,
    #[serde(default)]
    pub gold: Gold,
    pub raw_text: String,
    pub parsed: Option<Ticket>,
    pub latency_ms: Option<u64>,
    pub parse_error: Option<String>,
    pub schema_errors: Vec<String>,
    pub steps_ok: bool,
    pub severity_score: f64,
    pub failure_type: Option<FailureType>,
}

impl Record {
    /// Record for a sample whose model call failed. Quality fields are zeroed.
    pub fn inference_error(sample: &Sample, message: &str) -> Self {
        Self {
            id: sample.id.clone(),
            input_type: sample.input_type,
            meta: sample.meta.clone(),
            gold: sample.gold.clone(),
            raw_text: String::new(),
            parsed: None,
            latency_ms: None,
            parse_error: Some(format!("{}:{}", INFERENCE_ERROR_PREFIX, message)),
            schema_errors: Vec::new(),
            steps_ok: false,
            severity_score: 0.0,
            failure_type: Some(FailureType::InferenceError),
        }
    }

    pub fn is_inference_error(&self) -> bool {
        self.failure_type == Some(FailureType::InferenceError)
    }

    pub fn parsed_ok(&self) -> bool {
        self.parse_error.is_none()
    }

    /// Inference-failed samples have no response to log
    pub fn has_response(&self) -> bool {
        !self.is_inference_error()
    }

    pub fn raw_line(&self) -> RawOutputLine {
        RawOutputLine {
            id: self.id.clone(),
            raw_text: self.raw_text.clone(),
            latency_ms: self.latency_ms,
        }
    }

    pub fn parsed_line(&self) -> ParsedOutputLine {
        ParsedOutputLine {
            id: self.id.clone(),
            parsed: self.parsed.clone(),
            parse_error: self.parse_error.clone(),
        }
    }

    /// Failure list entry, or `None` for a passing sample
    pub fn failure_entry(&self, input: &str) -> Option<FailureEntry> {
        let failure_type = self.failure_type?;
        Some(FailureEntry {
            id: self.id.clone(),
            input_type: self.input_type,
            failure_type,
            parse_error: self.parse_error.clone(),
            schema_errors: self.schema_errors.clone(),
            steps_ok: self.steps_ok,
            latency_ms: self.latency_ms,
            input_preview: preview(input, INPUT_PREVIEW_CHARS),
            raw_preview: preview(&self.raw_text, RAW_PREVIEW_CHARS),
        })
    }
}

/// One line of `raw_outputs.jsonl`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RawOutputLine {
    pub id: String,
    pub raw_text: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub latency_ms: Option<u64>,
}

/// One line of `parsed_outputs.jsonl`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ParsedOutputLine {
    pub id: String,
    pub parsed: Option<Ticket>,
    pub parse_error: Option<String>,
}

/// Denormalized entry of `failures.json`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FailureEntry {
    pub id: String,
    pub input_type: InputType,
    pub failure_type: FailureType,
    pub parse_error: Option<String>,
    pub schema_errors: Vec<String>,
    pub steps_ok: bool,
    pub latency_ms: Option<u64>,
    pub input_preview: String,
    pub raw_preview: String,
}

/// First `max_chars` characters of `text`
pub fn preview(text: &str, max_chars: usize) -> String {
    match text.char_indices().nth(max_chars) {
        Some((end, _)) => text[..end].to_string(),
        None => text.to_string(),
    }
}
