//! Replays recorded model responses
//!
//! Reads a raw-output log (`{id, raw_text, latency_ms?}` per line) and answers
//! each request with the line recorded for its sample id. Samples without a
//! line fail, which reproduces the inference errors of the recorded run.

use std::collections::HashMap;
use std::fs;
use std::path::Path;

use super::{InvocationError, ModelInvoker, ModelRequest, ModelResponse};
use crate::error::{EvalError, Result};
use crate::record::RawOutputLine;

/// Invoker backed by a recorded raw-output log
#[derive(Debug, Clone)]
pub struct ReplayInvoker {
    responses: HashMap<String, RawOutputLine>,
}

impl ReplayInvoker {
    /// Load a raw-output log. When an id appears more than once, the last
    /// line wins.
    pub fn load(path: &Path) -> Result<Self> {
        let content = fs::read_to_string(path)
            .map_err(|e| EvalError::io_operation("read responses", path.display(), e))?;

        let mut responses = HashMap::new();
        for (i, line) in content.lines().enumerate() {
            let line = line.trim();
            if line.is_empty() {
                continue;
            }
            let entry: RawOutputLine =
                serde_json::from_str(line).map_err(|e| EvalError::InvalidResponses {
                    path: path.to_path_buf(),
                    line: i + 1,
                    reason: e.to_string(),
                })?;
            responses.insert(entry.id.clone(), entry);
        }

        tracing::debug!(path = %path.display(), responses = responses.len(), "loaded replay responses");

        Ok(Self { responses })
    }

    pub fn is_empty(&self) -> bool {
        self.responses.is_empty()
    }
}

impl ModelInvoker for ReplayInvoker {
    fn name(&self) -> &str {
        "replay"
    }

    fn invoke(&self, request: &ModelRequest<'_>) -> std::result::Result<ModelResponse, InvocationError> {
        let id = request.sample_id.unwrap_or_default();
        let entry = self
            .responses
            .get(id)
            .ok_or_else(|| InvocationError::NoScriptedResponse(id.to_string()))?;

        Ok(ModelResponse {
            raw_text: entry.raw_text.clone(),
            latency_ms: entry.latency_ms,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::invoker::ModelInput;
    use tempfile::tempdir;

    fn request(id: Option<&str>) -> ModelRequest<'_> {
        ModelRequest {
            sample_id: id,
            model: "m",
            prompt: "p",
            input: ModelInput::Text("x"),
        }
    }

    #[test]
    fn test_replays_recorded_lines() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("raw_outputs.jsonl");
        fs::write(
            &path,
            "{\"id\": \"a\", \"raw_text\": \"{}\", \"latency_ms\": 812}\n\n{\"id\": \"b\", \"raw_text\": \"not json\"}\n",
        )
        .unwrap();

        let invoker = ReplayInvoker::load(&path).unwrap();
        assert!(!invoker.is_empty());

        let a = invoker.invoke(&request(Some("a"))).unwrap();
        assert_eq!(a.raw_text, "{}");
        assert_eq!(a.latency_ms, Some(812));

        let b = invoker.invoke(&request(Some("b"))).unwrap();
        assert_eq!(b.latency_ms, None);
    }

    #[test]
    fn test_missing_id_is_invocation_error() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("raw_outputs.jsonl");
        fs::write(&path, "").unwrap();

        let invoker = ReplayInvoker::load(&path).unwrap();
        assert!(invoker.is_empty());
        let err = invoker.invoke(&request(Some("zzz"))).unwrap_err();
        assert!(matches!(err, InvocationError::NoScriptedResponse(id) if id == "zzz"));
        assert!(invoker.invoke(&request(None)).is_err());
    }

    #[test]
    fn test_malformed_line_reports_line_number() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("raw_outputs.jsonl");
        fs::write(&path, "{\"id\": \"a\", \"raw_text\": \"\"}\n{oops\n").unwrap();

        let err = ReplayInvoker::load(&path).unwrap_err();
        assert!(matches!(err, EvalError::InvalidResponses { line: 2, .. }));
    }
}
