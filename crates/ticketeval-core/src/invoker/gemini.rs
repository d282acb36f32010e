//! Gemini REST invoker
//!
//! Text samples are sent inline. Video samples are uploaded through the
//! resumable Files API, waited on until active, then referenced by URI in the
//! `generateContent` request. Latency covers the whole sequence.

use std::fs;
use std::path::Path;
use std::sync::Arc;
use std::time::{Duration, Instant};

use serde::Deserialize;
use serde_json::{json, Value};

use super::activation::{wait_until_active, ActivationPolicy, Clock, SystemClock};
use super::{InvocationError, ModelInput, ModelInvoker, ModelRequest, ModelResponse};
use crate::config::EngineConfig;

/// Environment variable holding the API key
pub const API_KEY_ENV: &str = "GEMINI_API_KEY";

const TEXT_INPUT_HEADER: &str = "Input (text):";
const VIDEO_INPUT_INSTRUCTION: &str =
    "Input (video): complete the above instructions based on the video content.";

/// Longest error body kept in [`InvocationError::Status`]
const MAX_ERROR_BODY: usize = 500;

/// Uploaded file metadata returned by the Files API
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
struct RemoteFile {
    name: String,
    #[serde(default)]
    uri: String,
    #[serde(default)]
    mime_type: Option<String>,
    #[serde(default)]
    state: Option<String>,
}

#[derive(Debug, Deserialize)]
struct UploadResponse {
    file: RemoteFile,
}

/// Blocking client for the Gemini API
pub struct GeminiInvoker {
    api_key: String,
    api_base: String,
    agent: ureq::Agent,
    activation: ActivationPolicy,
    clock: Arc<dyn Clock>,
}

impl GeminiInvoker {
    pub fn new(api_key: impl Into<String>, config: &EngineConfig) -> Self {
        let agent = ureq::AgentBuilder::new()
            .timeout(Duration::from_secs(config.model.request_timeout_seconds))
            .user_agent(&format!("ticketeval/{}", env!("CARGO_PKG_VERSION")))
            .build();

        Self {
            api_key: api_key.into(),
            api_base: config.model.api_base.trim_end_matches('/').to_string(),
            agent,
            activation: ActivationPolicy::from(&config.activation),
            clock: Arc::new(SystemClock),
        }
    }

    /// Build an invoker with the key from `GEMINI_API_KEY`
    pub fn from_env(config: &EngineConfig) -> Result<Self, InvocationError> {
        let api_key = std::env::var(API_KEY_ENV)
            .ok()
            .filter(|k| !k.trim().is_empty())
            .ok_or_else(|| InvocationError::MissingCredentials(format!("{} is not set", API_KEY_ENV)))?;
        Ok(Self::new(api_key, config))
    }

    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    fn generate(&self, model: &str, parts: Vec<Value>) -> Result<String, InvocationError> {
        let url = format!("{}/v1beta/models/{}:generateContent", self.api_base, model);
        let body = json!({ "contents": [{ "parts": parts }] });

        let response: Value = self
            .agent
            .post(&url)
            .query("key", &self.api_key)
            .send_json(body)
            .map_err(InvocationError::from)?
            .into_json()
            .map_err(|e| InvocationError::InvalidResponse(e.to_string()))?;

        Ok(response_text(&response))
    }

    fn upload(&self, path: &Path, mime_type: &str) -> Result<RemoteFile, InvocationError> {
        let bytes = fs::read(path)
            .map_err(|e| InvocationError::InputUnavailable(format!("{}: {}", path.display(), e)))?;
        let display_name = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default();

        let start = self
            .agent
            .post(&format!("{}/upload/v1beta/files", self.api_base))
            .query("key", &self.api_key)
            .set("X-Goog-Upload-Protocol", "resumable")
            .set("X-Goog-Upload-Command", "start")
            .set("X-Goog-Upload-Header-Content-Length", &bytes.len().to_string())
            .set("X-Goog-Upload-Header-Content-Type", mime_type)
            .send_json(json!({ "file": { "display_name": display_name } }))
            .map_err(InvocationError::from)?;

        let upload_url = start
            .header("x-goog-upload-url")
            .map(str::to_string)
            .ok_or_else(|| InvocationError::InvalidResponse("missing upload URL".to_string()))?;

        let uploaded: UploadResponse = self
            .agent
            .post(&upload_url)
            .set("X-Goog-Upload-Offset", "0")
            .set("X-Goog-Upload-Command", "upload, finalize")
            .send_bytes(&bytes)
            .map_err(InvocationError::from)?
            .into_json()
            .map_err(|e| InvocationError::InvalidResponse(e.to_string()))?;

        tracing::debug!(name = %uploaded.file.name, bytes = bytes.len(), "uploaded video");
        Ok(uploaded.file)
    }

    fn file_state(&self, name: &str) -> Result<Option<String>, InvocationError> {
        let file: RemoteFile = self
            .agent
            .get(&format!("{}/v1beta/{}", self.api_base, name))
            .query("key", &self.api_key)
            .call()
            .map_err(InvocationError::from)?
            .into_json()
            .map_err(|e| InvocationError::InvalidResponse(e.to_string()))?;
        Ok(file.state)
    }

    fn video_parts(&self, prompt: &str, path: &Path) -> Result<Vec<Value>, InvocationError> {
        if !path.exists() {
            return Err(InvocationError::InputUnavailable(format!(
                "video not found: {}",
                path.display()
            )));
        }
        let mime_type = video_mime_type(path)?;

        let file = self.upload(path, &mime_type)?;
        wait_until_active(self.clock.as_ref(), &self.activation, || {
            self.file_state(&file.name)
        })
        .inspect_err(|e| tracing::warn!(file = %file.name, error = %e, "video activation failed"))?;

        Ok(vec![
            json!({ "text": prompt }),
            json!({
                "file_data": {
                    "mime_type": file.mime_type.unwrap_or(mime_type),
                    "file_uri": file.uri,
                }
            }),
            json!({ "text": VIDEO_INPUT_INSTRUCTION }),
        ])
    }
}

impl ModelInvoker for GeminiInvoker {
    fn name(&self) -> &str {
        "gemini"
    }

    fn invoke(&self, request: &ModelRequest<'_>) -> Result<ModelResponse, InvocationError> {
        let started = Instant::now();

        let parts = match request.input {
            ModelInput::Text(text) => text_parts(request.prompt, text),
            ModelInput::Video(path) => self.video_parts(request.prompt, path)?,
        };
        let raw_text = self.generate(request.model, parts)?;

        Ok(ModelResponse {
            raw_text,
            latency_ms: Some(started.elapsed().as_millis() as u64),
        })
    }
}

impl From<ureq::Error> for InvocationError {
    fn from(err: ureq::Error) -> Self {
        match err {
            ureq::Error::Status(code, response) => {
                let body = response.into_string().unwrap_or_default();
                InvocationError::Status {
                    code,
                    body: crate::record::preview(body.trim(), MAX_ERROR_BODY),
                }
            }
            ureq::Error::Transport(transport) => InvocationError::Transport(transport.to_string()),
        }
    }
}

fn text_parts(prompt: &str, text: &str) -> Vec<Value> {
    vec![
        json!({ "text": prompt }),
        json!({ "text": format!("{}\n{}", TEXT_INPUT_HEADER, text) }),
    ]
}

/// MIME type guessed from the file extension; only `video/*` is accepted
fn video_mime_type(path: &Path) -> Result<String, InvocationError> {
    match mime_guess::from_path(path).first() {
        Some(mime) if mime.type_().as_str() == "video" => Ok(mime.essence_str().to_string()),
        Some(mime) => Err(InvocationError::UnsupportedInput(format!(
            "{} ({})",
            path.display(),
            mime.essence_str()
        ))),
        None => Err(InvocationError::UnsupportedInput(format!(
            "{} (unknown type)",
            path.display()
        ))),
    }
}

/// Concatenated text parts of the first candidate, trimmed.
/// A response without candidates yields empty text.
fn response_text(response: &Value) -> String {
    let parts = response
        .pointer("/candidates/0/content/parts")
        .and_then(Value::as_array);

    let text: String = parts
        .into_iter()
        .flatten()
        .filter_map(|part| part.get("text").and_then(Value::as_str))
        .collect();

    text.trim().to_string()
}
