//! Model invocation
//!
//! The engine talks to models only through [`ModelInvoker`]. Implementations:
//!
//! - [`GeminiInvoker`]: the Gemini REST API (text prompts and uploaded videos)
//! - [`ReplayInvoker`]: answers from a recorded raw-output log
//!
//! Invocation failures are per-sample: the orchestrator turns any
//! [`InvocationError`] into an `inference_error` record and moves on.

pub mod activation;
pub mod gemini;
pub mod replay;

use std::path::Path;

use thiserror::Error;

pub use activation::{ActivationPolicy, Clock, SystemClock};
pub use gemini::GeminiInvoker;
pub use replay::ReplayInvoker;

/// Payload sent along with the prompt
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ModelInput<'a> {
    /// Bug description text
    Text(&'a str),
    /// Absolute path to a video file
    Video(&'a Path),
}

/// One model call
#[derive(Debug, Clone, Copy)]
pub struct ModelRequest<'a> {
    /// Sample being evaluated (`None` for ad-hoc analysis)
    pub sample_id: Option<&'a str>,
    pub model: &'a str,
    pub prompt: &'a str,
    pub input: ModelInput<'a>,
}

/// Model output and the wall-clock time it took, when known
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ModelResponse {
    pub raw_text: String,
    pub latency_ms: Option<u64>,
}

/// Why a model call produced no response
#[derive(Debug, Error)]
pub enum InvocationError {
    #[error("missing credentials: {0}")]
    MissingCredentials(String),

    #[error("input not available: {0}")]
    InputUnavailable(String),

    #[error("unsupported input: {0}")]
    UnsupportedInput(String),

    #[error("transport error: {0}")]
    Transport(String),

    #[error("HTTP {code}: {body}")]
    Status { code: u16, body: String },

    #[error("invalid response: {0}")]
    InvalidResponse(String),

    #[error("uploaded file state FAILED: {0}")]
    ActivationFailed(String),

    #[error("timed out waiting for file to become ACTIVE (last state: {})", last_state.as_deref().unwrap_or("none"))]
    ActivationTimedOut { last_state: Option<String> },

    #[error("no recorded response for sample {0}")]
    NoScriptedResponse(String),
}

/// A model endpoint the engine can call. Shared across worker threads.
pub trait ModelInvoker: Send + Sync {
    /// Short provider name recorded in the run manifest
    fn name(&self) -> &str;

    fn invoke(&self, request: &ModelRequest<'_>) -> Result<ModelResponse, InvocationError>;
}
