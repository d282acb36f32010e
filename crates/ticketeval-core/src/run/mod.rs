//! Run configuration and execution options

pub mod orchestrator;

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::config::{MAX_CONCURRENCY, MAX_SAMPLES_LIMIT};
use crate::dataset::InputType;
use crate::error::{EvalError, Result};

pub use orchestrator::{execute, RecordSink, RunContext, RunOutcome};

/// What to evaluate. Persisted verbatim as `config.json`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RunConfig {
    pub dataset_version: String,
    pub prompt_name: String,
    pub model: String,
    #[serde(default = "default_max_samples")]
    pub max_samples: usize,
    /// `None` or empty selects every input type
    #[serde(default)]
    pub input_types: Option<Vec<InputType>>,
}

fn default_max_samples() -> usize {
    50
}

impl RunConfig {
    pub fn new(dataset_version: &str, prompt_name: &str, model: &str) -> Self {
        Self {
            dataset_version: dataset_version.to_string(),
            prompt_name: prompt_name.to_string(),
            model: model.to_string(),
            max_samples: default_max_samples(),
            input_types: None,
        }
    }

    pub fn validate(&self) -> Result<()> {
        if self.max_samples == 0 || self.max_samples > MAX_SAMPLES_LIMIT {
            return Err(EvalError::invalid_value(
                &format!("max_samples (expected 1..={})", MAX_SAMPLES_LIMIT),
                self.max_samples,
            ));
        }
        if self.model.trim().is_empty() {
            return Err(EvalError::invalid_value("model", "<empty>"));
        }
        Ok(())
    }

    pub fn input_type_filter(&self) -> &[InputType] {
        self.input_types.as_deref().unwrap_or_default()
    }
}

/// Run-level cancellation flag, shared between the caller and the workers
#[derive(Debug, Clone, Default)]
pub struct CancelToken {
    flag: Arc<AtomicBool>,
}

impl CancelToken {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.flag.store(true, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.flag.load(Ordering::SeqCst)
    }
}

/// How a run is executed
#[derive(Debug, Clone)]
pub struct RunOptions {
    /// Maximum in-flight model calls
    pub concurrency: usize,
    pub cancel: CancelToken,
}

impl Default for RunOptions {
    fn default() -> Self {
        Self {
            concurrency: 1,
            cancel: CancelToken::new(),
        }
    }
}

impl RunOptions {
    pub fn with_concurrency(mut self, concurrency: usize) -> Self {
        self.concurrency = concurrency;
        self
    }

    pub fn with_cancel(mut self, cancel: CancelToken) -> Self {
        self.cancel = cancel;
        self
    }

    pub fn validate(&self) -> Result<()> {
        if self.concurrency == 0 || self.concurrency > MAX_CONCURRENCY {
            return Err(EvalError::invalid_value(
                &format!("concurrency (expected 1..={})", MAX_CONCURRENCY),
                self.concurrency,
            ));
        }
        Ok(())
    }
}
