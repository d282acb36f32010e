//! Engine configuration for ticketeval
//!
//! Configuration is read from `ticketeval.toml` in the data root (or an explicit
//! path) and then overridden by environment variables. Every field has a default,
//! so a missing file yields a usable configuration.

use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::{EvalError, Result};

/// Default config file name, looked up in the data root
pub const CONFIG_FILE: &str = "ticketeval.toml";

/// Default model identity
pub const DEFAULT_MODEL: &str = "gemini-3-flash-preview";

/// Default Gemini API base URL
pub const DEFAULT_API_BASE: &str = "https://generativelanguage.googleapis.com";

/// Upper bound for `max_samples` on a single run
pub const MAX_SAMPLES_LIMIT: usize = 500;

/// Upper bound for concurrent in-flight invocations
pub const MAX_CONCURRENCY: usize = 16;

/// Upper bound for activation and request timeouts
pub const MAX_TIMEOUT_SECONDS: u64 = 86_400;

/// Engine configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct EngineConfig {
    #[serde(default)]
    pub paths: PathsConfig,

    #[serde(default)]
    pub model: ModelConfig,

    #[serde(default)]
    pub activation: ActivationConfig,

    #[serde(default)]
    pub run: RunDefaults,
}

/// Locations of datasets, prompts, rules and run artifacts.
/// Relative paths resolve against the data root.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PathsConfig {
    #[serde(default = "default_datasets_dir")]
    pub datasets_dir: PathBuf,

    #[serde(default = "default_prompts_dir")]
    pub prompts_dir: PathBuf,

    #[serde(default = "default_rules_path")]
    pub rules_path: PathBuf,

    #[serde(default = "default_runs_dir")]
    pub runs_dir: PathBuf,
}

impl Default for PathsConfig {
    fn default() -> Self {
        Self {
            datasets_dir: default_datasets_dir(),
            prompts_dir: default_prompts_dir(),
            rules_path: default_rules_path(),
            runs_dir: default_runs_dir(),
        }
    }
}

fn default_datasets_dir() -> PathBuf {
    PathBuf::from("datasets")
}

fn default_prompts_dir() -> PathBuf {
    PathBuf::from("prompts")
}

fn default_rules_path() -> PathBuf {
    PathBuf::from("rules/default_rules.json")
}

fn default_runs_dir() -> PathBuf {
    PathBuf::from("storage/runs")
}

/// Model provider settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ModelConfig {
    /// Model used when a run does not name one
    #[serde(default = "default_model")]
    pub default: String,

    /// Models offered by the registry (empty = just the default)
    #[serde(default)]
    pub available: Vec<String>,

    #[serde(default = "default_api_base")]
    pub api_base: String,

    #[serde(default = "default_request_timeout")]
    pub request_timeout_seconds: u64,
}

impl Default for ModelConfig {
    fn default() -> Self {
        Self {
            default: default_model(),
            available: Vec::new(),
            api_base: default_api_base(),
            request_timeout_seconds: default_request_timeout(),
        }
    }
}

fn default_model() -> String {
    DEFAULT_MODEL.to_string()
}

fn default_api_base() -> String {
    DEFAULT_API_BASE.to_string()
}

fn default_request_timeout() -> u64 {
    120
}

/// Remote resource activation wait (video inputs)
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ActivationConfig {
    #[serde(default = "default_poll_interval_ms")]
    pub poll_interval_ms: u64,

    #[serde(default = "default_activation_timeout")]
    pub timeout_seconds: u64,
}

impl Default for ActivationConfig {
    fn default() -> Self {
        Self {
            poll_interval_ms: default_poll_interval_ms(),
            timeout_seconds: default_activation_timeout(),
        }
    }
}

impl ActivationConfig {
    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms)
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_seconds)
    }
}

fn default_poll_interval_ms() -> u64 {
    1000
}

fn default_activation_timeout() -> u64 {
    90
}

/// Defaults applied to runs that do not override them
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RunDefaults {
    #[serde(default = "default_max_samples")]
    pub max_samples: usize,

    #[serde(default = "default_concurrency")]
    pub concurrency: usize,
}

impl Default for RunDefaults {
    fn default() -> Self {
        Self {
            max_samples: default_max_samples(),
            concurrency: default_concurrency(),
        }
    }
}

fn default_max_samples() -> usize {
    50
}

fn default_concurrency() -> usize {
    1
}

impl EngineConfig {
    /// Load configuration from a file
    pub fn load(path: &Path) -> Result<Self> {
        let content =
            fs::read_to_string(path).map_err(|e| EvalError::io_operation("read", path.display(), e))?;
        let config: EngineConfig = toml::from_str(&content)?;
        config.validate()?;
        Ok(config)
    }

    /// Load `ticketeval.toml` from the data root if present, otherwise defaults.
    /// Environment overrides are applied in both cases.
    pub fn load_or_default(root: &Path) -> Result<Self> {
        let path = root.join(CONFIG_FILE);
        let config = if path.exists() {
            Self::load(&path)?
        } else {
            Self::default()
        };
        let config = config.with_env_overrides();
        config.validate()?;
        Ok(config)
    }

    /// Save configuration to a file
    pub fn save(&self, path: &Path) -> Result<()> {
        let content = toml::to_string_pretty(self)
            .map_err(|e| EvalError::Other(format!("failed to serialize config: {}", e)))?;
        fs::write(path, content)?;
        Ok(())
    }

    /// Apply `GEMINI_MODEL` and `TICKETEVAL_API_BASE` overrides
    pub fn with_env_overrides(mut self) -> Self {
        if let Ok(model) = std::env::var("GEMINI_MODEL") {
            if !model.trim().is_empty() {
                self.model.default = model.trim().to_string();
            }
        }

        if let Ok(base) = std::env::var("TICKETEVAL_API_BASE") {
            if !base.trim().is_empty() {
                self.model.api_base = base.trim().trim_end_matches('/').to_string();
            }
        }

        self
    }

    /// Check value ranges; re-run after applying overrides
    pub fn validate(&self) -> Result<()> {
        if self.run.max_samples == 0 || self.run.max_samples > MAX_SAMPLES_LIMIT {
            return Err(EvalError::invalid_value(
                "run.max_samples",
                self.run.max_samples,
            ));
        }
        if self.run.concurrency == 0 || self.run.concurrency > MAX_CONCURRENCY {
            return Err(EvalError::invalid_value(
                "run.concurrency",
                self.run.concurrency,
            ));
        }
        if self.activation.poll_interval_ms == 0 {
            return Err(EvalError::invalid_value("activation.poll_interval_ms", 0));
        }
        if self.activation.timeout_seconds > MAX_TIMEOUT_SECONDS {
            return Err(EvalError::invalid_value(
                "activation.timeout_seconds",
                self.activation.timeout_seconds,
            ));
        }
        if self.model.request_timeout_seconds == 0
            || self.model.request_timeout_seconds > MAX_TIMEOUT_SECONDS
        {
            return Err(EvalError::invalid_value(
                "model.request_timeout_seconds",
                self.model.request_timeout_seconds,
            ));
        }
        if self.model.default.trim().is_empty() {
            return Err(EvalError::invalid_value("model.default", "\"\""));
        }
        Ok(())
    }

    /// Models offered by the registry
    pub fn models(&self) -> Vec<String> {
        if self.model.available.is_empty() {
            vec![self.model.default.clone()]
        } else {
            self.model.available.clone()
        }
    }

    /// Resolve configured paths against the data root
    pub fn resolve(&self, root: &Path) -> ResolvedPaths {
        let resolve = |p: &Path| {
            if p.is_absolute() {
                p.to_path_buf()
            } else {
                root.join(p)
            }
        };

        ResolvedPaths {
            root: root.to_path_buf(),
            datasets_dir: resolve(&self.paths.datasets_dir),
            prompts_dir: resolve(&self.paths.prompts_dir),
            rules_path: resolve(&self.paths.rules_path),
            runs_dir: resolve(&self.paths.runs_dir),
        }
    }
}

/// Absolute locations derived from [`PathsConfig`] and a data root
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedPaths {
    pub root: PathBuf,
    pub datasets_dir: PathBuf,
    pub prompts_dir: PathBuf,
    pub rules_path: PathBuf,
    pub runs_dir: PathBuf,
}
