//! Data-driven correctness and scoring policy
//!
//! A [`RuleSet`] is loaded once per run and passed by reference into every
//! check. Severity labels, allowed values and keyword maps are lower-cased at
//! load time so the checks never have to re-normalize policy data.

use std::collections::BTreeMap;
use std::fs;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::{EvalError, Result};

/// Immutable rule set for a run
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RuleSet {
    #[serde(default)]
    pub schema: SchemaRules,

    #[serde(default)]
    pub steps: StepsRules,

    #[serde(default)]
    pub severity: SeverityRules,
}

/// Required fields and allowed values for a parsed ticket
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SchemaRules {
    #[serde(default)]
    pub required: Vec<String>,

    #[serde(default)]
    pub environment_required_keys: Vec<String>,

    #[serde(default = "default_severity_labels")]
    pub severity_allowed: Vec<String>,
}

impl Default for SchemaRules {
    fn default() -> Self {
        Self {
            required: Vec::new(),
            environment_required_keys: Vec::new(),
            severity_allowed: default_severity_labels(),
        }
    }
}

/// Reproduction-steps compliance thresholds
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StepsRules {
    #[serde(default = "default_min_steps")]
    pub min_steps: usize,

    #[serde(default = "default_require_non_empty")]
    pub require_non_empty: bool,
}

impl Default for StepsRules {
    fn default() -> Self {
        Self {
            min_steps: default_min_steps(),
            require_non_empty: default_require_non_empty(),
        }
    }
}

fn default_min_steps() -> usize {
    3
}

fn default_require_non_empty() -> bool {
    true
}

/// How a ticket's severity is graded against the sample's gold reference
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SeverityMode {
    /// Ticket severity must equal the gold severity
    #[default]
    Exact,
    /// Ticket severity must be at least the gold minimum
    GoldMin,
}

/// Severity scoring policy
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SeverityRules {
    #[serde(default)]
    pub mode: SeverityMode,

    /// Least to most severe
    #[serde(default = "default_severity_labels")]
    pub order: Vec<String>,

    #[serde(default)]
    pub keyword_min_severity: BTreeMap<String, String>,
}

impl Default for SeverityRules {
    fn default() -> Self {
        Self {
            mode: SeverityMode::default(),
            order: default_severity_labels(),
            keyword_min_severity: BTreeMap::new(),
        }
    }
}

fn default_severity_labels() -> Vec<String> {
    ["low", "medium", "high", "critical"]
        .iter()
        .map(|s| s.to_string())
        .collect()
}

impl SeverityRules {
    /// Position of a label in the configured order (higher = more severe)
    pub fn ordinal(&self, severity: &str) -> Option<usize> {
        self.order.iter().position(|s| s == severity)
    }

    /// `a >= b` by ordinal. Unknown labels on either side compare false.
    pub fn severity_ge(&self, a: &str, b: &str) -> bool {
        match (self.ordinal(a), self.ordinal(b)) {
            (Some(ia), Some(ib)) => ia >= ib,
            _ => false,
        }
    }
}

impl RuleSet {
    /// Load and normalize a rule set from a JSON file.
    /// Any read or decode failure is a run-level misconfiguration.
    pub fn load(path: &Path) -> Result<Self> {
        let content = fs::read_to_string(path).map_err(|e| EvalError::InvalidRules {
            path: path.to_path_buf(),
            reason: e.to_string(),
        })?;

        Self::from_json_str(&content).map_err(|e| EvalError::InvalidRules {
            path: path.to_path_buf(),
            reason: e.to_string(),
        })
    }

    /// Decode and normalize a rule set from JSON text
    pub fn from_json_str(content: &str) -> std::result::Result<Self, serde_json::Error> {
        let rules: RuleSet = serde_json::from_str(content)?;
        Ok(rules.normalized())
    }

    /// Lower-case every severity label and keyword
    pub fn normalized(mut self) -> Self {
        let lower = |v: &mut Vec<String>| {
            for s in v.iter_mut() {
                *s = s.trim().to_lowercase();
            }
        };
        lower(&mut self.schema.severity_allowed);
        lower(&mut self.severity.order);

        self.severity.keyword_min_severity = self
            .severity
            .keyword_min_severity
            .into_iter()
            .map(|(k, v)| (k.to_lowercase(), v.trim().to_lowercase()))
            .collect();

        self
    }

    /// Canonical JSON used for the run snapshot and its fingerprint
    pub fn to_snapshot(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }
}
