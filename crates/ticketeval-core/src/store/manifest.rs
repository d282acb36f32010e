//! Run manifest (`run.json`): lifecycle status and input fingerprints

use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

/// Run lifecycle status
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RunStatus {
    Created,
    Running,
    Completed,
    Cancelled,
    Failed,
}

impl RunStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            RunStatus::Created => "created",
            RunStatus::Running => "running",
            RunStatus::Completed => "completed",
            RunStatus::Cancelled => "cancelled",
            RunStatus::Failed => "failed",
        }
    }
}

impl fmt::Display for RunStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// SHA-256 digests of the inputs that determine a run's metrics
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Fingerprints {
    pub rules_sha256: String,
    pub prompt_sha256: String,
    pub dataset_sha256: String,
}

impl Fingerprints {
    pub fn compute(rules_snapshot: &str, prompt: &str, dataset: &[u8]) -> Self {
        Self {
            rules_sha256: sha256_hex(rules_snapshot.as_bytes()),
            prompt_sha256: sha256_hex(prompt.as_bytes()),
            dataset_sha256: sha256_hex(dataset),
        }
    }
}

pub fn sha256_hex(bytes: &[u8]) -> String {
    let mut hasher = Sha256::new();
    hasher.update(bytes);
    hex::encode(hasher.finalize())
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RunManifest {
    pub run_id: String,
    pub status: RunStatus,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub samples_planned: usize,
    pub records_written: usize,
    pub provider: String,
    pub fingerprints: Fingerprints,
}

impl RunManifest {
    pub fn new(
        run_id: &str,
        provider: &str,
        samples_planned: usize,
        fingerprints: Fingerprints,
    ) -> Self {
        let now = Utc::now();
        Self {
            run_id: run_id.to_string(),
            status: RunStatus::Created,
            created_at: now,
            updated_at: now,
            samples_planned,
            records_written: 0,
            provider: provider.to_string(),
            fingerprints,
        }
    }

    pub fn transition(&mut self, status: RunStatus, records_written: usize) {
        tracing::debug!(run_id = %self.run_id, from = %self.status, to = %status, "run status");
        self.status = status;
        self.records_written = records_written;
        self.updated_at = Utc::now();
    }
}
