//! Loosely-typed view over a parsed ticket
//!
//! Model output is untrusted: any field may be absent or carry the wrong JSON
//! type. [`Ticket`] keeps the decoded object as-is and only offers defensive
//! accessors; reporting absence and type mismatches is the validator's job.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// A parsed ticket object
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Ticket(Map<String, Value>);

impl Ticket {
    pub fn new(fields: Map<String, Value>) -> Self {
        Self(fields)
    }

    pub fn has(&self, field: &str) -> bool {
        self.0.contains_key(field)
    }

    pub fn get(&self, field: &str) -> Option<&Value> {
        self.0.get(field)
    }

    /// `steps` when it is a JSON array
    pub fn steps(&self) -> Option<&Vec<Value>> {
        self.get("steps").and_then(Value::as_array)
    }

    /// `environment` when it is a JSON object
    pub fn environment(&self) -> Option<&Map<String, Value>> {
        self.get("environment").and_then(Value::as_object)
    }

    /// `severity` lower-cased and trimmed, when it is a string
    pub fn severity(&self) -> Option<String> {
        self.get("severity")
            .and_then(Value::as_str)
            .map(|s| s.trim().to_lowercase())
    }

    pub fn title(&self) -> Option<&str> {
        self.get("title").and_then(Value::as_str)
    }
}

impl From<Map<String, Value>> for Ticket {
    fn from(fields: Map<String, Value>) -> Self {
        Self(fields)
    }
}
