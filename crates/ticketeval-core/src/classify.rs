//! Failure classification

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::EvalError;
use crate::parse::ParseError;

/// The single failure category assigned to a failed sample
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FailureType {
    ParseError,
    SchemaError,
    StepsNoncompliant,
    InferenceError,
}

impl FailureType {
    pub const ALL: [FailureType; 4] = [
        FailureType::ParseError,
        FailureType::SchemaError,
        FailureType::StepsNoncompliant,
        FailureType::InferenceError,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            FailureType::ParseError => "parse_error",
            FailureType::SchemaError => "schema_error",
            FailureType::StepsNoncompliant => "steps_noncompliant",
            FailureType::InferenceError => "inference_error",
        }
    }
}

impl fmt::Display for FailureType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for FailureType {
    type Err = EvalError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        FailureType::ALL
            .into_iter()
            .find(|t| t.as_str() == s)
            .ok_or_else(|| EvalError::invalid_value("failure type", s))
    }
}

/// Classify a sample whose model call succeeded.
/// Precedence: parse failure, then schema errors, then step compliance.
pub fn classify(
    parse_error: Option<&ParseError>,
    schema_errors: &[String],
    steps_ok: bool,
) -> Option<FailureType> {
    if parse_error.is_some() {
        Some(FailureType::ParseError)
    } else if !schema_errors.is_empty() {
        Some(FailureType::SchemaError)
    } else if !steps_ok {
        Some(FailureType::StepsNoncompliant)
    } else {
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_precedence() {
        let parse = ParseError::NotObject;
        let schema = vec!["missing:title".to_string()];

        assert_eq!(
            classify(Some(&parse), &schema, false),
            Some(FailureType::ParseError)
        );
        assert_eq!(classify(None, &schema, false), Some(FailureType::SchemaError));
        assert_eq!(classify(None, &[], false), Some(FailureType::StepsNoncompliant));
        assert_eq!(classify(None, &[], true), None);
    }

    #[test]
    fn test_parse_from_str() {
        assert_eq!(
            "steps_noncompliant".parse::<FailureType>().unwrap(),
            FailureType::StepsNoncompliant
        );
        assert!("ok".parse::<FailureType>().is_err());
    }

    #[test]
    fn test_serde_names_match_display() {
        for t in FailureType::ALL {
            let json = serde_json::to_string(&t).unwrap();
            assert_eq!(json, format!("\"{}\"", t));
        }
    }
}
