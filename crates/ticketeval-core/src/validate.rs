//! Schema validation of parsed tickets
//!
//! Produces an ordered list of error codes; an empty list means the ticket is
//! schema-complete. Codes:
//!
//! - `missing:<field>` for each required field absent from the ticket
//! - `type:steps_not_list`, `type:tags_not_list`, `type:confidence_not_number`,
//!   `type:environment_not_object` for present fields of the wrong JSON type
//! - `missing:environment.<key>` for each required environment key
//! - `value:severity_invalid` when `severity` is not an allowed label

use serde_json::Value;

use crate::rules::SchemaRules;
use crate::ticket::Ticket;

/// Check a ticket against the schema rules
pub fn validate_ticket(ticket: &Ticket, rules: &SchemaRules) -> Vec<String> {
    let mut errors = Vec::new();

    for field in &rules.required {
        if !ticket.has(field) {
            errors.push(format!("missing:{}", field));
        }
    }

    if matches!(ticket.get("steps"), Some(v) if !v.is_array()) {
        errors.push("type:steps_not_list".to_string());
    }
    if matches!(ticket.get("tags"), Some(v) if !v.is_array()) {
        errors.push("type:tags_not_list".to_string());
    }
    if matches!(ticket.get("confidence"), Some(v) if !v.is_number()) {
        errors.push("type:confidence_not_number".to_string());
    }

    match ticket.get("environment") {
        Some(Value::Object(env)) => {
            for key in &rules.environment_required_keys {
                if !env.contains_key(key) {
                    errors.push(format!("missing:environment.{}", key));
                }
            }
        }
        Some(_) => errors.push("type:environment_not_object".to_string()),
        None => {}
    }

    if let Some(severity) = ticket.get("severity") {
        // Lower-cased but not trimmed; non-string values never match
        let valid = severity
            .as_str()
            .map(|s| s.to_lowercase())
            .is_some_and(|s| rules.severity_allowed.contains(&s));
        if !valid {
            errors.push("value:severity_invalid".to_string());
        }
    }

    errors
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn rules() -> SchemaRules {
        SchemaRules {
            required: vec![
                "title".to_string(),
                "steps".to_string(),
                "environment".to_string(),
                "severity".to_string(),
            ],
            environment_required_keys: vec!["os".to_string(), "browser".to_string()],
            ..SchemaRules::default()
        }
    }

    fn ticket(value: Value) -> Ticket {
        serde_json::from_value(value).unwrap()
    }

    #[test]
    fn test_complete_ticket_has_no_errors() {
        let t = ticket(json!({
            "title": "Checkout button unresponsive",
            "steps": ["open cart", "click checkout", "observe nothing happens"],
            "environment": {"os": "macOS", "browser": "Safari"},
            "severity": "High",
            "tags": ["checkout"],
            "confidence": 0.8
        }));
        assert!(validate_ticket(&t, &rules()).is_empty());
    }

    #[test]
    fn test_missing_title() {
        let t = ticket(json!({
            "steps": ["a", "b", "c"],
            "environment": {"os": "linux", "browser": "firefox"},
            "severity": "low"
        }));
        assert_eq!(validate_ticket(&t, &rules()), vec!["missing:title"]);
    }

    #[test]
    fn test_codes_are_ordered() {
        let t = ticket(json!({
            "steps": "not a list",
            "tags": "x",
            "confidence": "high",
            "environment": {"os": "linux"},
            "severity": "blocker"
        }));
        assert_eq!(
            validate_ticket(&t, &rules()),
            vec![
                "missing:title",
                "type:steps_not_list",
                "type:tags_not_list",
                "type:confidence_not_number",
                "missing:environment.browser",
                "value:severity_invalid",
            ]
        );
    }

    #[test]
    fn test_environment_not_object() {
        let t = ticket(json!({"environment": "linux"}));
        let errors = validate_ticket(&t, &SchemaRules::default());
        assert_eq!(errors, vec!["type:environment_not_object"]);
    }

    #[test]
    fn test_severity_not_trimmed_and_not_string() {
        let schema = SchemaRules::default();
        let padded = ticket(json!({"severity": " high "}));
        assert_eq!(validate_ticket(&padded, &schema), vec!["value:severity_invalid"]);

        let numeric = ticket(json!({"severity": 2}));
        assert_eq!(validate_ticket(&numeric, &schema), vec!["value:severity_invalid"]);
    }

    #[test]
    fn test_absent_optional_fields_are_not_checked() {
        assert!(validate_ticket(&ticket(json!({})), &SchemaRules::default()).is_empty());
    }
}
