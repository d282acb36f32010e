//! Per-sample evaluation: parse, validate, check steps, score, classify

use crate::classify::classify;
use crate::dataset::Sample;
use crate::parse::parse_ticket;
use crate::record::Record;
use crate::rules::RuleSet;

/// Evaluate a model response for one sample. Never fails; every problem with
/// the response is captured on the returned record. `latency_ms` is `None`
/// when the call time is unknown.
pub fn evaluate_response(
    sample: &Sample,
    raw_text: String,
    latency_ms: Option<u64>,
    rules: &RuleSet,
) -> Record {
    let (parsed, parse_error) = match parse_ticket(&raw_text) {
        Ok(ticket) => (Some(ticket), None),
        Err(e) => (None, Some(e)),
    };

    let (schema_errors, steps_ok, severity_score) = match &parsed {
        Some(ticket) => (
            crate::validate::validate_ticket(ticket, &rules.schema),
            crate::compliance::steps_compliant(ticket, &rules.steps),
            crate::severity::score_severity(sample.hint(), ticket, &sample.gold, &rules.severity),
        ),
        None => (Vec::new(), false, 0.0),
    };

    let failure_type = classify(parse_error.as_ref(), &schema_errors, steps_ok);

    Record {
        id: sample.id.clone(),
        input_type: sample.input_type,
        meta: sample.meta.clone(),
        gold: sample.gold.clone(),
        raw_text,
        parsed,
        latency_ms,
        parse_error: parse_error.map(|e| e.code()),
        schema_errors,
        steps_ok,
        severity_score,
        failure_type,
    }
}
