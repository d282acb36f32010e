//! Severity scoring
//!
//! Scores are always one of [`SCORE_MISS`], [`SCORE_NEUTRAL`] or [`SCORE_HIT`].
//! The first rule that applies wins:
//!
//! 1. ticket severity missing or not in the configured order: miss
//! 2. `exact` mode with a known gold severity: hit iff equal
//! 3. `gold_min` mode with a known gold minimum: hit iff at least the minimum
//! 4. keywords found in the sample hint: hit iff at least the strictest
//!    matched minimum
//! 5. otherwise neutral

use crate::dataset::Gold;
use crate::rules::{SeverityMode, SeverityRules};
use crate::ticket::Ticket;

pub const SCORE_MISS: f64 = 0.0;
pub const SCORE_NEUTRAL: f64 = 0.5;
pub const SCORE_HIT: f64 = 1.0;

fn hit_if(cond: bool) -> f64 {
    if cond {
        SCORE_HIT
    } else {
        SCORE_MISS
    }
}

fn normalize(label: Option<&str>) -> Option<String> {
    label.map(|s| s.trim().to_lowercase())
}

/// Score a ticket's severity against the sample's gold reference or hint text
pub fn score_severity(hint: &str, ticket: &Ticket, gold: &Gold, rules: &SeverityRules) -> f64 {
    let Some(severity) = ticket.severity().filter(|s| rules.ordinal(s).is_some()) else {
        return SCORE_MISS;
    };

    let known = |label: Option<String>| label.filter(|s| rules.ordinal(s).is_some());

    match rules.mode {
        SeverityMode::Exact => {
            if let Some(gold_severity) = known(normalize(gold.severity.as_deref())) {
                return hit_if(severity == gold_severity);
            }
        }
        SeverityMode::GoldMin => {
            if let Some(gold_min) = known(normalize(gold.severity_min.as_deref())) {
                return hit_if(rules.severity_ge(&severity, &gold_min));
            }
        }
    }

    match strictest_keyword_minimum(hint, rules) {
        Some(minimum) => hit_if(rules.severity_ge(&severity, minimum)),
        None => SCORE_NEUTRAL,
    }
}

/// Highest-ordinal minimum among keywords contained in the hint.
/// Keywords mapped to unknown labels are ignored.
fn strictest_keyword_minimum<'a>(hint: &str, rules: &'a SeverityRules) -> Option<&'a str> {
    let text = hint.to_lowercase();

    rules
        .keyword_min_severity
        .iter()
        .filter(|(keyword, _)| text.contains(keyword.as_str()))
        .filter_map(|(_, minimum)| rules.ordinal(minimum).map(|i| (i, minimum.as_str())))
        .max_by_key(|(i, _)| *i)
        .map(|(_, minimum)| minimum)
}
