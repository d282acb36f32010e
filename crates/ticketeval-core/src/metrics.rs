//! Run-level metrics and the failure digest
//!
//! Both are pure functions of the record list, so replaying a run's responses
//! reproduces them exactly.

use std::collections::{BTreeMap, HashMap};

use serde::{Deserialize, Serialize};

use crate::record::Record;

/// Entries kept in each ranked digest list
pub const DIGEST_TOP_N: usize = 10;

/// Metrics persisted as `eval.json`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RunMetrics {
    pub overall: OverallMetrics,
    pub quality_only: QualityMetrics,
}

/// Rates over every record, inference failures included
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OverallMetrics {
    pub num_samples: usize,
    pub num_inference_error: usize,
    #[serde(flatten)]
    pub rates: Rates,
}

/// Rates over records whose model call succeeded
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QualityMetrics {
    pub num_quality_samples: usize,
    #[serde(flatten)]
    pub rates: Rates,
}

/// Shared rate block. `None` when the denominator is zero.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Rates {
    pub json_parse_rate: Option<f64>,
    pub schema_complete_rate: Option<f64>,
    pub steps_compliance_rate: Option<f64>,
    pub avg_severity_rule_score: Option<f64>,
    pub avg_latency_ms: Option<u64>,
}

/// Round to 4 decimal places, halves to even
fn round4(value: f64) -> f64 {
    (value * 10_000.0).round_ties_even() / 10_000.0
}

fn ratio(count: usize, total: usize) -> Option<f64> {
    (total > 0).then(|| round4(count as f64 / total as f64))
}

impl Rates {
    fn over<'a>(records: impl Iterator<Item = &'a Record> + Clone) -> Self {
        let n = records.clone().count();

        let parse_ok = records.clone().filter(|r| r.parsed_ok()).count();
        let schema_ok = records
            .clone()
            .filter(|r| r.parsed_ok() && r.schema_errors.is_empty())
            .count();
        let steps_ok = records
            .clone()
            .filter(|r| r.parsed_ok() && r.steps_ok)
            .count();

        let latencies: Vec<u64> = records.clone().filter_map(|r| r.latency_ms).collect();
        // Truncated integer mean
        let avg_latency_ms = (!latencies.is_empty())
            .then(|| latencies.iter().sum::<u64>() / latencies.len() as u64);

        let severity_sum: f64 = records.map(|r| r.severity_score).sum();
        let avg_severity_rule_score = (n > 0).then(|| round4(severity_sum / n as f64));

        Self {
            json_parse_rate: ratio(parse_ok, n),
            schema_complete_rate: ratio(schema_ok, n),
            steps_compliance_rate: ratio(steps_ok, n),
            avg_severity_rule_score,
            avg_latency_ms,
        }
    }
}

/// Aggregate overall and quality-only metrics
pub fn compute_metrics(records: &[Record]) -> RunMetrics {
    let num_inference_error = records.iter().filter(|r| r.is_inference_error()).count();
    let quality = records.iter().filter(|r| !r.is_inference_error());

    RunMetrics {
        overall: OverallMetrics {
            num_samples: records.len(),
            num_inference_error,
            rates: Rates::over(records.iter()),
        },
        quality_only: QualityMetrics {
            num_quality_samples: records.len() - num_inference_error,
            rates: Rates::over(quality),
        },
    }
}

/// Failure digest persisted as `eval_summary.json`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EvalSummary {
    /// Count per failure category; passing samples count as `ok`
    pub failure_type_counts: BTreeMap<String, usize>,
    /// `[code, count]` pairs, most frequent first
    pub top_schema_errors: Vec<(String, usize)>,
    /// `[category, count]` pairs keyed by the text before the first `:`
    pub top_parse_error_types: Vec<(String, usize)>,
}

/// Frequency counter that ranks ties by key
#[derive(Default)]
struct Counter {
    index: HashMap<String, usize>,
    entries: Vec<(String, usize)>,
}

impl Counter {
    fn add(&mut self, key: &str) {
        match self.index.get(key) {
            Some(&i) => self.entries[i].1 += 1,
            None => {
                self.index.insert(key.to_string(), self.entries.len());
                self.entries.push((key.to_string(), 1));
            }
        }
    }

    fn most_common(mut self, n: usize) -> Vec<(String, usize)> {
        self.entries
            .sort_by(|a, b| b.1.cmp(&a.1).then_with(|| a.0.cmp(&b.0)));
        self.entries.truncate(n);
        self.entries
    }
}

/// Build the failure digest
pub fn build_eval_summary(records: &[Record]) -> EvalSummary {
    let mut failure_type_counts = BTreeMap::new();
    let mut schema_errors = Counter::default();
    let mut parse_errors = Counter::default();

    for record in records {
        let category = record
            .failure_type
            .map(|t| t.as_str())
            .unwrap_or("ok")
            .to_string();
        *failure_type_counts.entry(category).or_insert(0) += 1;

        if let Some(parse_error) = record.parse_error.as_deref().filter(|e| !e.is_empty()) {
            let prefix = parse_error.split(':').next().unwrap_or(parse_error);
            parse_errors.add(prefix);
        }
        for code in &record.schema_errors {
            schema_errors.add(code);
        }
    }

    EvalSummary {
        failure_type_counts,
        top_schema_errors: schema_errors.most_common(DIGEST_TOP_N),
        top_parse_error_types: parse_errors.most_common(DIGEST_TOP_N),
    }
}
