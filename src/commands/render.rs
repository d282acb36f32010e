//! Human-readable rendering shared by `run` and `show`

use serde_json::Value;
use ticketeval_core::engine::RunSummary;

const RATE_KEYS: [&str; 5] = [
    "json_parse_rate",
    "schema_complete_rate",
    "steps_compliance_rate",
    "avg_severity_rule_score",
    "avg_latency_ms",
];

fn field(value: &Value) -> String {
    match value {
        Value::Null => "-".to_string(),
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

/// Print a run's identity, configuration and both metric views
pub fn print_run_summary(summary: &RunSummary) {
    println!("Run {} ({})", summary.run_id, summary.status);

    let config = &summary.config;
    if config.as_object().is_some_and(|c| !c.is_empty()) {
        println!(
            "  dataset: {}  prompt: {}  model: {}  max_samples: {}",
            field(&config["dataset_version"]),
            field(&config["prompt_name"]),
            field(&config["model"]),
            field(&config["max_samples"]),
        );
    }

    let metrics = &summary.metrics;
    if metrics.as_object().is_none_or(|m| m.is_empty()) {
        println!("  (no metrics recorded)");
        return;
    }

    let overall = &metrics["overall"];
    println!(
        "  overall: {} samples, {} inference errors",
        field(&overall["num_samples"]),
        field(&overall["num_inference_error"]),
    );
    print_rates(overall);

    let quality = &metrics["quality_only"];
    println!(
        "  quality only: {} samples",
        field(&quality["num_quality_samples"])
    );
    print_rates(quality);
}

fn print_rates(view: &Value) {
    for key in RATE_KEYS {
        println!("    {:<24} {}", key, field(&view[key]));
    }
}
