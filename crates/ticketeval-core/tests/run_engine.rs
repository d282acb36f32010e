//! End-to-end tests for the run engine against a temporary data root

use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicUsize, Ordering};

use serde_json::{json, Value};
use tempfile::TempDir;
use ticketeval_core::classify::FailureType;
use ticketeval_core::config::EngineConfig;
use ticketeval_core::engine::Engine;
use ticketeval_core::error::EvalError;
use ticketeval_core::invoker::{
    InvocationError, ModelInput, ModelInvoker, ModelRequest, ModelResponse,
};
use ticketeval_core::run::{CancelToken, RunConfig, RunOptions};
use ticketeval_core::store::RunStatus;

const RULES: &str = r#"{
    "schema": {
        "required": ["title", "severity", "steps"],
        "severity_allowed": ["low", "medium", "high", "critical"]
    },
    "steps": {"min_steps": 3, "require_non_empty": true},
    "severity": {
        "mode": "exact",
        "order": ["low", "medium", "high", "critical"],
        "keyword_min_severity": {"crash": "high"}
    }
}"#;

const DATASET: &str = r#"{"id": "t1", "input_type": "text", "input": "App crashes on login", "gold": {"severity": "high"}}
{"id": "t2", "input_type": "text", "input": "Button misaligned", "gold": {"severity": "low"}}
{"id": "t3", "input_type": "text", "input": "Typo in footer", "gold": {"severity": "low"}}
{"id": "t4", "input_type": "text", "input": "Search is slow", "gold": {"severity": "medium"}}
{"id": "t5", "input_type": "text", "input": "Export hangs", "gold": {"severity": "high"}}
"#;

/// Answers from a fixed table keyed by sample id; unknown ids fail
struct ScriptedInvoker {
    responses: HashMap<String, (String, u64)>,
    calls: AtomicUsize,
    cancel_after: Option<(usize, CancelToken)>,
}

impl ScriptedInvoker {
    fn standard() -> Self {
        let mut responses = HashMap::new();
        let mut add = |id: &str, raw: &str, latency: u64| {
            responses.insert(id.to_string(), (raw.to_string(), latency));
        };
        add(
            "t1",
            r#"{"title": "Crash on login", "severity": "high", "steps": ["open app", "log in", "observe crash"]}"#,
            100,
        );
        add("t2", "not json", 200);
        add(
            "t3",
            "```json\n{\"severity\": \"low\", \"steps\": [\"open\", \"scroll\", \"read footer\"]}\n```",
            300,
        );
        add(
            "t4",
            r#"{"title": "Slow search", "severity": "medium", "steps": ["search", "wait"]}"#,
            400,
        );
        Self {
            responses,
            calls: AtomicUsize::new(0),
            cancel_after: None,
        }
    }

    fn cancelling_after(calls: usize, token: CancelToken) -> Self {
        Self {
            cancel_after: Some((calls, token)),
            ..Self::standard()
        }
    }
}

impl ModelInvoker for ScriptedInvoker {
    fn name(&self) -> &str {
        "scripted"
    }

    fn invoke(&self, request: &ModelRequest<'_>) -> Result<ModelResponse, InvocationError> {
        let calls = self.calls.fetch_add(1, Ordering::SeqCst) + 1;
        if let Some((limit, token)) = &self.cancel_after {
            if calls >= *limit {
                token.cancel();
            }
        }

        let id = request.sample_id.unwrap_or("adhoc");
        match self.responses.get(id) {
            Some((raw, latency)) => Ok(ModelResponse {
                raw_text: raw.clone(),
                latency_ms: Some(*latency),
            }),
            None => Err(InvocationError::Transport("connection reset".to_string())),
        }
    }
}

fn data_root() -> TempDir {
    let dir = tempfile::tempdir().unwrap();
    let root = dir.path();

    fs::create_dir_all(root.join("datasets/v1")).unwrap();
    fs::write(root.join("datasets/v1/bugs.jsonl"), DATASET).unwrap();
    fs::create_dir_all(root.join("prompts")).unwrap();
    fs::write(
        root.join("prompts/ticket_v1_schema.txt"),
        "Return a JSON bug ticket with title, severity and steps.",
    )
    .unwrap();
    fs::create_dir_all(root.join("rules")).unwrap();
    fs::write(root.join("rules/default_rules.json"), RULES).unwrap();

    dir
}

fn engine(root: &Path) -> Engine {
    Engine::new(root, EngineConfig::default())
}

fn run_config() -> RunConfig {
    RunConfig::new("v1", "ticket_v1_schema", "gemini-test")
}

fn run_dir(root: &Path, run_id: &str) -> std::path::PathBuf {
    root.join("storage/runs").join(run_id)
}

fn read_json(path: &Path) -> Value {
    serde_json::from_str(&fs::read_to_string(path).unwrap()).unwrap()
}

fn read_lines(path: &Path) -> Vec<Value> {
    fs::read_to_string(path)
        .unwrap()
        .lines()
        .map(|l| serde_json::from_str(l).unwrap())
        .collect()
}

#[test]
fn test_run_writes_all_artifacts() {
    let dir = data_root();
    let engine = engine(dir.path());

    let summary = engine
        .submit_run(
            &run_config(),
            &ScriptedInvoker::standard(),
            &RunOptions::default(),
        )
        .unwrap();

    assert_eq!(summary.status, RunStatus::Completed);
    let run = run_dir(dir.path(), &summary.run_id);
    for artifact in [
        "run.json",
        "config.json",
        "rules.json",
        "raw_outputs.jsonl",
        "parsed_outputs.jsonl",
        "eval.json",
        "eval_summary.json",
        "failures.json",
    ] {
        assert!(run.join(artifact).is_file(), "missing {artifact}");
    }

    let config = read_json(&run.join("config.json"));
    assert_eq!(config["dataset_version"], "v1");
    assert_eq!(config["model"], "gemini-test");

    let manifest = read_json(&run.join("run.json"));
    assert_eq!(manifest["status"], "completed");
    assert_eq!(manifest["records_written"], 5);
    assert_eq!(manifest["provider"], "scripted");
}

#[test]
fn test_metrics_separate_inference_errors() {
    let dir = data_root();
    let engine = engine(dir.path());
    let summary = engine
        .submit_run(
            &run_config(),
            &ScriptedInvoker::standard(),
            &RunOptions::default(),
        )
        .unwrap();

    let overall = &summary.metrics["overall"];
    assert_eq!(overall["num_samples"], 5);
    assert_eq!(overall["num_inference_error"], 1);
    assert_eq!(overall["json_parse_rate"], 0.6);
    assert_eq!(overall["schema_complete_rate"], 0.4);
    assert_eq!(overall["steps_compliance_rate"], 0.4);
    assert_eq!(overall["avg_severity_rule_score"], 0.6);
    assert_eq!(overall["avg_latency_ms"], 250);

    let quality = &summary.metrics["quality_only"];
    assert_eq!(quality["num_quality_samples"], 4);
    assert_eq!(quality["json_parse_rate"], 0.75);
    assert_eq!(quality["schema_complete_rate"], 0.5);
    assert_eq!(quality["steps_compliance_rate"], 0.5);
    assert_eq!(quality["avg_severity_rule_score"], 0.75);

    let stored = read_json(&run_dir(dir.path(), &summary.run_id).join("eval.json"));
    assert_eq!(stored, summary.metrics);
}

#[test]
fn test_failure_classification_per_sample() {
    let dir = data_root();
    let engine = engine(dir.path());
    let summary = engine
        .submit_run(
            &run_config(),
            &ScriptedInvoker::standard(),
            &RunOptions::default(),
        )
        .unwrap();

    let list = engine.get_failures(&summary.run_id, None).unwrap();
    let by_id: HashMap<&str, _> = list.failures.iter().map(|f| (f.id.as_str(), f)).collect();

    assert!(!by_id.contains_key("t1"));

    let parse = by_id["t2"];
    assert_eq!(parse.failure_type, FailureType::ParseError);
    assert!(parse
        .parse_error
        .as_deref()
        .unwrap()
        .starts_with("json_parse_error:"));
    assert!(parse.schema_errors.is_empty());
    assert!(!parse.steps_ok);

    let schema = by_id["t3"];
    assert_eq!(schema.failure_type, FailureType::SchemaError);
    assert_eq!(schema.schema_errors, vec!["missing:title".to_string()]);

    let steps = by_id["t4"];
    assert_eq!(steps.failure_type, FailureType::StepsNoncompliant);
    assert!(steps.schema_errors.is_empty());

    let inference = by_id["t5"];
    assert_eq!(inference.failure_type, FailureType::InferenceError);
    assert!(inference
        .parse_error
        .as_deref()
        .unwrap()
        .starts_with("inference_error:"));
    assert_eq!(inference.raw_preview, "");

    let only_schema = engine
        .get_failures(&summary.run_id, Some(FailureType::SchemaError))
        .unwrap();
    assert_eq!(only_schema.failures.len(), 1);
    assert_eq!(only_schema.failures[0].id, "t3");
}

#[test]
fn test_logs_skip_inference_errors_and_keep_order() {
    let dir = data_root();
    let engine = engine(dir.path());
    let summary = engine
        .submit_run(
            &run_config(),
            &ScriptedInvoker::standard(),
            &RunOptions::default(),
        )
        .unwrap();
    let run = run_dir(dir.path(), &summary.run_id);

    let raw = read_lines(&run.join("raw_outputs.jsonl"));
    let ids: Vec<&str> = raw.iter().map(|l| l["id"].as_str().unwrap()).collect();
    assert_eq!(ids, ["t1", "t2", "t3", "t4"]);
    assert_eq!(raw[1]["raw_text"], "not json");
    assert_eq!(raw[1]["latency_ms"], 200);

    let parsed = read_lines(&run.join("parsed_outputs.jsonl"));
    assert_eq!(parsed.len(), 4);
    assert_eq!(parsed[0]["parsed"]["title"], "Crash on login");
    assert_eq!(parsed[1]["parsed"], Value::Null);
    assert_eq!(parsed[2]["parsed"]["severity"], "low");
}

#[test]
fn test_eval_summary_digest() {
    let dir = data_root();
    let engine = engine(dir.path());
    let summary = engine
        .submit_run(
            &run_config(),
            &ScriptedInvoker::standard(),
            &RunOptions::default(),
        )
        .unwrap();

    let digest = read_json(&run_dir(dir.path(), &summary.run_id).join("eval_summary.json"));
    assert_eq!(
        digest["failure_type_counts"],
        json!({
            "inference_error": 1,
            "ok": 1,
            "parse_error": 1,
            "schema_error": 1,
            "steps_noncompliant": 1
        })
    );
    assert_eq!(digest["top_schema_errors"], json!([["missing:title", 1]]));
    assert_eq!(
        digest["top_parse_error_types"],
        json!([["inference_error", 1], ["json_parse_error", 1]])
    );
}

#[test]
fn test_replaying_raw_log_reproduces_metrics() {
    let dir = data_root();
    let engine = engine(dir.path());
    let first = engine
        .submit_run(
            &run_config(),
            &ScriptedInvoker::standard(),
            &RunOptions::default(),
        )
        .unwrap();
    let first_dir = run_dir(dir.path(), &first.run_id);

    let replay = engine
        .replay_invoker(&first_dir.join("raw_outputs.jsonl"))
        .unwrap();
    let second = engine
        .submit_run(&run_config(), &replay, &RunOptions::default())
        .unwrap();
    let second_dir = run_dir(dir.path(), &second.run_id);

    assert_ne!(first.run_id, second.run_id);
    assert_eq!(first.metrics, second.metrics);
    assert_eq!(
        read_json(&first_dir.join("eval_summary.json")),
        read_json(&second_dir.join("eval_summary.json"))
    );
}

#[test]
fn test_concurrent_run_matches_sequential() {
    let dir = data_root();
    let engine = engine(dir.path());
    let sequential = engine
        .submit_run(
            &run_config(),
            &ScriptedInvoker::standard(),
            &RunOptions::default(),
        )
        .unwrap();
    let concurrent = engine
        .submit_run(
            &run_config(),
            &ScriptedInvoker::standard(),
            &RunOptions::default().with_concurrency(4),
        )
        .unwrap();

    assert_eq!(sequential.metrics, concurrent.metrics);

    let raw = read_lines(&run_dir(dir.path(), &concurrent.run_id).join("raw_outputs.jsonl"));
    let ids: Vec<&str> = raw.iter().map(|l| l["id"].as_str().unwrap()).collect();
    assert_eq!(ids, ["t1", "t2", "t3", "t4"]);
}

#[test]
fn test_cancelled_run_keeps_processed_prefix() {
    let dir = data_root();
    let engine = engine(dir.path());
    let token = CancelToken::new();
    let invoker = ScriptedInvoker::cancelling_after(2, token.clone());

    let summary = engine
        .submit_run(
            &run_config(),
            &invoker,
            &RunOptions::default().with_cancel(token),
        )
        .unwrap();

    assert_eq!(summary.status, RunStatus::Cancelled);
    assert_eq!(summary.metrics["overall"]["num_samples"], 2);

    let run = run_dir(dir.path(), &summary.run_id);
    assert_eq!(read_lines(&run.join("raw_outputs.jsonl")).len(), 2);
    let manifest = read_json(&run.join("run.json"));
    assert_eq!(manifest["status"], "cancelled");
    assert_eq!(manifest["samples_planned"], 5);
    assert_eq!(manifest["records_written"], 2);

    let shown = engine.get_run(&summary.run_id).unwrap();
    assert_eq!(shown.status, RunStatus::Cancelled);
}

#[test]
fn test_cancelled_concurrent_run_commits_ordered_prefix() {
    let dir = data_root();
    let engine = engine(dir.path());
    let token = CancelToken::new();
    let invoker = ScriptedInvoker::cancelling_after(2, token.clone());

    let summary = engine
        .submit_run(
            &run_config(),
            &invoker,
            &RunOptions::default()
                .with_concurrency(2)
                .with_cancel(token),
        )
        .unwrap();
    assert_eq!(summary.status, RunStatus::Cancelled);

    let run = run_dir(dir.path(), &summary.run_id);
    let manifest = read_json(&run.join("run.json"));
    let written = manifest["records_written"].as_u64().unwrap() as usize;
    assert!((2..5).contains(&written), "records_written = {written}");
    assert_eq!(summary.metrics["overall"]["num_samples"], written);

    let raw = read_lines(&run.join("raw_outputs.jsonl"));
    let ids: Vec<&str> = raw.iter().map(|l| l["id"].as_str().unwrap()).collect();
    assert_eq!(ids, &["t1", "t2", "t3", "t4"][..written]);
}

/// Turns the metrics artifact path into a directory mid-run
struct MetricsBlockingInvoker {
    inner: ScriptedInvoker,
    runs_dir: PathBuf,
}

impl ModelInvoker for MetricsBlockingInvoker {
    fn name(&self) -> &str {
        "scripted"
    }

    fn invoke(&self, request: &ModelRequest<'_>) -> Result<ModelResponse, InvocationError> {
        for entry in fs::read_dir(&self.runs_dir).unwrap() {
            fs::create_dir_all(entry.unwrap().path().join("eval.json")).unwrap();
        }
        self.inner.invoke(request)
    }
}

#[test]
fn test_artifact_write_failure_marks_run_failed() {
    let dir = data_root();
    let engine = engine(dir.path());
    let invoker = MetricsBlockingInvoker {
        inner: ScriptedInvoker::standard(),
        runs_dir: dir.path().join("storage/runs"),
    };

    let err = engine
        .submit_run(&run_config(), &invoker, &RunOptions::default())
        .unwrap_err();
    match err {
        EvalError::FailedOperationWithTarget { target, .. } => assert!(target.ends_with("eval.json")),
        other => panic!("unexpected error: {other:?}"),
    }

    let run_id = engine.list_runs().pop().unwrap();
    let run = run_dir(dir.path(), &run_id);
    let manifest = read_json(&run.join("run.json"));
    assert_eq!(manifest["status"], "failed");
    assert_eq!(manifest["records_written"], 5);
    assert_eq!(read_lines(&run.join("raw_outputs.jsonl")).len(), 4);

    let shown = engine.get_run(&run_id).unwrap();
    assert_eq!(shown.status, RunStatus::Failed);
}

#[test]
fn test_replay_without_latency_keeps_average_over_known() {
    let dir = data_root();
    let engine = engine(dir.path());
    let responses = dir.path().join("responses.jsonl");
    fs::write(
        &responses,
        concat!(
            r#"{"id": "t1", "raw_text": "{\"title\": \"Crash\", \"severity\": \"high\", \"steps\": [\"a\", \"b\", \"c\"]}", "latency_ms": 50}"#,
            "\n",
            r#"{"id": "t2", "raw_text": "not json"}"#,
            "\n",
        ),
    )
    .unwrap();

    let replay = engine.replay_invoker(&responses).unwrap();
    let mut config = run_config();
    config.max_samples = 2;
    let summary = engine
        .submit_run(&config, &replay, &RunOptions::default())
        .unwrap();

    assert_eq!(summary.metrics["overall"]["avg_latency_ms"], 50);

    let raw = read_lines(&run_dir(dir.path(), &summary.run_id).join("raw_outputs.jsonl"));
    assert_eq!(raw.len(), 2);
    assert!(raw[1]["latency_ms"].is_null());
}

#[test]
fn test_max_samples_caps_selection() {
    let dir = data_root();
    let engine = engine(dir.path());

    let mut config = run_config();
    config.max_samples = 2;
    let summary = engine
        .submit_run(&config, &ScriptedInvoker::standard(), &RunOptions::default())
        .unwrap();
    assert_eq!(summary.metrics["overall"]["num_samples"], 2);
}

#[test]
fn test_unknown_inputs_fail_before_run_dir_exists() {
    let dir = data_root();
    let engine = engine(dir.path());

    let mut config = run_config();
    config.dataset_version = "v9".to_string();
    let err = engine
        .submit_run(&config, &ScriptedInvoker::standard(), &RunOptions::default())
        .unwrap_err();
    assert!(matches!(err, EvalError::NotFound { .. }));

    let mut config = run_config();
    config.prompt_name = "missing".to_string();
    let err = engine
        .submit_run(&config, &ScriptedInvoker::standard(), &RunOptions::default())
        .unwrap_err();
    assert!(matches!(err, EvalError::NotFound { .. }));

    assert!(engine.list_runs().is_empty());
}

#[test]
fn test_invalid_rules_fail_before_run_dir_exists() {
    let dir = data_root();
    fs::write(dir.path().join("rules/default_rules.json"), "{ not json").unwrap();
    let engine = engine(dir.path());

    let err = engine
        .submit_run(
            &run_config(),
            &ScriptedInvoker::standard(),
            &RunOptions::default(),
        )
        .unwrap_err();
    assert!(matches!(err, EvalError::InvalidRules { .. }));
    assert!(engine.list_runs().is_empty());
}

#[test]
fn test_get_run_without_manifest_reads_as_completed() {
    let dir = data_root();
    let run = run_dir(dir.path(), "legacy_run");
    fs::create_dir_all(&run).unwrap();
    fs::write(run.join("config.json"), r#"{"dataset_version": "v0"}"#).unwrap();

    let engine = engine(dir.path());
    let summary = engine.get_run("legacy_run").unwrap();
    assert_eq!(summary.status, RunStatus::Completed);
    assert_eq!(summary.config["dataset_version"], "v0");
    assert_eq!(summary.metrics, json!({}));

    assert!(matches!(
        engine.get_failures("legacy_run", None).unwrap_err(),
        EvalError::NotFound { .. }
    ));
    assert!(matches!(
        engine.get_run("nope").unwrap_err(),
        EvalError::NotFound { .. }
    ));
}

#[test]
fn test_analyze_reports_ticket_checks() {
    let dir = data_root();
    let engine = engine(dir.path());

    let analysis = engine
        .analyze(
            Some("t4"),
            ModelInput::Text("Search is slow"),
            "ticket_v1_schema",
            "gemini-test",
            &ScriptedInvoker::standard(),
        )
        .unwrap();
    assert_eq!(analysis.ticket.as_ref().unwrap().title(), Some("Slow search"));
    assert!(analysis.schema_errors.is_empty());
    assert!(!analysis.steps_ok);
    assert_eq!(analysis.latency_ms, Some(400));

    let analysis = engine
        .analyze(
            Some("t2"),
            ModelInput::Text("Button misaligned"),
            "ticket_v1_schema",
            "gemini-test",
            &ScriptedInvoker::standard(),
        )
        .unwrap();
    assert!(analysis.ticket.is_none());
    assert!(analysis.parse_error.unwrap().starts_with("json_parse_error:"));
    assert_eq!(analysis.raw_preview, "not json");

    let err = engine
        .analyze(
            None,
            ModelInput::Text("anything"),
            "ticket_v1_schema",
            "gemini-test",
            &ScriptedInvoker::standard(),
        )
        .unwrap_err();
    assert!(matches!(err, EvalError::FailedOperation { .. }));
}
