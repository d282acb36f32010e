use assert_cmd::{cargo::cargo_bin_cmd, Command};
use std::fs;
use std::path::Path;
use tempfile::TempDir;

/// Get a Command for ticketeval, isolated from the caller's environment
pub fn ticketeval() -> Command {
    let mut cmd = cargo_bin_cmd!("ticketeval");
    cmd.env_remove("GEMINI_API_KEY")
        .env_remove("GEMINI_MODEL")
        .env_remove("TICKETEVAL_ROOT")
        .env_remove("TICKETEVAL_API_BASE")
        .env_remove("RUST_LOG")
        .env_remove("TICKETEVAL_LOG");
    cmd
}

pub const RULES: &str = r#"{
    "schema": {"required": ["title", "severity", "steps"]},
    "steps": {"min_steps": 3},
    "severity": {"mode": "exact"}
}"#;

pub const DATASET: &str = r#"{"id": "t1", "input_type": "text", "input": "App crashes on login", "gold": {"severity": "high"}}
{"id": "t2", "input_type": "text", "input": "Button misaligned", "gold": {"severity": "low"}}
{"id": "t3", "input_type": "text", "input": "Typo in footer", "gold": {"severity": "low"}}
"#;

/// Raw-output log answering t1 and t2; t3 has no line
pub const RESPONSES: &str = r#"{"id": "t1", "raw_text": "{\"title\": \"Crash on login\", \"severity\": \"high\", \"steps\": [\"open\", \"log in\", \"crash\"]}", "latency_ms": 120}
{"id": "t2", "raw_text": "not json", "latency_ms": 80}
"#;

/// Data root with dataset `v1`, prompt `ticket_v1_schema`, default rules
/// and a replay log at `responses.jsonl`
pub fn data_root() -> TempDir {
    let dir = tempfile::tempdir().unwrap();
    let root = dir.path();

    fs::create_dir_all(root.join("datasets/v1")).unwrap();
    fs::write(root.join("datasets/v1/bugs.jsonl"), DATASET).unwrap();
    fs::create_dir_all(root.join("prompts")).unwrap();
    fs::write(root.join("prompts/ticket_v1_schema.txt"), "Return a JSON ticket.").unwrap();
    fs::write(root.join("prompts/ticket_terse.txt"), "Return JSON.").unwrap();
    fs::create_dir_all(root.join("rules")).unwrap();
    fs::write(root.join("rules/default_rules.json"), RULES).unwrap();
    fs::write(root.join("responses.jsonl"), RESPONSES).unwrap();

    dir
}

/// Submit a replay run over `root` and return its run id
pub fn replay_run(root: &Path) -> String {
    let output = ticketeval()
        .arg("--root")
        .arg(root)
        .args(["--format", "json", "run", "--dataset", "v1"])
        .args(["--prompt", "ticket_v1_schema", "--provider", "replay"])
        .arg("--responses")
        .arg(root.join("responses.jsonl"))
        .output()
        .unwrap();
    assert!(output.status.success(), "run failed: {:?}", output);

    let summary: serde_json::Value = serde_json::from_slice(&output.stdout).unwrap();
    summary["run_id"].as_str().unwrap().to_string()
}
