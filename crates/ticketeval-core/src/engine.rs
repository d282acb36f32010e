//! Evaluation run engine: the query surface over a data root

use std::fs;
use std::path::{Path, PathBuf};
use std::time::Instant;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::classify::FailureType;
use crate::config::EngineConfig;
use crate::dataset::{Sample, SampleSource};
use crate::error::{EvalError, Result};
use crate::invoker::{GeminiInvoker, ModelInput, ModelInvoker, ModelRequest, ReplayInvoker};
use crate::metrics::{build_eval_summary, compute_metrics};
use crate::parse::parse_ticket;
use crate::record::{preview, FailureEntry, Record, RAW_PREVIEW_CHARS};
use crate::registry::Registry;
use crate::rules::RuleSet;
use crate::run::{execute, RecordSink, RunConfig, RunContext, RunOptions};
use crate::store::{
    AppendLog, Fingerprints, RunHandle, RunManifest, RunStatus, RunStore, CONFIG_FILE,
    FAILURES_FILE, METRICS_FILE, PARSED_OUTPUTS_FILE, RAW_OUTPUTS_FILE, RULES_FILE, SUMMARY_FILE,
};
use crate::ticket::Ticket;
use crate::trace_time;

/// Prompt used by [`Engine::analyze`] when none is named
pub const DEFAULT_ANALYZE_PROMPT: &str = "ticket_v1_schema";

/// Run identity, status, configuration and metrics
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RunSummary {
    pub run_id: String,
    pub status: RunStatus,
    pub config: Value,
    pub metrics: Value,
}

/// A run's failure entries
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FailureList {
    pub run_id: String,
    pub failures: Vec<FailureEntry>,
}

/// Result of evaluating a single ad-hoc input
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Analysis {
    pub ticket: Option<Ticket>,
    pub parse_error: Option<String>,
    pub schema_errors: Vec<String>,
    pub steps_ok: bool,
    pub latency_ms: Option<u64>,
    pub raw_preview: String,
}

/// Writes each committed record to the raw and parsed output logs
struct ArtifactWriter {
    raw: AppendLog,
    parsed: AppendLog,
    committed: usize,
}

impl ArtifactWriter {
    fn open(run: &RunHandle) -> Result<Self> {
        Ok(Self {
            raw: run.open_log(RAW_OUTPUTS_FILE)?,
            parsed: run.open_log(PARSED_OUTPUTS_FILE)?,
            committed: 0,
        })
    }
}

impl RecordSink for ArtifactWriter {
    fn commit(&mut self, record: &Record) -> Result<()> {
        if record.has_response() {
            self.raw.append(&record.raw_line())?;
            self.parsed.append(&record.parsed_line())?;
        }
        self.committed += 1;
        Ok(())
    }
}

/// Entry point for listing inputs, running evaluations and reading results
#[derive(Debug, Clone)]
pub struct Engine {
    root: PathBuf,
    config: EngineConfig,
    registry: Registry,
    store: RunStore,
}

impl Engine {
    pub fn new(root: &Path, config: EngineConfig) -> Self {
        let paths = config.resolve(root);
        let store = RunStore::new(&paths.runs_dir);
        let registry = Registry::new(paths, &config);

        Self {
            root: root.to_path_buf(),
            config,
            registry,
            store,
        }
    }

    /// Engine over `root` with `ticketeval.toml` and environment overrides applied
    pub fn open(root: &Path) -> Result<Self> {
        Ok(Self::new(root, EngineConfig::load_or_default(root)?))
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    pub fn list_dataset_versions(&self) -> Vec<String> {
        self.registry.list_dataset_versions()
    }

    pub fn list_prompt_names(&self) -> Vec<String> {
        self.registry.list_prompt_names()
    }

    pub fn list_models(&self) -> Vec<String> {
        self.registry.list_models()
    }

    pub fn list_runs(&self) -> Vec<String> {
        self.store.list_runs()
    }

    /// Gemini invoker with the key from the environment.
    /// A missing key is a run-level misconfiguration.
    pub fn gemini_invoker(&self) -> Result<GeminiInvoker> {
        GeminiInvoker::from_env(&self.config).map_err(|e| EvalError::Misconfigured(e.to_string()))
    }

    /// Invoker replaying a recorded raw-output log
    pub fn replay_invoker(&self, responses: &Path) -> Result<ReplayInvoker> {
        ReplayInvoker::load(responses)
    }

    fn load_rules(&self) -> Result<RuleSet> {
        RuleSet::load(&self.registry.paths().rules_path)
    }

    /// Evaluate a dataset and persist every artifact of the run.
    ///
    /// Unknown dataset or prompt, an unreadable rule set, and a malformed
    /// dataset are reported before the run directory is created.
    pub fn submit_run(
        &self,
        config: &RunConfig,
        invoker: &dyn ModelInvoker,
        options: &RunOptions,
    ) -> Result<RunSummary> {
        config.validate()?;
        options.validate()?;

        let dataset_path = self.registry.dataset_path(&config.dataset_version)?;
        let prompt = self.registry.load_prompt(&config.prompt_name)?;
        let rules = self.load_rules()?;
        let source = SampleSource::load(&dataset_path, &self.root)?;
        let samples = source.select(config.input_type_filter(), config.max_samples);

        let dataset_bytes = fs::read(&dataset_path)
            .map_err(|e| EvalError::io_operation("read dataset", dataset_path.display(), e))?;
        let rules_snapshot = rules.to_snapshot()?;
        let fingerprints = Fingerprints::compute(&rules_snapshot, &prompt, &dataset_bytes);

        let run = self.store.create_run()?;
        let mut manifest =
            RunManifest::new(run.run_id(), invoker.name(), samples.len(), fingerprints);
        run.write_text(RULES_FILE, &rules_snapshot)?;
        run.write_json(CONFIG_FILE, config)?;
        run.write_manifest(&manifest)?;

        let span = tracing::info_span!(
            "run",
            run_id = %run.run_id(),
            dataset = %config.dataset_version,
            model = %config.model
        );
        let _guard = span.enter();
        tracing::info!(samples = samples.len(), provider = invoker.name(), "run started");

        let mut writer = ArtifactWriter::open(&run)?;
        manifest.transition(RunStatus::Running, 0);
        run.write_manifest(&manifest)?;

        let ctx = RunContext {
            rules: &rules,
            prompt: &prompt,
            model: &config.model,
            invoker,
        };
        let (status, metrics) = match evaluate_into(&run, &ctx, &samples, options, &mut writer) {
            Ok(finished) => finished,
            Err(e) => {
                tracing::error!(error = %e, records = writer.committed, "run failed");
                manifest.transition(RunStatus::Failed, writer.committed);
                if let Err(write_err) = run.write_manifest(&manifest) {
                    tracing::warn!(error = %write_err, "failed to record run failure");
                }
                return Err(e);
            }
        };

        manifest.transition(status, writer.committed);
        run.write_manifest(&manifest)?;

        Ok(RunSummary {
            run_id: run.run_id().to_string(),
            status,
            config: serde_json::to_value(config)?,
            metrics,
        })
    }

    /// Configuration and metrics of a stored run. Missing artifacts read as
    /// empty objects; runs without a manifest report `completed`.
    pub fn get_run(&self, run_id: &str) -> Result<RunSummary> {
        let run = self.store.open(run_id)?;
        let status = run
            .read_manifest()?
            .map(|m| m.status)
            .unwrap_or(RunStatus::Completed);

        Ok(RunSummary {
            run_id: run_id.to_string(),
            status,
            config: run.read_json_or_empty(CONFIG_FILE)?,
            metrics: run.read_json_or_empty(METRICS_FILE)?,
        })
    }

    /// Failure entries of a stored run, optionally of one category
    pub fn get_failures(
        &self,
        run_id: &str,
        failure_type: Option<FailureType>,
    ) -> Result<FailureList> {
        let run = self.store.open(run_id)?;
        let failures: Vec<FailureEntry> = run
            .read_json(FAILURES_FILE)?
            .ok_or_else(|| EvalError::not_found("failures for run", run_id))?;

        let failures = match failure_type {
            Some(wanted) => failures
                .into_iter()
                .filter(|f| f.failure_type == wanted)
                .collect(),
            None => failures,
        };

        Ok(FailureList {
            run_id: run_id.to_string(),
            failures,
        })
    }

    /// Run one input through the model and report the parsed ticket.
    /// A failed model call is an error; a malformed response is not.
    /// `sample_id` labels the request for invokers that key on it.
    pub fn analyze(
        &self,
        sample_id: Option<&str>,
        input: ModelInput<'_>,
        prompt_name: &str,
        model: &str,
        invoker: &dyn ModelInvoker,
    ) -> Result<Analysis> {
        let prompt = self.registry.load_prompt(prompt_name)?;
        let rules = self.load_rules()?;

        let request = ModelRequest {
            sample_id,
            model,
            prompt: &prompt,
            input,
        };
        let response = invoker.invoke(&request).map_err(|e| EvalError::FailedOperation {
            operation: "invoke model".to_string(),
            reason: e.to_string(),
        })?;

        let raw_preview = preview(&response.raw_text, RAW_PREVIEW_CHARS);
        let analysis = match parse_ticket(&response.raw_text) {
            Ok(ticket) => Analysis {
                schema_errors: crate::validate::validate_ticket(&ticket, &rules.schema),
                steps_ok: crate::compliance::steps_compliant(&ticket, &rules.steps),
                ticket: Some(ticket),
                parse_error: None,
                latency_ms: response.latency_ms,
                raw_preview,
            },
            Err(e) => Analysis {
                ticket: None,
                parse_error: Some(e.code()),
                schema_errors: Vec::new(),
                steps_ok: false,
                latency_ms: response.latency_ms,
                raw_preview,
            },
        };
        Ok(analysis)
    }
}

/// Execute the samples and write the run's aggregate artifacts.
/// Returns the final status and the metrics as JSON.
fn evaluate_into(
    run: &RunHandle,
    ctx: &RunContext<'_>,
    samples: &[Sample],
    options: &RunOptions,
    writer: &mut ArtifactWriter,
) -> Result<(RunStatus, Value)> {
    let started = Instant::now();
    let outcome = execute(ctx, samples, options, writer)?;
    trace_time!(started, "execute", records = outcome.records.len());

    let metrics = compute_metrics(&outcome.records);
    let summary = build_eval_summary(&outcome.records);
    let failures = failure_entries(samples, &outcome.records);

    run.write_json(METRICS_FILE, &metrics)?;
    run.write_json(SUMMARY_FILE, &summary)?;
    run.write_json(FAILURES_FILE, &failures)?;

    let status = if outcome.cancelled {
        RunStatus::Cancelled
    } else {
        RunStatus::Completed
    };
    tracing::info!(
        status = %status,
        records = outcome.records.len(),
        failures = failures.len(),
        "run finished"
    );
    Ok((status, serde_json::to_value(&metrics)?))
}

/// Failure entries for processed samples. Records are a prefix of `samples`.
fn failure_entries(samples: &[Sample], records: &[Record]) -> Vec<FailureEntry> {
    samples
        .iter()
        .zip(records)
        .filter_map(|(sample, record)| record.failure_entry(&sample.input))
        .collect()
}
