//! Sample iteration
//!
//! Samples are processed by one worker, or by a bounded pool of scoped
//! threads. Either way the calling thread is the only writer: finished
//! records pass through a reorder buffer and are committed strictly in sample
//! order, so logs and the returned record list match dataset order.

use std::collections::BTreeMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::mpsc;

use super::RunOptions;
use crate::dataset::{InputType, Sample};
use crate::error::Result;
use crate::invoker::{ModelInput, ModelInvoker, ModelRequest};
use crate::pipeline::evaluate_response;
use crate::record::Record;
use crate::rules::RuleSet;

/// Everything a worker needs to evaluate a sample
#[derive(Clone, Copy)]
pub struct RunContext<'a> {
    pub rules: &'a RuleSet,
    pub prompt: &'a str,
    pub model: &'a str,
    pub invoker: &'a dyn ModelInvoker,
}

/// Receives records in sample order
pub trait RecordSink {
    fn commit(&mut self, record: &Record) -> Result<()>;
}

/// Records produced by a run, in sample order
#[derive(Debug, Default)]
pub struct RunOutcome {
    pub records: Vec<Record>,
    pub cancelled: bool,
}

/// Invoke the model for one sample and evaluate its response.
/// Invocation failures become `inference_error` records.
pub fn process_sample(ctx: &RunContext<'_>, sample: &Sample) -> Record {
    let input = match (sample.input_type, sample.video.as_deref()) {
        (InputType::Text, _) => ModelInput::Text(&sample.input),
        (InputType::Video, Some(path)) => ModelInput::Video(path),
        (InputType::Video, None) => {
            return Record::inference_error(sample, "video path not resolved");
        }
    };

    let request = ModelRequest {
        sample_id: Some(&sample.id),
        model: ctx.model,
        prompt: ctx.prompt,
        input,
    };

    let record = match ctx.invoker.invoke(&request) {
        Ok(response) => {
            evaluate_response(sample, response.raw_text, response.latency_ms, ctx.rules)
        }
        Err(e) => {
            tracing::warn!(sample_id = %sample.id, error = %e, "inference failed");
            Record::inference_error(sample, &e.to_string())
        }
    };

    tracing::debug!(
        sample_id = %record.id,
        failure_type = record.failure_type.map(|t| t.as_str()).unwrap_or("ok"),
        latency_ms = ?record.latency_ms,
        "evaluated sample"
    );
    record
}

/// Process `samples`, committing each record to `sink` in order.
/// Stops submitting new samples once the cancel token is set.
pub fn execute(
    ctx: &RunContext<'_>,
    samples: &[Sample],
    options: &RunOptions,
    sink: &mut dyn RecordSink,
) -> Result<RunOutcome> {
    let workers = options.concurrency.clamp(1, samples.len().max(1));

    let records = if workers == 1 {
        execute_sequential(ctx, samples, options, sink)?
    } else {
        execute_concurrent(ctx, samples, options, sink, workers)?
    };

    let cancelled = records.len() < samples.len() && options.cancel.is_cancelled();
    if cancelled {
        tracing::info!(
            processed = records.len(),
            planned = samples.len(),
            "run cancelled"
        );
    }

    Ok(RunOutcome { records, cancelled })
}

fn execute_sequential(
    ctx: &RunContext<'_>,
    samples: &[Sample],
    options: &RunOptions,
    sink: &mut dyn RecordSink,
) -> Result<Vec<Record>> {
    let mut records = Vec::with_capacity(samples.len());

    for sample in samples {
        if options.cancel.is_cancelled() {
            break;
        }
        let record = process_sample(ctx, sample);
        sink.commit(&record)?;
        records.push(record);
    }

    Ok(records)
}

fn execute_concurrent(
    ctx: &RunContext<'_>,
    samples: &[Sample],
    options: &RunOptions,
    sink: &mut dyn RecordSink,
    workers: usize,
) -> Result<Vec<Record>> {
    let next = AtomicUsize::new(0);
    let mut records = Vec::with_capacity(samples.len());

    std::thread::scope(|scope| {
        let (tx, rx) = mpsc::channel::<(usize, Record)>();

        for _ in 0..workers {
            let tx = tx.clone();
            let next = &next;
            let cancel = &options.cancel;
            scope.spawn(move || loop {
                if cancel.is_cancelled() {
                    break;
                }
                let index = next.fetch_add(1, Ordering::SeqCst);
                let Some(sample) = samples.get(index) else {
                    break;
                };
                let record = process_sample(ctx, sample);
                // Receiver gone means the writer failed
                if tx.send((index, record)).is_err() {
                    break;
                }
            });
        }
        drop(tx);

        // Claimed indices always complete, so committed records form a prefix
        let mut pending: BTreeMap<usize, Record> = BTreeMap::new();
        for (index, record) in rx {
            pending.insert(index, record);
            while let Some(record) = pending.remove(&records.len()) {
                sink.commit(&record)?;
                records.push(record);
            }
        }

        Ok::<(), crate::error::EvalError>(())
    })?;

    Ok(records)
}
