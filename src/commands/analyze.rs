//! `ticketeval analyze` - evaluate a single text or video input

use crate::cli::{AnalyzeArgs, Cli, OutputFormat};
use crate::commands::provider::build_invoker;
use ticketeval_core::engine::{Analysis, Engine};
use ticketeval_core::error::{EvalError, Result};
use ticketeval_core::invoker::ModelInput;

/// Execute the analyze command. A response that fails to parse is reported
/// and then surfaced as an error so the process exits non-zero.
pub fn execute(cli: &Cli, engine: &Engine, args: &AnalyzeArgs) -> Result<()> {
    let input = match (&args.text, &args.video) {
        (Some(text), None) => ModelInput::Text(text),
        (None, Some(path)) => ModelInput::Video(path),
        _ => {
            return Err(EvalError::UsageError(
                "exactly one of --text or --video is required".to_string(),
            ))
        }
    };

    let model = args
        .model
        .clone()
        .unwrap_or_else(|| engine.config().model.default.clone());
    let invoker = build_invoker(engine, &args.provider)?;

    let analysis = engine.analyze(
        args.sample_id.as_deref(),
        input,
        &args.prompt,
        &model,
        invoker.as_ref(),
    )?;

    match cli.format {
        OutputFormat::Json => {
            println!("{}", serde_json::to_string_pretty(&analysis)?);
        }
        OutputFormat::Human => print_analysis(&analysis)?,
    }

    match analysis.parse_error {
        Some(reason) => Err(EvalError::FailedOperation {
            operation: "parse model output".to_string(),
            reason,
        }),
        None => Ok(()),
    }
}

fn print_analysis(analysis: &Analysis) -> Result<()> {
    match &analysis.ticket {
        Some(ticket) => println!("{}", serde_json::to_string_pretty(ticket)?),
        None => println!("(no ticket)"),
    }
    println!();

    if analysis.schema_errors.is_empty() {
        println!("schema: ok");
    } else {
        println!("schema errors:");
        for error in &analysis.schema_errors {
            println!("  - {}", error);
        }
    }
    println!(
        "steps: {}",
        if analysis.steps_ok { "compliant" } else { "noncompliant" }
    );
    match analysis.latency_ms {
        Some(ms) => println!("latency: {} ms", ms),
        None => println!("latency: unknown"),
    }

    if analysis.parse_error.is_some() {
        println!();
        println!("raw output:");
        println!("{}", analysis.raw_preview);
    }
    Ok(())
}
