//! `ticketeval run` - evaluate a dataset with a prompt and model

use crate::cli::{Cli, OutputFormat, RunArgs};
use crate::commands::provider::build_invoker;
use crate::commands::render::print_run_summary;
use ticketeval_core::engine::Engine;
use ticketeval_core::error::Result;
use ticketeval_core::run::{CancelToken, RunConfig, RunOptions};

/// Build the run configuration, falling back to configured defaults
pub fn run_config(engine: &Engine, args: &RunArgs) -> RunConfig {
    let defaults = &engine.config().run;
    let model = args
        .model
        .clone()
        .unwrap_or_else(|| engine.config().model.default.clone());

    let mut config = RunConfig::new(&args.dataset, &args.prompt, &model);
    config.max_samples = args.max_samples.unwrap_or(defaults.max_samples);
    if !args.input_types.is_empty() {
        config.input_types = Some(args.input_types.clone());
    }
    config
}

/// Execute the run command
pub fn execute(cli: &Cli, engine: &Engine, args: &RunArgs) -> Result<()> {
    let config = run_config(engine, args);
    let invoker = build_invoker(engine, &args.provider)?;

    let cancel = CancelToken::new();
    let handler_token = cancel.clone();
    let _ = ctrlc::set_handler(move || {
        handler_token.cancel();
    });

    let options = RunOptions::default()
        .with_concurrency(args.concurrency.unwrap_or(engine.config().run.concurrency))
        .with_cancel(cancel);

    let summary = engine.submit_run(&config, invoker.as_ref(), &options)?;

    match cli.format {
        OutputFormat::Json => {
            println!("{}", serde_json::to_string_pretty(&summary)?);
        }
        OutputFormat::Human => {
            if cli.quiet {
                println!("{}", summary.run_id);
            } else {
                print_run_summary(&summary);
            }
        }
    }

    Ok(())
}
