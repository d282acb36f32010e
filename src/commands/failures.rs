//! `ticketeval failures` - list a run's failed samples

use crate::cli::{Cli, OutputFormat};
use ticketeval_core::classify::FailureType;
use ticketeval_core::engine::Engine;
use ticketeval_core::error::Result;
use ticketeval_core::record::FailureEntry;

/// Execute the failures command
pub fn execute(
    cli: &Cli,
    engine: &Engine,
    run_id: &str,
    failure_type: Option<FailureType>,
) -> Result<()> {
    let list = engine.get_failures(run_id, failure_type)?;

    match cli.format {
        OutputFormat::Json => {
            println!("{}", serde_json::to_string_pretty(&list)?);
        }
        OutputFormat::Human => {
            if list.failures.is_empty() {
                if !cli.quiet {
                    println!("No failures in run {}", run_id);
                }
                return Ok(());
            }
            for entry in &list.failures {
                print_entry(entry, cli.quiet);
            }
            if !cli.quiet {
                println!();
                println!("{} failure(s)", list.failures.len());
            }
        }
    }

    Ok(())
}

fn print_entry(entry: &FailureEntry, quiet: bool) {
    println!("{} [{}] {}", entry.id, entry.input_type, entry.failure_type);
    if quiet {
        return;
    }
    if let Some(parse_error) = &entry.parse_error {
        println!("  parse_error: {}", parse_error);
    }
    for error in &entry.schema_errors {
        println!("  schema: {}", error);
    }
    if !entry.steps_ok {
        println!("  steps: noncompliant");
    }
}
