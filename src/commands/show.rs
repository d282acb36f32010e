//! `ticketeval show` - display a stored run's configuration and metrics

use crate::cli::{Cli, OutputFormat};
use crate::commands::render::print_run_summary;
use ticketeval_core::engine::Engine;
use ticketeval_core::error::Result;

/// Execute the show command
pub fn execute(cli: &Cli, engine: &Engine, run_id: &str) -> Result<()> {
    let summary = engine.get_run(run_id)?;

    match cli.format {
        OutputFormat::Json => {
            println!("{}", serde_json::to_string_pretty(&summary)?);
        }
        OutputFormat::Human => print_run_summary(&summary),
    }

    Ok(())
}
