//! `ticketeval datasets|prompts|models|runs` - list registry entries and runs

use crate::cli::{Cli, OutputFormat};
use ticketeval_core::engine::Engine;
use ticketeval_core::error::Result;

/// What a listing command enumerates
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Listing {
    Datasets,
    Prompts,
    Models,
    Runs,
}

impl Listing {
    fn key(self) -> &'static str {
        match self {
            Listing::Datasets => "datasets",
            Listing::Prompts => "prompts",
            Listing::Models => "models",
            Listing::Runs => "runs",
        }
    }

    fn entries(self, engine: &Engine) -> Vec<String> {
        match self {
            Listing::Datasets => engine.list_dataset_versions(),
            Listing::Prompts => engine.list_prompt_names(),
            Listing::Models => engine.list_models(),
            Listing::Runs => engine.list_runs(),
        }
    }
}

/// Execute a listing command
pub fn execute(cli: &Cli, engine: &Engine, listing: Listing) -> Result<()> {
    let entries = listing.entries(engine);

    match cli.format {
        OutputFormat::Json => {
            let mut output = serde_json::Map::new();
            output.insert(listing.key().to_string(), serde_json::json!(entries));
            println!("{}", serde_json::to_string_pretty(&output)?);
        }
        OutputFormat::Human => {
            if entries.is_empty() {
                if !cli.quiet {
                    println!("No {} found", listing.key());
                }
                return Ok(());
            }
            for entry in &entries {
                println!("{}", entry);
            }
        }
    }

    Ok(())
}
