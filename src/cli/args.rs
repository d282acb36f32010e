//! Argument structs for ticketeval subcommands

use std::path::PathBuf;

use clap::{ArgGroup, Args, ValueEnum};
use ticketeval_core::classify::FailureType;
use ticketeval_core::dataset::InputType;

/// Model provider backing a run
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum Provider {
    /// Gemini API (requires GEMINI_API_KEY)
    Gemini,
    /// Recorded responses from a raw-output log (requires --responses)
    Replay,
}

/// Provider selection shared by `run` and `analyze`
#[derive(Args, Debug, Clone)]
pub struct ProviderArgs {
    /// Model provider
    #[arg(long, value_enum, default_value = "gemini")]
    pub provider: Provider,

    /// Raw-output log answered by the replay provider
    #[arg(long, required_if_eq("provider", "replay"))]
    pub responses: Option<PathBuf>,
}

#[derive(Args, Debug)]
pub struct RunArgs {
    /// Dataset version
    #[arg(long)]
    pub dataset: String,

    /// Prompt name
    #[arg(long)]
    pub prompt: String,

    /// Model identity (default: configured model)
    #[arg(long)]
    pub model: Option<String>,

    /// Maximum samples to evaluate (1-500)
    #[arg(long)]
    pub max_samples: Option<usize>,

    /// Only evaluate samples of this input type (repeatable)
    #[arg(long = "input-type", value_parser = parse_input_type)]
    pub input_types: Vec<InputType>,

    /// Concurrent model calls (1-16)
    #[arg(long)]
    pub concurrency: Option<usize>,

    #[command(flatten)]
    pub provider: ProviderArgs,
}

#[derive(Args, Debug)]
pub struct ShowArgs {
    /// Run id
    pub run_id: String,
}

#[derive(Args, Debug)]
pub struct FailuresArgs {
    /// Run id
    pub run_id: String,

    /// Only show failures of this type
    #[arg(long = "type", value_parser = parse_failure_type)]
    pub failure_type: Option<FailureType>,
}

#[derive(Args, Debug)]
#[command(group(ArgGroup::new("input").required(true).args(["text", "video"])))]
pub struct AnalyzeArgs {
    /// Bug description text
    #[arg(long)]
    pub text: Option<String>,

    /// Path to a video file
    #[arg(long)]
    pub video: Option<PathBuf>,

    /// Prompt name
    #[arg(long, default_value = ticketeval_core::engine::DEFAULT_ANALYZE_PROMPT)]
    pub prompt: String,

    /// Model identity (default: configured model)
    #[arg(long)]
    pub model: Option<String>,

    /// Sample id used to look up a replayed response
    #[arg(long)]
    pub sample_id: Option<String>,

    #[command(flatten)]
    pub provider: ProviderArgs,
}

fn parse_input_type(s: &str) -> Result<InputType, String> {
    InputType::parse(s).ok_or_else(|| format!("unknown input type '{}' (expected text or video)", s))
}

fn parse_failure_type(s: &str) -> Result<FailureType, String> {
    s.parse::<FailureType>().map_err(|e| e.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_input_type() {
        assert_eq!(parse_input_type("video").unwrap(), InputType::Video);
        assert!(parse_input_type("audio").is_err());
    }

    #[test]
    fn test_parse_failure_type() {
        assert_eq!(
            parse_failure_type("schema_error").unwrap(),
            FailureType::SchemaError
        );
        assert!(parse_failure_type("ok").is_err());
    }
}
