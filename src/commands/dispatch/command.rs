//! Command trait and context for dispatching commands

use std::path::PathBuf;
use std::time::Instant;

use crate::cli::paths::resolve_in_root;
use crate::cli::Cli;
use ticketeval_core::config::EngineConfig;
use ticketeval_core::engine::Engine;
use ticketeval_core::error::Result;

/// Open the engine over the data root, honoring `--config`
pub fn open_engine(cli: &Cli, root: &PathBuf) -> Result<Engine> {
    match &cli.config {
        Some(path) => {
            let config = EngineConfig::load(&resolve_in_root(path, root))?.with_env_overrides();
            config.validate()?;
            Ok(Engine::new(root, config))
        }
        None => Engine::open(root),
    }
}

/// Shared context for command execution
pub struct CommandContext<'a> {
    pub cli: &'a Cli,
    pub root: &'a PathBuf,
    pub start: Instant,
}

impl<'a> CommandContext<'a> {
    pub fn new(cli: &'a Cli, root: &'a PathBuf, start: Instant) -> Self {
        Self { cli, root, start }
    }

    pub fn open_engine(&self) -> Result<Engine> {
        let engine = open_engine(self.cli, self.root)?;
        tracing::debug!(elapsed = ?self.start.elapsed(), "open_engine");
        Ok(engine)
    }
}

/// Trait for commands that can be executed
pub trait Command {
    fn execute(&self, ctx: &CommandContext) -> Result<()>;
}

/// No-op command (when no subcommand is provided)
pub struct NoCommand;

impl Command for NoCommand {
    fn execute(&self, _ctx: &CommandContext) -> Result<()> {
        println!("ticketeval {}", env!("CARGO_PKG_VERSION"));
        println!();
        println!("Batch evaluation of model-generated bug tickets.");
        println!();
        println!("Run `ticketeval --help` for usage information.");
        Ok(())
    }
}
