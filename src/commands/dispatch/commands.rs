//! Command implementations for all ticketeval commands

use crate::cli::Commands;
use crate::commands::dispatch::command::{Command, CommandContext};
use ticketeval_core::error::Result;

impl Command for Commands {
    fn execute(&self, ctx: &CommandContext) -> Result<()> {
        dispatch_command::execute(self, ctx)
    }
}

pub(super) mod dispatch_command {
    use super::*;

    use crate::cli::{AnalyzeArgs, FailuresArgs, RunArgs, ShowArgs};
    use crate::commands::list::Listing;
    use crate::commands::{analyze, failures, list, run, show};

    pub(super) fn execute(cmd: &Commands, ctx: &CommandContext) -> Result<()> {
        match cmd {
            Commands::Datasets => execute_list(ctx, Listing::Datasets),
            Commands::Prompts => execute_list(ctx, Listing::Prompts),
            Commands::Models => execute_list(ctx, Listing::Models),
            Commands::Runs => execute_list(ctx, Listing::Runs),
            Commands::Run(args) => execute_run(ctx, args),
            Commands::Show(args) => execute_show(ctx, args),
            Commands::Failures(args) => execute_failures(ctx, args),
            Commands::Analyze(args) => execute_analyze(ctx, args),
        }
    }

    fn execute_list(ctx: &CommandContext, listing: Listing) -> Result<()> {
        let engine = ctx.open_engine()?;
        list::execute(ctx.cli, &engine, listing)
    }

    fn execute_run(ctx: &CommandContext, args: &RunArgs) -> Result<()> {
        let engine = ctx.open_engine()?;
        run::execute(ctx.cli, &engine, args)
    }

    fn execute_show(ctx: &CommandContext, args: &ShowArgs) -> Result<()> {
        let engine = ctx.open_engine()?;
        show::execute(ctx.cli, &engine, &args.run_id)
    }

    fn execute_failures(ctx: &CommandContext, args: &FailuresArgs) -> Result<()> {
        let engine = ctx.open_engine()?;
        failures::execute(ctx.cli, &engine, &args.run_id, args.failure_type)
    }

    fn execute_analyze(ctx: &CommandContext, args: &AnalyzeArgs) -> Result<()> {
        let engine = ctx.open_engine()?;
        analyze::execute(ctx.cli, &engine, args)
    }
}
