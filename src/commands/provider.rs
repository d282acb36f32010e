//! Model invoker selection for `run` and `analyze`

use crate::cli::{Provider, ProviderArgs};
use ticketeval_core::engine::Engine;
use ticketeval_core::error::{EvalError, Result};
use ticketeval_core::invoker::ModelInvoker;

/// Build the invoker named by `--provider`
pub fn build_invoker(engine: &Engine, args: &ProviderArgs) -> Result<Box<dyn ModelInvoker>> {
    match args.provider {
        Provider::Gemini => Ok(Box::new(engine.gemini_invoker()?)),
        Provider::Replay => {
            let path = args.responses.as_deref().ok_or_else(|| {
                EvalError::UsageError("--responses is required with --provider replay".to_string())
            })?;
            let invoker = engine.replay_invoker(path)?;
            if invoker.is_empty() {
                tracing::warn!(path = %path.display(), "replay log has no responses");
            }
            Ok(Box::new(invoker))
        }
    }
}
