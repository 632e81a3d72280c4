//! Remove command implementation.

use crate::cli::preflight::{self, Operation};
use crate::cli::Output;
use crate::config::Settings;
use crate::orchestrator::Orchestrator;
use anyhow::Result;

/// Run the remove command.
pub async fn run_remove(video: &str, settings: Settings) -> Result<()> {
    preflight::check(Operation::Remove, &settings)?;
    let orchestrator = Orchestrator::new(settings)?;

    match orchestrator.remove_video(video).await {
        Ok(0) => Output::warning(&format!("'{}' is not indexed", video)),
        Ok(removed) => Output::success(&format!("Removed {} segments of '{}'", removed, video)),
        Err(e) => {
            Output::error(&format!("Failed to remove '{}': {}", video, e));
            return Err(e.into());
        }
    }

    Ok(())
}
