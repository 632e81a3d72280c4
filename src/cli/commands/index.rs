//! Index command implementation.

use crate::cli::preflight::{self, Operation};
use crate::cli::Output;
use crate::config::Settings;
use crate::indexer::IndexOutcome;
use crate::orchestrator::Orchestrator;
use anyhow::Result;
use std::path::Path;

/// Run the index command.
pub async fn run_index(path: &str, force: bool, limit: Option<usize>, settings: Settings) -> Result<()> {
    if let Err(e) = preflight::check(Operation::Index, &settings) {
        Output::error(&format!("{}", e));
        Output::info("Run 'kikk doctor' for detailed diagnostics.");
        return Err(e.into());
    }

    let orchestrator = Orchestrator::new(settings)?;
    let path = Path::new(path);

    if path.is_dir() {
        return run_index_directory(&orchestrator, path, force, limit).await;
    }

    Output::info(&format!("Processing: {}", path.display()));
    let spinner = Output::spinner("Embedding video...");
    let result = orchestrator.index_video(path, force).await;
    spinner.finish_and_clear();

    match result {
        Ok(outcome) => report(&outcome),
        Err(e) => {
            Output::error(&format!("Failed to index: {}", e));
            return Err(e.into());
        }
    }

    Ok(())
}

async fn run_index_directory(
    orchestrator: &Orchestrator,
    dir: &Path,
    force: bool,
    limit: Option<usize>,
) -> Result<()> {
    Output::info(&format!("Indexing videos in {}", dir.display()));

    let spinner = Output::spinner("Embedding videos...");
    let outcomes = orchestrator.index_directory(dir, force, limit).await;
    spinner.finish_and_clear();

    let outcomes = match outcomes {
        Ok(outcomes) => outcomes,
        Err(e) => {
            Output::error(&format!("Failed to index directory: {}", e));
            return Err(e.into());
        }
    };

    if outcomes.is_empty() {
        Output::warning("No video files found.");
        return Ok(());
    }

    let mut failed = 0;
    for outcome in &outcomes {
        match &outcome.result {
            Ok(result) => report(result),
            Err(e) => {
                failed += 1;
                Output::error(&format!("{}: {}", outcome.path.display(), e));
            }
        }
    }

    println!();
    Output::kv("Videos", &outcomes.len().to_string());
    Output::kv("Failed", &failed.to_string());

    if failed > 0 {
        return Err(anyhow::anyhow!("{} of {} videos failed", failed, outcomes.len()));
    }

    Ok(())
}

fn report(outcome: &IndexOutcome) {
    match outcome {
        IndexOutcome::Indexed(summary) => Output::success(&format!(
            "Indexed '{}' | Model: {} | Segments: {} | Embedding size: {}",
            summary.video_name, summary.model, summary.segment_count, summary.dimensions
        )),
        IndexOutcome::AlreadyIndexed { video_name } => Output::warning(&format!(
            "'{}' is already indexed. Use --force to re-embed.",
            video_name
        )),
    }
}
