//! List command implementation.

use crate::cli::preflight::{self, Operation};
use crate::cli::Output;
use crate::config::Settings;
use crate::orchestrator::Orchestrator;
use anyhow::Result;

/// Run the list command.
pub async fn run_list(settings: Settings) -> Result<()> {
    preflight::check(Operation::List, &settings)?;
    let orchestrator = Orchestrator::new(settings)?;

    match orchestrator.vector_store().list_sources().await {
        Ok(sources) => {
            if sources.is_empty() {
                Output::info("No videos indexed yet. Use 'kikk index <path>' to add content.");
            } else {
                Output::header(&format!("Indexed Videos ({})", sources.len()));
                println!();

                for item in &sources {
                    Output::video_info(
                        &item.source,
                        item.segment_count,
                        item.total_duration_seconds,
                        item.dimensions,
                    );
                }

                let total_segments: usize = sources.iter().map(|s| s.segment_count).sum();
                println!();
                Output::kv("Total videos", &sources.len().to_string());
                Output::kv("Total segments", &total_segments.to_string());
            }
        }
        Err(e) => {
            Output::error(&format!("Failed to list videos: {}", e));
            return Err(e.into());
        }
    }

    Ok(())
}
