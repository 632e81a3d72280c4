//! CLI module for Kikk.

pub mod commands;
mod output;
pub mod preflight;

pub use output::Output;

use clap::{Parser, Subcommand};

/// Kikk - Video Embedding and Semantic Search
///
/// A local-first CLI tool for indexing video segments as embeddings and
/// searching them with natural language. The name "Kikk" comes from the
/// Norwegian word for "peek."
#[derive(Parser, Debug)]
#[command(name = "kikk")]
#[command(version, about, long_about = None)]
pub struct Cli {
    /// Increase verbosity (-v for info, -vv for debug, -vvv for trace)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Path to configuration file
    #[arg(short, long, global = true)]
    pub config: Option<String>,

    /// Path to the vector store file (overrides the configuration)
    #[arg(long, global = true, env = "VECTOR_DB_FILE")]
    pub store: Option<String>,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Embed a video file (or every video in a directory) and add it to the index
    Index {
        /// Video file or directory of videos
        path: String,

        /// Re-embed even if already indexed, replacing the old segments
        #[arg(short, long)]
        force: bool,

        /// Maximum number of videos to index from a directory (default: all)
        #[arg(long)]
        limit: Option<usize>,
    },

    /// Search indexed video segments with a text query
    Search {
        /// Search query
        query: String,

        /// Number of results (defaults to search.default_k)
        #[arg(short)]
        k: Option<usize>,

        /// Minimum similarity score (-1.0 to 1.0)
        #[arg(short, long)]
        min_score: Option<f32>,

        /// Print results as JSON
        #[arg(long)]
        json: bool,
    },

    /// List indexed videos
    List,

    /// Remove a video's segments from the index
    Remove {
        /// Video file name, as shown by `kikk list`
        video: String,
    },

    /// Check configuration, provider and store
    Doctor,

    /// Manage configuration
    Config {
        #[command(subcommand)]
        action: ConfigAction,
    },
}

#[derive(Subcommand, Debug)]
pub enum ConfigAction {
    /// Show current configuration
    Show,

    /// Show configuration file path
    Path,

    /// Write a default configuration file
    Init,
}
