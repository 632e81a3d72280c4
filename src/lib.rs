//! Kikk - Video Embedding and Semantic Search
//!
//! A local-first CLI tool for indexing video segments as embeddings and
//! retrieving the segments most similar to a text query.
//!
//! The name "Kikk" comes from the Norwegian word for "peek."
//!
//! # Architecture
//!
//! - `config` - Configuration management
//! - `embedding` - Embedding provider contract and the external-command provider
//! - `vector_store` - Durable key-to-record embedding store
//! - `indexer` - Video to keyed segment records
//! - `search` - Cosine similarity and top-k ranking
//! - `orchestrator` - Wires the collaborators together
//!
//! # Example
//!
//! ```rust,no_run
//! use kikk::config::Settings;
//! use kikk::orchestrator::Orchestrator;
//! use std::path::Path;
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let orchestrator = Orchestrator::new(Settings::load()?)?;
//!
//!     orchestrator.index_video(Path::new("holiday.mp4"), false).await?;
//!     for hit in orchestrator.search("waves on a beach", Some(5)).await? {
//!         println!("{:.3} {} {}", hit.score, hit.source, hit.format_range());
//!     }
//!
//!     Ok(())
//! }
//! ```

pub mod cli;
pub mod config;
pub mod embedding;
pub mod error;
pub mod indexer;
pub mod orchestrator;
pub mod search;
pub mod vector_store;

pub use error::{KikkError, Result};
