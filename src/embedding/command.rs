//! Embedding provider backed by an external executable.
//!
//! The executable is invoked as `<program> <args...> video --model <model>`
//! with the raw video bytes on stdin, or `<program> <args...> text --model
//! <model>` with the UTF-8 query on stdin. It must print a single JSON
//! document on stdout:
//!
//! - video: `{"segments": [{"start_sec": 0.0, "end_sec": 6.0, "embedding": [...]}]}`
//! - text: `{"embedding": [...]}`
//!
//! Transport, authentication and provider-specific encoding are the
//! executable's business.

use super::{validate_segments, EmbeddingProvider, VideoSegment};
use crate::error::{KikkError, Result};
use async_trait::async_trait;
use serde::Deserialize;
use std::process::Stdio;
use std::time::Duration;
use tokio::io::AsyncWriteExt;
use tokio::process::Command;
use tracing::{debug, instrument};

#[derive(Debug, Deserialize)]
struct VideoResponse {
    segments: Vec<VideoSegment>,
}

#[derive(Debug, Deserialize)]
struct TextResponse {
    embedding: Vec<f32>,
}

/// External-command embedding provider.
pub struct CommandProvider {
    program: String,
    args: Vec<String>,
    timeout: Duration,
}

impl CommandProvider {
    /// Create a provider from a command line (`program` followed by fixed args).
    pub fn new(command: &[String], timeout: Duration) -> Result<Self> {
        let (program, args) = command
            .split_first()
            .ok_or_else(|| KikkError::Config("embedding command is empty".to_string()))?;

        Ok(Self {
            program: program.clone(),
            args: args.to_vec(),
            timeout,
        })
    }

    /// Run the executable once and return its stdout.
    ///
    /// The child is killed if the timeout elapses or the returned future is
    /// dropped before it completes.
    async fn run(&self, operation: &str, mode: &str, model: &str, input: &[u8]) -> Result<Vec<u8>> {
        let mut child = Command::new(&self.program)
            .args(&self.args)
            .arg(mode)
            .arg("--model")
            .arg(model)
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .spawn()
            .map_err(|e| {
                if e.kind() == std::io::ErrorKind::NotFound {
                    KikkError::provider(operation, format!("executable '{}' not found", self.program))
                } else {
                    KikkError::provider(operation, format!("failed to start '{}': {}", self.program, e))
                }
            })?;

        let mut stdin = child
            .stdin
            .take()
            .ok_or_else(|| KikkError::provider(operation, "child stdin unavailable"))?;

        let writer = async move {
            let result = stdin.write_all(input).await;
            drop(stdin);
            result
        };

        let exchange = async {
            let (written, output) = tokio::join!(writer, child.wait_with_output());
            (written, output)
        };

        let (written, output) = tokio::time::timeout(self.timeout, exchange)
            .await
            .map_err(|_| {
                KikkError::provider(operation, format!("timed out after {}s", self.timeout.as_secs_f64()))
            })?;

        let output = output
            .map_err(|e| KikkError::provider(operation, format!("'{}' failed: {}", self.program, e)))?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            return Err(KikkError::provider(
                operation,
                format!("'{}' exited with {}: {}", self.program, output.status, stderr.trim()),
            ));
        }

        // A child that exits successfully without draining stdin is fine.
        if let Err(e) = written {
            if e.kind() != std::io::ErrorKind::BrokenPipe {
                return Err(KikkError::provider(operation, format!("failed to send input: {}", e)));
            }
        }

        Ok(output.stdout)
    }
}

#[async_trait]
impl EmbeddingProvider for CommandProvider {
    #[instrument(skip(self, video), fields(bytes = video.len()))]
    async fn embed_video(&self, video: &[u8], model: &str) -> Result<Vec<VideoSegment>> {
        let stdout = self.run("embed_video", "video", model, video).await?;

        let response: VideoResponse = serde_json::from_slice(&stdout)
            .map_err(|e| KikkError::provider("embed_video", format!("malformed response: {}", e)))?;

        validate_segments(&response.segments)?;
        debug!("Provider returned {} segments", response.segments.len());
        Ok(response.segments)
    }

    #[instrument(skip(self, text))]
    async fn embed_text(&self, text: &str, model: &str) -> Result<Vec<f32>> {
        let stdout = self.run("embed_text", "text", model, text.as_bytes()).await?;

        let response: TextResponse = serde_json::from_slice(&stdout)
            .map_err(|e| KikkError::provider("embed_text", format!("malformed response: {}", e)))?;

        if response.embedding.is_empty() {
            return Err(KikkError::provider("embed_text", "empty embedding"));
        }
        if response.embedding.iter().any(|v| !v.is_finite()) {
            return Err(KikkError::provider("embed_text", "non-finite embedding values"));
        }

        Ok(response.embedding)
    }
}
