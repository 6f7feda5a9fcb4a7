//! Generation pipeline: per-chunk orchestration and whole-document processing.

mod orchestrator;
mod processor;

pub use orchestrator::ChunkOrchestrator;
pub use processor::{DEFAULT_RETRY_BACKOFF, DocumentProcessor, MAX_ATTEMPTS};

use llm_client::TokenUsage;
use serde::Serialize;
use std::time::Duration;

use crate::text::AppliedStep;

/// Outcome of one accepted chunk attempt.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ProcessChunkResult {
    /// Cleaned (and possibly speaker-labelled) text, trimmed.
    pub text: String,
    /// Tokens and cost of every generation call made for the chunk.
    pub usage: TokenUsage,
    /// Steps in the order they ran; pre and post phases may repeat a name.
    pub applied_steps: Vec<AppliedStep>,
}

/// Whether a chunk kept generated text or fell back to its input.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ChunkStatus {
    Success,
    Failed,
}

/// Snapshot emitted after every chunk.
#[derive(Debug, Clone)]
pub struct ProcessingProgress {
    /// 0-based index of the chunk just finished.
    pub index: usize,
    /// Number of chunks in the document.
    pub total: usize,
    /// Text that will appear in the output for this chunk.
    pub text: String,
    pub status: ChunkStatus,
    /// Attempts beyond the first.
    pub retries: usize,
    /// Wall time of this chunk, retries and backoff included.
    pub last_duration: Duration,
    /// Mean wall time per chunk so far.
    pub average_duration: Duration,
    /// Estimated time for the remaining chunks.
    pub eta: Duration,
    /// Running totals over all chunks so far.
    pub usage: TokenUsage,
}

/// Final result of processing a document.
#[derive(Debug, Clone, Serialize)]
pub struct ProcessingSummary {
    /// Chunk texts separated by a blank line.
    pub text: String,
    pub chunk_count: usize,
    /// Chunks that fell back to their original text.
    pub failed_chunks: usize,
    pub usage: TokenUsage,
    /// Steps of every accepted chunk, concatenated in chunk order.
    pub applied_steps: Vec<AppliedStep>,
    /// Retry and fallback diagnostics.
    pub log: Vec<String>,
}

/// Accept generated text unless it is blank.
///
/// The original chunk is taken so stricter checks can compare against it.
pub fn validate(_original: &str, generated: &str) -> bool {
    !generated.trim().is_empty()
}
