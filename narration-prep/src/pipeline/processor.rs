//! Whole-document processing with retries, fallback and progress reporting.

use llm_client::{TextGenerator, TokenUsage};
use std::sync::Arc;
use std::time::{Duration, Instant};

use super::{
    ChunkOrchestrator, ChunkStatus, ProcessChunkResult, ProcessingProgress, ProcessingSummary,
};
use crate::config::ProcessingConfig;
use crate::error::{PrepError, Result};
use crate::text::{CleaningOptions, Lexicon, Phase, split_into_chunks};

/// Attempts per chunk before falling back to the original text.
pub const MAX_ATTEMPTS: usize = 2;

/// Pause before retrying a chunk whose output failed validation.
pub const DEFAULT_RETRY_BACKOFF: Duration = Duration::from_secs(1);

/// Drives a [`ChunkOrchestrator`] over every chunk of a document, in order.
pub struct DocumentProcessor<'a> {
    orchestrator: ChunkOrchestrator<'a>,
    retry_backoff: Duration,
}

/// Outcome of all attempts at one chunk.
struct ChunkOutcome {
    text: String,
    status: ChunkStatus,
    retries: usize,
    /// Spent across every attempt, failed ones included.
    usage: TokenUsage,
    /// Accepted attempt; `None` on fallback.
    result: Option<ProcessChunkResult>,
}

impl<'a> DocumentProcessor<'a> {
    pub fn new(generator: &'a dyn TextGenerator) -> Self {
        Self {
            orchestrator: ChunkOrchestrator::new(generator),
            retry_backoff: DEFAULT_RETRY_BACKOFF,
        }
    }

    /// Override the pause after a validation failure.
    pub fn with_retry_backoff(mut self, backoff: Duration) -> Self {
        self.retry_backoff = backoff;
        self
    }

    /// Use this lexicon for OCR repair instead of the shared one.
    pub fn with_lexicon(mut self, lexicon: Arc<Lexicon>) -> Self {
        self.orchestrator = self.orchestrator.with_lexicon(lexicon);
        self
    }

    /// Process a document without progress reporting.
    pub async fn process_document(
        &self,
        text: &str,
        config: &ProcessingConfig,
    ) -> Result<ProcessingSummary> {
        self.process_document_with_progress(text, config, |_| {})
            .await
    }

    /// Process a document, calling `on_progress` after every chunk.
    ///
    /// Blank input and unusable configuration are rejected before any chunk
    /// is generated. Afterwards only a configuration error stops the
    /// document; every other failure ends in a fallback to the chunk's
    /// original text.
    pub async fn process_document_with_progress<F>(
        &self,
        text: &str,
        config: &ProcessingConfig,
        mut on_progress: F,
    ) -> Result<ProcessingSummary>
    where
        F: FnMut(ProcessingProgress),
    {
        if text.trim().is_empty() {
            return Err(PrepError::EmptyInput);
        }
        config.validate()?;
        self.orchestrator.check_ready(config)?;

        let chunks = split_into_chunks(text, config.batch_size);
        let total = chunks.len();
        log::info!(
            "Processing {} chunk(s) with {} ({})",
            total,
            config.active_model(),
            config.model_source
        );

        let mut texts = Vec::with_capacity(total);
        let mut applied_steps = Vec::new();
        let mut usage = TokenUsage::default();
        let mut log_lines = Vec::new();
        let mut failed_chunks = 0;
        let mut durations: Vec<Duration> = Vec::with_capacity(total);

        for (index, chunk) in chunks.iter().enumerate() {
            let start = Instant::now();
            let outcome = self
                .process_with_retries(index, chunk, config, &mut log_lines)
                .await?;
            let elapsed = start.elapsed();

            usage += outcome.usage;
            if let Some(result) = &outcome.result {
                applied_steps.extend(result.applied_steps.iter().copied());
            }
            if outcome.status == ChunkStatus::Failed {
                failed_chunks += 1;
            }

            durations.push(elapsed);
            let average = durations.iter().sum::<Duration>() / durations.len() as u32;
            let remaining = (total - index - 1) as u32;
            let eta = average * remaining;

            log::info!(
                "Chunk {}/{} done in {:.1}s (ETA {:.0}s)",
                index + 1,
                total,
                elapsed.as_secs_f64(),
                eta.as_secs_f64()
            );

            on_progress(ProcessingProgress {
                index,
                total,
                text: outcome.text.clone(),
                status: outcome.status,
                retries: outcome.retries,
                last_duration: elapsed,
                average_duration: average,
                eta,
                usage,
            });

            texts.push(outcome.text);
        }

        Ok(ProcessingSummary {
            text: texts.join("\n\n"),
            chunk_count: total,
            failed_chunks,
            usage,
            applied_steps,
            log: log_lines,
        })
    }

    async fn process_with_retries(
        &self,
        index: usize,
        chunk: &str,
        config: &ProcessingConfig,
        log_lines: &mut Vec<String>,
    ) -> Result<ChunkOutcome> {
        let mut usage = TokenUsage::default();

        for attempt in 0..MAX_ATTEMPTS {
            match self.orchestrator.process_chunk(chunk, config).await {
                Ok(result) => {
                    usage += result.usage;
                    return Ok(ChunkOutcome {
                        text: result.text.clone(),
                        status: ChunkStatus::Success,
                        retries: attempt,
                        usage,
                        result: Some(result),
                    });
                }
                Err(err) if err.is_fatal() => return Err(err),
                Err(err) => {
                    usage += err.usage();
                    let line = format!("Chunk {}: {}: {}", index + 1, err.kind(), err);
                    log::warn!("{}", line);
                    log_lines.push(line);

                    let last_attempt = attempt + 1 == MAX_ATTEMPTS;
                    if matches!(err, PrepError::EmptyOutput { .. }) && !last_attempt {
                        tokio::time::sleep(self.retry_backoff).await;
                    }
                }
            }
        }

        let line = format!(
            "Chunk {}: falling back to original text after errors.",
            index + 1
        );
        log::warn!("{}", line);
        log_lines.push(line);

        Ok(ChunkOutcome {
            text: chunk.to_string(),
            status: ChunkStatus::Failed,
            retries: MAX_ATTEMPTS - 1,
            usage,
            result: None,
        })
    }

    /// Clean a whole document once, without generation.
    ///
    /// The result is a single chunk with zero usage.
    ///
    /// # Errors
    /// [`PrepError::EmptyInput`] when the text is blank.
    pub fn deterministic_clean(
        &self,
        text: &str,
        options: &CleaningOptions,
    ) -> Result<ProcessingSummary> {
        if text.trim().is_empty() {
            return Err(PrepError::EmptyInput);
        }

        let outcome = self.orchestrator.clean_phase(text, options, Phase::Pre);
        log::info!(
            "Deterministic clean applied {} step(s)",
            outcome.applied.len()
        );

        Ok(ProcessingSummary {
            text: outcome.text,
            chunk_count: 1,
            failed_chunks: 0,
            usage: TokenUsage::default(),
            applied_steps: outcome.applied,
            log: Vec::new(),
        })
    }
}
