//! One chunk through pre-clean, one or two generations, post-clean and validation.

use llm_client::{Generation, GenerationRequest, TextGenerator};
use std::sync::Arc;
use std::time::Instant;

use super::{ProcessChunkResult, validate};
use crate::config::ProcessingConfig;
use crate::error::{PrepError, Result};
use crate::prompt::{build_cleaning_prompt, build_speaker_prompt};
use crate::text::{
    AppliedStep, CleaningOptions, CleaningOutcome, Lexicon, Phase, clean, clean_with_lexicon,
};

/// Runs a single chunk against a [`TextGenerator`].
///
/// Holds no per-chunk state, so one orchestrator serves a whole document.
pub struct ChunkOrchestrator<'a> {
    generator: &'a dyn TextGenerator,
    /// Explicit lexicon; the process-wide one is used when absent
    lexicon: Option<Arc<Lexicon>>,
}

impl<'a> ChunkOrchestrator<'a> {
    pub fn new(generator: &'a dyn TextGenerator) -> Self {
        Self {
            generator,
            lexicon: None,
        }
    }

    /// Use this lexicon for OCR repair instead of the shared one.
    pub fn with_lexicon(mut self, lexicon: Arc<Lexicon>) -> Self {
        self.lexicon = Some(lexicon);
        self
    }

    /// Fail early when the configured backend cannot be used.
    pub fn check_ready(&self, config: &ProcessingConfig) -> Result<()> {
        Ok(self.generator.check_ready(config.model_source)?)
    }

    pub(crate) fn clean_phase(
        &self,
        text: &str,
        options: &CleaningOptions,
        phase: Phase,
    ) -> CleaningOutcome {
        match &self.lexicon {
            Some(lexicon) => clean_with_lexicon(text, options, phase, lexicon),
            None => clean(text, options, phase),
        }
    }

    /// Process one chunk.
    ///
    /// # Errors
    /// - [`PrepError::Configuration`] when the backend cannot be used at all
    /// - [`PrepError::Generation`] when a generation call fails
    /// - [`PrepError::EmptyOutput`] when the final text is blank; carries the
    ///   usage already spent
    pub async fn process_chunk(
        &self,
        chunk: &str,
        config: &ProcessingConfig,
    ) -> Result<ProcessChunkResult> {
        self.check_ready(config)?;

        let options = &config.cleaning;
        let custom = config.custom_instructions.as_deref();
        let speaker = config.active_speaker();
        let mut applied = Vec::new();

        let mut text = chunk.to_string();
        if !config.llm_cleaning_disabled {
            let pre = self.clean_phase(&text, options, Phase::Pre);
            text = pre.text;
            applied.extend(pre.applied);
        }

        let (prompt, first_step) = match speaker {
            Some(speaker) if config.single_pass => (
                build_speaker_prompt(&text, speaker, custom, config.extended_examples),
                AppliedStep::LlmSpeakerSinglePass,
            ),
            _ => (
                build_cleaning_prompt(&text, options, custom),
                AppliedStep::LlmCleaning,
            ),
        };

        let first = self.generate(prompt, config).await?;
        let mut usage = first.usage;
        let mut generated = first.text;
        applied.push(first_step);

        if let Some(speaker) = speaker.filter(|_| !config.single_pass) {
            let prompt = build_speaker_prompt(&generated, speaker, custom, config.extended_examples);
            let second = self.generate(prompt, config).await?;
            usage += second.usage;
            generated = second.text;
            applied.push(AppliedStep::LlmSpeakerFormatting);
        }

        let post = self.clean_phase(&generated, options, Phase::Post);
        applied.extend(post.applied);

        if !validate(chunk, &post.text) {
            return Err(PrepError::EmptyOutput { usage });
        }

        Ok(ProcessChunkResult {
            text: post.text.trim().to_string(),
            usage,
            applied_steps: applied,
        })
    }

    async fn generate(&self, prompt: String, config: &ProcessingConfig) -> Result<Generation> {
        log::debug!("Prompt ({} chars):\n{}", prompt.len(), prompt);

        let request = GenerationRequest {
            prompt,
            source: config.model_source,
            model: config.active_model().to_string(),
            temperature: config.temperature,
        };

        let start = Instant::now();
        let generation = self.generator.generate(request).await?;
        log::debug!(
            "Generated {} chars in {:.2}s ({} in / {} out tokens)",
            generation.text.len(),
            start.elapsed().as_secs_f64(),
            generation.usage.input_tokens,
            generation.usage.output_tokens
        );
        Ok(generation)
    }
}
