//! narration-prep: clean book text and label its speakers for TTS.
//!
//! Text is cleaned deterministically, split into sentence batches and sent
//! through a generation backend for repair and optional speaker labelling.

pub mod config;
pub mod error;
pub mod pipeline;
pub mod prompt;
pub mod speaker;
pub mod text;

pub use config::ProcessingConfig;
pub use error::{PrepError, Result};
pub use pipeline::{
    ChunkOrchestrator, ChunkStatus, DocumentProcessor, ProcessChunkResult, ProcessingProgress,
    ProcessingSummary,
};
pub use speaker::{
    CharacterMapping, LabelFormat, NarratorAttribution, SpeakerConfig, SpeakerMode,
    parse_character_mapping,
};
pub use text::{AppliedStep, CleaningOptions, Lexicon, Phase};
