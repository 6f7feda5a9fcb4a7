//! narration-prep - Clean book text and label its speakers for TTS

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use indicatif::{ProgressBar, ProgressStyle};
use llm_client::{CancelSignal, Config as LlmConfig, GenerationClient, ModelSource};
use narration_prep::pipeline::{ChunkStatus, DocumentProcessor, ProcessingSummary};
use narration_prep::{
    LabelFormat, NarratorAttribution, ProcessingConfig, SpeakerConfig, SpeakerMode,
    parse_character_mapping,
};
use std::path::PathBuf;
use std::time::Duration;
use tokio::io::AsyncReadExt;

#[derive(Parser, Debug)]
#[command(name = "narration-prep")]
#[command(about = "Clean book text and label its speakers for text-to-speech", long_about = None)]
#[command(version)]
struct Args {
    /// Input text file (reads stdin when omitted or "-")
    input: Option<PathBuf>,

    /// Output file (writes stdout when omitted)
    #[arg(short, long)]
    output: Option<PathBuf>,

    /// Only run the deterministic cleaner, no generation
    #[arg(long)]
    deterministic: bool,

    /// Sentences per chunk
    #[arg(short, long)]
    batch_size: Option<usize>,

    /// Generation backend: hosted-api (api) or local-daemon (ollama)
    #[arg(long)]
    source: Option<ModelSource>,

    /// Model identifier for the selected backend
    #[arg(short, long)]
    model: Option<String>,

    /// Sampling temperature (clamped per backend)
    #[arg(short, long)]
    temperature: Option<f32>,

    /// Hosted API token for this run
    #[arg(long)]
    token: Option<String>,

    /// Speaker labelling: none, format or intelligent
    #[arg(long)]
    speakers: Option<SpeakerMode>,

    /// Label style: speaker-numbered (speaker) or bracket-numbered (bracket)
    #[arg(long)]
    label_format: Option<LabelFormat>,

    /// Expected number of speakers
    #[arg(long)]
    speaker_count: Option<u32>,

    /// Keep narration as Narrator: lines
    #[arg(long)]
    narrator: bool,

    /// Attribution handling in intelligent mode: remove, verbatim or contextual
    #[arg(long)]
    attribution: Option<NarratorAttribution>,

    /// File with `Name = SpeakerNumber` lines
    #[arg(long)]
    mapping: Option<PathBuf>,

    /// Character who narrates the book
    #[arg(long)]
    narrator_name: Option<String>,

    /// Label speakers in the same call that cleans the text
    #[arg(long)]
    single_pass: bool,

    /// Add worked examples to the speaker prompt
    #[arg(long)]
    extended_examples: bool,

    /// Extra instructions appended to every prompt
    #[arg(long)]
    instructions: Option<String>,

    /// Skip the deterministic pre-clean before generation
    #[arg(long)]
    skip_pre_clean: bool,

    /// Keep smart quotes and dashes
    #[arg(long)]
    no_smart_quotes: bool,

    /// Skip OCR repair (camel case and merged words)
    #[arg(long)]
    no_ocr: bool,

    /// Ask the model to fix spelling
    #[arg(long)]
    spelling: bool,

    /// Keep URLs
    #[arg(long)]
    no_urls: bool,

    /// Keep footnote markers
    #[arg(long)]
    no_footnotes: bool,

    /// Don't ask the model to punctuate headings
    #[arg(long)]
    no_punctuation: bool,

    /// Rejoin words hyphenated across line breaks
    #[arg(long)]
    hyphenation: bool,

    /// Seconds before a single generation call is abandoned
    #[arg(long)]
    timeout: Option<u64>,

    /// Print the summary as JSON instead of plain text
    #[arg(long)]
    json: bool,

    /// Enable debug output
    #[arg(short, long, default_value_t = false)]
    debug: bool,

    /// Subcommands
    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Configuration management
    Config {
        #[command(subcommand)]
        action: ConfigAction,
    },
}

#[derive(Subcommand, Debug)]
enum ConfigAction {
    /// Show current configuration
    Show,
    /// Store the hosted API token (empty clears it)
    SetToken {
        /// Token value
        token: String,
    },
    /// Set the default model for a backend
    SetModel {
        /// Model identifier
        model: String,
        /// Backend the model belongs to (defaults to the configured one)
        #[arg(long)]
        source: Option<ModelSource>,
    },
    /// Set the default number of sentences per chunk
    SetBatchSize {
        /// Value (at least 1)
        value: usize,
    },
    /// Set the default temperature
    SetTemperature {
        /// Value (0.0-2.0, clamped per backend at call time)
        value: f32,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    let default_filter = if args.debug { "debug" } else { "warn" };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(default_filter))
        .init();

    if let Some(Commands::Config { action }) = &args.command {
        return handle_config_command(action);
    }

    let config = build_processing_config(&args)?;
    let input = read_input(args.input.as_ref()).await?;

    if args.debug {
        eprintln!("Input: {} chars", input.len());
        eprintln!("Source: {}", config.model_source);
        eprintln!("Model: {}", config.active_model());
        eprintln!("Batch size: {}", config.batch_size);
        eprintln!("Temperature: {}", config.temperature);
    }

    let summary = if args.deterministic {
        let client = GenerationClient::new(LlmConfig::default());
        DocumentProcessor::new(&client).deterministic_clean(&input, &config.cleaning)?
    } else {
        run_generation(&args, &input, &config).await?
    };

    write_output(args.output.as_ref(), &summary.text).await?;
    print_summary(&summary, args.json)?;

    Ok(())
}

/// Merge the stored defaults with command-line overrides.
fn build_processing_config(args: &Args) -> Result<ProcessingConfig> {
    let mut config = ProcessingConfig::load().context("Failed to load configuration")?;

    if let Some(batch_size) = args.batch_size {
        config.batch_size = batch_size;
    }
    if let Some(source) = args.source {
        config.model_source = source;
    }
    if let Some(model) = &args.model {
        config.set_active_model(model);
    }
    if let Some(temperature) = args.temperature {
        config.temperature = temperature;
    }
    if args.single_pass {
        config.single_pass = true;
    }
    if args.extended_examples {
        config.extended_examples = true;
    }
    if args.skip_pre_clean {
        config.llm_cleaning_disabled = true;
    }
    if let Some(instructions) = &args.instructions {
        config.custom_instructions = Some(instructions.clone());
    }

    let cleaning = &mut config.cleaning;
    if args.no_smart_quotes {
        cleaning.replace_smart_quotes = false;
    }
    if args.no_ocr {
        cleaning.fix_ocr_errors = false;
    }
    if args.spelling {
        cleaning.correct_spelling = true;
    }
    if args.no_urls {
        cleaning.remove_urls = false;
    }
    if args.no_footnotes {
        cleaning.remove_footnotes = false;
    }
    if args.no_punctuation {
        cleaning.add_punctuation = false;
    }
    if args.hyphenation {
        cleaning.fix_hyphenation = true;
    }

    apply_speaker_args(args, &mut config)?;
    Ok(config)
}

fn apply_speaker_args(args: &Args, config: &mut ProcessingConfig) -> Result<()> {
    let touched = args.speakers.is_some()
        || args.label_format.is_some()
        || args.speaker_count.is_some()
        || args.narrator
        || args.attribution.is_some()
        || args.mapping.is_some()
        || args.narrator_name.is_some();
    if !touched {
        return Ok(());
    }

    let speaker = config.speaker.get_or_insert_with(SpeakerConfig::default);
    if let Some(mode) = args.speakers {
        speaker.mode = mode;
    }
    if let Some(format) = args.label_format {
        speaker.label_format = format;
    }
    if let Some(count) = args.speaker_count {
        speaker.speaker_count = count;
    }
    if args.narrator {
        speaker.include_narrator = true;
    }
    if let Some(attribution) = args.attribution {
        speaker.narrator_attribution = attribution;
    }
    if let Some(name) = &args.narrator_name {
        speaker.narrator_character_name = Some(name.clone());
    }
    if let Some(path) = &args.mapping {
        let raw = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read character mapping {}", path.display()))?;
        speaker.character_mapping = parse_character_mapping(&raw)?;
    }

    Ok(())
}

async fn run_generation(
    args: &Args,
    input: &str,
    config: &ProcessingConfig,
) -> Result<ProcessingSummary> {
    let llm_config = LlmConfig::load().context("Failed to load backend configuration")?;
    let cancel = CancelSignal::new();
    let mut client = GenerationClient::new(llm_config).with_cancel_signal(cancel.clone());
    if let Some(seconds) = args.timeout {
        client = client.with_timeout(Duration::from_secs(seconds.max(1)));
    }
    if let Some(token) = &args.token {
        client.tokens().set(token);
    }

    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            eprintln!("\nInterrupted, cancelling in-flight generation...");
            cancel.cancel();
        }
    });

    let pb = ProgressBar::new(0);
    pb.set_style(
        ProgressStyle::default_bar()
            .template("{spinner:.green} [{bar:40.cyan/blue}] {pos}/{len} ({eta}) {msg}")
            .context("Invalid progress template")?
            .progress_chars("#>-"),
    );

    let processor = DocumentProcessor::new(&client);
    let summary = processor
        .process_document_with_progress(input, config, |progress| {
            pb.set_length(progress.total as u64);
            pb.set_position(progress.index as u64 + 1);
            let marker = match progress.status {
                ChunkStatus::Success => "",
                ChunkStatus::Failed => " (fallback)",
            };
            pb.set_message(format!(
                "{} tokens, {:.1}s/chunk{}",
                progress.usage.input_tokens + progress.usage.output_tokens,
                progress.average_duration.as_secs_f64(),
                marker
            ));
        })
        .await;

    match summary {
        Ok(summary) => {
            pb.finish_with_message("Processing complete!");
            Ok(summary)
        }
        Err(e) => {
            pb.abandon();
            Err(e).context("Processing failed")
        }
    }
}

async fn read_input(path: Option<&PathBuf>) -> Result<String> {
    match path {
        Some(path) if path.as_os_str() != "-" => tokio::fs::read_to_string(path)
            .await
            .with_context(|| format!("Failed to read {}", path.display())),
        _ => {
            let mut input = String::new();
            tokio::io::stdin()
                .read_to_string(&mut input)
                .await
                .context("Failed to read stdin")?;
            Ok(input)
        }
    }
}

async fn write_output(path: Option<&PathBuf>, text: &str) -> Result<()> {
    match path {
        Some(path) => {
            tokio::fs::write(path, format!("{}\n", text))
                .await
                .with_context(|| format!("Failed to write {}", path.display()))?;
            eprintln!("Output: {}", path.display());
        }
        None => println!("{}", text),
    }
    Ok(())
}

fn print_summary(summary: &ProcessingSummary, json: bool) -> Result<()> {
    if json {
        eprintln!("{}", serde_json::to_string_pretty(summary)?);
        return Ok(());
    }

    eprintln!(
        "\nChunks: {}, Fallbacks: {}",
        summary.chunk_count, summary.failed_chunks
    );
    eprintln!(
        "Tokens: {} in / {} out (cost {:.4})",
        summary.usage.input_tokens,
        summary.usage.output_tokens,
        summary.usage.total_cost()
    );
    if !summary.applied_steps.is_empty() {
        let steps: Vec<&str> = summary.applied_steps.iter().map(|s| s.as_str()).collect();
        eprintln!("Steps: {}", steps.join(", "));
    }
    for line in &summary.log {
        eprintln!("  {}", line);
    }
    Ok(())
}

fn handle_config_command(action: &ConfigAction) -> Result<()> {
    match action {
        ConfigAction::Show => {
            let config = ProcessingConfig::load()?;
            let llm = LlmConfig::load()?;
            println!("Configuration file: {:?}", ProcessingConfig::config_path()?);
            println!("Backend file: {:?}", LlmConfig::config_path()?);
            println!();
            println!("batch_size = {}", config.batch_size);
            println!("model_source = \"{}\"", config.model_source);
            println!("hosted_model = \"{}\"", config.hosted_model);
            println!("local_model = \"{}\"", config.local_model);
            println!("temperature = {}", config.temperature);
            println!("single_pass = {}", config.single_pass);
            match config.active_speaker() {
                Some(speaker) => println!(
                    "speaker = {} ({}, {} speakers)",
                    speaker.mode, speaker.label_format, speaker.speaker_count
                ),
                None => println!("speaker = (off)"),
            }
            let token = if llm.hosted.api_token.is_some() {
                "(stored)"
            } else {
                "(none)"
            };
            println!("api_token = {}", token);
            println!("timeout_secs = {}", llm.timeout_secs);
        }
        ConfigAction::SetToken { token } => {
            let mut llm = LlmConfig::load()?;
            llm.set_api_token(token);
            llm.save()?;
            if llm.hosted.api_token.is_some() {
                println!("API token stored in {:?}", LlmConfig::config_path()?);
            } else {
                println!("API token cleared");
            }
        }
        ConfigAction::SetModel { model, source } => {
            let mut config = ProcessingConfig::load()?;
            if let Some(source) = source {
                config.model_source = *source;
            }
            config.set_active_model(model);
            config.save()?;
            println!(
                "Default model for {} set to: {}",
                config.model_source,
                config.active_model()
            );
        }
        ConfigAction::SetBatchSize { value } => {
            let mut config = ProcessingConfig::load()?;
            config.batch_size = (*value).max(1);
            config.save()?;
            println!("Default batch size set to: {}", config.batch_size);
        }
        ConfigAction::SetTemperature { value } => {
            let mut config = ProcessingConfig::load()?;
            config.temperature = value.clamp(0.0, 2.0);
            config.save()?;
            println!("Default temperature set to: {}", config.temperature);
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[tokio::test]
    async fn test_read_input_from_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(file, "It was a dark night.").unwrap();

        let path = file.path().to_path_buf();
        let input = read_input(Some(&path)).await.unwrap();
        assert_eq!(input, "It was a dark night.");
    }

    #[tokio::test]
    async fn test_read_input_missing_file_names_path() {
        let path = PathBuf::from("/nonexistent/book.txt");
        let err = read_input(Some(&path)).await.unwrap_err();
        assert!(err.to_string().contains("/nonexistent/book.txt"));
    }

    #[test]
    fn test_speaker_flags_build_speaker_config() {
        let mut mapping = tempfile::NamedTempFile::new().unwrap();
        writeln!(mapping, "Alice = 1\nBob = 2").unwrap();
        let mapping_path = mapping.path().to_str().unwrap().to_string();

        let args = Args::try_parse_from([
            "narration-prep",
            "book.txt",
            "--speakers",
            "intelligent",
            "--label-format",
            "bracket",
            "--narrator",
            "--mapping",
            &mapping_path,
        ])
        .unwrap();

        let mut config = ProcessingConfig::default();
        apply_speaker_args(&args, &mut config).unwrap();

        let speaker = config.speaker.unwrap();
        assert_eq!(speaker.mode, SpeakerMode::Intelligent);
        assert_eq!(speaker.label_format, LabelFormat::BracketNumbered);
        assert!(speaker.include_narrator);
        assert_eq!(speaker.character_mapping.len(), 2);
        assert_eq!(speaker.character_mapping[1].name, "Bob");
    }

    #[test]
    fn test_no_speaker_flags_leave_config_alone() {
        let args = Args::try_parse_from(["narration-prep", "-"]).unwrap();
        let mut config = ProcessingConfig::default();
        apply_speaker_args(&args, &mut config).unwrap();
        assert!(config.speaker.is_none());
    }

    #[test]
    fn test_bad_source_is_rejected() {
        assert!(Args::try_parse_from(["narration-prep", "--source", "cloud"]).is_err());
    }
}
