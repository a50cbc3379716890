//! CLI binary for prompt2deck.
//!
//! A thin shim over the library crate that maps CLI flags to
//! `GenerationRequest` / `GenerationConfig` and prints results.

use anyhow::{Context, Result};
use clap::Parser;
use prompt2deck::{
    generate, generate_to_file, GenerationConfig, GenerationRequest, LlmBackend, MappingStrategy,
    SchemaProfile,
};
use std::path::PathBuf;
use std::sync::Arc;
use tracing_subscriber::EnvFilter;

// ── ANSI colour helpers (no extra deps) ──────────────────────────────────────

fn green(s: &str) -> String {
    format!("\x1b[32m{s}\x1b[0m")
}
fn dim(s: &str) -> String {
    format!("\x1b[2m{s}\x1b[0m")
}
fn bold(s: &str) -> String {
    format!("\x1b[1m{s}\x1b[0m")
}
fn cyan(s: &str) -> String {
    format!("\x1b[36m{s}\x1b[0m")
}

/// Generate a presentation outline from a topic, reference images and
/// source documents.
#[derive(Parser, Debug)]
#[command(name = "prompt2deck", version, about)]
struct Cli {
    /// Presentation topic or prompt.
    topic: String,

    /// Number of slides to generate.
    #[arg(short = 'n', long, default_value_t = 5)]
    slides: usize,

    /// Output language.
    #[arg(short, long, default_value = "English")]
    language: String,

    /// Additional free-text content (summaries, constraints, data).
    #[arg(long)]
    content: Option<String>,

    /// Reference image: local path or http(s) URL. Repeatable.
    #[arg(long = "image")]
    images: Vec<String>,

    /// Source document (PDF or DOCX) to mine for imagery. Repeatable.
    #[arg(long = "document")]
    documents: Vec<PathBuf>,

    /// LLM provider name (e.g. openai, anthropic, ollama).
    #[arg(long, env = "PROMPT2DECK_PROVIDER")]
    provider: Option<String>,

    /// Model identifier (e.g. gpt-4.1-mini).
    #[arg(long, env = "PROMPT2DECK_MODEL")]
    model: Option<String>,

    /// Provider used for vision image analysis. Without this, images are
    /// analysed heuristically (filename + aspect ratio).
    #[arg(long)]
    vision_provider: Option<String>,

    /// Model for vision analysis; defaults to --model.
    #[arg(long)]
    vision_model: Option<String>,

    /// Slide-image mapping strategy.
    #[arg(long, value_enum, default_value = "auto")]
    mapping: MappingArg,

    /// Relax the schema field bounds (accept any non-empty strings).
    #[arg(long)]
    minimal_schema: bool,

    /// Print the outline as JSON instead of the readable digest.
    #[arg(long)]
    json: bool,

    /// Write the outline JSON to this file (atomic write).
    #[arg(short, long)]
    output: Option<PathBuf>,

    /// Increase log verbosity (-v info, -vv debug).
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,
}

#[derive(clap::ValueEnum, Clone, Copy, Debug)]
enum MappingArg {
    Auto,
    Even,
    Relevance,
}

impl From<MappingArg> for MappingStrategy {
    fn from(arg: MappingArg) -> Self {
        match arg {
            MappingArg::Auto => MappingStrategy::Auto,
            MappingArg::Even => MappingStrategy::Even,
            MappingArg::Relevance => MappingStrategy::Relevance,
        }
    }
}

fn init_logging(verbose: u8) {
    let default_filter = match verbose {
        0 => "warn",
        1 => "prompt2deck=info",
        _ => "prompt2deck=debug",
    };
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(default_filter));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

fn build_config(cli: &Cli) -> Result<GenerationConfig> {
    let mut builder = GenerationConfig::builder().mapping(cli.mapping.into());

    if let Some(ref provider) = cli.provider {
        builder = builder.provider_name(provider.clone());
    }
    if let Some(ref model) = cli.model {
        builder = builder.model(model.clone());
    }
    if cli.minimal_schema {
        builder = builder.schema_profile(SchemaProfile::Minimal);
    }
    if let Some(ref vision_provider) = cli.vision_provider {
        let vision_model = cli
            .vision_model
            .as_deref()
            .or(cli.model.as_deref())
            .unwrap_or("gpt-4.1-mini");
        let vision = LlmBackend::from_factory(vision_provider, vision_model)
            .with_context(|| format!("configuring vision provider '{vision_provider}'"))?;
        builder = builder.vision(Arc::new(vision));
    }

    builder.build().context("invalid configuration")
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    let request = GenerationRequest::builder(&cli.topic)
        .slides(cli.slides)
        .language(&cli.language)
        .images(cli.images.clone())
        .documents(cli.documents.clone())
        .build()
        .context("invalid request")?;
    let request = match &cli.content {
        Some(content) => {
            let mut r = request;
            r.supplementary = Some(content.clone());
            r
        }
        None => request,
    };

    let config = build_config(&cli)?;

    if let Some(ref output_path) = cli.output {
        let stats = generate_to_file(&request, output_path, &config)
            .await
            .context("outline generation failed")?;
        eprintln!(
            "{} Wrote {} ({} rung, {}ms)",
            green("✔"),
            bold(&output_path.display().to_string()),
            stats.rung,
            stats.total_duration_ms
        );
        return Ok(());
    }

    let output = generate(&request, &config)
        .await
        .context("outline generation failed")?;

    if cli.json {
        println!("{}", serde_json::to_string_pretty(&output.outline)?);
    } else {
        println!("{}", output.outline.to_summary_string());
    }

    let stats = &output.stats;
    eprintln!(
        "{} {} slides via {} rung  {}",
        green("✔"),
        bold(&output.outline.slides.len().to_string()),
        cyan(&stats.rung.to_string()),
        dim(&format!(
            "{}ms total, {} in / {} out tokens",
            stats.total_duration_ms, stats.input_tokens, stats.output_tokens
        ))
    );
    if let Some(ref images) = output.images {
        eprintln!(
            "{} {} image(s) analysed, {} high-relevance, {} fault(s)",
            cyan("◆"),
            images.analyses.len(),
            images.high_relevance.len(),
            images.faults.len()
        );
    }

    Ok(())
}
