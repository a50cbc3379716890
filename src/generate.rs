//! Eager generation entry points and run orchestration.
//!
//! [`generate`] wires the stages together: resolve the backend, run the
//! image-intelligence sub-pipeline when the request carries imagery, render
//! the prompt, run the fallback ladder and enforce the exact-count
//! invariant. It returns `Err` only for fatal pre-generation problems; once
//! the ladder starts, the caller is guaranteed a structurally valid outline
//! of exactly the requested slide count, degraded content being the
//! documented worst case.

use crate::backend::{GenerationBackend, LlmBackend};
use crate::config::{GenerationConfig, MappingStrategy};
use crate::error::OutlineError;
use crate::outline::{GenerationOutput, GenerationStats, ImageReport};
use crate::pipeline::{analyze, extract, ladder, map, sources};
use crate::prompts;
use crate::request::GenerationRequest;
use crate::schema::OutlineSchema;
use std::path::Path;
use std::sync::Arc;
use std::time::Instant;
use tempfile::TempDir;
use tracing::{debug, info};

/// Model used when the caller names a provider but no model.
const DEFAULT_MODEL: &str = "gpt-4.1-mini";

/// Generate a presentation outline.
///
/// This is the primary entry point for the library.
///
/// # Returns
/// `Ok(GenerationOutput)` with exactly `request.n_slides` slides — even
/// under total backend failure, where the synthetic fallback fills in
/// templated content. Check `output.stats.rung` to see which strategy
/// satisfied the request.
///
/// # Errors
/// Returns `Err(OutlineError)` only for fatal errors raised before
/// generation: an invalid request, or no provider configured.
pub async fn generate(
    request: &GenerationRequest,
    config: &GenerationConfig,
) -> Result<GenerationOutput, OutlineError> {
    let total_start = Instant::now();

    // The builder enforces this, but requests can be constructed literally.
    if request.n_slides == 0 {
        return Err(OutlineError::InvalidRequest(
            "slide count must be at least 1".into(),
        ));
    }

    info!(
        "Starting outline generation: '{}' ({} slides, {})",
        request.topic, request.n_slides, request.language
    );

    // ── Step 1: Resolve the backend ──────────────────────────────────────
    let backend = resolve_backend(config)?;

    // ── Step 2: Image intelligence (optional) ────────────────────────────
    let analysis_start = Instant::now();
    let intelligence = run_image_intelligence(request, config, &backend).await?;
    let analysis_duration_ms = analysis_start.elapsed().as_millis() as u64;

    // ── Step 3: Build the structural contract and the prompt ─────────────
    let schema = OutlineSchema::for_slide_count(request.n_slides, config.schema_profile);
    let augmentation = intelligence
        .as_ref()
        .and_then(|i| i.augmentation.as_deref());
    let user_message = prompts::outline_user_message(
        &request.topic,
        &request.language,
        request.n_slides,
        request.supplementary.as_deref(),
        augmentation,
    );

    // ── Step 4: Run the fallback ladder ──────────────────────────────────
    let generation_start = Instant::now();
    let outcome = ladder::run(&backend, &schema, &request.topic, &user_message, config).await;
    let generation_duration_ms = generation_start.elapsed().as_millis() as u64;

    // ── Step 5: Enforce the exact-count invariant ────────────────────────
    let mut outline = outcome.outline;
    ladder::truncate_to(&mut outline, request.n_slides);

    let images = intelligence.map(|i| i.report);
    let stats = GenerationStats {
        rung: outcome.rung,
        total_duration_ms: total_start.elapsed().as_millis() as u64,
        analysis_duration_ms,
        generation_duration_ms,
        input_tokens: outcome.input_tokens,
        output_tokens: outcome.output_tokens,
        images_analyzed: images.as_ref().map_or(0, |r| r.analyses.len()),
    };

    info!(
        "Outline complete via {} rung: {} slides, {}ms total",
        stats.rung,
        outline.slides.len(),
        stats.total_duration_ms
    );

    Ok(GenerationOutput {
        outline,
        stats,
        images,
    })
}

/// Generate an outline and write it to a file as pretty-printed JSON.
///
/// Uses atomic write (temp file + rename) to prevent partial files.
pub async fn generate_to_file(
    request: &GenerationRequest,
    output_path: impl AsRef<Path>,
    config: &GenerationConfig,
) -> Result<GenerationStats, OutlineError> {
    let output = generate(request, config).await?;
    let path = output_path.as_ref();

    let json = serde_json::to_string_pretty(&output.outline)
        .map_err(|e| OutlineError::Internal(format!("serialise outline: {e}")))?;

    if let Some(parent) = path.parent() {
        tokio::fs::create_dir_all(parent)
            .await
            .map_err(|e| OutlineError::OutputWriteFailed {
                path: path.to_path_buf(),
                source: e,
            })?;
    }

    let tmp_path = path.with_extension("json.tmp");
    tokio::fs::write(&tmp_path, &json)
        .await
        .map_err(|e| OutlineError::OutputWriteFailed {
            path: path.to_path_buf(),
            source: e,
        })?;
    tokio::fs::rename(&tmp_path, path)
        .await
        .map_err(|e| OutlineError::OutputWriteFailed {
            path: path.to_path_buf(),
            source: e,
        })?;

    Ok(output.stats)
}

/// Synchronous wrapper around [`generate`].
///
/// Creates a temporary tokio runtime internally.
pub fn generate_sync(
    request: &GenerationRequest,
    config: &GenerationConfig,
) -> Result<GenerationOutput, OutlineError> {
    tokio::runtime::Runtime::new()
        .map_err(|e| OutlineError::Internal(format!("Failed to create tokio runtime: {e}")))?
        .block_on(generate(request, config))
}

// ── Backend resolution ───────────────────────────────────────────────────

/// Resolve the generation backend, from most-specific to least-specific.
///
/// The four-level fallback chain lets library users and CLI users each set
/// exactly as much or as little as they need:
///
/// 1. **Pre-built backend** (`config.backend`) — the caller constructed and
///    configured it entirely; used as-is. The route tests take.
///
/// 2. **Named provider + model** (`config.provider_name`) — instantiated via
///    the provider factory, which reads the matching API key from the
///    environment.
///
/// 3. **Environment pair** (`PROMPT2DECK_PROVIDER` + `PROMPT2DECK_MODEL`) —
///    both set means the execution environment (Makefile, CI) chose;
///    honoured before auto-detection so the choice wins even when multiple
///    API keys are present.
///
/// 4. **Auto-detection** — scan the known API-key variables and take the
///    first configured provider, preferring OpenAI.
fn resolve_backend(config: &GenerationConfig) -> Result<Arc<dyn GenerationBackend>, OutlineError> {
    if let Some(ref backend) = config.backend {
        return Ok(Arc::clone(backend));
    }

    let model = config.model.as_deref().unwrap_or(DEFAULT_MODEL);

    if let Some(ref name) = config.provider_name {
        return Ok(Arc::new(LlmBackend::from_factory(name, model)?));
    }

    if let (Ok(provider), Ok(env_model)) = (
        std::env::var("PROMPT2DECK_PROVIDER"),
        std::env::var("PROMPT2DECK_MODEL"),
    ) {
        if !provider.is_empty() && !env_model.is_empty() {
            return Ok(Arc::new(LlmBackend::from_factory(&provider, &env_model)?));
        }
    }

    // Prefer OpenAI when its key is present, so users with multiple provider
    // keys get the structured-output tier unless they ask otherwise.
    let key_is_set = |var: &str| std::env::var(var).map(|v| !v.is_empty()).unwrap_or(false);
    for (var, provider) in [
        ("OPENAI_API_KEY", "openai"),
        ("ANTHROPIC_API_KEY", "anthropic"),
        ("GEMINI_API_KEY", "gemini"),
        ("GOOGLE_API_KEY", "gemini"),
        ("MISTRAL_API_KEY", "mistral"),
        ("OPENROUTER_API_KEY", "openrouter"),
    ] {
        if key_is_set(var) {
            return Ok(Arc::new(LlmBackend::from_factory(provider, model)?));
        }
    }

    Err(OutlineError::ProviderNotConfigured {
        provider: "auto".to_string(),
        hint: "No LLM provider could be auto-detected from the environment.\n\
               Set OPENAI_API_KEY, ANTHROPIC_API_KEY, or configure a provider."
            .to_string(),
    })
}

// ── Image intelligence ───────────────────────────────────────────────────

struct ImageIntelligence {
    report: ImageReport,
    augmentation: Option<String>,
}

/// Run the image-intelligence sub-pipeline when the request carries imagery.
///
/// Returns `None` for requests without images or documents. Individual
/// input failures become faults inside the report; only scratch-space
/// exhaustion is fatal.
async fn run_image_intelligence(
    request: &GenerationRequest,
    config: &GenerationConfig,
    backend: &Arc<dyn GenerationBackend>,
) -> Result<Option<ImageIntelligence>, OutlineError> {
    if request.images.is_empty() && request.documents.is_empty() {
        return Ok(None);
    }

    // Scratch space for extracted imagery; lives until analysis is done.
    let scratch = TempDir::new()
        .map_err(|e| OutlineError::Internal(format!("cannot create scratch dir: {e}")))?;

    let resolved =
        sources::resolve_image_refs(&request.images, config.download_timeout_secs).await;
    let extracted = extract::extract_from_documents(
        &request.documents,
        scratch.path(),
        config.max_document_pages,
    )
    .await;

    let mut all_sources = resolved.sources.clone();
    all_sources.extend(extracted.sources);
    let mut faults = resolved.faults.clone();
    faults.extend(extracted.faults);

    debug!(
        "Image intelligence: {} candidate(s), {} fault(s) so far",
        all_sources.len(),
        faults.len()
    );

    let context = match request.supplementary.as_deref() {
        Some(supplementary) => format!("{}\n\n{supplementary}", request.topic),
        None => request.topic.clone(),
    };

    let batch =
        analyze::analyze_batch(all_sources, &context, config.vision.as_ref(), config).await;
    faults.extend(batch.faults);
    let analyses = batch.analyses;

    // Outline titles do not exist yet; the mapper sees placeholders, the
    // same ones the generated outline will be numbered by.
    let slide_titles: Vec<String> = (1..=request.n_slides).map(|i| format!("Slide {i}")).collect();
    let scored = analyses.iter().any(|a| a.relevance.is_some());
    let use_relevance = match config.mapping {
        MappingStrategy::Even => false,
        MappingStrategy::Relevance => true,
        MappingStrategy::Auto => scored,
    };
    let mapping = if analyses.is_empty() {
        Default::default()
    } else if use_relevance {
        map::map_by_relevance(backend, &analyses, &slide_titles, config).await
    } else {
        map::distribute_evenly(&analyses, request.n_slides)
    };

    let high_relevance = analyze::high_relevance(&analyses, config.relevance_threshold);
    let augmentation = prompts::render_image_context(
        &analyses,
        &high_relevance,
        &mapping,
        config.relevance_threshold,
    );

    Ok(Some(ImageIntelligence {
        report: ImageReport {
            analyses,
            mapping,
            high_relevance,
            faults,
        },
        augmentation,
    }))
}
