//! Image analysis: classify, score and describe each reference image.
//!
//! Two strategies, selected by capability injection:
//!
//! * **Heuristic** — filename tokens give the content classification, the
//!   pixel aspect ratio gives the placement suggestion. Costs one header
//!   read per image and produces no relevance score.
//! * **Model-guided** — the image is base64-encoded and sent with the
//!   presentation context to a vision-capable backend, which returns a
//!   structured JSON analysis including a 1–10 relevance score.
//!
//! A failed vision call degrades that single image to its heuristic record
//! and logs the fault; an unreadable file is skipped with a fault. The batch
//! as a whole never aborts.
//!
//! Per-image calls are independent, so the batch runs them through
//! `buffer_unordered`. Completion order is irrelevant: the final
//! sort-by-relevance (stable, unscored records as 0) fully determines the
//! output order.

use crate::backend::{BackendCall, GenerationBackend, ResponseFormat};
use crate::config::GenerationConfig;
use crate::error::ImageFault;
use crate::outline::{ImageAnalysis, ImageKind, Placement};
use crate::pipeline::cleanup;
use crate::pipeline::sources::ImageSource;
use crate::prompts;
use base64::{engine::general_purpose::STANDARD, Engine as _};
use edgequake_llm::{ChatMessage, ImageData};
use futures::stream::{self, StreamExt};
use image::ImageFormat;
use serde::Deserialize;
use std::sync::Arc;
use tracing::{debug, info, warn};

/// Token budget for one vision analysis reply.
const VISION_MAX_TOKENS: usize = 1000;

/// Analyses sorted by relevance, plus the faults hit along the way.
#[derive(Default)]
pub struct AnalyzedBatch {
    pub analyses: Vec<ImageAnalysis>,
    pub faults: Vec<ImageFault>,
}

/// Analyse a batch of images against the presentation context.
pub async fn analyze_batch(
    sources: Vec<ImageSource>,
    context: &str,
    vision: Option<&Arc<dyn GenerationBackend>>,
    config: &GenerationConfig,
) -> AnalyzedBatch {
    let total = sources.len();
    let results: Vec<Result<(ImageAnalysis, Option<ImageFault>), ImageFault>> =
        stream::iter(sources.into_iter().map(|source| {
            let vision = vision.cloned();
            let context = context.to_string();
            let temperature = config.temperature;
            async move {
                let base = heuristic_analysis(&source)?;
                match vision {
                    Some(backend) => {
                        Ok(refine_with_vision(&backend, base, &context, temperature).await)
                    }
                    None => Ok((base, None)),
                }
            }
        }))
        .buffer_unordered(config.concurrency)
        .collect()
        .await;

    let mut batch = AnalyzedBatch::default();
    for result in results {
        match result {
            Ok((analysis, fault)) => {
                debug!("Analyzed image: {}", analysis.filename);
                batch.analyses.push(analysis);
                batch.faults.extend(fault);
            }
            Err(fault) => {
                warn!("{fault}");
                batch.faults.push(fault);
            }
        }
    }

    sort_by_relevance(&mut batch.analyses);
    info!(
        "Image analysis complete: {}/{} analysed, {} fault(s)",
        batch.analyses.len(),
        total,
        batch.faults.len()
    );
    batch
}

/// Heuristic analysis from the file header and name alone.
pub fn heuristic_analysis(source: &ImageSource) -> Result<ImageAnalysis, ImageFault> {
    let (width, height) =
        image::image_dimensions(&source.path).map_err(|e| ImageFault::Unreadable {
            path: source.path.clone(),
            detail: e.to_string(),
        })?;
    let file_size = std::fs::metadata(&source.path)
        .map(|m| m.len())
        .map_err(|e| ImageFault::Unreadable {
            path: source.path.clone(),
            detail: e.to_string(),
        })?;

    let filename = source
        .path
        .file_name()
        .map(|n| n.to_string_lossy().to_string())
        .unwrap_or_else(|| "unknown".to_string());
    let aspect_ratio = if height == 0 {
        1.0
    } else {
        width as f32 / height as f32
    };
    let kind = classify_filename(&filename);
    let placement = placement_for_aspect(aspect_ratio);

    Ok(ImageAnalysis {
        source: source.path.clone(),
        filename: filename.clone(),
        width,
        height,
        aspect_ratio,
        file_size,
        kind,
        relevance: None,
        placement,
        suggested_slot: None,
        title_suggestion: None,
        description: heuristic_description(&filename, kind),
        rationale: None,
        provenance: source.provenance.clone(),
    })
}

/// Content classification from filename tokens.
pub fn classify_filename(filename: &str) -> ImageKind {
    let name = filename.to_lowercase();
    let has = |keywords: &[&str]| keywords.iter().any(|k| name.contains(k));

    if has(&["chart", "graph", "plot", "data"]) {
        ImageKind::Chart
    } else if has(&["diagram", "flow", "process"]) {
        ImageKind::Diagram
    } else if has(&["logo", "brand", "icon"]) {
        ImageKind::Logo
    } else if has(&["photo", "picture", "image"]) {
        ImageKind::Photo
    } else if has(&["screen", "ui", "interface"]) {
        ImageKind::Screenshot
    } else {
        ImageKind::General
    }
}

/// Placement suggestion from the pixel aspect ratio.
pub fn placement_for_aspect(aspect_ratio: f32) -> Placement {
    if aspect_ratio > 1.5 {
        Placement::FullWidth
    } else if aspect_ratio < 0.75 {
        Placement::SidePanel
    } else {
        Placement::Centered
    }
}

fn heuristic_description(filename: &str, kind: ImageKind) -> String {
    match kind {
        ImageKind::Chart => {
            format!("Data chart ({filename}) - supports statistics or trend explanations")
        }
        ImageKind::Diagram => {
            format!("Diagram ({filename}) - suits process or architecture explanations")
        }
        ImageKind::Logo => {
            format!("Logo or brand mark ({filename}) - suits title or brand slides")
        }
        ImageKind::Photo => {
            format!("Photograph ({filename}) - adds visual interest or real examples")
        }
        ImageKind::Screenshot => {
            format!("Screenshot ({filename}) - demonstrates a product or system")
        }
        ImageKind::General => {
            format!("Reference image ({filename}) - usable wherever the content fits")
        }
    }
}

// ── Model-guided refinement ──────────────────────────────────────────────

/// What the vision backend is asked to return.
#[derive(Debug, Deserialize)]
struct VisionReply {
    #[serde(default)]
    description: Option<String>,
    #[serde(default)]
    image_kind: Option<String>,
    #[serde(default)]
    relevance_score: Option<f64>,
    #[serde(default)]
    suggested_slot: Option<String>,
    #[serde(default)]
    title_suggestion: Option<String>,
    #[serde(default)]
    rationale: Option<String>,
}

/// Refine one heuristic record through the vision backend.
///
/// Returns the refined record, or the unchanged heuristic record plus a
/// fault when the call or its parsing failed.
async fn refine_with_vision(
    backend: &Arc<dyn GenerationBackend>,
    base: ImageAnalysis,
    context: &str,
    temperature: f32,
) -> (ImageAnalysis, Option<ImageFault>) {
    let image_data = match encode_image(&base) {
        Ok(data) => data,
        Err(fault) => return (base, Some(fault)),
    };

    let call = BackendCall {
        messages: vec![
            ChatMessage::system(prompts::VISION_SYSTEM_PROMPT),
            ChatMessage::user_with_images(prompts::vision_user_text(context), vec![image_data]),
        ],
        temperature,
        max_tokens: VISION_MAX_TOKENS,
        format: ResponseFormat::JsonObject,
    };

    let reply = match backend.complete(call).await {
        Ok(reply) => reply,
        Err(e) => {
            warn!("Vision call failed for {}: {e}", base.filename);
            let fault = ImageFault::Analysis {
                path: base.source.clone(),
                detail: e.to_string(),
            };
            return (base, Some(fault));
        }
    };

    let parsed = cleanup::extract_json_object(&reply.content)
        .and_then(|json| serde_json::from_str::<VisionReply>(&json).ok());
    match parsed {
        Some(vision) => (merge_vision(base, vision), None),
        None => {
            warn!("Unparseable vision reply for {}", base.filename);
            let fault = ImageFault::Analysis {
                path: base.source.clone(),
                detail: "unparseable vision reply".into(),
            };
            (base, Some(fault))
        }
    }
}

fn merge_vision(mut base: ImageAnalysis, vision: VisionReply) -> ImageAnalysis {
    if let Some(description) = vision.description {
        base.description = description;
    }
    if let Some(kind) = vision.image_kind.as_deref().map(parse_kind) {
        base.kind = kind;
    }
    base.relevance = vision
        .relevance_score
        .map(|score| (score.round().clamp(1.0, 10.0)) as u8);
    base.suggested_slot = vision.suggested_slot;
    base.title_suggestion = vision.title_suggestion;
    base.rationale = vision.rationale;
    base
}

fn parse_kind(raw: &str) -> ImageKind {
    match raw.trim().to_lowercase().as_str() {
        "chart" | "chart_graph" | "graph" => ImageKind::Chart,
        "diagram" | "flowchart" => ImageKind::Diagram,
        "logo" | "logo_brand" | "brand" => ImageKind::Logo,
        "photo" | "photograph" | "picture" => ImageKind::Photo,
        "screenshot" | "screen" => ImageKind::Screenshot,
        _ => ImageKind::General,
    }
}

/// Base64-encode an image file for the vision API.
fn encode_image(analysis: &ImageAnalysis) -> Result<ImageData, ImageFault> {
    let bytes = std::fs::read(&analysis.source).map_err(|e| ImageFault::Unreadable {
        path: analysis.source.clone(),
        detail: e.to_string(),
    })?;

    let mime = match image::guess_format(&bytes) {
        Ok(ImageFormat::Png) => "image/png",
        Ok(ImageFormat::Jpeg) => "image/jpeg",
        Ok(ImageFormat::Gif) => "image/gif",
        Ok(ImageFormat::WebP) => "image/webp",
        Ok(ImageFormat::Bmp) => "image/bmp",
        _ => "image/png",
    };

    let b64 = STANDARD.encode(&bytes);
    debug!("Encoded {} → {} bytes base64", analysis.filename, b64.len());
    Ok(ImageData::new(b64, mime).with_detail("high"))
}

// ── Batch ordering ───────────────────────────────────────────────────────

/// Sort analyses by relevance descending.
///
/// Stable: unscored (heuristic) records sort as 0 and ties keep their input
/// order, so any permutation of the same inputs sorts identically up to
/// ties.
pub fn sort_by_relevance(analyses: &mut [ImageAnalysis]) {
    analyses.sort_by(|a, b| b.score_or_zero().cmp(&a.score_or_zero()));
}

/// The subset scoring at or above `threshold`, preserving order.
pub fn high_relevance(analyses: &[ImageAnalysis], threshold: u8) -> Vec<ImageAnalysis> {
    analyses
        .iter()
        .filter(|a| a.score_or_zero() >= threshold)
        .cloned()
        .collect()
}
