//! Slide-image mapping: assign analyzed images to slide indices.
//!
//! Two strategies:
//!
//! * [`distribute_evenly`] — deterministic round-robin; the remainder goes
//!   to the earliest slides. Used whenever relevance guidance is not
//!   requested or not possible.
//! * [`map_by_relevance`] — ask a backend to propose an assignment from the
//!   image analyses and the slide titles. The model proposes; this module
//!   disposes: every constraint (valid indices, per-slide cap, no image
//!   reused) is re-enforced in code, because a JSON reply is a suggestion,
//!   not a contract.
//!
//! Slides with no suitable image simply have no entry — a valid and
//! expected outcome, not an error.

use crate::backend::{BackendCall, GenerationBackend, ResponseFormat};
use crate::config::GenerationConfig;
use crate::outline::{AssignedImage, ImageAnalysis, SlideImageMapping};
use crate::pipeline::cleanup;
use crate::prompts;
use edgequake_llm::ChatMessage;
use serde::Deserialize;
use std::collections::HashSet;
use std::sync::Arc;
use tracing::{info, warn};

/// Token budget for one mapping reply.
const MAPPING_MAX_TOKENS: usize = 2000;

/// Divide the analyzed images across `n_slides` as evenly as possible.
///
/// Slide `i` receives `K/N + (1 if i < K % N)` images, in input order. Each
/// image is assigned exactly once.
pub fn distribute_evenly(analyses: &[ImageAnalysis], n_slides: usize) -> SlideImageMapping {
    let mut mapping = SlideImageMapping::new();
    if analyses.is_empty() || n_slides == 0 {
        return mapping;
    }

    let base = analyses.len() / n_slides;
    let remainder = analyses.len() % n_slides;
    let mut images = analyses.iter();

    for slide_index in 0..n_slides {
        let count = base + usize::from(slide_index < remainder);
        let assigned: Vec<AssignedImage> = images
            .by_ref()
            .take(count)
            .map(|analysis| AssignedImage {
                analysis: analysis.clone(),
                placement: analysis.placement.to_string(),
                rationale: format!("Reference image {} distributed in order", analysis.filename),
            })
            .collect();
        if !assigned.is_empty() {
            mapping.insert(slide_index, assigned);
        }
    }

    mapping
}

#[derive(Debug, Deserialize)]
struct RawMapping {
    #[serde(default)]
    mappings: Vec<RawMappingEntry>,
}

#[derive(Debug, Deserialize)]
struct RawMappingEntry {
    slide_index: Option<usize>,
    #[serde(default)]
    assigned_images: Vec<RawAssignment>,
}

#[derive(Debug, Deserialize)]
struct RawAssignment {
    image_index: Option<usize>,
    #[serde(default)]
    placement_suggestion: String,
    #[serde(default)]
    usage_reason: String,
}

/// Ask the backend for a relevance-guided assignment.
///
/// Returns an empty mapping on call or parse failure — image intelligence
/// is an enhancement, never a reason to fail the run.
pub async fn map_by_relevance(
    backend: &Arc<dyn GenerationBackend>,
    analyses: &[ImageAnalysis],
    slide_titles: &[String],
    config: &GenerationConfig,
) -> SlideImageMapping {
    if analyses.is_empty() || slide_titles.is_empty() {
        return SlideImageMapping::new();
    }

    let image_summaries: Vec<String> = analyses
        .iter()
        .enumerate()
        .map(|(i, analysis)| prompts::image_summary(i, analysis))
        .collect();
    let slide_summaries: Vec<String> = slide_titles
        .iter()
        .enumerate()
        .map(|(i, title)| format!("Slide {}: {}", i + 1, title))
        .collect();

    let call = BackendCall {
        messages: vec![
            ChatMessage::system(prompts::MAPPING_SYSTEM_PROMPT),
            ChatMessage::user(prompts::mapping_user_message(
                &image_summaries,
                &slide_summaries,
            )),
        ],
        temperature: config.temperature,
        max_tokens: MAPPING_MAX_TOKENS,
        format: ResponseFormat::JsonObject,
    };

    let reply = match backend.complete(call).await {
        Ok(reply) => reply,
        Err(e) => {
            warn!("Slide-image mapping call failed: {e}; continuing without mapping");
            return SlideImageMapping::new();
        }
    };

    let raw = cleanup::extract_json_object(&reply.content)
        .and_then(|json| serde_json::from_str::<RawMapping>(&json).ok());
    let raw = match raw {
        Some(raw) => raw,
        None => {
            warn!("Unparseable mapping reply; continuing without mapping");
            return SlideImageMapping::new();
        }
    };

    let mapping = enforce_constraints(raw, analyses, slide_titles.len(), config);
    info!(
        "Relevance mapping assigned images to {} slide(s)",
        mapping.len()
    );
    mapping
}

/// Re-apply the assignment invariants to the model's proposal.
fn enforce_constraints(
    raw: RawMapping,
    analyses: &[ImageAnalysis],
    n_slides: usize,
    config: &GenerationConfig,
) -> SlideImageMapping {
    let mut mapping = SlideImageMapping::new();
    let mut used: HashSet<usize> = HashSet::new();

    for entry in raw.mappings {
        let slide_index = match entry.slide_index {
            Some(i) if i < n_slides => i,
            _ => continue,
        };
        if mapping.contains_key(&slide_index) {
            continue;
        }

        let mut assigned = Vec::new();
        for proposal in entry.assigned_images {
            if assigned.len() >= config.max_images_per_slide {
                break;
            }
            let image_index = match proposal.image_index {
                Some(i) if i < analyses.len() && !used.contains(&i) => i,
                _ => continue,
            };
            used.insert(image_index);
            assigned.push(AssignedImage {
                analysis: analyses[image_index].clone(),
                placement: proposal.placement_suggestion,
                rationale: proposal.usage_reason,
            });
        }

        if !assigned.is_empty() {
            mapping.insert(slide_index, assigned);
        }
    }

    mapping
}
