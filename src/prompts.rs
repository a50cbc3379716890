//! Prompts for outline generation, vision analysis and slide-image mapping.
//!
//! Centralising every prompt here serves two purposes:
//!
//! 1. **Single source of truth** — changing generation behaviour (e.g. a new
//!    rule about slide titles) requires editing exactly one place.
//!
//! 2. **Testability** — unit tests can inspect prompts directly without
//!    spinning up a real backend, making prompt regressions easy to catch.
//!
//! The schema addendum for JSON-mode calls is NOT here — it depends on the
//! requested slide count and lives on
//! [`crate::schema::OutlineSchema::instruction_block`].

use crate::outline::{ImageAnalysis, SlideImageMapping};

/// System prompt for the outline-generation call.
pub const OUTLINE_SYSTEM_PROMPT: &str = r#"Create a presentation based on the provided prompt, number of slides, output language, and additional informational details.
Format the output in the specified JSON schema with structured markdown content.

# Steps

1. Identify key points from the provided prompt, including the topic, number of slides, output language, and additional content directions.
2. Create a concise and descriptive title reflecting the main topic, adhering to the specified language.
3. Generate a clear title for each slide.
4. Develop comprehensive content using markdown structure:
    * Use bullet points (- or *) for lists.
    * Use **bold** for emphasis, *italic* for secondary emphasis, and `code` for technical terms.
5. Provide important points from the prompt as notes.

# Notes
- Content must be generated for every slide.
- Image or icon information provided in **Input** must be included in the **notes**.
- Notes should clearly state whether they apply to a specific slide or to the presentation.
- Slide **body** should not contain the slide **title**.
- Slide **title** should not contain "Slide 1", "Slide 2", etc.
- Slide **title** should not be in markdown format.
- There must be exactly as many slides as the specified **Number of Slides**."#;

/// Build the user message for the outline-generation call.
///
/// When image intelligence ran, its rendered summary is appended so the model
/// can reference specific images in `visual_suggestions` and `speaker_notes`.
pub fn outline_user_message(
    topic: &str,
    language: &str,
    n_slides: usize,
    supplementary: Option<&str>,
    image_context: Option<&str>,
) -> String {
    let mut message = format!(
        "**Input:**\n\
         - Prompt: {topic}\n\
         - Output Language: {language}\n\
         - Number of Slides: {n_slides}\n\
         - Additional Information: {}\n",
        supplementary.unwrap_or("None")
    );
    if let Some(context) = image_context {
        message.push('\n');
        message.push_str(context);
    }
    message
}

/// Directive appended by the backend adapter when JSON output is requested
/// without a full schema.
pub const JSON_OBJECT_DIRECTIVE: &str =
    "Respond with a single valid JSON object and nothing else. \
     No prose, no markdown fences, no commentary.";

/// Directive carrying the full JSON Schema for structured-output calls.
pub fn json_schema_directive(schema: &serde_json::Value) -> String {
    format!(
        "Respond with a single JSON object that conforms exactly to this JSON Schema. \
         Output nothing besides the JSON object.\n\n{schema}"
    )
}

// ── Vision analysis ──────────────────────────────────────────────────────

/// System prompt for per-image vision analysis.
pub const VISION_SYSTEM_PROMPT: &str = r#"You are a professional image analyst and presentation expert. Analyse the provided image and rate its relevance to the presentation topic.

Provide the following analysis as a JSON object with exactly these keys:
- "description": detailed but concise description of the image content
- "image_kind": one of "chart", "diagram", "logo", "photo", "screenshot", "general"
- "relevance_score": integer 1-10, how strongly the image relates to the presentation topic
- "suggested_slot": suggested slide position (opening, concept explanation, case study, data showcase, summary, ...)
- "title_suggestion": a short caption for the image
- "rationale": why and how this image adds value to the presentation"#;

/// Build the text part of the vision user message.
pub fn vision_user_text(context: &str) -> String {
    format!(
        "Presentation topic and content:\n{context}\n\n\
         Analyse this image and rate its relevance to the presentation content above."
    )
}

// ── Slide-image mapping ──────────────────────────────────────────────────

/// System prompt for relevance-guided slide-image mapping.
pub const MAPPING_SYSTEM_PROMPT: &str = r#"You are a professional presentation designer. Given the image analyses and slide titles, assign the most relevant images to each slide.

Rules:
1. Assign at most 2 images per slide.
2. Prefer images with a higher relevance score.
3. Only assign an image when it has a clear topical relationship to the slide.
4. Never assign the same image to more than one slide.
5. A slide with no suitable image gets no assignment; that is a valid outcome.

Respond as a JSON object in this format:
{
    "mappings": [
        {
            "slide_index": 0,
            "slide_title": "the slide title",
            "assigned_images": [
                {
                    "image_index": 0,
                    "placement_suggestion": "where to place the image on the slide",
                    "usage_reason": "why this image fits this slide"
                }
            ]
        }
    ]
}"#;

/// Build the user message for the mapping call.
pub fn mapping_user_message(image_summaries: &[String], slide_summaries: &[String]) -> String {
    format!(
        "Available images:\n{}\n\nSlides:\n{}\n\n\
         Assign the most suitable images to each slide.",
        image_summaries.join("\n"),
        slide_summaries.join("\n")
    )
}

/// One-line digest of an analysis for the mapping prompt.
pub fn image_summary(index: usize, analysis: &ImageAnalysis) -> String {
    format!(
        "Image {}: {} (relevance: {}/10)",
        index + 1,
        analysis.description,
        analysis.score_or_zero()
    )
}

// ── Prompt augmentation ──────────────────────────────────────────────────

/// High-relevance images spelled out in the augmentation block, at most.
const MAX_DETAILED_IMAGES: usize = 5;

/// Render the image-intelligence results as prompt augmentation text.
///
/// Returns `None` when there is nothing to say (no successful analyses).
pub fn render_image_context(
    analyses: &[ImageAnalysis],
    high_relevance: &[ImageAnalysis],
    mapping: &SlideImageMapping,
    threshold: u8,
) -> Option<String> {
    if analyses.is_empty() {
        return None;
    }

    let mut text = String::from("**Image analysis results:**\n");
    text.push_str(&format!(
        "{} reference image(s) analysed. High-relevance images (score >= {threshold}):\n\n",
        analyses.len()
    ));

    for (i, img) in high_relevance.iter().take(MAX_DETAILED_IMAGES).enumerate() {
        text.push_str(&format!("**Image {}**: {}\n", i + 1, img.filename));
        text.push_str(&format!("- Content: {}\n", img.description));
        text.push_str(&format!("- Kind: {}\n", img.kind));
        text.push_str(&format!("- Relevance: {}/10\n", img.score_or_zero()));
        text.push_str(&format!(
            "- Suggested use: {}\n\n",
            img.suggested_slot.as_deref().unwrap_or("General use")
        ));
    }

    if !mapping.is_empty() {
        text.push_str("**Slide image assignments:**\n");
        for (slide_idx, images) in mapping {
            let names: Vec<&str> = images
                .iter()
                .map(|a| a.analysis.filename.as_str())
                .collect();
            text.push_str(&format!("- Slide {}: {}\n", slide_idx + 1, names.join(", ")));
        }
    }

    text.push_str(
        "\n**When generating the presentation content:**\n\
         1. Reference these images explicitly in the relevant slides.\n\
         2. Describe each image's use in the visual_suggestions field.\n\
         3. Include talking points about the images in speaker_notes.\n\
         4. Keep the slide content consistent with what the images show.\n",
    );

    Some(text)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::outline::{ImageKind, Placement, Provenance};
    use std::path::PathBuf;

    fn analysis(filename: &str, relevance: Option<u8>) -> ImageAnalysis {
        ImageAnalysis {
            source: PathBuf::from(filename),
            filename: filename.into(),
            width: 100,
            height: 100,
            aspect_ratio: 1.0,
            file_size: 1024,
            kind: ImageKind::Chart,
            relevance,
            placement: Placement::Centered,
            suggested_slot: Some("data showcase".into()),
            title_suggestion: None,
            description: "quarterly revenue chart".into(),
            rationale: None,
            provenance: Provenance::DirectUpload,
        }
    }

    #[test]
    fn user_message_carries_all_request_fields() {
        let msg = outline_user_message("Rust in prod", "German", 6, Some("CFO audience"), None);
        assert!(msg.contains("Rust in prod"));
        assert!(msg.contains("German"));
        assert!(msg.contains("Number of Slides: 6"));
        assert!(msg.contains("CFO audience"));
    }

    #[test]
    fn user_message_appends_image_context() {
        let msg = outline_user_message("t", "English", 3, None, Some("**Image analysis results:**"));
        assert!(msg.contains("**Image analysis results:**"));
    }

    #[test]
    fn image_context_empty_for_no_analyses() {
        assert!(render_image_context(&[], &[], &Default::default(), 7).is_none());
    }

    #[test]
    fn image_context_lists_high_relevance_and_mapping() {
        let a = analysis("rev.png", Some(9));
        let mut mapping = SlideImageMapping::new();
        mapping.insert(
            0,
            vec![crate::outline::AssignedImage {
                analysis: a.clone(),
                placement: "full width".into(),
                rationale: "matches revenue slide".into(),
            }],
        );
        let text = render_image_context(&[a.clone()], &[a], &mapping, 7).expect("some");
        assert!(text.contains("rev.png"));
        assert!(text.contains("9/10"));
        assert!(text.contains("Slide 1: rev.png"));
        assert!(text.contains("visual_suggestions"));
    }

    #[test]
    fn image_context_caps_detailed_entries() {
        let imgs: Vec<ImageAnalysis> =
            (0..8).map(|i| analysis(&format!("i{i}.png"), Some(8))).collect();
        let text =
            render_image_context(&imgs, &imgs, &Default::default(), 7).expect("some");
        assert!(text.contains("**Image 5**"));
        assert!(!text.contains("**Image 6**"));
    }
}
