//! Output data model: the generated outline, per-image analysis records and
//! run statistics.
//!
//! The serde shape of [`PresentationOutline`] is the persisted contract that
//! downstream renderers depend on:
//!
//! ```json
//! { "title": "...", "notes": ["..."], "slides": [ { "title": "...", "body": "...", ... } ] }
//! ```
//!
//! with `slides.length` fixed to the requested slide count. Optional metadata
//! fields are flattened alongside and omitted when absent, so consumers that
//! only know the three-field core keep working.

use crate::error::ImageFault;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::path::PathBuf;

use crate::capability::LadderRung;

// ── Outline ──────────────────────────────────────────────────────────────

/// One slide of the generated outline.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SlideOutline {
    /// Slide title. Plain text, never markdown, never "Slide 1"-style.
    pub title: String,
    /// Slide content in markdown.
    pub body: String,
    /// Talking points and transitions for the presenter.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub speaker_notes: Option<String>,
    /// Suggested charts, images and visual element placement.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub visual_suggestions: Option<String>,
    /// Estimated presentation time for this slide, in minutes.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub estimated_time: Option<u32>,
}

/// Presentation-level metadata the model may volunteer alongside the slides.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct OutlineMetadata {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub executive_summary: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub target_audience: Option<String>,
    /// Total estimated presentation time in minutes.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub total_estimated_time: Option<u32>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub key_takeaways: Vec<String>,
}

/// The structured, pre-rendering representation of a presentation.
///
/// Invariant: after [`crate::generate::generate`] returns, `slides.len()`
/// equals the requested slide count exactly.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PresentationOutline {
    pub title: String,
    #[serde(default)]
    pub notes: Vec<String>,
    pub slides: Vec<SlideOutline>,
    #[serde(flatten)]
    pub metadata: OutlineMetadata,
}

impl PresentationOutline {
    /// Render a human-readable digest of the outline.
    ///
    /// Used for logs, CLI output and as context text for follow-up model
    /// calls that need the outline in prose form.
    pub fn to_summary_string(&self) -> String {
        let mut message = format!("# Presentation Title: {}\n\n", self.title);
        for (i, slide) in self.slides.iter().enumerate() {
            message.push_str(&format!("## Slide {}:\n", i + 1));
            message.push_str(&format!("  - Title: {}\n", slide.title));
            message.push_str(&format!("  - Body: {}\n", slide.body));
        }
        if !self.notes.is_empty() {
            message.push_str("# Notes:\n");
            for note in &self.notes {
                message.push_str(&format!("  - {note}\n"));
            }
        }
        message
    }
}

// ── Image intelligence records ───────────────────────────────────────────

/// Content classification of a reference image.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ImageKind {
    Chart,
    Diagram,
    Logo,
    Photo,
    Screenshot,
    #[default]
    General,
}

impl fmt::Display for ImageKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            ImageKind::Chart => "chart",
            ImageKind::Diagram => "diagram",
            ImageKind::Logo => "logo",
            ImageKind::Photo => "photo",
            ImageKind::Screenshot => "screenshot",
            ImageKind::General => "general",
        };
        f.write_str(s)
    }
}

/// Placement suggestion derived from an image's aspect ratio.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Placement {
    /// Wide images (aspect ratio above 1.5).
    FullWidth,
    /// Tall images (aspect ratio below 0.75).
    SidePanel,
    /// Everything near square.
    #[default]
    Centered,
}

impl fmt::Display for Placement {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Placement::FullWidth => "full_width",
            Placement::SidePanel => "side_panel",
            Placement::Centered => "center_content",
        };
        f.write_str(s)
    }
}

/// Where an analyzed image came from.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Provenance {
    /// Supplied directly on the request.
    DirectUpload,
    /// Pulled out of a source document.
    Extracted {
        document: PathBuf,
        /// 1-indexed page for rendering-based extraction; `None` when the
        /// container format has no page concept (embedded DOCX media).
        page: Option<usize>,
        /// 1-indexed position within the document's extracted images.
        index: usize,
    },
}

/// Analysis record for one reference image.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ImageAnalysis {
    pub source: PathBuf,
    pub filename: String,
    pub width: u32,
    pub height: u32,
    pub aspect_ratio: f32,
    pub file_size: u64,
    pub kind: ImageKind,
    /// 1–10 relevance to the presentation topic as judged by a vision
    /// backend. `None` when only heuristic analysis ran; sorts as 0.
    pub relevance: Option<u8>,
    pub placement: Placement,
    /// The vision backend's suggested slide-position category
    /// (opening, data showcase, summary, ...).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub suggested_slot: Option<String>,
    /// Short caption suggested by the vision backend.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title_suggestion: Option<String>,
    pub description: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub rationale: Option<String>,
    pub provenance: Provenance,
}

impl ImageAnalysis {
    /// Relevance score with unscored (heuristic-only) records treated as 0.
    pub fn score_or_zero(&self) -> u8 {
        self.relevance.unwrap_or(0)
    }
}

/// One image assigned to a slide, with assignment-specific placement text.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AssignedImage {
    pub analysis: ImageAnalysis,
    pub placement: String,
    pub rationale: String,
}

/// Slide index (0-based) → images assigned to that slide.
///
/// Only slides that received at least one image have an entry; an image
/// instance appears under at most one index.
pub type SlideImageMapping = BTreeMap<usize, Vec<AssignedImage>>;

/// Everything the image-intelligence sub-pipeline produced for one run.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ImageReport {
    /// All analyses, sorted by relevance descending.
    pub analyses: Vec<ImageAnalysis>,
    #[serde(default)]
    pub mapping: SlideImageMapping,
    /// The subset of `analyses` scoring at or above the relevance threshold,
    /// in the same order.
    pub high_relevance: Vec<ImageAnalysis>,
    /// Per-input failures that were skipped over.
    #[serde(default)]
    pub faults: Vec<ImageFault>,
}

// ── Run statistics ───────────────────────────────────────────────────────

/// Statistics for one generation run.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GenerationStats {
    /// The ladder rung that produced the accepted outline.
    pub rung: LadderRung,
    pub total_duration_ms: u64,
    pub analysis_duration_ms: u64,
    pub generation_duration_ms: u64,
    /// Token usage across the outline-generation calls (not vision calls).
    pub input_tokens: u64,
    pub output_tokens: u64,
    pub images_analyzed: usize,
}

/// Result of a full generation run.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GenerationOutput {
    pub outline: PresentationOutline,
    pub stats: GenerationStats,
    /// Present when the request carried images or documents.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub images: Option<ImageReport>,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn slide(title: &str, body: &str) -> SlideOutline {
        SlideOutline {
            title: title.into(),
            body: body.into(),
            speaker_notes: None,
            visual_suggestions: None,
            estimated_time: None,
        }
    }

    #[test]
    fn outline_serialises_to_contract_shape() {
        let outline = PresentationOutline {
            title: "Quarterly Review".into(),
            notes: vec!["Keep it short".into()],
            slides: vec![slide("Revenue", "- up 4%")],
            metadata: OutlineMetadata::default(),
        };
        let value = serde_json::to_value(&outline).expect("serialise");
        assert_eq!(value["title"], "Quarterly Review");
        assert_eq!(value["notes"][0], "Keep it short");
        assert_eq!(value["slides"][0]["body"], "- up 4%");
        // Empty metadata must not leak into the contract.
        assert!(value.get("executive_summary").is_none());
        assert!(value.get("key_takeaways").is_none());
    }

    #[test]
    fn outline_deserialises_without_optional_fields() {
        let raw = r#"{"title":"T","slides":[{"title":"a","body":"b"}]}"#;
        let outline: PresentationOutline = serde_json::from_str(raw).expect("parse");
        assert!(outline.notes.is_empty());
        assert_eq!(outline.slides.len(), 1);
        assert!(outline.slides[0].speaker_notes.is_none());
    }

    #[test]
    fn summary_string_lists_slides_and_notes() {
        let outline = PresentationOutline {
            title: "T".into(),
            notes: vec!["n1".into()],
            slides: vec![slide("First", "body text")],
            metadata: OutlineMetadata::default(),
        };
        let s = outline.to_summary_string();
        assert!(s.contains("# Presentation Title: T"));
        assert!(s.contains("## Slide 1:"));
        assert!(s.contains("- Title: First"));
        assert!(s.contains("- n1"));
    }

    #[test]
    fn score_or_zero_defaults_unscored() {
        let a = ImageAnalysis {
            source: PathBuf::from("x.png"),
            filename: "x.png".into(),
            width: 10,
            height: 10,
            aspect_ratio: 1.0,
            file_size: 1,
            kind: ImageKind::General,
            relevance: None,
            placement: Placement::Centered,
            suggested_slot: None,
            title_suggestion: None,
            description: String::new(),
            rationale: None,
            provenance: Provenance::DirectUpload,
        };
        assert_eq!(a.score_or_zero(), 0);
    }
}
