//! # prompt2deck
//!
//! Turn a loosely specified request — a topic, a slide count, a language,
//! optional reference images and source documents — into a schema-validated,
//! exact-length presentation outline.
//!
//! ## Why this crate?
//!
//! Generative backends differ wildly in what they can guarantee: some
//! enforce a schema natively, some only promise syntactically valid JSON,
//! some produce free text. This crate classifies the active backend into a
//! capability tier and runs a generation fallback ladder that always ends in
//! a deterministic synthetic outline — so callers get a structurally valid
//! result of exactly the requested slide count, no matter how many auxiliary
//! capabilities (vision analysis, document extraction, similarity search)
//! are unavailable or failing.
//!
//! ## Pipeline Overview
//!
//! ```text
//! request
//!  │
//!  ├─ 1. Sources  resolve image refs (paths/URLs) to local files
//!  ├─ 2. Extract  mine PDFs (pdfium) and DOCX archives for imagery
//!  ├─ 3. Analyze  classify + score each image (vision model or heuristics)
//!  ├─ 4. Map      assign images to slides (evenly or relevance-guided)
//!  ├─ 5. Ladder   structured → JSON mode → synthetic fallback
//!  └─ 6. Output   outline with exactly N slides + stats + image report
//! ```
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use prompt2deck::{generate, GenerationConfig, GenerationRequest};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     // Provider auto-detected from OPENAI_API_KEY / ANTHROPIC_API_KEY / …
//!     let request = GenerationRequest::builder("Edge computing for retail")
//!         .slides(8)
//!         .document("market_report.pdf")
//!         .build()?;
//!     let config = GenerationConfig::default();
//!     let output = generate(&request, &config).await?;
//!     assert_eq!(output.outline.slides.len(), 8);
//!     println!("{}", output.outline.to_summary_string());
//!     Ok(())
//! }
//! ```
//!
//! ## Feature Flags
//!
//! | Feature | Default | Description |
//! |---------|---------|-------------|
//! | `cli`   | on      | Enables the `prompt2deck` binary (clap + anyhow + tracing-subscriber) |
//!
//! Disable `cli` when using only the library:
//! ```toml
//! prompt2deck = { version = "0.3", default-features = false }
//! ```

// ── Modules ──────────────────────────────────────────────────────────────

pub mod backend;
pub mod capability;
pub mod config;
pub mod error;
pub mod generate;
pub mod icons;
pub mod outline;
pub mod pipeline;
pub mod prompts;
pub mod request;
pub mod schema;
pub mod variants;

// ── Re-exports ───────────────────────────────────────────────────────────

pub use backend::{
    BackendCall, BackendCallError, BackendReply, GenerationBackend, LlmBackend, ResponseFormat,
};
pub use capability::{classify, CapabilityTier, LadderRung};
pub use config::{GenerationConfig, GenerationConfigBuilder, MappingStrategy};
pub use error::{ImageFault, OutlineError};
pub use generate::{generate, generate_sync, generate_to_file};
pub use icons::{
    find_icons, resolve_icon, resolve_item_icons, IconCatalog, IconEntry, IconIndex,
    IconIndexError,
};
pub use outline::{
    AssignedImage, GenerationOutput, GenerationStats, ImageAnalysis, ImageKind, ImageReport,
    OutlineMetadata, Placement, PresentationOutline, Provenance, SlideImageMapping, SlideOutline,
};
pub use request::{GenerationRequest, GenerationRequestBuilder};
pub use schema::{FieldBounds, OutlineSchema, SchemaProfile, SchemaViolation};
pub use variants::{
    GraphKind, GraphSpec, HeadingItem, ReadyItem, ReadySlideContent, SlideContent, AUX_PLACEHOLDER,
};
