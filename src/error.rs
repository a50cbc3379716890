//! Error types for the prompt2deck library.
//!
//! Two distinct error types reflect two distinct failure modes:
//!
//! * [`OutlineError`] — **Fatal**: outline generation cannot start at all
//!   (no provider configured, invalid request or configuration). Returned as
//!   `Err(OutlineError)` from the top-level `generate*` functions, and only
//!   ever before the generation ladder runs — once the ladder starts, its
//!   synthetic terminal rung guarantees a structurally valid result.
//!
//! * [`ImageFault`] — **Non-fatal**: a single reference image or source
//!   document failed (unreadable file, failed download, extraction glitch,
//!   vision call error) while the rest of the batch is fine. Collected into
//!   [`crate::outline::ImageReport`] so callers can inspect partial success
//!   rather than losing all image intelligence to one bad input.
//!
//! The separation lets callers decide their own tolerance: surface faults to
//! the user, log and continue, or ignore them entirely.

use std::path::PathBuf;
use thiserror::Error;

/// All fatal errors returned by the prompt2deck library.
///
/// Per-image and per-document failures use [`ImageFault`] and are stored in
/// [`crate::outline::ImageReport`] rather than propagated here. Structural
/// failures of individual generation attempts never surface either — they are
/// fallback triggers inside [`crate::pipeline::ladder`].
#[derive(Debug, Error)]
pub enum OutlineError {
    /// The configured provider is not initialised (missing API key etc.).
    #[error("LLM provider '{provider}' is not configured.\n{hint}")]
    ProviderNotConfigured { provider: String, hint: String },

    /// Builder validation failed.
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    /// The generation request itself is malformed (e.g. zero slides).
    #[error("Invalid request: {0}")]
    InvalidRequest(String),

    /// Could not create or write an output file.
    #[error("Failed to write output file '{path}': {source}")]
    OutputWriteFailed {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Unexpected internal error.
    #[error("Internal error: {0}")]
    Internal(String),
}

/// A non-fatal fault for a single image or document.
///
/// Stored in [`crate::outline::ImageReport`] when an individual input fails.
/// The image-intelligence batch always continues past these.
#[derive(Debug, Clone, Error, serde::Serialize, serde::Deserialize)]
pub enum ImageFault {
    /// An image file could not be opened or decoded.
    #[error("Image '{path}' is unreadable: {detail}")]
    Unreadable { path: PathBuf, detail: String },

    /// A document yielded no images because extraction failed.
    #[error("Extraction failed for document '{document}': {detail}")]
    Extraction { document: PathBuf, detail: String },

    /// A remote image reference could not be downloaded.
    #[error("Failed to download image '{url}': {detail}")]
    Download { url: String, detail: String },

    /// The vision backend failed for one image; heuristic analysis was used.
    #[error("Vision analysis failed for '{path}': {detail}")]
    Analysis { path: PathBuf, detail: String },
}
