//! The generation request: what the caller wants built.
//!
//! A [`GenerationRequest`] is constructed once per call and is immutable for
//! the lifetime of the pipeline run. The builder validates the single hard
//! invariant — a positive slide count — up front, so the engine never has to
//! re-check it mid-flight.

use crate::error::OutlineError;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// A request for a presentation outline.
///
/// Built via [`GenerationRequest::builder`].
///
/// # Example
/// ```rust
/// use prompt2deck::GenerationRequest;
///
/// let request = GenerationRequest::builder("Rust for data engineers")
///     .slides(8)
///     .language("English")
///     .supplementary("Audience is mostly Python developers.")
///     .build()
///     .unwrap();
/// assert_eq!(request.n_slides, 8);
/// ```
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GenerationRequest {
    /// The topic or prompt describing the presentation.
    pub topic: String,

    /// Requested slide count. Always ≥ 1.
    pub n_slides: usize,

    /// Output language for all generated text. Default: "English".
    pub language: String,

    /// Free-text supplementary content (summaries, constraints, data).
    pub supplementary: Option<String>,

    /// Direct image references: local paths or http(s) URLs.
    pub images: Vec<String>,

    /// Source documents (PDF, DOCX) to mine for reference imagery.
    pub documents: Vec<PathBuf>,
}

impl GenerationRequest {
    /// Create a new builder seeded with the topic.
    pub fn builder(topic: impl Into<String>) -> GenerationRequestBuilder {
        GenerationRequestBuilder {
            request: GenerationRequest {
                topic: topic.into(),
                n_slides: 5,
                language: "English".to_string(),
                supplementary: None,
                images: Vec::new(),
                documents: Vec::new(),
            },
        }
    }
}

/// Builder for [`GenerationRequest`].
#[derive(Debug)]
pub struct GenerationRequestBuilder {
    request: GenerationRequest,
}

impl GenerationRequestBuilder {
    pub fn slides(mut self, n: usize) -> Self {
        self.request.n_slides = n;
        self
    }

    pub fn language(mut self, language: impl Into<String>) -> Self {
        self.request.language = language.into();
        self
    }

    pub fn supplementary(mut self, content: impl Into<String>) -> Self {
        self.request.supplementary = Some(content.into());
        self
    }

    pub fn image(mut self, reference: impl Into<String>) -> Self {
        self.request.images.push(reference.into());
        self
    }

    pub fn images<I, S>(mut self, references: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.request.images.extend(references.into_iter().map(Into::into));
        self
    }

    pub fn document(mut self, path: impl Into<PathBuf>) -> Self {
        self.request.documents.push(path.into());
        self
    }

    pub fn documents<I, P>(mut self, paths: I) -> Self
    where
        I: IntoIterator<Item = P>,
        P: Into<PathBuf>,
    {
        self.request.documents.extend(paths.into_iter().map(Into::into));
        self
    }

    /// Build the request, validating invariants.
    pub fn build(self) -> Result<GenerationRequest, OutlineError> {
        if self.request.n_slides == 0 {
            return Err(OutlineError::InvalidRequest(
                "slide count must be at least 1".into(),
            ));
        }
        if self.request.topic.trim().is_empty() {
            return Err(OutlineError::InvalidRequest("topic must not be empty".into()));
        }
        Ok(self.request)
    }
}
