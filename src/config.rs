//! Configuration types for outline generation.
//!
//! All pipeline behaviour is controlled through [`GenerationConfig`], built
//! via its [`GenerationConfigBuilder`]. Keeping every knob in one struct makes
//! it trivial to share configs across calls, serialise the scalar parts for
//! logging, and diff two runs to understand why their outputs differ.
//!
//! Optional capabilities — a vision-capable backend for image analysis, a
//! similarity index for icon search — are injected here as handles. Their
//! absence (`None`) is the documented "unavailable" sentinel that switches
//! the pipeline onto its heuristic fallbacks; nothing in the core reads
//! process-wide singletons.

use crate::backend::GenerationBackend;
use crate::error::OutlineError;
use crate::icons::IconIndex;
use crate::schema::SchemaProfile;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::Arc;

/// How analyzed images are assigned to slides.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MappingStrategy {
    /// Relevance-guided when a vision pass produced scores, else even
    /// distribution.
    #[default]
    Auto,
    /// Round-robin distribution, remainder to the earliest slides.
    Even,
    /// Always ask the backend for a relevance-guided assignment.
    Relevance,
}

/// Configuration for one outline-generation run.
///
/// Built via [`GenerationConfig::builder()`] or [`GenerationConfig::default()`].
///
/// # Example
/// ```rust
/// use prompt2deck::{GenerationConfig, SchemaProfile};
///
/// let config = GenerationConfig::builder()
///     .provider_name("openai")
///     .model("gpt-4.1-mini")
///     .schema_profile(SchemaProfile::Rich)
///     .build()
///     .unwrap();
/// ```
#[derive(Clone)]
pub struct GenerationConfig {
    /// LLM provider name (e.g. "openai", "anthropic", "ollama").
    /// If `None` along with `backend`, the factory auto-detects from the
    /// environment.
    pub provider_name: Option<String>,

    /// Model identifier, e.g. "gpt-4.1-mini". If `None`, the provider
    /// default is used.
    pub model: Option<String>,

    /// Pre-constructed generation backend. Takes precedence over
    /// `provider_name`. Useful in tests or when the caller needs custom
    /// middleware (caching, rate-limiting).
    pub backend: Option<Arc<dyn GenerationBackend>>,

    /// Vision-capable backend for per-image analysis. `None` selects the
    /// filename/aspect-ratio heuristic analyzer.
    pub vision: Option<Arc<dyn GenerationBackend>>,

    /// Similarity index for icon search. `None` falls back to catalog
    /// substring matching, then to the built-in icon set.
    pub icon_index: Option<Arc<dyn IconIndex>>,

    /// Sampling temperature for generation calls. Default: 0.2.
    ///
    /// Low temperature keeps the model close to the requested structure;
    /// higher values increase the JSON-mode rejection rate.
    pub temperature: f32,

    /// Maximum tokens per generation call. Default: 4096.
    pub max_tokens: usize,

    /// Maximum retry attempts on a transient backend failure. Default: 2.
    ///
    /// Retries apply to network/API failures only. A structurally invalid
    /// reply is never retried — it falls through to the next ladder rung.
    pub max_retries: u32,

    /// Initial retry delay in milliseconds (exponential backoff). Default: 500.
    pub retry_backoff_ms: u64,

    /// Concurrent vision calls during batch image analysis. Default: 4.
    pub concurrency: usize,

    /// Field-bound strictness for schema validation. Default: Rich.
    pub schema_profile: SchemaProfile,

    /// Slide-image mapping strategy. Default: Auto.
    pub mapping: MappingStrategy,

    /// Minimum relevance score for the "high relevance" set. Default: 7.
    pub relevance_threshold: u8,

    /// Maximum images assigned to one slide. Default: 2.
    pub max_images_per_slide: usize,

    /// Page cap for rendering-based document extraction. Default: 10.
    pub max_document_pages: usize,

    /// Download timeout for URL image references, in seconds. Default: 120.
    pub download_timeout_secs: u64,
}

impl Default for GenerationConfig {
    fn default() -> Self {
        Self {
            provider_name: None,
            model: None,
            backend: None,
            vision: None,
            icon_index: None,
            temperature: 0.2,
            max_tokens: 4096,
            max_retries: 2,
            retry_backoff_ms: 500,
            concurrency: 4,
            schema_profile: SchemaProfile::default(),
            mapping: MappingStrategy::default(),
            relevance_threshold: 7,
            max_images_per_slide: 2,
            max_document_pages: 10,
            download_timeout_secs: 120,
        }
    }
}

impl fmt::Debug for GenerationConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("GenerationConfig")
            .field("provider_name", &self.provider_name)
            .field("model", &self.model)
            .field("backend", &self.backend.as_ref().map(|b| b.id().to_string()))
            .field("vision", &self.vision.as_ref().map(|b| b.id().to_string()))
            .field("icon_index", &self.icon_index.as_ref().map(|_| "<dyn IconIndex>"))
            .field("temperature", &self.temperature)
            .field("max_tokens", &self.max_tokens)
            .field("max_retries", &self.max_retries)
            .field("concurrency", &self.concurrency)
            .field("schema_profile", &self.schema_profile)
            .field("mapping", &self.mapping)
            .field("relevance_threshold", &self.relevance_threshold)
            .field("max_images_per_slide", &self.max_images_per_slide)
            .field("max_document_pages", &self.max_document_pages)
            .finish()
    }
}

impl GenerationConfig {
    /// Create a new builder for `GenerationConfig`.
    pub fn builder() -> GenerationConfigBuilder {
        GenerationConfigBuilder {
            config: Self::default(),
        }
    }
}

/// Builder for [`GenerationConfig`].
#[derive(Debug)]
pub struct GenerationConfigBuilder {
    config: GenerationConfig,
}

impl GenerationConfigBuilder {
    pub fn provider_name(mut self, name: impl Into<String>) -> Self {
        self.config.provider_name = Some(name.into());
        self
    }

    pub fn model(mut self, model: impl Into<String>) -> Self {
        self.config.model = Some(model.into());
        self
    }

    pub fn backend(mut self, backend: Arc<dyn GenerationBackend>) -> Self {
        self.config.backend = Some(backend);
        self
    }

    pub fn vision(mut self, backend: Arc<dyn GenerationBackend>) -> Self {
        self.config.vision = Some(backend);
        self
    }

    pub fn icon_index(mut self, index: Arc<dyn IconIndex>) -> Self {
        self.config.icon_index = Some(index);
        self
    }

    pub fn temperature(mut self, t: f32) -> Self {
        self.config.temperature = t.clamp(0.0, 2.0);
        self
    }

    pub fn max_tokens(mut self, n: usize) -> Self {
        self.config.max_tokens = n;
        self
    }

    pub fn max_retries(mut self, n: u32) -> Self {
        self.config.max_retries = n;
        self
    }

    pub fn retry_backoff_ms(mut self, ms: u64) -> Self {
        self.config.retry_backoff_ms = ms;
        self
    }

    pub fn concurrency(mut self, n: usize) -> Self {
        self.config.concurrency = n.max(1);
        self
    }

    pub fn schema_profile(mut self, profile: SchemaProfile) -> Self {
        self.config.schema_profile = profile;
        self
    }

    pub fn mapping(mut self, strategy: MappingStrategy) -> Self {
        self.config.mapping = strategy;
        self
    }

    pub fn relevance_threshold(mut self, score: u8) -> Self {
        self.config.relevance_threshold = score.min(10);
        self
    }

    pub fn max_images_per_slide(mut self, n: usize) -> Self {
        self.config.max_images_per_slide = n;
        self
    }

    pub fn max_document_pages(mut self, n: usize) -> Self {
        self.config.max_document_pages = n;
        self
    }

    pub fn download_timeout_secs(mut self, secs: u64) -> Self {
        self.config.download_timeout_secs = secs;
        self
    }

    /// Build the configuration, validating constraints.
    pub fn build(self) -> Result<GenerationConfig, OutlineError> {
        let c = &self.config;
        if c.concurrency == 0 {
            return Err(OutlineError::InvalidConfig("concurrency must be ≥ 1".into()));
        }
        if c.max_tokens == 0 {
            return Err(OutlineError::InvalidConfig("max_tokens must be ≥ 1".into()));
        }
        if c.relevance_threshold > 10 {
            return Err(OutlineError::InvalidConfig(
                "relevance_threshold must be within 0–10".into(),
            ));
        }
        Ok(self.config)
    }
}
