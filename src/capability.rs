//! Provider capability classification and the per-tier strategy table.
//!
//! Generation strategy is decided once, from provider identity, not probed at
//! run time. Adding a provider means adding one arm to [`classify`] — the
//! engine itself never grows provider-specific branches.

use serde::{Deserialize, Serialize};
use std::fmt;

/// What the active backend can guarantee about its output structure.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum CapabilityTier {
    /// The backend accepts a schema and guarantees conformance.
    NativeStructured,
    /// The backend guarantees syntactically valid JSON, nothing more.
    JsonMode,
    /// Free text only; no structural guarantee whatsoever.
    TextOnly,
}

/// One rung of the generation fallback ladder.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LadderRung {
    /// Schema-constrained call, result trusted.
    Structured,
    /// Schema-as-instructions call, result validated manually.
    JsonMode,
    /// Deterministic templated outline; cannot fail.
    Synthetic,
}

impl fmt::Display for LadderRung {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            LadderRung::Structured => "structured",
            LadderRung::JsonMode => "json_mode",
            LadderRung::Synthetic => "synthetic",
        };
        f.write_str(s)
    }
}

/// Classify a provider identifier into its capability tier.
///
/// Pure function of provider identity. Identifiers are matched
/// case-insensitively.
pub fn classify(provider_id: &str) -> CapabilityTier {
    match provider_id.to_ascii_lowercase().as_str() {
        "openai" | "azure" | "azure-openai" => CapabilityTier::NativeStructured,
        "anthropic" | "google" | "gemini" | "vertex" | "mistral" | "ollama" | "groq"
        | "openrouter" | "lmstudio" | "custom" => CapabilityTier::JsonMode,
        _ => CapabilityTier::TextOnly,
    }
}

impl CapabilityTier {
    /// The ordered generation strategies legal for this tier.
    ///
    /// Every ladder terminates in [`LadderRung::Synthetic`], which is how the
    /// engine guarantees a structurally valid result under total failure.
    pub fn ladder(self) -> &'static [LadderRung] {
        match self {
            CapabilityTier::NativeStructured => &[
                LadderRung::Structured,
                LadderRung::JsonMode,
                LadderRung::Synthetic,
            ],
            CapabilityTier::JsonMode => &[LadderRung::JsonMode, LadderRung::Synthetic],
            CapabilityTier::TextOnly => &[LadderRung::Synthetic],
        }
    }
}
