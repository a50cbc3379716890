//! The outline schema: an exact-count structural contract built per request.
//!
//! [`OutlineSchema::for_slide_count`] is a plain factory returning an
//! immutable value — no runtime type synthesis. The same value serves three
//! consumers:
//!
//! * the structured rung, which ships [`OutlineSchema::to_json_schema`] to a
//!   backend that enforces it natively;
//! * the JSON-mode rung, which embeds [`OutlineSchema::instruction_block`]
//!   into the prompt and then validates the reply with
//!   [`OutlineSchema::validate`];
//! * tests, which assert the bounds directly.
//!
//! The slide-count check is strict equality. "At least N" would let a chatty
//! model pad the deck; "at most N" would silently under-deliver. Both are
//! rejected and treated as fallback triggers.

use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use thiserror::Error;

/// Field-bound strictness profile.
///
/// `Rich` carries the minimums tuned for substantial, render-ready decks;
/// `Minimal` accepts any non-empty string, for callers that post-edit.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SchemaProfile {
    #[default]
    Rich,
    Minimal,
}

/// Inclusive character-length bounds for one string field.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct FieldBounds {
    pub min: usize,
    pub max: usize,
}

impl FieldBounds {
    fn check(&self, field: &'static str, text: &str) -> Result<(), SchemaViolation> {
        let len = text.chars().count();
        if len < self.min || len > self.max {
            return Err(SchemaViolation::Bounds {
                field,
                len,
                min: self.min,
                max: self.max,
            });
        }
        Ok(())
    }
}

/// A structural validator for one requested slide count.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OutlineSchema {
    n_slides: usize,
    profile: SchemaProfile,
    pub title: FieldBounds,
    pub slide_title: FieldBounds,
    pub slide_body: FieldBounds,
    pub max_notes: usize,
}

impl OutlineSchema {
    /// Build the schema for exactly `n_slides` slides under `profile`.
    pub fn for_slide_count(n_slides: usize, profile: SchemaProfile) -> Self {
        let (title_min, slide_title_min, body_min) = match profile {
            SchemaProfile::Rich => (10, 10, 50),
            SchemaProfile::Minimal => (1, 1, 1),
        };
        Self {
            n_slides,
            profile,
            title: FieldBounds {
                min: title_min,
                max: 100,
            },
            slide_title: FieldBounds {
                min: slide_title_min,
                max: 100,
            },
            slide_body: FieldBounds {
                min: body_min,
                max: 2000,
            },
            max_notes: 10,
        }
    }

    pub fn n_slides(&self) -> usize {
        self.n_slides
    }

    pub fn profile(&self) -> SchemaProfile {
        self.profile
    }

    /// Validate a parsed JSON payload against the structural contract.
    ///
    /// Checks, in order: root object, required fields, exact slide count,
    /// per-field bounds, notes cap. The first violation wins.
    pub fn validate(&self, value: &Value) -> Result<(), SchemaViolation> {
        let root = value.as_object().ok_or(SchemaViolation::NotAnObject)?;

        let title = root
            .get("title")
            .and_then(Value::as_str)
            .ok_or(SchemaViolation::MissingField("title"))?;
        self.title.check("title", title)?;

        let slides = root
            .get("slides")
            .and_then(Value::as_array)
            .ok_or(SchemaViolation::MissingField("slides"))?;
        if slides.len() != self.n_slides {
            return Err(SchemaViolation::SlideCount {
                expected: self.n_slides,
                got: slides.len(),
            });
        }

        for slide in slides {
            let slide = slide.as_object().ok_or(SchemaViolation::NotAnObject)?;
            let slide_title = slide
                .get("title")
                .and_then(Value::as_str)
                .ok_or(SchemaViolation::MissingField("slides[].title"))?;
            self.slide_title.check("slides[].title", slide_title)?;

            let body = slide
                .get("body")
                .and_then(Value::as_str)
                .ok_or(SchemaViolation::MissingField("slides[].body"))?;
            self.slide_body.check("slides[].body", body)?;
        }

        if let Some(notes) = root.get("notes").and_then(Value::as_array) {
            if notes.len() > self.max_notes {
                return Err(SchemaViolation::TooManyNotes {
                    max: self.max_notes,
                    got: notes.len(),
                });
            }
        }

        Ok(())
    }

    /// Render the contract as a JSON Schema document.
    ///
    /// `minItems == maxItems == n_slides` encodes the exact-count invariant
    /// for backends with native structured output.
    pub fn to_json_schema(&self) -> Value {
        json!({
            "type": "object",
            "properties": {
                "title": {
                    "type": "string",
                    "description": "Title of the presentation in about 3 to 8 words",
                    "minLength": self.title.min,
                    "maxLength": self.title.max,
                },
                "notes": {
                    "type": "array",
                    "description": "Strategic notes for the presentation",
                    "minItems": 0,
                    "maxItems": self.max_notes,
                    "items": { "type": "string" },
                },
                "slides": {
                    "type": "array",
                    "description": "List of slides",
                    "minItems": self.n_slides,
                    "maxItems": self.n_slides,
                    "items": {
                        "type": "object",
                        "properties": {
                            "title": {
                                "type": "string",
                                "description": "Title of the slide in about 3 to 5 words",
                                "minLength": self.slide_title.min,
                                "maxLength": self.slide_title.max,
                            },
                            "body": {
                                "type": "string",
                                "description": "Content of the slide in markdown format",
                                "minLength": self.slide_body.min,
                                "maxLength": self.slide_body.max,
                            },
                            "speaker_notes": {
                                "type": "string",
                                "description": "Speaker notes with talking points and transitions",
                            },
                            "visual_suggestions": {
                                "type": "string",
                                "description": "Suggestions for charts, images and visual placement",
                            },
                            "estimated_time": {
                                "type": "integer",
                                "description": "Estimated presentation time for this slide in minutes",
                            },
                        },
                        "required": ["title", "body"],
                    },
                },
            },
            "required": ["title", "slides"],
        })
    }

    /// Render the textual schema addendum for JSON-mode prompts.
    ///
    /// Spells out the shape and the literal required slide count, since
    /// JSON-mode backends see no schema object.
    pub fn instruction_block(&self) -> String {
        format!(
            r#"
IMPORTANT: Return the response in valid JSON format matching this schema:
{{
    "title": "string (Title of the presentation in about 3 to 8 words)",
    "notes": ["string array (Notes for the presentation)"],
    "slides": [
        {{
            "title": "string (Title of the slide in about 3 to 5 words)",
            "body": "string (Content of the slide in markdown format)",
            "speaker_notes": "string (optional speaker notes)",
            "visual_suggestions": "string (optional visual element suggestions)",
            "estimated_time": "integer (optional, minutes)"
        }}
    ]
}}

Make sure to generate exactly {n} slides."#,
            n = self.n_slides
        )
    }
}

/// Why a payload failed structural validation.
///
/// Every variant is a fallback trigger, never a caller-visible error.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SchemaViolation {
    #[error("payload is not a JSON object")]
    NotAnObject,

    #[error("required field '{0}' is missing or has the wrong type")]
    MissingField(&'static str),

    #[error("expected exactly {expected} slides, got {got}")]
    SlideCount { expected: usize, got: usize },

    #[error("field '{field}' has length {len}, outside bounds {min}..={max}")]
    Bounds {
        field: &'static str,
        len: usize,
        min: usize,
        max: usize,
    },

    #[error("at most {max} notes allowed, got {got}")]
    TooManyNotes { max: usize, got: usize },
}
