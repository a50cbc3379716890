//! The generation fallback ladder.
//!
//! Rungs are attempted in the order the capability tier dictates, each only
//! if the previous rung failed to deliver a structurally valid outline:
//!
//! 1. **Structured** — schema-constrained call; the reply is trusted and
//!    only has to parse.
//! 2. **JSON mode** — schema embedded as explicit textual instructions
//!    (including the literal required slide count); the reply is parsed and
//!    validated manually.
//! 3. **Synthetic** — terminal and infallible: one last unconstrained call
//!    keeps the upstream capability exercised, then a deterministic
//!    templated outline with exactly N slides is returned regardless of
//!    what that call said.
//!
//! Every fallback trigger is a first-class value ([`FallbackReason`]), not
//! an exception path, so each transition is independently testable.
//!
//! ## Retry strategy
//!
//! Transient backend failures (429/5xx, timeouts) retry inside a rung with
//! exponential backoff (`retry_backoff_ms * 2^attempt`) before the rung
//! gives up. Structural failures never retry — a model that produced four
//! slides when asked for five will usually do it again, and the next rung
//! is the better spend.

use crate::backend::{BackendCall, GenerationBackend, ResponseFormat};
use crate::capability::{classify, LadderRung};
use crate::config::GenerationConfig;
use crate::outline::{OutlineMetadata, PresentationOutline, SlideOutline};
use crate::pipeline::cleanup;
use crate::prompts;
use crate::schema::{OutlineSchema, SchemaViolation};
use edgequake_llm::ChatMessage;
use std::sync::Arc;
use thiserror::Error;
use tokio::time::{sleep, Duration};
use tracing::{debug, info, warn};

/// Why a rung did not produce an acceptable outline.
#[derive(Debug, Clone, Error)]
pub enum FallbackReason {
    /// The backend call failed after all retries.
    #[error("backend call failed: {0}")]
    Backend(String),

    /// The reply contained no parseable JSON outline.
    #[error("unparseable reply: {0}")]
    UnparseableJson(String),

    /// The reply parsed but violated the structural contract.
    #[error("schema violation: {0}")]
    Schema(SchemaViolation),
}

/// Outcome of one rung attempt.
#[derive(Debug)]
pub enum RungAttempt {
    Accepted(PresentationOutline),
    NeedsFallback(FallbackReason),
}

/// The accepted outline plus which rung produced it and what it cost.
#[derive(Debug)]
pub struct LadderOutcome {
    pub outline: PresentationOutline,
    pub rung: LadderRung,
    pub input_tokens: u64,
    pub output_tokens: u64,
}

#[derive(Debug, Default)]
struct Usage {
    input: u64,
    output: u64,
}

impl Usage {
    fn add(&mut self, reply: &crate::backend::BackendReply) {
        self.input += reply.input_tokens;
        self.output += reply.output_tokens;
    }
}

/// Run the ladder to completion. Cannot fail.
///
/// `topic` feeds the synthetic terminal rung; `user_message` is the fully
/// rendered request block (including any image-intelligence augmentation).
pub async fn run(
    backend: &Arc<dyn GenerationBackend>,
    schema: &OutlineSchema,
    topic: &str,
    user_message: &str,
    config: &GenerationConfig,
) -> LadderOutcome {
    let tier = classify(backend.id());
    info!("Provider '{}' classified as {:?}", backend.id(), tier);

    let mut usage = Usage::default();

    for rung in tier.ladder() {
        let attempt = match rung {
            LadderRung::Structured => {
                attempt_structured(backend, schema, user_message, config, &mut usage).await
            }
            LadderRung::JsonMode => {
                attempt_json_mode(backend, schema, user_message, config, &mut usage).await
            }
            LadderRung::Synthetic => {
                // One unconstrained call keeps the capability exercised; its
                // content (and any error) is deliberately ignored.
                let call = BackendCall {
                    messages: vec![
                        ChatMessage::system(prompts::OUTLINE_SYSTEM_PROMPT),
                        ChatMessage::user(user_message.to_string()),
                    ],
                    temperature: config.temperature,
                    max_tokens: config.max_tokens,
                    format: ResponseFormat::Text,
                };
                if let Ok(reply) = backend.complete(call).await {
                    usage.add(&reply);
                }

                info!("Synthetic fallback produced {} slides", schema.n_slides());
                return LadderOutcome {
                    outline: synthetic_outline(topic, schema.n_slides()),
                    rung: LadderRung::Synthetic,
                    input_tokens: usage.input,
                    output_tokens: usage.output,
                };
            }
        };

        match attempt {
            RungAttempt::Accepted(outline) => {
                info!("Rung {rung} accepted an outline");
                return LadderOutcome {
                    outline,
                    rung: *rung,
                    input_tokens: usage.input,
                    output_tokens: usage.output,
                };
            }
            RungAttempt::NeedsFallback(reason) => {
                warn!("Rung {rung} failed ({reason}); falling back");
            }
        }
    }

    // Every tier's ladder terminates in Synthetic, so this is only reachable
    // if the strategy table regresses; the synthetic outline still holds the
    // exact-count invariant.
    LadderOutcome {
        outline: synthetic_outline(topic, schema.n_slides()),
        rung: LadderRung::Synthetic,
        input_tokens: usage.input,
        output_tokens: usage.output,
    }
}

/// Tier-1 rung: schema-constrained call, reply trusted.
async fn attempt_structured(
    backend: &Arc<dyn GenerationBackend>,
    schema: &OutlineSchema,
    user_message: &str,
    config: &GenerationConfig,
    usage: &mut Usage,
) -> RungAttempt {
    let reply = match call_with_retry(
        backend,
        prompts::OUTLINE_SYSTEM_PROMPT.to_string(),
        user_message,
        ResponseFormat::JsonSchema(schema.to_json_schema()),
        config,
    )
    .await
    {
        Ok(reply) => reply,
        Err(detail) => return RungAttempt::NeedsFallback(FallbackReason::Backend(detail)),
    };
    usage.add(&reply);

    // The backend guarantees schema conformance; the reply still has to
    // parse into the typed outline.
    match cleanup::extract_json_object(&reply.content)
        .and_then(|json| serde_json::from_str::<PresentationOutline>(&json).ok())
    {
        Some(outline) => RungAttempt::Accepted(outline),
        None => RungAttempt::NeedsFallback(FallbackReason::UnparseableJson(
            preview(&reply.content),
        )),
    }
}

/// Tier-2 rung: schema as instructions, reply validated manually.
async fn attempt_json_mode(
    backend: &Arc<dyn GenerationBackend>,
    schema: &OutlineSchema,
    user_message: &str,
    config: &GenerationConfig,
    usage: &mut Usage,
) -> RungAttempt {
    let system = format!(
        "{}\n{}",
        prompts::OUTLINE_SYSTEM_PROMPT,
        schema.instruction_block()
    );
    let reply = match call_with_retry(
        backend,
        system,
        user_message,
        ResponseFormat::JsonObject,
        config,
    )
    .await
    {
        Ok(reply) => reply,
        Err(detail) => return RungAttempt::NeedsFallback(FallbackReason::Backend(detail)),
    };
    usage.add(&reply);

    let json = match cleanup::extract_json_object(&reply.content) {
        Some(json) => json,
        None => {
            return RungAttempt::NeedsFallback(FallbackReason::UnparseableJson(preview(
                &reply.content,
            )))
        }
    };
    let value: serde_json::Value = match serde_json::from_str(&json) {
        Ok(value) => value,
        Err(e) => {
            return RungAttempt::NeedsFallback(FallbackReason::UnparseableJson(e.to_string()))
        }
    };

    if let Err(violation) = schema.validate(&value) {
        return RungAttempt::NeedsFallback(FallbackReason::Schema(violation));
    }

    match serde_json::from_value::<PresentationOutline>(value) {
        Ok(outline) => RungAttempt::Accepted(outline),
        Err(e) => RungAttempt::NeedsFallback(FallbackReason::UnparseableJson(e.to_string())),
    }
}

/// One backend call with exponential-backoff retry on transient failures.
async fn call_with_retry(
    backend: &Arc<dyn GenerationBackend>,
    system: String,
    user_message: &str,
    format: ResponseFormat,
    config: &GenerationConfig,
) -> Result<crate::backend::BackendReply, String> {
    let mut last_err = String::new();

    for attempt in 0..=config.max_retries {
        if attempt > 0 {
            let backoff = config.retry_backoff_ms * 2u64.pow(attempt - 1);
            warn!(
                "Generation retry {attempt}/{} after {backoff}ms",
                config.max_retries
            );
            sleep(Duration::from_millis(backoff)).await;
        }

        let call = BackendCall {
            messages: vec![
                ChatMessage::system(system.clone()),
                ChatMessage::user(user_message.to_string()),
            ],
            temperature: config.temperature,
            max_tokens: config.max_tokens,
            format: format.clone(),
        };

        match backend.complete(call).await {
            Ok(reply) => {
                debug!(
                    "Generation call ok: {} input / {} output tokens",
                    reply.input_tokens, reply.output_tokens
                );
                return Ok(reply);
            }
            Err(e) => {
                warn!("Generation attempt {} failed — {e}", attempt + 1);
                last_err = e.to_string();
            }
        }
    }

    Err(last_err)
}

/// Build the deterministic terminal outline.
///
/// Exactly `n_slides` templated slides; never fails, never calls out.
pub fn synthetic_outline(topic: &str, n_slides: usize) -> PresentationOutline {
    let topic = topic.trim();
    let display_topic = if topic.is_empty() {
        "No specific topic provided"
    } else {
        topic
    };
    let prefix: String = display_topic.chars().take(50).collect();

    PresentationOutline {
        title: format!("Presentation about {prefix}..."),
        notes: vec!["Generated with fallback method".to_string()],
        slides: (1..=n_slides)
            .map(|i| SlideOutline {
                title: format!("Slide {i}"),
                body: format!("Content for slide {i} based on: {display_topic}"),
                speaker_notes: None,
                visual_suggestions: None,
                estimated_time: None,
            })
            .collect(),
        metadata: OutlineMetadata::default(),
    }
}

/// Enforce the exact-count invariant on an accepted outline.
///
/// Only ever truncates; padding is the synthetic rung's job.
pub fn truncate_to(outline: &mut PresentationOutline, n_slides: usize) {
    if outline.slides.len() > n_slides {
        debug!(
            "Truncating outline from {} to {n_slides} slides",
            outline.slides.len()
        );
        outline.slides.truncate(n_slides);
    }
}

fn preview(content: &str) -> String {
    const MAX: usize = 120;
    if content.chars().count() <= MAX {
        content.to_string()
    } else {
        let cut: String = content.chars().take(MAX).collect();
        format!("{cut}…")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn synthetic_outline_has_templated_slides() {
        let outline = synthetic_outline("Kubernetes cost control", 3);
        let titles: Vec<&str> = outline.slides.iter().map(|s| s.title.as_str()).collect();
        assert_eq!(titles, vec!["Slide 1", "Slide 2", "Slide 3"]);
        assert!(outline.title.starts_with("Presentation about Kubernetes"));
        assert_eq!(outline.notes, vec!["Generated with fallback method"]);
        assert!(outline.slides[0].body.contains("Kubernetes cost control"));
    }

    #[test]
    fn synthetic_outline_truncates_long_topics_in_title_only() {
        let topic = "x".repeat(200);
        let outline = synthetic_outline(&topic, 1);
        assert!(outline.title.chars().count() < 80);
        assert!(outline.slides[0].body.contains(&topic));
    }

    #[test]
    fn synthetic_outline_handles_empty_topic() {
        let outline = synthetic_outline("   ", 2);
        assert_eq!(outline.slides.len(), 2);
        assert!(outline.slides[0].body.contains("No specific topic provided"));
    }

    #[test]
    fn truncate_never_pads() {
        let mut outline = synthetic_outline("t", 5);
        truncate_to(&mut outline, 3);
        assert_eq!(outline.slides.len(), 3);
        truncate_to(&mut outline, 10);
        assert_eq!(outline.slides.len(), 3, "must not pad");
    }

    #[test]
    fn fallback_reason_display() {
        let reason = FallbackReason::Schema(SchemaViolation::SlideCount {
            expected: 5,
            got: 4,
        });
        assert!(reason.to_string().contains("exactly 5"));
    }
}
