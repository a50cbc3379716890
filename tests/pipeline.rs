//! End-to-end pipeline tests for prompt2deck.
//!
//! Everything here runs against scripted in-memory backends — no API key and
//! no network. The one live test at the bottom is gated behind the
//! `PROMPT2DECK_E2E` environment variable so it does not run in CI unless
//! explicitly requested:
//!
//!   PROMPT2DECK_E2E=1 cargo test --test pipeline -- --nocapture

use async_trait::async_trait;
use prompt2deck::{
    generate, BackendCall, BackendCallError, BackendReply, GenerationBackend, GenerationConfig,
    GenerationRequest, LadderRung, ResponseFormat,
};
use std::collections::VecDeque;
use std::sync::{Arc, Mutex};

// ── Test helpers ─────────────────────────────────────────────────────────────

/// A backend that replays a fixed script of replies and records the response
/// formats it was asked for.
struct ScriptedBackend {
    id: String,
    replies: Mutex<VecDeque<Result<String, String>>>,
    formats: Mutex<Vec<&'static str>>,
}

impl ScriptedBackend {
    fn new(id: &str, replies: Vec<Result<String, String>>) -> Arc<Self> {
        Arc::new(Self {
            id: id.to_string(),
            replies: Mutex::new(replies.into()),
            formats: Mutex::new(Vec::new()),
        })
    }

    fn seen_formats(&self) -> Vec<&'static str> {
        self.formats.lock().unwrap().clone()
    }
}

#[async_trait]
impl GenerationBackend for ScriptedBackend {
    fn id(&self) -> &str {
        &self.id
    }

    async fn complete(&self, call: BackendCall) -> Result<BackendReply, BackendCallError> {
        let format = match call.format {
            ResponseFormat::Text => "text",
            ResponseFormat::JsonObject => "json_object",
            ResponseFormat::JsonSchema(_) => "json_schema",
        };
        self.formats.lock().unwrap().push(format);

        match self.replies.lock().unwrap().pop_front() {
            Some(Ok(content)) => Ok(BackendReply {
                content,
                input_tokens: 100,
                output_tokens: 250,
            }),
            Some(Err(detail)) => Err(BackendCallError {
                provider: self.id.clone(),
                detail,
            }),
            None => Err(BackendCallError {
                provider: self.id.clone(),
                detail: "script exhausted".into(),
            }),
        }
    }
}

/// A rich-profile-valid outline reply with `n` slides.
fn valid_outline_json(n: usize) -> String {
    let slides: Vec<serde_json::Value> = (0..n)
        .map(|i| {
            serde_json::json!({
                "title": format!("Meaningful slide title {i}"),
                "body": format!(
                    "Slide {i} body content that is comfortably beyond the fifty character minimum."
                ),
            })
        })
        .collect();
    serde_json::json!({
        "title": "A presentation title of decent length",
        "notes": ["Keep the pace brisk"],
        "slides": slides,
    })
    .to_string()
}

fn request(n_slides: usize) -> GenerationRequest {
    GenerationRequest::builder("Observability on a budget")
        .slides(n_slides)
        .build()
        .expect("valid request")
}

fn config_with(backend: Arc<ScriptedBackend>) -> GenerationConfig {
    GenerationConfig::builder()
        .backend(backend)
        .max_retries(0)
        .retry_backoff_ms(1)
        .build()
        .expect("valid config")
}

fn write_test_png(path: &std::path::Path, width: u32, height: u32) {
    image::DynamicImage::ImageRgba8(image::RgbaImage::from_pixel(
        width,
        height,
        image::Rgba([120, 40, 200, 255]),
    ))
    .save(path)
    .expect("write png");
}

// ── Fallback ladder ──────────────────────────────────────────────────────────

#[tokio::test]
async fn json_mode_success_returns_exact_count() {
    let backend = ScriptedBackend::new("anthropic", vec![Ok(valid_outline_json(4))]);
    let output = generate(&request(4), &config_with(backend.clone()))
        .await
        .expect("generation succeeds");

    assert_eq!(output.outline.slides.len(), 4);
    assert_eq!(output.stats.rung, LadderRung::JsonMode);
    assert_eq!(backend.seen_formats(), vec!["json_object"]);
    assert_eq!(output.stats.output_tokens, 250);
}

#[tokio::test]
async fn structured_tier_trusts_and_truncates_overlong_output() {
    // A tier-1 provider returning 6 slides for a 4-slide request: the reply
    // is trusted (no schema validation) and the post-processing step
    // truncates to the requested count.
    let backend = ScriptedBackend::new("openai", vec![Ok(valid_outline_json(6))]);
    let output = generate(&request(4), &config_with(backend.clone()))
        .await
        .expect("generation succeeds");

    assert_eq!(output.stats.rung, LadderRung::Structured);
    assert_eq!(output.outline.slides.len(), 4);
    assert_eq!(backend.seen_formats(), vec!["json_schema"]);
}

#[tokio::test]
async fn total_backend_failure_yields_synthetic_outline() {
    let backend = ScriptedBackend::new("anthropic", vec![]);
    let output = generate(&request(3), &config_with(backend))
        .await
        .expect("generation still succeeds");

    assert_eq!(output.stats.rung, LadderRung::Synthetic);
    let titles: Vec<&str> = output
        .outline
        .slides
        .iter()
        .map(|s| s.title.as_str())
        .collect();
    assert_eq!(titles, vec!["Slide 1", "Slide 2", "Slide 3"]);
    assert_eq!(output.outline.notes, vec!["Generated with fallback method"]);
    assert!(output.outline.title.starts_with("Presentation about"));
}

#[tokio::test]
async fn wrong_slide_count_is_rejected_not_returned() {
    // JSON-mode reply with 2 slides for a 3-slide request must never reach
    // the caller; the ladder falls through to the synthetic rung.
    let backend = ScriptedBackend::new("anthropic", vec![Ok(valid_outline_json(2))]);
    let output = generate(&request(3), &config_with(backend.clone()))
        .await
        .expect("generation succeeds");

    assert_eq!(output.stats.rung, LadderRung::Synthetic);
    assert_eq!(output.outline.slides.len(), 3);
    // The synthetic rung still makes one unconstrained call.
    assert_eq!(backend.seen_formats(), vec!["json_object", "text"]);
}

#[tokio::test]
async fn missing_required_field_is_rejected() {
    let no_body = serde_json::json!({
        "title": "A presentation title of decent length",
        "slides": [{"title": "Only a title, no body present"}],
    })
    .to_string();
    let backend = ScriptedBackend::new("anthropic", vec![Ok(no_body)]);
    let output = generate(&request(1), &config_with(backend))
        .await
        .expect("generation succeeds");

    assert_eq!(output.stats.rung, LadderRung::Synthetic);
    assert_eq!(output.outline.slides.len(), 1);
}

#[tokio::test]
async fn structured_parse_failure_retries_as_json_mode() {
    let backend = ScriptedBackend::new(
        "openai",
        vec![
            Ok("I'd be happy to help! What topic?".into()),
            Ok(valid_outline_json(3)),
        ],
    );
    let output = generate(&request(3), &config_with(backend.clone()))
        .await
        .expect("generation succeeds");

    assert_eq!(output.stats.rung, LadderRung::JsonMode);
    assert_eq!(output.outline.slides.len(), 3);
    assert_eq!(backend.seen_formats(), vec!["json_schema", "json_object"]);
}

#[tokio::test]
async fn fenced_json_reply_is_recovered() {
    let fenced = format!("```json\n{}\n```", valid_outline_json(2));
    let backend = ScriptedBackend::new("anthropic", vec![Ok(fenced)]);
    let output = generate(&request(2), &config_with(backend))
        .await
        .expect("generation succeeds");

    assert_eq!(output.stats.rung, LadderRung::JsonMode);
    assert_eq!(output.outline.slides.len(), 2);
}

#[tokio::test]
async fn transient_failure_is_retried_within_the_rung() {
    let backend = ScriptedBackend::new(
        "anthropic",
        vec![Err("HTTP 429".into()), Ok(valid_outline_json(2))],
    );
    let config = GenerationConfig::builder()
        .backend(backend.clone())
        .max_retries(1)
        .retry_backoff_ms(1)
        .build()
        .expect("valid config");
    let output = generate(&request(2), &config).await.expect("succeeds");

    assert_eq!(output.stats.rung, LadderRung::JsonMode);
    assert_eq!(backend.seen_formats(), vec!["json_object", "json_object"]);
}

#[tokio::test]
async fn unknown_provider_goes_straight_to_synthetic() {
    let backend = ScriptedBackend::new("carrier-pigeon", vec![Ok("squawk".into())]);
    let output = generate(&request(2), &config_with(backend.clone()))
        .await
        .expect("generation succeeds");

    assert_eq!(output.stats.rung, LadderRung::Synthetic);
    // Only the best-effort unconstrained call is made.
    assert_eq!(backend.seen_formats(), vec!["text"]);
}

// ── Image intelligence through the full pipeline ─────────────────────────────

#[tokio::test]
async fn direct_images_are_analysed_and_distributed() {
    let dir = tempfile::tempdir().expect("tempdir");
    let wide = dir.path().join("skyline_photo.png");
    write_test_png(&wide, 160, 90);
    let tall = dir.path().join("tower_chart.png");
    write_test_png(&tall, 60, 120);

    let backend = ScriptedBackend::new("anthropic", vec![Ok(valid_outline_json(2))]);
    let request = GenerationRequest::builder("City growth report")
        .slides(2)
        .image(wide.to_string_lossy())
        .image(tall.to_string_lossy())
        .build()
        .expect("valid request");

    let output = generate(&request, &config_with(backend))
        .await
        .expect("generation succeeds");

    let images = output.images.expect("image report present");
    assert_eq!(images.analyses.len(), 2);
    assert_eq!(output.stats.images_analyzed, 2);
    assert!(images.faults.is_empty());
    // Heuristic analysis only: no scores, nothing clears the threshold.
    assert!(images.high_relevance.is_empty());
    // Even distribution: one image per slide, each assigned exactly once.
    assert_eq!(images.mapping.len(), 2);
    let total: usize = images.mapping.values().map(Vec::len).sum();
    assert_eq!(total, 2);
}

#[tokio::test]
async fn corrupt_document_does_not_abort_generation_or_other_inputs() {
    let dir = tempfile::tempdir().expect("tempdir");
    let good_image = dir.path().join("diagram.png");
    write_test_png(&good_image, 100, 100);
    let corrupt_doc = dir.path().join("broken.docx");
    std::fs::write(&corrupt_doc, b"definitely not a zip").expect("write");

    let backend = ScriptedBackend::new("anthropic", vec![]);
    let request = GenerationRequest::builder("Supply chain risks")
        .slides(3)
        .image(good_image.to_string_lossy())
        .document(&corrupt_doc)
        .build()
        .expect("valid request");

    let output = generate(&request, &config_with(backend))
        .await
        .expect("generation succeeds despite the corrupt document");

    assert_eq!(output.outline.slides.len(), 3);
    let images = output.images.expect("image report present");
    assert_eq!(images.analyses.len(), 1, "the valid image still contributes");
    assert!(
        images
            .faults
            .iter()
            .any(|f| f.to_string().contains("broken.docx")),
        "the corrupt document is reported as a fault"
    );
}

// ── Live test (needs an API key) ─────────────────────────────────────────────

#[tokio::test]
async fn live_generation_roundtrip() {
    if std::env::var("PROMPT2DECK_E2E").is_err() {
        println!("SKIP — set PROMPT2DECK_E2E=1 to run live tests");
        return;
    }

    let request = GenerationRequest::builder("The state of WebAssembly in 2026")
        .slides(4)
        .build()
        .expect("valid request");
    let config = GenerationConfig::default();
    let output = generate(&request, &config).await.expect("live generation");

    assert_eq!(output.outline.slides.len(), 4);
    println!("{}", output.outline.to_summary_string());
}
