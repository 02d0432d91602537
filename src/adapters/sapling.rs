//! Sapling AI text detection adapter.
//!
//! Rejects texts too short to classify without touching the network,
//! truncates oversized inputs, and surfaces the single most suspicious
//! sentence in the explanation when the provider reports per-sentence
//! scores.

use async_trait::async_trait;
use secrecy::{ExposeSecret, SecretString};
use serde::Deserialize;
use serde_json::Value;

use crate::adapters::{ADAPTER_TIMEOUT, DetectionProvider, check_status};
use crate::error::ProviderError;
use crate::types::{AnalysisResult, MediaType, ModelId, Verdict, round4};

const SERVICE: &str = "sapling";
const DEFAULT_ENDPOINT: &str = "https://api.sapling.ai/api/v1/aidetect";

/// Texts shorter than this are rejected without a network call.
const MIN_TEXT_LENGTH: usize = 50;
/// Texts longer than this are truncated before submission.
const MAX_TEXT_LENGTH: usize = 10_000;

/// FAKE at or above this AI-written score.
const FAKE_THRESHOLD: f64 = 0.80;
/// REAL at or below this AI-written score.
const REAL_THRESHOLD: f64 = 0.25;

/// Quoted suspicious sentences are clipped to this many characters.
const SENTENCE_CLIP: usize = 100;

#[derive(Debug, Deserialize)]
struct AiDetectResponse {
    #[serde(default)]
    score: Option<f64>,
    /// Entries are expected as `[sentence, score]` pairs but parsed
    /// defensively; malformed entries are skipped.
    #[serde(default)]
    sentence_scores: Vec<Value>,
}

/// Text provider backed by the Sapling AI-detection API.
pub struct SaplingAdapter {
    client: reqwest::Client,
    api_key: SecretString,
    endpoint: String,
}

impl SaplingAdapter {
    pub fn new(api_key: SecretString) -> Self {
        Self {
            client: reqwest::Client::new(),
            api_key,
            endpoint: DEFAULT_ENDPOINT.to_string(),
        }
    }

    /// Override the API endpoint (for tests and self-hosted proxies).
    pub fn with_endpoint(mut self, endpoint: String) -> Self {
        self.endpoint = endpoint;
        self
    }
}

#[async_trait]
impl DetectionProvider for SaplingAdapter {
    async fn analyze(&self, data: &[u8]) -> Result<AnalysisResult, ProviderError> {
        let raw = String::from_utf8_lossy(data);
        let Some((text, truncated)) = prepare_text(&raw) else {
            return Ok(AnalysisResult {
                verdict: Verdict::Uncertain,
                confidence: 0.0,
                model_used: ModelId::Sapling,
                explanation: format!(
                    "Text is too short to analyze (minimum {MIN_TEXT_LENGTH} characters)."
                ),
                media_type: MediaType::Text,
                processing_ms: 0,
            });
        };

        let payload = serde_json::json!({
            "key": self.api_key.expose_secret(),
            "text": text,
        });

        let response = match self
            .client
            .post(&self.endpoint)
            .timeout(ADAPTER_TIMEOUT)
            .json(&payload)
            .send()
            .await
        {
            Ok(response) => response,
            Err(err) if err.is_timeout() => {
                return Ok(AnalysisResult::uncertain(
                    ModelId::Sapling,
                    MediaType::Text,
                    "Sapling AI: request timed out, verdict is inconclusive.",
                ));
            }
            Err(err) => {
                return Err(ProviderError::RequestFailed {
                    service: SERVICE,
                    reason: err.to_string(),
                });
            }
        };

        check_status(SERVICE, response.status())?;

        let body: AiDetectResponse = match response.json().await {
            Ok(body) => body,
            Err(err) => {
                tracing::warn!(error = %err, "sapling returned an undecodable body");
                return Ok(AnalysisResult::uncertain(
                    ModelId::Sapling,
                    MediaType::Text,
                    "Sapling AI: unexpected response format.",
                ));
            }
        };

        let score = body.score.unwrap_or(0.5);
        let explanation = build_explanation(score, top_sentence(&body.sentence_scores), truncated);

        Ok(AnalysisResult {
            verdict: verdict_from_score(score),
            confidence: round4(score),
            model_used: ModelId::Sapling,
            explanation,
            media_type: MediaType::Text,
            processing_ms: 0,
        })
    }

    fn name(&self) -> &'static str {
        SERVICE
    }
}

/// Validate and bound the input text: `None` when it is too short to
/// classify, otherwise the submission text plus a truncation flag.
/// Lengths count characters, not bytes.
fn prepare_text(raw: &str) -> Option<(String, bool)> {
    let text = raw.trim();
    let length = text.chars().count();
    if length < MIN_TEXT_LENGTH {
        return None;
    }
    if length > MAX_TEXT_LENGTH {
        return Some((text.chars().take(MAX_TEXT_LENGTH).collect(), true));
    }
    Some((text.to_string(), false))
}

fn verdict_from_score(score: f64) -> Verdict {
    if score >= FAKE_THRESHOLD {
        Verdict::Fake
    } else if score <= REAL_THRESHOLD {
        Verdict::Real
    } else {
        Verdict::Uncertain
    }
}

/// Pick the highest-scoring `[sentence, score]` pair, skipping entries
/// that do not match that shape.
fn top_sentence(entries: &[Value]) -> Option<(String, f64)> {
    let mut top: Option<(String, f64)> = None;
    for entry in entries {
        let Some(pair) = entry.as_array() else {
            continue;
        };
        let (Some(sentence), Some(score)) = (
            pair.first().and_then(Value::as_str),
            pair.get(1).and_then(Value::as_f64),
        ) else {
            continue;
        };
        if score > top.as_ref().map_or(0.0, |(_, s)| *s) {
            top = Some((sentence.to_string(), score));
        }
    }
    top
}

fn build_explanation(score: f64, top: Option<(String, f64)>, truncated: bool) -> String {
    let mut explanation = format!(
        "Sapling AI: {:.0}% probability of AI-written text.",
        score * 100.0
    );
    if let Some((sentence, sentence_score)) = top {
        let clipped: String = sentence.chars().take(SENTENCE_CLIP).collect();
        explanation.push_str(&format!(
            " Most suspicious sentence: \"{}\" ({:.0}%)",
            clipped,
            sentence_score * 100.0
        ));
    }
    if truncated {
        explanation.push_str(" (text truncated to 10,000 characters)");
    }
    explanation
}
