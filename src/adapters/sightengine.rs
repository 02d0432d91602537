//! SightEngine adapter for AI-generated image detection (primary).

use async_trait::async_trait;
use secrecy::{ExposeSecret, SecretString};
use serde::Deserialize;

use crate::adapters::{ADAPTER_TIMEOUT, DetectionProvider, check_status};
use crate::error::ProviderError;
use crate::types::{AnalysisResult, MediaType, ModelId, Verdict, round4};

const SERVICE: &str = "sightengine";
const DEFAULT_ENDPOINT: &str = "https://api.sightengine.com/1.0/check.json";

/// FAKE at or above this AI-genness score.
const FAKE_THRESHOLD: f64 = 0.75;
/// REAL at or below this AI-genness score.
const REAL_THRESHOLD: f64 = 0.35;

/// Expected response shape of the `check.json` endpoint.
#[derive(Debug, Deserialize)]
struct CheckResponse {
    #[serde(default)]
    status: String,
    #[serde(rename = "type", default)]
    scores: Option<TypeScores>,
}

#[derive(Debug, Deserialize)]
struct TypeScores {
    #[serde(default)]
    ai_generated: Option<f64>,
}

/// Primary image provider. Posts the image as multipart with
/// query-embedded credentials and reads a single AI-genness probability.
pub struct SightengineAdapter {
    client: reqwest::Client,
    api_user: String,
    api_secret: SecretString,
    endpoint: String,
}

impl SightengineAdapter {
    pub fn new(api_user: String, api_secret: SecretString) -> Self {
        Self {
            client: reqwest::Client::new(),
            api_user,
            api_secret,
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
impl DetectionProvider for SightengineAdapter {
    async fn analyze(&self, data: &[u8]) -> Result<AnalysisResult, ProviderError> {
        let media = reqwest::multipart::Part::bytes(data.to_vec())
            .file_name("image.jpg")
            .mime_str("image/jpeg")
            .map_err(|e| ProviderError::RequestFailed {
                service: SERVICE,
                reason: e.to_string(),
            })?;
        let form = reqwest::multipart::Form::new()
            .text("api_user", self.api_user.clone())
            .text("api_secret", self.api_secret.expose_secret().to_string())
            .text("models", "genai")
            .part("media", media);

        let response = match self
            .client
            .post(&self.endpoint)
            .timeout(ADAPTER_TIMEOUT)
            .multipart(form)
            .send()
            .await
        {
            Ok(response) => response,
            Err(err) if err.is_timeout() => {
                return Ok(AnalysisResult::uncertain(
                    ModelId::Sightengine,
                    MediaType::Image,
                    "SightEngine: request timed out, verdict is inconclusive.",
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

        let body: CheckResponse = match response.json().await {
            Ok(body) => body,
            Err(err) => {
                tracing::warn!(error = %err, "sightengine returned an undecodable body");
                return Ok(AnalysisResult::uncertain(
                    ModelId::Sightengine,
                    MediaType::Image,
                    "SightEngine: unexpected response format.",
                ));
            }
        };

        if body.status != "success" {
            return Err(ProviderError::Rejected {
                service: SERVICE,
                reason: format!("status={}", body.status),
            });
        }

        let score = body.scores.and_then(|t| t.ai_generated).unwrap_or(0.5);
        Ok(normalize(score))
    }

    fn name(&self) -> &'static str {
        SERVICE
    }
}

fn normalize(score: f64) -> AnalysisResult {
    AnalysisResult {
        verdict: verdict_from_score(score),
        confidence: round4(score),
        model_used: ModelId::Sightengine,
        explanation: format!(
            "SightEngine: AI-generation probability {:.0}%",
            score * 100.0
        ),
        media_type: MediaType::Image,
        processing_ms: 0,
    }
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

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_threshold_boundaries() {
        assert_eq!(verdict_from_score(0.75), Verdict::Fake);
        assert_eq!(verdict_from_score(0.749999), Verdict::Uncertain);
        assert_eq!(verdict_from_score(0.35), Verdict::Real);
        assert_eq!(verdict_from_score(0.350001), Verdict::Uncertain);
    }

    #[test]
    fn test_normalize_fake() {
        let result = normalize(0.95);
        assert_eq!(result.verdict, Verdict::Fake);
        assert_eq!(result.confidence, 0.95);
        assert_eq!(result.model_used, ModelId::Sightengine);
        assert_eq!(result.media_type, MediaType::Image);
        assert!(result.explanation.contains("95%"));
    }

    #[test]
    fn test_normalize_real() {
        let result = normalize(0.10);
        assert_eq!(result.verdict, Verdict::Real);
        assert_eq!(result.confidence, 0.1);
    }

    #[test]
    fn test_normalize_rounds_confidence() {
        let result = normalize(0.123456789);
        assert_eq!(result.confidence, 0.1235);
    }

    #[test]
    fn test_parse_success_response() {
        let body: CheckResponse =
            serde_json::from_str(r#"{"status": "success", "type": {"ai_generated": 0.92}}"#)
                .unwrap();
        assert_eq!(body.status, "success");
        assert_eq!(body.scores.unwrap().ai_generated, Some(0.92));
    }

    #[test]
    fn test_parse_response_missing_score_defaults_midpoint() {
        let body: CheckResponse = serde_json::from_str(r#"{"status": "success"}"#).unwrap();
        let score = body.scores.and_then(|t| t.ai_generated).unwrap_or(0.5);
        assert_eq!(score, 0.5);
    }

    #[tokio::test]
    async fn test_connection_failure_is_typed_error() {
        let adapter = SightengineAdapter::new("user".into(), SecretString::from("secret"))
            .with_endpoint("http://127.0.0.1:9/check.json".into());
        let err = adapter.analyze(b"img").await.unwrap_err();
        assert!(matches!(err, ProviderError::RequestFailed { .. }));
    }
}
