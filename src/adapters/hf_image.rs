//! HuggingFace image deepfake detection, the fallback image adapter.
//!
//! The hosted inference endpoint answers with a list of label/score
//! predictions, or with an error object while the model is still
//! loading ("cold start"). Cold starts are retried a bounded number of
//! times with a fixed backoff before degrading to UNCERTAIN.

use std::time::Duration;

use async_trait::async_trait;
use secrecy::{ExposeSecret, SecretString};
use serde::Deserialize;

use crate::adapters::{ADAPTER_TIMEOUT, DetectionProvider, check_status, with_retry};
use crate::error::ProviderError;
use crate::types::{AnalysisResult, MediaType, ModelId, Verdict, round4};

const SERVICE: &str = "hf_image";
const DEFAULT_ENDPOINT: &str =
    "https://api-inference.huggingface.co/models/dima806/deepfake-vs-real-image-detection";

const MAX_RETRIES: u32 = 2;
const COLD_START_DELAY: Duration = Duration::from_secs(10);

/// Labels only count when their score clears this floor.
const LABEL_CONFIDENCE_FLOOR: f64 = 0.70;

#[derive(Debug, Deserialize)]
struct Prediction {
    #[serde(default)]
    label: String,
    #[serde(default)]
    score: f64,
}

/// The endpoint returns either a prediction list or an error object.
#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum HfResponse {
    Failure { error: String },
    Predictions(Vec<Prediction>),
}

/// One round-trip outcome, before verdict normalization.
enum Fetch {
    Predictions(Vec<Prediction>),
    ColdStart,
    Timeout,
    Unexpected,
}

/// Fallback image provider backed by the HuggingFace inference API.
pub struct HfImageAdapter {
    client: reqwest::Client,
    token: SecretString,
    endpoint: String,
}

impl HfImageAdapter {
    pub fn new(token: SecretString) -> Self {
        Self {
            client: reqwest::Client::new(),
            token,
            endpoint: DEFAULT_ENDPOINT.to_string(),
        }
    }

    /// Override the API endpoint (for tests and self-hosted proxies).
    pub fn with_endpoint(mut self, endpoint: String) -> Self {
        self.endpoint = endpoint;
        self
    }

    async fn fetch_once(&self, data: &[u8]) -> Result<Fetch, ProviderError> {
        let response = match self
            .client
            .post(&self.endpoint)
            .timeout(ADAPTER_TIMEOUT)
            .header(
                "Authorization",
                format!("Bearer {}", self.token.expose_secret()),
            )
            .body(data.to_vec())
            .send()
            .await
        {
            Ok(response) => response,
            Err(err) if err.is_timeout() => return Ok(Fetch::Timeout),
            Err(err) => {
                return Err(ProviderError::RequestFailed {
                    service: SERVICE,
                    reason: err.to_string(),
                });
            }
        };

        let status = response.status();
        let body = match response.json::<HfResponse>().await {
            Ok(body) => body,
            Err(err) => {
                check_status(SERVICE, status)?;
                tracing::warn!(error = %err, "hf image endpoint returned an undecodable body");
                return Ok(Fetch::Unexpected);
            }
        };

        match body {
            // Cold starts arrive as an error object, typically alongside a
            // 503, so the body shape is inspected before the status code.
            HfResponse::Failure { error } if error.starts_with("Model") => Ok(Fetch::ColdStart),
            HfResponse::Failure { .. } => {
                check_status(SERVICE, status)?;
                Ok(Fetch::Unexpected)
            }
            HfResponse::Predictions(predictions) => Ok(Fetch::Predictions(predictions)),
        }
    }
}

#[async_trait]
impl DetectionProvider for HfImageAdapter {
    async fn analyze(&self, data: &[u8]) -> Result<AnalysisResult, ProviderError> {
        let outcome = with_retry(
            MAX_RETRIES,
            COLD_START_DELAY,
            || self.fetch_once(data),
            |outcome| matches!(outcome, Ok(Fetch::ColdStart)),
        )
        .await?;

        let degraded = |reason: &str| {
            Ok(AnalysisResult::uncertain(
                ModelId::HfImage,
                MediaType::Image,
                format!("HuggingFace Image: {reason}"),
            ))
        };

        match outcome {
            Fetch::Predictions(predictions) => match normalize(&predictions) {
                Some(result) => Ok(result),
                None => degraded("unexpected response format."),
            },
            Fetch::ColdStart => degraded("model is still loading, try again later."),
            Fetch::Timeout => degraded("request timed out, verdict is inconclusive."),
            Fetch::Unexpected => degraded("unexpected response format."),
        }
    }

    fn name(&self) -> &'static str {
        SERVICE
    }
}

/// Map the highest-scoring prediction onto a verdict. `None` when the
/// prediction list is empty.
fn normalize(predictions: &[Prediction]) -> Option<AnalysisResult> {
    let best = predictions
        .iter()
        .max_by(|a, b| a.score.total_cmp(&b.score))?;
    let label = best.label.to_uppercase();

    let verdict = if best.score > LABEL_CONFIDENCE_FLOOR {
        match label.as_str() {
            "FAKE" => Verdict::Fake,
            "REAL" => Verdict::Real,
            _ => Verdict::Uncertain,
        }
    } else {
        Verdict::Uncertain
    };

    Some(AnalysisResult {
        verdict,
        confidence: round4(best.score),
        model_used: ModelId::HfImage,
        explanation: format!(
            "HuggingFace Image: {} with {:.0}% confidence",
            label,
            best.score * 100.0
        ),
        media_type: MediaType::Image,
        processing_ms: 0,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn prediction(label: &str, score: f64) -> Prediction {
        Prediction {
            label: label.into(),
            score,
        }
    }

    #[test]
    fn test_fake_label_above_floor() {
        let result = normalize(&[prediction("FAKE", 0.91), prediction("REAL", 0.09)]).unwrap();
        assert_eq!(result.verdict, Verdict::Fake);
        assert_eq!(result.confidence, 0.91);
    }

    #[test]
    fn test_real_label_above_floor() {
        let result = normalize(&[prediction("Real", 0.88), prediction("Fake", 0.12)]).unwrap();
        assert_eq!(result.verdict, Verdict::Real);
    }

    #[test]
    fn test_floor_is_exclusive() {
        let result = normalize(&[prediction("FAKE", 0.70)]).unwrap();
        assert_eq!(result.verdict, Verdict::Uncertain);

        let result = normalize(&[prediction("FAKE", 0.700001)]).unwrap();
        assert_eq!(result.verdict, Verdict::Fake);
    }

    #[test]
    fn test_unknown_label_is_uncertain() {
        let result = normalize(&[prediction("ARTIFACT", 0.99)]).unwrap();
        assert_eq!(result.verdict, Verdict::Uncertain);
    }

    #[test]
    fn test_max_score_entry_wins() {
        let result = normalize(&[
            prediction("REAL", 0.40),
            prediction("FAKE", 0.85),
            prediction("REAL", 0.15),
        ])
        .unwrap();
        assert_eq!(result.verdict, Verdict::Fake);
        assert_eq!(result.confidence, 0.85);
    }

    #[test]
    fn test_empty_predictions_yield_none() {
        assert!(normalize(&[]).is_none());
    }

    #[test]
    fn test_cold_start_shape_parses_as_failure() {
        let body: HfResponse =
            serde_json::from_str(r#"{"error": "Model dima806/... is currently loading"}"#)
                .unwrap();
        assert!(matches!(body, HfResponse::Failure { error } if error.starts_with("Model")));
    }

    #[test]
    fn test_prediction_list_parses() {
        let body: HfResponse =
            serde_json::from_str(r#"[{"label": "FAKE", "score": 0.97}, {"label": "REAL", "score": 0.03}]"#)
                .unwrap();
        match body {
            HfResponse::Predictions(predictions) => {
                assert_eq!(predictions.len(), 2);
                assert_eq!(predictions[0].label, "FAKE");
            }
            HfResponse::Failure { .. } => panic!("expected predictions"),
        }
    }
}
