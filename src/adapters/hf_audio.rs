//! HuggingFace audio deepfake detection, the fallback audio adapter.
//!
//! Same wire shape and cold-start retry policy as the image fallback,
//! with anti-spoofing labels (`spoof` / `bonafide`). Ogg conversion is
//! best-effort: when it fails the original bytes are sent anyway.

use std::time::Duration;

use async_trait::async_trait;
use secrecy::{ExposeSecret, SecretString};
use serde::Deserialize;

use crate::adapters::{ADAPTER_TIMEOUT, DetectionProvider, check_status, with_retry};
use crate::error::ProviderError;
use crate::media::{is_ogg, ogg_to_wav};
use crate::types::{AnalysisResult, MediaType, ModelId, Verdict, round4};

const SERVICE: &str = "hf_audio";
const DEFAULT_ENDPOINT: &str =
    "https://api-inference.huggingface.co/models/mo-gg/wav2vec2-large-xlsr-deepfake-detection";

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

#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum HfResponse {
    Failure { error: String },
    Predictions(Vec<Prediction>),
}

enum Fetch {
    Predictions(Vec<Prediction>),
    ColdStart,
    Timeout,
    Unexpected,
}

/// Fallback audio provider backed by the HuggingFace inference API.
pub struct HfAudioAdapter {
    client: reqwest::Client,
    token: SecretString,
    endpoint: String,
}

impl HfAudioAdapter {
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
                tracing::warn!(error = %err, "hf audio endpoint returned an undecodable body");
                return Ok(Fetch::Unexpected);
            }
        };

        match body {
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
impl DetectionProvider for HfAudioAdapter {
    async fn analyze(&self, data: &[u8]) -> Result<AnalysisResult, ProviderError> {
        let payload = if is_ogg(data) {
            match ogg_to_wav(data).await {
                Ok(wav) => wav,
                Err(err) => {
                    tracing::warn!(error = %err, "audio conversion failed, sending original bytes");
                    data.to_vec()
                }
            }
        } else {
            data.to_vec()
        };

        let outcome = with_retry(
            MAX_RETRIES,
            COLD_START_DELAY,
            || self.fetch_once(&payload),
            |outcome| matches!(outcome, Ok(Fetch::ColdStart)),
        )
        .await?;

        let degraded = |reason: &str| {
            Ok(AnalysisResult::uncertain(
                ModelId::HfAudio,
                MediaType::Audio,
                format!("HuggingFace Audio: {reason}"),
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

/// Map the highest-scoring anti-spoofing prediction onto a verdict.
fn normalize(predictions: &[Prediction]) -> Option<AnalysisResult> {
    let best = predictions
        .iter()
        .max_by(|a, b| a.score.total_cmp(&b.score))?;
    let label = best.label.to_lowercase();

    let verdict = if best.score > LABEL_CONFIDENCE_FLOOR {
        match label.as_str() {
            "spoof" => Verdict::Fake,
            "bonafide" => Verdict::Real,
            _ => Verdict::Uncertain,
        }
    } else {
        Verdict::Uncertain
    };

    Some(AnalysisResult {
        verdict,
        confidence: round4(best.score),
        model_used: ModelId::HfAudio,
        explanation: format!(
            "HuggingFace Audio: {} with {:.0}% confidence",
            label,
            best.score * 100.0
        ),
        media_type: MediaType::Audio,
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
    fn test_spoof_maps_to_fake() {
        let result = normalize(&[prediction("spoof", 0.93), prediction("bonafide", 0.07)]).unwrap();
        assert_eq!(result.verdict, Verdict::Fake);
        assert_eq!(result.media_type, MediaType::Audio);
    }

    #[test]
    fn test_bonafide_maps_to_real() {
        let result = normalize(&[prediction("BONAFIDE", 0.89)]).unwrap();
        assert_eq!(result.verdict, Verdict::Real);
    }

    #[test]
    fn test_low_score_is_uncertain() {
        let result = normalize(&[prediction("spoof", 0.60), prediction("bonafide", 0.40)]).unwrap();
        assert_eq!(result.verdict, Verdict::Uncertain);
    }

    #[test]
    fn test_unknown_label_is_uncertain() {
        let result = normalize(&[prediction("noise", 0.95)]).unwrap();
        assert_eq!(result.verdict, Verdict::Uncertain);
    }

    #[test]
    fn test_empty_predictions_yield_none() {
        assert!(normalize(&[]).is_none());
    }

    #[test]
    fn test_cold_start_shape_parses_as_failure() {
        let body: HfResponse =
            serde_json::from_str(r#"{"error": "Model mo-gg/... is currently loading"}"#).unwrap();
        assert!(matches!(body, HfResponse::Failure { error } if error.starts_with("Model")));
    }
}
