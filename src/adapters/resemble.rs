//! Resemble Detect adapter for audio deepfake detection (primary).

use async_trait::async_trait;
use secrecy::{ExposeSecret, SecretString};
use serde::Deserialize;

use crate::adapters::{ADAPTER_TIMEOUT, DetectionProvider, check_status};
use crate::error::ProviderError;
use crate::media::{is_ogg, ogg_to_wav};
use crate::types::{AnalysisResult, MediaType, ModelId, Verdict, round4};

const SERVICE: &str = "resemble";
const DEFAULT_ENDPOINT: &str = "https://detect.resemble.ai/api/v1/detect";

/// FAKE at or above this synthetic-speech score.
const FAKE_THRESHOLD: f64 = 0.75;
/// REAL at or below this synthetic-speech score.
const REAL_THRESHOLD: f64 = 0.30;

#[derive(Debug, Deserialize)]
struct DetectResponse {
    #[serde(default)]
    success: bool,
    #[serde(default)]
    score: Option<f64>,
}

/// Primary audio provider. Ogg input is converted to PCM WAV first;
/// conversion failure here is fatal for the call (the fallback adapter
/// is more lenient).
pub struct ResembleAdapter {
    client: reqwest::Client,
    api_key: SecretString,
    endpoint: String,
}

impl ResembleAdapter {
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
impl DetectionProvider for ResembleAdapter {
    async fn analyze(&self, data: &[u8]) -> Result<AnalysisResult, ProviderError> {
        let wav = if is_ogg(data) {
            ogg_to_wav(data).await?
        } else {
            data.to_vec()
        };

        let audio = reqwest::multipart::Part::bytes(wav)
            .file_name("audio.wav")
            .mime_str("audio/wav")
            .map_err(|e| ProviderError::RequestFailed {
                service: SERVICE,
                reason: e.to_string(),
            })?;
        let form = reqwest::multipart::Form::new().part("audio_file", audio);

        let response = match self
            .client
            .post(&self.endpoint)
            .timeout(ADAPTER_TIMEOUT)
            .header(
                "Authorization",
                format!("Token {}", self.api_key.expose_secret()),
            )
            .multipart(form)
            .send()
            .await
        {
            Ok(response) => response,
            Err(err) if err.is_timeout() => {
                return Ok(AnalysisResult::uncertain(
                    ModelId::Resemble,
                    MediaType::Audio,
                    "Resemble Detect: request timed out, verdict is inconclusive.",
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

        let body: DetectResponse = match response.json().await {
            Ok(body) => body,
            Err(err) => {
                tracing::warn!(error = %err, "resemble returned an undecodable body");
                return Ok(AnalysisResult::uncertain(
                    ModelId::Resemble,
                    MediaType::Audio,
                    "Resemble Detect: unexpected response format.",
                ));
            }
        };

        if !body.success {
            return Err(ProviderError::Rejected {
                service: SERVICE,
                reason: "API returned success=false".into(),
            });
        }

        Ok(normalize(body.score.unwrap_or(0.5)))
    }

    fn name(&self) -> &'static str {
        SERVICE
    }
}

fn normalize(score: f64) -> AnalysisResult {
    AnalysisResult {
        verdict: verdict_from_score(score),
        confidence: round4(score),
        model_used: ModelId::Resemble,
        explanation: format!(
            "Resemble Detect: synthetic speech probability {:.0}%",
            score * 100.0
        ),
        media_type: MediaType::Audio,
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
        assert_eq!(verdict_from_score(0.74), Verdict::Uncertain);
        assert_eq!(verdict_from_score(0.30), Verdict::Real);
        assert_eq!(verdict_from_score(0.300001), Verdict::Uncertain);
    }

    #[test]
    fn test_normalize_sets_audio_fields() {
        let result = normalize(0.82);
        assert_eq!(result.verdict, Verdict::Fake);
        assert_eq!(result.model_used, ModelId::Resemble);
        assert_eq!(result.media_type, MediaType::Audio);
        assert!(result.explanation.contains("82%"));
    }

    #[test]
    fn test_parse_detect_response() {
        let body: DetectResponse =
            serde_json::from_str(r#"{"success": true, "score": 0.12}"#).unwrap();
        assert!(body.success);
        assert_eq!(body.score, Some(0.12));
    }

    #[test]
    fn test_parse_failure_response() {
        let body: DetectResponse = serde_json::from_str(r#"{"success": false}"#).unwrap();
        assert!(!body.success);
        assert_eq!(body.score, None);
    }
}
