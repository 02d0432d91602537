//! Core verdict model shared by every adapter and the router.

use serde::{Deserialize, Serialize};

/// Final judgment on the authenticity of a piece of content.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Verdict {
    /// Content appears genuine.
    Real,
    /// Content appears AI-generated or synthetic.
    Fake,
    /// No confident call either way.
    Uncertain,
}

impl std::fmt::Display for Verdict {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Real => write!(f, "REAL"),
            Self::Fake => write!(f, "FAKE"),
            Self::Uncertain => write!(f, "UNCERTAIN"),
        }
    }
}

/// Kind of content being analyzed. Determined once per request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MediaType {
    Image,
    Audio,
    Video,
    Text,
}

impl std::fmt::Display for MediaType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Image => write!(f, "image"),
            Self::Audio => write!(f, "audio"),
            Self::Video => write!(f, "video"),
            Self::Text => write!(f, "text"),
        }
    }
}

/// Identifier of the provider or pipeline that produced a result.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ModelId {
    Sightengine,
    #[serde(rename = "sightengine_video_pipeline")]
    SightengineVideo,
    #[serde(rename = "resemble_detect")]
    Resemble,
    Sapling,
    #[serde(rename = "hf_image_inference")]
    HfImage,
    #[serde(rename = "hf_audio_inference")]
    HfAudio,
    FallbackUncertain,
}

impl std::fmt::Display for ModelId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Sightengine => write!(f, "sightengine"),
            Self::SightengineVideo => write!(f, "sightengine_video_pipeline"),
            Self::Resemble => write!(f, "resemble_detect"),
            Self::Sapling => write!(f, "sapling"),
            Self::HfImage => write!(f, "hf_image_inference"),
            Self::HfAudio => write!(f, "hf_audio_inference"),
            Self::FallbackUncertain => write!(f, "fallback_uncertain"),
        }
    }
}

/// Outcome of one analysis request.
///
/// Immutable after construction except for `processing_ms`, which the
/// caller fills in with wall-clock latency once the result returns.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AnalysisResult {
    pub verdict: Verdict,
    /// Fakeness confidence in [0, 1], rounded to 4 decimal places.
    pub confidence: f64,
    pub model_used: ModelId,
    /// Human-readable rationale for the verdict.
    pub explanation: String,
    pub media_type: MediaType,
    /// Wall-clock latency in milliseconds, set by the caller. Defaults to 0.
    #[serde(default)]
    pub processing_ms: u64,
}

impl AnalysisResult {
    /// Build an UNCERTAIN result with a flat 0.5 confidence.
    ///
    /// This is the degraded outcome adapters return instead of failing on
    /// timeouts, cold-start exhaustion, and malformed provider responses.
    pub fn uncertain(
        model: ModelId,
        media_type: MediaType,
        explanation: impl Into<String>,
    ) -> Self {
        Self {
            verdict: Verdict::Uncertain,
            confidence: 0.5,
            model_used: model,
            explanation: explanation.into(),
            media_type,
            processing_ms: 0,
        }
    }
}

/// Round a confidence score to 4 decimal places.
pub(crate) fn round4(value: f64) -> f64 {
    (value * 10_000.0).round() / 10_000.0
}
