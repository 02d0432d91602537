//! Media router: classify inbound content and dispatch it to the
//! right provider chain.
//!
//! Type resolution order (first match wins): non-empty text content,
//! declared MIME type, filename extension. Routing policy per type:
//! image falls back on provider error, audio falls back on error or on
//! an UNCERTAIN primary verdict (with a merge rule), video delegates to
//! the frame pipeline, text goes straight to the text provider.

use std::path::Path;
use std::sync::Arc;

use crate::adapters::{
    DetectionProvider, HfAudioAdapter, HfImageAdapter, ResembleAdapter, SaplingAdapter,
    SightengineAdapter,
};
use crate::config::Settings;
use crate::error::AnalysisError;
use crate::types::{AnalysisResult, MediaType, Verdict, round4};
use crate::video::VideoPipeline;

/// Dispatches analysis requests to ordered provider chains per media type.
pub struct MediaRouter {
    image_primary: Arc<dyn DetectionProvider>,
    image_fallback: Arc<dyn DetectionProvider>,
    audio_primary: Arc<dyn DetectionProvider>,
    audio_fallback: Arc<dyn DetectionProvider>,
    text: Arc<dyn DetectionProvider>,
    video: VideoPipeline,
}

impl MediaRouter {
    /// Wire the production provider chains from settings.
    pub fn from_settings(settings: &Settings) -> Self {
        let image_primary: Arc<dyn DetectionProvider> = Arc::new(SightengineAdapter::new(
            settings.sightengine_api_user.clone(),
            settings.sightengine_api_secret.clone(),
        ));
        let image_fallback: Arc<dyn DetectionProvider> =
            Arc::new(HfImageAdapter::new(settings.hf_api_token.clone()));
        let audio_primary: Arc<dyn DetectionProvider> =
            Arc::new(ResembleAdapter::new(settings.resemble_api_key.clone()));
        let audio_fallback: Arc<dyn DetectionProvider> =
            Arc::new(HfAudioAdapter::new(settings.hf_api_token.clone()));
        let text: Arc<dyn DetectionProvider> =
            Arc::new(SaplingAdapter::new(settings.sapling_api_key.clone()));

        Self::with_providers(
            image_primary,
            image_fallback,
            audio_primary,
            audio_fallback,
            text,
            settings.max_video_duration_secs,
            settings.frame_sample_rate,
        )
    }

    /// Assemble a router from explicit provider chains. Tests inject
    /// mock providers here; the video pipeline shares the image chain.
    #[allow(clippy::too_many_arguments)]
    pub fn with_providers(
        image_primary: Arc<dyn DetectionProvider>,
        image_fallback: Arc<dyn DetectionProvider>,
        audio_primary: Arc<dyn DetectionProvider>,
        audio_fallback: Arc<dyn DetectionProvider>,
        text: Arc<dyn DetectionProvider>,
        max_video_duration_secs: u64,
        frame_sample_rate: u32,
    ) -> Self {
        let video = VideoPipeline::new(
            Arc::clone(&image_primary),
            Arc::clone(&image_fallback),
            max_video_duration_secs,
            frame_sample_rate,
        );
        Self {
            image_primary,
            image_fallback,
            audio_primary,
            audio_fallback,
            text,
            video,
        }
    }

    /// Determine the media type from MIME type, file extension, or text
    /// content. Text content wins unconditionally, even when a file was
    /// also attached.
    pub fn detect_type(
        content_type: Option<&str>,
        filename: Option<&str>,
        text_content: &str,
    ) -> Result<MediaType, AnalysisError> {
        if !text_content.trim().is_empty() {
            return Ok(MediaType::Text);
        }

        if let Some(mime) = content_type
            && let Some(media_type) = media_type_from_mime(mime)
        {
            return Ok(media_type);
        }

        if let Some(name) = filename
            && let Some(ext) = Path::new(name).extension()
            && let Some(media_type) = media_type_from_extension(&ext.to_string_lossy())
        {
            return Ok(media_type);
        }

        Err(AnalysisError::UnsupportedMediaType)
    }

    /// Route content to the provider chain for its media type.
    pub async fn route(
        &self,
        media_type: MediaType,
        data: &[u8],
        text_content: &str,
    ) -> Result<AnalysisResult, AnalysisError> {
        tracing::debug!(%media_type, bytes = data.len(), "routing analysis request");

        match media_type {
            MediaType::Image => match self.image_primary.analyze(data).await {
                Ok(result) => Ok(result),
                Err(err) => {
                    tracing::warn!(error = %err, "primary image provider failed, falling back");
                    Ok(self.image_fallback.analyze(data).await?)
                }
            },

            MediaType::Audio => match self.audio_primary.analyze(data).await {
                Ok(primary) if primary.verdict == Verdict::Uncertain => {
                    tracing::debug!("primary audio verdict uncertain, consulting fallback");
                    let fallback = self.audio_fallback.analyze(data).await?;
                    Ok(merge_uncertain(primary, fallback))
                }
                Ok(primary) => Ok(primary),
                Err(err) => {
                    tracing::warn!(error = %err, "primary audio provider failed, falling back");
                    Ok(self.audio_fallback.analyze(data).await?)
                }
            },

            MediaType::Video => self.video.analyze(data).await,

            MediaType::Text => {
                let payload: &[u8] = if text_content.is_empty() {
                    data
                } else {
                    text_content.as_bytes()
                };
                Ok(self.text.analyze(payload).await?)
            }
        }
    }
}

/// Merge an UNCERTAIN primary result with its fallback: a decisive
/// fallback wins outright; two UNCERTAIN results average their
/// confidences and concatenate both explanations.
fn merge_uncertain(primary: AnalysisResult, fallback: AnalysisResult) -> AnalysisResult {
    if fallback.verdict != Verdict::Uncertain {
        return fallback;
    }
    AnalysisResult {
        verdict: Verdict::Uncertain,
        confidence: round4((primary.confidence + fallback.confidence) / 2.0),
        model_used: primary.model_used,
        explanation: format!(
            "{}\n---\nFallback: {}",
            primary.explanation, fallback.explanation
        ),
        media_type: primary.media_type,
        processing_ms: 0,
    }
}

fn media_type_from_mime(mime: &str) -> Option<MediaType> {
    match mime {
        "image/jpeg" | "image/png" | "image/webp" | "image/gif" => Some(MediaType::Image),
        "audio/ogg" | "audio/mpeg" | "audio/mp3" | "audio/wav" | "audio/x-wav" => {
            Some(MediaType::Audio)
        }
        "video/mp4" | "video/avi" | "video/quicktime" | "video/x-matroska" => {
            Some(MediaType::Video)
        }
        _ => None,
    }
}

fn media_type_from_extension(ext: &str) -> Option<MediaType> {
    match ext.to_lowercase().as_str() {
        "jpg" | "jpeg" | "png" | "webp" => Some(MediaType::Image),
        "mp3" | "ogg" | "wav" | "m4a" => Some(MediaType::Audio),
        "mp4" | "avi" | "mov" | "mkv" => Some(MediaType::Video),
        _ => None,
    }
}
