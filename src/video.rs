//! Video analysis pipeline: frame extraction plus concurrent per-frame
//! image classification and temporal aggregation.
//!
//! Provider selection is batch-level: the first frame is probed with the
//! primary image provider, and if the probe fails with a typed provider
//! error the whole batch (probe frame included) is re-run against the
//! fallback provider. After that commitment, individual frame failures
//! are swallowed; a failed frame contributes no score rather than
//! aborting the batch.

use std::sync::Arc;

use futures::future::join_all;
use tokio::sync::Semaphore;

use crate::adapters::DetectionProvider;
use crate::error::AnalysisError;
use crate::media::{probe_duration, sample_frames, split_jpeg_stream};
use crate::types::{AnalysisResult, MediaType, ModelId, Verdict, round4};

/// Hard cap on accepted video byte size.
pub const MAX_VIDEO_FILE_SIZE: usize = 50 * 1024 * 1024;

/// Maximum provider requests in flight during the frame fan-out.
const CONCURRENT_FRAME_LIMIT: usize = 5;

/// Frame scores at or above this count as fake frames.
const FRAME_FAKE_THRESHOLD: f64 = 0.75;
/// Frame scores at or below this count as real frames.
const FRAME_REAL_THRESHOLD: f64 = 0.35;
/// Verdict is FAKE when at least this share of scored frames is fake.
const FAKE_RATIO_FAKE: f64 = 0.40;
/// Verdict is REAL when at most this share of scored frames is fake.
const FAKE_RATIO_REAL: f64 = 0.10;

/// Frame-level video analysis over the image provider chain.
pub struct VideoPipeline {
    primary: Arc<dyn DetectionProvider>,
    fallback: Arc<dyn DetectionProvider>,
    max_duration_secs: u64,
    frame_sample_rate: u32,
}

impl VideoPipeline {
    pub fn new(
        primary: Arc<dyn DetectionProvider>,
        fallback: Arc<dyn DetectionProvider>,
        max_duration_secs: u64,
        frame_sample_rate: u32,
    ) -> Self {
        Self {
            primary,
            fallback,
            max_duration_secs,
            frame_sample_rate,
        }
    }

    /// Analyze a whole video: validate size and duration, extract sampled
    /// frames, then classify and aggregate them.
    ///
    /// Both validation checks run before any network call; the duration
    /// check runs before extraction and fails independently of it.
    pub async fn analyze(&self, data: &[u8]) -> Result<AnalysisResult, AnalysisError> {
        if data.len() > MAX_VIDEO_FILE_SIZE {
            return Err(AnalysisError::FileTooLarge {
                size: data.len(),
                max: MAX_VIDEO_FILE_SIZE,
            });
        }

        let duration = probe_duration(data).await?;
        if duration > self.max_duration_secs as f64 {
            return Err(AnalysisError::VideoTooLong {
                duration,
                max: self.max_duration_secs,
            });
        }

        let stream = sample_frames(data, self.frame_sample_rate).await?;
        let frames = split_jpeg_stream(&stream);
        Ok(self.analyze_frames(&frames).await)
    }

    /// Classify already-extracted frames and aggregate their scores.
    ///
    /// Never fails: an empty batch or a batch where every frame errored
    /// degrades to an UNCERTAIN result with an explanatory message.
    pub async fn analyze_frames(&self, frames: &[Vec<u8>]) -> AnalysisResult {
        let Some(probe_frame) = frames.first() else {
            return AnalysisResult::uncertain(
                ModelId::SightengineVideo,
                MediaType::Video,
                "Could not extract frames from the video.",
            );
        };

        // Probe with the primary; a typed error commits the whole batch
        // to the fallback provider.
        let (provider, probe_score) = match self.primary.analyze(probe_frame).await {
            Ok(result) => (Arc::clone(&self.primary), Some(result.confidence)),
            Err(err) => {
                tracing::warn!(
                    error = %err,
                    "primary frame provider unavailable, switching batch to fallback"
                );
                (Arc::clone(&self.fallback), None)
            }
        };

        let remaining = if probe_score.is_some() {
            &frames[1..]
        } else {
            frames
        };

        let semaphore = Arc::new(Semaphore::new(CONCURRENT_FRAME_LIMIT));
        let tasks = remaining.iter().map(|frame| {
            let semaphore = Arc::clone(&semaphore);
            let provider = Arc::clone(&provider);
            async move {
                let _permit = semaphore.acquire().await.ok()?;
                match provider.analyze(frame).await {
                    Ok(result) => Some(result.confidence),
                    Err(err) => {
                        tracing::debug!(error = %err, "frame analysis failed, frame skipped");
                        None
                    }
                }
            }
        });

        let mut scores: Vec<f64> = join_all(tasks).await.into_iter().flatten().collect();
        scores.extend(probe_score);

        if scores.is_empty() {
            return AnalysisResult::uncertain(
                ModelId::SightengineVideo,
                MediaType::Video,
                "Could not analyze any video frames.",
            );
        }

        aggregate(&scores)
    }
}

/// Fold per-frame fakeness scores into one temporal verdict.
fn aggregate(scores: &[f64]) -> AnalysisResult {
    let total = scores.len();
    let fake: Vec<f64> = scores
        .iter()
        .copied()
        .filter(|s| *s >= FRAME_FAKE_THRESHOLD)
        .collect();
    let real: Vec<f64> = scores
        .iter()
        .copied()
        .filter(|s| *s <= FRAME_REAL_THRESHOLD)
        .collect();
    let fake_ratio = fake.len() as f64 / total as f64;

    let (verdict, confidence) = if fake_ratio >= FAKE_RATIO_FAKE {
        (Verdict::Fake, mean(&fake).unwrap_or(0.5))
    } else if fake_ratio <= FAKE_RATIO_REAL {
        (Verdict::Real, 1.0 - mean(&real).unwrap_or(0.5))
    } else {
        (Verdict::Uncertain, 0.5)
    };

    AnalysisResult {
        verdict,
        confidence: round4(confidence),
        model_used: ModelId::SightengineVideo,
        explanation: format!(
            "Video analysis: {} frames checked. Suspicious: {}, authentic: {}. Suspicious share: {:.0}%.",
            total,
            fake.len(),
            real.len(),
            fake_ratio * 100.0
        ),
        media_type: MediaType::Video,
        processing_ms: 0,
    }
}

fn mean(values: &[f64]) -> Option<f64> {
    if values.is_empty() {
        None
    } else {
        Some(values.iter().sum::<f64>() / values.len() as f64)
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicUsize, Ordering};

    use async_trait::async_trait;

    use super::*;
    use crate::error::ProviderError;

    enum Script {
        /// Per-call confidences, indexed by call order.
        Scores(Vec<f64>),
        AlwaysError,
    }

    struct ScriptedProvider {
        calls: AtomicUsize,
        script: Script,
    }

    impl ScriptedProvider {
        fn scores(scores: Vec<f64>) -> Arc<Self> {
            Arc::new(Self {
                calls: AtomicUsize::new(0),
                script: Script::Scores(scores),
            })
        }

        fn erroring() -> Arc<Self> {
            Arc::new(Self {
                calls: AtomicUsize::new(0),
                script: Script::AlwaysError,
            })
        }

        fn call_count(&self) -> usize {
            self.calls.load(Ordering::SeqCst)
        }
    }

    #[async_trait]
    impl DetectionProvider for ScriptedProvider {
        async fn analyze(&self, _data: &[u8]) -> Result<AnalysisResult, ProviderError> {
            let n = self.calls.fetch_add(1, Ordering::SeqCst);
            match &self.script {
                Script::Scores(scores) => Ok(AnalysisResult {
                    verdict: Verdict::Uncertain,
                    confidence: scores[n % scores.len()],
                    model_used: ModelId::Sightengine,
                    explanation: String::new(),
                    media_type: MediaType::Image,
                    processing_ms: 0,
                }),
                Script::AlwaysError => Err(ProviderError::RateLimited { service: "mock" }),
            }
        }

        fn name(&self) -> &'static str {
            "mock"
        }
    }

    fn pipeline(
        primary: &Arc<ScriptedProvider>,
        fallback: &Arc<ScriptedProvider>,
    ) -> VideoPipeline {
        VideoPipeline::new(
            Arc::clone(primary) as Arc<dyn DetectionProvider>,
            Arc::clone(fallback) as Arc<dyn DetectionProvider>,
            60,
            1,
        )
    }

    fn frames(count: usize) -> Vec<Vec<u8>> {
        vec![vec![0xFF, 0xD8, 0xFF, 0xD9]; count]
    }

    #[test]
    fn test_aggregate_fake_majority() {
        // 2 of 5 frames at or above 0.75 -> ratio 0.4 -> FAKE, confidence
        // is the mean of the fake-labeled frames.
        let result = aggregate(&[0.9, 0.8, 0.2, 0.1, 0.3]);
        assert_eq!(result.verdict, Verdict::Fake);
        assert_eq!(result.confidence, 0.85);
        assert!(result.explanation.contains("5 frames"));
    }

    #[test]
    fn test_aggregate_real_majority() {
        let result = aggregate(&[0.1, 0.2, 0.05, 0.3]);
        assert_eq!(result.verdict, Verdict::Real);
        // 1 - mean(0.1, 0.2, 0.05, 0.3)
        assert_eq!(result.confidence, round4(1.0 - 0.1625));
    }

    #[test]
    fn test_aggregate_mixed_is_uncertain() {
        let result = aggregate(&[0.8, 0.5, 0.5, 0.5]);
        assert_eq!(result.verdict, Verdict::Uncertain);
        assert_eq!(result.confidence, 0.5);
    }

    #[test]
    fn test_mean() {
        assert_eq!(mean(&[0.9, 0.8]), Some(0.85));
        assert_eq!(mean(&[]), None);
    }

    #[tokio::test]
    async fn test_empty_batch_is_uncertain_without_any_adapter_call() {
        let primary = ScriptedProvider::scores(vec![0.9]);
        let fallback = ScriptedProvider::scores(vec![0.9]);
        let result = pipeline(&primary, &fallback).analyze_frames(&[]).await;

        assert_eq!(result.verdict, Verdict::Uncertain);
        assert_eq!(result.model_used, ModelId::SightengineVideo);
        assert_eq!(primary.call_count(), 0);
        assert_eq!(fallback.call_count(), 0);
    }

    #[tokio::test]
    async fn test_primary_serves_whole_batch_when_probe_succeeds() {
        let primary = ScriptedProvider::scores(vec![0.9, 0.8, 0.2, 0.1, 0.3]);
        let fallback = ScriptedProvider::scores(vec![0.0]);
        let result = pipeline(&primary, &fallback)
            .analyze_frames(&frames(5))
            .await;

        assert_eq!(result.verdict, Verdict::Fake);
        assert_eq!(result.confidence, 0.85);
        assert_eq!(primary.call_count(), 5);
        assert_eq!(fallback.call_count(), 0);
    }

    #[tokio::test]
    async fn test_probe_failure_switches_whole_batch_to_fallback() {
        let primary = ScriptedProvider::erroring();
        let fallback = ScriptedProvider::scores(vec![0.9, 0.8, 0.2, 0.1, 0.3]);
        let result = pipeline(&primary, &fallback)
            .analyze_frames(&frames(5))
            .await;

        assert_eq!(result.verdict, Verdict::Fake);
        assert_eq!(result.confidence, 0.85);
        assert_eq!(primary.call_count(), 1);
        assert_eq!(fallback.call_count(), 5);
    }

    #[tokio::test]
    async fn test_all_frames_failing_degrades_to_uncertain() {
        let primary = ScriptedProvider::erroring();
        let fallback = ScriptedProvider::erroring();
        let result = pipeline(&primary, &fallback)
            .analyze_frames(&frames(3))
            .await;

        assert_eq!(result.verdict, Verdict::Uncertain);
        assert!(result.explanation.contains("Could not analyze"));
        assert_eq!(primary.call_count(), 1);
        assert_eq!(fallback.call_count(), 3);
    }

    #[tokio::test]
    async fn test_oversized_video_rejected_before_probing() {
        let primary = ScriptedProvider::scores(vec![0.9]);
        let fallback = ScriptedProvider::scores(vec![0.9]);
        let data = vec![0u8; MAX_VIDEO_FILE_SIZE + 1];
        let err = pipeline(&primary, &fallback).analyze(&data).await.unwrap_err();

        assert!(matches!(err, AnalysisError::FileTooLarge { .. }));
        assert_eq!(primary.call_count(), 0);
    }
}
