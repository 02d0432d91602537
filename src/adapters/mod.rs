//! Provider adapters for external detection services.
//!
//! Each adapter wraps a single HTTP round trip against one third-party
//! detection API and normalizes its raw score/label response into an
//! [`AnalysisResult`] using provider-specific thresholds:
//! - SightEngine (image, primary)
//! - HuggingFace image inference (image, fallback)
//! - Resemble Detect (audio, primary)
//! - HuggingFace audio inference (audio, fallback)
//! - Sapling AI (text)
//!
//! Shared contract: a network timeout degrades to an UNCERTAIN result
//! (never an error); HTTP 429 and 5xx surface as typed
//! [`ProviderError`]s so the router can decide whether to fail over;
//! an unexpected response shape degrades to UNCERTAIN, never a crash.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::StatusCode;

use crate::error::ProviderError;
use crate::types::AnalysisResult;

mod hf_audio;
mod hf_image;
mod resemble;
mod retry;
mod sapling;
mod sightengine;

pub use hf_audio::HfAudioAdapter;
pub use hf_image::HfImageAdapter;
pub use resemble::ResembleAdapter;
pub use retry::with_retry;
pub use sapling::SaplingAdapter;
pub use sightengine::SightengineAdapter;

/// Per-call timeout for every provider HTTP request.
pub const ADAPTER_TIMEOUT: Duration = Duration::from_secs(15);

/// Capability interface for one external detection service.
///
/// Every implementation returns an [`AnalysisResult`] or a typed
/// [`ProviderError`], never a null-ish value. The router selects
/// implementations per media type as an ordered (primary, fallback) chain.
#[async_trait]
pub trait DetectionProvider: Send + Sync {
    /// Analyze raw content bytes and produce a verdict.
    async fn analyze(&self, data: &[u8]) -> Result<AnalysisResult, ProviderError>;

    /// Stable identifier of the provider, used in logs and error tags.
    fn name(&self) -> &'static str;
}

/// Map 429/5xx statuses to typed provider errors.
pub(crate) fn check_status(service: &'static str, status: StatusCode) -> Result<(), ProviderError> {
    if status == StatusCode::TOO_MANY_REQUESTS {
        return Err(ProviderError::RateLimited { service });
    }
    if status.is_server_error() {
        return Err(ProviderError::ServerError {
            service,
            status: status.as_u16(),
        });
    }
    Ok(())
}
