//! Error types for veriscan.

/// Top-level error type for the crate.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("Analysis error: {0}")]
    Analysis(#[from] AnalysisError),

    #[error("Provider error: {0}")]
    Provider(#[from] ProviderError),
}

/// Configuration-related errors.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Invalid configuration value for {key}: {message}")]
    InvalidValue { key: String, message: String },
}

/// Errors surfaced by the routing/aggregation pipeline.
///
/// Input-validation variants are raised before any network call; the
/// `Provider` variant wraps typed failures from external detection
/// services and drives fallback decisions in the router.
#[derive(Debug, thiserror::Error)]
pub enum AnalysisError {
    #[error("Unsupported media type")]
    UnsupportedMediaType,

    #[error("File too large: {size} bytes exceeds {max} byte limit")]
    FileTooLarge { size: usize, max: usize },

    #[error("Video too long: {duration:.0}s exceeds {max}s limit")]
    VideoTooLong { duration: f64, max: u64 },

    #[error(transparent)]
    Provider(#[from] ProviderError),
}

/// Typed failures from an external detection provider.
///
/// A network timeout is deliberately NOT represented here: adapters
/// absorb timeouts into an UNCERTAIN result so callers never see a hung
/// request, only a degraded verdict.
#[derive(Debug, thiserror::Error)]
pub enum ProviderError {
    #[error("{service} rate limited")]
    RateLimited { service: &'static str },

    #[error("{service} server error (HTTP {status})")]
    ServerError { service: &'static str, status: u16 },

    #[error("{service} request failed: {reason}")]
    RequestFailed { service: &'static str, reason: String },

    #[error("{service} rejected the request: {reason}")]
    Rejected { service: &'static str, reason: String },

    #[error("Audio conversion failed: {reason}")]
    ConversionFailed { reason: String },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_provider_error_display() {
        let err = ProviderError::RateLimited {
            service: "sightengine",
        };
        assert_eq!(err.to_string(), "sightengine rate limited");

        let err = ProviderError::ServerError {
            service: "resemble",
            status: 502,
        };
        assert_eq!(err.to_string(), "resemble server error (HTTP 502)");
    }

    #[test]
    fn test_analysis_error_display() {
        let err = AnalysisError::FileTooLarge {
            size: 100,
            max: 50,
        };
        assert_eq!(
            err.to_string(),
            "File too large: 100 bytes exceeds 50 byte limit"
        );

        let err = AnalysisError::VideoTooLong {
            duration: 75.0,
            max: 60,
        };
        assert_eq!(err.to_string(), "Video too long: 75s exceeds 60s limit");
    }

    #[test]
    fn test_provider_error_converts_to_analysis_error() {
        let err: AnalysisError = ProviderError::RateLimited {
            service: "sapling",
        }
        .into();
        assert!(matches!(err, AnalysisError::Provider(_)));
    }
}
