//! Settings loaded from the environment / `.env` file.

use secrecy::SecretString;

use crate::error::ConfigError;

/// Default maximum accepted video duration, in seconds.
pub const DEFAULT_MAX_VIDEO_DURATION_SECS: u64 = 60;

/// Default video frame sampling rate, in frames per second.
pub const DEFAULT_FRAME_SAMPLE_RATE: u32 = 1;

/// Credentials and tunables for the detection core.
///
/// Credentials are held as [`SecretString`] so they never leak through
/// `Debug` output or accidental serialization. Empty credentials are
/// allowed; the corresponding provider will simply fail authentication
/// at call time.
#[derive(Clone)]
pub struct Settings {
    pub sightengine_api_user: String,
    pub sightengine_api_secret: SecretString,
    pub resemble_api_key: SecretString,
    pub sapling_api_key: SecretString,
    pub hf_api_token: SecretString,

    /// Videos longer than this are rejected before frame extraction.
    pub max_video_duration_secs: u64,
    /// Frames sampled per second of video.
    pub frame_sample_rate: u32,
}

impl Settings {
    /// Load settings from environment variables, consulting a `.env`
    /// file when present.
    pub fn from_env() -> Result<Self, ConfigError> {
        dotenvy::dotenv().ok();

        Ok(Self {
            sightengine_api_user: env_or("SIGHTENGINE_API_USER", ""),
            sightengine_api_secret: SecretString::from(env_or("SIGHTENGINE_API_SECRET", "")),
            resemble_api_key: SecretString::from(env_or("RESEMBLE_API_KEY", "")),
            sapling_api_key: SecretString::from(env_or("SAPLING_API_KEY", "")),
            hf_api_token: SecretString::from(env_or("HF_API_TOKEN", "")),
            max_video_duration_secs: parse_env(
                "MAX_VIDEO_DURATION_SECONDS",
                DEFAULT_MAX_VIDEO_DURATION_SECS,
            )?,
            frame_sample_rate: parse_env("VIDEO_FRAME_SAMPLE_RATE", DEFAULT_FRAME_SAMPLE_RATE)?,
        })
    }
}

fn env_or(key: &str, default: &str) -> String {
    std::env::var(key).unwrap_or_else(|_| default.to_string())
}

fn parse_env<T: std::str::FromStr>(key: &str, default: T) -> Result<T, ConfigError>
where
    T::Err: std::fmt::Display,
{
    match std::env::var(key) {
        Ok(raw) => raw.parse().map_err(|e: T::Err| ConfigError::InvalidValue {
            key: key.to_string(),
            message: e.to_string(),
        }),
        Err(_) => Ok(default),
    }
}
