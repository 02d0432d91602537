//! veriscan: multi-provider AI-generated media detection core.
//!
//! Classifies inbound content (image, audio, video, text), dispatches it
//! to an ordered chain of external detection providers, normalizes their
//! heterogeneous score/label responses into one verdict model. For video
//! it samples frames and aggregates per-frame scores into a single
//! temporal verdict.
//!
//! This crate is the in-process core only: the chat front end, HTTP
//! plumbing, and persistence live with the embedding application.
//!
//! ```no_run
//! use veriscan::{MediaRouter, Settings};
//!
//! # async fn run() -> Result<(), veriscan::Error> {
//! # let image_bytes: Vec<u8> = Vec::new();
//! let settings = Settings::from_env()?;
//! let router = MediaRouter::from_settings(&settings);
//!
//! let media_type = MediaRouter::detect_type(Some("image/png"), Some("photo.png"), "")?;
//! let result = router.route(media_type, &image_bytes, "").await?;
//! println!("{}: {}", result.verdict, result.explanation);
//! # Ok(())
//! # }
//! ```

pub mod adapters;
pub mod config;
pub mod error;
pub mod media;
pub mod router;
pub mod types;
pub mod video;

pub use adapters::DetectionProvider;
pub use config::Settings;
pub use error::{AnalysisError, ConfigError, Error, ProviderError};
pub use router::MediaRouter;
pub use types::{AnalysisResult, MediaType, ModelId, Verdict};
pub use video::VideoPipeline;
