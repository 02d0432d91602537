//! Media duration probe (ffprobe collaborator).

use crate::error::ProviderError;

use super::run_with_stdin;

/// Get the media duration in seconds by piping the bytes through
/// ffprobe.
///
/// Unparsable probe output is treated as a zero duration with a
/// warning, never an error; the caller's duration limit then simply
/// does not trigger.
pub async fn probe_duration(data: &[u8]) -> Result<f64, ProviderError> {
    let output = run_with_stdin(
        "ffprobe",
        &[
            "-v",
            "error",
            "-show_entries",
            "format=duration",
            "-of",
            "default=noprint_wrappers=1:nokey=1",
            "-i",
            "pipe:0",
        ],
        data,
    )
    .await
    .map_err(|e| ProviderError::ConversionFailed {
        reason: format!("failed to run ffprobe: {e}"),
    })?;

    match String::from_utf8_lossy(&output.stdout).trim().parse::<f64>() {
        Ok(duration) => Ok(duration),
        Err(_) => {
            tracing::warn!("could not determine media duration, assuming 0");
            Ok(0.0)
        }
    }
}
