//! Audio transcoding and video frame sampling (ffmpeg collaborator).

use crate::error::ProviderError;

use super::run_with_stdin;

/// Ogg container signature. Telegram-style voice messages arrive in
/// Ogg and must be converted before providers that expect WAV.
const OGG_MAGIC: &[u8; 4] = b"OggS";

/// Whether the bytes look like an Ogg container.
pub fn is_ogg(data: &[u8]) -> bool {
    data.starts_with(OGG_MAGIC)
}

/// Convert compressed Ogg audio to PCM WAV, entirely in memory.
pub async fn ogg_to_wav(data: &[u8]) -> Result<Vec<u8>, ProviderError> {
    let output = run_with_stdin(
        "ffmpeg",
        &["-i", "pipe:0", "-f", "wav", "-acodec", "pcm_s16le", "pipe:1"],
        data,
    )
    .await
    .map_err(|e| ProviderError::ConversionFailed {
        reason: format!("failed to run ffmpeg: {e}"),
    })?;

    if !output.status.success() {
        tracing::error!(
            stderr = %String::from_utf8_lossy(&output.stderr),
            "ffmpeg OGG->WAV conversion failed"
        );
        return Err(ProviderError::ConversionFailed {
            reason: "ffmpeg exited with an error during OGG->WAV conversion".into(),
        });
    }
    Ok(output.stdout)
}

/// Decode a video byte stream into a concatenated MJPEG still-image
/// stream, sampled at `fps` frames per second.
pub async fn sample_frames(data: &[u8], fps: u32) -> Result<Vec<u8>, ProviderError> {
    let filter = format!("fps={fps}");
    let output = run_with_stdin(
        "ffmpeg",
        &[
            "-i",
            "pipe:0",
            "-vf",
            filter.as_str(),
            "-f",
            "image2",
            "-vcodec",
            "mjpeg",
            "pipe:1",
        ],
        data,
    )
    .await
    .map_err(|e| ProviderError::ConversionFailed {
        reason: format!("failed to run ffmpeg: {e}"),
    })?;

    if !output.status.success() {
        tracing::error!(
            stderr = %String::from_utf8_lossy(&output.stderr),
            "ffmpeg frame sampling failed"
        );
        return Err(ProviderError::ConversionFailed {
            reason: "ffmpeg exited with an error during frame sampling".into(),
        });
    }
    Ok(output.stdout)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_is_ogg_detects_signature() {
        assert!(is_ogg(b"OggS\x00\x02rest-of-stream"));
    }

    #[test]
    fn test_is_ogg_rejects_other_containers() {
        assert!(!is_ogg(b"RIFF....WAVE"));
        assert!(!is_ogg(b"ID3\x04"));
        assert!(!is_ogg(b""));
        assert!(!is_ogg(b"Og"));
    }
}
