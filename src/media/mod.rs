//! External media-processing collaborators and frame splitting.
//!
//! ffprobe and ffmpeg are invoked as external processes over pipes with
//! captured stdout/stderr; a non-zero exit code is treated as failure.
//! Frame splitting is a pure byte scan and lives in-process.

mod frames;
mod probe;
mod transcode;

pub use frames::split_jpeg_stream;
pub use probe::probe_duration;
pub use transcode::{is_ogg, ogg_to_wav, sample_frames};

use std::process::Stdio;

use tokio::io::AsyncWriteExt;
use tokio::process::Command;

/// Run an external tool feeding `input` to stdin and capturing both
/// output pipes.
///
/// stdin is fed from a separate task so a full stdout pipe cannot
/// deadlock the child while it is still reading input.
pub(crate) async fn run_with_stdin(
    program: &str,
    args: &[&str],
    input: &[u8],
) -> std::io::Result<std::process::Output> {
    let mut child = Command::new(program)
        .args(args)
        .stdin(Stdio::piped())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .spawn()?;

    if let Some(mut stdin) = child.stdin.take() {
        let payload = input.to_vec();
        tokio::spawn(async move {
            let _ = stdin.write_all(&payload).await;
            let _ = stdin.shutdown().await;
        });
    }

    child.wait_with_output().await
}
