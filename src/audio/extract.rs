//! Audio extraction from finished recordings with ffmpeg.

use std::path::{Path, PathBuf};
use std::process::{Command, Stdio};
use std::time::{Duration, Instant};

use tracing::{debug, error};

use crate::error::{Error, Result};
use crate::media::{StderrTail, exit_reason};

const POLL_INTERVAL: Duration = Duration::from_millis(100);

/// Temporary WAV path next to the video (`<stem>_temp.wav`).
pub fn temp_wav_path(video: &Path) -> PathBuf {
    let stem = video
        .file_stem()
        .map_or_else(|| "audio".into(), |s| s.to_string_lossy().into_owned());
    video.with_file_name(format!("{stem}_temp.wav"))
}

/// Extract mono 16-bit PCM at `sample_rate` into a temporary WAV.
///
/// The ffmpeg process is killed if it runs longer than `timeout`.
pub fn extract_audio(video: &Path, sample_rate: u32, timeout: Duration) -> Result<PathBuf> {
    let output = temp_wav_path(video);
    let fail = |reason: String| Error::AudioExtract {
        path: video.to_path_buf(),
        reason,
    };

    let mut child = Command::new("ffmpeg")
        .arg("-i")
        .arg(video)
        .args(["-vn", "-acodec", "pcm_s16le", "-ar"])
        .arg(sample_rate.to_string())
        .args(["-ac", "1", "-y", "-loglevel", "error"])
        .arg(&output)
        .stdin(Stdio::null())
        .stdout(Stdio::null())
        .stderr(Stdio::piped())
        .spawn()
        .map_err(|source| Error::Spawn {
            program: "ffmpeg".to_string(),
            source,
        })?;

    let mut stderr = StderrTail::capture(&mut child);

    let deadline = Instant::now() + timeout;
    loop {
        if let Some(status) = child.try_wait()? {
            if status.success() {
                debug!("Extracted audio to {}", output.display());
                return Ok(output);
            }
            let reason = exit_reason(status, &stderr.finish());
            error!("Audio extraction failed: {reason}");
            return Err(fail(reason));
        }
        if Instant::now() >= deadline {
            error!("Audio extraction timed out for {}", video.display());
            let _ = child.kill();
            let _ = child.wait();
            let _ = std::fs::remove_file(&output);
            return Err(fail(format!("timed out after {}s", timeout.as_secs())));
        }
        std::thread::sleep(POLL_INTERVAL);
    }
}
