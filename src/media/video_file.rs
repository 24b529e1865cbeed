//! Replay of a recorded video file as a media source.

use std::path::{Path, PathBuf};
use std::time::{Duration, Instant};

use tracing::{debug, info, warn};

use crate::clock::SharedClock;
use crate::constants::camera::{DEFAULT_FPS, EXIT_TIMEOUT_SECS};
use crate::error::{Error, Result};
use crate::media::MediaSource;
use crate::media::ffmpeg::{RawVideoEncoder, RawVideoReader, downscale, probe_frame_rate};
use crate::vision::Frame;

/// Frames to advance after `elapsed` at `fps`, at least one.
#[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
pub fn frames_to_advance(elapsed: Duration, fps: f64) -> u64 {
    let frames = (elapsed.as_secs_f64() * fps).floor();
    if frames.is_finite() && frames >= 1.0 {
        frames as u64
    } else {
        1
    }
}

/// Plays a video file at wall-clock speed.
///
/// Each capture skips ahead by the frames that would have been shown since
/// the previous capture. Skipped frames are still written to the active
/// recording so it keeps real-time length.
pub struct VideoFileSource {
    path: PathBuf,
    main_size: (u32, u32),
    lores_size: (u32, u32),
    fps: f64,
    reader: Option<RawVideoReader>,
    recorder: Option<RawVideoEncoder>,
    clock: SharedClock,
    last_capture: Option<Instant>,
    finished: bool,
}

impl VideoFileSource {
    /// Open `path`, decoding at `main_size` and delivering `lores_size` frames.
    pub fn open(
        path: &Path,
        main_size: (u32, u32),
        lores_size: (u32, u32),
        clock: SharedClock,
    ) -> Result<Self> {
        if !path.is_file() {
            return Err(Error::MediaDevice {
                reason: format!("video file not found: {}", path.display()),
            });
        }
        let fps = probe_frame_rate(path).unwrap_or_else(|e| {
            warn!("{e}; assuming {DEFAULT_FPS} fps");
            f64::from(DEFAULT_FPS)
        });
        let reader = RawVideoReader::file(path, main_size)?;
        info!("Replaying {} at {fps:.2} fps", path.display());

        Ok(Self {
            path: path.to_path_buf(),
            main_size,
            lores_size,
            fps,
            reader: Some(reader),
            recorder: None,
            clock,
            last_capture: None,
            finished: false,
        })
    }

    /// Source frame rate.
    pub const fn fps(&self) -> f64 {
        self.fps
    }

    #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
    fn output_fps(&self) -> u32 {
        self.fps.round().max(1.0) as u32
    }
}

impl MediaSource for VideoFileSource {
    fn start_recording(&mut self, path: &Path) -> Result<()> {
        if let Some(previous) = self.recorder.take() {
            let _ = previous.finish(Duration::from_secs(EXIT_TIMEOUT_SECS));
        }
        self.recorder = Some(RawVideoEncoder::spawn(
            path,
            self.main_size,
            self.output_fps(),
            None,
        )?);
        self.last_capture = None;
        debug!("Recording replay of {} to {}", self.path.display(), path.display());
        Ok(())
    }

    fn stop_recording(&mut self) -> Result<()> {
        match self.recorder.take() {
            Some(encoder) => encoder.finish(Duration::from_secs(EXIT_TIMEOUT_SECS)),
            None => Ok(()),
        }
    }

    fn capture(&mut self) -> Result<Option<Frame>> {
        if self.finished {
            return Ok(None);
        }
        let Some(reader) = self.reader.as_mut() else {
            return Err(Error::MediaChannelClosed);
        };

        let now = self.clock.now();
        let advance = self
            .last_capture
            .map_or(1, |last| frames_to_advance(now.saturating_duration_since(last), self.fps));
        self.last_capture = Some(now);

        let mut last = None;
        for _ in 0..advance {
            let Some(image) = reader.read_frame()? else {
                break;
            };
            if let Some(recorder) = self.recorder.as_mut() {
                recorder.write_frame(&image)?;
            }
            last = Some(image);
        }

        match last {
            Some(image) => Ok(Some(Frame::new(downscale(&image, self.lores_size)))),
            None => {
                info!("End of {}", self.path.display());
                self.finished = true;
                Ok(None)
            }
        }
    }

    fn close(&mut self) -> Result<()> {
        let stopped = self.stop_recording();
        if let Some(reader) = self.reader.take() {
            reader.close();
        }
        stopped
    }
}

impl Drop for VideoFileSource {
    fn drop(&mut self) {
        let _ = self.close();
    }
}
