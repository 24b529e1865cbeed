//! V4L2 capture device driven through `ffmpeg`.

use std::path::Path;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Condvar, Mutex, PoisonError};
use std::thread::JoinHandle;
use std::time::Duration;

use image::RgbImage;
use tokio::sync::watch;
use tracing::{debug, error, info, warn};

use crate::config::CameraConfig;
use crate::constants::camera::{EXIT_TIMEOUT_SECS, PREVIEW_JPEG_QUALITY};
use crate::error::{Error, Result};
use crate::media::CaptureDevice;
use crate::media::ffmpeg::{RawVideoEncoder, RawVideoReader, downscale};
use crate::vision::{Frame, encode_jpeg};

/// Latest preview JPEG, `None` until the first frame is published.
pub type PreviewFeed = watch::Receiver<Option<Arc<Vec<u8>>>>;

const FRAME_WAIT: Duration = Duration::from_secs(2);

#[derive(Default)]
struct Latest {
    seq: u64,
    image: Option<RgbImage>,
    closed: bool,
}

struct Shared {
    latest: Mutex<Latest>,
    ready: Condvar,
    recorder: Mutex<Option<RawVideoEncoder>>,
    preview: AtomicBool,
    preview_tx: watch::Sender<Option<Arc<Vec<u8>>>>,
    lores_size: (u32, u32),
}

impl Shared {
    fn publish(&self, image: RgbImage) {
        {
            let mut recorder = self.recorder.lock().unwrap_or_else(PoisonError::into_inner);
            if let Some(encoder) = recorder.as_mut()
                && let Err(e) = encoder.write_frame(&image)
            {
                error!("Recording encoder failed: {e}");
                *recorder = None;
            }
        }

        if self.preview.load(Ordering::Relaxed) {
            let small = downscale(&image, self.lores_size);
            match encode_jpeg(&small, PREVIEW_JPEG_QUALITY) {
                Ok(jpeg) => {
                    self.preview_tx.send_replace(Some(Arc::new(jpeg)));
                }
                Err(e) => debug!("Preview encode failed: {e}"),
            }
        }

        let mut latest = self.latest.lock().unwrap_or_else(PoisonError::into_inner);
        latest.seq += 1;
        latest.image = Some(image);
        self.ready.notify_all();
    }

    fn close(&self) {
        let mut latest = self.latest.lock().unwrap_or_else(PoisonError::into_inner);
        latest.closed = true;
        self.ready.notify_all();
    }
}

/// Camera capture device.
///
/// A reader thread pulls full-resolution frames from the capture pipe,
/// feeds them to the active recording and preview, and keeps the latest
/// one for detection.
pub struct FfmpegDevice {
    config: CameraConfig,
    shared: Arc<Shared>,
    reader: Option<JoinHandle<()>>,
    stop_reader: Option<Arc<AtomicBool>>,
    last_seq: u64,
}

impl FfmpegDevice {
    /// Create an idle device.
    pub fn new(config: CameraConfig) -> Self {
        let (preview_tx, _) = watch::channel(None);
        let shared = Arc::new(Shared {
            latest: Mutex::new(Latest::default()),
            ready: Condvar::new(),
            recorder: Mutex::new(None),
            preview: AtomicBool::new(false),
            preview_tx,
            lores_size: config.lores_size,
        });
        Self {
            config,
            shared,
            reader: None,
            stop_reader: None,
            last_seq: 0,
        }
    }

    /// Subscribe to preview JPEGs.
    pub fn preview_feed(&self) -> PreviewFeed {
        self.shared.preview_tx.subscribe()
    }
}

impl CaptureDevice for FfmpegDevice {
    fn start(&mut self) -> Result<()> {
        if self.reader.is_some() {
            return Ok(());
        }
        let mut pipe =
            RawVideoReader::v4l2(&self.config.device, self.config.main_size, self.config.fps)?;

        *self.shared.latest.lock().unwrap_or_else(PoisonError::into_inner) = Latest::default();
        self.last_seq = 0;

        let stop = Arc::new(AtomicBool::new(false));
        let shared = Arc::clone(&self.shared);
        let stop_flag = Arc::clone(&stop);
        let reader = std::thread::Builder::new()
            .name("camera-reader".to_string())
            .spawn(move || {
                while !stop_flag.load(Ordering::Relaxed) {
                    match pipe.read_frame() {
                        Ok(Some(image)) => shared.publish(image),
                        Ok(None) => {
                            warn!("Capture stream ended");
                            break;
                        }
                        Err(e) => {
                            error!("Capture read failed: {e}");
                            break;
                        }
                    }
                }
                pipe.close();
                shared.close();
            })?;

        self.reader = Some(reader);
        self.stop_reader = Some(stop);
        info!(
            "Camera {} started at {}x{}",
            self.config.device, self.config.main_size.0, self.config.main_size.1
        );
        Ok(())
    }

    fn stop(&mut self) -> Result<()> {
        if let Some(stop) = self.stop_reader.take() {
            stop.store(true, Ordering::Relaxed);
        }
        if let Some(reader) = self.reader.take()
            && reader.join().is_err()
        {
            error!("Camera reader panicked");
        }
        info!("Camera stopped");
        Ok(())
    }

    fn start_recording(&mut self, path: &Path) -> Result<()> {
        let encoder = RawVideoEncoder::spawn(
            path,
            self.config.main_size,
            self.config.fps,
            Some(self.config.audio_device.as_str()),
        )?;
        let previous = self
            .shared
            .recorder
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .replace(encoder);
        if let Some(previous) = previous {
            warn!("Replacing an unfinished recording");
            let _ = previous.finish(Duration::from_secs(EXIT_TIMEOUT_SECS));
        }
        Ok(())
    }

    fn stop_recording(&mut self) -> Result<()> {
        let encoder = self
            .shared
            .recorder
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .take();
        match encoder {
            Some(encoder) => encoder.finish(Duration::from_secs(EXIT_TIMEOUT_SECS)),
            None => Ok(()),
        }
    }

    fn start_preview(&mut self) -> Result<()> {
        self.shared.preview.store(true, Ordering::Relaxed);
        debug!("Preview started");
        Ok(())
    }

    fn stop_preview(&mut self) -> Result<()> {
        self.shared.preview.store(false, Ordering::Relaxed);
        self.shared.preview_tx.send_replace(None);
        debug!("Preview stopped");
        Ok(())
    }

    fn capture_frame(&mut self) -> Result<Frame> {
        let latest = self.shared.latest.lock().unwrap_or_else(PoisonError::into_inner);
        let seen = self.last_seq;
        let (latest, timeout) = self
            .shared
            .ready
            .wait_timeout_while(latest, FRAME_WAIT, |l| l.seq == seen && !l.closed)
            .unwrap_or_else(PoisonError::into_inner);

        if latest.seq == seen {
            let reason = if latest.closed {
                "capture stream closed".to_string()
            } else if timeout.timed_out() {
                format!("no frame within {}s", FRAME_WAIT.as_secs())
            } else {
                "no frame available".to_string()
            };
            return Err(Error::MediaDevice { reason });
        }

        let image = latest
            .image
            .as_ref()
            .map(|image| downscale(image, self.config.lores_size))
            .ok_or_else(|| Error::MediaDevice {
                reason: "frame missing".to_string(),
            })?;
        self.last_seq = latest.seq;
        Ok(Frame::new(image))
    }
}

impl Drop for FfmpegDevice {
    fn drop(&mut self) {
        let _ = self.stop_recording();
        let _ = self.stop();
    }
}
