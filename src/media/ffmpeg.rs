//! Raw video pipes to and from `ffmpeg`.

use std::ffi::OsString;
use std::io::{ErrorKind, Read, Write};
use std::path::Path;
use std::process::{Child, ChildStdin, ChildStdout, Command, ExitStatus, Stdio};
use std::sync::{Arc, Mutex};
use std::thread::JoinHandle;
use std::time::{Duration, Instant};

use image::RgbImage;
use image::imageops::{self, FilterType};
use tracing::{debug, warn};

use crate::constants::camera::RECORDING_AUDIO_SAMPLE_RATE;
use crate::error::{Error, Result};

const POLL_INTERVAL: Duration = Duration::from_millis(50);
const MAX_STDERR_BYTES: usize = 4096;

/// Tail of a child's stderr, drained on a background thread so the pipe
/// never fills up.
pub struct StderrTail {
    buffer: Arc<Mutex<Vec<u8>>>,
    reader: Option<JoinHandle<()>>,
}

impl StderrTail {
    /// Take `child`'s piped stderr and start draining it.
    pub fn capture(child: &mut Child) -> Self {
        let buffer = Arc::new(Mutex::new(Vec::new()));
        let reader = child.stderr.take().map(|mut stderr| {
            let buffer = Arc::clone(&buffer);
            std::thread::spawn(move || {
                let mut chunk = [0u8; 1024];
                while let Ok(n) = stderr.read(&mut chunk) {
                    if n == 0 {
                        break;
                    }
                    if let Ok(mut tail) = buffer.lock() {
                        tail.extend_from_slice(&chunk[..n]);
                        let excess = tail.len().saturating_sub(MAX_STDERR_BYTES);
                        tail.drain(..excess);
                    }
                }
            })
        });
        Self { buffer, reader }
    }

    /// Output collected so far.
    pub fn text(&self) -> String {
        self.buffer
            .lock()
            .map(|tail| String::from_utf8_lossy(&tail).trim().to_string())
            .unwrap_or_default()
    }

    /// Wait for the stream to close, then return everything collected.
    /// Only call once the child has exited.
    pub fn finish(&mut self) -> String {
        if let Some(reader) = self.reader.take()
            && reader.join().is_err()
        {
            debug!("stderr reader panicked");
        }
        self.text()
    }
}

/// Failure reason for an ffmpeg exit, with whatever it printed.
pub fn exit_reason(status: ExitStatus, stderr: &str) -> String {
    if stderr.is_empty() {
        format!("ffmpeg exited with {status}")
    } else {
        format!("ffmpeg exited with {status}: {stderr}")
    }
}

fn spawn(args: Vec<OsString>, stdin: Stdio, stdout: Stdio) -> Result<Child> {
    let line: Vec<_> = args.iter().map(|a| a.to_string_lossy()).collect();
    debug!("ffmpeg {}", line.join(" "));
    Command::new("ffmpeg")
        .args(args)
        .stdin(stdin)
        .stdout(stdout)
        .stderr(Stdio::piped())
        .spawn()
        .map_err(|source| Error::Spawn {
            program: "ffmpeg".to_string(),
            source,
        })
}

fn device_error(reason: impl Into<String>) -> Error {
    Error::MediaDevice {
        reason: reason.into(),
    }
}

/// Wait for `child` to exit, killing it after `timeout`.
fn wait_with_timeout(child: &mut Child, stderr: &mut StderrTail, timeout: Duration) -> Result<()> {
    let deadline = Instant::now() + timeout;
    loop {
        if let Some(status) = child.try_wait()? {
            if status.success() {
                return Ok(());
            }
            return Err(device_error(exit_reason(status, &stderr.finish())));
        }
        if Instant::now() >= deadline {
            warn!("ffmpeg did not exit within {}s, killing", timeout.as_secs());
            let _ = child.kill();
            let _ = child.wait();
            return Err(device_error("ffmpeg timed out"));
        }
        std::thread::sleep(POLL_INTERVAL);
    }
}

/// Resize to `size` unless the image already has it.
pub fn downscale(image: &RgbImage, size: (u32, u32)) -> RgbImage {
    if image.dimensions() == size {
        image.clone()
    } else {
        imageops::resize(image, size.0, size.1, FilterType::Triangle)
    }
}

/// Decoder producing packed RGB24 frames on stdout.
pub struct RawVideoReader {
    child: Child,
    stdout: ChildStdout,
    stderr: StderrTail,
    size: (u32, u32),
}

impl RawVideoReader {
    /// Capture from a V4L2 device.
    pub fn v4l2(device: &str, size: (u32, u32), fps: u32) -> Result<Self> {
        let input: Vec<OsString> = vec![
            "-f".into(),
            "v4l2".into(),
            "-framerate".into(),
            fps.to_string().into(),
            "-video_size".into(),
            format!("{}x{}", size.0, size.1).into(),
            "-i".into(),
            device.into(),
        ];
        Self::spawn(input, size)
    }

    /// Decode a video file.
    pub fn file(path: &Path, size: (u32, u32)) -> Result<Self> {
        let input: Vec<OsString> = vec!["-i".into(), path.as_os_str().to_owned()];
        Self::spawn(input, size)
    }

    fn spawn(input: Vec<OsString>, size: (u32, u32)) -> Result<Self> {
        let dimensions = format!("{}x{}", size.0, size.1);
        let mut args: Vec<OsString> = vec!["-loglevel".into(), "error".into()];
        args.extend(input);
        args.extend(
            [
                "-an",
                "-f",
                "rawvideo",
                "-pix_fmt",
                "rgb24",
                "-s",
                dimensions.as_str(),
                "pipe:1",
            ]
            .map(OsString::from),
        );

        let mut child = spawn(args, Stdio::null(), Stdio::piped())?;
        let stdout = child
            .stdout
            .take()
            .ok_or_else(|| device_error("ffmpeg stdout unavailable"))?;
        let stderr = StderrTail::capture(&mut child);
        Ok(Self {
            child,
            stdout,
            stderr,
            size,
        })
    }

    /// Read the next frame, or `None` at end of stream.
    pub fn read_frame(&mut self) -> Result<Option<RgbImage>> {
        let (width, height) = self.size;
        let mut buffer = vec![0u8; width as usize * height as usize * 3];
        match self.stdout.read_exact(&mut buffer) {
            Ok(()) => Ok(RgbImage::from_raw(width, height, buffer)),
            Err(e) if e.kind() == ErrorKind::UnexpectedEof => {
                let stderr = self.stderr.text();
                if !stderr.is_empty() {
                    warn!("ffmpeg decoder ended: {stderr}");
                }
                Ok(None)
            }
            Err(e) => Err(device_error(format!(
                "reading frames failed: {e} ({})",
                self.stderr.text()
            ))),
        }
    }

    /// Stop the decoder.
    pub fn close(mut self) {
        let _ = self.child.kill();
        let _ = self.child.wait();
    }
}

/// Encoder fed packed RGB24 frames on stdin.
pub struct RawVideoEncoder {
    child: Child,
    stdin: Option<ChildStdin>,
    stderr: StderrTail,
}

impl RawVideoEncoder {
    /// Start encoding `size` frames at `fps` into `path`, optionally muxing
    /// live audio from an ALSA device.
    pub fn spawn(
        path: &Path,
        size: (u32, u32),
        fps: u32,
        audio_device: Option<&str>,
    ) -> Result<Self> {
        let dimensions = format!("{}x{}", size.0, size.1);
        let rate = fps.to_string();
        let mut args: Vec<OsString> = [
            "-loglevel",
            "error",
            "-y",
            "-f",
            "rawvideo",
            "-pix_fmt",
            "rgb24",
            "-video_size",
            dimensions.as_str(),
            "-framerate",
            rate.as_str(),
            "-i",
            "pipe:0",
        ]
        .map(OsString::from)
        .to_vec();

        if let Some(device) = audio_device {
            let sample_rate = RECORDING_AUDIO_SAMPLE_RATE.to_string();
            args.extend(
                [
                    "-f",
                    "alsa",
                    "-ac",
                    "1",
                    "-ar",
                    sample_rate.as_str(),
                    "-i",
                    device,
                ]
                .map(OsString::from),
            );
        }

        args.extend(
            ["-c:v", "libx264", "-preset", "ultrafast", "-pix_fmt", "yuv420p"].map(OsString::from),
        );
        if audio_device.is_some() {
            args.extend(["-c:a", "aac", "-b:a", "128k", "-shortest"].map(OsString::from));
        }
        args.push(path.as_os_str().to_owned());

        let mut child = spawn(args, Stdio::piped(), Stdio::null())?;
        let stdin = child.stdin.take();
        let stderr = StderrTail::capture(&mut child);
        Ok(Self {
            child,
            stdin,
            stderr,
        })
    }

    /// Append one frame.
    pub fn write_frame(&mut self, frame: &RgbImage) -> Result<()> {
        let stdin = self
            .stdin
            .as_mut()
            .ok_or_else(|| device_error("encoder input closed"))?;
        stdin.write_all(frame.as_raw()).map_err(|e| {
            device_error(format!("encoder write failed: {e} ({})", self.stderr.text()))
        })
    }

    /// Close the input and wait for the file to be finalized.
    pub fn finish(mut self, timeout: Duration) -> Result<()> {
        drop(self.stdin.take());
        wait_with_timeout(&mut self.child, &mut self.stderr, timeout)
    }
}

/// Parse an ffprobe rate such as `30000/1001` or `25`.
pub fn parse_frame_rate(raw: &str) -> Option<f64> {
    let raw = raw.trim();
    let rate = match raw.split_once('/') {
        Some((num, den)) => {
            let num: f64 = num.trim().parse().ok()?;
            let den: f64 = den.trim().parse().ok()?;
            if den == 0.0 {
                return None;
            }
            num / den
        }
        None => raw.parse().ok()?,
    };
    (rate.is_finite() && rate > 0.0).then_some(rate)
}

/// Frame rate of the first video stream of `path`.
pub fn probe_frame_rate(path: &Path) -> Result<f64> {
    let output = Command::new("ffprobe")
        .args([
            "-v",
            "error",
            "-select_streams",
            "v:0",
            "-show_entries",
            "stream=r_frame_rate",
            "-of",
            "default=noprint_wrappers=1:nokey=1",
        ])
        .arg(path)
        .output()
        .map_err(|source| Error::Spawn {
            program: "ffprobe".to_string(),
            source,
        })?;

    let text = String::from_utf8_lossy(&output.stdout);
    parse_frame_rate(&text)
        .ok_or_else(|| device_error(format!("no frame rate for {}", path.display())))
}
