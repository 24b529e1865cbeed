//! Media source contract used by the episode loop.

use std::path::Path;

use crate::error::Result;
use crate::vision::Frame;

/// Camera-like source of frames that can record to a file.
pub trait MediaSource: Send {
    /// Begin writing a recording to `path`.
    fn start_recording(&mut self, path: &Path) -> Result<()>;

    /// Finish the current recording.
    fn stop_recording(&mut self) -> Result<()>;

    /// Next detection frame, or `None` at end of stream.
    fn capture(&mut self) -> Result<Option<Frame>>;

    /// Release the hardware. Further calls are errors.
    fn close(&mut self) -> Result<()>;
}

/// Hardware driven by the camera worker thread.
///
/// All methods are called from the worker thread only.
pub trait CaptureDevice: Send {
    /// Start streaming frames.
    fn start(&mut self) -> Result<()>;

    /// Stop streaming frames.
    fn stop(&mut self) -> Result<()>;

    /// Start encoding streamed frames into `path`.
    fn start_recording(&mut self, path: &Path) -> Result<()>;

    /// Finish the current recording file.
    fn stop_recording(&mut self) -> Result<()>;

    /// Begin publishing preview JPEGs.
    fn start_preview(&mut self) -> Result<()>;

    /// Stop publishing preview JPEGs.
    fn stop_preview(&mut self) -> Result<()>;

    /// Block until the next detection-resolution frame is available.
    fn capture_frame(&mut self) -> Result<Frame>;
}
