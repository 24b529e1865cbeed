//! Frame sources: the camera hardware worker and file replay.

mod camera;
mod ffmpeg;
mod preview;
mod source;
mod video_file;
mod worker;

pub use camera::{FfmpegDevice, PreviewFeed};
pub use ffmpeg::{StderrTail, downscale, exit_reason, parse_frame_rate};
pub use preview::{part_header, serve_preview, spawn_preview_server, stream_header};
pub use source::{CaptureDevice, MediaSource};
pub use video_file::{VideoFileSource, frames_to_advance};
pub use worker::{CameraSource, FrameReply, WorkerCommand, WorkerHandle};
