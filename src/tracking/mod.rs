//! Per-episode track bookkeeping.

mod processor;
mod track;

pub use processor::FrameProcessor;
pub use track::{FramePosition, Track, TrackSet, best_frame_score};
