//! Episode decisions and track acceptance.

mod acceptance;
mod maker;

pub use acceptance::{AcceptedResult, DetectionSource, TrackDefect, accept_tracks, check_track};
pub use maker::DecisionMaker;
