//! Detection strategies and the detector capabilities they wrap.

mod backend;
mod filter;
mod labels;
mod remote;
mod single_stage;
mod strategy;
mod tracker;
mod two_stage;
mod types;

pub use backend::{ObjectDetector, PresenceTracker, SpeciesClassifier, TrackingDetector};
pub use filter::CandidateFilter;
pub use labels::{RegionalFilter, normalize_class_name};
pub use remote::{RemoteClassifier, RemoteDetector};
pub use single_stage::SingleStageStrategy;
pub use strategy::DetectionStrategy;
pub use tracker::IouTracker;
pub use two_stage::TwoStageStrategy;
pub use types::{Detection, RawBox, TrackedBox};
