//! Feeder backend reporting.

mod client;
mod heartbeat;
mod reporter;
mod types;

pub use client::ApiClient;
pub use heartbeat::{heartbeat_data, spawn_heartbeat};
pub use reporter::{BackendReporter, OfflineReporter, Reporter};
pub use types::{SpeciesEntry, VideoPayload};
