//! Synchronous reporting facade used by the episode loop.

use tokio::runtime::Handle;
use tracing::debug;

use super::{ApiClient, VideoPayload};
use crate::error::Result;

/// Outbound reporting collaborator.
///
/// Callers log failures and carry on; no report aborts an episode.
pub trait Reporter: Send {
    /// Motion started an episode.
    fn notify_motion(&self) -> Result<()>;

    /// Early species decision.
    fn notify_species(&self, species: &str) -> Result<()>;

    /// Finished episode with accepted detections.
    fn create_video(&self, payload: &VideoPayload) -> Result<()>;

    /// Publish the regional list; returns the backend's active names, if any.
    fn set_active_species(&self, names: &[String]) -> Result<Option<Vec<String>>>;
}

/// [`Reporter`] backed by [`ApiClient`], blocking on a runtime handle.
pub struct BackendReporter {
    client: ApiClient,
    runtime: Handle,
}

impl BackendReporter {
    /// Wrap a client. Must be called from outside the runtime's worker threads.
    pub fn new(client: ApiClient, runtime: Handle) -> Self {
        Self { client, runtime }
    }
}

impl Reporter for BackendReporter {
    fn notify_motion(&self) -> Result<()> {
        self.runtime.block_on(self.client.notify_motion())
    }

    fn notify_species(&self, species: &str) -> Result<()> {
        self.runtime.block_on(self.client.notify_species(species))
    }

    fn create_video(&self, payload: &VideoPayload) -> Result<()> {
        self.runtime
            .block_on(self.client.create_video(payload))
            .map(drop)
    }

    fn set_active_species(&self, names: &[String]) -> Result<Option<Vec<String>>> {
        self.runtime.block_on(self.client.set_active_species(names))
    }
}

/// [`Reporter`] used when no backend is configured; logs and succeeds.
#[derive(Debug, Default, Clone, Copy)]
pub struct OfflineReporter;

impl Reporter for OfflineReporter {
    fn notify_motion(&self) -> Result<()> {
        debug!("Offline: motion");
        Ok(())
    }

    fn notify_species(&self, species: &str) -> Result<()> {
        debug!("Offline: species {species}");
        Ok(())
    }

    fn create_video(&self, payload: &VideoPayload) -> Result<()> {
        debug!(
            "Offline: video {} with {} species",
            payload.video_path,
            payload.species.len()
        );
        Ok(())
    }

    fn set_active_species(&self, _names: &[String]) -> Result<Option<Vec<String>>> {
        Ok(None)
    }
}
