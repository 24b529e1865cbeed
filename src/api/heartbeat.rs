//! Background heartbeat keeping one activity-log record fresh.

use std::time::Duration;

use tokio::sync::watch;
use tokio::task::JoinHandle;
use tracing::{debug, warn};

use super::ApiClient;
use crate::constants::backend::HEARTBEAT_RETRY_SECS;

/// Heartbeat record contents.
pub fn heartbeat_data(host: Option<&str>) -> serde_json::Value {
    match host {
        Some(host) => serde_json::json!({ "status": "up", "host": host }),
        None => serde_json::json!({ "status": "up" }),
    }
}

fn local_hostname() -> Option<String> {
    match hostname::get() {
        Ok(name) => Some(name.to_string_lossy().into_owned()),
        Err(e) => {
            warn!("Could not read hostname: {e}");
            None
        }
    }
}

/// Spawn the heartbeat loop on the current runtime.
///
/// The first successful call returns a record id that every later call
/// reuses. Failures retry with a doubling delay capped at `interval`. The
/// loop ends when `stop` flips to `true`.
pub fn spawn_heartbeat(
    client: ApiClient,
    interval: Duration,
    mut stop: watch::Receiver<bool>,
) -> JoinHandle<()> {
    let data = heartbeat_data(local_hostname().as_deref());
    tokio::spawn(async move {
        let mut id: Option<i64> = None;
        let mut retry_delay = Duration::from_secs(HEARTBEAT_RETRY_SECS).min(interval);

        loop {
            let wait = match client.activity_log("heartbeat", data.clone(), id).await {
                Ok(returned) => {
                    id = returned.or(id);
                    debug!("Heartbeat sent (id: {id:?})");
                    retry_delay = Duration::from_secs(HEARTBEAT_RETRY_SECS).min(interval);
                    interval
                }
                Err(e) => {
                    warn!("Heartbeat failed: {e}; retrying in {retry_delay:?}");
                    let wait = retry_delay;
                    retry_delay = (retry_delay * 2).min(interval);
                    wait
                }
            };

            tokio::select! {
                () = tokio::time::sleep(wait) => {}
                changed = stop.changed() => {
                    if changed.is_err() || *stop.borrow() {
                        debug!("Heartbeat stopped");
                        return;
                    }
                }
            }
        }
    })
}
