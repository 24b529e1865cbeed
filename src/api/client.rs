//! Async HTTP client for the feeder backend.

use std::time::Duration;

use reqwest::Method;
use serde::Serialize;
use serde::de::DeserializeOwned;
use tracing::{debug, error, warn};

use super::types::{ActiveSpeciesResponse, ActivityLogRequest, ActivityLogResponse};
use super::VideoPayload;
use crate::constants::backend::RETRY_BASE_DELAY_MS;
use crate::error::{Error, Result};

/// Backend REST client with per-request timeout and transport retries.
#[derive(Debug, Clone)]
pub struct ApiClient {
    client: reqwest::Client,
    base_url: String,
    max_retries: u32,
    retry_base_delay: Duration,
}

impl ApiClient {
    /// Create a client for `base_url`.
    pub fn new(base_url: &str, timeout: Duration, max_retries: u32) -> Result<Self> {
        let base_url = base_url.trim_end_matches('/').to_string();
        if base_url.is_empty() {
            return Err(Error::ApiUrlMissing);
        }
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .user_agent(concat!("feedercam/", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(|source| Error::ApiRequest {
                url: base_url.clone(),
                source,
            })?;
        Ok(Self {
            client,
            base_url,
            max_retries: max_retries.max(1),
            retry_base_delay: Duration::from_millis(RETRY_BASE_DELAY_MS),
        })
    }

    /// Override the first backoff delay.
    #[must_use]
    pub fn with_retry_base_delay(mut self, delay: Duration) -> Self {
        self.retry_base_delay = delay;
        self
    }

    /// Base URL without a trailing slash.
    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn url(&self, endpoint: &str) -> String {
        format!("{}/{}", self.base_url, endpoint.trim_start_matches('/'))
    }

    async fn send_once<B: Serialize + ?Sized>(
        &self,
        method: Method,
        url: &str,
        body: &B,
    ) -> Result<reqwest::Response> {
        let response = self
            .client
            .request(method, url)
            .json(body)
            .send()
            .await
            .map_err(|source| Error::ApiRequest {
                url: url.to_string(),
                source,
            })?;
        let status = response.status();
        if !status.is_success() {
            return Err(Error::ApiStatus {
                url: url.to_string(),
                status: status.as_u16(),
            });
        }
        Ok(response)
    }

    /// Send a JSON request, retrying timeouts and connection errors with exponential backoff.
    async fn send<B: Serialize + ?Sized>(
        &self,
        method: Method,
        endpoint: &str,
        body: &B,
    ) -> Result<reqwest::Response> {
        let url = self.url(endpoint);
        let mut attempt = 0;
        loop {
            attempt += 1;
            match self.send_once(method.clone(), &url, body).await {
                Ok(response) => return Ok(response),
                Err(e) if e.is_transient() && attempt < self.max_retries => {
                    let delay = self.retry_base_delay * 2u32.saturating_pow(attempt - 1);
                    warn!(
                        "API request failed (attempt {attempt}/{}) for {url}: {e}; retrying in {delay:?}",
                        self.max_retries
                    );
                    tokio::time::sleep(delay).await;
                }
                Err(e) => {
                    error!("API request failed for {url}: {e}");
                    return Err(e);
                }
            }
        }
    }

    async fn send_json<B: Serialize + ?Sized, T: DeserializeOwned>(
        &self,
        method: Method,
        endpoint: &str,
        body: &B,
    ) -> Result<T> {
        let url = self.url(endpoint);
        self.send(method, endpoint, body)
            .await?
            .json()
            .await
            .map_err(|source| Error::ApiRequest { url, source })
    }

    /// Announce that motion started an episode.
    pub async fn notify_motion(&self) -> Result<()> {
        self.send(Method::POST, "notify/motion", &serde_json::json!({}))
            .await
            .map(drop)
    }

    /// Announce an early species decision.
    pub async fn notify_species(&self, species: &str) -> Result<()> {
        self.send(
            Method::POST,
            "notify/detections",
            &serde_json::json!({ "detection": species }),
        )
        .await
        .map(drop)
    }

    /// Create the video record for a finished episode.
    pub async fn create_video(&self, payload: &VideoPayload) -> Result<serde_json::Value> {
        debug!("Creating video record for {}", payload.video_path);
        self.send_json(Method::POST, "videos", payload).await
    }

    /// Publish the regional species list; returns the names the backend marks active.
    pub async fn set_active_species(&self, names: &[String]) -> Result<Option<Vec<String>>> {
        let response: ActiveSpeciesResponse =
            self.send_json(Method::PUT, "species/active", names).await?;
        Ok(response.active_feeder_names)
    }

    /// Upsert an activity log record. Pass the previously returned id to update it.
    pub async fn activity_log(
        &self,
        kind: &str,
        data: serde_json::Value,
        id: Option<i64>,
    ) -> Result<Option<i64>> {
        let request = ActivityLogRequest { kind, data, id };
        let response: ActivityLogResponse =
            self.send_json(Method::POST, "activity_log", &request).await?;
        Ok(response.id)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_url_joins_without_double_slash() {
        let client = ApiClient::new("http://backend:8085/api/", Duration::from_secs(1), 3).unwrap();
        assert_eq!(client.base_url(), "http://backend:8085/api");
        assert_eq!(client.url("/videos"), "http://backend:8085/api/videos");
    }

    #[test]
    fn test_empty_base_url_rejected() {
        assert!(matches!(
            ApiClient::new("", Duration::from_secs(1), 3),
            Err(Error::ApiUrlMissing)
        ));
    }

    #[tokio::test]
    async fn test_connection_refused_is_retried_then_fails() {
        let client = ApiClient::new("http://127.0.0.1:9", Duration::from_millis(200), 2)
            .unwrap()
            .with_retry_base_delay(Duration::from_millis(1));
        let err = client.notify_motion().await.unwrap_err();
        assert!(err.is_transient());
    }
}
