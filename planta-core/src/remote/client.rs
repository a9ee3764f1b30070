//! HTTP client for the remote plant store.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::{Client, RequestBuilder, Response};
use serde_json::Value;

use super::error::RemoteError;
use super::protocol::{ErrorBody, NewPlant, PlantListing, RemotePlant};
use super::RemoteStore;

/// Remote store reached over its REST API.
///
/// `base_url` is the API root, e.g. `http://localhost:5000/api`.
#[derive(Debug, Clone)]
pub struct HttpRemoteStore {
    base_url: String,
    client: Client,
}

impl HttpRemoteStore {
    /// Creates a client with no request timeout.
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            base_url: normalize_base_url(base_url.into()),
            client: Client::new(),
        }
    }

    /// Creates a client whose requests give up after `timeout`.
    pub fn with_timeout(
        base_url: impl Into<String>,
        timeout: Option<Duration>,
    ) -> Result<Self, RemoteError> {
        let mut builder = Client::builder();
        if let Some(timeout) = timeout {
            builder = builder.timeout(timeout);
        }
        let client = builder
            .build()
            .map_err(|e| RemoteError::Transport(e.to_string()))?;

        Ok(Self {
            base_url: normalize_base_url(base_url.into()),
            client,
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    async fn send(&self, request: RequestBuilder) -> Result<Response, RemoteError> {
        let response = request.send().await?;

        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }

        let body = response.text().await.unwrap_or_default();
        let message = serde_json::from_str::<ErrorBody>(&body)
            .map(|b| b.message)
            .unwrap_or(body);

        Err(RemoteError::Rejected {
            status: status.as_u16(),
            message,
        })
    }
}

#[async_trait]
impl RemoteStore for HttpRemoteStore {
    async fn list_plants(&self) -> Result<Vec<RemotePlant>, RemoteError> {
        let response = self.send(self.client.get(self.url("/plants"))).await?;
        let listing: PlantListing = response.json().await?;
        Ok(listing.into_plants())
    }

    async fn create_plant(&self, plant: &NewPlant) -> Result<RemotePlant, RemoteError> {
        let response = self
            .send(self.client.post(self.url("/plants")).json(plant))
            .await?;
        let echo: Value = response.json().await?;
        RemotePlant::try_from(&echo)
    }

    async fn mark_watered(&self, id: &str) -> Result<(), RemoteError> {
        let path = format!("/plants/{}/water", id);
        self.send(self.client.put(self.url(&path))).await?;
        Ok(())
    }

    async fn delete_plant(&self, id: &str) -> Result<(), RemoteError> {
        let path = format!("/plants/{}", id);
        self.send(self.client.delete(self.url(&path))).await?;
        Ok(())
    }
}

/// Returns true if the store answers its health endpoint.
pub async fn check_server(base_url: &str, timeout: Duration) -> bool {
    let url = format!("{}/health", normalize_base_url(base_url.to_string()));
    let client = match Client::builder().timeout(timeout).build() {
        Ok(client) => client,
        Err(_) => return false,
    };

    match client.get(&url).send().await {
        Ok(response) => response.status().is_success(),
        Err(e) => {
            tracing::debug!("Health check against {} failed: {}", url, e);
            false
        }
    }
}

fn normalize_base_url(url: String) -> String {
    let url = url.trim().trim_end_matches('/');
    if url.starts_with("http://") || url.starts_with("https://") {
        url.to_string()
    } else {
        format!("http://{}", url)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_base_url_trailing_slash() {
        let store = HttpRemoteStore::new("http://localhost:5000/api/");
        assert_eq!(store.base_url(), "http://localhost:5000/api");
        assert_eq!(store.url("/plants"), "http://localhost:5000/api/plants");
    }

    #[test]
    fn test_base_url_bare_host() {
        let store = HttpRemoteStore::new("localhost:5000/api");
        assert_eq!(store.base_url(), "http://localhost:5000/api");
    }

    #[test]
    fn test_base_url_https_kept() {
        let store = HttpRemoteStore::new("https://plants.example.com/api");
        assert_eq!(store.url("/plants/a/water"), "https://plants.example.com/api/plants/a/water");
    }

    /// API root on a local port that was just released, so nothing listens there.
    fn closed_port_url() -> String {
        let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
        let port = listener.local_addr().unwrap().port();
        drop(listener);
        format!("http://127.0.0.1:{}/api", port)
    }

    #[tokio::test]
    async fn test_unreachable_store_is_transport_error() {
        let store =
            HttpRemoteStore::with_timeout(closed_port_url(), Some(Duration::from_secs(2)))
                .unwrap();

        let err = store.list_plants().await.unwrap_err();
        assert!(err.is_transport(), "unexpected error: {:?}", err);

        let err = store.mark_watered("a").await.unwrap_err();
        assert!(err.is_transport());
    }

    #[tokio::test]
    async fn test_check_server_unreachable() {
        assert!(!check_server(&closed_port_url(), Duration::from_secs(2)).await);
    }
}
