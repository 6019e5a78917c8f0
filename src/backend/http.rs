//! REST adapter for a remote document store.
//!
//! Wire contract: `GET /{collection}` lists documents (optionally
//! ordered via the `order` query parameter), `POST /{collection}`
//! creates one and returns `{ "id": ... }`, `PATCH /{collection}/{id}`
//! merges fields, `DELETE /{collection}/{id}` removes.
//!
//! There is no true server push; [`HttpBackend::subscribe`] polls the
//! list endpoint and forwards a snapshot only when the payload changed
//! since the last poll.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::{header, Client};
use serde::Deserialize;
use tokio::sync::mpsc;
use tracing::{debug, warn};

use crate::config::BackendConfig;
use crate::models::Collection;

use super::{BackendError, BackendSubscription, Document, DocumentBackend, Fields};

/// Connect timeout for the startup reachability probe and all requests.
/// There is deliberately no overall request timeout: an in-flight write
/// that never resolves leaves its caller pending.
const CONNECT_TIMEOUT_SECS: u64 = 10;

/// Default interval between subscription polls.
const DEFAULT_POLL_INTERVAL_SECS: u64 = 2;

/// Buffer for snapshot notifications per subscription. Snapshots are
/// whole-collection payloads, so a small buffer is plenty.
const SNAPSHOT_CHANNEL_SIZE: usize = 8;

#[derive(Debug, Deserialize)]
struct AssignedId {
    id: String,
}

/// REST document backend.
/// Clone is cheap - reqwest::Client uses Arc internally for connection pooling.
#[derive(Clone)]
pub struct HttpBackend {
    client: Client,
    base_url: String,
    api_key: Option<String>,
    poll_interval: Duration,
}

impl HttpBackend {
    pub fn new(config: &BackendConfig) -> Result<Self, BackendError> {
        let client = Client::builder()
            .connect_timeout(Duration::from_secs(CONNECT_TIMEOUT_SECS))
            .build()?;

        Ok(Self {
            client,
            base_url: config.base_url.trim_end_matches('/').to_string(),
            api_key: config.api_key.clone(),
            poll_interval: Duration::from_secs(
                config
                    .poll_interval_secs
                    .unwrap_or(DEFAULT_POLL_INTERVAL_SECS),
            ),
        })
    }

    fn collection_url(&self, collection: Collection) -> String {
        format!("{}/{}", self.base_url, collection.name())
    }

    fn document_url(&self, collection: Collection, id: &str) -> String {
        format!("{}/{}/{}", self.base_url, collection.name(), id)
    }

    fn list_url(&self, collection: Collection) -> String {
        match collection.order_field() {
            Some(field) => format!("{}?order={}:desc", self.collection_url(collection), field),
            None => self.collection_url(collection),
        }
    }

    fn auth_headers(&self) -> Result<header::HeaderMap, BackendError> {
        let mut headers = header::HeaderMap::new();
        if let Some(ref key) = self.api_key {
            let value = header::HeaderValue::from_str(&format!("Bearer {}", key))
                .map_err(|e| BackendError::InvalidResponse(format!("bad API key: {}", e)))?;
            headers.insert(header::AUTHORIZATION, value);
        }
        Ok(headers)
    }

    /// Check if response is successful, returning an error with body if not.
    async fn check_response(
        response: reqwest::Response,
    ) -> Result<reqwest::Response, BackendError> {
        if response.status().is_success() {
            Ok(response)
        } else {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            Err(BackendError::from_status(status, &body))
        }
    }

    /// Startup reachability probe. The sync engine calls this once; a
    /// failure demotes the process to local-only mode.
    pub async fn probe(&self) -> Result<(), BackendError> {
        let url = self.collection_url(Collection::Results);
        let response = self
            .client
            .get(&url)
            .headers(self.auth_headers()?)
            .send()
            .await
            .map_err(|e| BackendError::Unavailable(e.to_string()))?;
        Self::check_response(response).await?;
        debug!(url = %self.base_url, "backend probe succeeded");
        Ok(())
    }

    async fn list(&self, collection: Collection) -> Result<Vec<Document>, BackendError> {
        let response = self
            .client
            .get(self.list_url(collection))
            .headers(self.auth_headers()?)
            .send()
            .await?;
        let response = Self::check_response(response).await?;
        let docs: Vec<Document> = response.json().await?;
        Ok(docs)
    }
}

#[async_trait]
impl DocumentBackend for HttpBackend {
    async fn add_document(
        &self,
        collection: Collection,
        fields: Fields,
    ) -> Result<String, BackendError> {
        let response = self
            .client
            .post(self.collection_url(collection))
            .headers(self.auth_headers()?)
            .json(&fields)
            .send()
            .await?;
        let response = Self::check_response(response).await?;
        let assigned: AssignedId = response.json().await?;
        Ok(assigned.id)
    }

    async fn update_document(
        &self,
        collection: Collection,
        id: &str,
        fields: Fields,
    ) -> Result<(), BackendError> {
        let response = self
            .client
            .patch(self.document_url(collection, id))
            .headers(self.auth_headers()?)
            .json(&fields)
            .send()
            .await?;
        Self::check_response(response).await?;
        Ok(())
    }

    async fn delete_document(
        &self,
        collection: Collection,
        id: &str,
    ) -> Result<(), BackendError> {
        let response = self
            .client
            .delete(self.document_url(collection, id))
            .headers(self.auth_headers()?)
            .send()
            .await?;
        Self::check_response(response).await?;
        Ok(())
    }

    async fn subscribe(&self, collection: Collection) -> Result<BackendSubscription, BackendError> {
        let (tx, rx) = mpsc::channel(SNAPSHOT_CHANNEL_SIZE);
        let backend = self.clone();

        tokio::spawn(async move {
            let mut last_payload: Option<String> = None;
            let mut interval = tokio::time::interval(backend.poll_interval);
            // Ticks that pile up during a slow poll should not burst.
            interval.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);

            loop {
                interval.tick().await;
                if tx.is_closed() {
                    break;
                }

                match backend.list(collection).await {
                    Ok(docs) => {
                        let payload = serde_json::to_string(&docs).unwrap_or_default();
                        if last_payload.as_deref() == Some(payload.as_str()) {
                            continue;
                        }
                        last_payload = Some(payload);
                        if tx.send(Ok(docs)).await.is_err() {
                            break;
                        }
                    }
                    Err(e) => {
                        warn!(collection = %collection, error = %e, "subscription poll failed");
                        if tx.send(Err(e)).await.is_err() {
                            break;
                        }
                    }
                }
            }
            debug!(collection = %collection, "subscription poll task stopped");
        });

        Ok(BackendSubscription { snapshots: rx })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn backend() -> HttpBackend {
        HttpBackend::new(&BackendConfig {
            base_url: "https://fest.example.com/api/".to_string(),
            api_key: Some("k".to_string()),
            poll_interval_secs: None,
        })
        .unwrap()
    }

    #[test]
    fn test_url_building_strips_trailing_slash() {
        let b = backend();
        assert_eq!(
            b.collection_url(Collection::Teams),
            "https://fest.example.com/api/teams"
        );
        assert_eq!(
            b.document_url(Collection::Results, "r1"),
            "https://fest.example.com/api/results/r1"
        );
    }

    #[test]
    fn test_list_url_orders_results_only() {
        let b = backend();
        assert_eq!(
            b.list_url(Collection::Results),
            "https://fest.example.com/api/results?order=timestamp:desc"
        );
        assert_eq!(
            b.list_url(Collection::Programs),
            "https://fest.example.com/api/programs"
        );
    }
}
