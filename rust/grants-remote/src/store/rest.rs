//! REST record store

use async_trait::async_trait;
use reqwest::{Client, StatusCode};
use url::Url;

use super::RecordStore;
use crate::{QueryError, QueryPage, QueryRequest, RemoteConfig};

/// Queries records over HTTP
///
/// POST `{endpoint}{resource}/filter?page=&size=&sort=field,DIR&...` with the
/// criteria as the JSON body `{ "criteria": [...] }`. The response is a page
/// envelope `{ "content": [...], "totalElements": n, "totalPages": n }`.
#[derive(Clone, Debug)]
pub struct RestRecordStore {
    config: RemoteConfig,
    client: Client,
}

impl RestRecordStore {
    /// Create a new REST record store with the given configuration
    pub fn new(config: RemoteConfig) -> Self {
        let client = config.client();
        Self { config, client }
    }

    /// The full URL of a query, including its query string
    pub fn url_for(&self, request: &QueryRequest) -> Result<Url, QueryError> {
        let base = self.config.url_for(&format!(
            "{}/filter",
            request.resource.trim_end_matches('/')
        ));
        let mut url = Url::parse(&base).map_err(|e| QueryError::Encode {
            resource: request.resource.clone(),
            reason: format!("Invalid URL {}: {}", base, e),
        })?;

        url.query_pairs_mut().extend_pairs(request.query_pairs());
        Ok(url)
    }
}

#[async_trait]
impl RecordStore for RestRecordStore {
    async fn filter(&self, request: &QueryRequest) -> Result<QueryPage, QueryError> {
        let url = self.url_for(request)?;
        let resource = &request.resource;

        let http_request = self.client.post(url).json(&request.filters);
        let http_request = self.config.authorize(http_request);

        let response = http_request
            .send()
            .await
            .map_err(|e| QueryError::FetchFailed {
                resource: resource.clone(),
                reason: format!("HTTP request failed: {}", e),
            })?;

        let status = response.status();

        if status == StatusCode::UNAUTHORIZED {
            return Err(QueryError::Unauthorized {
                resource: resource.clone(),
                reason: "Authentication failed".to_string(),
            });
        }

        if !status.is_success() {
            return Err(QueryError::FetchFailed {
                resource: resource.clone(),
                reason: format!(
                    "HTTP {} - {}",
                    status.as_u16(),
                    status.canonical_reason().unwrap_or("Unknown")
                ),
            });
        }

        let body = response
            .bytes()
            .await
            .map_err(|e| QueryError::FetchFailed {
                resource: resource.clone(),
                reason: format!("Failed to read response body: {}", e),
            })?;

        serde_json::from_slice(&body).map_err(|e| QueryError::Decode {
            resource: resource.clone(),
            reason: e.to_string(),
        })
    }
}
