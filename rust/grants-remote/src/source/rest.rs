//! REST grant source

use async_trait::async_trait;
use grants_tree::GrantTree;
use reqwest::{Client, StatusCode, header};

use super::{GrantResponse, GrantSource};
use crate::{GrantCacheError, RemoteConfig};

/// Path of the caller's grant tree, relative to the endpoint
pub const PERMISSIONS_PATH: &str = "/auth/me/permissions";

/// Fetches grant trees over HTTP
///
/// - GET `{endpoint}/auth/me/permissions?force={bool}` with `If-None-Match`
///   when a tag is held
/// - `200` carries `{ "systems": [...] }` and an `ETag`; `304` carries nothing
///
/// # Examples
///
/// ```no_run
/// use grants_remote::{AuthMethod, GrantSource, RemoteConfig, RestGrantSource};
///
/// # async fn example() -> Result<(), Box<dyn std::error::Error>> {
/// let config = RemoteConfig::new("https://api.example.com")
///     .with_auth(AuthMethod::Bearer("my-token".to_string()));
/// let source = RestGrantSource::new(config);
///
/// let response = source.fetch(false, None).await?;
/// # Ok(())
/// # }
/// ```
#[derive(Clone, Debug)]
pub struct RestGrantSource {
    config: RemoteConfig,
    client: Client,
}

impl RestGrantSource {
    /// Create a new REST grant source with the given configuration
    pub fn new(config: RemoteConfig) -> Self {
        let client = config.client();
        Self { config, client }
    }

    fn url(&self) -> String {
        self.config.url_for(PERMISSIONS_PATH)
    }
}

#[async_trait]
impl GrantSource for RestGrantSource {
    async fn fetch(&self, force: bool, tag: Option<&str>) -> Result<GrantResponse, GrantCacheError> {
        let mut request = self
            .client
            .get(self.url())
            .query(&[("force", force)]);
        if let Some(tag) = tag {
            request = request.header(header::IF_NONE_MATCH, tag);
        }
        let request = self.config.authorize(request);

        let response = request
            .send()
            .await
            .map_err(|e| GrantCacheError::FetchFailed {
                reason: format!("HTTP request failed: {}", e),
            })?;

        let status = response.status();

        if status == StatusCode::NOT_MODIFIED {
            tracing::debug!(?tag, "grant tree not modified");
            return Ok(GrantResponse::NotModified);
        }

        if status == StatusCode::UNAUTHORIZED {
            return Err(GrantCacheError::Unauthorized {
                reason: "Authentication failed".to_string(),
            });
        }

        if !status.is_success() {
            return Err(GrantCacheError::FetchFailed {
                reason: format!(
                    "HTTP {} - {}",
                    status.as_u16(),
                    status.canonical_reason().unwrap_or("Unknown")
                ),
            });
        }

        let tag = response
            .headers()
            .get(header::ETAG)
            .and_then(|value| value.to_str().ok())
            .map(str::to_owned);

        let body = response
            .bytes()
            .await
            .map_err(|e| GrantCacheError::FetchFailed {
                reason: format!("Failed to read response body: {}", e),
            })?;

        let tree: GrantTree =
            serde_json::from_slice(&body).map_err(|e| GrantCacheError::Decode {
                reason: e.to_string(),
            })?;

        tracing::debug!(?tag, systems = tree.systems.len(), "fetched grant tree");
        Ok(GrantResponse::Full { tree, tag })
    }
}
