use std::time::Duration;

use reqwest::{Client, RequestBuilder};

/// Timeout applied to grant and record requests unless configured otherwise
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);

/// How requests to the grant service and the record store identify the caller
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub enum AuthMethod {
    /// Send no credentials, e.g. behind a gateway that injects them
    #[default]
    Anonymous,

    /// The session's access token, sent as `Authorization: Bearer {token}`.
    /// The grant service answers `401` once it expires.
    Bearer(String),
}

/// Where the grant service and the record store live, and how to call them.
///
/// Both [`crate::RestGrantSource`] and [`crate::RestRecordStore`] resolve their
/// paths (`/auth/me/permissions`, `{resource}/filter`) against `endpoint`.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct RemoteConfig {
    /// API base URL, e.g. `https://portal.example.com`. A trailing slash is
    /// tolerated.
    pub endpoint: String,

    /// Caller credentials
    pub auth: AuthMethod,

    /// Per-request timeout; `None` waits indefinitely
    pub timeout: Option<Duration>,

    /// Extra headers, such as a tenant or locale selector
    pub headers: Vec<(String, String)>,
}

impl RemoteConfig {
    /// Anonymous access to `endpoint` with [`DEFAULT_TIMEOUT`]
    pub fn new(endpoint: impl Into<String>) -> Self {
        Self {
            endpoint: endpoint.into(),
            auth: AuthMethod::Anonymous,
            timeout: Some(DEFAULT_TIMEOUT),
            headers: Vec::new(),
        }
    }

    /// Identify the caller with `auth`
    pub fn with_auth(mut self, auth: AuthMethod) -> Self {
        self.auth = auth;
        self
    }

    /// Shorthand for [`AuthMethod::Bearer`]
    pub fn with_bearer_token(self, token: impl Into<String>) -> Self {
        self.with_auth(AuthMethod::Bearer(token.into()))
    }

    /// Give up on requests that take longer than `timeout`
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    /// Wait for responses however long they take
    pub fn without_timeout(mut self) -> Self {
        self.timeout = None;
        self
    }

    /// Send `name: value` with every request
    pub fn with_header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.push((name.into(), value.into()));
        self
    }

    /// The endpoint joined with `path`, without doubled slashes
    pub(crate) fn url_for(&self, path: &str) -> String {
        format!(
            "{}/{}",
            self.endpoint.trim_end_matches('/'),
            path.trim_start_matches('/')
        )
    }

    pub(crate) fn client(&self) -> Client {
        let mut client_builder = Client::builder();

        if let Some(timeout) = self.timeout {
            client_builder = client_builder.timeout(timeout);
        }

        client_builder.build().unwrap_or_else(|_| Client::new())
    }

    /// Attach credentials and extra headers
    pub(crate) fn authorize(&self, builder: RequestBuilder) -> RequestBuilder {
        let builder = match &self.auth {
            AuthMethod::Anonymous => builder,
            AuthMethod::Bearer(token) => builder.bearer_auth(token),
        };

        self.headers
            .iter()
            .fold(builder, |builder, (name, value)| builder.header(name, value))
    }
}

/// How long a fetched grant tree is trusted.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct GrantCachePolicy {
    /// Age after which a tree is revalidated before use (default: 5 minutes)
    pub stale_after: Duration,
    /// Age after which a tree is no longer served at all (default: 10 minutes)
    pub retain_for: Duration,
}

impl Default for GrantCachePolicy {
    fn default() -> Self {
        Self {
            stale_after: Duration::from_secs(5 * 60),
            retain_for: Duration::from_secs(10 * 60),
        }
    }
}

impl GrantCachePolicy {
    /// Set the freshness window
    pub fn with_stale_after(mut self, stale_after: Duration) -> Self {
        self.stale_after = stale_after;
        self
    }

    /// Set the retention window
    pub fn with_retain_for(mut self, retain_for: Duration) -> Self {
        self.retain_for = retain_for;
        self
    }
}

/// How query pages are cached.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct QueryCachePolicy {
    /// Age after which a cached page is refetched (default: 5 minutes)
    pub stale_after: Duration,
    /// Maximum number of cached pages (default: 256)
    pub capacity: usize,
}

impl Default for QueryCachePolicy {
    fn default() -> Self {
        Self {
            stale_after: Duration::from_secs(5 * 60),
            capacity: 256,
        }
    }
}

impl QueryCachePolicy {
    /// Set the freshness window
    pub fn with_stale_after(mut self, stale_after: Duration) -> Self {
        self.stale_after = stale_after;
        self
    }

    /// Set the page capacity
    pub fn with_capacity(mut self, capacity: usize) -> Self {
        self.capacity = capacity;
        self
    }
}
