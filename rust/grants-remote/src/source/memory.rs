//! In-memory grant source for testing

use std::collections::VecDeque;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use grants_tree::GrantTree;
use parking_lot::Mutex;

use super::{GrantResponse, GrantSource};
use crate::GrantCacheError;

#[derive(Debug, Default)]
struct MemoryGrantState {
    tree: GrantTree,
    version: u64,
    requests: usize,
    forced_requests: usize,
    scripted: VecDeque<Result<GrantResponse, GrantCacheError>>,
    latency: Option<Duration>,
}

/// An in-memory stand-in for the grant service.
///
/// Behaves like a well-mannered server: every published tree gets a new tag,
/// and a conditional request presenting the current tag is answered with
/// [`GrantResponse::NotModified`]. Responses can also be scripted to simulate
/// failures or misbehaving servers. Clones share state.
///
/// # Examples
///
/// ```
/// use grants_remote::{GrantResponse, GrantSource, MemoryGrantSource};
/// use grants_tree::GrantTree;
///
/// # async fn example() -> Result<(), Box<dyn std::error::Error>> {
/// let source = MemoryGrantSource::new(GrantTree::empty());
///
/// let GrantResponse::Full { tag, .. } = source.fetch(false, None).await? else {
///     unreachable!()
/// };
/// assert_eq!(source.fetch(false, tag.as_deref()).await?, GrantResponse::NotModified);
/// assert_eq!(source.requests(), 2);
/// # Ok(())
/// # }
/// ```
#[derive(Clone, Debug, Default)]
pub struct MemoryGrantSource {
    state: Arc<Mutex<MemoryGrantState>>,
}

impl MemoryGrantSource {
    /// Serve the given tree
    pub fn new(tree: GrantTree) -> Self {
        let source = Self::default();
        source.publish(tree);
        source
    }

    /// Replace the served tree; the next request gets a new tag
    pub fn publish(&self, tree: GrantTree) {
        let mut state = self.state.lock();
        state.tree = tree;
        state.version += 1;
    }

    /// Answer the next request with `response` instead of the served tree
    pub fn script(&self, response: Result<GrantResponse, GrantCacheError>) {
        self.state.lock().scripted.push_back(response);
    }

    /// Delay every response
    pub fn with_latency(self, latency: Duration) -> Self {
        self.state.lock().latency = Some(latency);
        self
    }

    /// Number of requests received
    pub fn requests(&self) -> usize {
        self.state.lock().requests
    }

    /// Number of requests received with `force` set
    pub fn forced_requests(&self) -> usize {
        self.state.lock().forced_requests
    }

    fn tag_of(version: u64) -> String {
        format!("\"v{}\"", version)
    }
}

#[async_trait]
impl GrantSource for MemoryGrantSource {
    async fn fetch(&self, force: bool, tag: Option<&str>) -> Result<GrantResponse, GrantCacheError> {
        let latency = {
            let mut state = self.state.lock();
            state.requests += 1;
            if force {
                state.forced_requests += 1;
            }
            state.latency
        };

        if let Some(latency) = latency {
            tokio::time::sleep(latency).await;
        }

        let mut state = self.state.lock();
        if let Some(response) = state.scripted.pop_front() {
            return response;
        }

        let current = Self::tag_of(state.version);
        if !force && tag == Some(current.as_str()) {
            return Ok(GrantResponse::NotModified);
        }

        Ok(GrantResponse::Full {
            tree: state.tree.clone(),
            tag: Some(current),
        })
    }
}
