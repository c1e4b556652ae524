//! Where grant trees come from
//!
//! A [`GrantSource`] performs one request against the grant service. Caching,
//! revalidation and de-duplication live in [`crate::GrantTreeCache`].

use async_trait::async_trait;
use grants_tree::GrantTree;

use crate::GrantCacheError;

mod memory;
pub use memory::*;

mod rest;
pub use rest::*;

/// Outcome of one grant request
#[derive(Debug, Clone, PartialEq)]
pub enum GrantResponse {
    /// The tree identified by the presented tag is still current
    NotModified,

    /// A complete tree
    Full {
        /// The caller's grants
        tree: GrantTree,
        /// Entity tag to present on the next conditional request
        tag: Option<String>,
    },
}

/// One round trip to the grant service
#[async_trait]
pub trait GrantSource: Send + Sync {
    /// Fetch the caller's grant tree.
    ///
    /// `force` asks the service to bypass its own caches. When `tag` is
    /// present the request is conditional, and the source may answer
    /// [`GrantResponse::NotModified`].
    async fn fetch(&self, force: bool, tag: Option<&str>) -> Result<GrantResponse, GrantCacheError>;
}
