#![warn(missing_docs)]

//! Remote plumbing for grants and grant-restricted queries.
//!
//! Two caches sit between an application and its backends:
//!
//! - [`GrantTreeCache`] holds the caller's [`grants_tree::GrantTree`], fetched
//!   from a [`GrantSource`] (usually [`RestGrantSource`], which speaks
//!   `GET /auth/me/permissions` with `ETag` revalidation). Concurrent fetches
//!   share one request, and a tree that cannot be obtained is reported as an
//!   error rather than replaced with an empty one.
//! - [`QueryExecutor`] runs paginated queries against a [`RecordStore`]
//!   (usually [`RestRecordStore`], which speaks `POST {resource}/filter`),
//!   caching pages and discarding responses that were overtaken by a newer
//!   request. [`PagedQuery`] drives a paged view on top of it.
//!
//! ```rust
//! use grants_filter::{CriteriaSet, DataType};
//! use grants_remote::{
//!     GrantCachePolicy, GrantTreeCache, MemoryGrantSource, MemoryRecordStore, QueryCachePolicy,
//!     QueryExecutor, QueryRequest,
//! };
//! use grants_tree::{EmptyScopes, GrantResolver};
//! use serde_json::json;
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let source = MemoryGrantSource::new(serde_json::from_value(json!({ "systems": [{
//!     "systemId": "S1",
//!     "sections": [{ "systemSectionId": "staff", "actions": [{
//!         "systemSectionActionId": "A1", "code": "view",
//!         "scopes": [{ "scopeValueId": "b1", "effect": "ALLOW" }]
//!     }]}]
//! }]}))?);
//! let grants = GrantTreeCache::new(source, GrantCachePolicy::default());
//! let resolver = GrantResolver::new(grants.fetch(false).await?);
//!
//! let restriction =
//!     resolver
//!         .scopes()
//!         .restriction_for("staff", "branchId", DataType::Uuid, EmptyScopes::Deny);
//! let filters = CriteriaSet::new().restrict(restriction).into_request()?;
//!
//! let store = MemoryRecordStore::new();
//! store.insert("/api/staff", [json!({ "id": 1, "branchId": "b1" }), json!({ "id": 2, "branchId": "b2" })]);
//! let executor = QueryExecutor::new(store, QueryCachePolicy::default())?;
//!
//! let page = executor
//!     .query(QueryRequest::new("/api/staff").with_filters(filters))
//!     .await?;
//! assert_eq!(page.total_elements, 1);
//! # Ok(())
//! # }
//! ```

mod config;
pub use config::*;

mod error;
pub use error::*;

pub mod source;
pub use source::{GrantResponse, GrantSource, MemoryGrantSource, RestGrantSource};

mod cache;
pub use cache::*;

mod query;
pub use query::*;

pub mod store;
pub use store::{MemoryRecordStore, RecordStore, RestRecordStore};

mod executor;
pub use executor::*;

mod paged;
pub use paged::*;
