//! Record stores answer filtered, paginated queries
//!
//! A [`RecordStore`] performs one query. Caching and ordering guarantees live
//! in [`crate::QueryExecutor`].

use async_trait::async_trait;

use crate::{QueryError, QueryPage, QueryRequest};

mod memory;
pub use memory::*;

mod rest;
pub use rest::*;

/// One round trip to a record store
#[async_trait]
pub trait RecordStore: Send + Sync {
    /// Fetch the page `request` describes
    async fn filter(&self, request: &QueryRequest) -> Result<QueryPage, QueryError>;
}
