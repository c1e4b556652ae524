use grants_tree::TreeError;
use thiserror::Error;

/// Errors produced while obtaining a grant tree.
///
/// Cloneable so a single shared fetch can hand the same outcome to every
/// waiter.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum GrantCacheError {
    /// The grant service could not be reached or answered with an error
    #[error("Failed to fetch grants: {reason}")]
    FetchFailed {
        /// What went wrong
        reason: String,
    },

    /// The grant service refused the caller's credentials
    #[error("Not authorized to fetch grants: {reason}")]
    Unauthorized {
        /// What went wrong
        reason: String,
    },

    /// The response body was not a grant tree
    #[error("Could not decode grants: {reason}")]
    Decode {
        /// What went wrong
        reason: String,
    },

    /// The grant tree failed ingestion checks
    #[error("Received an invalid grant tree: {0}")]
    InvalidTree(#[from] TreeError),

    /// The service answered "not modified" twice although no tree is cached
    #[error("Grant service answered not-modified but no grant tree is cached")]
    NotModifiedWithoutCache,
}

/// Errors produced while running a paginated query.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum QueryError {
    /// The record store could not be reached or answered with an error
    #[error("Failed to query {resource}: {reason}")]
    FetchFailed {
        /// The queried resource
        resource: String,
        /// What went wrong
        reason: String,
    },

    /// The record store refused the caller's credentials
    #[error("Not authorized to query {resource}: {reason}")]
    Unauthorized {
        /// The queried resource
        resource: String,
        /// What went wrong
        reason: String,
    },

    /// The response body was not a page
    #[error("Could not decode page of {resource}: {reason}")]
    Decode {
        /// The queried resource
        resource: String,
        /// What went wrong
        reason: String,
    },

    /// The request could not be turned into a cache key or a URL
    #[error("Could not encode query for {resource}: {reason}")]
    Encode {
        /// The queried resource
        resource: String,
        /// What went wrong
        reason: String,
    },

    /// The page cache could not be created
    #[error("Could not initialize page cache: {reason}")]
    CacheUnavailable {
        /// What went wrong
        reason: String,
    },

    /// A newer request for the same parameters was issued while this one was
    /// in flight; its response was discarded
    #[error("Query generation {generation} was superseded by generation {latest}")]
    Superseded {
        /// The generation of the discarded response
        generation: u64,
        /// The latest generation issued for the same parameters
        latest: u64,
    },
}
