//! Abstract remote document store consumed by the reconciler.
//!
//! The hosted store behind the dashboard serializes writes to a single
//! command document; the client needs no locking beyond the
//! optimistic/authoritative merge rule in [`crate::reconciler`].

use async_trait::async_trait;
use devrelay_util::Retryable;
use serde_json::Value;
use thiserror::Error;

use crate::paths::{CollectionPath, DocumentPath};

mod http;
mod memory;

pub use http::HttpDocumentStore;
pub use memory::{InMemoryDocumentStore, RecordedOp};

/// Errors surfaced by document store operations.
#[derive(Debug, Error)]
pub enum StoreError {
    /// The backend reported itself unavailable.
    #[error("remote store unavailable")]
    Unavailable,
    /// The backend or transport timed out.
    #[error("deadline exceeded")]
    DeadlineExceeded,
    /// Connectivity failure before a response was received.
    #[error("network error: {0}")]
    Network(String),
    /// The caller is not allowed to touch the document.
    #[error("permission denied")]
    PermissionDenied,
    /// The request was malformed.
    #[error("invalid argument: {0}")]
    InvalidArgument(String),
    #[error("document not found")]
    NotFound,
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
    /// Any other non-success response.
    #[error("HTTP {status}: {body}")]
    Http { status: u16, body: String },
}

impl Retryable for StoreError {
    fn is_transient(&self) -> bool {
        matches!(self, Self::Unavailable | Self::DeadlineExceeded | Self::Network(_))
    }
}

/// One fetched document: remote-assigned id plus its raw fields.
#[derive(Clone, Debug, PartialEq)]
pub struct Document {
    pub id: String,
    pub fields: Value,
}

/// Remote document store operations used by the console.
///
/// `get_many` returns documents ordered by the named field, descending
/// (newest first). There is deliberately no subscription surface; the
/// refresh driver is pull-only.
#[async_trait]
pub trait DocumentStore: Send + Sync {
    /// Creates a document with server-assigned id and creation time.
    async fn add(&self, collection: &CollectionPath, fields: Value) -> Result<String, StoreError>;

    /// Merges `fields` into an existing document.
    async fn update(&self, document: &DocumentPath, fields: Value) -> Result<(), StoreError>;

    async fn delete(&self, document: &DocumentPath) -> Result<(), StoreError>;

    /// Deletes all listed documents in one atomic operation.
    async fn delete_batch(&self, documents: &[DocumentPath]) -> Result<(), StoreError>;

    async fn get_many(&self, collection: &CollectionPath, order_by: &str, limit: usize) -> Result<Vec<Document>, StoreError>;
}
