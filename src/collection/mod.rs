//! Document collection boundary
//!
//! The adapter talks to its backing store exclusively through
//! [`DocumentCollection`]. Driver concerns (connections, TLS, retries,
//! timeouts) live behind this trait; the adapter only assumes that
//! `upsert_one` atomically replaces the full field set of one document.

use async_trait::async_trait;
use serde_json::{Map, Value};

use crate::errors::AuthStateResult;

pub mod memory;

pub use memory::MemoryCollection;

/// Field set of one stored document
pub type Document = Map<String, Value>;

/// One named collection of documents, keyed by string id
#[async_trait]
pub trait DocumentCollection: Send + Sync {
    /// Fetch the document with the given id, if present
    async fn find_one(&self, id: &str) -> AuthStateResult<Option<Document>>;

    /// Insert the document, or replace its entire field set if it exists.
    ///
    /// Replace semantics, not merge: fields absent from `fields` must be
    /// gone after the call.
    async fn upsert_one(&self, id: &str, fields: Document) -> AuthStateResult<()>;

    /// Delete the document with the given id. Absent ids are a no-op.
    async fn delete_one(&self, id: &str) -> AuthStateResult<()>;
}
