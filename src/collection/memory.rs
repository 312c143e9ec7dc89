//! In-memory document collection
//!
//! Non-persistent [`DocumentCollection`] used by tests and as a throwaway
//! backend for single-process runs.

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use tokio::sync::RwLock;

use super::{Document, DocumentCollection};
use crate::errors::AuthStateResult;

/// In-memory document collection (non-persistent)
#[derive(Clone)]
pub struct MemoryCollection {
    documents: Arc<RwLock<HashMap<String, Document>>>,
}

impl MemoryCollection {
    /// Create a new empty collection
    pub fn new() -> Self {
        Self {
            documents: Arc::new(RwLock::new(HashMap::new())),
        }
    }

    /// Number of stored documents
    pub async fn len(&self) -> usize {
        self.documents.read().await.len()
    }

    /// True when no documents are stored
    pub async fn is_empty(&self) -> bool {
        self.documents.read().await.is_empty()
    }
}

impl Default for MemoryCollection {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl DocumentCollection for MemoryCollection {
    async fn find_one(&self, id: &str) -> AuthStateResult<Option<Document>> {
        let documents = self.documents.read().await;
        Ok(documents.get(id).cloned())
    }

    async fn upsert_one(&self, id: &str, fields: Document) -> AuthStateResult<()> {
        let mut documents = self.documents.write().await;
        documents.insert(id.to_string(), fields);
        Ok(())
    }

    async fn delete_one(&self, id: &str) -> AuthStateResult<()> {
        let mut documents = self.documents.write().await;
        documents.remove(id);
        Ok(())
    }
}
