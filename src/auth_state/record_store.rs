//! Record store
//!
//! Atomic upsert/read/delete of single named records against the document
//! collection, with the codec applied at the boundary. Failures surface as
//! explicit errors here; the availability policy (log and degrade) is
//! applied by the callers that want it.

use std::sync::Arc;

use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::Value;
use tracing::warn;

use crate::codec::{self, StateValue};
use crate::collection::{Document, DocumentCollection};
use crate::errors::{AuthStateError, AuthStateResult};

/// Outcome of a [`RecordStore::write`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WriteOutcome {
    /// The document was upserted
    Written,
    /// The payload was empty; nothing was persisted
    SkippedEmpty,
}

/// Store for single named records
#[derive(Clone)]
pub struct RecordStore {
    collection: Arc<dyn DocumentCollection>,
}

impl RecordStore {
    /// Create a record store over the given collection
    pub fn new(collection: Arc<dyn DocumentCollection>) -> Self {
        Self { collection }
    }

    /// Encode and upsert `data` as the full field set of document `id`.
    ///
    /// Null and empty payloads are skipped rather than persisted. A
    /// sequence payload is converted to a mapping keyed `index_0`,
    /// `index_1`, … because the upsert only accepts mapping-shaped
    /// payloads. A bare scalar is rejected.
    pub async fn write<T: Serialize + ?Sized>(
        &self,
        id: &str,
        data: &T,
    ) -> AuthStateResult<WriteOutcome> {
        let encoded = codec::encode(data)?;
        let fields = match prepare_fields(id, encoded)? {
            Some(fields) => fields,
            None => return Ok(WriteOutcome::SkippedEmpty),
        };
        self.collection.upsert_one(id, fields).await?;
        Ok(WriteOutcome::Written)
    }

    /// Read and decode document `id`. Absent documents are `Ok(None)`.
    pub async fn read(&self, id: &str) -> AuthStateResult<Option<StateValue>> {
        let document = self.collection.find_one(id).await?;
        Ok(document.map(|fields| StateValue::from_json(Value::Object(fields))))
    }

    /// Read document `id` into a typed record
    pub async fn read_as<T: DeserializeOwned>(&self, id: &str) -> AuthStateResult<Option<T>> {
        match self.collection.find_one(id).await? {
            Some(fields) => Ok(Some(codec::decode(Value::Object(fields))?)),
            None => Ok(None),
        }
    }

    /// Delete document `id`. Deleting an absent id is a no-op.
    pub async fn remove(&self, id: &str) -> AuthStateResult<()> {
        self.collection.delete_one(id).await
    }
}

fn prepare_fields(id: &str, encoded: Value) -> AuthStateResult<Option<Document>> {
    match encoded {
        Value::Null => Ok(None),
        Value::Array(items) if items.is_empty() => Ok(None),
        Value::Object(map) if map.is_empty() => Ok(None),
        Value::Array(items) => {
            warn!(id, "sequence payload converted to indexed mapping");
            let mut map = Document::new();
            for (index, item) in items.into_iter().enumerate() {
                map.insert(format!("index_{index}"), item);
            }
            Ok(Some(map))
        }
        Value::Object(map) => Ok(Some(map)),
        scalar => Err(AuthStateError::InvalidPayload {
            id: id.to_string(),
            reason: format!("scalar payload {scalar} cannot be stored"),
        }),
    }
}
