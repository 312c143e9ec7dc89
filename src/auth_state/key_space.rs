//! Key-space adapter
//!
//! Batched get/set of protocol keys, each identified by a compound key
//! `(kind, id)` and stored as one document per compound key. Batches
//! fan out concurrently and resolve only once every member has resolved;
//! one member's failure never aborts its siblings.

use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use futures::future::join_all;
use tracing::{debug, warn};

use super::record_store::RecordStore;
use crate::codec::StateValue;
use crate::crypto::KeyGenerator;
use crate::errors::AuthStateResult;

/// Closed set of protocol key tags
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum KeyKind {
    PreKey,
    Session,
    SenderKey,
    SenderKeyMemory,
    AppStateSyncKey,
    AppStateSyncVersion,
}

impl KeyKind {
    /// The wire tag used in document ids
    pub fn tag(&self) -> &'static str {
        match self {
            KeyKind::PreKey => "pre-key",
            KeyKind::Session => "session",
            KeyKind::SenderKey => "sender-key",
            KeyKind::SenderKeyMemory => "sender-key-memory",
            KeyKind::AppStateSyncKey => "app-state-sync-key",
            KeyKind::AppStateSyncVersion => "app-state-sync-version",
        }
    }

    /// Parse a wire tag
    pub fn from_tag(tag: &str) -> Option<Self> {
        match tag {
            "pre-key" => Some(KeyKind::PreKey),
            "session" => Some(KeyKind::Session),
            "sender-key" => Some(KeyKind::SenderKey),
            "sender-key-memory" => Some(KeyKind::SenderKeyMemory),
            "app-state-sync-key" => Some(KeyKind::AppStateSyncKey),
            "app-state-sync-version" => Some(KeyKind::AppStateSyncVersion),
            _ => None,
        }
    }

    /// Document id for one compound key
    pub fn document_id(&self, id: &str) -> String {
        format!("{}-{}", self.tag(), id)
    }
}

impl fmt::Display for KeyKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.tag())
    }
}

/// Classification of a keyed entry at the store boundary
#[derive(Debug, Clone, PartialEq)]
pub enum KeyRecord {
    /// A usable key value
    WellFormed(StateValue),
    /// A sequence where a mapping was expected; must be healed
    Corrupted(Vec<StateValue>),
    /// No value
    Absent,
}

impl From<Option<StateValue>> for KeyRecord {
    fn from(value: Option<StateValue>) -> Self {
        match value {
            None | Some(StateValue::Null) => KeyRecord::Absent,
            Some(StateValue::Array(items)) => KeyRecord::Corrupted(items),
            Some(value) => KeyRecord::WellFormed(value),
        }
    }
}

/// Decode post-processing transform for one key kind.
///
/// Used to run app-state-sync-key payloads through the collaborator's
/// structural constructor; opaque at this boundary.
pub type PostProcess = Arc<dyn Fn(StateValue) -> StateValue + Send + Sync>;

/// Batch passed to [`KeySpace::set`]: kind, then id to value-or-remove
pub type KeyBatch = HashMap<KeyKind, HashMap<String, Option<StateValue>>>;

/// Batched pass-through to the store for compound-keyed protocol keys.
///
/// Holds no long-lived state; every read is a store round-trip. No ordering
/// is guaranteed between separate `get`/`set` calls; callers needing
/// read-after-write ordering for the same compound key must serialize those
/// calls themselves.
#[derive(Clone)]
pub struct KeySpace {
    store: RecordStore,
    generator: Arc<dyn KeyGenerator>,
    post_process: HashMap<KeyKind, PostProcess>,
}

impl KeySpace {
    /// Create a key space over the given record store
    pub fn new(store: RecordStore, generator: Arc<dyn KeyGenerator>) -> Self {
        Self {
            store,
            generator,
            post_process: HashMap::new(),
        }
    }

    /// Install a decode post-processing transform for one key kind
    pub fn with_post_process(mut self, kind: KeyKind, transform: PostProcess) -> Self {
        self.post_process.insert(kind, transform);
        self
    }

    /// Read every id concurrently; missing ids map to `None`.
    ///
    /// A failed read is logged and yields `None` for that id, leaving its
    /// siblings untouched. Transient store errors are therefore
    /// indistinguishable from absence here.
    pub async fn get(&self, kind: KeyKind, ids: &[String]) -> HashMap<String, Option<StateValue>> {
        let reads = ids.iter().map(|id| async move {
            let document_id = kind.document_id(id);
            let value = match self.store.read(&document_id).await {
                Ok(value) => value,
                Err(e) => {
                    warn!(error = ?e, id = %document_id, "key read failed, treating as absent");
                    None
                }
            };
            let value = match (value, self.post_process.get(&kind)) {
                (Some(value), Some(transform)) => Some(transform(value)),
                (value, _) => value,
            };
            (id.clone(), value)
        });
        join_all(reads).await.into_iter().collect()
    }

    /// Apply a batch of writes and deletes concurrently.
    ///
    /// Non-null values are persisted, null values delete their compound
    /// key, and a sequence value marks a corrupted entry that is healed in
    /// place. One entry's failure is logged and isolated.
    pub async fn set(&self, batch: KeyBatch) {
        let entries = batch.into_iter().flat_map(|(kind, entries)| {
            entries
                .into_iter()
                .map(move |(id, value)| (kind, id, value))
        });

        let operations = entries.map(|(kind, id, value)| async move {
            let document_id = kind.document_id(&id);
            let result = match KeyRecord::from(value) {
                KeyRecord::WellFormed(value) => self
                    .store
                    .write(&document_id, &value)
                    .await
                    .map(|_| ()),
                KeyRecord::Corrupted(_) => self.heal(&document_id).await,
                KeyRecord::Absent => self.store.remove(&document_id).await,
            };
            if let Err(e) = result {
                warn!(error = ?e, id = %document_id, "key write failed, entry unchanged");
            }
        });

        join_all(operations).await;
    }

    /// Delete a corrupted entry and write a freshly generated key in its place
    async fn heal(&self, document_id: &str) -> AuthStateResult<()> {
        warn!(id = %document_id, "corrupted key entry, regenerating");
        self.store.remove(document_id).await?;

        let replacement = self.generator.key_pair();
        self.store.write(document_id, &replacement).await?;
        debug!(id = %document_id, "replacement key stored");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_tag_round_trip() {
        for kind in [
            KeyKind::PreKey,
            KeyKind::Session,
            KeyKind::SenderKey,
            KeyKind::SenderKeyMemory,
            KeyKind::AppStateSyncKey,
            KeyKind::AppStateSyncVersion,
        ] {
            assert_eq!(KeyKind::from_tag(kind.tag()), Some(kind));
        }
        assert_eq!(KeyKind::from_tag("unknown"), None);
    }

    #[test]
    fn test_document_id_format() {
        assert_eq!(KeyKind::PreKey.document_id("7"), "pre-key-7");
        assert_eq!(
            KeyKind::AppStateSyncKey.document_id("K1"),
            "app-state-sync-key-K1"
        );
    }

    #[test]
    fn test_key_record_classification() {
        assert_eq!(KeyRecord::from(None), KeyRecord::Absent);
        assert_eq!(KeyRecord::from(Some(StateValue::Null)), KeyRecord::Absent);
        assert_eq!(
            KeyRecord::from(Some(StateValue::Array(vec![StateValue::Number(1.into())]))),
            KeyRecord::Corrupted(vec![StateValue::Number(1.into())])
        );
        assert!(matches!(
            KeyRecord::from(Some(StateValue::String("ok".to_string()))),
            KeyRecord::WellFormed(_)
        ));
    }
}
