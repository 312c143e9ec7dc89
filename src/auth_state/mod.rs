//! Auth-state adapter
//!
//! Loads or creates the session credentials and wires the key space and the
//! save-back path into one state backend for the protocol collaborator:
//!
//! ```no_run
//! use std::sync::Arc;
//! use docstate::{auth_state, CurveKeyGenerator, MemoryCollection};
//!
//! # async fn run() -> docstate::AuthStateResult<()> {
//! let collection = Arc::new(MemoryCollection::new());
//! let state = auth_state::initialize(collection, Arc::new(CurveKeyGenerator::new())).await?;
//!
//! // The collaborator mutates credentials through the handle...
//! state.creds.write().await.next_pre_key_id += 1;
//! // ...and saves on every credentials-mutation notification.
//! state.creds.save().await?;
//! # Ok(())
//! # }
//! ```

mod creds;
mod key_space;
mod record_store;

pub use creds::{AccountSettings, AuthCreds};
pub use key_space::{KeyBatch, KeyKind, KeyRecord, KeySpace, PostProcess};
pub use record_store::{RecordStore, WriteOutcome};

use std::sync::Arc;

use tokio::sync::{RwLock, RwLockReadGuard, RwLockWriteGuard};
use tracing::debug;

use crate::collection::DocumentCollection;
use crate::crypto::KeyGenerator;
use crate::errors::AuthStateResult;

/// Fixed document id of the credentials record
pub const CREDS_ID: &str = "creds";

/// Shared handle to the mutable credentials record.
///
/// The protocol collaborator mutates the record through [`write`] and the
/// save path reads the same cell, so mutations are always visible to
/// [`save`].
///
/// [`write`]: CredsHandle::write
/// [`save`]: CredsHandle::save
#[derive(Clone)]
pub struct CredsHandle {
    creds: Arc<RwLock<AuthCreds>>,
    store: RecordStore,
}

impl CredsHandle {
    /// Read access to the credentials record
    pub async fn read(&self) -> RwLockReadGuard<'_, AuthCreds> {
        self.creds.read().await
    }

    /// Write access to the credentials record
    pub async fn write(&self) -> RwLockWriteGuard<'_, AuthCreds> {
        self.creds.write().await
    }

    /// Persist the current record under the fixed creds id.
    ///
    /// Wire this to every credentials-mutation notification the
    /// collaborator emits; each call is a full independent write, with no
    /// debouncing. Repeating a save after a failure is safe.
    pub async fn save(&self) -> AuthStateResult<()> {
        let snapshot = self.creds.read().await.clone();
        self.store.write(CREDS_ID, &snapshot).await?;
        Ok(())
    }
}

/// State backend handed to the protocol collaborator
#[derive(Clone)]
pub struct AuthState {
    /// The mutable credentials record and its save path
    pub creds: CredsHandle,
    /// Batched get/set of compound-keyed protocol keys
    pub keys: KeySpace,
}

impl AuthState {
    /// Install a decode post-processing transform for one key kind, such as
    /// the app-state-sync-key structural constructor
    pub fn with_key_post_process(mut self, kind: KeyKind, transform: PostProcess) -> Self {
        self.keys = self.keys.with_post_process(kind, transform);
        self
    }
}

/// Load-or-create the session state backend.
///
/// Reads the `"creds"` record; when it is absent a fresh record is
/// synthesized from the generator's capabilities. The fresh record is not
/// persisted until the first save. A store failure during the initial read
/// is propagated rather than silently re-bootstrapping, since replacing an
/// existing identity would force a re-pair.
pub async fn initialize(
    collection: Arc<dyn DocumentCollection>,
    generator: Arc<dyn KeyGenerator>,
) -> AuthStateResult<AuthState> {
    let store = RecordStore::new(collection);

    let creds = match store.read_as::<AuthCreds>(CREDS_ID).await? {
        Some(creds) => creds,
        None => {
            debug!("no stored credentials, bootstrapping a fresh record");
            AuthCreds::bootstrap(generator.as_ref())
        }
    };

    let handle = CredsHandle {
        creds: Arc::new(RwLock::new(creds)),
        store: store.clone(),
    };
    let keys = KeySpace::new(store, generator);

    Ok(AuthState {
        creds: handle,
        keys,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::collection::MemoryCollection;
    use crate::crypto::CurveKeyGenerator;

    #[tokio::test]
    async fn test_mutation_visible_to_save() {
        let collection = Arc::new(MemoryCollection::new());
        let state = initialize(collection.clone(), Arc::new(CurveKeyGenerator::new()))
            .await
            .unwrap();

        state.creds.write().await.next_pre_key_id = 42;
        state.creds.save().await.unwrap();

        let stored = collection.find_one(CREDS_ID).await.unwrap().unwrap();
        assert_eq!(stored["nextPreKeyId"], 42);
    }

    #[tokio::test]
    async fn test_bootstrap_does_not_write() {
        let collection = Arc::new(MemoryCollection::new());
        let memory = MemoryCollection::clone(&collection);
        let _state = initialize(collection, Arc::new(CurveKeyGenerator::new()))
            .await
            .unwrap();

        assert!(memory.is_empty().await);
    }
}
