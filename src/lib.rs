//! docstate
//!
//! Persistence adapter that stores the cryptographic session state of a
//! stateful messaging protocol client in an external document store, so a
//! client process can restart or move hosts without re-pairing.
//!
//! Four layers over a single document collection:
//! - [`codec`]: binary-safe conversion between in-memory values and
//!   document-safe JSON
//! - [`auth_state::RecordStore`]: atomic upsert/read/delete of named records
//! - [`auth_state::KeySpace`]: batched get/set of compound-keyed protocol
//!   keys, with self-healing of corrupted entries
//! - [`auth_state::CredsHandle`]: load-or-create credentials with a
//!   save-back path fired on every mutation notification
//!
//! The document store driver and the protocol implementation are external
//! collaborators, reached through [`collection::DocumentCollection`] and
//! [`crypto::KeyGenerator`].

pub mod auth_state;
pub mod codec;
pub mod collection;
pub mod crypto;
pub mod errors;
pub mod logging;

pub use auth_state::{
    initialize, AccountSettings, AuthCreds, AuthState, CredsHandle, KeyBatch, KeyKind, KeyRecord,
    KeySpace, RecordStore, WriteOutcome, CREDS_ID,
};
pub use codec::StateValue;
pub use collection::{Document, DocumentCollection, MemoryCollection};
pub use crypto::{CurveKeyGenerator, KeyGenerator, KeyPair, SignedPreKey};
pub use errors::{AuthStateError, AuthStateResult};
pub use logging::{init_logging, LogLevel};
