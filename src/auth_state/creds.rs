//! Credentials record
//!
//! The single long-lived session-identity document, stored under the fixed
//! id `"creds"`. Field names follow the protocol's wire layout so an
//! existing stored session remains readable.

use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine as _;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::crypto::{KeyGenerator, KeyPair, SignedPreKey};

/// Account-level settings carried inside the credentials record
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct AccountSettings {
    pub unarchive_chats: bool,
}

/// Session credentials, mutated in place by the protocol collaborator and
/// persisted verbatim on every save
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AuthCreds {
    pub noise_key: KeyPair,
    pub signed_identity_key: KeyPair,
    pub signed_pre_key: SignedPreKey,
    pub registration_id: u32,
    pub adv_secret_key: String,
    /// Opaque processed-history markers owned by the collaborator
    pub processed_history_messages: Vec<Value>,
    pub next_pre_key_id: u32,
    pub first_unuploaded_pre_key_id: u32,
    pub account_settings: AccountSettings,
}

impl AuthCreds {
    /// Synthesize a fresh credentials record.
    ///
    /// The record is not written here; it first reaches the store on the
    /// first save.
    pub fn bootstrap(generator: &dyn KeyGenerator) -> Self {
        let identity = generator.key_pair();
        let signed_pre_key = generator.signed_pre_key(&identity, 1);

        AuthCreds {
            noise_key: generator.key_pair(),
            signed_identity_key: identity,
            signed_pre_key,
            registration_id: generator.registration_id(),
            adv_secret_key: BASE64.encode(generator.random_bytes(32)),
            processed_history_messages: Vec::new(),
            next_pre_key_id: 1,
            first_unuploaded_pre_key_id: 1,
            account_settings: AccountSettings::default(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::crypto::CurveKeyGenerator;

    #[test]
    fn test_bootstrap_defaults() {
        let creds = AuthCreds::bootstrap(&CurveKeyGenerator::new());

        assert_eq!(creds.next_pre_key_id, 1);
        assert_eq!(creds.first_unuploaded_pre_key_id, 1);
        assert_eq!(creds.signed_pre_key.key_id, 1);
        assert!(!creds.account_settings.unarchive_chats);
        assert!(creds.processed_history_messages.is_empty());
        assert!(creds.registration_id < 16384);

        let secret = BASE64.decode(&creds.adv_secret_key).unwrap();
        assert_eq!(secret.len(), 32);
    }

    #[test]
    fn test_wire_field_names() {
        let creds = AuthCreds::bootstrap(&CurveKeyGenerator::new());
        let encoded = serde_json::to_value(&creds).unwrap();
        let fields = encoded.as_object().unwrap();

        for name in [
            "noiseKey",
            "signedIdentityKey",
            "signedPreKey",
            "registrationId",
            "advSecretKey",
            "processedHistoryMessages",
            "nextPreKeyId",
            "firstUnuploadedPreKeyId",
            "accountSettings",
        ] {
            assert!(fields.contains_key(name), "missing field {name}");
        }
        assert!(fields["accountSettings"]
            .as_object()
            .unwrap()
            .contains_key("unarchiveChats"));
        assert_eq!(fields["noiseKey"]["public"]["type"], "Buffer");
    }

    #[test]
    fn test_creds_round_trip() {
        let creds = AuthCreds::bootstrap(&CurveKeyGenerator::new());
        let encoded = serde_json::to_value(&creds).unwrap();
        let decoded: AuthCreds = serde_json::from_value(encoded).unwrap();

        assert_eq!(decoded.noise_key, creds.noise_key);
        assert_eq!(decoded.signed_pre_key, creds.signed_pre_key);
        assert_eq!(decoded.adv_secret_key, creds.adv_secret_key);
        assert_eq!(decoded.registration_id, creds.registration_id);
    }
}
