//! Binary-safe value codec
//!
//! Session-state values carry raw byte buffers at arbitrary nesting depth,
//! but the document store only holds JSON. Buffers are stored as the tagged
//! object `{"type": "Buffer", "data": "<base64>"}`; decoding restores the
//! bytes. A mapping that does not match that exact shape is never treated
//! as a buffer, so structurally similar user data passes through unchanged.

use std::collections::BTreeMap;

use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine as _;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use serde_json::{Number, Value};

use crate::errors::AuthStateResult;

/// Tag value marking a serialized byte buffer
pub const BUFFER_TAG: &str = "Buffer";

const TAG_FIELD: &str = "type";
const DATA_FIELD: &str = "data";

/// In-memory session-state value
///
/// The protocol collaborator hands keyed entries to the adapter in this
/// shape: scalars, byte buffers, ordered sequences, and string-keyed
/// mappings.
#[derive(Debug, Clone, PartialEq)]
pub enum StateValue {
    Null,
    Bool(bool),
    Number(Number),
    String(String),
    Bytes(Vec<u8>),
    Array(Vec<StateValue>),
    Object(BTreeMap<String, StateValue>),
}

impl StateValue {
    /// Encode into a document-safe JSON value, tagging every buffer
    pub fn to_json(&self) -> Value {
        match self {
            StateValue::Null => Value::Null,
            StateValue::Bool(b) => Value::Bool(*b),
            StateValue::Number(n) => Value::Number(n.clone()),
            StateValue::String(s) => Value::String(s.clone()),
            StateValue::Bytes(bytes) => tagged_buffer(bytes),
            StateValue::Array(items) => {
                Value::Array(items.iter().map(StateValue::to_json).collect())
            }
            StateValue::Object(map) => Value::Object(
                map.iter()
                    .map(|(k, v)| (k.clone(), v.to_json()))
                    .collect(),
            ),
        }
    }

    /// Decode from a document-safe JSON value, restoring tagged buffers
    pub fn from_json(value: Value) -> Self {
        match value {
            Value::Null => StateValue::Null,
            Value::Bool(b) => StateValue::Bool(b),
            Value::Number(n) => StateValue::Number(n),
            Value::String(s) => StateValue::String(s),
            Value::Array(items) => {
                StateValue::Array(items.into_iter().map(StateValue::from_json).collect())
            }
            Value::Object(map) => {
                if let Some(bytes) = untag_buffer(&map) {
                    return StateValue::Bytes(bytes);
                }
                StateValue::Object(
                    map.into_iter()
                        .map(|(k, v)| (k, StateValue::from_json(v)))
                        .collect(),
                )
            }
        }
    }
}

impl Serialize for StateValue {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        self.to_json().serialize(serializer)
    }
}

impl<'de> Deserialize<'de> for StateValue {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let value = Value::deserialize(deserializer)?;
        Ok(StateValue::from_json(value))
    }
}

fn tagged_buffer(bytes: &[u8]) -> Value {
    let mut map = serde_json::Map::new();
    map.insert(TAG_FIELD.to_string(), Value::String(BUFFER_TAG.to_string()));
    map.insert(DATA_FIELD.to_string(), Value::String(BASE64.encode(bytes)));
    Value::Object(map)
}

/// Returns the buffer bytes when `map` is exactly the tagged shape.
///
/// The match is strict: two fields, `type == "Buffer"`, and `data` holding
/// valid base64. Anything else is ordinary user data.
fn untag_buffer(map: &serde_json::Map<String, Value>) -> Option<Vec<u8>> {
    if map.len() != 2 {
        return None;
    }
    match map.get(TAG_FIELD) {
        Some(Value::String(tag)) if tag == BUFFER_TAG => {}
        _ => return None,
    }
    match map.get(DATA_FIELD) {
        Some(Value::String(data)) => BASE64.decode(data).ok(),
        _ => None,
    }
}

/// Encode any serializable record into a document-safe JSON value.
///
/// Typed records mark their byte fields with `#[serde(with = "buffer_json")]`
/// so buffers come out tagged; [`StateValue`] tags its buffers itself.
pub fn encode<T: Serialize + ?Sized>(value: &T) -> AuthStateResult<Value> {
    Ok(serde_json::to_value(value)?)
}

/// Decode a document-safe JSON value back into a record
pub fn decode<T: DeserializeOwned>(value: Value) -> AuthStateResult<T> {
    Ok(serde_json::from_value(value)?)
}

/// Serde field adapter storing `Vec<u8>` as the tagged buffer object
pub mod buffer_json {
    use serde::de::Error as _;
    use serde::ser::SerializeStruct;
    use serde::{Deserialize, Deserializer, Serializer};

    use super::{BASE64, BUFFER_TAG, DATA_FIELD, TAG_FIELD};
    use base64::Engine as _;

    pub fn serialize<S: Serializer>(bytes: &[u8], serializer: S) -> Result<S::Ok, S::Error> {
        let mut state = serializer.serialize_struct("Buffer", 2)?;
        state.serialize_field(TAG_FIELD, BUFFER_TAG)?;
        state.serialize_field(DATA_FIELD, &BASE64.encode(bytes))?;
        state.end()
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Vec<u8>, D::Error> {
        #[derive(Deserialize)]
        struct Tagged {
            #[serde(rename = "type")]
            tag: String,
            data: String,
        }

        let tagged = Tagged::deserialize(deserializer)?;
        if tagged.tag != BUFFER_TAG {
            return Err(D::Error::custom(format!(
                "expected buffer tag, got {}",
                tagged.tag
            )));
        }
        BASE64.decode(&tagged.data).map_err(D::Error::custom)
    }
}
