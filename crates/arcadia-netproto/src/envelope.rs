use chrono::{DateTime, Utc};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::ProtoError;
use crate::msg_type::MsgType;

/// The unit exchanged over a connection, in both directions.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Envelope {
    #[serde(rename = "type")]
    pub msg_type: MsgType,
    #[serde(default)]
    pub data: Value,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub session_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub room_id: Option<String>,
    pub timestamp: DateTime<Utc>,
}

impl Envelope {
    /// Build an envelope stamped with the server clock.
    pub fn new(msg_type: MsgType, data: Value) -> Self {
        Self {
            msg_type,
            data,
            session_id: None,
            room_id: None,
            timestamp: Utc::now(),
        }
    }

    pub fn with_session(mut self, session_id: impl Into<String>) -> Self {
        self.session_id = Some(session_id.into());
        self
    }

    pub fn with_room(mut self, room_id: impl Into<String>) -> Self {
        self.room_id = Some(room_id.into());
        self
    }

    /// Decode `data` as the payload of this envelope's type.
    ///
    /// A `null` payload is treated as an empty object so that payloads with
    /// only optional fields accept a missing `data`.
    pub fn payload<T: DeserializeOwned>(&self) -> Result<T, ProtoError> {
        let data = match &self.data {
            Value::Null => Value::Object(Default::default()),
            other => other.clone(),
        };
        serde_json::from_value(data).map_err(|source| ProtoError::BadPayload {
            kind: self.msg_type,
            source,
        })
    }

    pub fn to_json(&self) -> Result<String, ProtoError> {
        Ok(serde_json::to_string(self)?)
    }
}

/// Inbound shape: `type` stays a string until it is checked against the
/// closed enumeration, and any client-supplied `timestamp` is ignored.
#[derive(Deserialize, Debug)]
#[serde(rename_all = "camelCase")]
pub(crate) struct InboundEnvelope {
    #[serde(rename = "type")]
    pub msg_type: String,
    #[serde(default)]
    pub data: Value,
    #[serde(default)]
    pub session_id: Option<String>,
    #[serde(default)]
    pub room_id: Option<String>,
}
