use serde::{Deserialize, Serialize};
use strum::IntoStaticStr;

use super::impl_message;

/// First message on every connection.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct Auth {
    /// Identity reference (a DID), resolved once per `auth`.
    #[serde(alias = "identityRef")]
    pub did: String,
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct AuthOk {
    pub success: bool,
    pub session_id: String,
    pub did: String,
    pub nickname: String,
    pub level: u32,
    /// True when an existing session record for this identity was resumed.
    pub reconnected: bool,
}

/// Server error codes sent to clients.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, IntoStaticStr)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum ErrorCode {
    /// Payload for a known type failed to decode or validate.
    BadMessage,
    /// The identity collaborator rejected the identity reference.
    IdentityRejected,
    /// Room is at capacity.
    RoomFull,
    /// A credential reward could not be issued.
    CredentialFailed,
    /// Per-connection message rate exceeded.
    RateLimited,
    /// Frame exceeds the configured size limit.
    PayloadTooLarge,
    /// The session was taken over by a newer connection.
    SessionSuperseded,
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct ErrorMsg {
    pub code: ErrorCode,
    pub message: String,
}

impl_message! {
    Auth => Auth,
    AuthOk => Auth,
    ErrorMsg => Error,
}
