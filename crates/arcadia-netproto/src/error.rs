use thiserror::Error;

use crate::msg_type::MsgType;

#[derive(Debug, Error)]
pub enum ProtoError {
    #[error("malformed envelope: {0}")]
    Json(#[from] serde_json::Error),
    #[error("unknown message type: {0}")]
    UnknownType(String),
    #[error("message type {0} is not accepted from clients")]
    ServerOnly(MsgType),
    #[error("invalid {kind} payload: {source}")]
    BadPayload {
        kind: MsgType,
        #[source]
        source: serde_json::Error,
    },
    #[error("invalid {kind} payload: {reason}")]
    InvalidField { kind: MsgType, reason: &'static str },
    #[error("message too large: {0} bytes")]
    TooLarge(usize),
}
