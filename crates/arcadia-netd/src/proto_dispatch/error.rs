//! Handler error types for unified error responses.

use arcadia_netproto::error::ProtoError;
use arcadia_netproto::messages::session::ErrorCode;

use crate::room::RoomError;

/// Error returned by handlers; turned into an `error` envelope for the
/// offending connection only.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HandlerError {
    pub code: ErrorCode,
    pub message: String,
}

impl HandlerError {
    pub fn new(code: ErrorCode, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
        }
    }

    pub fn bad_message(message: impl Into<String>) -> Self {
        Self::new(ErrorCode::BadMessage, message)
    }

    pub fn identity_rejected(message: impl Into<String>) -> Self {
        Self::new(ErrorCode::IdentityRejected, message)
    }

    pub fn room_full() -> Self {
        Self::new(ErrorCode::RoomFull, "room is full")
    }

    pub fn credential_failed(message: impl Into<String>) -> Self {
        Self::new(ErrorCode::CredentialFailed, message)
    }

    pub fn rate_limited() -> Self {
        Self::new(ErrorCode::RateLimited, "message rate limit exceeded")
    }

    pub fn payload_too_large(len: usize) -> Self {
        Self::new(
            ErrorCode::PayloadTooLarge,
            format!("message of {len} bytes exceeds the size limit"),
        )
    }

    pub fn session_superseded() -> Self {
        Self::new(
            ErrorCode::SessionSuperseded,
            "session resumed on another connection",
        )
    }
}

impl From<ProtoError> for HandlerError {
    fn from(e: ProtoError) -> Self {
        match e {
            ProtoError::TooLarge(len) => Self::payload_too_large(len),
            other => Self::bad_message(other.to_string()),
        }
    }
}

impl From<RoomError> for HandlerError {
    fn from(e: RoomError) -> Self {
        match e {
            RoomError::RoomFull => Self::room_full(),
            // Retried by the registry; reaching a client means a bug.
            RoomError::RoomClosed => Self::bad_message(e.to_string()),
        }
    }
}

/// Convenient Result type for handlers.
pub type HandlerResult = Result<(), HandlerError>;
