use serde::de::DeserializeOwned;

use crate::envelope::Envelope;
use crate::error::ProtoError;
use crate::limits::{MAX_CHAT_CHARS, MAX_IDENTITY_REF_LEN, MAX_ROOM_ID_LEN};
use crate::msg_type::MsgType;

/// A payload type carried in the `data` field of an envelope.
///
/// Implemented through `impl_message!`; several payloads may share one
/// `MsgType` (a client request and the server's reply use the same type).
pub trait Message: serde::Serialize + DeserializeOwned + Send + 'static {
    /// Returns the envelope type for this payload.
    fn msg_type() -> MsgType;
}

macro_rules! impl_message {
    ($($ty:ty => $kind:ident),* $(,)?) => {
        $(
            impl $crate::messages::Message for $ty {
                fn msg_type() -> $crate::msg_type::MsgType {
                    $crate::msg_type::MsgType::$kind
                }
            }
        )*
    };
}
pub(crate) use impl_message;

pub mod credential;
pub mod gameplay;
pub mod room;
pub mod session;

use gameplay::{Chat, PlayerAction, PlayerMove};
use room::{JoinRoom, LeaveRoom};
use session::Auth;

/// A validated message from a client, one variant per routable type.
#[derive(Debug, Clone, PartialEq)]
pub enum ClientMessage {
    Auth(Auth),
    JoinRoom(JoinRoom),
    LeaveRoom(LeaveRoom),
    PlayerMove(PlayerMove),
    PlayerAction(PlayerAction),
    Chat(Chat),
    RequestGameState,
}

impl ClientMessage {
    /// Decode and validate the payload of `envelope` for its type.
    pub fn from_envelope(envelope: &Envelope) -> Result<Self, ProtoError> {
        let kind = envelope.msg_type;
        let invalid = |reason| ProtoError::InvalidField { kind, reason };

        match kind {
            MsgType::Auth => {
                let auth: Auth = envelope.payload()?;
                let did = auth.did.trim();
                if did.is_empty() {
                    return Err(invalid("did must not be empty"));
                }
                if did.len() > MAX_IDENTITY_REF_LEN {
                    return Err(invalid("did is too long"));
                }
                Ok(Self::Auth(Auth {
                    did: did.to_string(),
                }))
            }
            MsgType::JoinRoom => {
                let join: JoinRoom = envelope.payload()?;
                for id in [&join.room_id, &join.game_id].into_iter().flatten() {
                    if id.is_empty() || id.len() > MAX_ROOM_ID_LEN {
                        return Err(invalid("room and game ids must be 1..=64 bytes"));
                    }
                }
                Ok(Self::JoinRoom(join))
            }
            MsgType::LeaveRoom => Ok(Self::LeaveRoom(envelope.payload()?)),
            MsgType::PlayerMove => {
                let mv: PlayerMove = envelope.payload()?;
                if !mv.x.is_finite() || !mv.y.is_finite() {
                    return Err(invalid("coordinates must be finite"));
                }
                Ok(Self::PlayerMove(mv))
            }
            MsgType::PlayerAction => Ok(Self::PlayerAction(envelope.payload()?)),
            MsgType::Chat => {
                let chat: Chat = envelope.payload()?;
                let message = chat.message.trim();
                if message.is_empty() {
                    return Err(invalid("message must not be empty"));
                }
                if message.chars().count() > MAX_CHAT_CHARS {
                    return Err(invalid("message is too long"));
                }
                Ok(Self::Chat(Chat {
                    message: message.to_string(),
                }))
            }
            MsgType::GameState => Ok(Self::RequestGameState),
            MsgType::PlayerUpdate | MsgType::TaskUpdate | MsgType::Credential | MsgType::Error => {
                Err(ProtoError::ServerOnly(kind))
            }
        }
    }

    pub fn msg_type(&self) -> MsgType {
        match self {
            Self::Auth(_) => MsgType::Auth,
            Self::JoinRoom(_) => MsgType::JoinRoom,
            Self::LeaveRoom(_) => MsgType::LeaveRoom,
            Self::PlayerMove(_) => MsgType::PlayerMove,
            Self::PlayerAction(_) => MsgType::PlayerAction,
            Self::Chat(_) => MsgType::Chat,
            Self::RequestGameState => MsgType::GameState,
        }
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    fn envelope(kind: MsgType, data: serde_json::Value) -> Envelope {
        Envelope::new(kind, data)
    }

    #[test]
    fn join_room_accepts_missing_data() {
        let msg = ClientMessage::from_envelope(&envelope(MsgType::JoinRoom, json!(null))).unwrap();
        assert_eq!(
            msg,
            ClientMessage::JoinRoom(JoinRoom {
                room_id: None,
                game_id: None
            })
        );
    }

    #[test]
    fn move_requires_both_coordinates() {
        let err = ClientMessage::from_envelope(&envelope(MsgType::PlayerMove, json!({"x": 1.0})))
            .unwrap_err();
        assert!(matches!(
            err,
            ProtoError::BadPayload {
                kind: MsgType::PlayerMove,
                ..
            }
        ));
    }

    #[test]
    fn auth_trims_and_rejects_blank_identity() {
        let ok = ClientMessage::from_envelope(&envelope(
            MsgType::Auth,
            json!({"did": "  did:example:alice  "}),
        ))
        .unwrap();
        assert_eq!(
            ok,
            ClientMessage::Auth(Auth {
                did: "did:example:alice".into()
            })
        );

        let err =
            ClientMessage::from_envelope(&envelope(MsgType::Auth, json!({"did": "   "}))).unwrap_err();
        assert!(matches!(err, ProtoError::InvalidField { .. }));
    }

    #[test]
    fn auth_accepts_identity_ref_alias() {
        let msg = ClientMessage::from_envelope(&envelope(
            MsgType::Auth,
            json!({"identityRef": "did:example:bob"}),
        ))
        .unwrap();
        assert_eq!(msg.msg_type(), MsgType::Auth);
    }

    #[test]
    fn chat_length_is_bounded() {
        let long = "x".repeat(MAX_CHAT_CHARS + 1);
        let err = ClientMessage::from_envelope(&envelope(MsgType::Chat, json!({"message": long})))
            .unwrap_err();
        assert!(matches!(err, ProtoError::InvalidField { .. }));
    }

    #[test]
    fn server_only_types_are_refused() {
        let err =
            ClientMessage::from_envelope(&envelope(MsgType::TaskUpdate, json!({}))).unwrap_err();
        assert!(matches!(err, ProtoError::ServerOnly(MsgType::TaskUpdate)));
    }
}
