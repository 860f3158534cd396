use std::str::FromStr;

use chrono::Utc;

use crate::{
    envelope::{Envelope, InboundEnvelope},
    error::ProtoError,
    messages::Message,
    msg_type::MsgType,
};

/// Wrap a message payload into an envelope of its type.
///
/// The envelope is stamped with the server clock; callers attach
/// `sessionId`/`roomId` with [`Envelope::with_session`] and
/// [`Envelope::with_room`].
///
/// # Example
/// ```ignore
/// use arcadia_netproto::codec::encode_message;
/// use arcadia_netproto::messages::gameplay::PlayerMove;
///
/// let env = encode_message(&PlayerMove { x: 5.0, y: 7.0 })?.with_session(id);
/// let text = env.to_json()?;
/// ```
pub fn encode_message<T: Message>(payload: &T) -> Result<Envelope, ProtoError> {
    let data = serde_json::to_value(payload)?;
    Ok(Envelope::new(T::msg_type(), data))
}

/// Decode one inbound text frame.
///
/// The `type` must belong to the closed [`MsgType`] set, otherwise
/// [`ProtoError::UnknownType`] is returned. The payload is not decoded here;
/// see [`crate::messages::ClientMessage::from_envelope`]. Any client-supplied
/// timestamp is replaced with the time of receipt.
pub fn decode_envelope(text: &str, max_len: usize) -> Result<Envelope, ProtoError> {
    if text.len() > max_len {
        return Err(ProtoError::TooLarge(text.len()));
    }

    let raw: InboundEnvelope = serde_json::from_str(text)?;
    let msg_type =
        MsgType::from_str(&raw.msg_type).map_err(|_| ProtoError::UnknownType(raw.msg_type))?;

    Ok(Envelope {
        msg_type,
        data: raw.data,
        session_id: raw.session_id,
        room_id: raw.room_id,
        timestamp: Utc::now(),
    })
}
