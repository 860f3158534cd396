//! Room fan-out.
//!
//! Recipients are collected under the room lock by [`super::Room`] methods;
//! delivery happens here, after the lock is released.

use arcadia_netproto::codec::encode_message;
use arcadia_netproto::envelope::Envelope;
use arcadia_netproto::messages::Message;
use tokio::sync::mpsc::error::TrySendError;
use tracing::{error, warn};

use crate::net::outbound::{OutboundTx, envelope_frame};

/// Delivery counts for one fan-out.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct FanOut {
    pub delivered: usize,
    pub dropped: usize,
}

/// Deliver `env` to every recipient without waiting.
///
/// The envelope is encoded once. A full or closed queue drops the frame for
/// that recipient only.
pub fn fan_out(recipients: &[OutboundTx], env: &Envelope) -> FanOut {
    let frame = match envelope_frame(env) {
        Ok(frame) => frame,
        Err(e) => {
            error!(msg_type = %env.msg_type, error = %e, "Failed to encode broadcast");
            return FanOut {
                dropped: recipients.len(),
                ..FanOut::default()
            };
        }
    };

    let mut out = FanOut::default();
    for tx in recipients {
        match tx.try_send(frame.clone()) {
            Ok(()) => out.delivered += 1,
            Err(TrySendError::Full(_)) => {
                warn!(msg_type = %env.msg_type, "Outbound queue full; broadcast dropped");
                out.dropped += 1;
            }
            Err(TrySendError::Closed(_)) => out.dropped += 1,
        }
    }
    out
}

/// Encode `payload` into an envelope stamped with the sender and room, then
/// fan it out.
pub fn broadcast_msg<T: Message>(
    recipients: &[OutboundTx],
    payload: &T,
    session_id: Option<&str>,
    room_id: &str,
) -> FanOut {
    match encode_message(payload) {
        Ok(mut env) => {
            if let Some(id) = session_id {
                env = env.with_session(id);
            }
            fan_out(recipients, &env.with_room(room_id))
        }
        Err(e) => {
            error!(msg_type = %T::msg_type(), error = %e, "Failed to encode broadcast");
            FanOut {
                dropped: recipients.len(),
                ..FanOut::default()
            }
        }
    }
}
