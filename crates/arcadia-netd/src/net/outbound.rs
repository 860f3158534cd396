use arcadia_netproto::codec::encode_message;
use arcadia_netproto::envelope::Envelope;
use arcadia_netproto::error::ProtoError;
use arcadia_netproto::messages::Message;
use futures_util::{Sink, SinkExt};
use thiserror::Error;
use tokio::sync::mpsc;
use tokio_tungstenite::tungstenite;

/// Outbound channel sender type. Frames are fully encoded WebSocket messages.
pub type OutboundTx = mpsc::Sender<tungstenite::Message>;

#[derive(Debug, Error)]
pub enum OutboundError {
    #[error(transparent)]
    Encode(#[from] ProtoError),
    #[error("connection closed")]
    Closed,
}

/// Spawn a writer task draining `rx` into the WebSocket sink.
///
/// Exits when every sender is dropped or the socket write fails. A close
/// frame is sent on the way out so the peer sees an orderly shutdown.
pub fn spawn_ws_writer<S>(
    mut write: S,
    mut rx: mpsc::Receiver<tungstenite::Message>,
) -> tokio::task::JoinHandle<anyhow::Result<()>>
where
    S: Sink<tungstenite::Message, Error = tungstenite::Error> + Unpin + Send + 'static,
{
    tokio::spawn(async move {
        while let Some(frame) = rx.recv().await {
            let closing = frame.is_close();
            write.send(frame).await?;
            if closing {
                return Ok(());
            }
        }
        let _ = write.send(tungstenite::Message::Close(None)).await;
        Ok(())
    })
}

/// Serialize an envelope into a text frame.
pub fn envelope_frame(env: &Envelope) -> Result<tungstenite::Message, ProtoError> {
    Ok(tungstenite::Message::text(env.to_json()?))
}

/// Send an envelope to one connection, waiting for queue space.
pub async fn send_envelope(tx: &OutboundTx, env: &Envelope) -> Result<(), OutboundError> {
    let frame = envelope_frame(env)?;
    tx.send(frame).await.map_err(|_| OutboundError::Closed)
}

/// Encode a message into an envelope and send it to one connection.
///
/// `session_id` and `room_id` are attached to the envelope when given.
pub async fn send_msg<T: Message>(
    tx: &OutboundTx,
    payload: &T,
    session_id: Option<&str>,
    room_id: Option<&str>,
) -> Result<(), OutboundError> {
    let mut env = encode_message(payload)?;
    if let Some(id) = session_id {
        env = env.with_session(id);
    }
    if let Some(id) = room_id {
        env = env.with_room(id);
    }
    send_envelope(tx, &env).await
}
