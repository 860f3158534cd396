use std::str::Utf8Error;
use std::sync::atomic::{AtomicU64, Ordering};

use tokio_tungstenite::tungstenite::Message;

/// Unique connection identifier assigned by the server.
pub type ConnId = u64;

static NEXT_CONN_ID: AtomicU64 = AtomicU64::new(1);

pub fn next_conn_id() -> ConnId {
    NEXT_CONN_ID.fetch_add(1, Ordering::Relaxed)
}

/// What the reader loop does with one WebSocket frame.
#[derive(Debug)]
pub enum InboundFrame {
    /// A text payload to decode as an envelope.
    Text(String),
    /// Peer asked to close.
    Close,
    /// Control frames handled by the WebSocket layer.
    Ignore,
}

/// Classify a frame. Binary frames are accepted when they hold UTF-8 text.
pub fn classify_frame(msg: Message) -> Result<InboundFrame, Utf8Error> {
    Ok(match msg {
        Message::Text(text) => InboundFrame::Text(text.as_str().to_owned()),
        Message::Binary(bytes) => InboundFrame::Text(std::str::from_utf8(&bytes)?.to_owned()),
        Message::Close(_) => InboundFrame::Close,
        Message::Ping(_) | Message::Pong(_) | Message::Frame(_) => InboundFrame::Ignore,
    })
}
