use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use arcadia_netproto::limits::MAX_MESSAGE_BYTES_CEILING;
use futures_util::StreamExt;
use tokio::io::AsyncWriteExt;
use tokio::net::{TcpListener, TcpStream};
use tokio::sync::mpsc;
use tokio_tungstenite::accept_async_with_config;
use tokio_tungstenite::tungstenite::protocol::WebSocketConfig;
use tracing::{debug, info, warn};

use super::inbound::{InboundFrame, classify_frame, next_conn_id};
use super::outbound::spawn_ws_writer;
use super::rate_limit::IpRateLimiter;
use crate::ServerState;
use crate::proto_dispatch::ConnCtx;
use crate::proto_dispatch::error::HandlerError;

/// Upper bound on IPs tracked by the connection rate limiter.
const IP_LIMITER_MAX_ENTRIES: usize = 4096;

/// How long a closing connection waits for its queued frames to flush.
const WRITER_DRAIN_TIMEOUT: Duration = Duration::from_secs(5);

/// Bind `bind` and serve WebSocket connections until the listener fails.
pub async fn run_ws_listener(bind: SocketAddr, state: Arc<ServerState>) -> anyhow::Result<()> {
    let listener = TcpListener::bind(bind).await?;
    info!(%bind, "WebSocket listener started");
    run_ws_listener_with_listener(listener, state).await
}

/// Run the accept loop on an existing listener.
pub async fn run_ws_listener_with_listener(
    listener: TcpListener,
    state: Arc<ServerState>,
) -> anyhow::Result<()> {
    let ip_limiter = IpRateLimiter::new(&state.config.rate_limit);
    let mut accepted: u64 = 0;

    loop {
        let (stream, peer) = listener.accept().await?;

        if !ip_limiter.check(peer.ip()) {
            warn!(%peer, "Connection rejected: IP rate limit exceeded");
            tokio::spawn(reject_with_rate_limit(stream));
            continue;
        }

        accepted += 1;
        if accepted % 256 == 0 {
            ip_limiter.cleanup_stale(IP_LIMITER_MAX_ENTRIES);
        }

        let state = Arc::clone(&state);
        tokio::spawn(async move {
            handle_ws_connection(stream, peer, state).await;
        });
    }
}

/// Serve one connection: handshake, then read envelopes in order until the
/// peer goes away or the session is taken over by a newer connection.
pub async fn handle_ws_connection(stream: TcpStream, peer: SocketAddr, state: Arc<ServerState>) {
    let _ = stream.set_nodelay(true);

    let ws_config = WebSocketConfig::default()
        .max_message_size(Some(MAX_MESSAGE_BYTES_CEILING))
        .max_frame_size(Some(MAX_MESSAGE_BYTES_CEILING));
    let ws_stream = match accept_async_with_config(stream, Some(ws_config)).await {
        Ok(ws) => ws,
        Err(e) => {
            warn!(%peer, error = %e, "WebSocket handshake failed");
            return;
        }
    };

    let conn_id = next_conn_id();
    let (write, mut read) = ws_stream.split();
    let (tx, rx) = mpsc::channel(state.config.outbound_queue.max(1));
    let writer = spawn_ws_writer(write, rx);

    let mut ctx = ConnCtx::new(state, conn_id, peer, tx);
    let superseded = ctx.superseded_token();
    info!(conn_id, %peer, "Client connected");

    let reason = loop {
        tokio::select! {
            biased;
            _ = superseded.cancelled() => {
                ctx.send_error(HandlerError::session_superseded()).await;
                break "superseded by a newer connection".to_string();
            }
            frame = read.next() => {
                let msg = match frame {
                    Some(Ok(msg)) => msg,
                    Some(Err(e)) => break format!("read error: {e}"),
                    None => break "peer closed".to_string(),
                };
                match classify_frame(msg) {
                    Ok(InboundFrame::Text(text)) => ctx.handle_text(&text).await,
                    Ok(InboundFrame::Close) => break "close frame".to_string(),
                    Ok(InboundFrame::Ignore) => {}
                    Err(e) => {
                        warn!(conn_id, %peer, error = %e, "Binary frame is not UTF-8");
                        ctx.send_error(HandlerError::bad_message("frame is not UTF-8 text")).await;
                    }
                }
            }
        }
    };

    // Leaves the room and releases the session before the socket goes away.
    ctx.close(&reason);
    drop(ctx);

    match tokio::time::timeout(WRITER_DRAIN_TIMEOUT, writer).await {
        Ok(Ok(Ok(()))) => {}
        Ok(Ok(Err(e))) => debug!(conn_id, %peer, error = %e, "Writer ended with error"),
        Ok(Err(e)) => debug!(conn_id, %peer, error = %e, "Writer task failed"),
        Err(_) => debug!(conn_id, %peer, "Writer still draining; detached"),
    }
}

async fn reject_with_rate_limit(mut stream: TcpStream) {
    let _ = stream
        .write_all(b"HTTP/1.1 429 Too Many Requests\r\nConnection: close\r\nContent-Length: 0\r\n\r\n")
        .await;
    let _ = stream.shutdown().await;
}
