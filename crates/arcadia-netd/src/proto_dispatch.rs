//! Per-connection dispatcher.
//!
//! [`ConnCtx`] owns one connection's outbound queue and its (possibly
//! absent) [`Session`]. Envelopes are handled strictly one at a time, in
//! arrival order.

use std::net::SocketAddr;
use std::sync::Arc;

use arcadia_netproto::codec::decode_envelope;
use arcadia_netproto::error::ProtoError;
use arcadia_netproto::messages::room::{PlayerUpdate, PlayerUpdateAction};
use arcadia_netproto::messages::session::ErrorMsg;
use arcadia_netproto::state::GameEventKind;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::ServerState;
use crate::net::inbound::ConnId;
use crate::net::outbound::{OutboundTx, send_msg};
use crate::net::rate_limit::ConnRateLimiter;
use crate::room::broadcast::broadcast_msg;
use crate::room::{Departed, Room};
use crate::session::{Lifecycle, Session, SessionId};

pub mod error;
pub mod handlers;

use error::HandlerError;

/// Per-connection server-side context.
pub struct ConnCtx {
    pub(crate) state: Arc<ServerState>,
    pub(crate) conn_id: ConnId,
    pub(crate) peer: SocketAddr,
    pub(crate) outbound: OutboundTx,
    pub(crate) session: Option<Session>,
    rate_limiter: Option<ConnRateLimiter>,
    /// Cancelled when a newer connection resumes this connection's session.
    superseded: CancellationToken,
    closed: bool,
}

impl ConnCtx {
    pub fn new(
        state: Arc<ServerState>,
        conn_id: ConnId,
        peer: SocketAddr,
        outbound: OutboundTx,
    ) -> Self {
        let rate_limiter = ConnRateLimiter::new(&state.config.rate_limit);
        Self {
            state,
            conn_id,
            peer,
            outbound,
            session: None,
            rate_limiter,
            superseded: CancellationToken::new(),
            closed: false,
        }
    }

    pub fn conn_id(&self) -> ConnId {
        self.conn_id
    }

    pub fn superseded_token(&self) -> CancellationToken {
        self.superseded.clone()
    }

    pub fn lifecycle(&self) -> Lifecycle {
        match (&self.session, self.closed) {
            (_, true) => Lifecycle::Closed,
            (None, false) => Lifecycle::Unauthenticated,
            (Some(session), false) => session.lifecycle(),
        }
    }

    pub fn session(&self) -> Option<&Session> {
        self.session.as_ref()
    }

    pub fn session_id(&self) -> Option<SessionId> {
        self.session.as_ref().map(|s| s.id)
    }

    /// Handle one inbound text frame.
    pub async fn handle_text(&mut self, text: &str) {
        if self.closed {
            return;
        }
        if self.superseded.is_cancelled() {
            debug!(conn_id = self.conn_id, "Message on superseded connection (dropped)");
            return;
        }

        if let Some(limiter) = &self.rate_limiter
            && !limiter.check()
        {
            warn!(conn_id = self.conn_id, peer = %self.peer, "Message rate limit exceeded");
            self.send_error(HandlerError::rate_limited()).await;
            return;
        }

        match decode_envelope(text, self.state.config.max_message_bytes) {
            Ok(env) => handlers::dispatch_envelope(self, env).await,
            Err(ProtoError::UnknownType(kind)) => {
                warn!(conn_id = self.conn_id, msg_type = %kind, "Unknown message type (dropped)");
            }
            Err(e) => {
                warn!(conn_id = self.conn_id, peer = %self.peer, error = %e, "Malformed envelope");
                self.send_error(HandlerError::from(e)).await;
            }
        }
    }

    /// Deliver an `error` envelope to this connection only.
    pub async fn send_error(&self, err: HandlerError) {
        let msg = ErrorMsg {
            code: err.code,
            message: err.message,
        };
        let session_id = self.session_id().map(|id| id.to_string());
        if let Err(e) = send_msg(&self.outbound, &msg, session_id.as_deref(), None).await {
            debug!(conn_id = self.conn_id, error = %e, "Failed to send error response");
        }
    }

    /// Drop the current room membership, notifying the rest of the room.
    ///
    /// Returns `false` if there was no membership owned by this connection.
    pub(crate) fn leave_current_room(&mut self, kind: GameEventKind) -> bool {
        let Some(session) = self.session.as_mut() else {
            return false;
        };
        let Some(room) = session.room.take() else {
            return false;
        };
        self.state
            .sessions
            .set_room(&session.identity, self.conn_id, None);
        let Some(departed) = self
            .state
            .rooms
            .leave(&room, session.id, self.conn_id, kind)
        else {
            debug!(conn_id = self.conn_id, room_id = %room.id, "Membership already taken over");
            return false;
        };

        announce_departure(&room, session.id, &departed, kind);
        info!(
            conn_id = self.conn_id,
            session_id = %session.id,
            room_id = %room.id,
            ?kind,
            remaining = departed.others.len(),
            "Player left room"
        );
        true
    }

    /// Release the session held by this connection, if any.
    pub(crate) fn release_session(&mut self, kind: GameEventKind) {
        self.leave_current_room(kind);
        if let Some(session) = self.session.take() {
            self.state.sessions.record_progress(&session, self.conn_id);
            self.state.sessions.release(&session.identity, self.conn_id);
        }
    }

    /// Tear down the connection's state. Runs once; later calls are no-ops.
    pub fn close(&mut self, reason: &str) {
        if self.closed {
            return;
        }
        let session_id = self.session_id();
        self.release_session(GameEventKind::PlayerDisconnected);
        self.closed = true;
        info!(
            conn_id = self.conn_id,
            peer = %self.peer,
            session_id = ?session_id,
            %reason,
            "Client disconnected"
        );
    }
}

/// Tell the rest of `room` that `session_id` is gone.
pub(crate) fn announce_departure(
    room: &Room,
    session_id: SessionId,
    departed: &Departed,
    kind: GameEventKind,
) {
    let action = match kind {
        GameEventKind::PlayerDisconnected => PlayerUpdateAction::Disconnected,
        _ => PlayerUpdateAction::Left,
    };
    let update = PlayerUpdate {
        action,
        player: departed.member.info(),
    };
    broadcast_msg(&departed.others, &update, Some(&session_id.to_string()), &room.id);
}

impl Drop for ConnCtx {
    fn drop(&mut self) {
        self.close("connection dropped");
    }
}
