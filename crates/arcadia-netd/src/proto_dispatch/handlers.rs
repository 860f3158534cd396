use arcadia_netproto::envelope::Envelope;
use arcadia_netproto::messages::ClientMessage;
use arcadia_netproto::msg_type::MsgType;
use tracing::{debug, warn};

use super::ConnCtx;
use crate::session::Lifecycle;

mod auth;
mod chat;
mod game_state;
mod join_room;
mod leave_room;
mod player_action;
mod player_move;

/// Types that are only meaningful from inside a room.
fn requires_room(kind: MsgType) -> bool {
    matches!(
        kind,
        MsgType::LeaveRoom
            | MsgType::PlayerMove
            | MsgType::PlayerAction
            | MsgType::Chat
            | MsgType::GameState
    )
}

/// Route one decoded envelope.
///
/// Session preconditions are checked before the payload is decoded: a
/// message that arrives too early (before `auth`, or outside a room) is
/// dropped without an error, so a client that raced a leave with an
/// in-flight action sees nothing.
pub(crate) async fn dispatch_envelope(ctx: &mut ConnCtx, env: Envelope) {
    let kind = env.msg_type;
    let conn_id = ctx.conn_id;

    if !kind.is_client_originated() {
        warn!(conn_id, msg_type = %kind, "Server-only message from client (dropped)");
        return;
    }

    match ctx.lifecycle() {
        Lifecycle::Closed => return,
        Lifecycle::Unauthenticated if kind != MsgType::Auth => {
            debug!(conn_id, msg_type = %kind, "Message before auth (dropped)");
            return;
        }
        Lifecycle::Authenticated if requires_room(kind) => {
            debug!(conn_id, msg_type = %kind, "Message outside a room (dropped)");
            return;
        }
        _ => {}
    }

    let msg = match ClientMessage::from_envelope(&env) {
        Ok(msg) => msg,
        Err(e) => {
            warn!(conn_id, msg_type = %kind, error = %e, "Bad payload");
            ctx.send_error(e.into()).await;
            return;
        }
    };

    if let Some(session) = ctx.session.as_mut() {
        session.touch();
    }
    debug!(conn_id, msg_type = %kind, "Dispatching");

    let result = match msg {
        ClientMessage::Auth(auth) => auth::handle(ctx, auth).await,
        ClientMessage::JoinRoom(join) => join_room::handle(ctx, join).await,
        ClientMessage::LeaveRoom(_) => leave_room::handle(ctx).await,
        ClientMessage::PlayerMove(mv) => player_move::handle(ctx, mv),
        ClientMessage::PlayerAction(action) => player_action::handle(ctx, action).await,
        ClientMessage::Chat(chat) => chat::handle(ctx, chat),
        ClientMessage::RequestGameState => game_state::handle(ctx).await,
    };

    if let Err(e) = result {
        warn!(conn_id, msg_type = %kind, code = ?e.code, message = %e.message, "Handler failed");
        ctx.send_error(e).await;
    }
}
