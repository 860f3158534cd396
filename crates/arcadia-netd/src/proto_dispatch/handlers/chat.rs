use arcadia_netproto::messages::gameplay::{Chat, ChatBroadcast};
use tracing::debug;

use crate::proto_dispatch::ConnCtx;
use crate::proto_dispatch::error::HandlerResult;
use crate::room::broadcast::broadcast_msg;

/// Chat goes to the whole room, sender included.
pub(crate) fn handle(ctx: &mut ConnCtx, chat: Chat) -> HandlerResult {
    let Some(session) = ctx.session.as_ref() else {
        return Ok(());
    };
    let Some(room) = session.room.as_ref() else {
        return Ok(());
    };

    let msg = ChatBroadcast {
        message: chat.message,
        nickname: session.nickname.clone(),
    };
    let Some(recipients) = room.member_recipients(session.id, ctx.conn_id) else {
        debug!(conn_id = ctx.conn_id, room_id = %room.id, "Chat from connection without membership (dropped)");
        return Ok(());
    };
    let session_id = session.id.to_string();
    let out = broadcast_msg(&recipients, &msg, Some(&session_id), &room.id);
    debug!(
        conn_id = ctx.conn_id,
        room_id = %room.id,
        delivered = out.delivered,
        "Chat broadcast"
    );
    Ok(())
}
