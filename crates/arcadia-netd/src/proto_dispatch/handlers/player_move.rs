use arcadia_netproto::messages::gameplay::PlayerMove;
use arcadia_netproto::state::Position;
use tracing::{debug, trace};

use crate::proto_dispatch::ConnCtx;
use crate::proto_dispatch::error::HandlerResult;
use crate::room::broadcast::broadcast_msg;

/// Last write wins; the mover gets no echo.
pub(crate) fn handle(ctx: &mut ConnCtx, mv: PlayerMove) -> HandlerResult {
    let conn_id = ctx.conn_id;
    let Some(session) = ctx.session.as_mut() else {
        return Ok(());
    };
    let Some(room) = session.room.clone() else {
        return Ok(());
    };

    let position = Position::new(mv.x, mv.y);
    session.position = position;

    let Some(others) = room.move_member(session.id, conn_id, position) else {
        debug!(conn_id, room_id = %room.id, "Move from connection without membership (dropped)");
        return Ok(());
    };

    let session_id = session.id.to_string();
    let out = broadcast_msg(&others, &mv, Some(&session_id), &room.id);
    trace!(conn_id, x = mv.x, y = mv.y, delivered = out.delivered, "Position broadcast");
    Ok(())
}
