use arcadia_netproto::messages::room::LeaveRoomOk;
use arcadia_netproto::state::GameEventKind;
use tracing::error;

use crate::net::outbound::send_msg;
use crate::proto_dispatch::ConnCtx;
use crate::proto_dispatch::error::HandlerResult;

pub(crate) async fn handle(ctx: &mut ConnCtx) -> HandlerResult {
    let room_id = ctx
        .session
        .as_ref()
        .and_then(|s| s.room.as_ref())
        .map(|r| r.id.clone());
    let success = ctx.leave_current_room(GameEventKind::PlayerLeft);

    let session_id = ctx.session_id().map(|id| id.to_string());
    let reply = LeaveRoomOk { success };
    if let Err(e) = send_msg(
        &ctx.outbound,
        &reply,
        session_id.as_deref(),
        room_id.as_deref(),
    )
    .await
    {
        error!(conn_id = ctx.conn_id, error = %e, "Failed to send leave reply");
    }
    Ok(())
}
