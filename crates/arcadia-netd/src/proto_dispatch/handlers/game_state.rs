use tracing::error;

use crate::net::outbound::send_msg;
use crate::proto_dispatch::ConnCtx;
use crate::proto_dispatch::error::HandlerResult;

/// Reply with the current snapshot of the sender's room.
pub(crate) async fn handle(ctx: &mut ConnCtx) -> HandlerResult {
    let Some(session) = ctx.session.as_ref() else {
        return Ok(());
    };
    let Some(room) = session.room.as_ref() else {
        return Ok(());
    };

    let snapshot = room.snapshot();
    let session_id = session.id.to_string();
    if let Err(e) = send_msg(&ctx.outbound, &snapshot, Some(&session_id), Some(&room.id)).await {
        error!(conn_id = ctx.conn_id, error = %e, "Failed to send game state");
    }
    Ok(())
}
