use std::sync::Arc;

use arcadia_netproto::messages::room::{JoinRoom, JoinRoomOk, PlayerUpdate, PlayerUpdateAction};
use arcadia_netproto::state::GameEventKind;
use tracing::{debug, error, info, warn};

use crate::net::outbound::send_msg;
use crate::proto_dispatch::ConnCtx;
use crate::proto_dispatch::error::{HandlerError, HandlerResult};
use crate::room::Member;
use crate::room::broadcast::broadcast_msg;

pub(crate) async fn handle(ctx: &mut ConnCtx, join: JoinRoom) -> HandlerResult {
    let room_id = join
        .room_id
        .unwrap_or_else(|| ctx.state.config.default_room_id.clone());
    let game_id = join
        .game_id
        .unwrap_or_else(|| ctx.state.config.default_game_id.clone());

    // The old membership is dropped before the new one is attempted; a
    // full target room leaves the session without a room.
    ctx.leave_current_room(GameEventKind::PlayerLeft);

    let conn_id = ctx.conn_id;
    let Some(session) = ctx.session.as_mut() else {
        return Ok(());
    };

    let member = Member::from_session(session, conn_id, ctx.outbound.clone());
    let (room, joined) = match ctx.state.rooms.join(&room_id, &game_id, member) {
        Ok(v) => v,
        Err(e) => {
            warn!(conn_id, session_id = %session.id, %room_id, error = %e, "Join refused");
            return Err(HandlerError::from(e));
        }
    };

    if let Some(replaced) = &joined.replaced {
        debug!(
            conn_id,
            old_conn_id = replaced.conn_id,
            %room_id,
            "Replaced membership held by an older connection"
        );
    }

    // A newer connection took the identity over while this join was in
    // flight; undo it quietly.
    if !ctx
        .state
        .sessions
        .set_room(&session.identity, conn_id, Some(Arc::clone(&room)))
    {
        debug!(conn_id, %room_id, "Session superseded during join; membership withdrawn");
        ctx.state
            .rooms
            .leave(&room, session.id, conn_id, GameEventKind::PlayerDisconnected);
        return Ok(());
    }

    session.position = joined.spawn;
    session.room = Some(room);
    let session_id = session.id.to_string();
    info!(
        conn_id,
        %session_id,
        %room_id,
        members = joined.room.players.len(),
        "Player joined room"
    );

    let update = PlayerUpdate {
        action: PlayerUpdateAction::Joined,
        player: joined.player,
    };
    let reply = JoinRoomOk {
        success: true,
        room: joined.room,
        game_state: joined.game_state,
        spawn: joined.spawn,
    };

    if let Err(e) = send_msg(&ctx.outbound, &reply, Some(&session_id), Some(&room_id)).await {
        error!(conn_id, error = %e, "Failed to send join reply");
    }
    broadcast_msg(&joined.others, &update, Some(&session_id), &room_id);
    Ok(())
}
