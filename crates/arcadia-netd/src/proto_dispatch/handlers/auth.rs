use arcadia_netproto::messages::session::{Auth, AuthOk};
use arcadia_netproto::state::GameEventKind;
use tracing::{error, info, warn};

use crate::proto_dispatch::{ConnCtx, announce_departure};
use crate::proto_dispatch::error::{HandlerError, HandlerResult};
use crate::net::outbound::send_msg;

pub(crate) async fn handle(ctx: &mut ConnCtx, auth: Auth) -> HandlerResult {
    let display_name = match ctx.state.identity.resolve_identity(&auth.did) {
        Ok(name) => name,
        Err(e) => {
            warn!(conn_id = ctx.conn_id, peer = %ctx.peer, error = %e, "Identity rejected");
            return Err(HandlerError::identity_rejected(e.to_string()));
        }
    };

    // Re-auth on the same connection gives up the previous session first.
    if ctx.session.is_some() {
        ctx.release_session(GameEventKind::PlayerLeft);
    }

    let claim = ctx.state.sessions.claim(
        &auth.did,
        &display_name,
        ctx.conn_id,
        ctx.superseded_token(),
    );
    if let Some(old) = claim.superseded {
        info!(
            conn_id = ctx.conn_id,
            old_conn_id = old.conn_id,
            session_id = %claim.session.id,
            "Invalidating previous connection for resumed session"
        );
        // The old membership goes now; the socket is torn down when that
        // connection's task sees the cancellation.
        if let Some(room) = old.room {
            let kind = GameEventKind::PlayerDisconnected;
            let departed = ctx
                .state
                .rooms
                .leave(&room, claim.session.id, old.conn_id, kind);
            if let Some(departed) = departed {
                announce_departure(&room, claim.session.id, &departed, kind);
            }
        }
        old.token.cancel();
    }

    let session = claim.session;
    let reply = AuthOk {
        success: true,
        session_id: session.id.to_string(),
        did: session.identity.clone(),
        nickname: session.nickname.clone(),
        level: session.level,
        reconnected: claim.reconnected,
    };
    info!(
        conn_id = ctx.conn_id,
        session_id = %session.id,
        nickname = %session.nickname,
        reconnected = claim.reconnected,
        "Authenticated"
    );
    ctx.session = Some(session);

    if let Err(e) = send_msg(&ctx.outbound, &reply, Some(&reply.session_id), None).await {
        error!(conn_id = ctx.conn_id, error = %e, "Failed to send auth reply");
    }
    Ok(())
}
