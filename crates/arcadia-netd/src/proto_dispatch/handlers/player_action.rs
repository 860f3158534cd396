use arcadia_netproto::messages::credential::CredentialIssued;
use arcadia_netproto::messages::gameplay::{PlayerAction, TaskUpdate};
use tracing::{debug, error, info, warn};

use crate::game::TaskTransition;
use crate::net::outbound::send_msg;
use crate::proto_dispatch::ConnCtx;
use crate::proto_dispatch::error::{HandlerError, HandlerResult};
use crate::reward::{RewardGrant, grant_reward};
use crate::room::broadcast::broadcast_msg;

pub(crate) async fn handle(ctx: &mut ConnCtx, action: PlayerAction) -> HandlerResult {
    match action {
        PlayerAction::AcceptTask { task_id } => {
            task_transition(ctx, &task_id, TaskTransition::Accept).await
        }
        PlayerAction::CompleteTask { task_id } => {
            task_transition(ctx, &task_id, TaskTransition::Complete).await
        }
        PlayerAction::AbandonTask { task_id } => {
            task_transition(ctx, &task_id, TaskTransition::Abandon).await
        }
        PlayerAction::Interact { target } => {
            interact(ctx, target);
            Ok(())
        }
        PlayerAction::Unknown => {
            warn!(conn_id = ctx.conn_id, "Unknown player action (ignored)");
            Ok(())
        }
    }
}

/// Move a task along its lifecycle and tell the whole room.
///
/// A task that does not exist or is not in the right status is ignored, so
/// a repeated completion grants nothing and broadcasts nothing.
async fn task_transition(
    ctx: &mut ConnCtx,
    task_id: &str,
    transition: TaskTransition,
) -> HandlerResult {
    let conn_id = ctx.conn_id;
    let Some(room) = ctx.session.as_ref().and_then(|s| s.room.clone()) else {
        return Ok(());
    };
    let Some(session_id) = ctx.session_id() else {
        return Ok(());
    };

    let Some((task, recipients)) = room.transition_task(task_id, transition, session_id) else {
        debug!(conn_id, task_id, ?transition, "Task transition does not apply (ignored)");
        return Ok(());
    };
    info!(conn_id, %session_id, room_id = %room.id, task_id, ?transition, "Task updated");

    if transition == TaskTransition::Complete {
        let mut failures = Vec::new();
        let mut issued = Vec::new();
        if let Some(session) = ctx.session.as_mut() {
            for reward in &task.rewards {
                match grant_reward(
                    ctx.state.credentials.as_ref(),
                    session,
                    &room.game_id,
                    &task,
                    reward,
                ) {
                    RewardGrant::Credential(credential) => issued.push(credential),
                    RewardGrant::CredentialFailed(e) => failures.push(e),
                    RewardGrant::Experience { level_up, .. } => {
                        if level_up {
                            room.set_member_level(session.id, session.level);
                        }
                    }
                }
            }
            ctx.state.sessions.record_progress(session, conn_id);
        }

        let sid = session_id.to_string();
        for credential in issued {
            let msg = CredentialIssued {
                message: format!("Credential earned: {}", task.name),
                credential,
            };
            if let Err(e) = send_msg(&ctx.outbound, &msg, Some(&sid), Some(&room.id)).await {
                error!(conn_id, error = %e, "Failed to deliver credential");
            }
        }
        for e in failures {
            ctx.send_error(HandlerError::credential_failed(format!(
                "reward for task {} could not be issued: {e}",
                task.id
            )))
            .await;
        }
    }

    let update = TaskUpdate {
        action: transition.update_action(),
        task,
    };
    broadcast_msg(&recipients, &update, Some(&session_id.to_string()), &room.id);
    Ok(())
}

/// Interactions are not part of the shared game state; they are only logged.
fn interact(ctx: &ConnCtx, target: Option<String>) {
    let Some(session) = ctx.session.as_ref() else {
        return;
    };
    let Some(room) = session.room.as_ref() else {
        return;
    };
    info!(
        conn_id = ctx.conn_id,
        session_id = %session.id,
        room_id = %room.id,
        ?target,
        "Player interacted"
    );
}
