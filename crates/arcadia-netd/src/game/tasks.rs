//! Task lifecycle: `available -> active -> completed | failed`.

use arcadia_netproto::messages::gameplay::TaskUpdateAction;
use arcadia_netproto::state::{GameEventKind, GameState, Task, TaskStatus};

/// A requested change of a task's status.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TaskTransition {
    Accept,
    Complete,
    Abandon,
}

impl TaskTransition {
    pub const fn target(self) -> TaskStatus {
        match self {
            TaskTransition::Accept => TaskStatus::Active,
            TaskTransition::Complete => TaskStatus::Completed,
            TaskTransition::Abandon => TaskStatus::Failed,
        }
    }

    pub const fn update_action(self) -> TaskUpdateAction {
        match self {
            TaskTransition::Accept => TaskUpdateAction::Accepted,
            TaskTransition::Complete => TaskUpdateAction::Completed,
            TaskTransition::Abandon => TaskUpdateAction::Failed,
        }
    }

    pub const fn event_kind(self) -> GameEventKind {
        match self {
            TaskTransition::Accept => GameEventKind::TaskAccepted,
            TaskTransition::Complete => GameEventKind::TaskCompleted,
            TaskTransition::Abandon => GameEventKind::TaskFailed,
        }
    }
}

/// Apply `transition` to the task named `task_id`.
///
/// Returns the updated task, or `None` if the task does not exist or is not
/// in the status the transition starts from. A terminal task never changes
/// again, so completion and its rewards happen at most once.
pub fn transition_task(
    state: &mut GameState,
    task_id: &str,
    transition: TaskTransition,
) -> Option<Task> {
    let task = state.task_mut(task_id)?;
    let next = transition.target();
    if !task.status.can_transition_to(next) {
        return None;
    }

    task.status = next;
    if next == TaskStatus::Completed {
        for objective in &mut task.objectives {
            objective.current = objective.required;
            objective.completed = true;
        }
    }
    Some(task.clone())
}
