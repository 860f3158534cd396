use serde::{Deserialize, Serialize};

use super::impl_message;
use crate::state::Task;

/// Position update; broadcast unchanged to the rest of the room.
#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq)]
pub struct PlayerMove {
    pub x: f64,
    pub y: f64,
}

/// `player_action` payloads, routed on the `action` field.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
#[serde(tag = "action", rename_all = "snake_case")]
pub enum PlayerAction {
    AcceptTask {
        #[serde(rename = "taskId")]
        task_id: String,
    },
    CompleteTask {
        #[serde(rename = "taskId")]
        task_id: String,
    },
    AbandonTask {
        #[serde(rename = "taskId")]
        task_id: String,
    },
    Interact {
        #[serde(default, skip_serializing_if = "Option::is_none")]
        target: Option<String>,
    },
    #[serde(other)]
    Unknown,
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct Chat {
    pub message: String,
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct ChatBroadcast {
    pub message: String,
    pub nickname: String,
}

#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum TaskUpdateAction {
    Accepted,
    Completed,
    Failed,
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct TaskUpdate {
    pub action: TaskUpdateAction,
    pub task: Task,
}

impl_message! {
    PlayerMove => PlayerMove,
    PlayerAction => PlayerAction,
    Chat => Chat,
    ChatBroadcast => Chat,
    TaskUpdate => TaskUpdate,
}
