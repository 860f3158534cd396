//! Room game-state types.
//!
//! These are owned by a room on the server and serialized verbatim into
//! `join_room` replies and `game_state` snapshots.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Default)]
pub struct Position {
    pub x: f64,
    pub y: f64,
}

impl Position {
    pub const fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }
}

/// Connection status of a player.
#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq, Default)]
#[serde(rename_all = "snake_case")]
pub enum PresenceStatus {
    #[default]
    Online,
    Offline,
}

/// Coarse status of a room's game.
#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq, Default)]
#[serde(rename_all = "snake_case")]
pub enum GameStatus {
    #[default]
    Waiting,
    Playing,
    Finished,
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct MapObject {
    pub id: String,
    #[serde(rename = "type")]
    pub kind: String,
    pub position: Position,
    pub width: u32,
    pub height: u32,
    #[serde(default)]
    pub properties: Map<String, Value>,
}

/// Immutable map description. Spawn points are handed out in order.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct GameMap {
    pub width: u32,
    pub height: u32,
    pub tiles: Vec<Vec<u8>>,
    pub objects: Vec<MapObject>,
    pub spawn_points: Vec<Position>,
}

#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum TaskStatus {
    Available,
    Active,
    Completed,
    Failed,
}

impl TaskStatus {
    pub const fn is_terminal(self) -> bool {
        matches!(self, TaskStatus::Completed | TaskStatus::Failed)
    }

    /// `available -> active -> completed | failed`; nothing leaves a terminal state.
    pub const fn can_transition_to(self, next: TaskStatus) -> bool {
        matches!(
            (self, next),
            (TaskStatus::Available, TaskStatus::Active)
                | (TaskStatus::Active, TaskStatus::Completed)
                | (TaskStatus::Active, TaskStatus::Failed)
        )
    }
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Objective {
    pub id: String,
    pub description: String,
    pub current: u32,
    pub required: u32,
    pub completed: bool,
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Reward {
    Credential {
        #[serde(rename = "credentialType")]
        credential_type: String,
        #[serde(default)]
        metadata: Map<String, Value>,
    },
    Experience {
        amount: u32,
    },
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Task {
    pub id: String,
    pub name: String,
    pub description: String,
    pub status: TaskStatus,
    pub objectives: Vec<Objective>,
    pub rewards: Vec<Reward>,
}

#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum GameEventKind {
    PlayerJoined,
    PlayerLeft,
    PlayerDisconnected,
    TaskAccepted,
    TaskCompleted,
    TaskFailed,
}

/// One entry of a room's append-only event log.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct GameEvent {
    pub id: u64,
    #[serde(rename = "type")]
    pub kind: GameEventKind,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub session_id: Option<String>,
    pub timestamp: DateTime<Utc>,
    #[serde(default)]
    pub data: Value,
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct GameState {
    pub status: GameStatus,
    pub map: GameMap,
    pub tasks: Vec<Task>,
    pub events: Vec<GameEvent>,
}

impl GameState {
    pub fn task(&self, task_id: &str) -> Option<&Task> {
        self.tasks.iter().find(|t| t.id == task_id)
    }

    pub fn task_mut(&mut self, task_id: &str) -> Option<&mut Task> {
        self.tasks.iter_mut().find(|t| t.id == task_id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn task_transitions_follow_lifecycle() {
        use TaskStatus::*;
        assert!(Available.can_transition_to(Active));
        assert!(Active.can_transition_to(Completed));
        assert!(Active.can_transition_to(Failed));
        assert!(!Available.can_transition_to(Completed));
        assert!(!Completed.can_transition_to(Completed));
        assert!(!Failed.can_transition_to(Active));
        assert!(Completed.is_terminal() && Failed.is_terminal());
        assert!(!Active.is_terminal());
    }

    #[test]
    fn reward_is_tagged_by_kind() {
        let credential: Reward = serde_json::from_str(
            r#"{"kind":"credential","credentialType":"AchievementCredential","metadata":{"difficulty":"easy"}}"#,
        )
        .unwrap();
        match credential {
            Reward::Credential {
                credential_type,
                metadata,
            } => {
                assert_eq!(credential_type, "AchievementCredential");
                assert_eq!(metadata["difficulty"], "easy");
            }
            other => panic!("unexpected reward {other:?}"),
        }

        let xp = serde_json::to_value(Reward::Experience { amount: 50 }).unwrap();
        assert_eq!(xp, serde_json::json!({"kind": "experience", "amount": 50}));
    }
}
