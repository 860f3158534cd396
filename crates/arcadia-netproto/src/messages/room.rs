use serde::{Deserialize, Serialize};

use super::impl_message;
use crate::state::{GameState, Position, PresenceStatus};

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Default)]
#[serde(rename_all = "camelCase")]
pub struct JoinRoom {
    #[serde(default)]
    pub room_id: Option<String>,
    #[serde(default)]
    pub game_id: Option<String>,
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Default)]
pub struct LeaveRoom {}

/// Public view of a room member.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct PlayerInfo {
    pub session_id: String,
    pub nickname: String,
    pub level: u32,
    pub position: Position,
    pub health: u32,
    pub max_health: u32,
    pub status: PresenceStatus,
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct RoomInfo {
    pub id: String,
    pub name: String,
    pub game_id: String,
    pub max_players: usize,
    pub players: Vec<PlayerInfo>,
}

/// Reply to a successful `join_room`, carrying the full room snapshot.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct JoinRoomOk {
    pub success: bool,
    pub room: RoomInfo,
    pub game_state: GameState,
    pub spawn: Position,
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct LeaveRoomOk {
    pub success: bool,
}

#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum PlayerUpdateAction {
    Joined,
    Left,
    Disconnected,
}

/// Broadcast to the rest of a room when membership changes.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct PlayerUpdate {
    pub action: PlayerUpdateAction,
    pub player: PlayerInfo,
}

impl_message! {
    JoinRoom => JoinRoom,
    JoinRoomOk => JoinRoom,
    LeaveRoom => LeaveRoom,
    LeaveRoomOk => LeaveRoom,
    PlayerUpdate => PlayerUpdate,
    GameState => GameState,
}
