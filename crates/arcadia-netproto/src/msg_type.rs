use serde::{Deserialize, Serialize};
use strum::{Display, EnumString, IntoStaticStr};

/// The closed set of envelope `type` values.
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    Hash,
    Serialize,
    Deserialize,
    Display,
    EnumString,
    IntoStaticStr,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum MsgType {
    Auth,
    JoinRoom,
    LeaveRoom,
    PlayerMove,
    PlayerAction,
    PlayerUpdate,
    Chat,
    TaskUpdate,
    GameState,
    Credential,
    Error,
}

impl MsgType {
    /// Returns `true` for types a client may send.
    ///
    /// `game_state` doubles as a snapshot request; the remaining
    /// server-produced types are never routed.
    pub const fn is_client_originated(self) -> bool {
        matches!(
            self,
            MsgType::Auth
                | MsgType::JoinRoom
                | MsgType::LeaveRoom
                | MsgType::PlayerMove
                | MsgType::PlayerAction
                | MsgType::Chat
                | MsgType::GameState
        )
    }
}

#[cfg(test)]
mod tests {
    use std::str::FromStr;

    use super::*;

    #[test]
    fn wire_names_are_snake_case() {
        assert_eq!(MsgType::from_str("join_room").ok(), Some(MsgType::JoinRoom));
        assert_eq!(MsgType::TaskUpdate.to_string(), "task_update");
        let name: &'static str = MsgType::PlayerMove.into();
        assert_eq!(name, "player_move");
        assert!(MsgType::from_str("teleport").is_err());
    }

    #[test]
    fn server_only_types_are_not_routed() {
        assert!(MsgType::Auth.is_client_originated());
        assert!(MsgType::GameState.is_client_originated());
        assert!(!MsgType::PlayerUpdate.is_client_originated());
        assert!(!MsgType::Credential.is_client_originated());
        assert!(!MsgType::Error.is_client_originated());
    }
}
