//! Per-connection player sessions.
//!
//! A [`Session`] is owned by the connection task that authenticated it and
//! is only mutated there. Rooms keep their own [`crate::room::Member`] view
//! of it, which they read under the room lock.

use std::sync::Arc;

use arcadia_netproto::constants::DEFAULT_MAX_HEALTH;
use arcadia_netproto::messages::room::PlayerInfo;
use arcadia_netproto::state::{Position, PresenceStatus};
use chrono::{DateTime, Utc};
use uuid::Uuid;

use crate::game::level_for_experience;
use crate::room::Room;

mod table;

pub use table::{Claim, SessionRecord, SessionTable, Superseded};

/// Opaque, globally unique session identifier.
pub type SessionId = Uuid;

/// Lifecycle of a connection's session.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Lifecycle {
    Unauthenticated,
    Authenticated,
    InRoom,
    Closed,
}

#[derive(Debug)]
pub struct Session {
    pub id: SessionId,
    /// Identity reference resolved at `auth`.
    pub identity: String,
    pub nickname: String,
    pub level: u32,
    pub experience: u32,
    pub position: Position,
    pub health: u32,
    pub max_health: u32,
    pub status: PresenceStatus,
    pub last_activity: DateTime<Utc>,
    /// Current room membership, if any.
    pub room: Option<Arc<Room>>,
}

impl Session {
    pub fn new(id: SessionId, identity: impl Into<String>, nickname: impl Into<String>) -> Self {
        Self {
            id,
            identity: identity.into(),
            nickname: nickname.into(),
            level: 1,
            experience: 0,
            position: Position::default(),
            health: DEFAULT_MAX_HEALTH,
            max_health: DEFAULT_MAX_HEALTH,
            status: PresenceStatus::Online,
            last_activity: Utc::now(),
            room: None,
        }
    }

    pub fn lifecycle(&self) -> Lifecycle {
        if self.room.is_some() {
            Lifecycle::InRoom
        } else {
            Lifecycle::Authenticated
        }
    }

    pub fn touch(&mut self) {
        self.last_activity = Utc::now();
    }

    /// Add experience; returns `true` if the level went up.
    pub fn grant_experience(&mut self, amount: u32) -> bool {
        self.experience = self.experience.saturating_add(amount);
        let level = level_for_experience(self.experience);
        let level_up = level > self.level;
        self.level = self.level.max(level);
        level_up
    }

    pub fn info(&self) -> PlayerInfo {
        PlayerInfo {
            session_id: self.id.to_string(),
            nickname: self.nickname.clone(),
            level: self.level,
            position: self.position,
            health: self.health,
            max_health: self.max_health,
            status: self.status,
        }
    }
}
