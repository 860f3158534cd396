//! Room state management.
//!
//! A room is a bounded group of sessions sharing one [`GameState`]. All
//! membership and game-state access goes through a single per-room
//! `RwLock`: joins, leaves, and state writes take it exclusively, while
//! enumerating recipients and snapshotting take it shared.
//!
//! Methods never await. They return the list of outbound queues to notify
//! so the caller can fan out after the lock is released.

use std::collections::HashMap;

use arcadia_netproto::messages::room::{PlayerInfo, RoomInfo};
use arcadia_netproto::state::{GameEvent, GameEventKind, GameState, Position, PresenceStatus, Task};
use chrono::{DateTime, Utc};
use parking_lot::RwLock;
use serde_json::Value;
use thiserror::Error;

use crate::game::{TaskTransition, default_game_state, spawn_position, transition_task};
use crate::net::inbound::ConnId;
use crate::net::outbound::OutboundTx;
use crate::session::{Session, SessionId};

pub type RoomId = String;

/// Oldest events are dropped once a room's log grows past this.
pub const MAX_EVENT_LOG: usize = 256;

#[derive(Debug, Error, Clone, Copy, PartialEq, Eq)]
pub enum RoomError {
    #[error("room is full")]
    RoomFull,
    /// The room lost its last member and is being removed.
    #[error("room is closed")]
    RoomClosed,
}

/// A session's presence in a room.
#[derive(Debug, Clone)]
pub struct Member {
    pub session_id: SessionId,
    /// Connection that joined; a newer connection for the same session
    /// replaces the member.
    pub conn_id: ConnId,
    pub nickname: String,
    pub level: u32,
    pub position: Position,
    pub health: u32,
    pub max_health: u32,
    pub status: PresenceStatus,
    pub outbound: OutboundTx,
}

impl Member {
    pub fn from_session(session: &Session, conn_id: ConnId, outbound: OutboundTx) -> Self {
        Self {
            session_id: session.id,
            conn_id,
            nickname: session.nickname.clone(),
            level: session.level,
            position: session.position,
            health: session.health,
            max_health: session.max_health,
            status: session.status,
            outbound,
        }
    }

    pub fn info(&self) -> PlayerInfo {
        PlayerInfo {
            session_id: self.session_id.to_string(),
            nickname: self.nickname.clone(),
            level: self.level,
            position: self.position,
            health: self.health,
            max_health: self.max_health,
            status: self.status,
        }
    }
}

/// Result of a successful join. `game_state` and `room` were captured under
/// the same lock acquisition as the insertion.
#[derive(Debug)]
pub struct Joined {
    pub spawn: Position,
    pub room: RoomInfo,
    pub game_state: GameState,
    pub player: PlayerInfo,
    /// Everyone else in the room.
    pub others: Vec<OutboundTx>,
    /// An older connection's membership for the same session.
    pub replaced: Option<Member>,
}

#[derive(Debug)]
pub struct Departed {
    pub member: Member,
    pub others: Vec<OutboundTx>,
    pub now_empty: bool,
}

#[derive(Debug)]
struct RoomInner {
    members: HashMap<SessionId, Member>,
    game: GameState,
    closed: bool,
    next_event_id: u64,
}

impl RoomInner {
    fn push_event(&mut self, kind: GameEventKind, session_id: Option<SessionId>, data: Value) -> u64 {
        let id = self.next_event_id;
        self.next_event_id += 1;
        self.game.events.push(GameEvent {
            id,
            kind,
            session_id: session_id.map(|s| s.to_string()),
            timestamp: Utc::now(),
            data,
        });
        let excess = self.game.events.len().saturating_sub(MAX_EVENT_LOG);
        if excess > 0 {
            self.game.events.drain(..excess);
        }
        id
    }

    fn outbounds_except(&self, exclude: Option<SessionId>) -> Vec<OutboundTx> {
        self.members
            .values()
            .filter(|m| Some(m.session_id) != exclude)
            .map(|m| m.outbound.clone())
            .collect()
    }

    fn players(&self) -> Vec<PlayerInfo> {
        self.members.values().map(Member::info).collect()
    }
}

#[derive(Debug)]
pub struct Room {
    pub id: RoomId,
    pub name: String,
    pub game_id: String,
    pub capacity: usize,
    pub created_at: DateTime<Utc>,
    inner: RwLock<RoomInner>,
}

impl Room {
    /// Create a room with a fresh default game state.
    pub fn new(id: impl Into<RoomId>, game_id: impl Into<String>, capacity: usize) -> Self {
        let id = id.into();
        Self {
            name: format!("Room {id}"),
            id,
            game_id: game_id.into(),
            capacity,
            created_at: Utc::now(),
            inner: RwLock::new(RoomInner {
                members: HashMap::new(),
                game: default_game_state(),
                closed: false,
                next_event_id: 1,
            }),
        }
    }

    /// Add `member`, assigning its spawn position.
    ///
    /// A member with the same session id is replaced rather than counted
    /// twice. Nothing changes on error.
    pub fn join(&self, mut member: Member) -> Result<Joined, RoomError> {
        let mut inner = self.inner.write();
        if inner.closed {
            return Err(RoomError::RoomClosed);
        }
        let rejoining = inner.members.contains_key(&member.session_id);
        if !rejoining && inner.members.len() >= self.capacity {
            return Err(RoomError::RoomFull);
        }

        let session_id = member.session_id;
        let count_after = inner.members.len() + usize::from(!rejoining);
        let spawn = spawn_position(&inner.game.map, count_after);
        member.position = spawn;
        member.status = PresenceStatus::Online;
        let player = member.info();

        let replaced = inner.members.insert(session_id, member);
        inner.push_event(
            GameEventKind::PlayerJoined,
            Some(session_id),
            serde_json::json!({ "nickname": player.nickname }),
        );

        Ok(Joined {
            spawn,
            room: RoomInfo {
                id: self.id.clone(),
                name: self.name.clone(),
                game_id: self.game_id.clone(),
                max_players: self.capacity,
                players: inner.players(),
            },
            game_state: inner.game.clone(),
            player,
            others: inner.outbounds_except(Some(session_id)),
            replaced,
        })
    }

    /// Remove the member for `session_id` if it still belongs to `conn_id`.
    ///
    /// Removing the last member closes the room; a closed room refuses
    /// further joins.
    pub fn remove_member(
        &self,
        session_id: SessionId,
        conn_id: ConnId,
        kind: GameEventKind,
    ) -> Option<Departed> {
        let mut inner = self.inner.write();
        if inner.members.get(&session_id)?.conn_id != conn_id {
            return None;
        }
        let mut member = inner.members.remove(&session_id)?;
        if kind == GameEventKind::PlayerDisconnected {
            member.status = PresenceStatus::Offline;
        }
        inner.push_event(kind, Some(session_id), Value::Null);

        let now_empty = inner.members.is_empty();
        if now_empty {
            inner.closed = true;
        }
        Some(Departed {
            others: inner.outbounds_except(None),
            member,
            now_empty,
        })
    }

    /// Last-write-wins position update. Returns everyone else in the room,
    /// or `None` if the connection is not a member.
    pub fn move_member(
        &self,
        session_id: SessionId,
        conn_id: ConnId,
        position: Position,
    ) -> Option<Vec<OutboundTx>> {
        let mut inner = self.inner.write();
        let member = inner.members.get_mut(&session_id)?;
        if member.conn_id != conn_id {
            return None;
        }
        member.position = position;
        Some(inner.outbounds_except(Some(session_id)))
    }

    pub fn set_member_level(&self, session_id: SessionId, level: u32) {
        if let Some(member) = self.inner.write().members.get_mut(&session_id) {
            member.level = level;
        }
    }

    /// Every member's queue, or `None` if `conn_id` does not hold the
    /// membership for `session_id`.
    pub fn member_recipients(&self, session_id: SessionId, conn_id: ConnId) -> Option<Vec<OutboundTx>> {
        let inner = self.inner.read();
        if inner.members.get(&session_id)?.conn_id != conn_id {
            return None;
        }
        Some(inner.outbounds_except(None))
    }

    /// Outbound queues of every member except `exclude`.
    pub fn recipients(&self, exclude: Option<SessionId>) -> Vec<OutboundTx> {
        self.inner.read().outbounds_except(exclude)
    }

    /// Apply a task transition and log it. Returns the updated task and the
    /// whole room as recipients, or `None` if the transition does not apply.
    pub fn transition_task(
        &self,
        task_id: &str,
        transition: TaskTransition,
        actor: SessionId,
    ) -> Option<(Task, Vec<OutboundTx>)> {
        let mut inner = self.inner.write();
        let task = transition_task(&mut inner.game, task_id, transition)?;
        inner.push_event(
            transition.event_kind(),
            Some(actor),
            serde_json::json!({ "taskId": task.id }),
        );
        Some((task, inner.outbounds_except(None)))
    }

    pub fn snapshot(&self) -> GameState {
        self.inner.read().game.clone()
    }

    pub fn room_info(&self) -> RoomInfo {
        let inner = self.inner.read();
        RoomInfo {
            id: self.id.clone(),
            name: self.name.clone(),
            game_id: self.game_id.clone(),
            max_players: self.capacity,
            players: inner.players(),
        }
    }

    pub fn member_count(&self) -> usize {
        self.inner.read().members.len()
    }

    pub fn is_empty(&self) -> bool {
        self.member_count() == 0
    }

    pub fn is_closed(&self) -> bool {
        self.inner.read().closed
    }

    /// Whether `conn_id` currently holds the membership for `session_id`.
    pub fn is_member(&self, session_id: SessionId, conn_id: ConnId) -> bool {
        self.inner
            .read()
            .members
            .get(&session_id)
            .is_some_and(|m| m.conn_id == conn_id)
    }
}
