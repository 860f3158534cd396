//! Session records keyed by identity reference.
//!
//! Reconnecting under the same identity resumes the previous record (same
//! session id, nickname and progress) by direct lookup. The connection that
//! held the record before is invalidated through its cancellation token, and
//! its room membership is handed to the claimer for immediate removal.

use std::sync::Arc;

use arcadia_netproto::state::PresenceStatus;
use chrono::{DateTime, Utc};
use dashmap::DashMap;
use dashmap::mapref::entry::Entry;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info};
use uuid::Uuid;

use super::{Session, SessionId};
use crate::net::inbound::ConnId;
use crate::room::Room;

#[derive(Debug, Clone)]
pub struct SessionRecord {
    pub session_id: SessionId,
    pub nickname: String,
    pub level: u32,
    pub experience: u32,
    pub status: PresenceStatus,
    /// Connection currently owning this record.
    pub conn_id: ConnId,
    pub last_seen: DateTime<Utc>,
    /// Room the owning connection is in.
    pub room: Option<Arc<Room>>,
    invalidate: CancellationToken,
}

/// A still-online connection that held the identity before a claim.
#[derive(Debug)]
pub struct Superseded {
    pub conn_id: ConnId,
    pub token: CancellationToken,
    /// Its membership, still to be removed from the room.
    pub room: Option<Arc<Room>>,
}

/// Outcome of [`SessionTable::claim`].
#[derive(Debug)]
pub struct Claim {
    pub session: Session,
    pub reconnected: bool,
    pub superseded: Option<Superseded>,
}

#[derive(Debug, Default)]
pub struct SessionTable {
    by_identity: DashMap<String, SessionRecord>,
}

impl SessionTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Bind `identity` to connection `conn_id`, resuming an existing record
    /// if there is one.
    pub fn claim(
        &self,
        identity: &str,
        display_name: &str,
        conn_id: ConnId,
        invalidate: CancellationToken,
    ) -> Claim {
        match self.by_identity.entry(identity.to_string()) {
            Entry::Occupied(mut entry) => {
                let record = entry.get_mut();
                let room = record.room.take();
                let superseded = (record.status == PresenceStatus::Online
                    && record.conn_id != conn_id)
                    .then(|| Superseded {
                        conn_id: record.conn_id,
                        token: record.invalidate.clone(),
                        room,
                    });

                record.conn_id = conn_id;
                record.invalidate = invalidate;
                record.status = PresenceStatus::Online;
                record.last_seen = Utc::now();

                let mut session = Session::new(record.session_id, identity, &record.nickname);
                session.level = record.level;
                session.experience = record.experience;

                info!(
                    session_id = %record.session_id,
                    conn_id,
                    superseded = superseded.is_some(),
                    "Session resumed"
                );
                Claim {
                    session,
                    reconnected: true,
                    superseded,
                }
            }
            Entry::Vacant(entry) => {
                let session = Session::new(Uuid::new_v4(), identity, display_name);
                entry.insert(SessionRecord {
                    session_id: session.id,
                    nickname: session.nickname.clone(),
                    level: session.level,
                    experience: session.experience,
                    status: PresenceStatus::Online,
                    conn_id,
                    last_seen: Utc::now(),
                    room: None,
                    invalidate,
                });
                info!(session_id = %session.id, conn_id, "Session created");
                Claim {
                    session,
                    reconnected: false,
                    superseded: None,
                }
            }
        }
    }

    /// Persist progress from the owning connection.
    pub fn record_progress(&self, session: &Session, conn_id: ConnId) {
        if let Some(mut record) = self.by_identity.get_mut(&session.identity) {
            if record.conn_id == conn_id {
                record.level = session.level;
                record.experience = session.experience;
                record.last_seen = Utc::now();
            }
        }
    }

    /// Record the room `conn_id` is in. Returns `false`, changing nothing,
    /// when another connection owns the identity.
    pub fn set_room(&self, identity: &str, conn_id: ConnId, room: Option<Arc<Room>>) -> bool {
        match self.by_identity.get_mut(identity) {
            Some(mut record) if record.conn_id == conn_id => {
                record.room = room;
                true
            }
            _ => false,
        }
    }

    /// Mark the record offline if `conn_id` still owns it.
    ///
    /// Returns `false` when a newer connection has taken the identity over.
    pub fn release(&self, identity: &str, conn_id: ConnId) -> bool {
        match self.by_identity.get_mut(identity) {
            Some(mut record) if record.conn_id == conn_id => {
                record.status = PresenceStatus::Offline;
                record.room = None;
                record.last_seen = Utc::now();
                true
            }
            Some(_) => {
                debug!(conn_id, "Session owned by a newer connection; not released");
                false
            }
            None => false,
        }
    }

    pub fn get(&self, identity: &str) -> Option<SessionRecord> {
        self.by_identity.get(identity).map(|r| r.clone())
    }

    pub fn online_count(&self) -> usize {
        self.by_identity
            .iter()
            .filter(|r| r.status == PresenceStatus::Online)
            .count()
    }

    pub fn len(&self) -> usize {
        self.by_identity.len()
    }

    pub fn is_empty(&self) -> bool {
        self.by_identity.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn first_claim_creates_record() {
        let table = SessionTable::new();
        let claim = table.claim("did:example:a", "Alice", 1, CancellationToken::new());
        assert!(!claim.reconnected);
        assert!(claim.superseded.is_none());
        assert_eq!(claim.session.nickname, "Alice");

        let record = table.get("did:example:a").unwrap();
        assert_eq!(record.session_id, claim.session.id);
        assert_eq!(record.status, PresenceStatus::Online);
        assert_eq!(table.online_count(), 1);
    }

    #[test]
    fn reconnect_resumes_identity_and_progress() {
        let table = SessionTable::new();
        let mut first = table
            .claim("did:example:a", "Alice", 1, CancellationToken::new())
            .session;
        first.grant_experience(120);
        table.record_progress(&first, 1);
        assert!(table.release("did:example:a", 1));

        let claim = table.claim("did:example:a", "Ignored", 2, CancellationToken::new());
        assert!(claim.reconnected);
        assert!(claim.superseded.is_none(), "offline record has no live owner");
        assert_eq!(claim.session.id, first.id);
        assert_eq!(claim.session.nickname, "Alice");
        assert_eq!(claim.session.level, 2);
        assert_eq!(claim.session.experience, 120);
    }

    #[test]
    fn claim_while_online_supersedes_previous_connection() {
        let table = SessionTable::new();
        let old_token = CancellationToken::new();
        table.claim("did:example:a", "Alice", 1, old_token.clone());

        let claim = table.claim("did:example:a", "Alice", 2, CancellationToken::new());
        let superseded = claim.superseded.expect("previous connection superseded");
        assert_eq!(superseded.conn_id, 1);
        assert!(superseded.room.is_none());
        superseded.token.cancel();
        assert!(old_token.is_cancelled());

        assert!(!table.release("did:example:a", 1), "stale owner cannot release");
        assert_eq!(
            table.get("did:example:a").unwrap().status,
            PresenceStatus::Online
        );
    }

    #[test]
    fn stale_progress_is_ignored() {
        let table = SessionTable::new();
        let mut session = table
            .claim("did:example:a", "Alice", 1, CancellationToken::new())
            .session;
        table.claim("did:example:a", "Alice", 2, CancellationToken::new());

        session.grant_experience(500);
        table.record_progress(&session, 1);
        assert_eq!(table.get("did:example:a").unwrap().experience, 0);
    }

    #[test]
    fn supersede_hands_over_the_old_room() {
        let table = SessionTable::new();
        table.claim("did:example:a", "Alice", 1, CancellationToken::new());
        let room = Arc::new(Room::new("r1", "g", 4));
        assert!(table.set_room("did:example:a", 1, Some(Arc::clone(&room))));

        let claim = table.claim("did:example:a", "Alice", 2, CancellationToken::new());
        let handed = claim.superseded.and_then(|s| s.room).expect("room handed over");
        assert!(Arc::ptr_eq(&handed, &room));
        assert!(table.get("did:example:a").unwrap().room.is_none());

        assert!(!table.set_room("did:example:a", 1, Some(room)), "stale owner cannot set a room");
        assert!(table.get("did:example:a").unwrap().room.is_none());
    }
}
