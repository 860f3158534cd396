//! Room lookup, lazy creation, and removal of empty rooms.
//!
//! Lock order is registry, then room. The registry lock is only held for a
//! single lookup-or-create or a leave; it is never held across a send.

use std::collections::HashMap;
use std::sync::Arc;

use arcadia_netproto::state::GameEventKind;
use parking_lot::Mutex;
use tracing::info;

use super::state::{Departed, Joined, Member, Room, RoomError, RoomId};
use crate::net::inbound::ConnId;
use crate::session::SessionId;

#[derive(Debug)]
pub struct RoomRegistry {
    rooms: Mutex<HashMap<RoomId, Arc<Room>>>,
    capacity: usize,
}

impl RoomRegistry {
    pub fn new(capacity: usize) -> Self {
        Self {
            rooms: Mutex::new(HashMap::new()),
            capacity: capacity.max(1),
        }
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    pub fn get(&self, room_id: &str) -> Option<Arc<Room>> {
        self.rooms.lock().get(room_id).cloned()
    }

    /// Join `member` to `room_id`, creating the room on demand.
    ///
    /// A new room is registered only after its first member is in, so a
    /// lookup never sees an empty room. Concurrent joiners for the same
    /// unseen id all land in the same instance; a room that closes between
    /// lookup and join is replaced by a fresh one.
    pub fn join(
        &self,
        room_id: &str,
        game_id: &str,
        member: Member,
    ) -> Result<(Arc<Room>, Joined), RoomError> {
        loop {
            let room = {
                let mut rooms = self.rooms.lock();
                let live = rooms.get(room_id).filter(|r| !r.is_closed()).cloned();
                match live {
                    Some(room) => room,
                    None => {
                        let room = Arc::new(Room::new(room_id, game_id, self.capacity));
                        let joined = room.join(member)?;
                        rooms.insert(room_id.to_string(), Arc::clone(&room));
                        info!(room_id, game_id, capacity = self.capacity, "Room created");
                        return Ok((room, joined));
                    }
                }
            };
            match room.join(member.clone()) {
                Ok(joined) => return Ok((room, joined)),
                Err(RoomError::RoomClosed) => continue,
                Err(e) => return Err(e),
            }
        }
    }

    /// Remove a member from `room`, dropping the room from the registry if
    /// it became empty.
    ///
    /// Emptying the room and unregistering it happen under the registry
    /// lock, so no lookup can observe an empty room.
    pub fn leave(
        &self,
        room: &Arc<Room>,
        session_id: SessionId,
        conn_id: ConnId,
        kind: GameEventKind,
    ) -> Option<Departed> {
        let mut rooms = self.rooms.lock();
        let departed = room.remove_member(session_id, conn_id, kind)?;
        if departed.now_empty
            && rooms
                .get(&room.id)
                .is_some_and(|current| Arc::ptr_eq(current, room))
        {
            rooms.remove(&room.id);
            info!(room_id = %room.id, "Removed empty room");
        }
        Some(departed)
    }

    pub fn len(&self) -> usize {
        self.rooms.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.rooms.lock().is_empty()
    }
}

#[cfg(test)]
mod tests {
    use arcadia_netproto::constants::TUTORIAL_TASK_ID;
    use arcadia_netproto::state::TaskStatus;
    use proptest::prelude::*;
    use tokio::sync::mpsc;
    use uuid::Uuid;

    use super::*;
    use crate::game::TaskTransition;
    use crate::session::Session;

    fn member(conn_id: ConnId) -> Member {
        // Receivers are dropped; sends from these members fail, which the
        // registry never observes.
        let (tx, _rx) = mpsc::channel(1);
        let session = Session::new(Uuid::new_v4(), format!("did:example:{conn_id}"), "p");
        Member::from_session(&session, conn_id, tx)
    }

    #[test]
    fn concurrent_first_joins_share_one_room() {
        let registry = Arc::new(RoomRegistry::new(10));
        let handles: Vec<_> = (0..8)
            .map(|i| {
                let registry = Arc::clone(&registry);
                std::thread::spawn(move || registry.join("r1", "g", member(i)).unwrap().0)
            })
            .collect();
        let rooms: Vec<_> = handles.into_iter().map(|h| h.join().unwrap()).collect();
        assert!(rooms.windows(2).all(|w| Arc::ptr_eq(&w[0], &w[1])));
        assert_eq!(registry.len(), 1);
        assert_eq!(rooms[0].member_count(), 8);
    }

    #[test]
    fn registered_room_is_never_empty_while_first_joins_race() {
        let registry = Arc::new(RoomRegistry::new(10));
        let done = Arc::new(std::sync::atomic::AtomicBool::new(false));
        let watcher = {
            let registry = Arc::clone(&registry);
            let done = Arc::clone(&done);
            std::thread::spawn(move || {
                while !done.load(std::sync::atomic::Ordering::Acquire) {
                    for i in 0..16 {
                        if let Some(room) = registry.get(&format!("r{i}")) {
                            assert!(room.member_count() > 0, "lookup returned an empty room");
                        }
                    }
                }
            })
        };

        let joiners: Vec<_> = (0..16)
            .map(|i| {
                let registry = Arc::clone(&registry);
                std::thread::spawn(move || {
                    registry.join(&format!("r{i}"), "g", member(i)).unwrap();
                })
            })
            .collect();
        for h in joiners {
            h.join().unwrap();
        }
        done.store(true, std::sync::atomic::Ordering::Release);
        watcher.join().unwrap();
        assert_eq!(registry.len(), 16);
    }

    #[test]
    fn last_leave_removes_room_and_next_join_gets_fresh_state() {
        let registry = RoomRegistry::new(10);
        let c = member(1);
        let c_id = c.session_id;
        let (room, _) = registry.join("r1", "g", c).unwrap();
        room.transition_task(TUTORIAL_TASK_ID, TaskTransition::Accept, c_id)
            .unwrap();

        registry
            .leave(&room, c_id, 1, GameEventKind::PlayerLeft)
            .unwrap();
        assert!(registry.get("r1").is_none());

        let (fresh, joined) = registry.join("r1", "g", member(2)).unwrap();
        assert!(!Arc::ptr_eq(&room, &fresh));
        assert_eq!(
            joined.game_state.task(TUTORIAL_TASK_ID).unwrap().status,
            TaskStatus::Available
        );
    }

    #[test]
    fn stale_room_handle_does_not_remove_replacement() {
        let registry = RoomRegistry::new(10);
        let a = member(1);
        let a_id = a.session_id;
        let (old, _) = registry.join("r1", "g", a).unwrap();
        registry.leave(&old, a_id, 1, GameEventKind::PlayerLeft);

        let (new, _) = registry.join("r1", "g", member(2)).unwrap();
        assert!(registry.leave(&old, a_id, 1, GameEventKind::PlayerLeft).is_none());
        assert!(Arc::ptr_eq(&registry.get("r1").unwrap(), &new));
    }

    #[derive(Debug, Clone)]
    enum Op {
        Join(usize),
        Leave(usize),
    }

    fn op() -> impl Strategy<Value = Op> {
        prop_oneof![(0..12usize).prop_map(Op::Join), (0..12usize).prop_map(Op::Leave)]
    }

    proptest! {
        #[test]
        fn membership_never_exceeds_capacity(capacity in 1..6usize, ops in prop::collection::vec(op(), 1..80)) {
            let registry = RoomRegistry::new(capacity);
            let members: Vec<Member> = (0..12).map(|i| member(i as ConnId)).collect();
            let mut joined: Vec<Option<Arc<Room>>> = vec![None; members.len()];

            for op in ops {
                match op {
                    Op::Join(i) => {
                        if joined[i].is_some() {
                            continue;
                        }
                        match registry.join("r1", "g", members[i].clone()) {
                            Ok((room, _)) => joined[i] = Some(room),
                            Err(e) => prop_assert_eq!(e, RoomError::RoomFull),
                        }
                    }
                    Op::Leave(i) => {
                        if let Some(room) = joined[i].take() {
                            let m = &members[i];
                            prop_assert!(registry.leave(&room, m.session_id, m.conn_id, GameEventKind::PlayerLeft).is_some());
                        }
                    }
                }

                let live = joined.iter().flatten().count();
                match registry.get("r1") {
                    Some(room) => {
                        prop_assert!(room.member_count() <= capacity);
                        prop_assert_eq!(room.member_count(), live);
                        prop_assert!(room.member_count() > 0);
                    }
                    None => prop_assert_eq!(live, 0),
                }
            }
        }
    }
}
