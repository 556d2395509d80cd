//! Room membership registry.
//!
//! Maps room keys to the set of connection IDs in them. Only identifiers are
//! stored; the connections themselves belong to the transport. A room with no
//! members is removed, so "room exists" means "room is non-empty".
//!
//! A reverse index (connection -> rooms) is kept alongside so that the
//! disconnect sweep only visits the rooms the connection is actually in.

use std::collections::{HashMap, HashSet};

use super::types::{ConnId, RoomKey};

#[derive(Debug, Default)]
pub struct RoomRegistry {
    rooms: HashMap<RoomKey, HashSet<ConnId>>,
    conn_rooms: HashMap<ConnId, HashSet<RoomKey>>,
}

impl RoomRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add `conn` to `room`, creating the room if needed.
    ///
    /// Returns `false` if `conn` was already a member.
    pub fn add_member(&mut self, room: &RoomKey, conn: ConnId) -> bool {
        let inserted = self.rooms.entry(room.clone()).or_default().insert(conn);
        if inserted {
            self.conn_rooms
                .entry(conn)
                .or_default()
                .insert(room.clone());
        }
        inserted
    }

    /// Remove `conn` from `room`, deleting the room once it is empty.
    ///
    /// Returns `false` if the room or the membership did not exist.
    pub fn remove_member(&mut self, room: &RoomKey, conn: ConnId) -> bool {
        let Some(members) = self.rooms.get_mut(room) else {
            return false;
        };
        if !members.remove(&conn) {
            return false;
        }
        if members.is_empty() {
            self.rooms.remove(room);
        }

        if let Some(rooms) = self.conn_rooms.get_mut(&conn) {
            rooms.remove(room);
            if rooms.is_empty() {
                self.conn_rooms.remove(&conn);
            }
        }
        true
    }

    /// Members of `room` other than `exclude`. Empty if the room does not exist.
    pub fn members_except(&self, room: &RoomKey, exclude: ConnId) -> Vec<ConnId> {
        self.rooms
            .get(room)
            .map(|members| {
                members
                    .iter()
                    .copied()
                    .filter(|member| *member != exclude)
                    .collect()
            })
            .unwrap_or_default()
    }

    /// Every room `conn` is currently a member of.
    pub fn rooms_containing(&self, conn: ConnId) -> Vec<RoomKey> {
        self.conn_rooms
            .get(&conn)
            .map(|rooms| rooms.iter().cloned().collect())
            .unwrap_or_default()
    }

    pub fn contains(&self, room: &RoomKey, conn: ConnId) -> bool {
        self.rooms
            .get(room)
            .is_some_and(|members| members.contains(&conn))
    }

    pub fn has_room(&self, room: &RoomKey) -> bool {
        self.rooms.contains_key(room)
    }

    pub fn member_count(&self, room: &RoomKey) -> usize {
        self.rooms.get(room).map_or(0, HashSet::len)
    }

    pub fn room_count(&self) -> usize {
        self.rooms.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rooms.is_empty()
    }
}
