//! Event dispatch for the relay.
//!
//! `Router::handle_event` is a pure function of (registry state, event):
//! it mutates the registry and returns the messages to deliver. It never
//! touches a connection; the caller hands the deliveries to a transport.

use serde_json::Value;
use tracing::{debug, info};

use super::messages::ServerMessage;
use super::registry::RoomRegistry;
use super::types::{ConnId, RoomKey};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SignalKind {
    Offer,
    Answer,
    Candidate,
}

/// Inbound event, always attributed to the sending connection
#[derive(Debug, Clone, PartialEq)]
pub enum Event {
    Join {
        room: RoomKey,
    },
    Leave {
        room: RoomKey,
    },
    Signal {
        kind: SignalKind,
        room: RoomKey,
        payload: Value,
    },
    /// The connection is gone; the rooms it was in are looked up in the registry
    Disconnect,
}

/// One message and everyone who should get it
#[derive(Debug, Clone, PartialEq)]
pub struct Delivery {
    pub recipients: Vec<ConnId>,
    pub message: ServerMessage,
}

impl Delivery {
    fn to(recipients: Vec<ConnId>, message: ServerMessage) -> Option<Self> {
        if recipients.is_empty() {
            None
        } else {
            Some(Self {
                recipients,
                message,
            })
        }
    }
}

#[derive(Debug, Default)]
pub struct Router {
    registry: RoomRegistry,
}

impl Router {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn registry(&self) -> &RoomRegistry {
        &self.registry
    }

    pub fn handle_event(&mut self, conn: ConnId, event: Event) -> Vec<Delivery> {
        match event {
            Event::Join { room } => self.join(conn, room).into_iter().collect(),
            Event::Leave { room } => self.leave(conn, &room).into_iter().collect(),
            Event::Signal {
                kind,
                room,
                payload,
            } => {
                let recipients = self.registry.members_except(&room, conn);
                debug!(
                    "{:?} from {} in room {:?} -> {} peers",
                    kind,
                    conn,
                    room.as_str(),
                    recipients.len()
                );
                Delivery::to(recipients, ServerMessage::signal(kind, payload, conn))
                    .into_iter()
                    .collect()
            }
            Event::Disconnect => self.disconnect(conn),
        }
    }

    fn join(&mut self, conn: ConnId, room: RoomKey) -> Option<Delivery> {
        if !self.registry.add_member(&room, conn) {
            debug!("Peer {} already in room {:?}", conn, room.as_str());
            return None;
        }
        info!("Peer {} joined room {:?}", conn, room.as_str());

        // targets are taken after the add so the sender is never among them
        let recipients = self.registry.members_except(&room, conn);
        Delivery::to(recipients, ServerMessage::PeerJoined { conn_id: conn })
    }

    fn leave(&mut self, conn: ConnId, room: &RoomKey) -> Option<Delivery> {
        if !self.registry.remove_member(room, conn) {
            debug!("Peer {} not in room {:?}, ignoring leave", conn, room.as_str());
            return None;
        }
        info!("Peer {} left room {:?}", conn, room.as_str());
        if !self.registry.has_room(room) {
            info!("Room {:?} removed (empty)", room.as_str());
        }

        let recipients = self.registry.members_except(room, conn);
        Delivery::to(recipients, ServerMessage::PeerLeft { conn_id: conn })
    }

    fn disconnect(&mut self, conn: ConnId) -> Vec<Delivery> {
        self.registry
            .rooms_containing(conn)
            .into_iter()
            .filter_map(|room| self.leave(conn, &room))
            .collect()
    }
}
