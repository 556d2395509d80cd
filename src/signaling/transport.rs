use std::collections::HashMap;

use tokio::sync::mpsc;
use tracing::{error, warn};

use super::router::Delivery;
use super::types::{ConnId, OutboundMessage, SignalingError};

/// Where the relay hands outbound messages. Sends never block.
pub trait Transport {
    fn send_to(&self, conn: ConnId, msg: OutboundMessage) -> Result<(), SignalingError>;

    /// Serialize once and send to every recipient. A failed send is logged
    /// and skipped; returns how many sends succeeded.
    fn deliver(&self, delivery: &Delivery) -> usize {
        let msg = match serde_json::to_string(&delivery.message) {
            Ok(json) => OutboundMessage::from(json),
            Err(e) => {
                error!("Failed to serialize {:?}: {}", delivery.message, e);
                return 0;
            }
        };

        let mut sent = 0;
        for &conn in &delivery.recipients {
            match self.send_to(conn, msg.clone()) {
                Ok(()) => sent += 1,
                Err(e) => warn!("Send to {} failed: {}", conn, e),
            }
        }
        sent
    }
}

/// Outbound channels of the live connections, keyed by ID.
#[derive(Debug, Default)]
pub struct PeerChannels {
    peers: HashMap<ConnId, mpsc::UnboundedSender<OutboundMessage>>,
}

impl PeerChannels {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a new connection under a fresh, unused ID.
    pub fn register(&mut self, tx: mpsc::UnboundedSender<OutboundMessage>) -> ConnId {
        let mut conn = ConnId::generate();
        while self.peers.contains_key(&conn) {
            conn = ConnId::generate();
        }
        self.peers.insert(conn, tx);
        conn
    }

    pub fn unregister(&mut self, conn: ConnId) -> bool {
        self.peers.remove(&conn).is_some()
    }

    pub fn contains(&self, conn: ConnId) -> bool {
        self.peers.contains_key(&conn)
    }

    pub fn len(&self) -> usize {
        self.peers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.peers.is_empty()
    }
}

impl Transport for PeerChannels {
    fn send_to(&self, conn: ConnId, msg: OutboundMessage) -> Result<(), SignalingError> {
        let tx = self.peers.get(&conn).ok_or(SignalingError::PeerGone(conn))?;
        tx.send(msg).map_err(|_| SignalingError::PeerGone(conn))
    }
}
