use tokio::sync::{mpsc, oneshot};
use tracing::{debug, info};

use super::router::{Event, Router};
use super::transport::{PeerChannels, Transport};
use super::types::{ConnId, OutboundMessage, SignalingError};

/// Commands sent to the relay actor
pub(crate) enum RelayCommand {
    Connect {
        peer_tx: mpsc::UnboundedSender<OutboundMessage>,
        reply: oneshot::Sender<ConnId>,
    },
    Event {
        conn: ConnId,
        event: Event,
    },
    Disconnect {
        conn: ConnId,
    },
}

/// Owns the router and every outbound channel. Commands are handled one at a
/// time, so a registry change and the fan-out it triggers are never
/// interleaved with another event.
pub(crate) async fn relay_actor(mut rx: mpsc::Receiver<RelayCommand>) {
    let mut router = Router::new();
    let mut peers = PeerChannels::new();

    while let Some(cmd) = rx.recv().await {
        match cmd {
            RelayCommand::Connect { peer_tx, reply } => {
                let conn = peers.register(peer_tx);
                info!("Peer {} connected ({} online)", conn, peers.len());
                let _ = reply.send(conn);
            }

            RelayCommand::Event { conn, event } => {
                if !peers.contains(conn) {
                    debug!("Dropping event from unknown peer {}", conn);
                    continue;
                }
                for delivery in router.handle_event(conn, event) {
                    peers.deliver(&delivery);
                }
            }

            RelayCommand::Disconnect { conn } => {
                if !peers.unregister(conn) {
                    continue;
                }
                for delivery in router.handle_event(conn, Event::Disconnect) {
                    peers.deliver(&delivery);
                }
                info!(
                    "Peer {} disconnected ({} online, {} rooms)",
                    conn,
                    peers.len(),
                    router.registry().room_count()
                );
            }
        }
    }
}

/// Handle to communicate with the relay actor
#[derive(Clone)]
pub struct RelayHandle {
    pub(crate) tx: mpsc::Sender<RelayCommand>,
}

impl RelayHandle {
    /// Spawn a relay actor on the current runtime
    pub fn spawn() -> Self {
        let (tx, rx) = mpsc::channel::<RelayCommand>(1024);
        tokio::spawn(relay_actor(rx));
        Self { tx }
    }

    /// Register a connection's outbound channel and get its ID
    pub async fn connect(
        &self,
        peer_tx: mpsc::UnboundedSender<OutboundMessage>,
    ) -> Result<ConnId, SignalingError> {
        let (reply_tx, reply_rx) = oneshot::channel();
        let _ = self
            .tx
            .send(RelayCommand::Connect {
                peer_tx,
                reply: reply_tx,
            })
            .await;
        reply_rx
            .await
            .map_err(|_| SignalingError::Internal("actor channel closed".to_string()))
    }

    /// Hand an inbound event to the relay
    pub async fn dispatch(&self, conn: ConnId, event: Event) {
        let _ = self.tx.send(RelayCommand::Event { conn, event }).await;
    }

    /// Drop the connection from every room it is in
    pub async fn disconnect(&self, conn: ConnId) {
        let _ = self.tx.send(RelayCommand::Disconnect { conn }).await;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::signaling::messages::ServerMessage;
    use crate::signaling::types::RoomKey;
    use serde_json::json;

    async fn connect(handle: &RelayHandle) -> (ConnId, mpsc::UnboundedReceiver<OutboundMessage>) {
        let (tx, rx) = mpsc::unbounded_channel();
        let conn = handle.connect(tx).await.unwrap();
        (conn, rx)
    }

    async fn recv(rx: &mut mpsc::UnboundedReceiver<OutboundMessage>) -> ServerMessage {
        let msg = rx.recv().await.unwrap();
        serde_json::from_str(msg.as_str()).unwrap()
    }

    fn join(room: &str) -> Event {
        Event::Join {
            room: RoomKey::from(room),
        }
    }

    /// Round-trip through the actor so every earlier command has been handled.
    async fn sync(handle: &RelayHandle) {
        let (tx, _rx) = mpsc::unbounded_channel();
        let conn = handle.connect(tx).await.unwrap();
        handle.disconnect(conn).await;
    }

    #[tokio::test]
    async fn join_and_disconnect_notify_peers() {
        let handle = RelayHandle::spawn();
        let (a, mut rx_a) = connect(&handle).await;
        let (b, mut rx_b) = connect(&handle).await;

        handle.dispatch(a, join("r1")).await;
        handle.dispatch(b, join("r1")).await;
        assert_eq!(recv(&mut rx_a).await, ServerMessage::PeerJoined { conn_id: b });

        handle.disconnect(a).await;
        assert_eq!(recv(&mut rx_b).await, ServerMessage::PeerLeft { conn_id: a });

        sync(&handle).await;
        assert!(rx_b.try_recv().is_err());
    }

    #[tokio::test]
    async fn signal_reaches_everyone_but_sender() {
        let handle = RelayHandle::spawn();
        let (x, mut rx_x) = connect(&handle).await;
        let (y, mut rx_y) = connect(&handle).await;
        let (z, mut rx_z) = connect(&handle).await;

        for conn in [x, y, z] {
            handle.dispatch(conn, join("r1")).await;
        }
        handle
            .dispatch(
                y,
                Event::Signal {
                    kind: crate::signaling::router::SignalKind::Answer,
                    room: RoomKey::from("r1"),
                    payload: json!({"sdp": "answer"}),
                },
            )
            .await;
        sync(&handle).await;

        let expected = ServerMessage::Answer {
            payload: json!({"sdp": "answer"}),
            sender_id: y,
        };
        // x saw y and z join; z saw nobody join after it
        assert_eq!(recv(&mut rx_x).await, ServerMessage::PeerJoined { conn_id: y });
        assert_eq!(recv(&mut rx_x).await, ServerMessage::PeerJoined { conn_id: z });
        assert_eq!(recv(&mut rx_x).await, expected);
        assert_eq!(recv(&mut rx_z).await, expected);

        assert_eq!(recv(&mut rx_y).await, ServerMessage::PeerJoined { conn_id: z });
        assert!(rx_y.try_recv().is_err());
    }

    #[tokio::test]
    async fn dead_recipient_does_not_block_fanout() {
        let handle = RelayHandle::spawn();
        let (a, rx_a) = connect(&handle).await;
        let (b, mut rx_b) = connect(&handle).await;
        let (c, _rx_c) = connect(&handle).await;

        handle.dispatch(a, join("r1")).await;
        handle.dispatch(b, join("r1")).await;
        drop(rx_a);
        handle.dispatch(c, join("r1")).await;

        assert_eq!(recv(&mut rx_b).await, ServerMessage::PeerJoined { conn_id: c });
    }

    #[tokio::test]
    async fn events_after_disconnect_are_ignored() {
        let handle = RelayHandle::spawn();
        let (a, _rx_a) = connect(&handle).await;
        let (b, mut rx_b) = connect(&handle).await;

        handle.dispatch(b, join("r1")).await;
        handle.disconnect(a).await;
        handle.dispatch(a, join("r1")).await;
        handle.disconnect(a).await;
        sync(&handle).await;

        assert!(rx_b.try_recv().is_err());
    }
}
