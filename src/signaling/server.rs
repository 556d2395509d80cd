use std::net::SocketAddr;
use std::time::Duration;

use futures_util::{SinkExt, StreamExt};
use tokio::net::{TcpListener, TcpStream};
use tokio::sync::mpsc;
use tokio_tungstenite::tungstenite::{Bytes, Message};
use tracing::{debug, error, info, warn};

use super::actor::RelayHandle;
use super::messages::{ClientMessage, ServerMessage};
use super::types::{ConnId, OutboundMessage};

pub const DEFAULT_SIGNALING_PORT: u16 = 3001;
const PING_INTERVAL: Duration = Duration::from_secs(30);
const PONG_TIMEOUT: Duration = Duration::from_secs(10);

/// Ping cadence and how long a ping may go unanswered
#[derive(Debug, Clone, Copy)]
struct Heartbeat {
    ping_interval: Duration,
    pong_timeout: Duration,
}

pub struct SignalingServer {
    listener: TcpListener,
    handle: RelayHandle,
    heartbeat: Heartbeat,
}

impl SignalingServer {
    /// Bind the listener and start the relay actor
    pub async fn bind(addr: &str) -> std::io::Result<Self> {
        Self::bind_with_heartbeat(addr, PING_INTERVAL, PONG_TIMEOUT).await
    }

    /// Like `bind`, with custom heartbeat timings
    pub async fn bind_with_heartbeat(
        addr: &str,
        ping_interval: Duration,
        pong_timeout: Duration,
    ) -> std::io::Result<Self> {
        let listener = TcpListener::bind(addr).await?;
        info!("Signaling server listening on {}", listener.local_addr()?);

        Ok(Self {
            listener,
            handle: RelayHandle::spawn(),
            heartbeat: Heartbeat {
                ping_interval,
                pong_timeout,
            },
        })
    }

    pub fn local_addr(&self) -> std::io::Result<SocketAddr> {
        self.listener.local_addr()
    }

    pub async fn run(self) -> std::io::Result<()> {
        loop {
            let (stream, addr) = self.listener.accept().await?;
            let handle = self.handle.clone();
            let heartbeat = self.heartbeat;

            tokio::spawn(async move {
                if let Err(e) = handle_connection(stream, addr, handle, heartbeat).await {
                    error!("Connection error from {}: {}", addr, e);
                }
            });
        }
    }
}

async fn handle_connection(
    stream: TcpStream,
    addr: SocketAddr,
    handle: RelayHandle,
    heartbeat: Heartbeat,
) -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
    let ws_stream = tokio_tungstenite::accept_async(stream).await?;
    let (mut ws_tx, mut ws_rx) = ws_stream.split();

    let (tx, mut rx) = mpsc::unbounded_channel::<OutboundMessage>();
    let (ctrl_tx, mut ctrl_rx) = mpsc::unbounded_channel::<Message>();

    let conn = handle.connect(tx.clone()).await?;
    info!("WebSocket connection from {} as {}", addr, conn);

    let welcome = ServerMessage::Welcome { conn_id: conn };
    let _ = tx.send(OutboundMessage::from(serde_json::to_string(&welcome)?));
    // the actor holds the only sender from here on
    drop(tx);

    let mut ping_interval = tokio::time::interval(heartbeat.ping_interval);
    let mut waiting_for_pong = false;
    let mut pong_deadline: Option<tokio::time::Instant> = None;

    let send_task = tokio::spawn(async move {
        loop {
            tokio::select! {
                Some(msg) = rx.recv() => {
                    let ws_msg = Message::Text(msg.into_inner());
                    if ws_tx.send(ws_msg).await.is_err() {
                        break;
                    }
                }
                Some(ctrl_msg) = ctrl_rx.recv() => {
                    if ws_tx.send(ctrl_msg).await.is_err() {
                        break;
                    }
                }
                else => break,
            }
        }
    });

    loop {
        let pong_timeout = async {
            match pong_deadline {
                Some(deadline) => tokio::time::sleep_until(deadline).await,
                None => std::future::pending().await,
            }
        };

        tokio::select! {
            _ = ping_interval.tick() => {
                if waiting_for_pong {
                    warn!("No Pong received, disconnecting {}", conn);
                    break;
                }
                if ctrl_tx.send(Message::Ping(Bytes::new())).is_err() {
                    break;
                }
                waiting_for_pong = true;
                pong_deadline = Some(tokio::time::Instant::now() + heartbeat.pong_timeout);
                debug!("Ping sent to {}", conn);
            }

            _ = pong_timeout => {
                warn!("Pong timeout, disconnecting {}", conn);
                break;
            }

            msg = ws_rx.next() => {
                let msg = match msg {
                    Some(Ok(m)) => m,
                    Some(Err(e)) => {
                        warn!("WebSocket error from {}: {}", conn, e);
                        break;
                    }
                    None => break,
                };

                match msg {
                    Message::Text(text) => handle_text_message(&text, conn, &handle).await,
                    Message::Pong(_) => {
                        waiting_for_pong = false;
                        pong_deadline = None;
                        debug!("Pong received from {}", conn);
                    }
                    Message::Close(_) => {
                        info!("Close received from {}", conn);
                        break;
                    }
                    Message::Binary(_) => debug!("Ignoring binary frame from {}", conn),
                    _ => {}
                }
            }
        }
    }

    handle.disconnect(conn).await;

    send_task.abort();
    info!("WebSocket disconnected: {} ({})", conn, addr);

    Ok(())
}

/// Malformed input is dropped without a reply
async fn handle_text_message(text: &str, conn: ConnId, handle: &RelayHandle) {
    match serde_json::from_str::<ClientMessage>(text) {
        Ok(msg) => handle.dispatch(conn, msg.into()).await,
        Err(e) => debug!("Dropping malformed message from {}: {}", conn, e),
    }
}
