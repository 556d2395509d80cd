//! WebSocket signaling relay: rooms of peers exchanging offers, answers and candidates

mod actor;
mod messages;
mod registry;
mod router;
mod server;
mod transport;
mod types;

pub use actor::RelayHandle;
pub use messages::{ClientMessage, ServerMessage};
pub use registry::RoomRegistry;
pub use router::{Delivery, Event, Router, SignalKind};
pub use server::{DEFAULT_SIGNALING_PORT, SignalingServer};
pub use transport::{PeerChannels, Transport};
pub use types::{ConnId, OutboundMessage, RoomKey, SignalingError};
