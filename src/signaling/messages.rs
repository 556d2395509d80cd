use serde::{Deserialize, Serialize};
use serde_json::Value;

use super::router::{Event, SignalKind};
use super::types::{ConnId, RoomKey};

/// Messages sent from client to server
#[derive(Debug, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "kebab-case", rename_all_fields = "camelCase")]
pub enum ClientMessage {
    /// Join a room, creating it if needed
    #[serde(alias = "join-room")]
    Join {
        #[serde(alias = "roomId")]
        room_key: RoomKey,
    },

    /// Leave a room
    #[serde(alias = "leave-room")]
    Leave {
        #[serde(alias = "roomId")]
        room_key: RoomKey,
    },

    /// Session offer, forwarded untouched to the rest of the room
    Offer {
        #[serde(alias = "roomId")]
        room_key: RoomKey,
        #[serde(alias = "offer")]
        payload: Value,
    },

    /// Session answer, forwarded untouched to the rest of the room
    Answer {
        #[serde(alias = "roomId")]
        room_key: RoomKey,
        #[serde(alias = "answer")]
        payload: Value,
    },

    /// Network path candidate, forwarded untouched to the rest of the room
    #[serde(alias = "ice-candidate")]
    Candidate {
        #[serde(alias = "roomId")]
        room_key: RoomKey,
        #[serde(alias = "candidate")]
        payload: Value,
    },
}

impl From<ClientMessage> for Event {
    fn from(msg: ClientMessage) -> Self {
        match msg {
            ClientMessage::Join { room_key } => Event::Join { room: room_key },
            ClientMessage::Leave { room_key } => Event::Leave { room: room_key },
            ClientMessage::Offer { room_key, payload } => Event::Signal {
                kind: SignalKind::Offer,
                room: room_key,
                payload,
            },
            ClientMessage::Answer { room_key, payload } => Event::Signal {
                kind: SignalKind::Answer,
                room: room_key,
                payload,
            },
            ClientMessage::Candidate { room_key, payload } => Event::Signal {
                kind: SignalKind::Candidate,
                room: room_key,
                payload,
            },
        }
    }
}

/// Messages sent from server to client
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "kebab-case", rename_all_fields = "camelCase")]
pub enum ServerMessage {
    /// Sent once after connecting; tells the client its own ID
    Welcome { conn_id: ConnId },

    /// Another connection joined a room you are in
    PeerJoined { conn_id: ConnId },

    /// Another connection left a room you are in (explicitly or by dropping)
    PeerLeft { conn_id: ConnId },

    Offer { payload: Value, sender_id: ConnId },

    Answer { payload: Value, sender_id: ConnId },

    Candidate { payload: Value, sender_id: ConnId },
}

impl ServerMessage {
    pub fn signal(kind: SignalKind, payload: Value, sender_id: ConnId) -> Self {
        match kind {
            SignalKind::Offer => ServerMessage::Offer { payload, sender_id },
            SignalKind::Answer => ServerMessage::Answer { payload, sender_id },
            SignalKind::Candidate => ServerMessage::Candidate { payload, sender_id },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn parse_join() {
        let json = r#"{"type": "join", "roomKey": "r1"}"#;
        let msg: ClientMessage = serde_json::from_str(json).unwrap();
        if let ClientMessage::Join { room_key } = msg {
            assert_eq!(room_key.as_str(), "r1");
        } else {
            panic!("Expected Join");
        }
    }

    #[test]
    fn parse_legacy_join_room() {
        let json = r#"{"type": "join-room", "roomId": "r1"}"#;
        let msg: ClientMessage = serde_json::from_str(json).unwrap();
        assert!(matches!(msg, ClientMessage::Join { .. }));
    }

    #[test]
    fn parse_leave() {
        let json = r#"{"type": "leave", "roomKey": "r1"}"#;
        let msg: ClientMessage = serde_json::from_str(json).unwrap();
        assert!(matches!(msg, ClientMessage::Leave { .. }));
    }

    #[test]
    fn parse_offer_keeps_payload_opaque() {
        let json = r#"{"type": "offer", "roomKey": "r1", "payload": {"sdp": "v=0", "extra": [1, 2]}}"#;
        let msg: ClientMessage = serde_json::from_str(json).unwrap();
        if let ClientMessage::Offer { room_key, payload } = msg {
            assert_eq!(room_key.as_str(), "r1");
            assert_eq!(payload, json!({"sdp": "v=0", "extra": [1, 2]}));
        } else {
            panic!("Expected Offer");
        }
    }

    #[test]
    fn parse_legacy_ice_candidate() {
        let json = r#"{"type": "ice-candidate", "roomId": "r1", "candidate": "candidate:1 1 udp"}"#;
        let msg: ClientMessage = serde_json::from_str(json).unwrap();
        if let ClientMessage::Candidate { payload, .. } = msg {
            assert_eq!(payload, json!("candidate:1 1 udp"));
        } else {
            panic!("Expected Candidate");
        }
    }

    #[test]
    fn reject_signal_without_room_key() {
        let json = r#"{"type": "offer", "payload": "sdp1"}"#;
        assert!(serde_json::from_str::<ClientMessage>(json).is_err());
    }

    #[test]
    fn reject_signal_without_payload() {
        let json = r#"{"type": "answer", "roomKey": "r1"}"#;
        assert!(serde_json::from_str::<ClientMessage>(json).is_err());
    }

    #[test]
    fn reject_wrong_typed_room_key() {
        let json = r#"{"type": "join", "roomKey": 42}"#;
        assert!(serde_json::from_str::<ClientMessage>(json).is_err());
    }

    #[test]
    fn reject_unknown_type() {
        let json = r#"{"type": "create_room"}"#;
        assert!(serde_json::from_str::<ClientMessage>(json).is_err());
    }

    #[test]
    fn client_message_into_event() {
        let msg = ClientMessage::Candidate {
            room_key: RoomKey::from("r1"),
            payload: json!("c"),
        };
        let event = Event::from(msg);
        assert!(matches!(
            event,
            Event::Signal {
                kind: SignalKind::Candidate,
                ..
            }
        ));
    }

    #[test]
    fn serialize_peer_joined() {
        let msg = ServerMessage::PeerJoined {
            conn_id: ConnId::from("conn_abc12345"),
        };
        let json = serde_json::to_value(&msg).unwrap();
        assert_eq!(json, json!({"type": "peer-joined", "connId": "conn_abc12345"}));
    }

    #[test]
    fn serialize_peer_left() {
        let msg = ServerMessage::PeerLeft {
            conn_id: ConnId::from("conn_abc12345"),
        };
        let json = serde_json::to_value(&msg).unwrap();
        assert_eq!(json, json!({"type": "peer-left", "connId": "conn_abc12345"}));
    }

    #[test]
    fn serialize_forwarded_offer() {
        let msg = ServerMessage::signal(SignalKind::Offer, json!("sdp1"), ConnId::from("conn_b"));
        let json = serde_json::to_value(&msg).unwrap();
        assert_eq!(
            json,
            json!({"type": "offer", "payload": "sdp1", "senderId": "conn_b"})
        );
    }

    #[test]
    fn serialize_welcome() {
        let msg = ServerMessage::Welcome {
            conn_id: ConnId::from("conn_00000001"),
        };
        let json = serde_json::to_string(&msg).unwrap();
        assert!(json.contains("welcome"));
        assert!(json.contains("conn_00000001"));
    }
}
