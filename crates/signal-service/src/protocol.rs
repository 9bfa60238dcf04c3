//! Signaling wire protocol.
//!
//! One JSON object per WebSocket text frame. Incoming and outgoing frames
//! form closed sums: the parser produces a variant and the connection
//! state machine matches on it, rejecting unknown tags at the boundary.
//!
//! SDP and ICE payloads are deliberately untyped (`serde_json::Value`):
//! the server never inspects them and relays them verbatim, stamped with
//! the sender's user ID.

use crate::errors::SignalError;
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Maximum accepted frame size in bytes.
///
/// SDP bodies run a few kilobytes; anything past this cap is rejected
/// before JSON parsing runs.
pub const MAX_FRAME_SIZE_BYTES: usize = 65536;

/// Frames a client may send.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "kebab-case", rename_all_fields = "camelCase")]
pub enum ClientFrame {
    /// Present a grant and request admission to its room.
    Join { room_id: String, token: String },

    /// SDP offer for the other peer. Opaque to the server.
    Offer { sdp: Value },

    /// SDP answer for the other peer. Opaque to the server.
    Answer { sdp: Value },

    /// ICE candidate for the other peer. Opaque to the server.
    Ice { candidate: Value },

    /// Leave the current room and close.
    Leave,
}

/// Frames the server sends.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "kebab-case", rename_all_fields = "camelCase")]
pub enum ServerFrame {
    /// Admission succeeded; `peers` lists the user IDs already present.
    Joined {
        room_id: String,
        user_id: String,
        peers: Vec<String>,
    },

    /// Another peer was admitted to the room. Sent to members that were
    /// already present; `is_initiator` tells the receiver it produces the
    /// first SDP offer.
    PeerJoined { user_id: String, is_initiator: bool },

    /// A peer left the room (explicitly or by disconnect/reap).
    PeerLeft { user_id: String },

    /// Relayed SDP offer.
    Offer { sdp: Value, from_user_id: String },

    /// Relayed SDP answer.
    Answer { sdp: Value, from_user_id: String },

    /// Relayed ICE candidate.
    Ice {
        candidate: Value,
        from_user_id: String,
    },

    /// Protocol or admission failure with a stable code string.
    Error { code: String, message: String },
}

impl ClientFrame {
    /// Parse one text frame.
    ///
    /// # Errors
    ///
    /// Returns [`SignalError::InvalidMessage`] for oversized frames,
    /// frames that are not JSON, and unknown frame tags.
    pub fn parse(text: &str) -> Result<Self, SignalError> {
        if text.len() > MAX_FRAME_SIZE_BYTES {
            tracing::debug!(
                target: "sb.protocol",
                frame_size = text.len(),
                max_size = MAX_FRAME_SIZE_BYTES,
                "Frame rejected: size exceeds maximum allowed"
            );
            return Err(SignalError::InvalidMessage("frame exceeds size limit"));
        }

        serde_json::from_str(text).map_err(|e| {
            tracing::debug!(target: "sb.protocol", error = %e, "Frame rejected: malformed JSON");
            SignalError::InvalidMessage("malformed frame")
        })
    }
}

impl ServerFrame {
    /// Serialize for the wire.
    #[must_use]
    #[allow(clippy::expect_used)] // server frames contain only string keys and JSON values
    pub fn to_json(&self) -> String {
        serde_json::to_string(self).expect("server frames always serialize")
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_parse_join() {
        let frame = ClientFrame::parse(r#"{"type":"join","roomId":"r-1","token":"abc"}"#).unwrap();
        assert_eq!(
            frame,
            ClientFrame::Join {
                room_id: "r-1".to_string(),
                token: "abc".to_string(),
            }
        );
    }

    #[test]
    fn test_parse_offer_keeps_payload_opaque() {
        let frame =
            ClientFrame::parse(r#"{"type":"offer","sdp":{"type":"offer","sdp":"v=0..."}}"#)
                .unwrap();
        let ClientFrame::Offer { sdp } = frame else {
            panic!("expected offer");
        };
        assert_eq!(sdp, json!({"type": "offer", "sdp": "v=0..."}));
    }

    #[test]
    fn test_parse_ice_with_null_fields() {
        let text = r#"{"type":"ice","candidate":{"candidate":"c","sdpMid":null,"sdpMLineIndex":0,"usernameFragment":null}}"#;
        let ClientFrame::Ice { candidate } = ClientFrame::parse(text).unwrap() else {
            panic!("expected ice");
        };
        assert_eq!(candidate["sdpMid"], Value::Null);
        assert_eq!(candidate["sdpMLineIndex"], 0);
    }

    #[test]
    fn test_parse_leave() {
        assert_eq!(
            ClientFrame::parse(r#"{"type":"leave"}"#).unwrap(),
            ClientFrame::Leave
        );
    }

    #[test]
    fn test_parse_rejects_unknown_tag() {
        assert!(matches!(
            ClientFrame::parse(r#"{"type":"subscribe"}"#),
            Err(SignalError::InvalidMessage(_))
        ));
    }

    #[test]
    fn test_parse_rejects_non_json() {
        assert!(matches!(
            ClientFrame::parse("not json"),
            Err(SignalError::InvalidMessage(_))
        ));
    }

    #[test]
    fn test_parse_rejects_missing_fields() {
        assert!(matches!(
            ClientFrame::parse(r#"{"type":"join","roomId":"r-1"}"#),
            Err(SignalError::InvalidMessage(_))
        ));
    }

    #[test]
    fn test_parse_rejects_oversized_frame() {
        let sdp = "a".repeat(MAX_FRAME_SIZE_BYTES);
        let text = format!(r#"{{"type":"offer","sdp":{{"type":"offer","sdp":"{sdp}"}}}}"#);
        assert!(matches!(
            ClientFrame::parse(&text),
            Err(SignalError::InvalidMessage(_))
        ));
    }

    #[test]
    fn test_joined_wire_shape() {
        let frame = ServerFrame::Joined {
            room_id: "r-1".to_string(),
            user_id: "bob".to_string(),
            peers: vec!["alice".to_string()],
        };
        let value: Value = serde_json::from_str(&frame.to_json()).unwrap();
        assert_eq!(
            value,
            json!({"type": "joined", "roomId": "r-1", "userId": "bob", "peers": ["alice"]})
        );
    }

    #[test]
    fn test_peer_joined_wire_shape() {
        let frame = ServerFrame::PeerJoined {
            user_id: "bob".to_string(),
            is_initiator: true,
        };
        let value: Value = serde_json::from_str(&frame.to_json()).unwrap();
        assert_eq!(
            value,
            json!({"type": "peer-joined", "userId": "bob", "isInitiator": true})
        );
    }

    #[test]
    fn test_peer_left_wire_shape() {
        let frame = ServerFrame::PeerLeft {
            user_id: "bob".to_string(),
        };
        let value: Value = serde_json::from_str(&frame.to_json()).unwrap();
        assert_eq!(value, json!({"type": "peer-left", "userId": "bob"}));
    }

    #[test]
    fn test_relayed_offer_wire_shape() {
        let frame = ServerFrame::Offer {
            sdp: json!({"type": "offer", "sdp": "X"}),
            from_user_id: "alice".to_string(),
        };
        let value: Value = serde_json::from_str(&frame.to_json()).unwrap();
        assert_eq!(
            value,
            json!({
                "type": "offer",
                "sdp": {"type": "offer", "sdp": "X"},
                "fromUserId": "alice"
            })
        );
    }

    #[test]
    fn test_error_wire_shape() {
        let frame = ServerFrame::Error {
            code: "ROOM_FULL".to_string(),
            message: "The room is at capacity".to_string(),
        };
        let value: Value = serde_json::from_str(&frame.to_json()).unwrap();
        assert_eq!(value["type"], "error");
        assert_eq!(value["code"], "ROOM_FULL");
    }

    #[test]
    fn test_relay_payload_round_trips_verbatim() {
        // Whatever JSON the client put in `sdp` must come out byte-equal
        // after a parse-relay-serialize cycle.
        let payload = json!({
            "type": "offer",
            "sdp": "v=0\r\no=- 46117 2 IN IP4 127.0.0.1\r\n",
            "extra": {"nested": [1, 2, null]}
        });
        let text = serde_json::to_string(&json!({"type": "offer", "sdp": payload})).unwrap();

        let ClientFrame::Offer { sdp } = ClientFrame::parse(&text).unwrap() else {
            panic!("expected offer");
        };
        let relayed = ServerFrame::Offer {
            sdp,
            from_user_id: "alice".to_string(),
        };
        let out: Value = serde_json::from_str(&relayed.to_json()).unwrap();
        assert_eq!(out["sdp"], payload);
    }
}
