//! Wire format: one JSON object per WebSocket text frame, tagged by `type`

use serde::{Deserialize, Serialize};

use crate::game::movement::{Heading, MoveIntent};
use crate::game::state::SessionSnapshot;

/// Messages from client to server
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum ClientMessage {
    /// Claim a username for this connection
    Join { username: String, color: String },
    /// Step in a direction, scaled by `force` (1 when absent)
    Move {
        direction: MoveDirection,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        force: Option<f32>,
    },
}

/// `direction` is either a cardinal token or a numeric angle in degrees
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum MoveDirection {
    Angle(f32),
    Token(String),
}

impl MoveDirection {
    /// `None` for a token that is not one of the four cardinal names
    pub fn to_heading(&self) -> Option<Heading> {
        match self {
            MoveDirection::Angle(degrees) => Some(Heading::Degrees(*degrees)),
            MoveDirection::Token(token) => Heading::from_token(token),
        }
    }
}

impl ClientMessage {
    /// Movement intent carried by a `move`, if it names a known direction
    pub fn move_intent(&self) -> Option<MoveIntent> {
        match self {
            ClientMessage::Move { direction, force } => direction
                .to_heading()
                .map(|heading| MoveIntent::new(heading, *force)),
            ClientMessage::Join { .. } => None,
        }
    }
}

/// Messages from server to client
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum ServerMessage {
    /// Every live session, sent to all connections each tick
    State { users: Vec<UserState> },
    /// Sent only to the connection whose request failed
    Error { message: String },
}

impl ServerMessage {
    pub fn error(message: impl Into<String>) -> Self {
        ServerMessage::Error {
            message: message.into(),
        }
    }

    pub fn state(snapshot: Vec<SessionSnapshot>) -> Self {
        ServerMessage::State {
            users: snapshot.into_iter().map(UserState::from).collect(),
        }
    }
}

/// One entry of a `state` broadcast
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UserState {
    pub username: String,
    pub x: f32,
    pub y: f32,
    pub color: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sprite: Option<String>,
}

impl From<SessionSnapshot> for UserState {
    fn from(snap: SessionSnapshot) -> Self {
        Self {
            username: snap.username,
            x: snap.x,
            y: snap.y,
            color: snap.color,
            sprite: snap.sprite,
        }
    }
}

/// Encode a message to a JSON text payload
pub fn encode<T: Serialize>(message: &T) -> Result<String, EncodeError> {
    serde_json::to_string(message).map_err(|e| EncodeError(e.to_string()))
}

/// Decode a JSON text payload
pub fn decode<T: for<'de> Deserialize<'de>>(text: &str) -> Result<T, DecodeError> {
    serde_json::from_str(text).map_err(|e| DecodeError(e.to_string()))
}

#[derive(Debug, thiserror::Error)]
#[error("Encode error: {0}")]
pub struct EncodeError(String);

#[derive(Debug, thiserror::Error)]
#[error("Decode error: {0}")]
pub struct DecodeError(String);

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::{json, Value};

    #[test]
    fn test_decode_join() {
        let msg: ClientMessage =
            decode(r#"{"type":"join","username":"alice","color":"red"}"#).unwrap();
        assert_eq!(
            msg,
            ClientMessage::Join {
                username: "alice".into(),
                color: "red".into()
            }
        );
    }

    #[test]
    fn test_decode_move_token_default_force() {
        let msg: ClientMessage = decode(r#"{"type":"move","direction":"up"}"#).unwrap();
        let intent = msg.move_intent().unwrap();
        assert_eq!(intent.heading, Heading::Up);
        assert_eq!(intent.force, 1.0);
    }

    #[test]
    fn test_decode_move_angle_with_force() {
        let msg: ClientMessage =
            decode(r#"{"type":"move","direction":90,"force":2.5}"#).unwrap();
        let intent = msg.move_intent().unwrap();
        assert_eq!(intent.heading, Heading::Degrees(90.0));
        assert_eq!(intent.force, 2.5);
    }

    #[test]
    fn test_decode_move_null_force_defaults() {
        let msg: ClientMessage =
            decode(r#"{"type":"move","direction":"left","force":null}"#).unwrap();
        assert_eq!(msg.move_intent().unwrap().force, 1.0);
    }

    #[test]
    fn test_unknown_token_has_no_intent() {
        let msg: ClientMessage = decode(r#"{"type":"move","direction":"north"}"#).unwrap();
        assert!(msg.move_intent().is_none());
    }

    #[test]
    fn test_malformed_payloads_rejected() {
        for text in [
            "not json",
            r#"{"type":"teleport","x":1}"#,
            r#"{"type":"join","username":"alice"}"#,
            r#"{"type":"move"}"#,
            r#"{"type":"move","direction":true}"#,
            r#"{"username":"alice","color":"red"}"#,
            "",
        ] {
            assert!(decode::<ClientMessage>(text).is_err(), "accepted {:?}", text);
        }
    }

    #[test]
    fn test_encode_state_shape() {
        let msg = ServerMessage::state(vec![
            SessionSnapshot {
                username: "alice".into(),
                x: 100.0,
                y: 50.0,
                color: "red".into(),
                sprite: Some("knight".into()),
            },
            SessionSnapshot {
                username: "bob".into(),
                x: 1.5,
                y: 2.0,
                color: "blue".into(),
                sprite: None,
            },
        ]);

        let value: Value = serde_json::from_str(&encode(&msg).unwrap()).unwrap();
        assert_eq!(
            value,
            json!({
                "type": "state",
                "users": [
                    {"username": "alice", "x": 100.0, "y": 50.0, "color": "red", "sprite": "knight"},
                    {"username": "bob", "x": 1.5, "y": 2.0, "color": "blue"}
                ]
            })
        );
    }

    #[test]
    fn test_encode_empty_state() {
        let text = encode(&ServerMessage::state(Vec::new())).unwrap();
        assert_eq!(text, r#"{"type":"state","users":[]}"#);
    }

    #[test]
    fn test_encode_error() {
        let text = encode(&ServerMessage::error("Username already taken.")).unwrap();
        assert_eq!(text, r#"{"type":"error","message":"Username already taken."}"#);
    }
}
