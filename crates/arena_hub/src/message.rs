//! Wire envelope exchanged with connected clients.
//!
//! A frame carries exactly one JSON object. The variant-specific fields sit
//! beside the base fields, keyed by `type`:
//!
//! ```json
//! {"type":"chat","content":"gg","username":"alice","game_id":"...","timestamp":"...","is_private":false}
//! ```

use crate::{ProtocolError, SessionId};
use chrono::{DateTime, Utc};
use derive_getters::Getters;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::str::FromStr;
use tracing::instrument;

/// Sender name stamped on hub-originated messages.
pub const SYSTEM_USERNAME: &str = "System";

/// Machine-readable code carried by `error` messages.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, strum::Display,
)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
#[strum(serialize_all = "SCREAMING_SNAKE_CASE")]
pub enum ErrorCode {
    /// Frame could not be decoded.
    InvalidFormat,
    /// Chat content over the limit.
    MessageTooLong,
    /// Type tag not accepted from clients.
    UnknownType,
    /// Move rejected by the game.
    InvalidMove,
}

/// Bare type tag, used to classify a frame before full decoding.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, strum::Display, strum::EnumString)]
#[strum(serialize_all = "snake_case")]
pub enum MessageType {
    /// Chat line.
    Chat,
    /// Participant joined.
    Join,
    /// Participant left.
    Leave,
    /// Board move notification.
    GameMove,
    /// Hub notice.
    System,
    /// Error reply.
    Error,
}

impl MessageType {
    /// Whether clients are allowed to send this type.
    pub fn is_client_originated(self) -> bool {
        !matches!(self, MessageType::System | MessageType::Error)
    }
}

/// Variant-specific fields, flattened into the envelope.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum MessageKind {
    /// Chat line.
    Chat {
        /// Private chat flag.
        #[serde(default)]
        is_private: bool,
    },
    /// Participant joined.
    Join {
        /// Clients in the session after the join.
        #[serde(default)]
        player_count: usize,
    },
    /// Participant left.
    Leave {
        /// Clients in the session after the leave.
        #[serde(default)]
        player_count: usize,
    },
    /// Board move.
    GameMove {
        /// Cell index. Range checking belongs to the game.
        position: i64,
        /// Mover's symbol.
        #[serde(default)]
        symbol: String,
    },
    /// Hub notice.
    System {
        /// Notice tag, e.g. `game_over`.
        #[serde(default)]
        action: String,
    },
    /// Error reply.
    Error {
        /// Error code.
        error_code: ErrorCode,
    },
}

impl MessageKind {
    /// Bare type tag of this variant.
    pub fn message_type(&self) -> MessageType {
        match self {
            MessageKind::Chat { .. } => MessageType::Chat,
            MessageKind::Join { .. } => MessageType::Join,
            MessageKind::Leave { .. } => MessageType::Leave,
            MessageKind::GameMove { .. } => MessageType::GameMove,
            MessageKind::System { .. } => MessageType::System,
            MessageKind::Error { .. } => MessageType::Error,
        }
    }
}

/// One wire message.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Getters)]
pub struct Message {
    /// Variant fields, including the `type` tag.
    #[serde(flatten)]
    kind: MessageKind,
    /// Text body; may be empty.
    content: String,
    /// Sender display name.
    #[serde(default)]
    username: String,
    /// Session (game) the message belongs to.
    #[serde(default)]
    game_id: SessionId,
    /// Creation time.
    #[serde(default = "Utc::now")]
    timestamp: DateTime<Utc>,
    /// Free-form payload.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    data: Option<Value>,
}

impl Message {
    /// Builds a message stamped with the current time.
    pub fn new(
        kind: MessageKind,
        content: impl Into<String>,
        username: impl Into<String>,
        game_id: impl Into<SessionId>,
    ) -> Self {
        Self {
            kind,
            content: content.into(),
            username: username.into(),
            game_id: game_id.into(),
            timestamp: Utc::now(),
            data: None,
        }
    }

    /// Chat line from `username`.
    pub fn chat(
        content: impl Into<String>,
        username: impl Into<String>,
        game_id: impl Into<SessionId>,
        is_private: bool,
    ) -> Self {
        Self::new(MessageKind::Chat { is_private }, content, username, game_id)
    }

    /// "`username` joined the game", with the session size after the join.
    pub fn join(username: &str, game_id: impl Into<SessionId>, player_count: usize) -> Self {
        Self::new(
            MessageKind::Join { player_count },
            format!("{username} joined the game"),
            username,
            game_id,
        )
    }

    /// "`username` left the game", with the session size after the leave.
    pub fn leave(username: &str, game_id: impl Into<SessionId>, player_count: usize) -> Self {
        Self::new(
            MessageKind::Leave { player_count },
            format!("{username} left the game"),
            username,
            game_id,
        )
    }

    /// Move notification with empty content.
    pub fn game_move(
        position: i64,
        symbol: impl Into<String>,
        username: impl Into<String>,
        game_id: impl Into<SessionId>,
    ) -> Self {
        Self::new(
            MessageKind::GameMove {
                position,
                symbol: symbol.into(),
            },
            "",
            username,
            game_id,
        )
    }

    /// Hub notice sent as [`SYSTEM_USERNAME`].
    pub fn system(
        action: impl Into<String>,
        content: impl Into<String>,
        game_id: impl Into<SessionId>,
    ) -> Self {
        Self::new(
            MessageKind::System {
                action: action.into(),
            },
            content,
            SYSTEM_USERNAME,
            game_id,
        )
    }

    /// Error reply sent as [`SYSTEM_USERNAME`].
    pub fn error(
        error_code: ErrorCode,
        content: impl Into<String>,
        game_id: impl Into<SessionId>,
    ) -> Self {
        Self::new(MessageKind::Error { error_code }, content, SYSTEM_USERNAME, game_id)
    }

    /// Attaches a free-form payload.
    pub fn with_data(mut self, data: Value) -> Self {
        self.data = Some(data);
        self
    }

    /// Tags a move with its 1-based place in the game's history.
    ///
    /// Announcements of one game may be queued out of order; clients sort
    /// moves by this number.
    pub fn with_move_number(self, move_number: usize) -> Self {
        self.with_data(serde_json::json!({ "move_number": move_number }))
    }

    /// Number set by [`Message::with_move_number`], if any.
    pub fn move_number(&self) -> Option<u64> {
        self.data.as_ref()?.get("move_number")?.as_u64()
    }

    /// Bare type tag.
    pub fn message_type(&self) -> MessageType {
        self.kind.message_type()
    }

    /// Overwrites sender, session and time with server-side values.
    pub(crate) fn stamp(&mut self, username: &str, game_id: &str) {
        self.username = username.to_string();
        self.game_id = game_id.to_string();
        self.timestamp = Utc::now();
    }

    pub(crate) fn kind_mut(&mut self) -> &mut MessageKind {
        &mut self.kind
    }

    /// Serializes to a JSON frame.
    ///
    /// # Errors
    ///
    /// Returns the serializer error; only reachable through a non-string map
    /// key inside `data`.
    pub fn encode(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string(self)
    }

    /// Decodes one JSON frame.
    ///
    /// The `type` tag is checked before the variant fields, so an unknown tag is
    /// reported as such rather than as a shape mismatch.
    ///
    /// # Errors
    ///
    /// - [`ProtocolError::InvalidFormat`] for non-JSON, non-object input, a
    ///   missing tag, or missing/ill-typed fields
    /// - [`ProtocolError::UnknownType`] for an unrecognized tag
    #[instrument(skip(raw), fields(len = raw.len()))]
    pub fn decode(raw: &[u8]) -> Result<Self, ProtocolError> {
        let value: Value = serde_json::from_slice(raw)
            .map_err(|e| ProtocolError::InvalidFormat(e.to_string()))?;

        let tag = value
            .get("type")
            .and_then(Value::as_str)
            .ok_or_else(|| ProtocolError::InvalidFormat("missing \"type\" field".to_string()))?;
        MessageType::from_str(tag).map_err(|_| ProtocolError::UnknownType(tag.to_string()))?;

        serde_json::from_value(value).map_err(|e| ProtocolError::InvalidFormat(e.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_chat_serializes_flat() {
        let msg = Message::chat("gg", "alice", "g1", true);
        let value: Value = serde_json::from_str(&msg.encode().expect("Encodes")).expect("JSON");
        assert_eq!(value["type"], "chat");
        assert_eq!(value["content"], "gg");
        assert_eq!(value["username"], "alice");
        assert_eq!(value["game_id"], "g1");
        assert_eq!(value["is_private"], true);
        assert!(value.get("data").is_none());
        assert!(value["timestamp"].is_string());
    }

    #[test]
    fn test_constructor_contents() {
        let join = Message::join("bob", "g1", 2);
        assert_eq!(join.content(), "bob joined the game");
        assert_eq!(*join.kind(), MessageKind::Join { player_count: 2 });

        let leave = Message::leave("bob", "g1", 1);
        assert_eq!(leave.content(), "bob left the game");

        let mv = Message::game_move(4, "X", "alice", "g1");
        assert_eq!(mv.content(), "");
        assert_eq!(mv.message_type(), MessageType::GameMove);

        let sys = Message::system("game_over", "alice wins", "g1");
        assert_eq!(sys.username(), SYSTEM_USERNAME);

        let err = Message::error(ErrorCode::UnknownType, "nope", "g1");
        assert_eq!(err.username(), SYSTEM_USERNAME);
    }

    #[test]
    fn test_move_number_travels_in_data() {
        let mv = Message::game_move(2, "X", "alice", "g1").with_move_number(5);
        let value = serde_json::to_value(&mv).expect("Serializable");
        assert_eq!(value["data"], json!({"move_number": 5}));
        assert_eq!(mv.move_number(), Some(5));

        let untagged = Message::game_move(2, "X", "alice", "g1").with_data(json!({"turn": 5}));
        assert_eq!(untagged.move_number(), None);
    }

    #[test]
    fn test_error_code_wire_names() {
        let err = Message::error(ErrorCode::MessageTooLong, "too long", "g1");
        let value = serde_json::to_value(&err).expect("Serializable");
        assert_eq!(value["type"], "error");
        assert_eq!(value["error_code"], "MESSAGE_TOO_LONG");
        assert_eq!(ErrorCode::InvalidMove.to_string(), "INVALID_MOVE");
    }

    #[test]
    fn test_decode_round_trip_every_kind() {
        let originals = [
            Message::chat("hello", "alice", "g9", true),
            Message::join("bob", "g9", 2),
            Message::leave("bob", "g9", 1),
            Message::game_move(7, "O", "bob", "g9").with_move_number(3),
            Message::system("game_over", "Draw", "g9"),
            Message::error(ErrorCode::InvalidMove, "occupied", "g9"),
        ];

        for original in originals {
            let decoded = Message::decode(original.encode().expect("Encodes").as_bytes())
                .expect("Decodes");
            assert_eq!(decoded, original, "{:?}", original.message_type());
        }
    }

    #[test]
    fn test_decode_defaults_missing_base_fields() {
        let decoded = Message::decode(br#"{"type":"chat","content":"hi"}"#).expect("Decodes");
        assert_eq!(*decoded.kind(), MessageKind::Chat { is_private: false });
        assert_eq!(decoded.username(), "");
        assert!(decoded.data().is_none());
    }

    #[test]
    fn test_decode_rejects_non_json() {
        assert!(matches!(
            Message::decode(b"not json"),
            Err(ProtocolError::InvalidFormat(_))
        ));
        assert!(matches!(
            Message::decode(b"[1,2,3]"),
            Err(ProtocolError::InvalidFormat(_))
        ));
    }

    #[test]
    fn test_decode_unknown_tag_before_shape() {
        assert_eq!(
            Message::decode(br#"{"type":"dance"}"#),
            Err(ProtocolError::UnknownType("dance".to_string()))
        );
    }

    #[test]
    fn test_decode_missing_content_is_invalid() {
        assert!(matches!(
            Message::decode(br#"{"type":"chat"}"#),
            Err(ProtocolError::InvalidFormat(_))
        ));
        assert!(matches!(
            Message::decode(br#"{"type":"game_move","content":""}"#),
            Err(ProtocolError::InvalidFormat(_))
        ));
    }

    #[test]
    fn test_stamp_overwrites_client_values() {
        let mut msg = Message::decode(
            br#"{"type":"chat","content":"hi","username":"mallory","game_id":"other","timestamp":"2001-01-01T00:00:00Z"}"#,
        )
        .expect("Decodes");
        let before = Utc::now();
        msg.stamp("alice", "g1");
        assert_eq!(msg.username(), "alice");
        assert_eq!(msg.game_id(), "g1");
        assert!(*msg.timestamp() >= before);
    }

    #[test]
    fn test_client_originated_types() {
        assert!(MessageType::Chat.is_client_originated());
        assert!(MessageType::GameMove.is_client_originated());
        assert!(!MessageType::System.is_client_originated());
        assert!(!MessageType::Error.is_client_originated());
    }
}
