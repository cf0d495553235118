use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::WebSocketError;

/// Value of the `event` field that marks a typing notification.
pub const TYPING_EVENT: &str = "typing";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChatMessage {
    pub sender: String,
    pub receiver: String,
    pub content: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TypingEvent {
    pub sender: String,
    pub receiver: String,
}

/// One decoded inbound frame.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum InboundEvent {
    Chat(ChatMessage),
    Typing(TypingEvent),
}

impl InboundEvent {
    /// Parses a text frame and classifies it once.
    ///
    /// A JSON object whose `event` field is the string `"typing"` must carry `sender` and
    /// `receiver`. Anything else must carry `sender`, `receiver` and `content`. Extra fields
    /// are ignored.
    pub fn decode(frame: &str) -> Result<Self, WebSocketError> {
        let value: Value = serde_json::from_str(frame)
            .map_err(|e| WebSocketError::Decode(e.to_string()))?;

        if !value.is_object() {
            return Err(WebSocketError::Decode("expected a JSON object".to_string()));
        }

        let is_typing = value.get("event").and_then(Value::as_str) == Some(TYPING_EVENT);
        let event = if is_typing {
            InboundEvent::Typing(serde_json::from_value(value).map_err(decode_error)?)
        } else {
            InboundEvent::Chat(serde_json::from_value(value).map_err(decode_error)?)
        };
        Ok(event)
    }

    pub fn sender(&self) -> &str {
        match self {
            InboundEvent::Chat(msg) => &msg.sender,
            InboundEvent::Typing(evt) => &evt.sender,
        }
    }

    pub fn receiver(&self) -> &str {
        match self {
            InboundEvent::Chat(msg) => &msg.receiver,
            InboundEvent::Typing(evt) => &evt.receiver,
        }
    }

    /// The plain text frame written to the receiver.
    pub fn outbound_text(&self) -> String {
        match self {
            InboundEvent::Chat(msg) => format!("{}: {}", msg.sender, msg.content),
            InboundEvent::Typing(evt) => format!("{} is typing...", evt.sender),
        }
    }
}

fn decode_error(err: serde_json::Error) -> WebSocketError {
    WebSocketError::Decode(err.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_decode_chat_message() {
        let event =
            InboundEvent::decode(r#"{"sender":"alice","receiver":"bob","content":"hi"}"#).unwrap();
        assert_eq!(
            event,
            InboundEvent::Chat(ChatMessage {
                sender: "alice".into(),
                receiver: "bob".into(),
                content: "hi".into(),
            })
        );
        assert_eq!(event.outbound_text(), "alice: hi");
        assert_eq!(event.receiver(), "bob");
    }

    #[test]
    fn test_decode_typing_event() {
        let event =
            InboundEvent::decode(r#"{"sender":"alice","receiver":"bob","event":"typing"}"#)
                .unwrap();
        assert!(matches!(event, InboundEvent::Typing(_)));
        assert_eq!(event.sender(), "alice");
        assert_eq!(event.outbound_text(), "alice is typing...");
    }

    #[test]
    fn test_typing_event_ignores_content() {
        let event = InboundEvent::decode(
            r#"{"sender":"a","receiver":"b","event":"typing","content":"ignored"}"#,
        )
        .unwrap();
        assert_eq!(event.outbound_text(), "a is typing...");
    }

    #[test]
    fn test_other_event_values_are_chat() {
        let event = InboundEvent::decode(
            r#"{"sender":"a","receiver":"b","event":"stopped","content":"x"}"#,
        )
        .unwrap();
        assert_eq!(event.outbound_text(), "a: x");

        // A non-string discriminator is not "typing" either
        let event =
            InboundEvent::decode(r#"{"sender":"a","receiver":"b","event":1,"content":"y"}"#)
                .unwrap();
        assert!(matches!(event, InboundEvent::Chat(_)));
    }

    #[test]
    fn test_chat_without_content_is_rejected() {
        let err = InboundEvent::decode(r#"{"sender":"a","receiver":"b","event":"stopped"}"#)
            .unwrap_err();
        assert!(matches!(err, WebSocketError::Decode(_)));
    }

    #[test]
    fn test_typing_without_receiver_is_rejected() {
        let err = InboundEvent::decode(r#"{"sender":"a","event":"typing"}"#).unwrap_err();
        assert!(matches!(err, WebSocketError::Decode(_)));
    }

    #[test]
    fn test_malformed_frames_are_rejected() {
        let frames = [
            "not json",
            "[1,2,3]",
            "\"hello\"",
            "null",
            r#"{"sender":"a","receiver":"b","content":5}"#,
        ];
        for frame in frames {
            assert!(
                matches!(InboundEvent::decode(frame), Err(WebSocketError::Decode(_))),
                "frame should not decode: {}",
                frame
            );
        }
    }
}
