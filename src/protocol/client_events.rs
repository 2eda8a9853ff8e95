use serde::Deserialize;
use serde_json::Value;

use crate::{Error, Result};

pub const PING: &str = "ping";
pub const INPUT_AUDIO_BUFFER_APPEND: &str = "input_audio_buffer.append";
pub const INPUT_AUDIO_BUFFER_COMMIT: &str = "input_audio_buffer.commit";
pub const RESPONSE_CREATE: &str = "response.create";

/// A frame sent by the browser client.
#[derive(Debug, Clone, PartialEq)]
pub enum ClientEvent {
    Ping {
        timestamp: Value,
    },
    InputAudioBufferAppend {
        /// Base64 PCM16. `None` when the field is absent or null.
        audio: Option<String>,
    },
    InputAudioBufferCommit,
    ResponseCreate,
    /// Any other frame; relayed upstream untouched.
    Other {
        kind: Option<String>,
    },
}

#[derive(Deserialize)]
#[serde(tag = "type")]
enum ClientEventRepr {
    #[serde(rename = "ping")]
    Ping {
        #[serde(default = "default_timestamp")]
        timestamp: Value,
    },
    #[serde(rename = "input_audio_buffer.append")]
    InputAudioBufferAppend {
        #[serde(default)]
        audio: Option<String>,
    },
    #[serde(rename = "input_audio_buffer.commit")]
    InputAudioBufferCommit {},
    #[serde(rename = "response.create")]
    ResponseCreate {},
}

fn default_timestamp() -> Value {
    Value::from(0)
}

impl From<ClientEventRepr> for ClientEvent {
    fn from(repr: ClientEventRepr) -> Self {
        match repr {
            ClientEventRepr::Ping { timestamp } => Self::Ping { timestamp },
            ClientEventRepr::InputAudioBufferAppend { audio } => {
                Self::InputAudioBufferAppend { audio }
            }
            ClientEventRepr::InputAudioBufferCommit {} => Self::InputAudioBufferCommit,
            ClientEventRepr::ResponseCreate {} => Self::ResponseCreate,
        }
    }
}

impl ClientEvent {
    /// The declared `type` tag, if any.
    #[must_use]
    pub fn kind(&self) -> Option<&str> {
        match self {
            Self::Ping { .. } => Some(PING),
            Self::InputAudioBufferAppend { .. } => Some(INPUT_AUDIO_BUFFER_APPEND),
            Self::InputAudioBufferCommit => Some(INPUT_AUDIO_BUFFER_COMMIT),
            Self::ResponseCreate => Some(RESPONSE_CREATE),
            Self::Other { kind } => kind.as_deref(),
        }
    }
}

/// A decoded client frame: the typed view plus the JSON object it came from.
#[derive(Debug, Clone, PartialEq)]
pub struct ClientFrame {
    pub event: ClientEvent,
    pub payload: Value,
}

impl ClientFrame {
    /// Decode one text frame from the browser.
    ///
    /// # Errors
    /// Returns `Error::MalformedFrame` if the text is not a JSON object, or if
    /// a recognised frame type carries fields of the wrong shape.
    pub fn parse(text: &str) -> Result<Self> {
        let payload: Value =
            serde_json::from_str(text).map_err(|e| Error::MalformedFrame(e.to_string()))?;
        if !payload.is_object() {
            return Err(Error::MalformedFrame("expected a JSON object".to_string()));
        }

        let event = match ClientEventRepr::deserialize(&payload) {
            Ok(repr) => repr.into(),
            Err(err) => {
                let kind = payload.get("type").and_then(Value::as_str);
                if matches!(
                    kind,
                    Some(PING | INPUT_AUDIO_BUFFER_APPEND | INPUT_AUDIO_BUFFER_COMMIT | RESPONSE_CREATE)
                ) {
                    return Err(Error::MalformedFrame(err.to_string()));
                }
                ClientEvent::Other {
                    kind: kind.map(str::to_string),
                }
            }
        };

        Ok(Self { event, payload })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn ping_without_timestamp_defaults_to_zero() {
        let frame = ClientFrame::parse(r#"{"type":"ping"}"#).unwrap();
        assert_eq!(frame.event, ClientEvent::Ping { timestamp: json!(0) });
    }

    #[test]
    fn unknown_type_keeps_its_tag() {
        let frame = ClientFrame::parse(r#"{"type":"conversation.item.create","item":{}}"#).unwrap();
        assert_eq!(frame.event.kind(), Some("conversation.item.create"));
        assert_eq!(frame.payload["item"], json!({}));
    }

    #[test]
    fn missing_type_is_passthrough() {
        let frame = ClientFrame::parse(r#"{"hello":"world"}"#).unwrap();
        assert_eq!(frame.event, ClientEvent::Other { kind: None });
    }

    #[test]
    fn non_object_is_malformed() {
        assert!(matches!(ClientFrame::parse("[1,2]"), Err(Error::MalformedFrame(_))));
        assert!(matches!(ClientFrame::parse("{oops"), Err(Error::MalformedFrame(_))));
    }

    #[test]
    fn append_with_numeric_audio_is_malformed() {
        let err = ClientFrame::parse(r#"{"type":"input_audio_buffer.append","audio":12}"#).unwrap_err();
        assert!(matches!(err, Error::MalformedFrame(_)));
    }

    #[test]
    fn append_with_null_audio_has_no_audio() {
        let frame = ClientFrame::parse(r#"{"type":"input_audio_buffer.append","audio":null}"#).unwrap();
        assert_eq!(frame.event, ClientEvent::InputAudioBufferAppend { audio: None });
    }
}
