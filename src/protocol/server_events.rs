use serde::Deserialize;
use serde_json::Value;

use crate::error::ServerError;

/// An event received from the Realtime API.
///
/// Only the kinds the relay inspects are typed; everything else lands in
/// `Other` with its full payload. The relay never re-serializes these, it
/// forwards the original text.
#[derive(Debug, Clone, PartialEq)]
pub enum ServerEvent {
    SessionCreated {
        session: Value,
    },
    SessionUpdated {
        session: Value,
    },
    InputAudioBufferSpeechStarted {
        audio_start_ms: Option<u64>,
        item_id: Option<String>,
    },
    InputAudioBufferSpeechStopped {
        audio_end_ms: Option<u64>,
        item_id: Option<String>,
    },
    InputAudioTranscriptionCompleted {
        item_id: Option<String>,
        transcript: String,
    },
    ResponseAudioTranscriptDone {
        response_id: Option<String>,
        transcript: String,
    },
    ResponseAudioDelta {
        response_id: Option<String>,
        delta: String,
    },
    Error {
        error: ServerError,
    },
    Other(Value),
}

#[derive(Deserialize)]
#[serde(tag = "type")]
enum ServerEventRepr {
    #[serde(rename = "session.created")]
    SessionCreated {
        #[serde(default)]
        session: Value,
    },
    #[serde(rename = "session.updated")]
    SessionUpdated {
        #[serde(default)]
        session: Value,
    },
    #[serde(rename = "input_audio_buffer.speech_started")]
    InputAudioBufferSpeechStarted {
        audio_start_ms: Option<u64>,
        item_id: Option<String>,
    },
    #[serde(rename = "input_audio_buffer.speech_stopped")]
    InputAudioBufferSpeechStopped {
        audio_end_ms: Option<u64>,
        item_id: Option<String>,
    },
    #[serde(rename = "conversation.item.input_audio_transcription.completed")]
    InputAudioTranscriptionCompleted {
        item_id: Option<String>,
        transcript: String,
    },
    #[serde(
        rename = "response.audio_transcript.done",
        alias = "response.output_audio_transcript.done"
    )]
    ResponseAudioTranscriptDone {
        response_id: Option<String>,
        transcript: String,
    },
    #[serde(rename = "response.audio.delta", alias = "response.output_audio.delta")]
    ResponseAudioDelta {
        response_id: Option<String>,
        delta: String,
    },
    #[serde(rename = "error")]
    Error { error: ServerError },
}

impl From<ServerEventRepr> for ServerEvent {
    fn from(repr: ServerEventRepr) -> Self {
        match repr {
            ServerEventRepr::SessionCreated { session } => Self::SessionCreated { session },
            ServerEventRepr::SessionUpdated { session } => Self::SessionUpdated { session },
            ServerEventRepr::InputAudioBufferSpeechStarted { audio_start_ms, item_id } => {
                Self::InputAudioBufferSpeechStarted { audio_start_ms, item_id }
            }
            ServerEventRepr::InputAudioBufferSpeechStopped { audio_end_ms, item_id } => {
                Self::InputAudioBufferSpeechStopped { audio_end_ms, item_id }
            }
            ServerEventRepr::InputAudioTranscriptionCompleted { item_id, transcript } => {
                Self::InputAudioTranscriptionCompleted { item_id, transcript }
            }
            ServerEventRepr::ResponseAudioTranscriptDone { response_id, transcript } => {
                Self::ResponseAudioTranscriptDone { response_id, transcript }
            }
            ServerEventRepr::ResponseAudioDelta { response_id, delta } => {
                Self::ResponseAudioDelta { response_id, delta }
            }
            ServerEventRepr::Error { error } => Self::Error { error },
        }
    }
}

impl<'de> Deserialize<'de> for ServerEvent {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        let value = Value::deserialize(deserializer)?;
        match ServerEventRepr::deserialize(&value) {
            Ok(repr) => Ok(repr.into()),
            Err(err) => {
                tracing::trace!("Untyped server event: {err}");
                Ok(Self::Other(value))
            }
        }
    }
}

impl ServerEvent {
    /// The event's `type` tag.
    #[must_use]
    pub fn kind(&self) -> &str {
        match self {
            Self::SessionCreated { .. } => "session.created",
            Self::SessionUpdated { .. } => "session.updated",
            Self::InputAudioBufferSpeechStarted { .. } => "input_audio_buffer.speech_started",
            Self::InputAudioBufferSpeechStopped { .. } => "input_audio_buffer.speech_stopped",
            Self::InputAudioTranscriptionCompleted { .. } => {
                "conversation.item.input_audio_transcription.completed"
            }
            Self::ResponseAudioTranscriptDone { .. } => "response.audio_transcript.done",
            Self::ResponseAudioDelta { .. } => "response.audio.delta",
            Self::Error { .. } => "error",
            Self::Other(value) => value.get("type").and_then(Value::as_str).unwrap_or("unknown"),
        }
    }
}
