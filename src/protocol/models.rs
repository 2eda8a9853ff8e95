use serde::{Deserialize, Serialize};

pub const DEFAULT_MODEL: &str = "gpt-4o-realtime-preview";
pub const DEFAULT_TRANSCRIPTION_MODEL: &str = "whisper-1";

/// Server VAD tuning. Lower threshold and shorter padding/silence than the
/// API defaults, favouring responsiveness over false-trigger suppression.
pub const VAD_THRESHOLD: f32 = 0.5;
pub const VAD_PREFIX_PADDING_MS: u32 = 200;
pub const VAD_SILENCE_DURATION_MS: u32 = 800;

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum Modality {
    Text,
    Audio,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "snake_case")]
pub enum AudioFormat {
    #[default]
    Pcm16,
    G711Ulaw,
    G711Alaw,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct InputAudioTranscription {
    pub model: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum TurnDetection {
    ServerVad {
        threshold: f32,
        prefix_padding_ms: u32,
        silence_duration_ms: u32,
    },
}

impl TurnDetection {
    #[must_use]
    pub const fn responsive() -> Self {
        Self::ServerVad {
            threshold: VAD_THRESHOLD,
            prefix_padding_ms: VAD_PREFIX_PADDING_MS,
            silence_duration_ms: VAD_SILENCE_DURATION_MS,
        }
    }
}

/// The one-time `session.update` payload sent after the upstream opens.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct SessionOptions {
    pub modalities: Vec<Modality>,
    pub voice: String,
    pub instructions: String,
    pub input_audio_format: AudioFormat,
    pub output_audio_format: AudioFormat,
    pub input_audio_transcription: InputAudioTranscription,
    pub turn_detection: TurnDetection,
}

impl SessionOptions {
    #[must_use]
    pub fn new(
        voice: impl Into<String>,
        instructions: impl Into<String>,
        transcription_model: impl Into<String>,
    ) -> Self {
        Self {
            modalities: vec![Modality::Text, Modality::Audio],
            voice: voice.into(),
            instructions: instructions.into(),
            input_audio_format: AudioFormat::Pcm16,
            output_audio_format: AudioFormat::Pcm16,
            input_audio_transcription: InputAudioTranscription {
                model: transcription_model.into(),
            },
            turn_detection: TurnDetection::responsive(),
        }
    }
}

/// Commands the relay originates towards the upstream (everything else it
/// sends upstream is a forwarded client frame).
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum UpstreamCommand {
    #[serde(rename = "session.update")]
    SessionUpdate { session: Box<SessionOptions> },
}
