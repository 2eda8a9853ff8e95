//! Inbound client frame classification.

use base64::Engine as _;
use base64::engine::general_purpose;
use serde_json::{Value, json};
use tracing::{debug, info, warn};

use crate::protocol::client_events::{ClientEvent, ClientFrame, INPUT_AUDIO_BUFFER_APPEND};
use crate::protocol::relay_events::RelayEvent;
use crate::{Error, Result};

/// Chunks outside this band are unusual but still forwarded.
pub const MIN_AUDIO_CHUNK_BYTES: usize = 64;
pub const MAX_AUDIO_CHUNK_BYTES: usize = 8192;

/// What the inbound pump should do with one client frame.
#[derive(Debug, Clone, PartialEq)]
pub enum Disposition {
    /// Answer the client directly; nothing goes upstream.
    Reply(RelayEvent),
    /// Send this frame upstream.
    Forward(Value),
    /// Nothing to do.
    Drop,
}

/// Classify one text frame from the client.
///
/// # Errors
/// - `Error::MalformedFrame` if the text is not a usable JSON object.
/// - `Error::AudioDecode` if an audio chunk is not valid base64.
/// - `Error::InvalidAudioAlignment` if a decoded chunk has an odd length.
pub fn classify(text: &str) -> Result<Disposition> {
    let ClientFrame { event, payload } = ClientFrame::parse(text)?;
    debug!(kind = event.kind().unwrap_or("unknown"), "Client -> upstream");

    match event {
        ClientEvent::Ping { timestamp } => Ok(Disposition::Reply(RelayEvent::Pong { timestamp })),
        ClientEvent::InputAudioBufferAppend { audio } => match audio.as_deref() {
            None | Some("") => {
                warn!("Received input_audio_buffer.append with no audio data");
                Ok(Disposition::Drop)
            }
            Some(encoded) => classify_audio(encoded),
        },
        ClientEvent::InputAudioBufferCommit => {
            info!("Committing audio buffer");
            Ok(Disposition::Forward(payload))
        }
        ClientEvent::ResponseCreate => {
            info!("Creating response");
            Ok(Disposition::Forward(payload))
        }
        ClientEvent::Other { .. } => Ok(Disposition::Forward(payload)),
    }
}

fn classify_audio(encoded: &str) -> Result<Disposition> {
    let pcm = decode_pcm16(encoded)?;
    if !(MIN_AUDIO_CHUNK_BYTES..=MAX_AUDIO_CHUNK_BYTES).contains(&pcm.len()) {
        debug!(bytes = pcm.len(), "Unusual audio chunk size");
    }
    debug!(bytes = pcm.len(), "Decoded audio chunk");

    Ok(Disposition::Forward(json!({
        "type": INPUT_AUDIO_BUFFER_APPEND,
        "audio": general_purpose::STANDARD.encode(&pcm),
    })))
}

/// Decode a base64 PCM16 chunk, rejecting odd byte counts.
///
/// # Errors
/// Returns `Error::AudioDecode` or `Error::InvalidAudioAlignment`.
pub fn decode_pcm16(encoded: &str) -> Result<Vec<u8>> {
    let pcm = general_purpose::STANDARD.decode(encoded)?;
    if pcm.len() % 2 != 0 {
        return Err(Error::InvalidAudioAlignment(pcm.len()));
    }
    Ok(pcm)
}
