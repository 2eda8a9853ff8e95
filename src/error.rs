use serde::{Deserialize, Serialize};
use thiserror::Error;
use tokio_tungstenite::tungstenite;
use tokio_tungstenite::tungstenite::error::ProtocolError;

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "snake_case")]
pub enum ApiErrorType {
    InvalidRequestError,
    RateLimitError,
    AuthenticationError,
    ServerError,
    #[default]
    #[serde(other)]
    Unknown,
}

/// Error payload carried by an upstream `error` event.
#[derive(Debug, Clone, Deserialize, Serialize, PartialEq, Eq)]
pub struct ServerError {
    #[serde(rename = "type", default)]
    pub error_type: ApiErrorType,
    pub code: Option<String>,
    #[serde(default)]
    pub message: String,
    pub param: Option<String>,
    pub event_id: Option<String>,
}

#[derive(Error, Debug)]
pub enum Error {
    #[error("WebSocket error: {0}")]
    WebSocket(#[from] tungstenite::Error),

    #[error("Client WebSocket error: {0}")]
    Client(#[from] axum::Error),

    #[error("Failed to parse or serialize JSON: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Invalid URL: {0}")]
    Url(#[from] url::ParseError),

    #[error("Header error: {0}")]
    Header(#[from] tungstenite::http::header::InvalidHeaderValue),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Invalid YAML configuration: {0}")]
    Yaml(#[from] serde_yaml::Error),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Malformed client frame: {0}")]
    MalformedFrame(String),

    #[error("Audio payload is not valid base64: {0}")]
    AudioDecode(#[from] base64::DecodeError),

    #[error("Invalid audio data length: {0} bytes (not PCM16)")]
    InvalidAudioAlignment(usize),

    #[error("Realtime upstream unavailable: {0}")]
    UpstreamUnavailable(String),

    #[error("Failed to send frame upstream: {0}")]
    UpstreamSend(#[source] tungstenite::Error),

    #[error("The client disconnected")]
    ClientDisconnected,

    #[error("Relay task failed: {0}")]
    Task(#[from] tokio::task::JoinError),
}

impl Error {
    /// True when a send failed because the upstream socket is gone rather
    /// than because of a single bad frame.
    #[must_use]
    pub const fn is_transport_closed(&self) -> bool {
        match self {
            Self::UpstreamSend(err) => is_connection_gone(err),
            _ => false,
        }
    }

    /// True when the client went away, with or without a closing handshake.
    ///
    /// Protocol violations by the client are not disconnects.
    #[must_use]
    pub fn is_client_disconnect(&self) -> bool {
        match self {
            Self::ClientDisconnected => true,
            Self::Client(err) => {
                let mut source = std::error::Error::source(err);
                while let Some(cause) = source {
                    if let Some(ws) = cause.downcast_ref::<tungstenite::Error>() {
                        return is_connection_gone(ws);
                    }
                    if cause.is::<std::io::Error>() {
                        return true;
                    }
                    source = cause.source();
                }
                false
            }
            _ => false,
        }
    }
}

const fn is_connection_gone(err: &tungstenite::Error) -> bool {
    matches!(
        err,
        tungstenite::Error::ConnectionClosed
            | tungstenite::Error::AlreadyClosed
            | tungstenite::Error::Io(_)
            | tungstenite::Error::Protocol(ProtocolError::ResetWithoutClosingHandshake)
    )
}

pub type Result<T> = std::result::Result<T, Error>;
