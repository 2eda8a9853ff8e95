//! Connection to the Realtime API for one relay session.

use std::borrow::Cow;

use futures::stream::{BoxStream, SplitSink, SplitStream};
use futures::{SinkExt, StreamExt};
use serde_json::Value;
use tokio_tungstenite::tungstenite::{self, protocol::Message};

use super::ws::{self, WsStream};
use crate::protocol::models::{SessionOptions, UpstreamCommand};
use crate::protocol::server_events::ServerEvent;
use crate::{Error, Result};

const TRACE_LOG_MAX_BYTES: usize = 1024;
const TRACE_TRUNCATE_SUFFIX: &str = "... (truncated)";

/// One upstream event: the typed view used for logging, plus the exact text
/// that is relayed to the client.
#[derive(Debug, Clone)]
pub struct UpstreamEvent {
    pub event: ServerEvent,
    pub payload: String,
}

impl UpstreamEvent {
    /// Decode one text frame from the upstream.
    ///
    /// # Errors
    /// Returns an error if the text is not JSON.
    pub fn parse(payload: impl Into<String>) -> Result<Self> {
        let payload = payload.into();
        let event = serde_json::from_str::<ServerEvent>(&payload)?;
        Ok(Self { event, payload })
    }

    #[must_use]
    pub fn kind(&self) -> &str {
        self.event.kind()
    }
}

/// An open, not yet split, upstream session.
#[must_use]
pub struct UpstreamConnection {
    stream: WsStream,
}

impl UpstreamConnection {
    /// Open a Realtime session for `model`.
    ///
    /// # Errors
    /// Returns `Error::UpstreamUnavailable` if the service rejects the
    /// handshake or cannot be reached.
    pub async fn open(base_url: &str, api_key: &str, model: &str) -> Result<Self> {
        let stream = ws::connect(base_url, api_key, model)
            .await
            .map_err(|e| Error::UpstreamUnavailable(e.to_string()))?;
        Ok(Self { stream })
    }

    /// Send the one-time `session.update`.
    ///
    /// # Errors
    /// Returns `Error::UpstreamUnavailable` if the update cannot be delivered.
    pub async fn configure(&mut self, options: &SessionOptions) -> Result<()> {
        let command = UpstreamCommand::SessionUpdate {
            session: Box::new(options.clone()),
        };
        let json = serde_json::to_string(&command)?;
        tracing::trace!("Sending session update: {}", safe_truncate(&json, TRACE_LOG_MAX_BYTES));
        self.stream
            .send(Message::Text(json.into()))
            .await
            .map_err(|e| Error::UpstreamUnavailable(format!("session update failed: {e}")))
    }

    /// Split into independently owned send and receive halves.
    pub fn split(self) -> (UpstreamSender, UpstreamReceiver) {
        let (write, read) = self.stream.split();
        (UpstreamSender { write, closed: false }, UpstreamReceiver { read })
    }
}

/// The sending half of an upstream session.
pub struct UpstreamSender {
    write: SplitSink<WsStream, Message>,
    closed: bool,
}

impl UpstreamSender {
    /// Forward one frame upstream.
    ///
    /// # Errors
    /// Returns `Error::UpstreamSend` on transport failure; check
    /// [`Error::is_transport_closed`] to tell a dead socket from a one-off.
    pub async fn send(&mut self, frame: &Value) -> Result<()> {
        if self.closed {
            return Err(Error::UpstreamSend(tungstenite::Error::AlreadyClosed));
        }
        let json = serde_json::to_string(frame)?;
        tracing::trace!("Sending frame: {}", safe_truncate(&json, TRACE_LOG_MAX_BYTES));
        self.write
            .send(Message::Text(json.into()))
            .await
            .map_err(Error::UpstreamSend)
    }

    #[must_use]
    pub const fn is_closed(&self) -> bool {
        self.closed
    }

    /// Release the upstream session. Safe to call more than once.
    pub async fn close(&mut self) {
        if self.closed {
            return;
        }
        self.closed = true;
        if let Err(e) = self.write.close().await {
            tracing::debug!("Upstream close did not complete cleanly: {e}");
        } else {
            tracing::info!("Upstream connection closed");
        }
    }
}

/// The receiving half of an upstream session.
pub struct UpstreamReceiver {
    read: SplitStream<WsStream>,
}

impl UpstreamReceiver {
    /// Lazy stream of upstream events that ends when the socket closes.
    ///
    /// Transport failures and non-JSON text frames are yielded as errors so
    /// the consumer can decide which are fatal.
    #[must_use]
    pub fn into_stream(self) -> BoxStream<'static, Result<UpstreamEvent>> {
        self.read
            .map(|res| res.map_err(Error::from))
            .filter_map(|res| async move {
                match res {
                    Ok(Message::Text(text)) => {
                        tracing::trace!(
                            "Received event: {}",
                            safe_truncate(text.as_str(), TRACE_LOG_MAX_BYTES)
                        );
                        Some(UpstreamEvent::parse(text.as_str()))
                    }
                    Ok(Message::Close(frame)) => {
                        tracing::info!(?frame, "WebSocket connection closed by server");
                        None
                    }
                    Ok(_) => None,
                    Err(e) => Some(Err(e)),
                }
            })
            .boxed()
    }
}

fn safe_truncate(s: &str, max_bytes: usize) -> Cow<'_, str> {
    if s.len() <= max_bytes {
        return Cow::Borrowed(s);
    }

    let mut end = max_bytes;
    while end > 0 && !s.is_char_boundary(end) {
        end -= 1;
    }
    Cow::Owned(format!(
        "{} {} {} bytes",
        &s[..end],
        TRACE_TRUNCATE_SUFFIX,
        s.len() - end
    ))
}
