//! Owns one client connection from upgrade to teardown.
//!
//! Once the upstream session is open and configured, two pumps run as
//! separate tasks:
//!
//! - inbound: client frames -> classifier -> upstream
//! - outbound: upstream events -> client, verbatim
//!
//! Whichever pump finishes first ends the session. The other is cancelled
//! through a shared [`CancellationToken`] and joined, then the upstream and
//! the client socket are closed.

use std::fmt;
use std::sync::Arc;

use axum::extract::ws::{Message, WebSocket};
use futures::StreamExt;
use futures::stream::{BoxStream, SplitStream};
use tokio::sync::Mutex;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{Instrument, debug, error, info, info_span, warn};

use super::classifier::{Disposition, classify};
use super::client::ClientSink;
use super::session::{Session, SessionState};
use crate::config::RelayConfig;
use crate::protocol::relay_events::RelayEvent;
use crate::protocol::server_events::ServerEvent;
use crate::transport::upstream::{UpstreamConnection, UpstreamEvent, UpstreamSender};
use crate::{Error, Result};

type SharedUpstream = Arc<Mutex<UpstreamSender>>;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Direction {
    Inbound,
    Outbound,
}

impl fmt::Display for Direction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Inbound => "client->upstream",
            Self::Outbound => "upstream->client",
        })
    }
}

/// Why a pump stopped.
#[derive(Debug)]
enum PumpExit {
    ClientClosed,
    UpstreamClosed,
    Cancelled,
    Failed(Error),
}

pub struct Coordinator {
    session: Session,
}

impl Coordinator {
    #[must_use]
    pub fn new(config: Arc<RelayConfig>) -> Self {
        Self {
            session: Session::new(config),
        }
    }

    #[must_use]
    pub const fn session(&self) -> &Session {
        &self.session
    }

    /// Relay `socket` until either side goes away.
    pub async fn run(self, socket: WebSocket) {
        let span = info_span!("session", id = %self.session.id());
        self.drive(socket).instrument(span).await;
    }

    async fn drive(mut self, socket: WebSocket) {
        info!("WebSocket connection established");
        let (sink, stream) = socket.split();
        let client = ClientSink::new(sink);

        let result = self.relay(&client, stream).await;
        self.session.advance(SessionState::Closing);

        if let Err(err) = result {
            error!("WebSocket error: {err}");
            if !client.is_closed() {
                if let Err(e) = client.send_event(&RelayEvent::error(err.to_string())).await {
                    debug!("Could not report error to client: {e}");
                }
            }
        }

        client.close().await;
        self.session.advance(SessionState::Closed);
        info!("WebSocket connection closed");
    }

    async fn relay(&mut self, client: &ClientSink, stream: SplitStream<WebSocket>) -> Result<()> {
        let config = Arc::clone(self.session.config());

        let mut upstream =
            UpstreamConnection::open(&config.upstream_url, &config.api_key, &config.persona.model)
                .await?;
        info!("OpenAI realtime connection established");

        upstream.configure(&config.session_options()).await?;
        info!(voice = %config.persona.voice, "Session configured for audio");

        client
            .send_event(&RelayEvent::session_created(self.session.id()))
            .await?;
        client.send_event(&RelayEvent::SessionUpdated).await?;
        self.session.advance(SessionState::Active);

        let (sender, receiver) = upstream.split();
        let sender = Arc::new(Mutex::new(sender));

        let outcome = self
            .run_pumps(client, stream, Arc::clone(&sender), receiver.into_stream())
            .await;

        sender.lock().await.close().await;
        outcome
    }

    async fn run_pumps(
        &mut self,
        client: &ClientSink,
        stream: SplitStream<WebSocket>,
        upstream: SharedUpstream,
        events: BoxStream<'static, Result<UpstreamEvent>>,
    ) -> Result<()> {
        let cancel = CancellationToken::new();

        let mut inbound: JoinHandle<PumpExit> = tokio::spawn(
            inbound_pump(stream, client.clone(), upstream, cancel.child_token()).in_current_span(),
        );
        let mut outbound: JoinHandle<PumpExit> = tokio::spawn(
            outbound_pump(events, client.clone(), cancel.child_token()).in_current_span(),
        );

        let (finished, joined, loser) = tokio::select! {
            joined = &mut inbound => (Direction::Inbound, joined, outbound),
            joined = &mut outbound => (Direction::Outbound, joined, inbound),
        };

        self.session.advance(SessionState::Closing);
        cancel.cancel();

        let outcome = match joined {
            Ok(PumpExit::Failed(err)) => {
                warn!(pump = %finished, "Pump failed: {err}");
                Err(err)
            }
            Ok(exit) => {
                info!(pump = %finished, ?exit, "Pump finished");
                Ok(())
            }
            Err(err) => Err(Error::Task(err)),
        };

        match loser.await {
            Ok(PumpExit::Cancelled) => debug!("Remaining pump cancelled"),
            Ok(exit) => debug!(?exit, "Remaining pump finished during shutdown"),
            Err(err) if err.is_cancelled() => debug!("Remaining pump aborted"),
            Err(err) => error!("Remaining pump panicked: {err}"),
        }

        outcome
    }
}

async fn inbound_pump(
    stream: SplitStream<WebSocket>,
    client: ClientSink,
    upstream: SharedUpstream,
    cancel: CancellationToken,
) -> PumpExit {
    tokio::select! {
        biased;
        () = cancel.cancelled() => PumpExit::Cancelled,
        exit = drain_client(stream, &client, &upstream) => exit,
    }
}

async fn drain_client(
    mut stream: SplitStream<WebSocket>,
    client: &ClientSink,
    upstream: &SharedUpstream,
) -> PumpExit {
    while let Some(message) = stream.next().await {
        let message = match message {
            Ok(message) => message,
            Err(err) => {
                let err = Error::Client(err);
                if err.is_client_disconnect() {
                    info!("Frontend disconnected: {err}");
                    return PumpExit::ClientClosed;
                }
                return PumpExit::Failed(err);
            }
        };

        match message {
            Message::Text(text) => {
                if let Some(exit) = handle_client_text(text.as_str(), client, upstream).await {
                    return exit;
                }
            }
            Message::Binary(data) => debug!(bytes = data.len(), "Ignoring binary client frame"),
            Message::Close(frame) => {
                info!(?frame, "Frontend closed connection");
                return PumpExit::ClientClosed;
            }
            Message::Ping(_) | Message::Pong(_) => {}
        }
    }
    info!("Frontend stream ended");
    PumpExit::ClientClosed
}

async fn handle_client_text(
    text: &str,
    client: &ClientSink,
    upstream: &SharedUpstream,
) -> Option<PumpExit> {
    match classify(text) {
        Ok(Disposition::Reply(event)) => {
            if client.send_event(&event).await.is_err() {
                return Some(PumpExit::ClientClosed);
            }
        }
        Ok(Disposition::Forward(frame)) => {
            let result = upstream.lock().await.send(&frame).await;
            return forward_exit(result);
        }
        Ok(Disposition::Drop) => {}
        Err(err @ Error::InvalidAudioAlignment(_)) => warn!("Dropping audio chunk: {err}"),
        Err(err @ Error::AudioDecode(_)) => error!("Base64 decode error: {err}"),
        Err(err @ Error::MalformedFrame(_)) => error!("Invalid JSON from frontend: {err}"),
        Err(err) => error!("Error handling frontend message: {err}"),
    }
    None
}

/// A closed upstream ends the inbound pump; any other send failure only
/// loses the frame.
fn forward_exit(result: Result<()>) -> Option<PumpExit> {
    match result {
        Ok(()) => None,
        Err(err) if err.is_transport_closed() => {
            warn!("Upstream closed while forwarding: {err}");
            Some(PumpExit::UpstreamClosed)
        }
        Err(err) => {
            warn!("Error forwarding frame upstream: {err}");
            None
        }
    }
}

async fn outbound_pump(
    events: BoxStream<'static, Result<UpstreamEvent>>,
    client: ClientSink,
    cancel: CancellationToken,
) -> PumpExit {
    tokio::select! {
        biased;
        () = cancel.cancelled() => PumpExit::Cancelled,
        exit = drain_upstream(events, &client) => exit,
    }
}

async fn drain_upstream(
    mut events: BoxStream<'static, Result<UpstreamEvent>>,
    client: &ClientSink,
) -> PumpExit {
    while let Some(item) = events.next().await {
        if client.is_closed() {
            info!("WebSocket closed, stopping OpenAI handler");
            return PumpExit::ClientClosed;
        }

        let UpstreamEvent { event, payload } = match item {
            Ok(event) => event,
            Err(err @ Error::Serialization(_)) => {
                warn!("Skipping unreadable upstream frame: {err}");
                continue;
            }
            Err(err) => return PumpExit::Failed(err),
        };

        debug!(kind = event.kind(), "OpenAI -> Frontend");
        if client.send_text(payload).await.is_err() {
            return PumpExit::ClientClosed;
        }
        log_upstream_event(&event);
    }
    info!("OpenAI event stream ended");
    PumpExit::UpstreamClosed
}

fn log_upstream_event(event: &ServerEvent) {
    match event {
        ServerEvent::InputAudioBufferSpeechStarted { .. } => info!("Speech detection started"),
        ServerEvent::InputAudioBufferSpeechStopped { .. } => info!("Speech detection stopped"),
        ServerEvent::InputAudioTranscriptionCompleted { transcript, .. } => {
            info!("User said: {transcript}");
        }
        ServerEvent::ResponseAudioTranscriptDone { transcript, .. } => {
            info!("Assistant said: {transcript}");
        }
        ServerEvent::ResponseAudioDelta { delta, .. } => {
            debug!(bytes = delta.len(), "Streaming audio to frontend");
        }
        ServerEvent::Error { error } => error!(
            error_type = ?error.error_type,
            code = ?error.code,
            "OpenAI error: {}",
            error.message
        ),
        _ => {}
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio_tungstenite::tungstenite;
    use tokio_tungstenite::tungstenite::error::CapacityError;

    #[test]
    fn forwarded_frame_keeps_the_pump_running() {
        assert!(forward_exit(Ok(())).is_none());
    }

    #[test]
    fn transient_send_failure_keeps_the_pump_running() {
        let err = Error::UpstreamSend(tungstenite::Error::Capacity(
            CapacityError::MessageTooLong {
                size: 20_000_000,
                max_size: 16_777_216,
            },
        ));
        assert!(forward_exit(Err(err)).is_none());
    }

    #[test]
    fn closed_upstream_ends_the_inbound_pump() {
        let err = Error::UpstreamSend(tungstenite::Error::ConnectionClosed);
        assert!(matches!(forward_exit(Err(err)), Some(PumpExit::UpstreamClosed)));
    }
}
