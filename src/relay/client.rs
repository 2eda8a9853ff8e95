use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use axum::extract::ws::{Message, WebSocket};
use futures::SinkExt;
use futures::stream::SplitSink;
use tokio::sync::Mutex;

use crate::protocol::relay_events::RelayEvent;
use crate::{Error, Result};

/// The write half of the client socket, shared by both pumps.
///
/// Once a send fails or [`ClientSink::close`] runs, the sink reports itself
/// closed and every later send fails with `Error::ClientDisconnected`.
#[derive(Clone)]
pub struct ClientSink {
    inner: Arc<Mutex<SplitSink<WebSocket, Message>>>,
    closed: Arc<AtomicBool>,
}

impl ClientSink {
    #[must_use]
    pub fn new(sink: SplitSink<WebSocket, Message>) -> Self {
        Self {
            inner: Arc::new(Mutex::new(sink)),
            closed: Arc::new(AtomicBool::new(false)),
        }
    }

    #[must_use]
    pub fn is_closed(&self) -> bool {
        self.closed.load(Ordering::Acquire)
    }

    /// # Errors
    /// Returns an error if serialization fails or the client is gone.
    pub async fn send_event(&self, event: &RelayEvent) -> Result<()> {
        let json = serde_json::to_string(event)?;
        self.send_text(json).await
    }

    /// # Errors
    /// Returns `Error::ClientDisconnected` if the client is gone.
    pub async fn send_text(&self, text: String) -> Result<()> {
        if self.is_closed() {
            return Err(Error::ClientDisconnected);
        }
        let mut sink = self.inner.lock().await;
        if let Err(e) = sink.send(Message::Text(text.into())).await {
            tracing::debug!("Client send failed: {e}");
            self.closed.store(true, Ordering::Release);
            return Err(Error::ClientDisconnected);
        }
        Ok(())
    }

    /// Send a close frame and shut the socket. Safe to call more than once.
    pub async fn close(&self) {
        if self.closed.swap(true, Ordering::AcqRel) {
            return;
        }
        let mut sink = self.inner.lock().await;
        if let Err(e) = sink.send(Message::Close(None)).await {
            tracing::debug!("Client close frame not delivered: {e}");
        }
        if let Err(e) = sink.close().await {
            tracing::debug!("Client socket did not close cleanly: {e}");
        }
    }
}
