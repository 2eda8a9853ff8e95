//! Shared fixtures: a scripted stand-in for the Realtime API and a running
//! relay server on loopback.

#![allow(dead_code)]

use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use futures::{SinkExt, StreamExt};
use oai_rt_relay::{Persona, RelayConfig, ServerConfig, router};
use serde_json::Value;
use tokio::net::{TcpListener, TcpStream};
use tokio::sync::mpsc;
use tokio_tungstenite::tungstenite::Message;
use tokio_tungstenite::{MaybeTlsStream, WebSocketStream, accept_async, connect_async};

pub const WAIT: Duration = Duration::from_secs(5);

pub type ClientSocket = WebSocketStream<MaybeTlsStream<TcpStream>>;

pub enum UpstreamCommand {
    Send(String),
    Close,
}

/// A fake Realtime endpoint that accepts one connection, records every text
/// frame it receives, and sends whatever the test tells it to.
pub struct MockUpstream {
    pub url: String,
    pub received: mpsc::UnboundedReceiver<Value>,
    pub commands: mpsc::UnboundedSender<UpstreamCommand>,
}

impl MockUpstream {
    pub async fn start() -> Self {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        let (received_tx, received) = mpsc::unbounded_channel();
        let (commands, mut command_rx) = mpsc::unbounded_channel();

        tokio::spawn(async move {
            let (tcp, _) = listener.accept().await.unwrap();
            let mut ws = accept_async(tcp).await.unwrap();
            loop {
                tokio::select! {
                    msg = ws.next() => match msg {
                        Some(Ok(Message::Text(text))) => {
                            let value: Value = serde_json::from_str(text.as_str()).unwrap();
                            let _ = received_tx.send(value);
                        }
                        Some(Ok(Message::Close(_)) | Err(_)) | None => break,
                        Some(Ok(_)) => {}
                    },
                    cmd = command_rx.recv() => match cmd {
                        Some(UpstreamCommand::Send(text)) => {
                            ws.send(Message::Text(text.into())).await.unwrap();
                        }
                        Some(UpstreamCommand::Close) | None => {
                            let _ = ws.close(None).await;
                            // Drain until the relay acknowledges.
                            while let Some(Ok(_)) = ws.next().await {}
                            break;
                        }
                    },
                }
            }
        });

        Self {
            url: format!("ws://{addr}"),
            received,
            commands,
        }
    }

    pub fn send(&self, text: impl Into<String>) {
        self.commands.send(UpstreamCommand::Send(text.into())).unwrap();
    }

    pub fn close(&self) {
        self.commands.send(UpstreamCommand::Close).unwrap();
    }

    /// Next frame the relay forwarded upstream.
    pub async fn next_frame(&mut self) -> Value {
        tokio::time::timeout(WAIT, self.received.recv())
            .await
            .expect("timed out waiting for upstream frame")
            .expect("upstream connection ended")
    }

    /// Wait until the relay's upstream connection is gone.
    pub async fn wait_disconnected(&mut self) {
        tokio::time::timeout(WAIT, async {
            while self.received.recv().await.is_some() {}
        })
        .await
        .expect("upstream connection was not closed");
    }
}

pub fn relay_config(upstream_url: &str) -> RelayConfig {
    RelayConfig {
        api_key: "test-key".to_string(),
        upstream_url: upstream_url.to_string(),
        transcription_model: "whisper-1".to_string(),
        persona: Persona {
            name: "BriAI".to_string(),
            model: "gpt-4o-realtime-preview".to_string(),
            voice: "alloy".to_string(),
            instructions: "You are BriAI, a comedian.".to_string(),
        },
    }
}

pub fn server_config(upstream_url: &str) -> ServerConfig {
    ServerConfig {
        host: "127.0.0.1".to_string(),
        port: 0,
        frontend_dir: PathBuf::from("/nonexistent-frontend"),
        relay: Arc::new(relay_config(upstream_url)),
    }
}

/// Start the relay on an ephemeral port.
pub async fn start_relay(upstream_url: &str) -> SocketAddr {
    let app = router(&server_config(upstream_url));
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });
    addr
}

pub async fn connect_client(addr: SocketAddr) -> ClientSocket {
    let (socket, _) = connect_async(format!("ws://{addr}/ws/realtime")).await.unwrap();
    socket
}

/// Next JSON text frame from the relay, skipping control frames.
pub async fn next_json(client: &mut ClientSocket) -> Value {
    tokio::time::timeout(WAIT, async {
        loop {
            match client.next().await {
                Some(Ok(Message::Text(text))) => {
                    return serde_json::from_str::<Value>(text.as_str()).unwrap();
                }
                Some(Ok(Message::Close(frame))) => panic!("relay closed the socket: {frame:?}"),
                Some(Ok(_)) => {}
                Some(Err(e)) => panic!("client socket error: {e}"),
                None => panic!("client socket ended"),
            }
        }
    })
    .await
    .expect("timed out waiting for relay frame")
}

/// Wait for the relay to close the client socket.
pub async fn expect_closed(client: &mut ClientSocket) {
    tokio::time::timeout(WAIT, async {
        loop {
            match client.next().await {
                Some(Ok(Message::Close(_)) | Err(_)) | None => return,
                Some(Ok(_)) => {}
            }
        }
    })
    .await
    .expect("relay did not close the client socket");
}

/// Every JSON text frame the relay sends until it closes the socket.
pub async fn frames_until_closed(client: &mut ClientSocket) -> Vec<Value> {
    tokio::time::timeout(WAIT, async {
        let mut frames = Vec::new();
        loop {
            match client.next().await {
                Some(Ok(Message::Text(text))) => {
                    frames.push(serde_json::from_str::<Value>(text.as_str()).unwrap());
                }
                Some(Ok(Message::Close(_)) | Err(_)) | None => return frames,
                Some(Ok(_)) => {}
            }
        }
    })
    .await
    .expect("relay did not close the client socket")
}

pub async fn send_json(client: &mut ClientSocket, value: &Value) {
    client
        .send(Message::Text(value.to_string().into()))
        .await
        .unwrap();
}
