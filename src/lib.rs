#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::module_name_repetitions)]
#![allow(clippy::multiple_crate_versions)]

//! Bidirectional relay between a browser voice client and the `OpenAI`
//! Realtime API.
//!
//! Each client WebSocket gets its own upstream Realtime session. Client
//! frames are classified and forwarded upstream, upstream events are relayed
//! back verbatim, and a failure on either side closes both.

pub mod config;
pub mod error;
pub mod protocol;
pub mod relay;
pub mod server;
pub mod transport;

pub use config::{ConfigSources, Persona, PersonaCatalog, RelayConfig, ServerConfig};
pub use error::{Error, Result, ServerError};
pub use protocol::client_events::{ClientEvent, ClientFrame};
pub use protocol::models::{SessionOptions, TurnDetection};
pub use protocol::relay_events::RelayEvent;
pub use protocol::server_events::ServerEvent;
pub use relay::{ClientSink, Coordinator, Disposition, Session, SessionState, classify};
pub use server::{AppState, api_router, router};
pub use transport::upstream::{UpstreamConnection, UpstreamEvent, UpstreamReceiver, UpstreamSender};
