//! Wire types for both sides of the relay.
//!
//! `client_events` and `relay_events` describe the browser protocol,
//! `server_events` and `models` describe the Realtime API protocol.

pub mod client_events;
pub mod models;
pub mod relay_events;
pub mod server_events;
