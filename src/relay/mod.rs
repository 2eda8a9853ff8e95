//! The duplex relay: frame classification, per-session state, and the
//! coordinator that runs the two pumps.

pub mod classifier;
mod client;
mod coordinator;
mod session;

pub use classifier::{Disposition, classify};
pub use client::ClientSink;
pub use coordinator::Coordinator;
pub use session::{Session, SessionState};
