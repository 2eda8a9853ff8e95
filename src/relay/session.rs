use std::fmt;
use std::sync::Arc;

use uuid::Uuid;

use crate::config::RelayConfig;

/// Lifecycle of one relay session. Only moves forward.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum SessionState {
    Connecting,
    Active,
    Closing,
    Closed,
}

impl fmt::Display for SessionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Connecting => "connecting",
            Self::Active => "active",
            Self::Closing => "closing",
            Self::Closed => "closed",
        };
        f.write_str(name)
    }
}

/// One client connection's relay record.
#[derive(Debug)]
pub struct Session {
    id: String,
    state: SessionState,
    config: Arc<RelayConfig>,
}

impl Session {
    #[must_use]
    pub fn new(config: Arc<RelayConfig>) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            state: SessionState::Connecting,
            config,
        }
    }

    #[must_use]
    pub fn id(&self) -> &str {
        &self.id
    }

    #[must_use]
    pub const fn state(&self) -> SessionState {
        self.state
    }

    #[must_use]
    pub const fn config(&self) -> &Arc<RelayConfig> {
        &self.config
    }

    /// Move to `next`; returns false (and changes nothing) if that would go
    /// backwards or stay put.
    pub fn advance(&mut self, next: SessionState) -> bool {
        if next <= self.state {
            return false;
        }
        tracing::debug!(from = %self.state, to = %next, "Session state change");
        self.state = next;
        true
    }
}
