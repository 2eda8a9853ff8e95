use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Frames the relay writes to the browser on its own behalf.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(tag = "type")]
pub enum RelayEvent {
    #[serde(rename = "pong")]
    Pong { timestamp: Value },
    #[serde(rename = "session.created")]
    SessionCreated { session: SessionRef },
    #[serde(rename = "session.updated")]
    SessionUpdated,
    #[serde(rename = "error")]
    Error { error: ErrorDetail },
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct SessionRef {
    pub id: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ErrorDetail {
    pub message: String,
}

impl RelayEvent {
    #[must_use]
    pub fn session_created(id: impl Into<String>) -> Self {
        Self::SessionCreated {
            session: SessionRef { id: id.into() },
        }
    }

    #[must_use]
    pub fn error(message: impl Into<String>) -> Self {
        Self::Error {
            error: ErrorDetail {
                message: message.into(),
            },
        }
    }
}
