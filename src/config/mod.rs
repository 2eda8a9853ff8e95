//! Process configuration.
//!
//! Values come from the environment (with `.env` support in the binary),
//! optionally overridden by command-line flags, and are resolved once at
//! startup into an immutable [`ServerConfig`].

use std::fmt;
use std::path::PathBuf;
use std::sync::Arc;

mod persona;

pub use persona::{DEFAULT_PERSONA, Persona, PersonaCatalog, render_instructions};

use crate::protocol::models::{DEFAULT_TRANSCRIPTION_MODEL, SessionOptions};
use crate::transport::ws::WS_BASE_URL;
use crate::{Error, Result};

pub const DEFAULT_HOST: &str = "localhost";
pub const DEFAULT_PORT: u16 = 8080;
pub const DEFAULT_AGENTS_PATH: &str = "config/agents.yaml";
pub const DEFAULT_FRONTEND_DIR: &str = "frontend";

/// Raw, unvalidated configuration inputs.
#[derive(Debug, Clone, Default)]
pub struct ConfigSources {
    pub api_key: Option<String>,
    pub persona: Option<String>,
    pub agents_path: Option<PathBuf>,
    pub host: Option<String>,
    pub port: Option<String>,
    pub upstream_url: Option<String>,
    pub transcription_model: Option<String>,
    pub frontend_dir: Option<PathBuf>,
}

impl ConfigSources {
    /// Read inputs from the process environment.
    #[must_use]
    pub fn from_env() -> Self {
        let var = |key: &str| std::env::var(key).ok().filter(|v| !v.is_empty());
        Self {
            api_key: var("OPENAI_API_KEY"),
            persona: var("OPENAI_INSTRUCTIONS"),
            agents_path: var("AGENTS_CONFIG").map(PathBuf::from),
            host: var("HOST"),
            port: var("PORT"),
            upstream_url: var("REALTIME_URL"),
            transcription_model: var("TRANSCRIPTION_MODEL"),
            frontend_dir: var("FRONTEND_DIR").map(PathBuf::from),
        }
    }
}

/// Everything a relay session needs. Shared read-only across sessions.
#[derive(Clone)]
pub struct RelayConfig {
    pub api_key: String,
    pub upstream_url: String,
    pub transcription_model: String,
    pub persona: Persona,
}

impl RelayConfig {
    #[must_use]
    pub fn session_options(&self) -> SessionOptions {
        SessionOptions::new(
            self.persona.voice.clone(),
            self.persona.instructions.clone(),
            self.transcription_model.clone(),
        )
    }
}

impl fmt::Debug for RelayConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RelayConfig")
            .field("api_key", &"<redacted>")
            .field("upstream_url", &self.upstream_url)
            .field("transcription_model", &self.transcription_model)
            .field("persona", &self.persona.name)
            .finish()
    }
}

#[derive(Debug, Clone)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
    pub frontend_dir: PathBuf,
    pub relay: Arc<RelayConfig>,
}

impl ServerConfig {
    /// # Errors
    /// See [`ServerConfig::from_sources`].
    pub fn from_env() -> Result<Self> {
        Self::from_sources(ConfigSources::from_env())
    }

    /// Validate inputs and load the selected persona.
    ///
    /// # Errors
    /// Returns `Error::Config` if the API key is missing, the port is not a
    /// number, or the persona cannot be resolved.
    pub fn from_sources(sources: ConfigSources) -> Result<Self> {
        let api_key = sources
            .api_key
            .ok_or_else(|| Error::Config("OPENAI_API_KEY environment variable is required".to_string()))?;

        let port = match sources.port {
            Some(raw) => raw
                .parse::<u16>()
                .map_err(|e| Error::Config(format!("Invalid port '{raw}': {e}")))?,
            None => DEFAULT_PORT,
        };

        let persona_id = sources.persona.unwrap_or_else(|| {
            tracing::warn!(
                "OPENAI_INSTRUCTIONS not set. Falling back to default agent '{DEFAULT_PERSONA}'"
            );
            DEFAULT_PERSONA.to_string()
        });
        let agents_path = sources
            .agents_path
            .unwrap_or_else(|| PathBuf::from(DEFAULT_AGENTS_PATH));
        let persona = PersonaCatalog::from_file(&agents_path)?.persona(&persona_id)?;

        tracing::info!(agent = %persona.name, model = %persona.model, voice = %persona.voice, "Loaded agent");

        let relay = RelayConfig {
            api_key,
            upstream_url: sources.upstream_url.unwrap_or_else(|| WS_BASE_URL.to_string()),
            transcription_model: sources
                .transcription_model
                .unwrap_or_else(|| DEFAULT_TRANSCRIPTION_MODEL.to_string()),
            persona,
        };

        Ok(Self {
            host: sources.host.unwrap_or_else(|| DEFAULT_HOST.to_string()),
            port,
            frontend_dir: sources
                .frontend_dir
                .unwrap_or_else(|| PathBuf::from(DEFAULT_FRONTEND_DIR)),
            relay: Arc::new(relay),
        })
    }

    #[must_use]
    pub fn address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}
