//! Persona catalog loaded from YAML.
//!
//! ```yaml
//! agents:
//!   comedy_performer:
//!     name: "BriAI"
//!     model: "gpt-4o-realtime-preview"
//!     voice: "alloy"
//!     instructions: |
//!       You are BriAI, a stand-up comedian. It is {current_datetime}.
//! ```

use std::collections::BTreeMap;
use std::path::Path;

use chrono::{DateTime, FixedOffset, Utc};
use serde::Deserialize;

use crate::{Error, Result};

pub const DEFAULT_PERSONA: &str = "comedy_performer";

const DATETIME_PLACEHOLDER: &str = "{current_datetime}";
const DATETIME_FORMAT: &str = "%Y-%m-%d %H:%M:%S";
/// Instructions are stamped in Mountain Time (fixed UTC-6, no DST).
const MOUNTAIN_OFFSET_SECS: i32 = 6 * 3600;

/// A fully resolved persona. Immutable once built.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Persona {
    pub name: String,
    pub model: String,
    pub voice: String,
    pub instructions: String,
}

#[derive(Debug, Clone, Deserialize)]
struct PersonaEntry {
    name: String,
    model: String,
    voice: String,
    instructions: String,
}

#[derive(Debug, Clone, Deserialize, Default)]
pub struct PersonaCatalog {
    #[serde(default)]
    agents: BTreeMap<String, PersonaEntry>,
}

impl PersonaCatalog {
    /// # Errors
    /// Returns an error if the file is missing or is not valid YAML.
    pub fn from_file(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Err(Error::Config(format!(
                "Agent configuration file not found: {}",
                path.display()
            )));
        }
        let contents = std::fs::read_to_string(path)?;
        Self::from_yaml_str(&contents)
    }

    /// # Errors
    /// Returns an error if `yaml` does not describe a catalog.
    pub fn from_yaml_str(yaml: &str) -> Result<Self> {
        Ok(serde_yaml::from_str(yaml)?)
    }

    pub fn ids(&self) -> impl Iterator<Item = &str> {
        self.agents.keys().map(String::as_str)
    }

    /// Resolve `id`, stamping the instructions with the current time.
    ///
    /// # Errors
    /// Returns `Error::Config` naming the available ids if `id` is unknown.
    pub fn persona(&self, id: &str) -> Result<Persona> {
        self.persona_at(id, mountain_now())
    }

    /// Resolve `id` with an explicit timestamp.
    ///
    /// # Errors
    /// Returns `Error::Config` naming the available ids if `id` is unknown.
    pub fn persona_at(&self, id: &str, now: DateTime<FixedOffset>) -> Result<Persona> {
        let entry = self.agents.get(id).ok_or_else(|| {
            let available: Vec<&str> = self.ids().collect();
            Error::Config(format!(
                "Agent '{id}' not found. Available agents: {available:?}"
            ))
        })?;

        Ok(Persona {
            name: entry.name.clone(),
            model: entry.model.clone(),
            voice: entry.voice.clone(),
            instructions: render_instructions(&entry.instructions, now),
        })
    }
}

#[must_use]
pub fn render_instructions(template: &str, now: DateTime<FixedOffset>) -> String {
    template.replace(DATETIME_PLACEHOLDER, &now.format(DATETIME_FORMAT).to_string())
}

fn mountain_now() -> DateTime<FixedOffset> {
    let utc = Utc::now();
    FixedOffset::west_opt(MOUNTAIN_OFFSET_SECS)
        .map_or_else(|| utc.fixed_offset(), |tz| utc.with_timezone(&tz))
}
