use std::path::PathBuf;

use anyhow::Context;

use oai_rt_relay::config::{DEFAULT_HOST, DEFAULT_PORT};
use oai_rt_relay::{ConfigSources, Error, ServerConfig};

const AGENTS: &str = r#"
agents:
  comedy_performer:
    name: BriAI
    model: gpt-4o-realtime-preview
    voice: alloy
    instructions: |
      You are BriAI. It is {current_datetime}.
  friendly_host:
    name: Sam
    model: gpt-4o-realtime-preview
    voice: verse
    instructions: Welcome the guest.
"#;

fn agents_file() -> tempfile::NamedTempFile {
    let file = tempfile::NamedTempFile::new().unwrap();
    std::fs::write(file.path(), AGENTS).unwrap();
    file
}

fn sources(agents: &tempfile::NamedTempFile) -> ConfigSources {
    ConfigSources {
        api_key: Some("sk-secret".to_string()),
        agents_path: Some(agents.path().to_path_buf()),
        ..ConfigSources::default()
    }
}

#[test]
fn defaults_are_applied() {
    let agents = agents_file();
    let config = ServerConfig::from_sources(sources(&agents)).unwrap();

    assert_eq!(config.host, DEFAULT_HOST);
    assert_eq!(config.port, DEFAULT_PORT);
    assert_eq!(config.address(), "localhost:8080");
    assert_eq!(config.frontend_dir, PathBuf::from("frontend"));
    assert_eq!(config.relay.transcription_model, "whisper-1");
    assert!(config.relay.upstream_url.starts_with("wss://api.openai.com"));

    // No persona selected falls back to the comedy performer.
    assert_eq!(config.relay.persona.name, "BriAI");
    let instructions = &config.relay.persona.instructions;
    assert!(!instructions.contains("{current_datetime}"));
}

#[test]
fn explicit_values_override_defaults() {
    let agents = agents_file();
    let config = ServerConfig::from_sources(ConfigSources {
        persona: Some("friendly_host".to_string()),
        host: Some("0.0.0.0".to_string()),
        port: Some("9000".to_string()),
        upstream_url: Some("ws://127.0.0.1:1234".to_string()),
        transcription_model: Some("gpt-4o-transcribe".to_string()),
        ..sources(&agents)
    })
    .unwrap();

    assert_eq!(config.address(), "0.0.0.0:9000");
    assert_eq!(config.relay.upstream_url, "ws://127.0.0.1:1234");
    assert_eq!(config.relay.persona.voice, "verse");

    let options = serde_json::to_value(config.relay.session_options()).unwrap();
    assert_eq!(options["voice"], "verse");
    assert_eq!(options["instructions"], "Welcome the guest.");
    assert_eq!(options["input_audio_transcription"]["model"], "gpt-4o-transcribe");
}

#[test]
fn missing_api_key_is_rejected() {
    let agents = agents_file();
    let err = ServerConfig::from_sources(ConfigSources {
        api_key: None,
        ..sources(&agents)
    })
    .unwrap_err();

    assert!(matches!(err, Error::Config(ref msg) if msg.contains("OPENAI_API_KEY")));
}

#[test]
fn invalid_port_is_rejected() {
    let agents = agents_file();
    let err = ServerConfig::from_sources(ConfigSources {
        port: Some("eighty".to_string()),
        ..sources(&agents)
    })
    .unwrap_err();

    assert!(matches!(err, Error::Config(ref msg) if msg.contains("eighty")));
}

#[test]
fn unknown_persona_lists_available_ones() {
    let agents = agents_file();
    let err = ServerConfig::from_sources(ConfigSources {
        persona: Some("villain".to_string()),
        ..sources(&agents)
    })
    .unwrap_err();

    let Error::Config(msg) = err else {
        panic!("expected config error, got {err:?}");
    };
    assert!(msg.contains("villain"));
    assert!(msg.contains("comedy_performer"));
    assert!(msg.contains("friendly_host"));
}

#[test]
fn missing_agents_file_is_rejected() {
    let err = ServerConfig::from_sources(ConfigSources {
        api_key: Some("sk-secret".to_string()),
        agents_path: Some(PathBuf::from("/definitely/not/here.yaml")),
        ..ConfigSources::default()
    })
    .unwrap_err();

    assert!(matches!(err, Error::Config(_)));
}

#[test]
fn debug_output_hides_api_key() {
    let agents = agents_file();
    let config = ServerConfig::from_sources(sources(&agents)).unwrap();

    let rendered = format!("{config:?}");
    assert!(!rendered.contains("sk-secret"));
    assert!(rendered.contains("redacted"));
}

#[test]
fn startup_context_keeps_the_underlying_error() {
    let agents = agents_file();
    let err = ServerConfig::from_sources(ConfigSources {
        api_key: None,
        ..sources(&agents)
    })
    .context("loading configuration")
    .unwrap_err();

    let rendered = format!("{err:#}");
    assert!(rendered.starts_with("loading configuration"));
    assert!(rendered.contains("OPENAI_API_KEY"));
    assert!(matches!(err.root_cause().downcast_ref::<Error>(), Some(Error::Config(_))));
}
