use std::path::PathBuf;

use anyhow::Context;
use clap::Parser;
use tokio::net::TcpListener;
use tracing::info;
use tracing_subscriber::EnvFilter;

use oai_rt_relay::{ConfigSources, ServerConfig, router};

/// Relay browser voice sessions to the OpenAI Realtime API
#[derive(Parser, Debug)]
#[command(name = "oai-rt-relay")]
#[command(version, about, long_about = None)]
struct Cli {
    /// Persona catalog (YAML)
    #[arg(short = 'c', long = "agents", value_name = "FILE")]
    agents: Option<PathBuf>,

    /// Persona id to load from the catalog
    #[arg(short = 'a', long = "agent")]
    agent: Option<String>,

    /// Interface to bind
    #[arg(long)]
    host: Option<String>,

    /// Port to bind
    #[arg(short = 'p', long)]
    port: Option<u16>,

    /// Directory holding index.html, admin.html and static assets
    #[arg(long, value_name = "DIR")]
    frontend: Option<PathBuf>,
}

impl Cli {
    fn apply(self, sources: &mut ConfigSources) {
        if let Some(agents) = self.agents {
            sources.agents_path = Some(agents);
        }
        if let Some(agent) = self.agent {
            sources.persona = Some(agent);
        }
        if let Some(host) = self.host {
            sources.host = Some(host);
        }
        if let Some(port) = self.port {
            sources.port = Some(port.to_string());
        }
        if let Some(frontend) = self.frontend {
            sources.frontend_dir = Some(frontend);
        }
    }
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> anyhow::Result<()> {
    let _ = dotenvy::dotenv();

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let cli = Cli::parse();
    let mut sources = ConfigSources::from_env();
    cli.apply(&mut sources);

    let config = ServerConfig::from_sources(sources).context("loading configuration")?;
    let address = config.address();
    let app = router(&config);

    let listener = TcpListener::bind(&address).await?;
    info!("Realtime relay listening on http://{address}");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    info!("Shutting down");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!("Failed to listen for shutdown signal: {e}");
        std::future::pending::<()>().await;
    }
}
