//! # pingwire
//!
//! Binary entry point: `serve` runs the echo server until ctrl-c, `connect`
//! runs the greeting client until the server goes away.

#![deny(unsafe_code)]

use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use pingwire_client::{ClientConfig, ClientEvent, EchoClient};
use pingwire_server::{EchoServer, ServerConfig};
use pingwire_settings::PingwireSettings;

/// WebSocket echo server and client with per-connection liveness probes.
#[derive(Parser, Debug)]
#[command(name = "pingwire", about = "WebSocket echo server with liveness probes")]
struct Cli {
    /// Settings file (defaults to `~/.pingwire/settings.json`).
    #[arg(long, global = true)]
    settings: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Run the echo server.
    Serve {
        /// Host to bind.
        #[arg(long)]
        host: Option<String>,

        /// Port to bind (0 for auto-assign).
        #[arg(long)]
        port: Option<u16>,

        /// Liveness probe period in milliseconds.
        #[arg(long)]
        probe_interval_ms: Option<u64>,
    },
    /// Connect, send the greeting, and log what comes back.
    Connect {
        /// Server URL.
        #[arg(long)]
        url: Option<String>,

        /// Greeting text.
        #[arg(long)]
        message: Option<String>,
    },
}

impl Cli {
    /// Fold command-line flags over loaded settings.
    fn apply_overrides(&self, settings: &mut PingwireSettings) {
        match &self.command {
            Command::Serve {
                host,
                port,
                probe_interval_ms,
            } => {
                if let Some(host) = host {
                    settings.server.host.clone_from(host);
                }
                if let Some(port) = port {
                    settings.server.port = *port;
                }
                if let Some(ms) = probe_interval_ms {
                    settings.server.probe_interval_ms = *ms;
                }
            }
            Command::Connect { url, message } => {
                if let Some(url) = url {
                    settings.client.url.clone_from(url);
                }
                if let Some(message) = message {
                    settings.client.greeting.clone_from(message);
                }
            }
        }
    }
}

fn load_settings(cli: &Cli) -> Result<PingwireSettings> {
    let mut settings = match &cli.settings {
        Some(path) => pingwire_settings::load_settings_from_path(path)
            .with_context(|| format!("Failed to load settings from {}", path.display()))?,
        None => pingwire_settings::load_settings().with_context(|| {
            format!(
                "Failed to load settings from {}",
                pingwire_settings::settings_path().display()
            )
        })?,
    };
    cli.apply_overrides(&mut settings);
    settings
        .server
        .validate()
        .context("Invalid command-line override")?;
    Ok(settings)
}

async fn serve(settings: &PingwireSettings) -> Result<()> {
    let config = ServerConfig::from(&settings.server);

    let server = EchoServer::new(config);
    let addr = server.start().await.context("Failed to start server")?;
    tracing::info!("pingwire listening on ws://{addr}");

    tokio::signal::ctrl_c()
        .await
        .context("Failed to listen for ctrl-c")?;

    tracing::info!("Shutting down...");
    server.stop().await;
    tracing::info!("Shutdown complete");
    Ok(())
}

async fn connect(settings: &PingwireSettings) -> Result<()> {
    let config = ClientConfig::from(&settings.client);
    let mut session = EchoClient::connect(&config)
        .await
        .context("Failed to connect")?;

    loop {
        tokio::select! {
            event = session.next_event() => match event {
                Some(ClientEvent::Closed) | None => break,
                Some(ClientEvent::Error(error)) => tracing::error!(error, "connection error"),
                Some(_) => {}
            },
            signal = tokio::signal::ctrl_c() => {
                signal.context("Failed to listen for ctrl-c")?;
                session.close().await.context("Failed to close session")?;
                break;
            }
        }
    }
    Ok(())
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    let settings = load_settings(&cli)?;

    pingwire_core::logging::init_subscriber(&settings.logging.level, settings.logging.json);

    match cli.command {
        Command::Serve { .. } => serve(&settings).await,
        Command::Connect { .. } => connect(&settings).await,
    }
}
