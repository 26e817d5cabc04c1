//! Grafana session proxy.
//!
//! # Architecture Overview
//!
//! ```text
//!     Browser ──── /proxy/** ────▶ ReverseProxy ──────────────▶ Backend
//!        ▲                             │   ◀── Set-Cookie ──────────┘
//!        │                             ▼
//!        │                       SessionStore
//!        │                             │ Cookie
//!        │                             ▼
//!        └──── /api/* (json/csv) ◀── QueryGateway ── UpstreamClient ──▶ Backend
//! ```

use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;

use clap::Parser;
use tokio::net::TcpListener;

use grafana_session_proxy::config::{load_or_default, ConfigSource};
use grafana_session_proxy::lifecycle::{signals, startup, Shutdown};
use grafana_session_proxy::net::tls::load_tls_config;
use grafana_session_proxy::observability::logging::init_logging;
use grafana_session_proxy::{HttpServer, SessionStore, SharedSessionStore};

#[derive(Parser)]
#[command(name = "grafana-session-proxy")]
#[command(about = "Local proxy that reuses a Grafana login for Loki queries", long_about = None)]
struct Cli {
    /// Path to the TOML configuration file.
    #[arg(short, long, default_value = "grafana-session-proxy.toml")]
    config: PathBuf,

    /// Open the browser after startup, regardless of configuration.
    #[arg(long)]
    open: bool,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    let (mut config, source) = match load_or_default(Some(&cli.config)) {
        Ok(loaded) => loaded,
        Err(e) => {
            eprintln!("Invalid configuration: {}", e);
            std::process::exit(2);
        }
    };
    if cli.open {
        config.startup.open_browser = true;
    }

    init_logging(&config.observability);

    if source == ConfigSource::Defaults {
        tracing::info!(path = %cli.config.display(), "Config file not found, using defaults");
    }

    tracing::info!(
        bind_address = %config.listener.bind_address,
        backend = %config.backend.trimmed_base_url(),
        tls = config.listener.tls.is_some(),
        "Configuration loaded"
    );

    let session: Arc<dyn SessionStore> = Arc::new(SharedSessionStore::new());
    let shutdown = Shutdown::new();
    tokio::spawn(signals::wait_for_signal(shutdown.clone()));

    let browser_url = config
        .startup
        .open_browser
        .then(|| startup::browser_url(&config));
    let tls = config.listener.tls.clone();
    let addr: SocketAddr = config.listener.bind_address.parse()?;
    let server = HttpServer::new(config, session)?;

    match tls {
        Some(tls) => {
            let rustls = load_tls_config(&tls).await?;
            if let Some(url) = browser_url {
                startup::open_browser(&url);
            }
            server.run_tls(addr, rustls, shutdown.subscribe()).await?;
        }
        None => {
            let listener = TcpListener::bind(addr).await?;
            tracing::info!(address = %listener.local_addr()?, "Listening for connections");
            if let Some(url) = browser_url {
                startup::open_browser(&url);
            }
            server.run(listener, shutdown.subscribe()).await?;
        }
    }

    tracing::info!("Shutdown complete");
    Ok(())
}
