//! Socksgate - SOCKS5 proxy server and forwarding client
//!
//! This is the main entry point for the Socksgate application.

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use socksgate::config::{load_config, ClientConfig, Config, ServerConfig};
use socksgate::client::run_client;
use socksgate::Socks5Server;
use std::path::PathBuf;
use tokio::sync::broadcast;
use tracing::{error, info, Level};
use tracing_subscriber::FmtSubscriber;
use url::Url;

/// Socksgate - SOCKS5 proxy server and forwarding client
#[derive(Parser, Debug)]
#[command(name = "socksgate")]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Path to configuration file
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// Log level (trace, debug, info, warn, error)
    #[arg(short, long, default_value = "info", global = true)]
    log_level: String,

    /// Enable JSON logging format
    #[arg(long, global = true)]
    json_log: bool,

    #[command(subcommand)]
    mode: Mode,
}

#[derive(Subcommand, Debug)]
enum Mode {
    /// Run the SOCKS5 proxy server
    Server {
        /// Address to accept SOCKS5 clients on
        #[arg(long)]
        listen: Option<String>,
    },
    /// Forward a local port to a target through a SOCKS5 proxy
    Client {
        /// Local address to accept application connections on
        #[arg(long)]
        listen: Option<String>,

        /// Upstream proxy, socks5://[user:pass@]host[:port]
        #[arg(long)]
        proxy: Option<Url>,

        /// Destination, host:port
        #[arg(long)]
        target: Option<String>,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    // Setup logging
    setup_logging(&args.log_level, args.json_log)?;

    // Load configuration
    let config = match &args.config {
        Some(path) => {
            let config = load_config(path)?;
            info!("Configuration loaded from: {:?}", path);
            config
        }
        None => Config::default(),
    };

    info!("Socksgate v{}", socksgate::VERSION);

    // Setup shutdown signal
    let (shutdown_tx, shutdown_rx) = broadcast::channel(1);
    tokio::spawn(wait_for_shutdown(shutdown_tx));

    match args.mode {
        Mode::Server { listen } => {
            let mut server_config: ServerConfig = config.server.unwrap_or_default();
            if let Some(listen) = listen {
                server_config.listen_addr = listen;
            }

            let server = Socks5Server::new(server_config).context("Invalid server configuration")?;
            server.run(shutdown_rx).await
        }
        Mode::Client {
            listen,
            proxy,
            target,
        } => {
            let mut client_config: ClientConfig = config.client.unwrap_or_default();
            if let Some(listen) = listen {
                client_config.listen_addr = listen;
            }
            if proxy.is_some() {
                client_config.proxy = proxy;
            }
            if target.is_some() {
                client_config.target_addr = target;
            }

            run_client(client_config, shutdown_rx).await
        }
    }
}

/// Handle Ctrl+C and termination signals (cross-platform)
async fn wait_for_shutdown(shutdown_tx: broadcast::Sender<bool>) {
    #[cfg(unix)]
    {
        use tokio::signal::unix::{signal, SignalKind};

        match signal(SignalKind::terminate()) {
            Ok(mut sigterm) => {
                tokio::select! {
                    _ = tokio::signal::ctrl_c() => {
                        info!("Received Ctrl+C, shutting down...");
                    }
                    _ = sigterm.recv() => {
                        info!("Received SIGTERM, shutting down...");
                    }
                }
            }
            Err(e) => {
                error!("Failed to setup SIGTERM handler: {}", e);
                let _ = tokio::signal::ctrl_c().await;
                info!("Received Ctrl+C, shutting down...");
            }
        }
    }

    #[cfg(not(unix))]
    {
        // On Windows, only handle Ctrl+C
        let _ = tokio::signal::ctrl_c().await;
        info!("Received Ctrl+C, shutting down...");
    }

    let _ = shutdown_tx.send(true);
}

/// Setup logging based on configuration
fn setup_logging(level: &str, json: bool) -> Result<()> {
    let level = match level.to_lowercase().as_str() {
        "trace" => Level::TRACE,
        "debug" => Level::DEBUG,
        "info" => Level::INFO,
        "warn" | "warning" => Level::WARN,
        "error" => Level::ERROR,
        _ => Level::INFO,
    };

    if json {
        let subscriber = FmtSubscriber::builder()
            .with_max_level(level)
            .json()
            .finish();
        tracing::subscriber::set_global_default(subscriber)?;
    } else {
        let subscriber = FmtSubscriber::builder()
            .with_max_level(level)
            .with_target(true)
            .with_thread_ids(false)
            .with_thread_names(false)
            .finish();
        tracing::subscriber::set_global_default(subscriber)?;
    }

    Ok(())
}
