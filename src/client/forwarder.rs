//! Local port forwarder
//!
//! Accepts plain TCP connections locally and tunnels each one to a fixed
//! target through the SOCKS5 proxy.

use super::Socks5Client;
use crate::socks::{relay, RelayOptions, TargetAddr};
use anyhow::{Context, Result};
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::net::{TcpListener, TcpStream};
use tokio::sync::broadcast;
use tracing::{debug, error, info, warn};

/// Forwards local connections to `target` through a proxy
pub struct Forwarder {
    listen_addr: String,
    listener: Option<TcpListener>,
    client: Arc<Socks5Client>,
    target: Arc<TargetAddr>,
    relay: RelayOptions,
}

impl Forwarder {
    /// Create a forwarder; nothing is bound until [`Forwarder::bind`] or
    /// [`Forwarder::run`]
    pub fn new(listen_addr: impl Into<String>, client: Socks5Client, target: TargetAddr) -> Self {
        Forwarder {
            listen_addr: listen_addr.into(),
            listener: None,
            client: Arc::new(client),
            target: Arc::new(target),
            relay: RelayOptions::default(),
        }
    }

    /// Set relay options
    pub fn with_relay_options(mut self, options: RelayOptions) -> Self {
        self.relay = options;
        self
    }

    /// Bind the local listener and return its address
    pub async fn bind(&mut self) -> Result<SocketAddr> {
        if let Some(listener) = &self.listener {
            return Ok(listener.local_addr()?);
        }

        let listener = TcpListener::bind(&self.listen_addr)
            .await
            .with_context(|| format!("Failed to bind forwarder to {}", self.listen_addr))?;
        let addr = listener.local_addr()?;
        self.listener = Some(listener);
        Ok(addr)
    }

    /// Accept and forward connections until shutdown
    pub async fn run(mut self, mut shutdown_rx: broadcast::Receiver<bool>) -> Result<()> {
        let local_addr = self.bind().await?;
        let listener = self
            .listener
            .take()
            .context("Forwarder listener missing after bind")?;

        info!(
            "Forwarding {} -> {} via proxy {}",
            local_addr,
            self.target,
            self.client.proxy_addr()
        );

        loop {
            tokio::select! {
                accepted = listener.accept() => {
                    match accepted {
                        Ok((stream, peer)) => {
                            debug!("Accepted local connection from {}", peer);
                            let client = self.client.clone();
                            let target = self.target.clone();
                            let relay_options = self.relay;
                            tokio::spawn(async move {
                                if let Err(e) = forward(stream, &client, &target, &relay_options).await {
                                    warn!("Forwarding for {} failed: {:#}", peer, e);
                                }
                            });
                        }
                        Err(e) => {
                            error!("Failed to accept connection: {}", e);
                        }
                    }
                }
                _ = shutdown_rx.recv() => {
                    info!("Shutdown signal received, stopping forwarder");
                    break;
                }
            }
        }

        Ok(())
    }
}

async fn forward(
    local: TcpStream,
    client: &Socks5Client,
    target: &TargetAddr,
    relay_options: &RelayOptions,
) -> Result<()> {
    let upstream = client
        .connect(target)
        .await
        .with_context(|| format!("Failed to reach {} through proxy", target))?;

    let stats = relay(local, upstream, relay_options)
        .await
        .context("Relay failed")?;

    debug!(
        "Forwarded connection to {} closed: {} bytes up, {} bytes down",
        target, stats.client_to_target, stats.target_to_client
    );
    Ok(())
}
