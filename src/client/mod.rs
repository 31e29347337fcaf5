//! Client module for Socksgate
//!
//! The client half of the protocol, a reusable [`Socks5Client`] and the
//! [`Forwarder`] that exposes a fixed proxied target on a local port.

#[allow(clippy::module_inception)]
mod client;
mod forwarder;
mod handshake;

pub use client::Socks5Client;
pub use forwarder::Forwarder;
pub use handshake::{offer_methods, send_connect, send_credentials};

use crate::config::ClientConfig;
use crate::error::GatewayError;
use crate::socks::RelayOptions;
use crate::transport::{Connector, SocketOpts};
use anyhow::Result;
use std::time::Duration;
use tokio::sync::broadcast;

/// Build a forwarder from configuration
pub fn forwarder_from_config(config: &ClientConfig) -> Result<Forwarder> {
    config.validate().map_err(GatewayError::Config)?;

    let endpoint = config.proxy_endpoint().map_err(GatewayError::Config)?;
    let target = config.target().map_err(GatewayError::Config)?;

    let connector = Connector::with_defaults()
        .with_connect_timeout(Duration::from_secs(config.connect_timeout))
        .with_socket_opts(SocketOpts::from_tcp_config(&config.tcp));
    let client = Socks5Client::from_endpoint(endpoint).with_connector(connector);

    let relay = RelayOptions {
        idle_timeout: (config.idle_timeout > 0).then(|| Duration::from_secs(config.idle_timeout)),
        ..RelayOptions::default()
    };

    Ok(Forwarder::new(config.listen_addr.clone(), client, target).with_relay_options(relay))
}

/// Run the forwarding client with the given configuration
pub async fn run_client(config: ClientConfig, shutdown_rx: broadcast::Receiver<bool>) -> Result<()> {
    let forwarder = forwarder_from_config(&config)?;
    forwarder.run(shutdown_rx).await
}
