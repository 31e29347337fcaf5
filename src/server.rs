//! SOCKS5 server
//!
//! Owns the listening socket and spawns one task per accepted client. All
//! tasks share one read-only [`ServerContext`].

use crate::config::ServerConfig;
use crate::error::{GatewayError, Socks5Error};
use crate::socks::{serve_connection, PreferenceList, RelayOptions, ServerContext, UserTable};
use crate::transport::{Connector, SocketOpts};
use anyhow::{Context, Result};
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;
use tokio::net::TcpListener;
use tokio::sync::broadcast;
use tracing::{debug, error, info, warn};

/// Build the shared connection context from configuration
pub fn context_from_config(config: &ServerConfig) -> ServerContext {
    let users: UserTable = config
        .users
        .iter()
        .map(|u| (u.username.as_str(), u.password.as_str()))
        .collect();

    let connector = Connector::with_defaults()
        .with_connect_timeout(Duration::from_secs(config.connect_timeout))
        .with_socket_opts(SocketOpts::from_tcp_config(&config.tcp));

    let relay = RelayOptions {
        buffer_size: config.relay_buffer_size,
        idle_timeout: (config.idle_timeout > 0).then(|| Duration::from_secs(config.idle_timeout)),
    };

    ServerContext::new(
        Arc::new(PreferenceList::new(config.methods.clone())),
        Arc::new(users),
    )
    .with_connector(connector)
    .with_reply_mode(config.reply_codes)
    .with_handshake_timeout(Duration::from_secs(config.handshake_timeout))
    .with_relay_options(relay)
}

/// SOCKS5 proxy server
pub struct Socks5Server {
    listen_addr: String,
    listener: Option<TcpListener>,
    ctx: Arc<ServerContext>,
}

impl Socks5Server {
    /// Create a server from validated configuration
    pub fn new(config: ServerConfig) -> Result<Self> {
        config.validate().map_err(GatewayError::Config)?;
        let ctx = context_from_config(&config);
        Ok(Self::with_context(config.listen_addr, ctx))
    }

    /// Create a server around an existing context
    pub fn with_context(listen_addr: impl Into<String>, ctx: ServerContext) -> Self {
        Socks5Server {
            listen_addr: listen_addr.into(),
            listener: None,
            ctx: Arc::new(ctx),
        }
    }

    /// Shared connection context
    pub fn context(&self) -> &Arc<ServerContext> {
        &self.ctx
    }

    /// Bind the listener and return its address
    pub async fn bind(&mut self) -> Result<SocketAddr> {
        if let Some(listener) = &self.listener {
            return Ok(listener.local_addr()?);
        }

        let listener = TcpListener::bind(&self.listen_addr)
            .await
            .with_context(|| format!("Failed to bind SOCKS5 server to {}", self.listen_addr))?;
        let addr = listener.local_addr()?;
        self.listener = Some(listener);
        Ok(addr)
    }

    /// Accept clients until shutdown
    ///
    /// Connections already being served are left to finish on their own.
    pub async fn run(mut self, mut shutdown_rx: broadcast::Receiver<bool>) -> Result<()> {
        let local_addr = self.bind().await?;
        let listener = self
            .listener
            .take()
            .context("Server listener missing after bind")?;

        info!("SOCKS5 server listening on {}", local_addr);

        loop {
            tokio::select! {
                accepted = listener.accept() => {
                    match accepted {
                        Ok((stream, peer)) => {
                            debug!("Accepted connection from {}", peer);
                            let ctx = self.ctx.clone();
                            tokio::spawn(async move {
                                if let Err(e) = serve_connection(stream, &ctx).await {
                                    log_connection_error(peer, &e);
                                }
                            });
                        }
                        Err(e) => {
                            error!("Failed to accept connection: {}", e);
                        }
                    }
                }
                _ = shutdown_rx.recv() => {
                    info!("Shutdown signal received, stopping server");
                    break;
                }
            }
        }

        Ok(())
    }
}

fn log_connection_error(peer: SocketAddr, err: &Socks5Error) {
    match err {
        Socks5Error::Io(e) if e.kind() == std::io::ErrorKind::UnexpectedEof => {
            debug!("Client {} disconnected during handshake", peer)
        }
        Socks5Error::AuthFailed | Socks5Error::NoAcceptableMethod => {
            info!("Client {} rejected: {}", peer, err)
        }
        _ => warn!("Connection from {} failed: {}", peer, err),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::UserConfig;
    use crate::socks::{AuthMethod, CredentialVerifier, ReplyMode};

    #[test]
    fn test_context_from_config() {
        let config = ServerConfig {
            methods: vec![AuthMethod::Password],
            users: vec![UserConfig {
                username: "user".into(),
                password: "pass".into(),
            }],
            handshake_timeout: 3,
            idle_timeout: 0,
            reply_codes: ReplyMode::Detailed,
            relay_buffer_size: 4096,
            ..Default::default()
        };

        let ctx = context_from_config(&config);
        assert_eq!(ctx.handshake_timeout, Duration::from_secs(3));
        assert_eq!(ctx.reply_mode, ReplyMode::Detailed);
        assert_eq!(ctx.relay.buffer_size, 4096);
        assert!(ctx.relay.idle_timeout.is_none());
    }

    #[tokio::test]
    async fn test_context_verifier_uses_users() {
        let config = ServerConfig {
            methods: vec![AuthMethod::Password],
            users: vec![UserConfig {
                username: "user".into(),
                password: "pass".into(),
            }],
            ..Default::default()
        };

        let ctx = context_from_config(&config);
        assert!(ctx.verifier.verify(b"user", b"pass").await);
        assert!(!ctx.verifier.verify(b"user", b"other").await);
    }

    #[test]
    fn test_new_rejects_invalid_config() {
        let config = ServerConfig {
            methods: vec![AuthMethod::Password],
            ..Default::default()
        };
        let err = Socks5Server::new(config).err().unwrap();
        assert!(err.to_string().contains("no users configured"));
    }

    #[tokio::test]
    async fn test_bind_ephemeral_port() {
        let mut server = Socks5Server::new(ServerConfig {
            listen_addr: "127.0.0.1:0".into(),
            ..Default::default()
        })
        .unwrap();

        let addr = server.bind().await.unwrap();
        assert_ne!(addr.port(), 0);
        assert_eq!(server.bind().await.unwrap(), addr);
    }

    #[tokio::test]
    async fn test_run_stops_on_shutdown() {
        let server = Socks5Server::new(ServerConfig {
            listen_addr: "127.0.0.1:0".into(),
            ..Default::default()
        })
        .unwrap();

        let (tx, rx) = broadcast::channel(1);
        let handle = tokio::spawn(server.run(rx));
        tx.send(true).unwrap();

        handle.await.unwrap().unwrap();
    }
}
