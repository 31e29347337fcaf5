//! Main SOCKS5 handler
//!
//! Drives one accepted client connection through negotiation,
//! authentication, the request/reply exchange and finally the relay.

use crate::error::Socks5Error;
use crate::socks::auth::{authenticate, negotiate, AuthMethod, CredentialVerifier, MethodPolicy};
use crate::socks::command::{read_request, write_failure_reply, write_success_reply, ReplyMode};
use crate::socks::tcp_relay::{relay, RelayOptions};
use crate::socks::types::{Request, SocksCommand};
use crate::transport::Connector;
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;
use tokio::io::{AsyncRead, AsyncWrite};
use tokio::net::TcpStream;
use tracing::{debug, info, warn};

/// Default time allowed for each handshake stage, in seconds
pub const DEFAULT_HANDSHAKE_TIMEOUT_SECS: u64 = 10;

/// Read-only state shared by every connection task of one server
#[derive(Clone)]
pub struct ServerContext {
    /// Picks the authentication method
    pub policy: Arc<dyn MethodPolicy>,
    /// Checks username/password pairs
    pub verifier: Arc<dyn CredentialVerifier>,
    /// Dials destinations
    pub connector: Connector,
    /// Failure to REP mapping
    pub reply_mode: ReplyMode,
    /// Limit for each of negotiation, authentication and request read
    pub handshake_timeout: Duration,
    /// Relay tuning
    pub relay: RelayOptions,
}

impl ServerContext {
    /// Context with default timeouts and generic failure replies
    pub fn new(policy: Arc<dyn MethodPolicy>, verifier: Arc<dyn CredentialVerifier>) -> Self {
        ServerContext {
            policy,
            verifier,
            connector: Connector::with_defaults(),
            reply_mode: ReplyMode::default(),
            handshake_timeout: Duration::from_secs(DEFAULT_HANDSHAKE_TIMEOUT_SECS),
            relay: RelayOptions::default(),
        }
    }

    /// Set the destination connector
    pub fn with_connector(mut self, connector: Connector) -> Self {
        self.connector = connector;
        self
    }

    /// Set the reply mode
    pub fn with_reply_mode(mut self, mode: ReplyMode) -> Self {
        self.reply_mode = mode;
        self
    }

    /// Set the per-stage handshake timeout
    pub fn with_handshake_timeout(mut self, timeout: Duration) -> Self {
        self.handshake_timeout = timeout;
        self
    }

    /// Set relay options
    pub fn with_relay_options(mut self, options: RelayOptions) -> Self {
        self.relay = options;
        self
    }
}

impl std::fmt::Debug for ServerContext {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ServerContext")
            .field("connector", &self.connector)
            .field("reply_mode", &self.reply_mode)
            .field("handshake_timeout", &self.handshake_timeout)
            .field("relay", &self.relay)
            .finish_non_exhaustive()
    }
}

async fn within<F, T>(limit: Duration, stage: &'static str, fut: F) -> Result<T, Socks5Error>
where
    F: Future<Output = Result<T, Socks5Error>>,
{
    tokio::time::timeout(limit, fut)
        .await
        .map_err(|_| Socks5Error::Timeout(stage))?
}

/// Read the client's request and act on it.
///
/// CONNECT dials the destination through `connector`. BIND and UDP ASSOCIATE
/// are reported as [`Socks5Error::CommandNotSupported`]. No reply is written
/// here; see [`write_success_reply`] and [`write_failure_reply`].
pub async fn establish_target<S>(
    stream: &mut S,
    connector: &Connector,
    read_timeout: Duration,
) -> Result<(Request, TcpStream), Socks5Error>
where
    S: AsyncRead + Unpin,
{
    let request = within(read_timeout, "request", read_request(stream)).await?;

    info!("SOCKS5 {} request to {}", request.command, request.target);

    match request.command {
        SocksCommand::Connect => {
            let target = connector.connect(&request.target).await?;
            Ok((request, target))
        }
        SocksCommand::Bind | SocksCommand::UdpAssociate => {
            warn!("{} command not supported", request.command);
            Err(Socks5Error::CommandNotSupported(request.command.to_byte()))
        }
    }
}

/// Handle SOCKS5 protocol on a stream
///
/// # Protocol Flow
///
/// 1. Method negotiation
/// 2. Username/password authentication (if selected)
/// 3. Request parsing and destination dial
/// 4. Reply, then relay until either side closes
///
/// Every request-level failure is answered with a failure reply before the
/// error is returned. Earlier failures close the connection without one.
pub async fn serve_connection<S>(mut stream: S, ctx: &ServerContext) -> Result<(), Socks5Error>
where
    S: AsyncRead + AsyncWrite + Unpin,
{
    let method = within(
        ctx.handshake_timeout,
        "negotiation",
        negotiate(&mut stream, ctx.policy.as_ref()),
    )
    .await?;

    debug!("Authentication negotiated with method: {}", method);

    if method == AuthMethod::Password {
        let accepted = within(
            ctx.handshake_timeout,
            "authentication",
            authenticate(&mut stream, ctx.verifier.as_ref()),
        )
        .await?;

        if !accepted {
            return Err(Socks5Error::AuthFailed);
        }
    }

    let (request, target) =
        match establish_target(&mut stream, &ctx.connector, ctx.handshake_timeout).await {
            Ok(established) => established,
            Err(e) if e.is_request_failure() => {
                let code = ctx.reply_mode.code_for(&e);
                warn!("Request failed ({}), replying with code {:#04x}", e, code);
                write_failure_reply(&mut stream, code).await?;
                return Err(e);
            }
            Err(e) => return Err(e),
        };

    write_success_reply(&mut stream, &target).await?;

    info!("SOCKS5 tunnel established to {}", request.target);

    let stats = relay(stream, target, &ctx.relay).await?;

    debug!(
        "Relay to {} finished: {} bytes up, {} bytes down",
        request.target, stats.client_to_target, stats.target_to_client
    );

    Ok(())
}
