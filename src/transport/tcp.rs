//! TCP dialing
//!
//! Opens outbound connections to [`TargetAddr`]s with a timeout and applies
//! socket options to the result.

use super::SocketOpts;
use crate::error::Socks5Error;
use crate::socks::{Address, TargetAddr};
use std::io;
use std::net::{IpAddr, SocketAddr};
use std::time::Duration;
use tokio::net::TcpStream;

/// Default connect timeout in seconds
const DEFAULT_CONNECT_TIMEOUT_SECS: u64 = 10;

/// Outbound TCP connector
#[derive(Debug, Clone)]
pub struct Connector {
    /// Socket options to apply to connections
    socket_opts: SocketOpts,
    /// Connection timeout
    connect_timeout: Duration,
}

impl Default for Connector {
    fn default() -> Self {
        Self::with_defaults()
    }
}

impl Connector {
    /// Create a new connector with default options
    pub fn with_defaults() -> Self {
        Connector {
            socket_opts: SocketOpts::default(),
            connect_timeout: Duration::from_secs(DEFAULT_CONNECT_TIMEOUT_SECS),
        }
    }

    /// Set socket options
    pub fn with_socket_opts(mut self, opts: SocketOpts) -> Self {
        self.socket_opts = opts;
        self
    }

    /// Set connection timeout
    pub fn with_connect_timeout(mut self, timeout: Duration) -> Self {
        self.connect_timeout = timeout;
        self
    }

    /// Configured connection timeout
    pub fn connect_timeout(&self) -> Duration {
        self.connect_timeout
    }

    /// Dial `target`.
    ///
    /// Domains go through the system resolver and every resolved address is
    /// tried in turn. Resolution errors, refusals and the timeout all come back
    /// as [`Socks5Error::Unreachable`]; the timeout carries
    /// [`io::ErrorKind::TimedOut`].
    pub async fn connect(&self, target: &TargetAddr) -> Result<TcpStream, Socks5Error> {
        let dial = async {
            match &target.host {
                Address::Ipv4(ip) => {
                    TcpStream::connect(SocketAddr::new(IpAddr::V4(*ip), target.port)).await
                }
                Address::Ipv6(ip) => {
                    TcpStream::connect(SocketAddr::new(IpAddr::V6(*ip), target.port)).await
                }
                Address::Domain(domain) => TcpStream::connect((domain.as_str(), target.port)).await,
            }
        };

        let result = match tokio::time::timeout(self.connect_timeout, dial).await {
            Ok(result) => result,
            Err(_) => Err(io::Error::new(
                io::ErrorKind::TimedOut,
                format!("connect timed out after {:?}", self.connect_timeout),
            )),
        };

        let stream = result.map_err(|source| Socks5Error::Unreachable {
            target: target.to_string(),
            source,
        })?;

        if let Err(e) = self.socket_opts.apply(&stream) {
            tracing::warn!("Failed to apply socket options: {}", e);
        }

        tracing::debug!("TCP connection established to {}", target);

        Ok(stream)
    }
}
