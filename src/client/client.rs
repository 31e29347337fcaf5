//! SOCKS5 client
//!
//! Opens connections to arbitrary targets through an upstream proxy.

use super::handshake::{offer_methods, send_connect, send_credentials};
use crate::config::ProxyEndpoint;
use crate::error::Socks5Error;
use crate::socks::{read_reply, Address, AuthMethod, Credentials, TargetAddr, SOCKS5_ADDR_TYPE_IPV6};
use crate::transport::Connector;
use tokio::net::TcpStream;
use tracing::debug;

/// SOCKS5 client bound to one proxy
#[derive(Debug, Clone)]
pub struct Socks5Client {
    /// Proxy address
    proxy_addr: TargetAddr,
    /// Credentials offered when the proxy asks for them
    credentials: Option<Credentials>,
    /// Dials the proxy
    connector: Connector,
}

impl Socks5Client {
    /// Create a client for the proxy at `proxy_addr`
    pub fn new(proxy_addr: TargetAddr) -> Self {
        Socks5Client {
            proxy_addr,
            credentials: None,
            connector: Connector::with_defaults(),
        }
    }

    /// Create a client from a parsed proxy URL
    pub fn from_endpoint(endpoint: ProxyEndpoint) -> Self {
        Socks5Client {
            proxy_addr: endpoint.addr,
            credentials: endpoint.credentials,
            connector: Connector::with_defaults(),
        }
    }

    /// Set credentials
    pub fn with_credentials(mut self, credentials: Credentials) -> Self {
        self.credentials = Some(credentials);
        self
    }

    /// Set the connector used to reach the proxy
    pub fn with_connector(mut self, connector: Connector) -> Self {
        self.connector = connector;
        self
    }

    /// Proxy address
    pub fn proxy_addr(&self) -> &TargetAddr {
        &self.proxy_addr
    }

    fn offered_methods(&self) -> Vec<AuthMethod> {
        match self.credentials {
            Some(_) => vec![AuthMethod::None, AuthMethod::Password],
            None => vec![AuthMethod::None],
        }
    }

    /// Open a connection to `target` through the proxy.
    ///
    /// The returned stream is positioned right after the proxy's success
    /// reply. The handshake shares the connector's timeout.
    pub async fn connect(&self, target: &TargetAddr) -> Result<TcpStream, Socks5Error> {
        if let Address::Ipv6(_) = target.host {
            return Err(Socks5Error::AddressTypeNotSupported(SOCKS5_ADDR_TYPE_IPV6));
        }

        let mut stream = self.connector.connect(&self.proxy_addr).await?;

        tokio::time::timeout(self.connector.connect_timeout(), self.handshake(&mut stream, target))
            .await
            .map_err(|_| Socks5Error::Timeout("proxy handshake"))??;

        Ok(stream)
    }

    async fn handshake(&self, stream: &mut TcpStream, target: &TargetAddr) -> Result<(), Socks5Error> {
        let method = offer_methods(stream, &self.offered_methods()).await?;

        if method == AuthMethod::Password {
            let credentials = self.credentials.as_ref().ok_or(Socks5Error::AuthFailed)?;
            send_credentials(stream, credentials).await?;
        }

        send_connect(stream, target).await?;
        let reply = read_reply(stream).await?;

        debug!(
            "Proxy {} connected to {} (bound {})",
            self.proxy_addr, target, reply.bound
        );

        Ok(())
    }
}
