//! Client configuration types
//!
//! The `[client]` table: a local forwarder that reaches a fixed target
//! through an upstream SOCKS5 proxy.

use super::server::validate_field_len;
use super::TcpConfig;
use percent_encoding::percent_decode_str;
use crate::socks::{Address, Credentials, TargetAddr};
use serde::{Deserialize, Serialize};
use std::net::Ipv4Addr;
use url::{Host, Url};

/// Port assumed when the proxy URL has none
pub const DEFAULT_PROXY_PORT: u16 = 1080;

fn default_listen_addr() -> String {
    "127.0.0.1:1081".to_string()
}

/// Default connect timeout in seconds
fn default_connect_timeout() -> u64 {
    10
}

/// Default relay idle timeout in seconds
fn default_idle_timeout() -> u64 {
    300
}

/// Forwarding client configuration
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Eq)]
pub struct ClientConfig {
    /// Local address applications connect to
    #[serde(default = "default_listen_addr")]
    pub listen_addr: String,

    /// Upstream proxy, `socks5://[user:pass@]host[:port]`
    #[serde(default)]
    pub proxy: Option<Url>,

    /// Destination every accepted connection is forwarded to, `host:port`
    #[serde(default)]
    pub target_addr: Option<String>,

    /// Proxy connect timeout in seconds
    #[serde(default = "default_connect_timeout")]
    pub connect_timeout: u64,

    /// Relay idle timeout in seconds (0 disables)
    #[serde(default = "default_idle_timeout")]
    pub idle_timeout: u64,

    /// Socket options for proxy connections
    #[serde(default)]
    pub tcp: TcpConfig,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            listen_addr: default_listen_addr(),
            proxy: None,
            target_addr: None,
            connect_timeout: default_connect_timeout(),
            idle_timeout: default_idle_timeout(),
            tcp: TcpConfig::default(),
        }
    }
}

/// Proxy endpoint and optional credentials taken from the proxy URL
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProxyEndpoint {
    /// Proxy address
    pub addr: TargetAddr,
    /// Credentials, when the URL carries a username
    pub credentials: Option<Credentials>,
}

impl ClientConfig {
    /// Split the proxy URL into an address and credentials
    pub fn proxy_endpoint(&self) -> Result<ProxyEndpoint, String> {
        let url = self
            .proxy
            .as_ref()
            .ok_or_else(|| "Proxy address not configured".to_string())?;
        parse_proxy_url(url)
    }

    /// Parse the configured target address
    pub fn target(&self) -> Result<TargetAddr, String> {
        let target = self
            .target_addr
            .as_deref()
            .ok_or_else(|| "Target address not configured".to_string())?;
        TargetAddr::parse(target).map_err(|e| e.to_string())
    }

    /// Validate the configuration
    pub fn validate(&self) -> Result<(), String> {
        if self.listen_addr.is_empty() {
            return Err("Client listen address is empty".to_string());
        }
        self.proxy_endpoint()?;
        if let Address::Ipv6(_) = self.target()?.host {
            return Err("IPv6 target addresses are not supported".to_string());
        }
        if self.connect_timeout == 0 {
            return Err("Connect timeout must be greater than 0".to_string());
        }
        Ok(())
    }
}

/// Parse `socks5://[user:pass@]host[:port]`
pub fn parse_proxy_url(url: &Url) -> Result<ProxyEndpoint, String> {
    if url.scheme() != "socks5" {
        return Err(format!(
            "Unsupported proxy scheme {:?}, expected \"socks5\"",
            url.scheme()
        ));
    }

    let port = url.port().unwrap_or(DEFAULT_PROXY_PORT);
    let addr = match url.host() {
        Some(Host::Ipv4(ip)) => TargetAddr::ipv4(ip, port),
        Some(Host::Ipv6(ip)) => TargetAddr::from(std::net::SocketAddr::new(ip.into(), port)),
        // socks5 is not a special scheme, so IPv4 literals arrive as opaque hosts
        Some(Host::Domain(domain)) => match domain.parse::<Ipv4Addr>() {
            Ok(ip) => TargetAddr::ipv4(ip, port),
            Err(_) => TargetAddr::domain(domain, port),
        },
        None => return Err(format!("Proxy URL {} has no host", url)),
    };

    let credentials = if url.username().is_empty() {
        None
    } else {
        // userinfo is kept percent-encoded by the URL parser
        let username: Vec<u8> = percent_decode_str(url.username()).collect();
        let password: Vec<u8> = percent_decode_str(url.password().unwrap_or_default()).collect();
        validate_field_len("username", &username)?;
        validate_field_len("password", &password)?;
        Some(Credentials::new(username, password).map_err(|e| e.to_string())?)
    };

    Ok(ProxyEndpoint { addr, credentials })
}
