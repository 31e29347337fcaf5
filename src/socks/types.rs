//! SOCKS5 type definitions
//!
//! Defines the core types used in SOCKS5 protocol handling.

use super::consts::*;
use crate::error::Socks5Error;
use std::fmt;
use std::net::{IpAddr, Ipv4Addr, Ipv6Addr, SocketAddr};

/// SOCKS5 command types
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SocksCommand {
    /// TCP CONNECT - establish a TCP connection to target
    Connect,
    /// TCP BIND - wait for incoming connection (not implemented)
    Bind,
    /// UDP ASSOCIATE - establish UDP relay (not implemented)
    UdpAssociate,
}

impl SocksCommand {
    /// Parse a command byte into SocksCommand
    pub fn from_byte(byte: u8) -> Option<Self> {
        match byte {
            SOCKS5_CMD_TCP_CONNECT => Some(SocksCommand::Connect),
            SOCKS5_CMD_TCP_BIND => Some(SocksCommand::Bind),
            SOCKS5_CMD_UDP_ASSOCIATE => Some(SocksCommand::UdpAssociate),
            _ => None,
        }
    }

    /// Convert SocksCommand to byte
    pub fn to_byte(self) -> u8 {
        match self {
            SocksCommand::Connect => SOCKS5_CMD_TCP_CONNECT,
            SocksCommand::Bind => SOCKS5_CMD_TCP_BIND,
            SocksCommand::UdpAssociate => SOCKS5_CMD_UDP_ASSOCIATE,
        }
    }
}

impl fmt::Display for SocksCommand {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SocksCommand::Connect => write!(f, "CONNECT"),
            SocksCommand::Bind => write!(f, "BIND"),
            SocksCommand::UdpAssociate => write!(f, "UDP ASSOCIATE"),
        }
    }
}

/// ATYP-tagged address as carried in requests and replies
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Address {
    /// 4 raw octets
    Ipv4(Ipv4Addr),
    /// Literal domain name, 1 to 255 bytes, no terminator
    Domain(String),
    /// 16 raw octets (recognized on the wire, never decoded)
    Ipv6(Ipv6Addr),
}

impl Address {
    /// Get the address type byte for SOCKS5 protocol
    pub fn addr_type(&self) -> u8 {
        match self {
            Address::Ipv4(_) => SOCKS5_ADDR_TYPE_IPV4,
            Address::Domain(_) => SOCKS5_ADDR_TYPE_DOMAIN,
            Address::Ipv6(_) => SOCKS5_ADDR_TYPE_IPV6,
        }
    }
}

impl fmt::Display for Address {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Address::Ipv4(ip) => write!(f, "{}", ip),
            Address::Domain(domain) => write!(f, "{}", domain),
            Address::Ipv6(ip) => write!(f, "[{}]", ip),
        }
    }
}

impl From<IpAddr> for Address {
    fn from(ip: IpAddr) -> Self {
        match ip {
            IpAddr::V4(v4) => Address::Ipv4(v4),
            IpAddr::V6(v6) => Address::Ipv6(v6),
        }
    }
}

/// Target address for SOCKS5 requests
///
/// Represents the destination address and port in a SOCKS5 request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TargetAddr {
    /// Destination host
    pub host: Address,
    /// Destination port
    pub port: u16,
}

impl TargetAddr {
    /// Create a new TargetAddr from an IPv4 address and port
    pub fn ipv4(ip: Ipv4Addr, port: u16) -> Self {
        TargetAddr {
            host: Address::Ipv4(ip),
            port,
        }
    }

    /// Create a new TargetAddr from a domain name and port
    pub fn domain(domain: impl Into<String>, port: u16) -> Self {
        TargetAddr {
            host: Address::Domain(domain.into()),
            port,
        }
    }

    /// Parse a `host:port` string.
    ///
    /// Literal IPs become [`Address::Ipv4`]/[`Address::Ipv6`], everything else
    /// is kept as a domain and left for the proxy to resolve.
    pub fn parse(s: &str) -> Result<Self, Socks5Error> {
        if let Ok(addr) = s.parse::<SocketAddr>() {
            return Ok(addr.into());
        }

        let (host, port) = s
            .rsplit_once(':')
            .ok_or_else(|| Socks5Error::InvalidAddress(format!("missing port in {:?}", s)))?;
        let port = port
            .parse::<u16>()
            .map_err(|_| Socks5Error::InvalidAddress(format!("invalid port in {:?}", s)))?;

        if host.is_empty() || host.len() > MAX_FIELD_LEN {
            return Err(Socks5Error::InvalidDomain(host.to_string()));
        }

        Ok(TargetAddr::domain(host, port))
    }
}

impl fmt::Display for TargetAddr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.host, self.port)
    }
}

impl From<SocketAddr> for TargetAddr {
    fn from(addr: SocketAddr) -> Self {
        TargetAddr {
            host: addr.ip().into(),
            port: addr.port(),
        }
    }
}

impl Default for TargetAddr {
    fn default() -> Self {
        TargetAddr::ipv4(Ipv4Addr::UNSPECIFIED, 0)
    }
}

/// The set of methods a client declared in its negotiation request.
///
/// Values are kept as raw bytes: anything the server does not implement is
/// only meaningful as "offered but not picked".
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MethodSet {
    offered: [bool; 256],
}

impl Default for MethodSet {
    fn default() -> Self {
        MethodSet {
            offered: [false; 256],
        }
    }
}

impl MethodSet {
    /// Build a set from the METHODS field of a negotiation request
    pub fn from_bytes(methods: &[u8]) -> Self {
        let mut offered = [false; 256];
        for &m in methods {
            offered[m as usize] = true;
        }
        MethodSet { offered }
    }

    /// Whether the client offered `method`
    pub fn contains(&self, method: u8) -> bool {
        self.offered[method as usize]
    }
}

/// Username/password pair as sent in the RFC 1929 sub-negotiation
#[derive(Clone, PartialEq, Eq)]
pub struct Credentials {
    /// Raw username bytes
    pub username: Vec<u8>,
    /// Raw password bytes
    pub password: Vec<u8>,
}

impl Credentials {
    /// Create credentials, checking both fields fit a one-byte length prefix
    pub fn new(
        username: impl Into<Vec<u8>>,
        password: impl Into<Vec<u8>>,
    ) -> Result<Self, Socks5Error> {
        let username = username.into();
        let password = password.into();

        for field in [&username, &password] {
            if field.is_empty() || field.len() > MAX_FIELD_LEN {
                return Err(Socks5Error::InvalidCredentialLength(field.len()));
            }
        }

        Ok(Credentials { username, password })
    }
}

impl fmt::Debug for Credentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credentials")
            .field("username", &String::from_utf8_lossy(&self.username))
            .field("password", &"<redacted>")
            .finish()
    }
}

/// A fully decoded client request
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Request {
    /// Requested command
    pub command: SocksCommand,
    /// Requested destination
    pub target: TargetAddr,
}
