//! Error types for Socksgate
//!
//! This module defines all custom error types used throughout the application.

use std::io;
use thiserror::Error;

/// Top-level error type for process-level operations
#[derive(Error, Debug)]
pub enum GatewayError {
    /// Configuration error
    #[error("Configuration error: {0}")]
    Config(String),
}

/// SOCKS5 specific errors
///
/// Every protocol stage returns one of these. [`Socks5Error::is_request_failure`]
/// tells the caller whether the client is still owed a reply frame.
#[derive(Error, Debug)]
pub enum Socks5Error {
    /// IO error on the client stream (short read, reset, write failure)
    #[error("IO error: {0}")]
    Io(#[from] io::Error),

    /// Unsupported SOCKS version
    #[error("Unsupported SOCKS version: {0}")]
    UnsupportedVersion(u8),

    /// No acceptable authentication method
    #[error("No acceptable authentication method")]
    NoAcceptableMethod,

    /// More methods offered than NMETHODS can count
    #[error("Too many authentication methods: {0}")]
    TooManyMethods(usize),

    /// Username or password length outside 1..=255
    #[error("Invalid credential length: {0}")]
    InvalidCredentialLength(usize),

    /// Credentials were rejected
    #[error("Authentication failed")]
    AuthFailed,

    /// Command not supported (BIND, UDP ASSOCIATE, unknown)
    #[error("Command not supported: {0}")]
    CommandNotSupported(u8),

    /// Address type recognized but not supported (IPv6)
    #[error("Address type not supported: {0}")]
    AddressTypeNotSupported(u8),

    /// Address type tag not defined by the protocol
    #[error("Invalid address type: {0}")]
    InvalidAddressType(u8),

    /// Invalid domain name
    #[error("Invalid domain name: {0}")]
    InvalidDomain(String),

    /// Invalid address
    #[error("Invalid address: {0}")]
    InvalidAddress(String),

    /// Destination could not be reached (DNS failure, refused, timeout)
    #[error("Destination {target} unreachable: {source}")]
    Unreachable {
        /// Destination as requested by the client
        target: String,
        /// Underlying dial error
        #[source]
        source: io::Error,
    },

    /// The proxy answered a request with a non-success reply code (client side)
    #[error("Request rejected by proxy, reply code: {0}")]
    Rejected(u8),

    /// A protocol stage did not complete in time
    #[error("Timeout during {0}")]
    Timeout(&'static str),
}

impl Socks5Error {
    /// Whether this error happened after a complete request frame was read,
    /// meaning the client must receive a failure reply before the connection
    /// is closed.
    pub fn is_request_failure(&self) -> bool {
        matches!(
            self,
            Socks5Error::CommandNotSupported(_)
                | Socks5Error::AddressTypeNotSupported(_)
                | Socks5Error::InvalidAddressType(_)
                | Socks5Error::InvalidDomain(_)
                | Socks5Error::Unreachable { .. }
        )
    }
}

/// Reply codes for SOCKS5 protocol
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum Socks5ReplyCode {
    /// Command succeeded
    Succeeded = 0x00,
    /// General SOCKS server failure
    GeneralFailure = 0x01,
    /// Connection not allowed by ruleset
    ConnectionNotAllowed = 0x02,
    /// Network unreachable
    NetworkUnreachable = 0x03,
    /// Host unreachable
    HostUnreachable = 0x04,
    /// Connection refused
    ConnectionRefused = 0x05,
    /// TTL expired
    TtlExpired = 0x06,
    /// Command not supported
    CommandNotSupported = 0x07,
    /// Address type not supported
    AddressTypeNotSupported = 0x08,
}

impl From<Socks5ReplyCode> for u8 {
    fn from(code: Socks5ReplyCode) -> Self {
        code as u8
    }
}

impl From<&io::Error> for Socks5ReplyCode {
    fn from(err: &io::Error) -> Self {
        match err.kind() {
            io::ErrorKind::ConnectionRefused => Socks5ReplyCode::ConnectionRefused,
            io::ErrorKind::TimedOut => Socks5ReplyCode::HostUnreachable,
            io::ErrorKind::AddrNotAvailable => Socks5ReplyCode::HostUnreachable,
            io::ErrorKind::PermissionDenied => Socks5ReplyCode::ConnectionNotAllowed,
            _ => Socks5ReplyCode::GeneralFailure,
        }
    }
}

impl From<&Socks5Error> for Socks5ReplyCode {
    fn from(err: &Socks5Error) -> Self {
        match err {
            Socks5Error::CommandNotSupported(_) => Socks5ReplyCode::CommandNotSupported,
            Socks5Error::AddressTypeNotSupported(_) | Socks5Error::InvalidAddressType(_) => {
                Socks5ReplyCode::AddressTypeNotSupported
            }
            Socks5Error::Unreachable { source, .. } => Socks5ReplyCode::from(source),
            _ => Socks5ReplyCode::GeneralFailure,
        }
    }
}
