//! # Socksgate - SOCKS5 Proxy Server and Forwarding Client
//!
//! Socksgate implements the SOCKS5 protocol (RFC 1928) with username/password
//! authentication (RFC 1929), both as a proxy server and as a client that
//! forwards a local port to a fixed destination through an upstream proxy.
//!
//! ## Features
//!
//! - **Configurable Method Negotiation**: ordered list of accepted methods
//! - **Pluggable Credential Checks**: any [`socks::CredentialVerifier`]
//! - **CONNECT Relay**: per-stage handshake timeouts and relay idle timeout
//! - **Reply Code Mapping**: generic single failure code or full RFC codes
//! - **Forwarding Client**: `local port -> SOCKS5 proxy -> target`
//!
//! ## Usage
//!
//! ```rust,ignore
//! use socksgate::config::ServerConfig;
//! use socksgate::server::Socks5Server;
//! use tokio::sync::broadcast;
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let server = Socks5Server::new(ServerConfig::default())?;
//!     let (_shutdown_tx, shutdown_rx) = broadcast::channel(1);
//!
//!     server.run(shutdown_rx).await
//! }
//! ```
//!
//! ## Architecture
//!
//! ```text
//! SOCKS5 Client -> Socks5Server -> Target
//! Application -> Forwarder -> SOCKS5 Proxy -> Target
//! ```

#![warn(missing_docs)]
#![warn(rust_2018_idioms)]

pub mod client;
pub mod config;
pub mod error;
pub mod server;
pub mod socks;
pub mod transport;

// Re-export commonly used items
pub use client::{run_client, Forwarder, Socks5Client};
pub use config::{load_config, Config};
pub use error::{GatewayError, Socks5Error, Socks5ReplyCode};
pub use server::Socks5Server;

/// Version of the Socksgate library
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Name of the application
pub const NAME: &str = env!("CARGO_PKG_NAME");

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_version() {
        assert!(!VERSION.is_empty());
    }

    #[test]
    fn test_name() {
        assert_eq!(NAME, "socksgate");
    }
}
