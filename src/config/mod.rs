//! Configuration module for Socksgate
//!
//! This module provides configuration types and parsing for the server and
//! the forwarding client.

mod client;
mod server;
mod transport;

pub use client::{parse_proxy_url, ClientConfig, ProxyEndpoint, DEFAULT_PROXY_PORT};
pub use server::{ServerConfig, UserConfig};
pub use transport::TcpConfig;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Root configuration structure
#[derive(Debug, Serialize, Deserialize, Clone, Default, PartialEq, Eq)]
pub struct Config {
    /// Server configuration
    #[serde(default)]
    pub server: Option<ServerConfig>,

    /// Forwarding client configuration
    #[serde(default)]
    pub client: Option<ClientConfig>,
}

/// Load configuration from a TOML file
pub fn load_config<P: AsRef<Path>>(path: P) -> Result<Config> {
    let content = std::fs::read_to_string(path.as_ref())
        .with_context(|| format!("Failed to read config file: {:?}", path.as_ref()))?;

    parse_config(&content)
}

/// Parse configuration from a TOML string
pub fn parse_config(content: &str) -> Result<Config> {
    toml::from_str(content).with_context(|| "Failed to parse configuration")
}
