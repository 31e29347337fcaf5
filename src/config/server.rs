//! Server configuration types
//!
//! The `[server]` table: listener, accepted methods, users, timeouts.

use super::TcpConfig;
use crate::socks::{AuthMethod, ReplyMode, DEFAULT_RELAY_BUFFER_SIZE, MAX_FIELD_LEN};
use serde::{Deserialize, Serialize};

fn default_listen_addr() -> String {
    "127.0.0.1:1080".to_string()
}

fn default_methods() -> Vec<AuthMethod> {
    vec![AuthMethod::None]
}

/// Default per-stage handshake timeout in seconds
fn default_handshake_timeout() -> u64 {
    10
}

/// Default destination connect timeout in seconds
fn default_connect_timeout() -> u64 {
    10
}

/// Default relay idle timeout in seconds
fn default_idle_timeout() -> u64 {
    300
}

fn default_relay_buffer_size() -> usize {
    DEFAULT_RELAY_BUFFER_SIZE
}

/// One `[[server.users]]` entry
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Eq)]
pub struct UserConfig {
    /// Username, 1 to 255 bytes
    pub username: String,
    /// Password, 1 to 255 bytes
    pub password: String,
}

/// SOCKS5 server configuration
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Eq)]
pub struct ServerConfig {
    /// Address to accept clients on
    #[serde(default = "default_listen_addr")]
    pub listen_addr: String,

    /// Accepted methods, most preferred first
    #[serde(default = "default_methods")]
    pub methods: Vec<AuthMethod>,

    /// Credentials accepted by the password method
    #[serde(default)]
    pub users: Vec<UserConfig>,

    /// Limit for each handshake stage, in seconds
    #[serde(default = "default_handshake_timeout")]
    pub handshake_timeout: u64,

    /// Destination connect timeout, in seconds
    #[serde(default = "default_connect_timeout")]
    pub connect_timeout: u64,

    /// Relay idle timeout in seconds (0 disables)
    #[serde(default = "default_idle_timeout")]
    pub idle_timeout: u64,

    /// REP byte mapping for failures
    #[serde(default)]
    pub reply_codes: ReplyMode,

    /// Copy buffer size for each relay direction
    #[serde(default = "default_relay_buffer_size")]
    pub relay_buffer_size: usize,

    /// Socket options for destination connections
    #[serde(default)]
    pub tcp: TcpConfig,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            listen_addr: default_listen_addr(),
            methods: default_methods(),
            users: Vec::new(),
            handshake_timeout: default_handshake_timeout(),
            connect_timeout: default_connect_timeout(),
            idle_timeout: default_idle_timeout(),
            reply_codes: ReplyMode::default(),
            relay_buffer_size: default_relay_buffer_size(),
            tcp: TcpConfig::default(),
        }
    }
}

impl ServerConfig {
    /// Check if the password method is enabled
    pub fn requires_password(&self) -> bool {
        self.methods.contains(&AuthMethod::Password)
    }

    /// Validate the configuration
    pub fn validate(&self) -> Result<(), String> {
        if self.listen_addr.is_empty() {
            return Err("Server listen address is empty".to_string());
        }
        if self.methods.is_empty() {
            return Err("At least one authentication method must be configured".to_string());
        }
        if self.requires_password() && self.users.is_empty() {
            return Err("Password method enabled but no users configured".to_string());
        }
        for user in &self.users {
            validate_field_len("username", &user.username)?;
            validate_field_len("password", &user.password)?;
        }
        if self.handshake_timeout == 0 {
            return Err("Handshake timeout must be greater than 0".to_string());
        }
        if self.connect_timeout == 0 {
            return Err("Connect timeout must be greater than 0".to_string());
        }
        if self.relay_buffer_size == 0 {
            return Err("Relay buffer size must be greater than 0".to_string());
        }
        Ok(())
    }
}

pub(crate) fn validate_field_len(name: &str, value: impl AsRef<[u8]>) -> Result<(), String> {
    let value = value.as_ref();
    if value.is_empty() || value.len() > MAX_FIELD_LEN {
        return Err(format!(
            "Invalid {} length {}: must be 1 to {} bytes",
            name,
            value.len(),
            MAX_FIELD_LEN
        ));
    }
    Ok(())
}
