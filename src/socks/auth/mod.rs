//! SOCKS5 authentication module
//!
//! Handles method negotiation and the username/password sub-negotiation.

mod password;

pub use password::{authenticate, CredentialVerifier, UserTable};

use super::consts::*;
use super::types::MethodSet;
use crate::error::Socks5Error;
use serde::{Deserialize, Serialize};
use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt};
use tracing::debug;

/// Authentication method types
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AuthMethod {
    /// No authentication required
    None,
    /// Username/password authentication
    Password,
}

impl AuthMethod {
    /// Convert to SOCKS5 method byte
    pub fn to_byte(self) -> u8 {
        match self {
            AuthMethod::None => SOCKS5_AUTH_METHOD_NONE,
            AuthMethod::Password => SOCKS5_AUTH_METHOD_PASSWORD,
        }
    }

    /// Parse from SOCKS5 method byte
    pub fn from_byte(byte: u8) -> Option<Self> {
        match byte {
            SOCKS5_AUTH_METHOD_NONE => Some(AuthMethod::None),
            SOCKS5_AUTH_METHOD_PASSWORD => Some(AuthMethod::Password),
            _ => None,
        }
    }
}

impl std::fmt::Display for AuthMethod {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            AuthMethod::None => write!(f, "none"),
            AuthMethod::Password => write!(f, "password"),
        }
    }
}

/// Decides which method the server uses for a given client offer.
pub trait MethodPolicy: Send + Sync {
    /// Pick a method from `offered`, or `None` when nothing is acceptable
    fn select(&self, offered: &MethodSet) -> Option<AuthMethod>;
}

/// Server preference order: the first configured method the client offered wins.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PreferenceList {
    methods: Vec<AuthMethod>,
}

impl PreferenceList {
    /// Create a policy from methods in order of preference
    pub fn new(methods: Vec<AuthMethod>) -> Self {
        PreferenceList { methods }
    }

    /// Policy accepting exactly one method
    pub fn only(method: AuthMethod) -> Self {
        PreferenceList {
            methods: vec![method],
        }
    }

    /// Configured methods in preference order
    pub fn methods(&self) -> &[AuthMethod] {
        &self.methods
    }
}

impl MethodPolicy for PreferenceList {
    fn select(&self, offered: &MethodSet) -> Option<AuthMethod> {
        self.methods
            .iter()
            .copied()
            .find(|m| offered.contains(m.to_byte()))
    }
}

/// Run the method negotiation on `stream`.
///
/// # Protocol
///
/// ```text
/// client: VER | NMETHODS | METHODS (NMETHODS bytes)
/// server: VER | METHOD
/// ```
///
/// Writes `{5, M}` and returns `M` when the policy finds a match. Otherwise
/// writes `{5, 0xFF}` and returns [`Socks5Error::NoAcceptableMethod`]; the
/// caller closes the connection. A wrong version byte aborts without writing.
pub async fn negotiate<S>(stream: &mut S, policy: &dyn MethodPolicy) -> Result<AuthMethod, Socks5Error>
where
    S: AsyncRead + AsyncWrite + Unpin,
{
    let mut buf = [0u8; 2];
    stream.read_exact(&mut buf).await?;

    let version = buf[0];
    let num_methods = buf[1] as usize;

    if version != SOCKS5_VERSION {
        return Err(Socks5Error::UnsupportedVersion(version));
    }

    let mut methods = vec![0u8; num_methods];
    stream.read_exact(&mut methods).await?;
    let offered = MethodSet::from_bytes(&methods);

    let selected = policy.select(&offered);

    stream
        .write_all(&[
            SOCKS5_VERSION,
            selected
                .map(|m| m.to_byte())
                .unwrap_or(SOCKS5_AUTH_METHOD_NOT_ACCEPTABLE),
        ])
        .await?;
    stream.flush().await?;

    match selected {
        Some(method) => {
            debug!("Negotiated method {} (offered {:?})", method, methods);
            Ok(method)
        }
        None => {
            debug!("No acceptable method among {:?}", methods);
            Err(Socks5Error::NoAcceptableMethod)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio_test::io::Builder;

    #[test]
    fn test_auth_method_to_byte() {
        assert_eq!(AuthMethod::None.to_byte(), SOCKS5_AUTH_METHOD_NONE);
        assert_eq!(AuthMethod::Password.to_byte(), SOCKS5_AUTH_METHOD_PASSWORD);
    }

    #[test]
    fn test_auth_method_from_byte() {
        assert_eq!(AuthMethod::from_byte(0), Some(AuthMethod::None));
        assert_eq!(AuthMethod::from_byte(2), Some(AuthMethod::Password));
        assert_eq!(AuthMethod::from_byte(1), None); // GSSAPI not implemented
        assert_eq!(AuthMethod::from_byte(255), None);
    }

    #[test]
    fn test_preference_list_first_match_wins() {
        let policy = PreferenceList::new(vec![AuthMethod::Password, AuthMethod::None]);

        let offered = MethodSet::from_bytes(&[SOCKS5_AUTH_METHOD_NONE, SOCKS5_AUTH_METHOD_PASSWORD]);
        assert_eq!(policy.select(&offered), Some(AuthMethod::Password));

        let offered = MethodSet::from_bytes(&[SOCKS5_AUTH_METHOD_NONE]);
        assert_eq!(policy.select(&offered), Some(AuthMethod::None));

        let offered = MethodSet::from_bytes(&[SOCKS5_AUTH_METHOD_GSSAPI]);
        assert_eq!(policy.select(&offered), None);
    }

    #[test]
    fn test_preference_list_empty_offer() {
        let policy = PreferenceList::only(AuthMethod::None);
        assert_eq!(policy.select(&MethodSet::from_bytes(&[])), None);
    }

    #[tokio::test]
    async fn test_negotiate_selects_required_method() {
        let mut stream = Builder::new()
            .read(&[0x05, 0x01, 0x00])
            .write(&[0x05, 0x00])
            .build();

        let method = negotiate(&mut stream, &PreferenceList::only(AuthMethod::None))
            .await
            .unwrap();
        assert_eq!(method, AuthMethod::None);
    }

    #[tokio::test]
    async fn test_negotiate_password_among_many() {
        let mut stream = Builder::new()
            .read(&[0x05, 0x03, 0x00, 0x01, 0x02])
            .write(&[0x05, 0x02])
            .build();

        let method = negotiate(&mut stream, &PreferenceList::only(AuthMethod::Password))
            .await
            .unwrap();
        assert_eq!(method, AuthMethod::Password);
    }

    #[tokio::test]
    async fn test_negotiate_rejects_gssapi_only() {
        let mut stream = Builder::new()
            .read(&[0x05, 0x01, 0x01])
            .write(&[0x05, 0xFF])
            .build();

        let result = negotiate(&mut stream, &PreferenceList::only(AuthMethod::Password)).await;
        assert!(matches!(result, Err(Socks5Error::NoAcceptableMethod)));
    }

    #[tokio::test]
    async fn test_negotiate_zero_methods() {
        let mut stream = Builder::new()
            .read(&[0x05, 0x00])
            .write(&[0x05, 0xFF])
            .build();

        let result = negotiate(&mut stream, &PreferenceList::only(AuthMethod::None)).await;
        assert!(matches!(result, Err(Socks5Error::NoAcceptableMethod)));
    }

    #[tokio::test]
    async fn test_negotiate_wrong_version_writes_nothing() {
        let mut stream = Builder::new().read(&[0x04, 0x01]).build();

        let result = negotiate(&mut stream, &PreferenceList::only(AuthMethod::None)).await;
        assert!(matches!(result, Err(Socks5Error::UnsupportedVersion(4))));
    }

    #[tokio::test]
    async fn test_negotiate_short_method_list() {
        let mut stream = Builder::new().read(&[0x05, 0x03, 0x00]).build();

        let result = negotiate(&mut stream, &PreferenceList::only(AuthMethod::None)).await;
        assert!(matches!(result, Err(Socks5Error::Io(_))));
    }
}
