//! Username/password authentication handler
//!
//! Server half of the RFC 1929 username/password sub-negotiation. The
//! version byte on both frames is [`SOCKS5_AUTH_VERSION`].

use crate::error::Socks5Error;
use crate::socks::consts::*;
use async_trait::async_trait;
use std::collections::HashMap;
use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt};
use tracing::{debug, warn};

/// Checks a username/password pair.
///
/// Shared read-only across connection tasks.
#[async_trait]
pub trait CredentialVerifier: Send + Sync {
    /// Return `true` when the pair is accepted
    async fn verify(&self, username: &[u8], password: &[u8]) -> bool;
}

#[async_trait]
impl<F> CredentialVerifier for F
where
    F: Fn(&[u8], &[u8]) -> bool + Send + Sync,
{
    async fn verify(&self, username: &[u8], password: &[u8]) -> bool {
        self(username, password)
    }
}

/// Static username to password table
#[derive(Debug, Clone, Default)]
pub struct UserTable {
    users: HashMap<Vec<u8>, Vec<u8>>,
}

impl UserTable {
    /// Create an empty table
    pub fn new() -> Self {
        Self::default()
    }

    /// Add or replace a user
    pub fn insert(&mut self, username: impl Into<Vec<u8>>, password: impl Into<Vec<u8>>) {
        self.users.insert(username.into(), password.into());
    }

    /// Number of users
    pub fn len(&self) -> usize {
        self.users.len()
    }

    /// Whether the table has no users
    pub fn is_empty(&self) -> bool {
        self.users.is_empty()
    }
}

impl<U, P> FromIterator<(U, P)> for UserTable
where
    U: Into<Vec<u8>>,
    P: Into<Vec<u8>>,
{
    fn from_iter<I: IntoIterator<Item = (U, P)>>(iter: I) -> Self {
        let mut table = UserTable::new();
        for (u, p) in iter {
            table.insert(u, p);
        }
        table
    }
}

#[async_trait]
impl CredentialVerifier for UserTable {
    async fn verify(&self, username: &[u8], password: &[u8]) -> bool {
        self.users
            .get(username)
            .map(|expected| expected.as_slice() == password)
            .unwrap_or(false)
    }
}

/// Perform username/password authentication
///
/// # Protocol
///
/// Client sends:
/// ```text
/// +----+------+----------+------+----------+
/// |VER | ULEN |  UNAME   | PLEN |  PASSWD  |
/// +----+------+----------+------+----------+
/// | 1  |  1   | 1 to 255 |  1   | 1 to 255 |
/// +----+------+----------+------+----------+
/// ```
///
/// Server responds:
/// ```text
/// +----+--------+
/// |VER | STATUS |
/// +----+--------+
/// | 1  |   1    |
/// +----+--------+
/// ```
///
/// Rejected credentials are a normal outcome: the failure status is written
/// and `Ok(false)` returned. The connection is left open for the caller.
pub async fn authenticate<S>(
    stream: &mut S,
    verifier: &dyn CredentialVerifier,
) -> Result<bool, Socks5Error>
where
    S: AsyncRead + AsyncWrite + Unpin,
{
    let mut buf = [0u8; 2];
    stream.read_exact(&mut buf).await?;

    let version = buf[0];
    let username_len = buf[1] as usize;

    if version != SOCKS5_AUTH_VERSION {
        return Err(Socks5Error::UnsupportedVersion(version));
    }

    if username_len == 0 {
        send_auth_result(stream, SOCKS5_AUTH_STATUS_FAILURE).await?;
        return Err(Socks5Error::InvalidCredentialLength(username_len));
    }

    let mut username = vec![0u8; username_len];
    stream.read_exact(&mut username).await?;

    let password_len = stream.read_u8().await? as usize;

    if password_len == 0 {
        send_auth_result(stream, SOCKS5_AUTH_STATUS_FAILURE).await?;
        return Err(Socks5Error::InvalidCredentialLength(password_len));
    }

    let mut password = vec![0u8; password_len];
    stream.read_exact(&mut password).await?;

    let accepted = verifier.verify(&username, &password).await;
    let status = if accepted {
        SOCKS5_AUTH_STATUS_SUCCESS
    } else {
        SOCKS5_AUTH_STATUS_FAILURE
    };
    send_auth_result(stream, status).await?;

    let user = String::from_utf8_lossy(&username);
    if accepted {
        debug!("Authentication successful for user: {}", user);
    } else {
        warn!("Authentication failed for user: {}", user);
    }

    Ok(accepted)
}

/// Send authentication result to client
async fn send_auth_result<S: AsyncWrite + Unpin>(stream: &mut S, status: u8) -> std::io::Result<()> {
    stream.write_all(&[SOCKS5_AUTH_VERSION, status]).await?;
    stream.flush().await
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;
    use std::pin::Pin;
    use std::task::{Context, Poll};
    use tokio::io::ReadBuf;
    use tokio_test::io::Builder;

    /// Reads from a fixed buffer and records everything written
    struct RecordingStream {
        input: Cursor<Vec<u8>>,
        output: Vec<u8>,
    }

    impl AsyncRead for RecordingStream {
        fn poll_read(
            mut self: Pin<&mut Self>,
            cx: &mut Context<'_>,
            buf: &mut ReadBuf<'_>,
        ) -> Poll<std::io::Result<()>> {
            Pin::new(&mut self.input).poll_read(cx, buf)
        }
    }

    impl AsyncWrite for RecordingStream {
        fn poll_write(
            mut self: Pin<&mut Self>,
            cx: &mut Context<'_>,
            buf: &[u8],
        ) -> Poll<std::io::Result<usize>> {
            Pin::new(&mut self.output).poll_write(cx, buf)
        }

        fn poll_flush(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<std::io::Result<()>> {
            Pin::new(&mut self.output).poll_flush(cx)
        }

        fn poll_shutdown(
            mut self: Pin<&mut Self>,
            cx: &mut Context<'_>,
        ) -> Poll<std::io::Result<()>> {
            Pin::new(&mut self.output).poll_shutdown(cx)
        }
    }

    fn create_auth_request(username: &[u8], password: &[u8]) -> Vec<u8> {
        let mut request = Vec::new();
        request.push(SOCKS5_AUTH_VERSION);
        request.push(username.len() as u8);
        request.extend_from_slice(username);
        request.push(password.len() as u8);
        request.extend_from_slice(password);
        request
    }

    fn table() -> UserTable {
        [("user", "pass")].into_iter().collect()
    }

    #[tokio::test]
    async fn test_authenticate_success() {
        let mut stream = Builder::new()
            .read(&create_auth_request(b"user", b"pass"))
            .write(&[0x05, 0x00])
            .build();

        assert!(authenticate(&mut stream, &table()).await.unwrap());
    }

    #[tokio::test]
    async fn test_authenticate_wrong_password() {
        let mut stream = Builder::new()
            .read(&create_auth_request(b"user", b"nope"))
            .write(&[0x05, 0x01])
            .build();

        assert!(!authenticate(&mut stream, &table()).await.unwrap());
    }

    #[tokio::test]
    async fn test_authenticate_unknown_user() {
        let mut stream = Builder::new()
            .read(&create_auth_request(b"admin", b"pass"))
            .write(&[0x05, 0x01])
            .build();

        assert!(!authenticate(&mut stream, &table()).await.unwrap());
    }

    #[tokio::test]
    async fn test_authenticate_consumes_exact_bytes() {
        for len in [1usize, 255] {
            let username = vec![b'u'; len];
            let password = vec![b'p'; len];
            let verifier = UserTable::from_iter([(username.clone(), password.clone())]);

            let mut input = create_auth_request(&username, &password);
            let frame_len = input.len();
            assert_eq!(frame_len, 2 + len + 1 + len);
            input.extend_from_slice(b"trailing request bytes");

            let mut stream = RecordingStream {
                input: Cursor::new(input),
                output: Vec::new(),
            };
            assert!(authenticate(&mut stream, &verifier).await.unwrap());
            assert_eq!(stream.input.position() as usize, frame_len);
            assert_eq!(stream.output, vec![0x05, 0x00]);
        }
    }

    #[tokio::test]
    async fn test_authenticate_rfc1929_version_rejected() {
        let mut request = create_auth_request(b"user", b"pass");
        request[0] = 0x01;
        let mut stream = Builder::new().read(&request[..2]).build();

        let result = authenticate(&mut stream, &table()).await;
        assert!(matches!(result, Err(Socks5Error::UnsupportedVersion(1))));
    }

    #[tokio::test]
    async fn test_authenticate_zero_username_length() {
        let mut stream = Builder::new()
            .read(&[0x05, 0x00])
            .write(&[0x05, 0x01])
            .build();

        let result = authenticate(&mut stream, &table()).await;
        assert!(matches!(
            result,
            Err(Socks5Error::InvalidCredentialLength(0))
        ));
    }

    #[tokio::test]
    async fn test_authenticate_zero_password_length() {
        let mut stream = Builder::new()
            .read(&[0x05, 0x04])
            .read(b"user")
            .read(&[0x00])
            .write(&[0x05, 0x01])
            .build();

        let result = authenticate(&mut stream, &table()).await;
        assert!(matches!(
            result,
            Err(Socks5Error::InvalidCredentialLength(0))
        ));
    }

    #[tokio::test]
    async fn test_authenticate_short_read() {
        let mut stream = Builder::new().read(&[0x05, 0x04, b'u', b's']).build();

        let result = authenticate(&mut stream, &table()).await;
        assert!(matches!(result, Err(Socks5Error::Io(_))));
    }

    #[tokio::test]
    async fn test_closure_verifier() {
        let verifier = |u: &[u8], p: &[u8]| u == b"alice" && p.len() > 3;
        assert!(verifier.verify(b"alice", b"secret").await);
        assert!(!verifier.verify(b"alice", b"abc").await);
        assert!(!verifier.verify(b"bob", b"secret").await);
    }

    #[test]
    fn test_user_table() {
        let mut users = UserTable::new();
        assert!(users.is_empty());
        users.insert("a", "1");
        users.insert("a", "2");
        assert_eq!(users.len(), 1);
    }
}
