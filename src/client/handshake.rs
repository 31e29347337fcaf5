//! Client half of the SOCKS5 handshake
//!
//! Each function writes one request frame and reads the matching reply.

use crate::error::Socks5Error;
use crate::socks::{
    encode_address, encode_port, Address, AuthMethod, Credentials, TargetAddr,
    SOCKS5_ADDR_TYPE_IPV6, SOCKS5_AUTH_METHOD_NOT_ACCEPTABLE, SOCKS5_AUTH_STATUS_SUCCESS,
    SOCKS5_AUTH_VERSION, SOCKS5_CMD_TCP_CONNECT, SOCKS5_RESERVED, SOCKS5_VERSION, MAX_FIELD_LEN,
};
use bytes::{BufMut, BytesMut};
use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt};
use tracing::debug;

/// Offer `methods` and return the one the proxy picked.
///
/// At most 255 methods fit the NMETHODS byte; more is an error and nothing
/// is written.
pub async fn offer_methods<S>(stream: &mut S, methods: &[AuthMethod]) -> Result<AuthMethod, Socks5Error>
where
    S: AsyncRead + AsyncWrite + Unpin,
{
    if methods.len() > MAX_FIELD_LEN {
        return Err(Socks5Error::TooManyMethods(methods.len()));
    }

    let mut request = BytesMut::with_capacity(2 + methods.len());
    request.put_u8(SOCKS5_VERSION);
    request.put_u8(methods.len() as u8);
    for method in methods {
        request.put_u8(method.to_byte());
    }
    stream.write_all(&request).await?;
    stream.flush().await?;

    let mut reply = [0u8; 2];
    stream.read_exact(&mut reply).await?;

    if reply[0] != SOCKS5_VERSION {
        return Err(Socks5Error::UnsupportedVersion(reply[0]));
    }
    if reply[1] == SOCKS5_AUTH_METHOD_NOT_ACCEPTABLE {
        return Err(Socks5Error::NoAcceptableMethod);
    }

    // a method we never offered is as good as a refusal
    let selected = AuthMethod::from_byte(reply[1])
        .filter(|m| methods.contains(m))
        .ok_or(Socks5Error::NoAcceptableMethod)?;

    debug!("Proxy selected method {}", selected);
    Ok(selected)
}

/// Run the username/password sub-negotiation.
///
/// A non-zero status from the proxy is [`Socks5Error::AuthFailed`].
pub async fn send_credentials<S>(stream: &mut S, credentials: &Credentials) -> Result<(), Socks5Error>
where
    S: AsyncRead + AsyncWrite + Unpin,
{
    let mut request = BytesMut::with_capacity(
        3 + credentials.username.len() + credentials.password.len(),
    );
    request.put_u8(SOCKS5_AUTH_VERSION);
    request.put_u8(credentials.username.len() as u8);
    request.put_slice(&credentials.username);
    request.put_u8(credentials.password.len() as u8);
    request.put_slice(&credentials.password);
    stream.write_all(&request).await?;
    stream.flush().await?;

    let mut reply = [0u8; 2];
    stream.read_exact(&mut reply).await?;

    if reply[0] != SOCKS5_AUTH_VERSION {
        return Err(Socks5Error::UnsupportedVersion(reply[0]));
    }
    if reply[1] != SOCKS5_AUTH_STATUS_SUCCESS {
        return Err(Socks5Error::AuthFailed);
    }

    Ok(())
}

/// Send a CONNECT request for `target`.
///
/// IPv6 destinations are refused before anything is written.
pub async fn send_connect<S>(stream: &mut S, target: &TargetAddr) -> Result<(), Socks5Error>
where
    S: AsyncWrite + Unpin,
{
    if let Address::Ipv6(_) = target.host {
        return Err(Socks5Error::AddressTypeNotSupported(SOCKS5_ADDR_TYPE_IPV6));
    }

    let mut request = BytesMut::with_capacity(3 + 1 + 1 + 255 + 2);
    request.put_u8(SOCKS5_VERSION);
    request.put_u8(SOCKS5_CMD_TCP_CONNECT);
    request.put_u8(SOCKS5_RESERVED);
    encode_address(&target.host, &mut request)?;
    encode_port(target.port, &mut request);

    stream.write_all(&request).await?;
    stream.flush().await?;
    Ok(())
}
