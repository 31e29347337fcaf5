//! SOCKS5 reply builder
//!
//! Constructs SOCKS5 reply messages and reads them back on the client side.

use crate::error::{Socks5Error, Socks5ReplyCode};
use crate::socks::codec::{decode_port, encode_address, encode_port};
use crate::socks::consts::*;
use crate::socks::types::{Address, TargetAddr};
use bytes::{BufMut, BytesMut};
use serde::{Deserialize, Serialize};
use std::net::{Ipv4Addr, Ipv6Addr, SocketAddr, SocketAddrV4};
use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt};
use tokio::net::TcpStream;

/// How request failures are mapped to the REP byte
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ReplyMode {
    /// Every failure is reported as general failure (0x01)
    #[default]
    Generic,
    /// Failures carry the matching RFC 1928 code
    Detailed,
}

impl ReplyMode {
    /// REP byte to send for `err`
    pub fn code_for(self, err: &Socks5Error) -> u8 {
        match self {
            ReplyMode::Generic => SOCKS5_REPLY_GENERAL_FAILURE,
            ReplyMode::Detailed => Socks5ReplyCode::from(err).into(),
        }
    }
}

/// A reply frame
///
/// ```text
/// +----+-----+-------+------+----------+----------+
/// |VER | REP |  RSV  | ATYP | BND.ADDR | BND.PORT |
/// +----+-----+-------+------+----------+----------+
/// | 1  |  1  | X'00' |  1   | Variable |    2     |
/// +----+-----+-------+------+----------+----------+
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Reply {
    /// REP byte
    pub code: u8,
    /// BND.ADDR / BND.PORT
    pub bound: TargetAddr,
}

impl Reply {
    /// Success reply carrying `bound` as IPv4
    pub fn success(bound: SocketAddrV4) -> Self {
        Reply {
            code: SOCKS5_REPLY_SUCCEEDED,
            bound: TargetAddr::ipv4(*bound.ip(), bound.port()),
        }
    }

    /// Failure reply with the zero-filled `0.0.0.0:0` placeholder
    pub fn failure(code: u8) -> Self {
        Reply {
            code,
            bound: TargetAddr::default(),
        }
    }

    /// Wire bytes of this reply
    pub fn encode(&self) -> Result<BytesMut, Socks5Error> {
        let mut buf = BytesMut::with_capacity(10);
        buf.put_u8(SOCKS5_VERSION);
        buf.put_u8(self.code);
        buf.put_u8(SOCKS5_RESERVED);
        encode_address(&self.bound.host, &mut buf)?;
        encode_port(self.bound.port, &mut buf);
        Ok(buf)
    }
}

/// Bound address for a success reply: the outbound socket's local endpoint,
/// always expressed as IPv4.
fn bound_ipv4(local: SocketAddr) -> SocketAddrV4 {
    match local {
        SocketAddr::V4(addr) => addr,
        SocketAddr::V6(addr) => SocketAddrV4::new(
            addr.ip().to_ipv4_mapped().unwrap_or(Ipv4Addr::UNSPECIFIED),
            addr.port(),
        ),
    }
}

/// Write `reply` to the stream and flush
pub async fn write_reply<S>(stream: &mut S, reply: &Reply) -> Result<(), Socks5Error>
where
    S: AsyncWrite + Unpin,
{
    let bytes = reply.encode()?;
    stream.write_all(&bytes).await?;
    stream.flush().await?;
    Ok(())
}

/// Tell the client its CONNECT succeeded.
///
/// BND.ADDR/BND.PORT are the local endpoint of `target`.
pub async fn write_success_reply<S>(stream: &mut S, target: &TcpStream) -> Result<(), Socks5Error>
where
    S: AsyncWrite + Unpin,
{
    let local = target.local_addr()?;
    write_reply(stream, &Reply::success(bound_ipv4(local))).await
}

/// Tell the client its request failed.
pub async fn write_failure_reply<S>(stream: &mut S, code: u8) -> Result<(), Socks5Error>
where
    S: AsyncWrite + Unpin,
{
    write_reply(stream, &Reply::failure(code)).await
}

/// Read a reply frame (client side).
///
/// Any address type is accepted here, since the whole frame has to be
/// consumed before the relay can start. A non-success REP is returned as
/// [`Socks5Error::Rejected`].
pub async fn read_reply<S>(stream: &mut S) -> Result<Reply, Socks5Error>
where
    S: AsyncRead + Unpin,
{
    let mut header = [0u8; 4];
    stream.read_exact(&mut header).await?;

    let version = header[0];
    let code = header[1];
    let addr_type = header[3];

    if version != SOCKS5_VERSION {
        return Err(Socks5Error::UnsupportedVersion(version));
    }

    let host = match addr_type {
        SOCKS5_ADDR_TYPE_IPV6 => {
            let mut octets = [0u8; 16];
            stream.read_exact(&mut octets).await?;
            Address::Ipv6(Ipv6Addr::from(octets))
        }
        other => crate::socks::codec::decode_address(other, stream).await?,
    };
    let port = decode_port(stream).await?;

    if code != SOCKS5_REPLY_SUCCEEDED {
        return Err(Socks5Error::Rejected(code));
    }

    Ok(Reply {
        code,
        bound: TargetAddr { host, port },
    })
}
