//! SOCKS5 command parser
//!
//! Parses SOCKS5 command requests from the client.

use crate::error::Socks5Error;
use crate::socks::codec::{decode_address, decode_port};
use crate::socks::consts::*;
use crate::socks::types::{Request, SocksCommand, TargetAddr};
use tokio::io::{AsyncRead, AsyncReadExt};

/// Read one request frame from the stream
///
/// # SOCKS5 Request Format
///
/// ```text
/// +----+-----+-------+------+----------+----------+
/// |VER | CMD |  RSV  | ATYP | DST.ADDR | DST.PORT |
/// +----+-----+-------+------+----------+----------+
/// | 1  |  1  | X'00' |  1   | Variable |    2     |
/// +----+-----+-------+------+----------+----------+
/// ```
///
/// The reserved byte is not checked. An unknown command byte is reported only
/// after the whole frame has been consumed, so a reply can still follow.
pub async fn read_request<S>(stream: &mut S) -> Result<Request, Socks5Error>
where
    S: AsyncRead + Unpin,
{
    // VER CMD RSV ATYP
    let mut header = [0u8; 4];
    stream.read_exact(&mut header).await?;

    let version = header[0];
    let cmd_byte = header[1];
    let addr_type = header[3];

    if version != SOCKS5_VERSION {
        return Err(Socks5Error::UnsupportedVersion(version));
    }

    let host = decode_address(addr_type, stream).await?;
    let port = decode_port(stream).await?;
    let target = TargetAddr { host, port };

    let command =
        SocksCommand::from_byte(cmd_byte).ok_or(Socks5Error::CommandNotSupported(cmd_byte))?;

    tracing::debug!("Parsed SOCKS5 command: {} to {}", command, target);

    Ok(Request { command, target })
}
