//! SOCKS5 address codec
//!
//! Reads and writes the ATYP-tagged address and the big-endian port that
//! appear in both requests and replies.

use super::consts::*;
use super::types::{Address, TargetAddr};
use crate::error::Socks5Error;
use bytes::BufMut;
use std::net::Ipv4Addr;
use tokio::io::{AsyncRead, AsyncReadExt};

/// Decode the address that follows an already-read ATYP byte.
///
/// Exactly the bytes belonging to the address are consumed. IPv6 is a known
/// tag but is reported as [`Socks5Error::AddressTypeNotSupported`] before its
/// 16 octets are read. A short read surfaces as [`Socks5Error::Io`].
pub async fn decode_address<S>(atyp: u8, stream: &mut S) -> Result<Address, Socks5Error>
where
    S: AsyncRead + Unpin,
{
    match atyp {
        SOCKS5_ADDR_TYPE_IPV4 => {
            let mut octets = [0u8; 4];
            stream.read_exact(&mut octets).await?;
            Ok(Address::Ipv4(Ipv4Addr::from(octets)))
        }

        SOCKS5_ADDR_TYPE_DOMAIN => {
            let len = stream.read_u8().await? as usize;
            if len == 0 {
                return Err(Socks5Error::InvalidDomain("empty domain".to_string()));
            }

            let mut buf = vec![0u8; len];
            stream.read_exact(&mut buf).await?;
            let domain = String::from_utf8(buf).map_err(|e| {
                Socks5Error::InvalidDomain(String::from_utf8_lossy(e.as_bytes()).into_owned())
            })?;

            Ok(Address::Domain(domain))
        }

        SOCKS5_ADDR_TYPE_IPV6 => Err(Socks5Error::AddressTypeNotSupported(atyp)),

        other => Err(Socks5Error::InvalidAddressType(other)),
    }
}

/// Decode a 2-byte big-endian port.
pub async fn decode_port<S>(stream: &mut S) -> Result<u16, Socks5Error>
where
    S: AsyncRead + Unpin,
{
    Ok(stream.read_u16().await?)
}

/// Decode `ATYP ADDR PORT` as one unit.
pub async fn decode_target<S>(stream: &mut S) -> Result<TargetAddr, Socks5Error>
where
    S: AsyncRead + Unpin,
{
    let atyp = stream.read_u8().await?;
    let host = decode_address(atyp, stream).await?;
    let port = decode_port(stream).await?;
    Ok(TargetAddr { host, port })
}

/// Append `ATYP ADDR` to `buf`.
///
/// Domains longer than 255 bytes cannot be framed and are rejected.
pub fn encode_address<B: BufMut>(address: &Address, buf: &mut B) -> Result<(), Socks5Error> {
    match address {
        Address::Ipv4(ip) => {
            buf.put_u8(address.addr_type());
            buf.put_slice(&ip.octets());
        }
        Address::Domain(domain) => {
            let bytes = domain.as_bytes();
            if bytes.is_empty() || bytes.len() > MAX_FIELD_LEN {
                return Err(Socks5Error::InvalidDomain(domain.clone()));
            }
            buf.put_u8(address.addr_type());
            buf.put_u8(bytes.len() as u8);
            buf.put_slice(bytes);
        }
        Address::Ipv6(ip) => {
            buf.put_u8(address.addr_type());
            buf.put_slice(&ip.octets());
        }
    }
    Ok(())
}

/// Append a big-endian port to `buf`.
pub fn encode_port<B: BufMut>(port: u16, buf: &mut B) {
    buf.put_u16(port);
}

#[cfg(test)]
mod tests {
    use super::*;
    use bytes::BytesMut;
    use std::io::Cursor;
    use std::net::Ipv6Addr;

    async fn round_trip(address: Address, port: u16) -> (Address, u16, usize) {
        let mut buf = BytesMut::new();
        encode_address(&address, &mut buf).unwrap();
        encode_port(port, &mut buf);
        let written = buf.len();

        let mut cursor = Cursor::new(buf.to_vec());
        let target = decode_target(&mut cursor).await.unwrap();
        assert_eq!(cursor.position() as usize, written);
        (target.host, target.port, written)
    }

    #[tokio::test]
    async fn test_ipv4_round_trip_boundaries() {
        for ip in [Ipv4Addr::new(0, 0, 0, 0), Ipv4Addr::new(255, 255, 255, 255)] {
            let (decoded, port, written) = round_trip(Address::Ipv4(ip), 65535).await;
            assert_eq!(decoded, Address::Ipv4(ip));
            assert_eq!(port, 65535);
            assert_eq!(written, 1 + 4 + 2);
        }
    }

    #[tokio::test]
    async fn test_domain_round_trip_lengths() {
        for len in [1usize, 63, 255] {
            let domain = "a".repeat(len);
            let (decoded, port, written) =
                round_trip(Address::Domain(domain.clone()), 443).await;
            assert_eq!(decoded, Address::Domain(domain));
            assert_eq!(port, 443);
            assert_eq!(written, 1 + 1 + len + 2);
        }
    }

    #[test]
    fn test_encode_ipv4_bytes() {
        let mut buf = BytesMut::new();
        encode_address(&Address::Ipv4(Ipv4Addr::new(127, 0, 0, 1)), &mut buf).unwrap();
        encode_port(9090, &mut buf);
        assert_eq!(&buf[..], &[0x01, 127, 0, 0, 1, 0x23, 0x82]);
    }

    #[test]
    fn test_encode_domain_bytes() {
        let mut buf = BytesMut::new();
        encode_address(&Address::Domain("example.com".into()), &mut buf).unwrap();
        assert_eq!(buf[0], SOCKS5_ADDR_TYPE_DOMAIN);
        assert_eq!(buf[1], 11);
        assert_eq!(&buf[2..], b"example.com");
    }

    #[test]
    fn test_encode_domain_too_long() {
        let mut buf = BytesMut::new();
        let result = encode_address(&Address::Domain("a".repeat(256)), &mut buf);
        assert!(matches!(result, Err(Socks5Error::InvalidDomain(_))));
        assert!(buf.is_empty());
    }

    #[test]
    fn test_encode_ipv6_bytes() {
        let mut buf = BytesMut::new();
        encode_address(&Address::Ipv6(Ipv6Addr::LOCALHOST), &mut buf).unwrap();
        assert_eq!(buf[0], SOCKS5_ADDR_TYPE_IPV6);
        assert_eq!(buf.len(), 17);
    }

    #[tokio::test]
    async fn test_decode_ipv6_not_supported_consumes_nothing() {
        let mut cursor = Cursor::new(vec![0u8; 18]);
        let result = decode_address(SOCKS5_ADDR_TYPE_IPV6, &mut cursor).await;
        assert!(matches!(
            result,
            Err(Socks5Error::AddressTypeNotSupported(0x04))
        ));
        assert_eq!(cursor.position(), 0);
    }

    #[tokio::test]
    async fn test_decode_unknown_type() {
        let mut cursor = Cursor::new(vec![1, 2, 3, 4]);
        let result = decode_address(0x02, &mut cursor).await;
        assert!(matches!(result, Err(Socks5Error::InvalidAddressType(0x02))));
    }

    #[tokio::test]
    async fn test_decode_empty_domain() {
        let mut cursor = Cursor::new(vec![0u8, 0x00, 0x50]);
        let result = decode_address(SOCKS5_ADDR_TYPE_DOMAIN, &mut cursor).await;
        assert!(matches!(result, Err(Socks5Error::InvalidDomain(_))));
    }

    #[tokio::test]
    async fn test_decode_invalid_utf8_domain() {
        let mut cursor = Cursor::new(vec![2u8, 0xff, 0xfe]);
        let result = decode_address(SOCKS5_ADDR_TYPE_DOMAIN, &mut cursor).await;
        assert!(matches!(result, Err(Socks5Error::InvalidDomain(_))));
    }

    #[tokio::test]
    async fn test_decode_short_read_is_io_error() {
        let mut cursor = Cursor::new(vec![10u8, 0]);
        let result = decode_address(SOCKS5_ADDR_TYPE_IPV4, &mut cursor).await;
        match result {
            Err(Socks5Error::Io(e)) => assert_eq!(e.kind(), std::io::ErrorKind::UnexpectedEof),
            other => panic!("expected io error, got {:?}", other),
        }

        // length byte promises more than the stream holds
        let mut cursor = Cursor::new(vec![5u8, b'a', b'b']);
        let result = decode_address(SOCKS5_ADDR_TYPE_DOMAIN, &mut cursor).await;
        assert!(matches!(result, Err(Socks5Error::Io(_))));
    }

    #[tokio::test]
    async fn test_decode_port_big_endian() {
        let mut cursor = Cursor::new(vec![0x01, 0xbb]);
        assert_eq!(decode_port(&mut cursor).await.unwrap(), 443);

        let mut cursor = Cursor::new(vec![0x01]);
        assert!(matches!(
            decode_port(&mut cursor).await,
            Err(Socks5Error::Io(_))
        ));
    }
}
