//! TCP relay for SOCKS5 CONNECT command
//!
//! Copies bytes in both directions between the client and the destination
//! once the handshake has finished.

use crate::error::Socks5Error;
use crate::socks::consts::DEFAULT_RELAY_BUFFER_SIZE;
use std::io;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;
use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt};
use tokio::time::Instant;
use tracing::debug;

/// Relay tuning
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RelayOptions {
    /// Size of the copy buffer for each direction
    pub buffer_size: usize,
    /// Tear the relay down after this long without traffic in either direction
    pub idle_timeout: Option<Duration>,
}

impl Default for RelayOptions {
    fn default() -> Self {
        RelayOptions {
            buffer_size: DEFAULT_RELAY_BUFFER_SIZE,
            idle_timeout: None,
        }
    }
}

/// Bytes moved by a finished relay
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RelayStats {
    /// Client to destination
    pub client_to_target: u64,
    /// Destination to client
    pub target_to_client: u64,
}

/// Millisecond timestamp of the last successful read, relative to `start`
struct Activity {
    start: Instant,
    last_ms: AtomicU64,
}

impl Activity {
    fn new() -> Self {
        Activity {
            start: Instant::now(),
            last_ms: AtomicU64::new(0),
        }
    }

    fn touch(&self) {
        let elapsed = self.start.elapsed().as_millis() as u64;
        self.last_ms.store(elapsed, Ordering::Relaxed);
    }

    fn last(&self) -> Instant {
        self.start + Duration::from_millis(self.last_ms.load(Ordering::Relaxed))
    }
}

/// Relay data bidirectionally between two streams
///
/// Returns as soon as either direction reaches EOF, fails, or the idle
/// timeout fires. Both write halves are then shut down and both streams are
/// dropped, so the direction still pending is released as well. The first
/// error seen is the relay's result.
pub async fn relay<A, B>(
    client: A,
    target: B,
    options: &RelayOptions,
) -> Result<RelayStats, Socks5Error>
where
    A: AsyncRead + AsyncWrite + Unpin,
    B: AsyncRead + AsyncWrite + Unpin,
{
    let (mut client_read, mut client_write) = tokio::io::split(client);
    let (mut target_read, mut target_write) = tokio::io::split(target);

    let up = AtomicU64::new(0);
    let down = AtomicU64::new(0);
    let activity = Activity::new();
    let buffer_size = options.buffer_size.max(1);

    let outcome = {
        let client_to_target = copy_half(
            &mut client_read,
            &mut target_write,
            buffer_size,
            &up,
            &activity,
        );
        let target_to_client = copy_half(
            &mut target_read,
            &mut client_write,
            buffer_size,
            &down,
            &activity,
        );

        tokio::select! {
            result = client_to_target => {
                debug!("client->target finished: {:?}", result);
                result.map_err(Socks5Error::from)
            }
            result = target_to_client => {
                debug!("target->client finished: {:?}", result);
                result.map_err(Socks5Error::from)
            }
            _ = idle_watch(options.idle_timeout, &activity) => {
                debug!("Relay idle for {:?}, closing", options.idle_timeout);
                Err(Socks5Error::Timeout("relay idle"))
            }
        }
    };

    let _ = target_write.shutdown().await;
    let _ = client_write.shutdown().await;

    let stats = RelayStats {
        client_to_target: up.load(Ordering::Relaxed),
        target_to_client: down.load(Ordering::Relaxed),
    };
    debug!(
        "Relay closed: {} bytes up, {} bytes down",
        stats.client_to_target, stats.target_to_client
    );

    outcome.map(|_| stats)
}

/// Copy until EOF or error, reusing one buffer.
async fn copy_half<R, W>(
    reader: &mut R,
    writer: &mut W,
    buffer_size: usize,
    counter: &AtomicU64,
    activity: &Activity,
) -> io::Result<()>
where
    R: AsyncRead + Unpin,
    W: AsyncWrite + Unpin,
{
    let mut buf = vec![0u8; buffer_size];
    loop {
        let n = reader.read(&mut buf).await?;
        if n == 0 {
            return Ok(());
        }
        activity.touch();
        writer.write_all(&buf[..n]).await?;
        writer.flush().await?;
        counter.fetch_add(n as u64, Ordering::Relaxed);
    }
}

/// Resolves once no traffic has been seen for `idle`; never resolves when
/// `idle` is `None`.
async fn idle_watch(idle: Option<Duration>, activity: &Activity) {
    let Some(idle) = idle else {
        return std::future::pending().await;
    };

    loop {
        let deadline = activity.last() + idle;
        if Instant::now() >= deadline {
            return;
        }
        tokio::time::sleep_until(deadline).await;
    }
}
