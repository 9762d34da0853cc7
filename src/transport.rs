//! Byte-stream transport to the TCP-to-serial bridge.
//!
//! The bridge (e.g. an Elfin EW11) exposes the RS-485 line as a plain TCP
//! socket. The core assumes nothing about it beyond timeout-bounded reads
//! and a write; everything above the [`Transport`] trait works against the
//! trait so capture sessions can be driven by an in-memory transport in
//! tests.
//!
//! Connect/read failures are reported once and end the active session —
//! there is no automatic reconnect.

use std::io::{ErrorKind, Read, Write};
use std::net::{TcpStream, ToSocketAddrs};
use std::time::Duration;

use anyhow::{Context, Result};

use crate::constants::READ_CHUNK_SIZE;

/// Timeout-bounded byte-stream connection to the bus bridge.
pub trait Transport {
    /// Reads whatever bytes are available within `timeout`.
    ///
    /// Returns an empty vector when the timeout elapses with no data; never
    /// blocks past the timeout. An error means the connection is gone.
    fn read_chunk(&mut self, timeout: Duration) -> Result<Vec<u8>>;

    /// Writes raw bytes to the bus.
    fn write_all(&mut self, bytes: &[u8]) -> Result<()>;
}

/// [`Transport`] over a blocking TCP socket with per-read timeouts.
#[derive(Debug)]
pub struct TcpTransport {
    stream: TcpStream,
    peer: String,
}

impl TcpTransport {
    /// Connects to the bridge at `host:port`.
    pub fn connect(host: &str, port: u16) -> Result<Self> {
        let peer = format!("{host}:{port}");
        let addr = (host, port)
            .to_socket_addrs()
            .with_context(|| format!("Failed to resolve {peer}"))?
            .next()
            .with_context(|| format!("No address for {peer}"))?;
        let stream = TcpStream::connect_timeout(&addr, Duration::from_secs(5))
            .with_context(|| format!("Failed to connect to {peer}"))?;
        stream.set_nodelay(true)?;
        log::info!("connected to bridge at {peer}");
        Ok(Self { stream, peer })
    }

    /// The `host:port` this transport is connected to.
    pub fn peer(&self) -> &str {
        &self.peer
    }
}

impl Transport for TcpTransport {
    fn read_chunk(&mut self, timeout: Duration) -> Result<Vec<u8>> {
        self.stream
            .set_read_timeout(Some(timeout))
            .context("Failed to set read timeout")?;

        let mut buf = vec![0u8; READ_CHUNK_SIZE];
        match self.stream.read(&mut buf) {
            Ok(0) => anyhow::bail!("connection to {} closed by peer", self.peer),
            Ok(n) => {
                buf.truncate(n);
                Ok(buf)
            }
            Err(e) if matches!(e.kind(), ErrorKind::WouldBlock | ErrorKind::TimedOut) => {
                Ok(Vec::new())
            }
            Err(e) => Err(e).with_context(|| format!("read from {} failed", self.peer)),
        }
    }

    fn write_all(&mut self, bytes: &[u8]) -> Result<()> {
        Write::write_all(&mut self.stream, bytes)
            .with_context(|| format!("write to {} failed", self.peer))?;
        self.stream.flush()?;
        Ok(())
    }
}
