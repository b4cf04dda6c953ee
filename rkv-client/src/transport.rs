//! # Transport
//!
//! Purpose: Own one TCP socket and move framed bytes and decoded values
//! across it.
//!
//! ## Design Principles
//! 1. **Single Owner**: The connection holds one `TcpStream`; `close` shuts
//!    down the write side and drops the stream, releasing the descriptor once.
//! 2. **Low Latency**: Nagle is disabled and keep-alive enabled at connect.
//! 3. **Carry-Over Buffer**: Bytes read past one response are kept for the
//!    next `receive`, since pipelined replies often share a TCP segment.
//!
//! A connection serves one request/response exchange at a time; the pool's
//! acquire/release discipline is what guarantees a single borrower.

use std::io;
use std::net::SocketAddr;
use std::time::Duration;

use bytes::{Bytes, BytesMut};
use futures::future::BoxFuture;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::{lookup_host, TcpSocket, TcpStream};
use tracing::debug;

use rkv_proto::{decode_stream, ChunkSource, Value};

use crate::error::TransportError;

const READ_CHUNK: usize = 8 * 1024;

/// One live connection to the server.
#[derive(Debug)]
pub struct Connection {
    stream: TcpStream,
    pending: BytesMut,
    peer_addr: SocketAddr,
    local_addr: SocketAddr,
}

impl Connection {
    /// Resolves `host:port` and connects to the first address that accepts.
    ///
    /// `timeout` bounds resolution and handshake together.
    pub async fn connect(
        host: &str,
        port: u16,
        timeout: Option<Duration>,
    ) -> Result<Self, TransportError> {
        let addr = format!("{}:{}", host, port);
        let attempt = open_stream(host, port, &addr);
        let stream = match timeout {
            Some(limit) => tokio::time::timeout(limit, attempt).await.map_err(|_| {
                TransportError::ConnectTimeout {
                    addr: addr.clone(),
                    timeout: limit,
                }
            })??,
            None => attempt.await?,
        };

        let peer_addr = stream.peer_addr()?;
        let local_addr = stream.local_addr()?;
        debug!(%peer_addr, %local_addr, "connection established");
        Ok(Connection {
            stream,
            pending: BytesMut::new(),
            peer_addr,
            local_addr,
        })
    }

    pub fn peer_addr(&self) -> SocketAddr {
        self.peer_addr
    }

    /// Local socket address; unique per live connection.
    pub fn local_addr(&self) -> SocketAddr {
        self.local_addr
    }

    /// Writes all of `bytes` and flushes.
    pub async fn send(&mut self, bytes: &[u8]) -> Result<(), TransportError> {
        self.stream.write_all(bytes).await?;
        self.stream.flush().await?;
        Ok(())
    }

    /// Reads exactly one value, pulling more socket data as needed.
    ///
    /// On failure any partially read bytes are discarded.
    pub async fn receive(&mut self) -> Result<Value, TransportError> {
        let initial = self.pending.split().freeze();
        let mut source = SocketChunks {
            stream: &mut self.stream,
        };
        let (value, leftover) = decode_stream(initial, &mut source).await?;
        self.pending.extend_from_slice(&leftover);
        Ok(value)
    }

    /// Bytes already read from the socket but not yet decoded.
    pub fn pending(&self) -> usize {
        self.pending.len()
    }

    /// Shuts down the write half and releases the socket.
    pub async fn close(mut self) -> Result<(), TransportError> {
        debug!(peer_addr = %self.peer_addr, "closing connection");
        self.stream.shutdown().await?;
        Ok(())
    }
}

/// Opens a connection, runs `op` on it and closes it afterwards, whether
/// `op` succeeded or not.
///
/// If `op` panics the stream is dropped during unwinding, which also closes
/// the socket.
pub async fn with_connection<T, E, F>(
    host: &str,
    port: u16,
    timeout: Option<Duration>,
    op: F,
) -> Result<T, E>
where
    F: for<'c> FnOnce(&'c mut Connection) -> BoxFuture<'c, Result<T, E>>,
    E: From<TransportError>,
{
    let mut conn = Connection::connect(host, port, timeout).await?;
    let result = op(&mut conn).await;
    let closed = conn.close().await;
    match (result, closed) {
        (Ok(value), Ok(())) => Ok(value),
        (Ok(_), Err(err)) => Err(err.into()),
        (Err(err), closed) => {
            if let Err(close_err) = closed {
                debug!(error = %close_err, "close after failed operation also failed");
            }
            Err(err)
        }
    }
}

struct SocketChunks<'a> {
    stream: &'a mut TcpStream,
}

impl ChunkSource for SocketChunks<'_> {
    async fn next_chunk(&mut self) -> io::Result<Option<Bytes>> {
        let mut buf = BytesMut::with_capacity(READ_CHUNK);
        if self.stream.read_buf(&mut buf).await? == 0 {
            return Ok(None);
        }
        Ok(Some(buf.freeze()))
    }
}

async fn open_stream(host: &str, port: u16, addr: &str) -> Result<TcpStream, TransportError> {
    let candidates: Vec<SocketAddr> = lookup_host((host, port))
        .await
        .map_err(|source| TransportError::Resolve {
            addr: addr.to_string(),
            source,
        })?
        .collect();
    if candidates.is_empty() {
        return Err(TransportError::NoAddress {
            addr: addr.to_string(),
        });
    }

    let mut last_err = None;
    for candidate in candidates {
        match connect_socket(candidate).await {
            Ok(stream) => return Ok(stream),
            Err(err) => {
                debug!(%candidate, error = %err, "connect attempt failed");
                last_err = Some(err);
            }
        }
    }
    Err(TransportError::Connect {
        addr: addr.to_string(),
        source: last_err
            .unwrap_or_else(|| io::Error::new(io::ErrorKind::AddrNotAvailable, "no address tried")),
    })
}

async fn connect_socket(addr: SocketAddr) -> io::Result<TcpStream> {
    let socket = if addr.is_ipv4() {
        TcpSocket::new_v4()?
    } else {
        TcpSocket::new_v6()?
    };
    socket.set_keepalive(true)?;
    let stream = socket.connect(addr).await?;
    // Small request/response frames; don't wait to coalesce them.
    stream.set_nodelay(true)?;
    Ok(stream)
}
