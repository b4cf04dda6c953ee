//! # Connection Pool
//!
//! Purpose: Hold a fixed set of open connections and lend each one to at
//! most one caller at a time.
//!
//! ## Design Principles
//! 1. **Object Pool Pattern**: All `pool_size` connections are opened up
//!    front; capacity never grows.
//! 2. **All-or-Nothing Construction**: If any connection fails to open, the
//!    ones that did open are closed and no pool is returned.
//! 3. **Fail Fast**: An empty pool returns `PoolError::Exhausted`
//!    immediately; callers decide whether to retry.
//! 4. **No Desynchronized Reuse**: A connection whose exchange failed or was
//!    abandoned may still have replies in flight. It is closed instead of
//!    returned, and its slot is reopened by the next acquire that needs it.
//! 5. **One Critical Section**: Slot state and the idle list change only
//!    under a single mutex, never held across an `.await`.
//!
//! ## Structure Overview
//!
//! ```text
//! ConnectionPool (Clone, Arc)
//!   └── PoolInner
//!         └── state: Mutex<PoolState>
//!               ├── slots: Vec<Slot>                  Available | InUse | Vacant | Closed
//!               ├── idle:  Vec<(usize, Connection)>   connections of Available slots
//!               └── closed: bool
//! ```

use std::mem;
use std::ops::Deref;
use std::sync::Arc;
use std::time::Duration;

use futures::future::join_all;
use parking_lot::Mutex;
use tracing::{debug, info, warn};

use rkv_proto::Value;

use crate::config::ClientConfig;
use crate::error::{PoolError, TransportError};
use crate::transport::Connection;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Slot {
    Available,
    InUse,
    /// Its connection was discarded; the next acquire without an idle
    /// connection reopens it.
    Vacant,
    Closed,
}

struct PoolState {
    slots: Vec<Slot>,
    idle: Vec<(usize, Connection)>,
    closed: bool,
}

struct PoolInner {
    host: String,
    port: u16,
    timeout: Option<Duration>,
    addr: String,
    capacity: usize,
    state: Mutex<PoolState>,
}

impl PoolInner {
    fn put_back(&self, index: usize, conn: Connection) {
        let dropped = {
            let mut state = self.state.lock();
            if state.closed {
                state.slots[index] = Slot::Closed;
                Some(conn)
            } else {
                state.slots[index] = Slot::Available;
                state.idle.push((index, conn));
                None
            }
        };
        // Dropping the stream outside the lock closes the socket.
        if let Some(conn) = dropped {
            debug!(slot = index, peer_addr = %conn.peer_addr(), "pool closed, dropping released connection");
        }
    }

    fn vacate(&self, index: usize) {
        let mut state = self.state.lock();
        state.slots[index] = if state.closed {
            Slot::Closed
        } else {
            Slot::Vacant
        };
    }
}

/// Fixed-size pool of connections to one server.
#[derive(Clone)]
pub struct ConnectionPool {
    inner: Arc<PoolInner>,
}

impl ConnectionPool {
    /// Opens `config.pool_size` connections concurrently.
    pub async fn create(config: &ClientConfig) -> Result<Self, PoolError> {
        let timeout = config.connection_timeout();
        let attempts = (0..config.pool_size)
            .map(|_| Connection::connect(&config.host, config.port, timeout));
        let results = join_all(attempts).await;

        let mut opened = Vec::with_capacity(config.pool_size);
        let mut failure = None;
        for (index, result) in results.into_iter().enumerate() {
            match result {
                Ok(conn) => opened.push(conn),
                Err(source) if failure.is_none() => {
                    failure = Some(PoolError::Connect { index, source });
                }
                Err(source) => debug!(slot = index, error = %source, "additional connect failure"),
            }
        }

        if let Some(err) = failure {
            warn!(addr = %config.addr(), error = %err, "pool creation failed, closing opened connections");
            close_each(opened).await;
            return Err(err);
        }

        let capacity = opened.len();
        // Reverse so that slot 0 is handed out first.
        let idle = opened.into_iter().enumerate().rev().collect();
        info!(addr = %config.addr(), capacity, "connection pool ready");
        Ok(ConnectionPool {
            inner: Arc::new(PoolInner {
                host: config.host.clone(),
                port: config.port,
                timeout,
                addr: config.addr(),
                capacity,
                state: Mutex::new(PoolState {
                    slots: vec![Slot::Available; capacity],
                    idle,
                    closed: false,
                }),
            }),
        })
    }

    /// Lends out an idle connection without waiting for a release.
    ///
    /// With no idle connection left, a slot whose connection was discarded is
    /// reopened; only when there is none of those either does the pool report
    /// exhaustion.
    pub async fn acquire(&self) -> Result<PooledConnection, PoolError> {
        let index = {
            let mut state = self.inner.state.lock();
            if state.closed {
                return Err(PoolError::Closed);
            }
            if let Some((index, conn)) = state.idle.pop() {
                state.slots[index] = Slot::InUse;
                return Ok(PooledConnection {
                    pool: Arc::clone(&self.inner),
                    index,
                    conn: Some(conn),
                    valid: true,
                });
            }
            match state.slots.iter().position(|slot| *slot == Slot::Vacant) {
                Some(index) => {
                    state.slots[index] = Slot::InUse;
                    index
                }
                None => {
                    warn!(addr = %self.inner.addr, capacity = self.inner.capacity, "connection pool exhausted");
                    return Err(PoolError::Exhausted {
                        capacity: self.inner.capacity,
                    });
                }
            }
        };

        // Vacates the slot again if connecting fails or this future is dropped.
        let mut lease = PooledConnection {
            pool: Arc::clone(&self.inner),
            index,
            conn: None,
            valid: false,
        };
        debug!(slot = index, addr = %self.inner.addr, "reopening discarded connection");
        let conn = Connection::connect(&self.inner.host, self.inner.port, self.inner.timeout)
            .await
            .map_err(|source| PoolError::Connect { index, source })?;
        lease.conn = Some(conn);
        lease.valid = true;
        Ok(lease)
    }

    /// Returns a borrowed connection to the pool.
    ///
    /// Dropping the guard has the same effect.
    pub fn release(&self, conn: PooledConnection) {
        drop(conn);
    }

    /// Closes every idle connection concurrently and marks the pool closed.
    ///
    /// Connections currently lent out are left alone; they are dropped when
    /// their borrowers release them.
    pub async fn close_all(&self) {
        let idle: Vec<Connection> = {
            let mut state = self.inner.state.lock();
            state.closed = true;
            let PoolState { slots, idle, .. } = &mut *state;
            for slot in slots.iter_mut() {
                if matches!(slot, Slot::Available | Slot::Vacant) {
                    *slot = Slot::Closed;
                }
            }
            mem::take(idle).into_iter().map(|(_, conn)| conn).collect()
        };
        info!(addr = %self.inner.addr, closing = idle.len(), "closing connection pool");
        close_each(idle).await;
    }

    /// Fixed number of connections the pool was built with.
    pub fn capacity(&self) -> usize {
        self.inner.capacity
    }

    /// Connections currently ready to be acquired.
    pub fn available(&self) -> usize {
        self.inner.state.lock().idle.len()
    }

    pub fn is_closed(&self) -> bool {
        self.inner.state.lock().closed
    }
}

async fn close_each(conns: Vec<Connection>) {
    for result in join_all(conns.into_iter().map(Connection::close)).await {
        if let Err(err) = result {
            debug!(error = %err, "error while closing pooled connection");
        }
    }
}

/// RAII guard for a borrowed connection.
///
/// On drop the connection goes back to its slot, unless an exchange on it
/// failed or never finished; then it is closed and the slot left vacant.
pub struct PooledConnection {
    pool: Arc<PoolInner>,
    index: usize,
    conn: Option<Connection>,
    valid: bool,
}

impl PooledConnection {
    /// Slot this connection occupies in the pool.
    pub fn slot(&self) -> usize {
        self.index
    }

    /// Sends `request` and reads one reply.
    pub async fn exchange(&mut self, request: &[u8]) -> Result<Value, TransportError> {
        // Stays false if this fails or the future is dropped part way.
        self.valid = false;
        let conn = self.conn.as_mut().expect("connection exists until drop");
        conn.send(request).await?;
        let reply = conn.receive().await?;
        self.valid = true;
        Ok(reply)
    }

    /// Sends `request` in one write, then reads `replies` replies in order.
    pub async fn exchange_many(
        &mut self,
        request: &[u8],
        replies: usize,
    ) -> Result<Vec<Value>, TransportError> {
        self.valid = false;
        let conn = self.conn.as_mut().expect("connection exists until drop");
        conn.send(request).await?;
        let mut values = Vec::with_capacity(replies);
        for _ in 0..replies {
            values.push(conn.receive().await?);
        }
        self.valid = true;
        Ok(values)
    }
}

impl Deref for PooledConnection {
    type Target = Connection;

    fn deref(&self) -> &Connection {
        self.conn.as_ref().expect("connection exists until drop")
    }
}

impl Drop for PooledConnection {
    fn drop(&mut self) {
        match self.conn.take() {
            Some(conn) if self.valid => self.pool.put_back(self.index, conn),
            Some(conn) => {
                warn!(slot = self.index, peer_addr = %conn.peer_addr(), "discarding connection after unfinished exchange");
                drop(conn);
                self.pool.vacate(self.index);
            }
            None => self.pool.vacate(self.index),
        }
    }
}
