//! # Async Client API
//!
//! Purpose: Run RESP3 commands against a server through a connection pool.
//!
//! ## Design Principles
//! 1. **Facade Pattern**: `KVClient` hides pooling, framing and decoding.
//! 2. **Always Release**: The borrowed connection is a guard, so every exit
//!    path (including `?` and cancellation) hands it back to the pool. A
//!    connection whose exchange did not finish is replaced, not reused.
//! 3. **Strict FIFO Pipelining**: Replies carry no correlation id; the n-th
//!    reply belongs to the n-th request and a pipeline succeeds or fails as
//!    a whole.
//! 4. **Errors Are Typed**: Error replies become `ClientError::Server`, and
//!    replies of the wrong kind become `ClientError::UnexpectedResponse`.

use bytes::{Bytes, BytesMut};
use tracing::debug;

use rkv_proto::{encode_into, Value};

use crate::config::ClientConfig;
use crate::error::{ClientError, ClientResult};
use crate::pool::ConnectionPool;

/// Pooled client for one server.
///
/// Each call borrows a connection, performs its exchange and returns the
/// connection to the pool. Clones share the same pool.
#[derive(Clone)]
pub struct KVClient {
    pool: ConnectionPool,
    config: ClientConfig,
}

impl KVClient {
    /// Validates `config` and opens the pool.
    pub async fn connect(config: ClientConfig) -> ClientResult<Self> {
        config.validate()?;
        let pool = ConnectionPool::create(&config).await?;
        Ok(KVClient { pool, config })
    }

    pub fn config(&self) -> &ClientConfig {
        &self.config
    }

    pub fn pool(&self) -> &ConnectionPool {
        &self.pool
    }

    /// Sends one command and returns its reply.
    ///
    /// Error replies are returned as `ClientError::Server`.
    pub async fn execute(&self, command: &Value) -> ClientResult<Value> {
        let mut conn = self.pool.acquire().await?;
        let reply = conn.exchange(&command.encode()).await?;
        match reply.error_message() {
            Some(message) => Err(ClientError::Server { message }),
            None => Ok(reply),
        }
    }

    /// Sends every command on one connection, then reads the same number of
    /// replies in order.
    ///
    /// Error replies stay in the returned list at their position; any write
    /// or decode failure fails the whole call.
    pub async fn pipeline(&self, commands: &[Value]) -> ClientResult<Vec<Value>> {
        if commands.is_empty() {
            return Ok(Vec::new());
        }

        let mut request = BytesMut::new();
        for command in commands {
            encode_into(command, &mut request);
        }

        let mut conn = self.pool.acquire().await?;
        debug!(
            commands = commands.len(),
            bytes = request.len(),
            slot = conn.slot(),
            "sending pipeline"
        );
        Ok(conn.exchange_many(&request, commands.len()).await?)
    }

    /// Closes the idle connections of the shared pool.
    pub async fn close(&self) {
        self.pool.close_all().await;
    }

    /// `PING`; returns the server's reply text.
    pub async fn ping(&self) -> ClientResult<String> {
        match self.execute(&Value::command(["PING"])).await? {
            Value::SimpleString(text) => Ok(text),
            Value::BulkString(Some(data)) => Ok(String::from_utf8_lossy(&data).into_owned()),
            other => Err(unexpected("simple string", &other)),
        }
    }

    /// `GET key`; `None` when the key is missing.
    pub async fn get(&self, key: &[u8]) -> ClientResult<Option<Bytes>> {
        match self.execute(&Value::command([&b"GET"[..], key])).await? {
            Value::BulkString(data) => Ok(data),
            Value::Null => Ok(None),
            other => Err(unexpected("bulk string", &other)),
        }
    }

    /// `SET key value`.
    pub async fn set(&self, key: &[u8], value: &[u8]) -> ClientResult<()> {
        match self.execute(&Value::command([&b"SET"[..], key, value])).await? {
            Value::SimpleString(_) => Ok(()),
            other => Err(unexpected("simple string", &other)),
        }
    }

    /// `DEL key [key ...]`; returns how many keys were removed.
    pub async fn del(&self, keys: &[&[u8]]) -> ClientResult<i64> {
        let args = std::iter::once(&b"DEL"[..]).chain(keys.iter().copied());
        match self.execute(&Value::command(args)).await? {
            Value::Integer(count) => Ok(count),
            other => Err(unexpected("integer", &other)),
        }
    }
}

fn unexpected(expected: &'static str, found: &Value) -> ClientError {
    ClientError::UnexpectedResponse {
        expected,
        found: found.kind(),
    }
}
