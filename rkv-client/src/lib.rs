//! # RKV Client
//!
//! Purpose: Provide an async RESP3 client with a fixed-size connection pool
//! to avoid repeated TCP handshakes.
//!
//! ## Design Principles
//! 1. **Object Pool Pattern**: Connections are opened once and lent out.
//! 2. **Protocol Clarity**: All framing goes through `rkv-proto`.
//! 3. **No Hidden Retries**: Every failure is returned to the caller.
//!
//! ```no_run
//! use rkv_client::{ClientConfig, KVClient, Value};
//!
//! # async fn demo() -> rkv_client::ClientResult<()> {
//! let client = KVClient::connect(ClientConfig::new("127.0.0.1", 6379)).await?;
//! let reply = client.execute(&Value::command(["PING"])).await?;
//! assert_eq!(reply, Value::simple("PONG"));
//! # Ok(())
//! # }
//! ```

mod client;
mod config;
mod error;
mod pool;
mod transport;

pub use client::KVClient;
pub use config::ClientConfig;
pub use error::{ClientError, ClientResult, ConfigError, PoolError, TransportError};
pub use pool::{ConnectionPool, PooledConnection};
pub use transport::{with_connection, Connection};

pub use rkv_proto::{DecodeError, ParseError, Value};
