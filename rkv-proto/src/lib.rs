//! # RKV Protocol
//!
//! Purpose: Model, decode and encode RESP3, the tag-prefixed, length-framed
//! wire protocol spoken by Redis-compatible servers.
//!
//! ## Design Principles
//! 1. **One Value Type**: Every protocol value is a [`Value`] variant.
//! 2. **Incremental Decoding**: [`Decoder`] accepts arbitrary chunk
//!    boundaries and reports "need more" separately from "malformed".
//! 3. **Byte-Exact Encoding**: [`encode`] output parses back to an equal value.
//! 4. **Transport-Agnostic**: No sockets here; callers plug a [`ChunkSource`].
//!
//! ```
//! use rkv_proto::{parse, Value};
//!
//! let ping = Value::command(["PING"]);
//! assert_eq!(parse(&ping.encode()).unwrap(), ping);
//! ```

mod decoder;
mod encode;
mod parse;
mod value;

pub use decoder::{decode_stream, ChunkSource, DecodeError, Decoder, Feed};
pub use encode::{encode, encode_into};
pub use parse::{parse, parse_prefix, ParseError, ParseErrorKind, MAX_DEPTH};
pub use value::{BigNumber, Value};
