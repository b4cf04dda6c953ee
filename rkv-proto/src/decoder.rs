//! # Incremental Decoder
//!
//! Purpose: Decode one value from input that arrives in arbitrary chunks.
//!
//! ## Design Principles
//! 1. **State by Value**: `Decoder::feed` consumes the decoder and hands it
//!    back inside `Feed::NeedMore`, so a finished or failed decoder cannot be
//!    fed again by accident.
//! 2. **Chunking Is Invisible**: Parse progress is kept between feeds and
//!    only the unparsed tail is buffered, so one chunk or a thousand produce
//!    the same result at the same cost.
//! 3. **Plain Driving Loop**: `decode_stream` is ordinary sequential async code
//!    that awaits the next chunk whenever the decoder asks for more.

use std::future::Future;
use std::io;

use bytes::{Buf, Bytes, BytesMut};
use thiserror::Error;
use tracing::trace;

use crate::parse::{ParseError, Parser, Step};
use crate::value::Value;

/// Outcome of feeding one chunk.
#[derive(Debug)]
pub enum Feed {
    /// A value completed; `leftover` holds bytes past its end.
    Done { value: Value, leftover: Bytes },
    /// The buffered input is a valid prefix; feed more.
    NeedMore(Decoder),
    /// The buffered input can never form a value.
    Failed(ParseError),
}

/// Buffering state machine around the RESP3 grammar.
#[derive(Debug, Default)]
pub struct Decoder {
    /// Bytes not yet consumed by `parser`.
    buf: BytesMut,
    parser: Parser,
    /// Bytes of the current value already consumed by `parser`.
    absorbed: usize,
}

impl Decoder {
    pub fn new() -> Self {
        Decoder::default()
    }

    /// Starts from bytes left over by a previous decode.
    pub fn with_buffered(initial: &[u8]) -> Self {
        Decoder {
            buf: BytesMut::from(initial),
            ..Decoder::default()
        }
    }

    /// Number of bytes held while waiting for the value to complete.
    pub fn buffered(&self) -> usize {
        self.absorbed + self.buf.len()
    }

    /// Appends `chunk` and tries to complete a value.
    pub fn feed(mut self, chunk: &[u8]) -> Feed {
        self.buf.extend_from_slice(chunk);
        let (step, used) = self.parser.advance(&self.buf);
        self.buf.advance(used);
        self.absorbed += used;
        match step {
            Step::Done(value) => Feed::Done {
                value,
                leftover: self.buf.freeze(),
            },
            Step::NeedMore(_) => Feed::NeedMore(self),
            Step::Failed(err) => Feed::Failed(err),
        }
    }
}

/// Failure while driving a decoder over a chunk source.
#[derive(Debug, Error)]
pub enum DecodeError {
    /// The input can never form a value.
    #[error("malformed message: {0}")]
    Malformed(#[source] ParseError),

    /// The source ended while the decoder still needed bytes.
    #[error("incomplete message: input ended with {buffered} bytes of a partial value")]
    Incomplete { buffered: usize },

    /// The source itself failed.
    #[error("read failed: {0}")]
    Io(#[source] io::Error),
}

/// Supplier of input chunks for [`decode_stream`].
pub trait ChunkSource {
    /// Next chunk of input, or `None` at end of input.
    fn next_chunk(&mut self) -> impl Future<Output = io::Result<Option<Bytes>>> + Send;
}

/// Decodes one value, starting with `initial` and pulling further chunks
/// from `source` while the decoder needs more.
///
/// Returns the value together with any bytes read past its end.
pub async fn decode_stream<S>(initial: Bytes, source: &mut S) -> Result<(Value, Bytes), DecodeError>
where
    S: ChunkSource,
{
    let mut decoder = Decoder::with_buffered(&initial);
    let mut chunk = Bytes::new();
    loop {
        decoder = match decoder.feed(&chunk) {
            Feed::Done { value, leftover } => return Ok((value, leftover)),
            Feed::Failed(err) => return Err(DecodeError::Malformed(err)),
            Feed::NeedMore(decoder) => decoder,
        };
        trace!(buffered = decoder.buffered(), "decoder needs more input");
        chunk = match source.next_chunk().await.map_err(DecodeError::Io)? {
            Some(chunk) => chunk,
            None => {
                return Err(DecodeError::Incomplete {
                    buffered: decoder.buffered(),
                })
            }
        };
    }
}
