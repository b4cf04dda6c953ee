//! # RESP3 Encoding
//!
//! Purpose: Serialize any [`Value`] into its exact wire form.
//!
//! ## Design Principles
//! 1. **Total and Deterministic**: Every constructible value encodes, and the
//!    same value always yields the same bytes.
//! 2. **Buffer Reuse**: `encode_into` appends to a caller-owned `BytesMut`.
//! 3. **Sentinels First**: Null bulk strings and null arrays are written as
//!    `$-1` / `*-1` before any length logic runs.

use bytes::{BufMut, Bytes, BytesMut};

use crate::value::Value;

/// Encodes a value into a fresh buffer.
pub fn encode(value: &Value) -> Bytes {
    let mut buf = BytesMut::with_capacity(64);
    encode_into(value, &mut buf);
    buf.freeze()
}

/// Appends the wire form of `value` to `out`.
pub fn encode_into(value: &Value, out: &mut BytesMut) {
    match value {
        Value::SimpleString(text) => line(out, b'+', text.as_bytes()),
        Value::SimpleError(text) => line(out, b'-', text.as_bytes()),
        Value::Integer(n) => {
            out.put_u8(b':');
            push_i64(out, *n);
            out.put_slice(b"\r\n");
        }
        Value::BulkString(None) => out.put_slice(b"$-1\r\n"),
        Value::BulkString(Some(data)) => framed(out, b'$', data),
        Value::Array(None) => out.put_slice(b"*-1\r\n"),
        Value::Array(Some(items)) => {
            header(out, b'*', items.len());
            for item in items {
                encode_into(item, out);
            }
        }
        Value::Null => out.put_slice(b"_\r\n"),
        Value::Boolean(true) => out.put_slice(b"#t\r\n"),
        Value::Boolean(false) => out.put_slice(b"#f\r\n"),
        Value::Double(d) => line(out, b',', format_double(*d).as_bytes()),
        Value::BigNumber(n) => line(out, b'(', n.as_str().as_bytes()),
        Value::BulkError(data) => framed(out, b'!', data),
        Value::VerbatimString { format, content } => {
            header(out, b'=', format.len() + 1 + content.len());
            out.put_slice(format);
            out.put_u8(b':');
            out.put_slice(content);
            out.put_slice(b"\r\n");
        }
        Value::Map(pairs) => {
            header(out, b'%', pairs.len());
            encode_pairs(pairs, out);
        }
        Value::Attribute { attrs, value } => {
            header(out, b'|', attrs.len());
            encode_pairs(attrs, out);
            encode_into(value, out);
        }
        Value::Set(items) => {
            header(out, b'~', items.len());
            for item in items {
                encode_into(item, out);
            }
        }
        Value::Push { kind, data } => {
            header(out, b'>', data.len() + 1);
            framed(out, b'$', kind.as_bytes());
            for item in data {
                encode_into(item, out);
            }
        }
    }
}

impl Value {
    /// Wire form of this value.
    pub fn encode(&self) -> Bytes {
        encode(self)
    }
}

fn encode_pairs(pairs: &[(Value, Value)], out: &mut BytesMut) {
    for (key, value) in pairs {
        encode_into(key, out);
        encode_into(value, out);
    }
}

/// Whole numbers drop the fractional part (`20.0` -> `20`); non-finite
/// values use the lowercase protocol spellings.
fn format_double(value: f64) -> String {
    if value.is_nan() {
        "nan".to_string()
    } else if value == f64::INFINITY {
        "inf".to_string()
    } else if value == f64::NEG_INFINITY {
        "-inf".to_string()
    } else {
        // `Display` for f64 is the shortest text that round-trips and never
        // prints a trailing `.0`.
        value.to_string()
    }
}

fn line(out: &mut BytesMut, tag: u8, payload: &[u8]) {
    out.reserve(payload.len() + 3);
    out.put_u8(tag);
    out.put_slice(payload);
    out.put_slice(b"\r\n");
}

fn header(out: &mut BytesMut, tag: u8, len: usize) {
    out.put_u8(tag);
    push_usize(out, len);
    out.put_slice(b"\r\n");
}

fn framed(out: &mut BytesMut, tag: u8, payload: &[u8]) {
    header(out, tag, payload.len());
    out.put_slice(payload);
    out.put_slice(b"\r\n");
}

fn push_i64(out: &mut BytesMut, value: i64) {
    if value < 0 {
        out.put_u8(b'-');
    }
    push_u64(out, value.unsigned_abs());
}

fn push_usize(out: &mut BytesMut, value: usize) {
    push_u64(out, value as u64);
}

fn push_u64(out: &mut BytesMut, mut value: u64) {
    // Digits go into a stack buffer to skip the String round-trip.
    let mut buf = [0u8; 20];
    let mut len = 0;
    if value == 0 {
        buf[0] = b'0';
        len = 1;
    }
    while value > 0 {
        buf[len] = b'0' + (value % 10) as u8;
        value /= 10;
        len += 1;
    }
    buf[..len].reverse();
    out.put_slice(&buf[..len]);
}
