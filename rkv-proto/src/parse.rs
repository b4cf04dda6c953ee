//! # RESP3 Parsing
//!
//! Purpose: Turn bytes into one [`Value`], or explain precisely where and
//! why they could not.
//!
//! ## Design Principles
//! 1. **Token at a Time**: Scalars and composite headers are read as single
//!    tokens. A composite waits on an explicit frame stack until its last
//!    child arrives, so input split across chunks is never parsed twice.
//! 2. **Two Failure Kinds**: Running out of bytes is `Incomplete` (more input
//!    may fix it); anything else is `Malformed` (it never will).
//! 3. **Path-Qualified Errors**: Every open composite prefixes the error with
//!    its own rule names, so a caller sees `array > array elements > empty: ...`.
//! 4. **Bounded Resources**: Declared element counts are never trusted for
//!    pre-allocation, and nesting stops at [`MAX_DEPTH`] open composites.

use std::fmt;

use bytes::Bytes;

use crate::value::{BigNumber, Value};

const CRLF: &[u8] = b"\r\n";

/// Most composites that may be open at once while parsing one value.
pub const MAX_DEPTH: usize = 512;

/// Whether a parse failure can be cured by more input.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ParseErrorKind {
    /// Input ended before the grammar was satisfied.
    Incomplete,
    /// Input can never form a valid value.
    Malformed,
}

/// Parse failure with the chain of grammar rules active when it happened.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParseError {
    kind: ParseErrorKind,
    path: Vec<&'static str>,
    message: String,
}

impl ParseError {
    fn incomplete(message: impl Into<String>) -> Self {
        ParseError {
            kind: ParseErrorKind::Incomplete,
            path: Vec::new(),
            message: message.into(),
        }
    }

    fn malformed(message: impl Into<String>) -> Self {
        ParseError {
            kind: ParseErrorKind::Malformed,
            path: Vec::new(),
            message: message.into(),
        }
    }

    // Rules are entered outermost first but fail innermost first, so each
    // enclosing rule prepends itself.
    fn within(mut self, rule: &'static str) -> Self {
        self.path.insert(0, rule);
        self
    }

    pub fn kind(&self) -> ParseErrorKind {
        self.kind
    }

    pub fn is_incomplete(&self) -> bool {
        self.kind == ParseErrorKind::Incomplete
    }

    /// Rule names from outermost to innermost.
    pub fn path(&self) -> &[&'static str] {
        &self.path
    }

    pub fn message(&self) -> &str {
        &self.message
    }
}

impl fmt::Display for ParseError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.path.is_empty() {
            f.write_str(&self.message)
        } else {
            write!(f, "{}: {}", self.path.join(" > "), self.message)
        }
    }
}

impl std::error::Error for ParseError {}

type ParseResult<T> = Result<T, ParseError>;

trait Within<T> {
    fn within(self, rule: &'static str) -> ParseResult<T>;
}

impl<T> Within<T> for ParseResult<T> {
    fn within(self, rule: &'static str) -> ParseResult<T> {
        self.map_err(|err| err.within(rule))
    }
}

/// Parses exactly one value; trailing bytes are an error.
pub fn parse(input: &[u8]) -> Result<Value, ParseError> {
    let (value, used) = parse_prefix(input)?;
    if used != input.len() {
        return Err(ParseError::malformed(format!(
            "trailing bytes after value ({} unread)",
            input.len() - used
        )));
    }
    Ok(value)
}

/// Parses one value from the start of `input`, returning it with the number
/// of bytes it occupied.
pub fn parse_prefix(input: &[u8]) -> Result<(Value, usize), ParseError> {
    match Parser::default().advance(input) {
        (Step::Done(value), used) => Ok((value, used)),
        (Step::NeedMore(err), _) | (Step::Failed(err), _) => Err(err),
    }
}

/// Outcome of [`Parser::advance`].
#[derive(Debug)]
pub(crate) enum Step {
    Done(Value),
    /// Input ran out; the error says what was still expected.
    NeedMore(ParseError),
    Failed(ParseError),
}

/// Resumable parse state: the composites still waiting for children.
#[derive(Debug, Default)]
pub(crate) struct Parser {
    stack: Vec<Frame>,
}

impl Parser {
    /// Parses as far as `input` allows and returns the outcome with the
    /// number of bytes consumed.
    ///
    /// On `NeedMore` the consumed bytes live on in the parser's frames; only
    /// the unconsumed tail has to be offered again, followed by new input.
    pub(crate) fn advance(&mut self, input: &[u8]) -> (Step, usize) {
        let mut cursor = Cursor { buf: input, pos: 0 };
        loop {
            let start = cursor.pos;
            let mut value = match cursor.token() {
                Ok(Token::Value(value)) => value,
                Ok(Token::Open(frame)) => {
                    if self.stack.len() >= MAX_DEPTH {
                        let err = ParseError::malformed(format!(
                            "nesting too deep, limit is {} levels",
                            MAX_DEPTH
                        ))
                        .within(frame.rule());
                        return (Step::Failed(self.locate(err)), start);
                    }
                    self.stack.push(frame);
                    continue;
                }
                Err(err) => {
                    let err = self.locate(err);
                    let step = if err.is_incomplete() {
                        Step::NeedMore(err)
                    } else {
                        Step::Failed(err)
                    };
                    return (step, start);
                }
            };

            // Hand the finished value up until some composite still needs more.
            loop {
                let Some(frame) = self.stack.pop() else {
                    return (Step::Done(value), cursor.pos);
                };
                let rule = frame.rule();
                let child_rule = frame.child_rule();
                match frame.attach(value) {
                    Ok(Attached::Done(parent)) => value = parent,
                    Ok(Attached::Open(frame)) => {
                        self.stack.push(frame);
                        break;
                    }
                    Err(err) => {
                        let err = self.locate(err.within(child_rule).within(rule));
                        return (Step::Failed(err), cursor.pos);
                    }
                }
            }
        }
    }

    /// Prefixes `err` with the rules of every open composite.
    fn locate(&self, mut err: ParseError) -> ParseError {
        let mut path: Vec<&'static str> = self
            .stack
            .iter()
            .flat_map(|frame| [frame.rule(), frame.child_rule()])
            .collect();
        path.append(&mut err.path);
        err.path = path;
        err
    }
}

enum Token {
    Value(Value),
    Open(Frame),
}

/// A composite whose header has been read.
#[derive(Debug)]
struct Frame {
    shape: Shape,
    /// Child values still expected, keys and values counted separately.
    remaining: usize,
}

#[derive(Debug)]
enum Shape {
    Array(Vec<Value>),
    Set(Vec<Value>),
    Map {
        entries: Vec<(Value, Value)>,
        key: Option<Value>,
    },
    /// The last expected child is the attributed value itself.
    Attribute {
        attrs: Vec<(Value, Value)>,
        key: Option<Value>,
    },
    Push {
        kind: Option<String>,
        data: Vec<Value>,
    },
}

enum Attached {
    Open(Frame),
    Done(Value),
}

impl Frame {
    fn rule(&self) -> &'static str {
        match self.shape {
            Shape::Array(_) => "array",
            Shape::Set(_) => "set",
            Shape::Map { .. } => "map",
            Shape::Attribute { .. } => "attribute",
            Shape::Push { .. } => "push",
        }
    }

    /// Rule of the next expected child.
    fn child_rule(&self) -> &'static str {
        match &self.shape {
            Shape::Array(_) => "array elements",
            Shape::Set(_) => "set elements",
            Shape::Map { .. } => "map entries",
            Shape::Attribute { .. } if self.remaining == 1 => "attribute value",
            Shape::Attribute { .. } => "attribute entries",
            Shape::Push { kind: None, .. } => "push kind",
            Shape::Push { .. } => "push elements",
        }
    }

    fn attach(self, child: Value) -> ParseResult<Attached> {
        let remaining = self.remaining - 1;
        let shape = match self.shape {
            Shape::Array(mut items) => {
                items.push(child);
                if remaining == 0 {
                    return Ok(Attached::Done(Value::Array(Some(items))));
                }
                Shape::Array(items)
            }
            Shape::Set(mut items) => {
                items.push(child);
                if remaining == 0 {
                    return Ok(Attached::Done(Value::Set(items)));
                }
                Shape::Set(items)
            }
            Shape::Map {
                mut entries,
                key: Some(key),
            } => {
                entries.push((key, child));
                if remaining == 0 {
                    return Ok(Attached::Done(Value::Map(entries)));
                }
                Shape::Map { entries, key: None }
            }
            Shape::Map { entries, key: None } => Shape::Map {
                entries,
                key: Some(child),
            },
            Shape::Attribute { attrs, .. } if remaining == 0 => {
                return Ok(Attached::Done(Value::Attribute {
                    attrs,
                    value: Box::new(child),
                }));
            }
            Shape::Attribute {
                mut attrs,
                key: Some(key),
            } => {
                attrs.push((key, child));
                Shape::Attribute { attrs, key: None }
            }
            Shape::Attribute { attrs, key: None } => Shape::Attribute {
                attrs,
                key: Some(child),
            },
            // The header guarantees at least one element after the kind.
            Shape::Push { kind: None, data } => Shape::Push {
                kind: Some(push_kind(child)?),
                data,
            },
            Shape::Push {
                kind: Some(kind),
                mut data,
            } => {
                data.push(child);
                if remaining == 0 {
                    return Ok(Attached::Done(Value::Push { kind, data }));
                }
                Shape::Push {
                    kind: Some(kind),
                    data,
                }
            }
        };
        Ok(Attached::Open(Frame { shape, remaining }))
    }
}

fn push_kind(value: Value) -> ParseResult<String> {
    match value {
        Value::SimpleString(text) => Ok(text),
        Value::BulkString(Some(data)) => utf8(&data),
        other => Err(ParseError::malformed(format!(
            "kind must be a simple or bulk string, found {}",
            other.kind()
        ))),
    }
}

struct Cursor<'a> {
    buf: &'a [u8],
    pos: usize,
}

impl<'a> Cursor<'a> {
    fn remaining(&self) -> usize {
        self.buf.len() - self.pos
    }

    /// Reads one scalar value or one composite header.
    fn token(&mut self) -> ParseResult<Token> {
        let Some(&tag) = self.buf.get(self.pos) else {
            return Err(ParseError::incomplete("unexpected end of input").within("empty"));
        };
        self.pos += 1;

        let value = match tag {
            b'+' => self.text_line().map(Value::SimpleString).within("simple string"),
            b'-' => self.text_line().map(Value::SimpleError).within("simple error"),
            b':' => self.integer().map(Value::Integer).within("integer"),
            b'_' => self.null().within("null"),
            b'#' => self.boolean().map(Value::Boolean).within("boolean"),
            b',' => self.double().map(Value::Double).within("double"),
            b'(' => self.big_number().map(Value::BigNumber).within("big number"),
            b'$' => self.bulk_string().within("bulk string"),
            b'!' => self.bulk_error().within("bulk error"),
            b'=' => self.verbatim_string().within("verbatim string"),
            b'*' => return self.array().within("array"),
            b'%' => return self.map().within("map"),
            b'|' => return self.attribute().within("attribute"),
            b'~' => return self.set().within("set"),
            b'>' => return self.push().within("push"),
            other => Err(ParseError::malformed(format!(
                "unknown type byte 0x{:02x} ({:?})",
                other,
                other as char
            ))),
        };
        value.map(Token::Value)
    }

    /// Returns the bytes up to the next CRLF and moves past it.
    fn line(&mut self) -> ParseResult<&'a [u8]> {
        let buf = self.buf;
        let rest = &buf[self.pos..];
        match rest.windows(2).position(|w| w == CRLF) {
            Some(end) => {
                self.pos += end + 2;
                Ok(&rest[..end])
            }
            None => Err(ParseError::incomplete("unexpected end of input, expected CRLF")),
        }
    }

    fn text_line(&mut self) -> ParseResult<String> {
        let line = self.line()?;
        utf8(line)
    }

    fn integer(&mut self) -> ParseResult<i64> {
        let line = self.line()?;
        parse_i64(line)
    }

    fn null(&mut self) -> ParseResult<Value> {
        let line = self.line()?;
        if !line.is_empty() {
            return Err(ParseError::malformed(format!(
                "expected empty payload, found {:?}",
                String::from_utf8_lossy(line)
            )));
        }
        Ok(Value::Null)
    }

    fn boolean(&mut self) -> ParseResult<bool> {
        match self.line()? {
            b"t" => Ok(true),
            b"f" => Ok(false),
            other => Err(ParseError::malformed(format!(
                "expected 't' or 'f', found {:?}",
                String::from_utf8_lossy(other)
            ))),
        }
    }

    fn double(&mut self) -> ParseResult<f64> {
        let text = utf8(self.line()?)?;
        // std accepts "inf", "-inf" and "nan" alongside decimal forms.
        text.parse::<f64>()
            .map_err(|_| ParseError::malformed(format!("invalid float text {:?}", text)))
    }

    fn big_number(&mut self) -> ParseResult<BigNumber> {
        let text = utf8(self.line()?)?;
        BigNumber::new(text.as_str())
            .ok_or_else(|| ParseError::malformed(format!("invalid decimal text {:?}", text)))
    }

    /// Reads a `<len>CRLF` header.
    fn length(&mut self) -> ParseResult<i64> {
        self.integer().within("length")
    }

    /// Reads a header that must not be negative.
    fn count(&mut self) -> ParseResult<usize> {
        let len = self.length()?;
        usize::try_from(len)
            .map_err(|_| ParseError::malformed(format!("negative length {}", len)).within("length"))
    }

    /// Reads exactly `len` bytes followed by CRLF.
    fn body(&mut self, len: usize) -> ParseResult<&'a [u8]> {
        if self.remaining() < len.saturating_add(2) {
            return Err(ParseError::incomplete(format!(
                "unexpected end of input, expected {} byte body",
                len
            )));
        }
        let buf = self.buf;
        let start = self.pos;
        let body = &buf[start..start + len];
        if &buf[start + len..start + len + 2] != CRLF {
            return Err(ParseError::malformed("body not terminated by CRLF"));
        }
        self.pos += len + 2;
        Ok(body)
    }

    fn bulk_string(&mut self) -> ParseResult<Value> {
        let len = self.length()?;
        if len < 0 {
            return Ok(Value::BulkString(None));
        }
        let body = self.body(len as usize)?;
        Ok(Value::BulkString(Some(Bytes::copy_from_slice(body))))
    }

    fn bulk_error(&mut self) -> ParseResult<Value> {
        let len = self.count()?;
        let body = self.body(len)?;
        Ok(Value::BulkError(Bytes::copy_from_slice(body)))
    }

    fn verbatim_string(&mut self) -> ParseResult<Value> {
        let len = self.count()?;
        if len < 4 {
            return Err(ParseError::malformed(format!(
                "length {} too short for format and separator",
                len
            )));
        }
        let body = self.body(len)?;
        if body[3] != b':' {
            return Err(ParseError::malformed("missing ':' after 3-byte format"));
        }
        let format = [body[0], body[1], body[2]];
        Ok(Value::VerbatimString {
            format,
            content: Bytes::copy_from_slice(&body[4..]),
        })
    }

    /// Room for `count` children, capped by what the rest of the input could
    /// hold at `min_size` bytes per child.
    fn reserve<T>(&self, count: usize, min_size: usize) -> Vec<T> {
        Vec::with_capacity(count.min(self.remaining() / min_size))
    }

    fn array(&mut self) -> ParseResult<Token> {
        let len = self.length()?;
        if len < 0 {
            return Ok(Token::Value(Value::Array(None)));
        }
        let count = len as usize;
        if count == 0 {
            return Ok(Token::Value(Value::Array(Some(Vec::new()))));
        }
        // Every element occupies at least 3 bytes (tag + CRLF).
        Ok(Token::Open(Frame {
            shape: Shape::Array(self.reserve(count, 3)),
            remaining: count,
        }))
    }

    fn set(&mut self) -> ParseResult<Token> {
        let count = self.count()?;
        if count == 0 {
            return Ok(Token::Value(Value::Set(Vec::new())));
        }
        Ok(Token::Open(Frame {
            shape: Shape::Set(self.reserve(count, 3)),
            remaining: count,
        }))
    }

    fn map(&mut self) -> ParseResult<Token> {
        let count = self.count()?;
        if count == 0 {
            return Ok(Token::Value(Value::Map(Vec::new())));
        }
        Ok(Token::Open(Frame {
            shape: Shape::Map {
                entries: self.reserve(count, 6),
                key: None,
            },
            remaining: children(count, 0)?,
        }))
    }

    fn attribute(&mut self) -> ParseResult<Token> {
        let count = self.count()?;
        Ok(Token::Open(Frame {
            shape: Shape::Attribute {
                attrs: self.reserve(count, 6),
                key: None,
            },
            remaining: children(count, 1)?,
        }))
    }

    fn push(&mut self) -> ParseResult<Token> {
        let len = self.length()?;
        if len < 2 {
            return Err(ParseError::malformed(format!(
                "must have at least kind and one element, found {}",
                len
            )));
        }
        let count = len as usize;
        Ok(Token::Open(Frame {
            shape: Shape::Push {
                kind: None,
                data: self.reserve(count - 1, 3),
            },
            remaining: count,
        }))
    }
}

/// Child values of a pair-based composite: a key and a value per entry,
/// plus `extra` trailing values.
fn children(pairs: usize, extra: usize) -> ParseResult<usize> {
    pairs
        .checked_mul(2)
        .and_then(|n| n.checked_add(extra))
        .ok_or_else(|| ParseError::malformed(format!("length {} too large", pairs)).within("length"))
}

fn utf8(bytes: &[u8]) -> ParseResult<String> {
    String::from_utf8(bytes.to_vec()).map_err(|_| ParseError::malformed("invalid utf-8 text"))
}

fn parse_i64(data: &[u8]) -> ParseResult<i64> {
    // Explicit sign handling keeps `+5` and empty payloads out, which
    // `str::parse` would otherwise accept or misreport.
    let digits = data.strip_prefix(b"-").unwrap_or(data);
    if digits.is_empty() || !digits.iter().all(u8::is_ascii_digit) {
        return Err(ParseError::malformed(format!(
            "invalid integer text {:?}",
            String::from_utf8_lossy(data)
        )));
    }
    // Digits-only ASCII is valid UTF-8; the only failure left is overflow.
    std::str::from_utf8(data)
        .ok()
        .and_then(|text| text.parse::<i64>().ok())
        .ok_or_else(|| {
            ParseError::malformed(format!(
                "integer {} out of 64-bit range",
                String::from_utf8_lossy(data)
            ))
        })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parsed(input: &[u8]) -> Value {
        parse(input).expect("parse")
    }

    fn failure(input: &[u8]) -> ParseError {
        parse(input).expect_err("expected failure")
    }

    #[test]
    fn parses_scalars() {
        assert_eq!(parsed(b"+OK\r\n"), Value::simple("OK"));
        assert_eq!(parsed(b"-ERR bad\r\n"), Value::error("ERR bad"));
        assert_eq!(parsed(b":-42\r\n"), Value::Integer(-42));
        assert_eq!(parsed(b"_\r\n"), Value::Null);
        assert_eq!(parsed(b"#t\r\n"), Value::Boolean(true));
        assert_eq!(parsed(b"#f\r\n"), Value::Boolean(false));
        assert_eq!(parsed(b",2.5\r\n"), Value::Double(2.5));
        assert_eq!(parsed(b",inf\r\n"), Value::Double(f64::INFINITY));
        assert_eq!(parsed(b",-inf\r\n"), Value::Double(f64::NEG_INFINITY));
    }

    #[test]
    fn parses_nan_double() {
        match parsed(b",nan\r\n") {
            Value::Double(d) => assert!(d.is_nan()),
            other => panic!("unexpected {:?}", other),
        }
    }

    #[test]
    fn integer_limits() {
        assert_eq!(parsed(b":9223372036854775807\r\n"), Value::Integer(i64::MAX));
        assert_eq!(parsed(b":-9223372036854775808\r\n"), Value::Integer(i64::MIN));
        let err = failure(b":9223372036854775808\r\n");
        assert_eq!(err.kind(), ParseErrorKind::Malformed);
        assert_eq!(err.path(), &["integer"]);
        assert!(failure(b":+5\r\n").to_string().starts_with("integer: invalid integer text"));
    }

    #[test]
    fn null_bulk_and_array_are_distinct_from_empty() {
        assert_eq!(parsed(b"$-1\r\n"), Value::BulkString(None));
        assert_eq!(parsed(b"$0\r\n\r\n"), Value::bulk(""));
        assert_ne!(parsed(b"$-1\r\n"), parsed(b"$0\r\n\r\n"));
        assert_eq!(parsed(b"*-1\r\n"), Value::Array(None));
        assert_eq!(parsed(b"*0\r\n"), Value::Array(Some(Vec::new())));
    }

    #[test]
    fn bulk_string_is_binary_safe() {
        assert_eq!(parsed(b"$4\r\na\r\nb\r\n"), Value::bulk(&b"a\r\nb"[..]));
    }

    #[test]
    fn parses_nested_arrays() {
        let value = parsed(b"*2\r\n*2\r\n+a\r\n+b\r\n*2\r\n+c\r\n+d\r\n");
        assert_eq!(
            value,
            Value::Array(Some(vec![
                Value::Array(Some(vec![Value::simple("a"), Value::simple("b")])),
                Value::Array(Some(vec![Value::simple("c"), Value::simple("d")])),
            ]))
        );
    }

    #[test]
    fn parses_big_number_exactly() {
        let digits = "1".repeat(100);
        let input = format!("({}\r\n", digits);
        match parsed(input.as_bytes()) {
            Value::BigNumber(n) => assert_eq!(n.as_str(), digits),
            other => panic!("unexpected {:?}", other),
        }
    }

    #[test]
    fn parses_bulk_error_and_verbatim() {
        assert_eq!(
            parsed(b"!21\r\nSYNTAX invalid syntax\r\n"),
            Value::BulkError(Bytes::from_static(b"SYNTAX invalid syntax"))
        );
        assert_eq!(
            parsed(b"=15\r\ntxt:Some string\r\n"),
            Value::VerbatimString {
                format: *b"txt",
                content: Bytes::from_static(b"Some string"),
            }
        );
        assert_eq!(
            parsed(b"=4\r\nmkd:\r\n"),
            Value::VerbatimString {
                format: *b"mkd",
                content: Bytes::new(),
            }
        );
    }

    #[test]
    fn verbatim_requires_separator() {
        let err = failure(b"=8\r\ntxt-abcd\r\n");
        assert_eq!(err.path(), &["verbatim string"]);
        assert!(failure(b"=3\r\ntxt\r\n").message().contains("too short"));
    }

    #[test]
    fn parses_map_in_wire_order() {
        let value = parsed(b"%2\r\n+b\r\n:2\r\n+a\r\n:1\r\n");
        assert_eq!(
            value,
            Value::Map(vec![
                (Value::simple("b"), Value::Integer(2)),
                (Value::simple("a"), Value::Integer(1)),
            ])
        );
    }

    #[test]
    fn parses_attribute_then_value() {
        let value = parsed(b"|1\r\n+ttl\r\n:3600\r\n$3\r\nval\r\n");
        assert_eq!(
            value,
            Value::Attribute {
                attrs: vec![(Value::simple("ttl"), Value::Integer(3600))],
                value: Box::new(Value::bulk("val")),
            }
        );
    }

    #[test]
    fn parses_set_and_push() {
        assert_eq!(
            parsed(b"~2\r\n:1\r\n:1\r\n"),
            Value::Set(vec![Value::Integer(1), Value::Integer(1)])
        );
        assert_eq!(
            parsed(b">3\r\n$7\r\nmessage\r\n+chan\r\n$2\r\nhi\r\n"),
            Value::Push {
                kind: "message".to_string(),
                data: vec![Value::simple("chan"), Value::bulk("hi")],
            }
        );
        assert_eq!(
            parsed(b">2\r\n+pubsub\r\n:1\r\n"),
            Value::Push {
                kind: "pubsub".to_string(),
                data: vec![Value::Integer(1)],
            }
        );
    }

    #[test]
    fn push_requires_kind_and_one_element() {
        let err = failure(b">1\r\n+pubsub\r\n");
        assert_eq!(err.kind(), ParseErrorKind::Malformed);
        assert!(err.to_string().contains("must have at least kind and one element"));
        assert_eq!(err.path(), &["push"]);
    }

    #[test]
    fn push_kind_must_be_text() {
        let err = failure(b">2\r\n:1\r\n:2\r\n");
        assert_eq!(err.path(), &["push", "push kind"]);
        let err = failure(b">2\r\n$-1\r\n:2\r\n");
        assert!(err.message().contains("null bulk string"));
    }

    #[test]
    fn reports_nested_path_on_truncation() {
        let err = failure(b"*1\r\n");
        assert!(err.is_incomplete());
        assert_eq!(
            err.to_string(),
            "array > array elements > empty: unexpected end of input"
        );

        let err = failure(b"*2\r\n*1\r\n");
        assert_eq!(err.path(), &["array", "array elements", "array", "array elements", "empty"]);
    }

    #[test]
    fn truncated_body_is_incomplete() {
        let err = failure(b"$10\r\nhello\r\n");
        assert!(err.is_incomplete());
        assert_eq!(err.path(), &["bulk string"]);
        assert!(failure(b"+OK").is_incomplete());
        assert!(failure(b"").is_incomplete());
    }

    #[test]
    fn malformed_inputs() {
        let err = failure(b"?oops\r\n");
        assert_eq!(err.kind(), ParseErrorKind::Malformed);
        assert!(err.to_string().contains("0x3f"));

        assert_eq!(failure(b"#x\r\n").path(), &["boolean"]);
        assert_eq!(failure(b",abc\r\n").path(), &["double"]);
        assert_eq!(failure(b"(12a\r\n").path(), &["big number"]);
        assert_eq!(failure(b"_x\r\n").path(), &["null"]);
        assert_eq!(failure(b"$x\r\n").path(), &["bulk string", "length"]);
        assert_eq!(failure(b"%-1\r\n").path(), &["map", "length"]);
        assert!(failure(b"$3\r\nabcXY").message().contains("CRLF"));
        assert_eq!(
            failure(b"*1\r\n$x\r\n").path(),
            &["array", "array elements", "bulk string", "length"]
        );
    }

    #[test]
    fn trailing_bytes_are_rejected() {
        let err = failure(b"+OK\r\n+OK\r\n");
        assert_eq!(err.kind(), ParseErrorKind::Malformed);
        let (value, used) = parse_prefix(b"+OK\r\n+OK\r\n").expect("prefix");
        assert_eq!(value, Value::simple("OK"));
        assert_eq!(used, 5);
    }

    #[test]
    fn hostile_length_does_not_preallocate() {
        let err = failure(b"*4294967295\r\n:1\r\n");
        assert!(err.is_incomplete());
    }

    #[test]
    fn attribute_without_entries_still_wraps_a_value() {
        assert_eq!(
            parsed(b"|0\r\n+x\r\n"),
            Value::Attribute {
                attrs: Vec::new(),
                value: Box::new(Value::simple("x")),
            }
        );
    }

    #[test]
    fn nesting_is_limited() {
        let mut input = "*1\r\n".repeat(MAX_DEPTH).into_bytes();
        input.extend_from_slice(b":1\r\n");
        assert!(parse(&input).is_ok());

        let mut input = "*1\r\n".repeat(20_000).into_bytes();
        input.extend_from_slice(b":1\r\n");
        let err = failure(&input);
        assert_eq!(err.kind(), ParseErrorKind::Malformed);
        assert!(err.message().contains("nesting too deep"));
        assert_eq!(err.path().last(), Some(&"array"));
    }

    #[test]
    fn parser_resumes_after_consumed_bytes() {
        let mut parser = Parser::default();
        let (step, used) = parser.advance(b"*3\r\n:1\r\n:2");
        assert!(matches!(step, Step::NeedMore(_)));
        assert_eq!(used, 8);

        // Only the unconsumed tail is offered again.
        let (step, used) = parser.advance(b":2\r\n:3\r\n+next\r\n");
        match step {
            Step::Done(value) => assert_eq!(
                value,
                Value::Array(Some(vec![
                    Value::Integer(1),
                    Value::Integer(2),
                    Value::Integer(3)
                ]))
            ),
            other => panic!("unexpected {:?}", other),
        }
        assert_eq!(used, 8);
    }
}
