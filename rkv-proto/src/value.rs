//! # Value Model
//!
//! Purpose: Represent every RESP3 value as one closed, recursive enum.
//!
//! ## Design Principles
//! 1. **Owned Children**: Composite variants own their elements; there is no
//!    sharing, so plain `Vec`/`Box` ownership is enough.
//! 2. **Binary-Safe**: Length-framed payloads are `Bytes`, line-framed ones are
//!    `String` (they can never carry CR/LF).
//! 3. **Null Is Not Empty**: `BulkString(None)` and `Array(None)` are distinct
//!    from their empty counterparts and from `Null`.

use std::fmt;

use bytes::Bytes;

/// RESP3 protocol value.
///
/// Equality is structural. `Double(f64::NAN)` is never equal to itself.
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    /// `+OK`
    SimpleString(String),
    /// `-ERR ...`
    SimpleError(String),
    /// `:42`
    Integer(i64),
    /// `$5 hello`, with `None` for `$-1`.
    BulkString(Option<Bytes>),
    /// `*2 ...`, with `None` for `*-1`.
    Array(Option<Vec<Value>>),
    /// `_`
    Null,
    /// `#t` / `#f`
    Boolean(bool),
    /// `,3.14`, may be infinite or NaN.
    Double(f64),
    /// `(3492890328409238509324850943850943825024385`
    BigNumber(BigNumber),
    /// `!21 SYNTAX invalid syntax`
    BulkError(Bytes),
    /// `=15 txt:Some string`
    VerbatimString { format: [u8; 3], content: Bytes },
    /// `%2 ...`, pairs kept in wire order.
    Map(Vec<(Value, Value)>),
    /// `|1 ...` followed by the value the attributes annotate.
    Attribute {
        attrs: Vec<(Value, Value)>,
        value: Box<Value>,
    },
    /// `~3 ...`, elements kept in wire order.
    Set(Vec<Value>),
    /// `>3 kind ...`, server-initiated message.
    ///
    /// The wire form needs at least one element after the kind, so a push
    /// with empty `data` encodes to bytes the parser rejects.
    Push { kind: String, data: Vec<Value> },
}

impl Value {
    /// Builds a simple string.
    pub fn simple(text: impl Into<String>) -> Self {
        Value::SimpleString(text.into())
    }

    /// Builds a simple error.
    pub fn error(text: impl Into<String>) -> Self {
        Value::SimpleError(text.into())
    }

    /// Builds a non-null bulk string.
    pub fn bulk(data: impl Into<Bytes>) -> Self {
        Value::BulkString(Some(data.into()))
    }

    /// Builds a command in its wire shape: an array of bulk strings whose
    /// first element is the command name.
    ///
    /// ```
    /// use rkv_proto::Value;
    ///
    /// let cmd = Value::command(["GET", "key"]);
    /// assert_eq!(&cmd.encode()[..], b"*2\r\n$3\r\nGET\r\n$3\r\nkey\r\n");
    /// ```
    pub fn command<I, A>(args: I) -> Self
    where
        I: IntoIterator<Item = A>,
        A: AsRef<[u8]>,
    {
        let items = args
            .into_iter()
            .map(|arg| Value::bulk(Bytes::copy_from_slice(arg.as_ref())))
            .collect();
        Value::Array(Some(items))
    }

    /// Static name of the variant, used in diagnostics.
    pub fn kind(&self) -> &'static str {
        match self {
            Value::SimpleString(_) => "simple string",
            Value::SimpleError(_) => "simple error",
            Value::Integer(_) => "integer",
            Value::BulkString(Some(_)) => "bulk string",
            Value::BulkString(None) => "null bulk string",
            Value::Array(Some(_)) => "array",
            Value::Array(None) => "null array",
            Value::Null => "null",
            Value::Boolean(_) => "boolean",
            Value::Double(_) => "double",
            Value::BigNumber(_) => "big number",
            Value::BulkError(_) => "bulk error",
            Value::VerbatimString { .. } => "verbatim string",
            Value::Map(_) => "map",
            Value::Attribute { .. } => "attribute",
            Value::Set(_) => "set",
            Value::Push { .. } => "push",
        }
    }

    /// Returns true for `SimpleError` and `BulkError`.
    pub fn is_error(&self) -> bool {
        matches!(self, Value::SimpleError(_) | Value::BulkError(_))
    }

    /// Error text for the two error variants.
    pub fn error_message(&self) -> Option<String> {
        match self {
            Value::SimpleError(text) => Some(text.clone()),
            Value::BulkError(data) => Some(String::from_utf8_lossy(data).into_owned()),
            _ => None,
        }
    }
}

/// Arbitrary-precision integer kept as its exact decimal text.
///
/// The text is validated on construction (optional `-`, then at least one
/// ASCII digit) and never normalised, so `007` stays `007`.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct BigNumber(String);

impl BigNumber {
    /// Validates decimal text. Returns `None` for anything but `-?[0-9]+`.
    pub fn new(text: impl Into<String>) -> Option<Self> {
        let text = text.into();
        let digits = text.strip_prefix('-').unwrap_or(&text);
        if digits.is_empty() || !digits.bytes().all(|b| b.is_ascii_digit()) {
            return None;
        }
        Some(BigNumber(text))
    }

    /// Decimal text exactly as received.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl From<i64> for BigNumber {
    fn from(value: i64) -> Self {
        BigNumber(value.to_string())
    }
}

impl fmt::Display for BigNumber {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write_value(f, self, 0)
    }
}

// redis-cli style rendering; nested collections are indented by their
// position prefix width.
fn write_value(f: &mut fmt::Formatter<'_>, value: &Value, indent: usize) -> fmt::Result {
    match value {
        Value::SimpleString(text) => f.write_str(text),
        Value::SimpleError(text) => write!(f, "(error) {}", text),
        Value::Integer(n) => write!(f, "(integer) {}", n),
        Value::BulkString(Some(data)) => write!(f, "{:?}", String::from_utf8_lossy(data)),
        Value::BulkString(None) | Value::Array(None) | Value::Null => f.write_str("(nil)"),
        Value::Boolean(b) => write!(f, "({})", b),
        Value::Double(d) => write!(f, "(double) {}", d),
        Value::BigNumber(n) => write!(f, "(big number) {}", n),
        Value::BulkError(data) => write!(f, "(error) {}", String::from_utf8_lossy(data)),
        Value::VerbatimString { format, content } => write!(
            f,
            "{}:{}",
            String::from_utf8_lossy(format),
            String::from_utf8_lossy(content)
        ),
        Value::Array(Some(items)) | Value::Set(items) => write_items(f, items.iter(), indent),
        Value::Push { kind, data } => {
            write!(f, "(push) {}", kind)?;
            if !data.is_empty() {
                writeln!(f)?;
                write!(f, "{:indent$}", "", indent = indent)?;
                write_items(f, data.iter(), indent)?;
            }
            Ok(())
        }
        Value::Map(pairs) => write_pairs(f, pairs, indent),
        Value::Attribute { attrs, value } => {
            f.write_str("(attribute) ")?;
            write_pairs(f, attrs, indent + 12)?;
            writeln!(f)?;
            write!(f, "{:indent$}", "", indent = indent)?;
            write_value(f, value, indent)
        }
    }
}

fn write_items<'a>(
    f: &mut fmt::Formatter<'_>,
    items: impl ExactSizeIterator<Item = &'a Value>,
    indent: usize,
) -> fmt::Result {
    if items.len() == 0 {
        return f.write_str("(empty)");
    }
    for (idx, item) in items.enumerate() {
        if idx > 0 {
            writeln!(f)?;
            write!(f, "{:indent$}", "", indent = indent)?;
        }
        let prefix = format!("{}) ", idx + 1);
        f.write_str(&prefix)?;
        write_value(f, item, indent + prefix.len())?;
    }
    Ok(())
}

fn write_pairs(f: &mut fmt::Formatter<'_>, pairs: &[(Value, Value)], indent: usize) -> fmt::Result {
    if pairs.is_empty() {
        return f.write_str("(empty)");
    }
    for (idx, (key, value)) in pairs.iter().enumerate() {
        if idx > 0 {
            writeln!(f)?;
            write!(f, "{:indent$}", "", indent = indent)?;
        }
        let prefix = format!("{}# ", idx + 1);
        f.write_str(&prefix)?;
        write_value(f, key, indent + prefix.len())?;
        f.write_str(" => ")?;
        write_value(f, value, indent + prefix.len() + 4)?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn null_variants_are_distinct() {
        assert_ne!(Value::BulkString(None), Value::bulk(""));
        assert_ne!(Value::Array(None), Value::Array(Some(Vec::new())));
        assert_ne!(Value::Null, Value::BulkString(None));
        assert_ne!(Value::Null, Value::Array(None));
    }

    #[test]
    fn nan_is_not_equal_to_itself() {
        assert_ne!(Value::Double(f64::NAN), Value::Double(f64::NAN));
        assert_eq!(Value::Double(1.5), Value::Double(1.5));
    }

    #[test]
    fn big_number_validation() {
        assert!(BigNumber::new("12345678901234567890123").is_some());
        assert!(BigNumber::new("-42").is_some());
        assert!(BigNumber::new("").is_none());
        assert!(BigNumber::new("-").is_none());
        assert!(BigNumber::new("12a").is_none());
        assert!(BigNumber::new("+1").is_none());
        assert_eq!(BigNumber::new("007").unwrap().as_str(), "007");
        assert_eq!(BigNumber::from(-3).as_str(), "-3");
    }

    #[test]
    fn command_builds_bulk_array() {
        let cmd = Value::command(["SET", "k", "v"]);
        assert_eq!(
            cmd,
            Value::Array(Some(vec![Value::bulk("SET"), Value::bulk("k"), Value::bulk("v")]))
        );
    }

    #[test]
    fn error_helpers() {
        assert!(Value::error("ERR x").is_error());
        assert!(Value::BulkError(Bytes::from_static(b"SYNTAX bad")).is_error());
        assert!(!Value::simple("OK").is_error());
        assert_eq!(
            Value::BulkError(Bytes::from_static(b"SYNTAX bad")).error_message(),
            Some("SYNTAX bad".to_string())
        );
        assert_eq!(Value::Integer(1).error_message(), None);
    }

    #[test]
    fn display_nested_array() {
        let value = Value::Array(Some(vec![
            Value::simple("a"),
            Value::Array(Some(vec![Value::Integer(1), Value::BulkString(None)])),
        ]));
        assert_eq!(value.to_string(), "1) a\n2) 1) (integer) 1\n   2) (nil)");
    }

    #[test]
    fn display_scalars() {
        assert_eq!(Value::bulk("hi").to_string(), "\"hi\"");
        assert_eq!(Value::Array(Some(Vec::new())).to_string(), "(empty)");
        assert_eq!(Value::Boolean(true).to_string(), "(true)");
        assert_eq!(Value::error("ERR no").to_string(), "(error) ERR no");
    }
}
