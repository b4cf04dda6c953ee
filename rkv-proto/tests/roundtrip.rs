use bytes::Bytes;
use proptest::collection::vec;
use proptest::option;
use proptest::prelude::*;

use rkv_proto::{encode, parse, parse_prefix, BigNumber, Decoder, Feed, Value};

fn scalar() -> impl Strategy<Value = Value> {
    prop_oneof![
        "[a-zA-Z0-9 _.:-]{0,16}".prop_map(Value::SimpleString),
        "[A-Z]{1,8} [a-z ]{0,16}".prop_map(Value::SimpleError),
        any::<i64>().prop_map(Value::Integer),
        option::of(vec(any::<u8>(), 0..32)).prop_map(|data| Value::BulkString(data.map(Bytes::from))),
        Just(Value::Null),
        any::<bool>().prop_map(Value::Boolean),
        any::<f64>()
            .prop_filter("NaN never equals itself", |d| !d.is_nan())
            .prop_map(Value::Double),
        "-?[1-9][0-9]{0,120}"
            .prop_map(|text| Value::BigNumber(BigNumber::new(text).expect("generated digits"))),
        vec(any::<u8>(), 0..32).prop_map(|data| Value::BulkError(Bytes::from(data))),
        (any::<[u8; 3]>(), vec(any::<u8>(), 0..32)).prop_map(|(format, content)| {
            Value::VerbatimString {
                format,
                content: Bytes::from(content),
            }
        }),
    ]
}

fn value() -> impl Strategy<Value = Value> {
    scalar().prop_recursive(4, 64, 6, |inner| {
        prop_oneof![
            option::of(vec(inner.clone(), 0..6)).prop_map(Value::Array),
            vec((inner.clone(), inner.clone()), 0..4).prop_map(Value::Map),
            (vec((inner.clone(), inner.clone()), 0..3), inner.clone()).prop_map(|(attrs, value)| {
                Value::Attribute {
                    attrs,
                    value: Box::new(value),
                }
            }),
            vec(inner.clone(), 0..6).prop_map(Value::Set),
            ("[a-z]{1,10}", vec(inner, 1..5)).prop_map(|(kind, data)| Value::Push { kind, data }),
        ]
    })
}

proptest! {
    #[test]
    fn encoded_values_parse_back(value in value()) {
        let wire = encode(&value);
        prop_assert_eq!(parse(&wire), Ok(value));
    }

    #[test]
    fn one_byte_chunks_decode_like_whole_input(value in value()) {
        let wire = encode(&value);
        let mut decoder = Decoder::new();
        let mut decoded = None;
        for byte in wire.iter() {
            match decoder.feed(&[*byte]) {
                Feed::NeedMore(next) => decoder = next,
                Feed::Done { value, leftover } => {
                    prop_assert!(leftover.is_empty());
                    decoded = Some(value);
                    break;
                }
                Feed::Failed(err) => return Err(TestCaseError::fail(err.to_string())),
            }
        }
        prop_assert_eq!(decoded, Some(value));
    }

    #[test]
    fn prefix_parse_stops_at_value_end(value in value(), tail in vec(any::<u8>(), 0..16)) {
        let wire = encode(&value);
        let mut input = wire.to_vec();
        input.extend_from_slice(&tail);
        let (parsed, used) = parse_prefix(&input).expect("prefix");
        prop_assert_eq!(used, wire.len());
        prop_assert_eq!(parsed, value);
    }
}

#[test]
fn hundred_digit_big_number_survives_round_trip() {
    let digits = format!("-{}", "1234567890".repeat(10));
    let input = format!("({}\r\n", digits);
    let value = parse(input.as_bytes()).expect("parse");
    assert_eq!(&encode(&value)[..], input.as_bytes());
}

#[test]
fn nan_serializes_to_fixed_text() {
    let value = parse(&encode(&Value::Double(f64::NAN))).expect("parse");
    assert_eq!(&encode(&value)[..], b",nan\r\n");
}
