//! Property-based tests: round trips through every codec and agreement
//! between the measuring and writing passes of the size-prefixed formats.

use proptest::prelude::*;
use valuestream::io::Counter;
use valuestream::stream::StreamHandler;
use valuestream::tree::write_value;
use valuestream::{binn, bson, cbor, subtype, ErrorKind, Hooks, ObjectMap, Value};
use valuestream::{
    from_bencode, from_binn, from_bson, from_cbor, from_csv, from_json, from_message_pack,
    from_tsv, from_ubjson, to_bencode, to_binn, to_bson, to_cbor, to_csv, to_json,
    to_message_pack, to_tsv, to_ubjson,
};

fn text() -> impl Strategy<Value = String> {
    "\\PC{0,12}"
}

fn real() -> impl Strategy<Value = f64> {
    any::<f64>().prop_filter("finite", |r| r.is_finite())
}

fn scalar() -> impl Strategy<Value = Value> {
    prop_oneof![
        Just(Value::null()),
        any::<bool>().prop_map(Value::from),
        any::<i64>().prop_map(Value::from),
        real().prop_map(Value::from),
        text().prop_map(Value::from),
    ]
}

fn tree(leaf: BoxedStrategy<Value>) -> impl Strategy<Value = Value> {
    leaf.prop_recursive(4, 48, 6, |inner| {
        prop_oneof![
            prop::collection::vec(inner.clone(), 0..6).prop_map(Value::from),
            prop::collection::vec((text(), inner), 0..6).prop_map(|entries| {
                let mut map = ObjectMap::new();
                for (k, v) in entries {
                    map.insert(k, v);
                }
                Value::from(map)
            }),
        ]
    })
}

fn any_value() -> impl Strategy<Value = Value> {
    tree(scalar().boxed())
}

/// Numbers no native type holds: integers past 64 bits and reals past `f64`.
fn bignum() -> impl Strategy<Value = Value> {
    prop_oneof!["-?[1-9][0-9]{20,40}", "-?[1-9][0-9]{0,3}e[4-9][0-9]{2,4}"]
        .prop_map(|text| Value::from(text).with_subtype(subtype::BIGNUM))
}

fn bencode_value() -> impl Strategy<Value = Value> {
    let leaf = prop_oneof![
        any::<i64>().prop_map(Value::from),
        prop::collection::vec(any::<u8>(), 0..12).prop_map(Value::bytes),
    ];
    tree(leaf.boxed())
}

fn document() -> impl Strategy<Value = Value> {
    prop::collection::vec((text(), any_value()), 0..6).prop_map(|entries| {
        let mut map = ObjectMap::new();
        for (k, v) in entries {
            map.insert(k, v);
        }
        Value::from(map)
    })
}

/// Rows of at least two scalars, so no row is written as an empty line.
fn rows() -> impl Strategy<Value = Value> {
    prop::collection::vec(
        prop::collection::vec(scalar(), 2..5).prop_map(Value::from),
        0..6,
    )
    .prop_map(Value::from)
}

fn counted<H: Hooks>(value: &Value, writer: H, into_inner: fn(H) -> Counter) -> usize {
    let mut handler = StreamHandler::new(writer);
    write_value(value, &mut handler).unwrap();
    into_inner(handler.into_hooks()).count()
}

proptest! {
    #[test]
    fn prop_json_round_trip(v in any_value()) {
        let text = to_json(&v).unwrap();
        prop_assert_eq!(from_json(&text).unwrap(), v);
    }

    #[test]
    fn prop_message_pack_round_trip(v in any_value()) {
        prop_assert_eq!(from_message_pack(&to_message_pack(&v).unwrap()).unwrap(), v);
    }

    #[test]
    fn prop_cbor_round_trip(v in any_value()) {
        prop_assert_eq!(from_cbor(&to_cbor(&v).unwrap()).unwrap(), v);
    }

    #[test]
    fn prop_ubjson_round_trip(v in any_value()) {
        prop_assert_eq!(from_ubjson(&to_ubjson(&v).unwrap()).unwrap(), v);
    }

    #[test]
    fn prop_bignums_round_trip(v in tree(prop_oneof![scalar(), bignum()].boxed())) {
        prop_assert_eq!(&from_json(&to_json(&v).unwrap()).unwrap(), &v);
        prop_assert_eq!(&from_cbor(&to_cbor(&v).unwrap()).unwrap(), &v);
        prop_assert_eq!(&from_ubjson(&to_ubjson(&v).unwrap()).unwrap(), &v);
        prop_assert_eq!(&from_binn(&to_binn(&v).unwrap()).unwrap(), &v);
    }

    #[test]
    fn prop_cbor_simple_values(n in any::<u8>()) {
        let v = Value::null().with_subtype(cbor::simple_subtype(n));
        match to_cbor(&v) {
            Ok(bytes) => {
                prop_assert_eq!(from_cbor(&bytes).unwrap(), v);
            }
            Err(err) => {
                prop_assert_eq!(err.kind(), ErrorKind::Range);
                prop_assert!((20..=31).contains(&n) && n != 23);
            }
        }
    }

    #[test]
    fn prop_bencode_round_trip(v in bencode_value()) {
        prop_assert_eq!(from_bencode(&to_bencode(&v).unwrap()).unwrap(), v);
    }

    #[test]
    fn prop_binn_round_trip(v in any_value()) {
        let bytes = to_binn(&v).unwrap();
        prop_assert_eq!(bytes.len(), binn::encoded_size(&v).unwrap());
        prop_assert_eq!(from_binn(&bytes).unwrap(), v);
    }

    #[test]
    fn prop_bson_round_trip(v in document()) {
        let bytes = to_bson(&v).unwrap();
        prop_assert_eq!(bytes.len(), bson::encoded_size(&v).unwrap());
        prop_assert_eq!(from_bson(&bytes).unwrap(), v);
    }

    #[test]
    fn prop_counting_sink_matches_measurement(v in document()) {
        let binn_count = counted(&v, binn::Writer::new(Counter::new()), binn::Writer::into_inner);
        prop_assert_eq!(binn_count, binn::encoded_size(&v).unwrap());
        let bson_count = counted(&v, bson::Writer::new(Counter::new()), bson::Writer::into_inner);
        prop_assert_eq!(bson_count, bson::encoded_size(&v).unwrap());
    }

    #[test]
    fn prop_csv_round_trip(v in rows()) {
        prop_assert_eq!(from_csv(&to_csv(&v).unwrap()).unwrap(), v.clone());
        prop_assert_eq!(from_tsv(&to_tsv(&v).unwrap()).unwrap(), v);
    }

    #[test]
    fn prop_parsers_never_panic(bytes in prop::collection::vec(any::<u8>(), 0..64)) {
        let _ = from_message_pack(&bytes);
        let _ = from_cbor(&bytes);
        let _ = from_ubjson(&bytes);
        let _ = from_binn(&bytes);
        let _ = from_bson(&bytes);
        let _ = from_bencode(&bytes);
        if let Ok(text) = std::str::from_utf8(&bytes) {
            let _ = from_json(text);
            let _ = from_csv(text);
        }
    }
}
