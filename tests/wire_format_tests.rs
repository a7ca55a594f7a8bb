//! Byte-exact encodings: integer width boundaries in every binary codec and
//! published test vectors.

use valuestream::{
    from_binn, from_bson, from_cbor, from_message_pack, from_ubjson, to_binn, to_bson, to_cbor,
    to_message_pack, to_ubjson, value, Value,
};

fn check(
    name: &str,
    cases: &[(Value, &[u8])],
    encode: fn(&Value) -> valuestream::Result<Vec<u8>>,
    decode: fn(&[u8]) -> valuestream::Result<Value>,
) {
    for (value, expected) in cases {
        let bytes = encode(value).unwrap();
        assert_eq!(&bytes[..], *expected, "{} encoding of {:?}", name, value);
        assert_eq!(&decode(&bytes).unwrap(), value, "{} decoding of {:?}", name, value);
    }
}

#[test]
fn test_message_pack_integer_boundaries() {
    let cases: &[(Value, &[u8])] = &[
        (Value::from(127), b"\x7f"),
        (Value::from(128), b"\xcc\x80"),
        (Value::from(255), b"\xcc\xff"),
        (Value::from(256), b"\xcd\x01\x00"),
        (Value::from(1 << 15), b"\xcd\x80\x00"),
        (Value::from(65535), b"\xcd\xff\xff"),
        (Value::from(65536), b"\xce\x00\x01\x00\x00"),
        (Value::from(1i64 << 31), b"\xce\x80\x00\x00\x00"),
        (Value::from(u32::MAX), b"\xce\xff\xff\xff\xff"),
        (Value::from(1i64 << 32), b"\xcf\x00\x00\x00\x01\x00\x00\x00\x00"),
        (Value::from(i64::MAX), b"\xcf\x7f\xff\xff\xff\xff\xff\xff\xff"),
        (Value::from(u64::MAX), b"\xcf\xff\xff\xff\xff\xff\xff\xff\xff"),
        (Value::from(-32), b"\xe0"),
        (Value::from(-33), b"\xd0\xdf"),
        (Value::from(-128), b"\xd0\x80"),
        (Value::from(-129), b"\xd1\xff\x7f"),
        (Value::from(-32768), b"\xd1\x80\x00"),
        (Value::from(-32769), b"\xd2\xff\xff\x7f\xff"),
        (Value::from(i64::from(i32::MIN)), b"\xd2\x80\x00\x00\x00"),
        (Value::from(i64::from(i32::MIN) - 1), b"\xd3\xff\xff\xff\xff\x7f\xff\xff\xff"),
        (Value::from(i64::MIN), b"\xd3\x80\x00\x00\x00\x00\x00\x00\x00"),
    ];
    check("msgpack", cases, to_message_pack, from_message_pack);
}

#[test]
fn test_cbor_integer_boundaries() {
    let cases: &[(Value, &[u8])] = &[
        (Value::from(23), b"\x17"),
        (Value::from(24), b"\x18\x18"),
        (Value::from(255), b"\x18\xff"),
        (Value::from(256), b"\x19\x01\x00"),
        (Value::from(65535), b"\x19\xff\xff"),
        (Value::from(65536), b"\x1a\x00\x01\x00\x00"),
        (Value::from(u32::MAX), b"\x1a\xff\xff\xff\xff"),
        (Value::from(1i64 << 32), b"\x1b\x00\x00\x00\x01\x00\x00\x00\x00"),
        (Value::from(u64::MAX), b"\x1b\xff\xff\xff\xff\xff\xff\xff\xff"),
        (Value::from(-1), b"\x20"),
        (Value::from(-24), b"\x37"),
        (Value::from(-25), b"\x38\x18"),
        (Value::from(-256), b"\x38\xff"),
        (Value::from(-257), b"\x39\x01\x00"),
        (Value::from(i64::MIN), b"\x3b\x7f\xff\xff\xff\xff\xff\xff\xff"),
    ];
    check("cbor", cases, to_cbor, from_cbor);
}

#[test]
fn test_ubjson_integer_boundaries() {
    let cases: &[(Value, &[u8])] = &[
        (Value::from(0), b"U\x00"),
        (Value::from(255), b"U\xff"),
        (Value::from(256), b"I\x01\x00"),
        (Value::from(-1), b"i\xff"),
        (Value::from(-128), b"i\x80"),
        (Value::from(-129), b"I\xff\x7f"),
        (Value::from(32767), b"I\x7f\xff"),
        (Value::from(32768), b"l\x00\x00\x80\x00"),
        (Value::from(i64::from(i32::MAX)), b"l\x7f\xff\xff\xff"),
        (Value::from(1i64 << 31), b"L\x00\x00\x00\x00\x80\x00\x00\x00"),
        (Value::from(i64::MIN), b"L\x80\x00\x00\x00\x00\x00\x00\x00"),
    ];
    check("ubjson", cases, to_ubjson, from_ubjson);

    // above i64 the only form is a high-precision number, read back as text
    let big = to_ubjson(&Value::from(u64::MAX)).unwrap();
    assert_eq!(big, b"HU\x1418446744073709551615");
    let back = from_ubjson(&big).unwrap();
    assert_eq!(back.subtype, valuestream::subtype::BIGNUM);
    assert_eq!(back.as_u64(), None);
    assert_eq!(back.as_str(), Some("18446744073709551615"));
}

#[test]
fn test_binn_integer_boundaries() {
    let cases: &[(Value, &[u8])] = &[
        (Value::from(255), b"\x20\xff"),
        (Value::from(256), b"\x40\x01\x00"),
        (Value::from(65535), b"\x40\xff\xff"),
        (Value::from(65536), b"\x60\x00\x01\x00\x00"),
        (Value::from(u32::MAX), b"\x60\xff\xff\xff\xff"),
        (Value::from(1i64 << 32), b"\x80\x00\x00\x00\x01\x00\x00\x00\x00"),
        (Value::from(u64::MAX), b"\x80\xff\xff\xff\xff\xff\xff\xff\xff"),
        (Value::from(-1), b"\x21\xff"),
        (Value::from(-128), b"\x21\x80"),
        (Value::from(-129), b"\x41\xff\x7f"),
        (Value::from(-32769), b"\x61\xff\xff\x7f\xff"),
        (Value::from(i64::MIN), b"\x81\x80\x00\x00\x00\x00\x00\x00\x00"),
    ];
    check("binn", cases, to_binn, from_binn);
}

#[test]
fn test_bson_integer_widths() {
    let cases: &[(Value, &[u8])] = &[
        (
            value!({"n": (i64::from(i32::MAX))}),
            b"\x0c\x00\x00\x00\x10n\x00\xff\xff\xff\x7f\x00",
        ),
        (
            value!({"n": (1i64 << 31)}),
            b"\x10\x00\x00\x00\x12n\x00\x00\x00\x00\x80\x00\x00\x00\x00\x00",
        ),
    ];
    check("bson", cases, to_bson, from_bson);
}

#[test]
fn test_real_widths() {
    let cases: &[(Value, &[u8])] = &[
        (Value::from(1.5), b"\xca\x3f\xc0\x00\x00"),
        (Value::from(0.1), b"\xcb\x3f\xb9\x99\x99\x99\x99\x99\x9a"),
    ];
    check("msgpack", cases, to_message_pack, from_message_pack);

    let cases: &[(Value, &[u8])] = &[
        (Value::from(1.5), b"\xf9\x3e\x00"),
        (Value::from(100000.0), b"\xfa\x47\xc3\x50\x00"),
        (Value::from(1.1), b"\xfb\x3f\xf1\x99\x99\x99\x99\x99\x9a"),
    ];
    check("cbor", cases, to_cbor, from_cbor);
}

#[test]
fn test_cbor_rfc_vectors() {
    let cases: &[(Value, &[u8])] = &[
        (value!([1, [2, 3], [4, 5]]), b"\x83\x01\x82\x02\x03\x82\x04\x05"),
        (value!({"a": 1, "b": [2, 3]}), b"\xa2\x61a\x01\x61b\x82\x02\x03"),
        (value!("\u{fc}"), b"\x62\xc3\xbc"),
        (value!(""), b"\x60"),
    ];
    check("cbor", cases, to_cbor, from_cbor);

    // indefinite-length forms decode to the same values
    assert_eq!(
        from_cbor(b"\x9f\x01\x82\x02\x03\x9f\x04\x05\xff\xff").unwrap(),
        value!([1, [2, 3], [4, 5]])
    );
    assert_eq!(
        from_cbor(b"\xbf\x63Fun\xf5\x63Amt\x21\xff").unwrap(),
        value!({"Fun": true, "Amt": (-2)})
    );
    assert_eq!(
        from_cbor(b"\x7f\x65strea\x64ming\xff").unwrap(),
        value!("streaming")
    );
}
