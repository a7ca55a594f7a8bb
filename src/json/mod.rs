//! JSON (RFC 8259) reader and writer.
//!
//! ## Mapping
//!
//! | JSON              | Value                                              |
//! |-------------------|----------------------------------------------------|
//! | `null`/`true`/`false` | `Null`/`Bool`                                  |
//! | integer           | `Int`, else `UInt`, else `Str` tagged `BIGNUM`     |
//! | fraction/exponent | `Real`, or `Str` tagged `BIGNUM` if it overflows   |
//! | string            | `Str`                                              |
//! | array / object    | `Array` / `Object` (keys must be strings)          |
//!
//! On output, `BIGNUM` strings are written as bare numbers and `BLOB` strings
//! as base64 text; the blob subtype does not survive a JSON round trip.
//!
//! ## Examples
//!
//! ```rust
//! use valuestream::{from_json, to_json, value};
//!
//! let v = from_json(r#"{"id": 18446744073709551616, "tags": ["a\nb"]}"#).unwrap();
//! assert_eq!(v.get("id").and_then(|n| n.as_str()), Some("18446744073709551616"));
//! assert_eq!(to_json(&v).unwrap(), r#"{"id":18446744073709551616,"tags":["a\nb"]}"#);
//! assert_eq!(to_json(&value!([1.0, null])).unwrap(), "[1.0,null]");
//! ```

mod de;
mod ser;

pub use de::Parser;
pub use ser::Writer;

/// Length of the JSON number at the start of `bytes` and whether it has
/// neither fraction nor exponent. `None` if `bytes` does not start with one.
pub(crate) fn scan_number(bytes: &[u8]) -> Option<(usize, bool)> {
    let digits = |from: usize| {
        bytes[from..]
            .iter()
            .take_while(|b| b.is_ascii_digit())
            .count()
    };
    let mut i = usize::from(bytes.first() == Some(&b'-'));
    match bytes.get(i) {
        Some(b'0') => i += 1,
        Some(b'1'..=b'9') => i += digits(i),
        _ => return None,
    }
    let mut integral = true;
    if bytes.get(i) == Some(&b'.') {
        let n = digits(i + 1);
        if n == 0 {
            return None;
        }
        i += 1 + n;
        integral = false;
    }
    if matches!(bytes.get(i), Some(b'e' | b'E')) {
        i += 1;
        if matches!(bytes.get(i), Some(b'+' | b'-')) {
            i += 1;
        }
        let n = digits(i);
        if n == 0 {
            return None;
        }
        i += n;
        integral = false;
    }
    Some((i, integral))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::value::subtype;
    use crate::{from_json, to_json, value, ErrorKind, Kind, ObjectMap, Value};

    #[test]
    fn test_scan_number() {
        assert_eq!(scan_number(b"0"), Some((1, true)));
        assert_eq!(scan_number(b"-12,"), Some((3, true)));
        assert_eq!(scan_number(b"1.5e-3]"), Some((6, false)));
        assert_eq!(scan_number(b"01"), Some((1, true)));
        assert_eq!(scan_number(b"-"), None);
        assert_eq!(scan_number(b"1."), None);
        assert_eq!(scan_number(b"1e+"), None);
        assert_eq!(scan_number(b".5"), None);
    }

    #[test]
    fn test_integer_classification() {
        assert!(matches!(from_json("-9223372036854775808").unwrap().kind, Kind::Int(i64::MIN)));
        assert!(matches!(from_json("18446744073709551615").unwrap().kind, Kind::UInt(u64::MAX)));
        let big = from_json("-9223372036854775809").unwrap();
        assert_eq!(big.subtype, subtype::BIGNUM);
        assert_eq!(big.as_str(), Some("-9223372036854775809"));
        assert_eq!(from_json("2.5").unwrap(), Value::from(2.5));
        assert_eq!(from_json("1e400").unwrap().subtype, subtype::BIGNUM);
    }

    #[test]
    fn test_out_of_range_numbers_stay_bare() {
        let text = "[1e400,123456789012345678901234567890,-0.0,1.5e300,-2.5E+999]";
        let v = from_json(text).unwrap();
        assert_eq!(v.as_array().unwrap()[0].as_str(), Some("1e400"));
        assert_eq!(v.as_array().unwrap()[4].subtype, subtype::BIGNUM);
        assert_eq!(to_json(&v).unwrap(), text);
        assert_eq!(from_json(&to_json(&v).unwrap()).unwrap(), v);

        // a bignum that is not a number at all is quoted
        let odd = Value::from("12x").with_subtype(subtype::BIGNUM);
        assert_eq!(to_json(&odd).unwrap(), r#""12x""#);
    }

    #[test]
    fn test_scalar_to_json() {
        assert_eq!(to_json(&Value::from(5)).unwrap(), "5");
        assert_eq!(to_json(&Value::from(u64::MAX)).unwrap(), "18446744073709551615");
        assert_eq!(to_json(&Value::from(-0.5)).unwrap(), "-0.5");
        assert_eq!(to_json(&Value::from(1e100)).unwrap(), "1e100");
        assert_eq!(to_json(&Value::null()).unwrap(), "null");
    }

    #[test]
    fn test_non_finite_reals_rejected() {
        let err = to_json(&Value::from(f64::NAN)).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Range);
        assert!(to_json(&Value::from(vec![Value::from(f64::INFINITY)])).is_err());
    }

    #[test]
    fn test_escaping_round_trip() {
        let text = "quote\" backslash\\ tab\t nl\n cr\r bell\u{7} del\u{7f} é 😀";
        let json = to_json(&Value::from(text)).unwrap();
        assert_eq!(
            json,
            "\"quote\\\" backslash\\\\ tab\\t nl\\n cr\\r bell\\u0007 del\u{7f} é 😀\""
        );
        assert_eq!(from_json(&json).unwrap(), Value::from(text));
        let ours: String = serde_json::from_str(&json).unwrap();
        assert_eq!(ours, text);
    }

    #[test]
    fn test_unicode_escapes() {
        assert_eq!(from_json(r#""é😀\/""#).unwrap(), Value::from("é😀/"));
        assert!(from_json(r#""\ud83d""#).is_err());
        assert!(from_json(r#""\ude00""#).is_err());
        assert!(from_json(r#""\u12g4""#).is_err());
    }

    #[test]
    fn test_non_string_key_rejected() {
        let mut map = ObjectMap::new();
        map.insert(1, 2);
        let err = to_json(&Value::from(map)).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Structure);

        let err = from_json("{1: 2}").unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Syntax);
    }

    #[test]
    fn test_blob_and_bignum_output() {
        assert_eq!(to_json(&Value::blob(b"hi!".to_vec())).unwrap(), "\"aGkh\"");
        let big = Value::bytes("123456789012345678901234567890").with_subtype(subtype::BIGNUM);
        assert_eq!(to_json(&big).unwrap(), "123456789012345678901234567890");
        let bogus = Value::bytes("12abc").with_subtype(subtype::BIGNUM);
        assert_eq!(to_json(&bogus).unwrap(), "\"12abc\"");
        let mut map = ObjectMap::new();
        map.insert(big.clone(), true);
        assert_eq!(
            to_json(&Value::from(map)).unwrap(),
            "{\"123456789012345678901234567890\":true}"
        );
    }

    #[test]
    fn test_malformed_documents() {
        for bad in [
            "", "[", "[1,]", "[,1]", "{\"a\"}", "{\"a\":}", "{\"a\":1,}", "[1 2]", "01", "1.",
            "tru", "nul", "\"abc", "[1]]", "{} x", "\"\u{1}\"", "-", "[\"a\":1]",
        ] {
            let err = from_json(bad).unwrap_err();
            assert_eq!(err.kind(), ErrorKind::Syntax, "input {:?}", bad);
        }
    }

    #[test]
    fn test_whitespace_and_nesting() {
        let v = from_json(" \n{ \"a\" : [ 1 , { } , [ ] ] ,\t\"b\" : \"\" }\r\n").unwrap();
        assert_eq!(v, value!({"a": [1, {}, []], "b": ""}));
        assert_eq!(to_json(&v).unwrap(), r#"{"a":[1,{},[]],"b":""}"#);
    }

    #[test]
    fn test_matches_serde_json() {
        let text = r#"{"age":36,"langs":["en","fr"],"name":"Ada","none":null,"ok":false,"score":0.25}"#;
        let ours = to_json(&from_json(text).unwrap()).unwrap();
        let theirs: serde_json::Value = serde_json::from_str(text).unwrap();
        assert_eq!(ours, serde_json::to_string(&theirs).unwrap());
    }

    #[test]
    fn test_long_string_crosses_chunks() {
        let long = "x".repeat(crate::io::CHUNK_SIZE * 3 + 17);
        let json = to_json(&Value::from(long.as_str())).unwrap();
        assert_eq!(from_json(&json).unwrap().as_str(), Some(long.as_str()));
    }
}
