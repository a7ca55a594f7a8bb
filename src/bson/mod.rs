//! BSON reader and writer.
//!
//! A BSON document is an int32 byte size, a run of elements and a NUL.
//! Each element is a type byte, a NUL-terminated name and the payload;
//! arrays are documents whose names are `"0"`, `"1"`, and so on. All
//! numbers are little-endian. Only objects can be documents, so the root
//! value must be an object.
//!
//! | BSON                         | Value                                   |
//! |------------------------------|-----------------------------------------|
//! | double                       | `Real`                                  |
//! | string / symbol              | `Str` / `Str` tagged `SYMBOL`           |
//! | document / array             | `Object` / `Array`                      |
//! | binary                       | `Str` tagged `BLOB`                     |
//! | ObjectId                     | 12-byte `Str` tagged [`OBJECT_ID`]      |
//! | bool / null                  | `Bool` / `Null`                         |
//! | UTC datetime                 | `Int` tagged `UNIX_TIMESTAMP_MS`        |
//! | int32 / int64                | `Int`                                   |
//! | timestamp                    | `Int`/`UInt` tagged [`TIMESTAMP`]       |
//!
//! Decimal128, regular expressions, JavaScript code and the deprecated
//! types are rejected when reading.
//!
//! ```rust
//! use valuestream::{bson, from_bson, to_bson, value};
//!
//! let v = value!({"hello": "world"});
//! let bytes = to_bson(&v).unwrap();
//! assert_eq!(bytes, b"\x16\x00\x00\x00\x02hello\x00\x06\x00\x00\x00world\x00\x00");
//! assert_eq!(bson::encoded_size(&v).unwrap(), 22);
//! assert_eq!(from_bson(&bytes).unwrap(), v);
//! ```

mod de;
mod ser;

pub use de::Parser;
pub use ser::Writer;

use crate::error::{Error, Result};
use crate::measure::{Layout, SizeTable};
use crate::value::{subtype, Kind, Subtype, Value};

const FORMAT: &str = "bson";

const DOUBLE: u8 = 0x01;
const STRING: u8 = 0x02;
const DOCUMENT: u8 = 0x03;
const ARRAY: u8 = 0x04;
const BINARY: u8 = 0x05;
const OBJECT_ID_TYPE: u8 = 0x07;
const BOOLEAN: u8 = 0x08;
const DATETIME: u8 = 0x09;
const NULL: u8 = 0x0a;
const SYMBOL: u8 = 0x0e;
const INT32: u8 = 0x10;
const TIMESTAMP_TYPE: u8 = 0x11;
const INT64: u8 = 0x12;
const DECIMAL128: u8 = 0x13;

const GENERIC_BINARY: u8 = 0x00;
const OBJECT_ID_LEN: usize = 12;
/// Size field plus terminating NUL.
const DOCUMENT_OVERHEAD: usize = 5;

/// Subtype of 12-byte ObjectId strings.
pub const OBJECT_ID: Subtype = subtype::USER + OBJECT_ID_TYPE as Subtype;

/// Subtype of the internal replication timestamp.
pub const TIMESTAMP: Subtype = subtype::USER + TIMESTAMP_TYPE as Subtype;

fn int_type(n: i64, subtype: Subtype) -> Result<u8> {
    match subtype {
        subtype::UNIX_TIMESTAMP_MS => Ok(DATETIME),
        TIMESTAMP if n < 0 => Err(Error::range(FORMAT, "negative timestamp")),
        TIMESTAMP => Ok(TIMESTAMP_TYPE),
        _ if i32::try_from(n).is_ok() => Ok(INT32),
        _ => Ok(INT64),
    }
}

fn uint_type(n: u64, subtype: Subtype) -> Result<u8> {
    if let Ok(n) = i64::try_from(n) {
        return int_type(n, subtype);
    }
    if subtype == TIMESTAMP {
        Ok(TIMESTAMP_TYPE)
    } else {
        Err(Error::range(
            FORMAT,
            format!("{} does not fit a signed 64-bit integer", n),
        ))
    }
}

fn string_type(subtype: Subtype, len: usize) -> Result<u8> {
    match subtype {
        subtype::BLOB => Ok(BINARY),
        subtype::SYMBOL => Ok(SYMBOL),
        OBJECT_ID if len == OBJECT_ID_LEN => Ok(OBJECT_ID_TYPE),
        OBJECT_ID => Err(Error::range(
            FORMAT,
            format!("ObjectId must be {} bytes, found {}", OBJECT_ID_LEN, len),
        )),
        _ => Ok(STRING),
    }
}

/// Bytes an element of type `ty` spends after its name; `len` is the
/// string length for string-like types.
fn payload_size(ty: u8, len: usize) -> usize {
    match ty {
        NULL => 0,
        BOOLEAN => 1,
        INT32 => 4,
        DOUBLE | DATETIME | TIMESTAMP_TYPE | INT64 => 8,
        OBJECT_ID_TYPE => OBJECT_ID_LEN,
        // size, binary subtype, data
        BINARY => 5 + len,
        // size, data, NUL
        _ => 4 + len + 1,
    }
}

fn document_size(size: usize) -> Result<i32> {
    i32::try_from(size).map_err(|_| Error::range(FORMAT, format!("document of {} bytes", size)))
}

fn decimal_len(mut n: usize) -> usize {
    let mut digits = 1;
    while n >= 10 {
        n /= 10;
        digits += 1;
    }
    digits
}

fn check_name(name: &[u8]) -> Result<()> {
    if name.contains(&0) {
        Err(Error::structure("bson element names cannot contain NUL"))
    } else {
        Ok(())
    }
}

/// BSON's size rules, shared by [`encoded_size`] and the writer.
#[derive(Debug, Clone, Copy, Default)]
pub struct BsonLayout;

impl Layout for BsonLayout {
    fn scalar_size(&self, value: &Value) -> Result<usize> {
        let (ty, len) = match &value.kind {
            Kind::Null => (NULL, 0),
            Kind::Bool(_) => (BOOLEAN, 0),
            Kind::Int(n) => (int_type(*n, value.subtype)?, 0),
            Kind::UInt(n) => (uint_type(*n, value.subtype)?, 0),
            Kind::Real(_) => (DOUBLE, 0),
            Kind::Str(bytes) => (string_type(value.subtype, bytes.len())?, bytes.len()),
            Kind::Array(_) | Kind::Object(_) => {
                return Err(Error::structure("container measured as a scalar"))
            }
        };
        Ok(payload_size(ty, len))
    }

    fn element_overhead(&self, _: &Value, index: usize, key: Option<&Value>) -> Result<usize> {
        let name_len = match key.map(|k| &k.kind) {
            None => decimal_len(index),
            Some(Kind::Str(name)) => {
                check_name(name)?;
                name.len()
            }
            Some(_) => return Err(Error::structure("bson element names must be strings")),
        };
        // type byte, name, NUL
        Ok(1 + name_len + 1)
    }

    fn container_size(&self, _: &Value, payload: usize) -> Result<usize> {
        Ok(DOCUMENT_OVERHEAD + payload)
    }
}

/// Exact number of bytes [`to_bson`](crate::to_bson) produces for `value`.
pub fn encoded_size(value: &Value) -> Result<usize> {
    if !value.is_object() {
        return Err(Error::range(FORMAT, "a bson document must be an object"));
    }
    Ok(SizeTable::build(value, &BsonLayout)?.total())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{from_bson, to_bson, value, ErrorKind, ObjectMap};

    #[test]
    fn test_array_document() {
        let v = value!({"BSON": ["awesome", 5.05, 1986]});
        let bytes = to_bson(&v).unwrap();
        assert_eq!(
            bytes,
            &b"\x31\x00\x00\x00\x04BSON\x00\x26\x00\x00\x00\x020\x00\x08\x00\x00\x00awesome\x00\
               \x011\x00\x33\x33\x33\x33\x33\x33\x14\x40\x102\x00\xc2\x07\x00\x00\x00\x00"[..]
        );
        assert_eq!(encoded_size(&v).unwrap(), 49);
        assert_eq!(from_bson(&bytes).unwrap(), v);
    }

    #[test]
    fn test_typed_elements() {
        let mut map = ObjectMap::new();
        map.insert("id", Value::bytes(vec![7u8; 12]).with_subtype(OBJECT_ID));
        map.insert("at", Value::from(1_700_000_000_000i64).with_subtype(subtype::UNIX_TIMESTAMP_MS));
        map.insert("ts", Value::from(5).with_subtype(TIMESTAMP));
        map.insert("bin", Value::blob(vec![1u8, 2]));
        map.insert("sym", Value::from("s").with_subtype(subtype::SYMBOL));
        map.insert("big", 1i64 << 40);
        map.insert("none", Value::null());
        map.insert("yes", true);
        let v = Value::from(map);
        let bytes = to_bson(&v).unwrap();
        assert_eq!(bytes.len(), encoded_size(&v).unwrap());
        assert_eq!(from_bson(&bytes).unwrap(), v);
        assert_eq!(bytes[4], OBJECT_ID_TYPE);
    }

    #[test]
    fn test_unsigned_range() {
        let v = value!({"n": (Value::from(u64::MAX))});
        assert_eq!(to_bson(&v).unwrap_err().kind(), ErrorKind::Range);
        let ts = value!({"n": (Value::from(u64::MAX).with_subtype(TIMESTAMP))});
        let bytes = to_bson(&ts).unwrap();
        assert_eq!(from_bson(&bytes).unwrap(), ts);
    }

    #[test]
    fn test_root_and_name_restrictions() {
        assert_eq!(to_bson(&value!([1])).unwrap_err().kind(), ErrorKind::Range);
        assert_eq!(to_bson(&Value::from(1)).unwrap_err().kind(), ErrorKind::Range);
        assert!(encoded_size(&Value::from("x")).is_err());

        let mut map = ObjectMap::new();
        map.insert(1, 2);
        assert_eq!(to_bson(&Value::from(map)).unwrap_err().kind(), ErrorKind::Structure);

        let v = value!({"a\u{0}b": 1});
        assert_eq!(to_bson(&v).unwrap_err().kind(), ErrorKind::Structure);

        let oid = value!({"id": (Value::from("short").with_subtype(OBJECT_ID))});
        assert_eq!(to_bson(&oid).unwrap_err().kind(), ErrorKind::Range);
    }

    #[test]
    fn test_malformed_input() {
        for bad in [
            &b"\x05\x00\x00\x00"[..],
            b"\x06\x00\x00\x00\x00\x00",
            b"\x04\x00\x00\x00\x00",
            b"\x0c\x00\x00\x00\x10a\x00\x01\x00\x00\x00",
            b"\x09\x00\x00\x00\x08a\x00\x02\x00",
            b"\x0c\x00\x00\x00\x02a\x00\x00\x00\x00\x00\x00",
            b"\x18\x00\x00\x00\x13a\x00\x00\x00\x00\x00\x00\x00\x00\x00\x00\x00\x00\x00\x00\x00\x00\x00",
            b"\x0c\x00\x00\x00\x03a\x00\x09\x00\x00\x00\x00",
            b"\x08\x00\x00\x00\x0aa\x00\x00\x00",
        ] {
            let err = from_bson(bad).unwrap_err();
            assert_eq!(err.kind(), ErrorKind::Syntax, "{:?}", bad);
        }
    }
}
