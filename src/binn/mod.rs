//! Binn reader and writer.
//!
//! Every value starts with a type byte whose top three bits give the
//! storage class (no payload, 1/2/4/8 bytes, string, blob, container).
//! Integers and reals are big-endian. Sizes and counts take one byte below
//! 128 and four bytes with the top bit set otherwise.
//!
//! | Binn                               | Value                              |
//! |------------------------------------|------------------------------------|
//! | null / true / false                | `Null` / `Bool`                    |
//! | (u)int 8..64, float 32/64          | `Int`/`UInt` / `Real`              |
//! | string                             | `Str`                              |
//! | datetime / date / time / decimal   | `Str` tagged `DATETIME`/`DATE`/`TIME`/`BIGNUM` |
//! | blob                               | `Str` tagged `BLOB`                |
//! | list                               | `Array`                            |
//! | map (32-bit integer keys)          | `Object` tagged `MAP`              |
//! | object (string keys, max 255 bytes)| `Object`                           |
//!
//! A container's header holds its total encoded size, so the writer needs
//! complete containers up front. It measures the outermost one with the
//! same [`Layout`] that [`encoded_size`] uses and checks every container
//! against the measurement as it closes.
//!
//! ```rust
//! use valuestream::{binn, from_binn, to_binn, value};
//!
//! let v = value!([123, (-456), 789]);
//! let bytes = to_binn(&v).unwrap();
//! assert_eq!(bytes, b"\xe0\x0b\x03\x20\x7b\x41\xfe\x38\x40\x03\x15");
//! assert_eq!(binn::encoded_size(&v).unwrap(), bytes.len());
//! assert_eq!(from_binn(&bytes).unwrap(), v);
//! ```

mod de;
mod ser;

pub use de::Parser;
pub use ser::Writer;

use crate::error::{Error, Result};
use crate::ieee754::fits_f32;
use crate::io::{Counter, Sink};
use crate::measure::{Layout, SizeTable};
use crate::value::{subtype, Kind, Subtype, Value};

const FORMAT: &str = "binn";

const NULL: u8 = 0x00;
const TRUE: u8 = 0x01;
const FALSE: u8 = 0x02;
const UINT8: u8 = 0x20;
const INT8: u8 = 0x21;
const UINT16: u8 = 0x40;
const INT16: u8 = 0x41;
const UINT32: u8 = 0x60;
const INT32: u8 = 0x61;
const FLOAT32: u8 = 0x62;
const UINT64: u8 = 0x80;
const INT64: u8 = 0x81;
const FLOAT64: u8 = 0x82;
const STRING: u8 = 0xa0;
const DATETIME: u8 = 0xa1;
const DATE: u8 = 0xa2;
const TIME: u8 = 0xa3;
const DECIMAL: u8 = 0xa4;
const BLOB: u8 = 0xc0;
const LIST: u8 = 0xe0;
const MAP: u8 = 0xe1;
const OBJECT: u8 = 0xe2;

const EXTENDED: u8 = 0x10;
const LONG_SIZE: u32 = 0x8000_0000;
const MAX_KEY_LEN: usize = 255;

fn write_size<S: Sink>(sink: &mut S, n: usize) -> Result<()> {
    if n < 128 {
        return sink.put(n as u8);
    }
    let n = u32::try_from(n)
        .ok()
        .filter(|&n| n < LONG_SIZE)
        .ok_or_else(|| Error::range(FORMAT, format!("size {} exceeds 31 bits", n)))?;
    sink.write_all(&(n | LONG_SIZE).to_be_bytes())
}

fn write_uint<S: Sink>(sink: &mut S, n: u64) -> Result<()> {
    if let Ok(n) = u8::try_from(n) {
        sink.write_all(&[UINT8, n])
    } else if let Ok(n) = u16::try_from(n) {
        sink.put(UINT16)?;
        sink.write_all(&n.to_be_bytes())
    } else if let Ok(n) = u32::try_from(n) {
        sink.put(UINT32)?;
        sink.write_all(&n.to_be_bytes())
    } else {
        sink.put(UINT64)?;
        sink.write_all(&n.to_be_bytes())
    }
}

fn write_int<S: Sink>(sink: &mut S, n: i64) -> Result<()> {
    if n >= 0 {
        return write_uint(sink, n as u64);
    }
    if let Ok(n) = i8::try_from(n) {
        sink.write_all(&[INT8, n as u8])
    } else if let Ok(n) = i16::try_from(n) {
        sink.put(INT16)?;
        sink.write_all(&n.to_be_bytes())
    } else if let Ok(n) = i32::try_from(n) {
        sink.put(INT32)?;
        sink.write_all(&n.to_be_bytes())
    } else {
        sink.put(INT64)?;
        sink.write_all(&n.to_be_bytes())
    }
}

fn write_real<S: Sink>(sink: &mut S, r: f64) -> Result<()> {
    if fits_f32(r) {
        sink.put(FLOAT32)?;
        sink.write_all(&(r as f32).to_be_bytes())
    } else {
        sink.put(FLOAT64)?;
        sink.write_all(&r.to_be_bytes())
    }
}

fn string_type(subtype: Subtype) -> u8 {
    match subtype {
        subtype::BLOB => BLOB,
        subtype::DATETIME => DATETIME,
        subtype::DATE => DATE,
        subtype::TIME => TIME,
        subtype::BIGNUM => DECIMAL,
        _ => STRING,
    }
}

/// Type byte and size field of a string or blob. Blob sizes are always
/// four bytes; text is followed by a NUL that the size does not count.
fn write_string_header<S: Sink>(sink: &mut S, subtype: Subtype, len: usize) -> Result<()> {
    let type_byte = string_type(subtype);
    sink.put(type_byte)?;
    if type_byte == BLOB {
        let len = u32::try_from(len)
            .map_err(|_| Error::range(FORMAT, format!("blob of {} bytes", len)))?;
        sink.write_all(&len.to_be_bytes())
    } else {
        write_size(sink, len)
    }
}

fn is_map(value: &Value) -> bool {
    match &value.kind {
        Kind::Object(map) => {
            value.subtype == subtype::MAP
                || (!map.is_empty() && map.keys().all(Value::is_integer))
        }
        _ => false,
    }
}

fn container_type(value: &Value) -> u8 {
    match value.kind {
        Kind::Array(_) => LIST,
        _ if is_map(value) => MAP,
        _ => OBJECT,
    }
}

fn map_key(key: &Value) -> Result<i32> {
    key.as_i64()
        .and_then(|n| i32::try_from(n).ok())
        .ok_or_else(|| {
            Error::structure(format!(
                "binn map keys must be 32-bit integers, found {:?}",
                key
            ))
        })
}

fn object_key_len(len: usize) -> Result<u8> {
    u8::try_from(len).map_err(|_| {
        Error::range(
            FORMAT,
            format!("object key of {} bytes exceeds {}", len, MAX_KEY_LEN),
        )
    })
}

/// Binn's size rules, shared by [`encoded_size`] and the writer.
#[derive(Debug, Clone, Copy, Default)]
pub struct BinnLayout;

impl Layout for BinnLayout {
    fn scalar_size(&self, value: &Value) -> Result<usize> {
        let mut counter = Counter::new();
        match &value.kind {
            Kind::Null | Kind::Bool(_) => counter.put(NULL)?,
            Kind::Int(n) => write_int(&mut counter, *n)?,
            Kind::UInt(n) => write_uint(&mut counter, *n)?,
            Kind::Real(r) => write_real(&mut counter, *r)?,
            Kind::Str(bytes) => {
                write_string_header(&mut counter, value.subtype, bytes.len())?;
                counter.write_all(bytes)?;
                if string_type(value.subtype) != BLOB {
                    counter.put(0)?;
                }
            }
            Kind::Array(_) | Kind::Object(_) => {
                return Err(Error::structure("container measured as a scalar"))
            }
        }
        Ok(counter.count())
    }

    fn element_overhead(&self, parent: &Value, _: usize, key: Option<&Value>) -> Result<usize> {
        let Some(key) = key else {
            return Ok(0);
        };
        if is_map(parent) {
            map_key(key)?;
            return Ok(4);
        }
        match &key.kind {
            Kind::Str(bytes) => Ok(1 + usize::from(object_key_len(bytes.len())?)),
            _ => Err(Error::structure("binn object keys must be strings")),
        }
    }

    fn container_size(&self, container: &Value, payload: usize) -> Result<usize> {
        let count = match &container.kind {
            Kind::Array(items) => items.len(),
            Kind::Object(map) => map.len(),
            _ => 0,
        };
        // type byte plus one-byte size and count fields
        let mut total = payload + 3;
        if count > 127 {
            total += 3;
        }
        if total > 127 {
            total += 3;
        }
        Ok(total)
    }
}

/// Exact number of bytes [`to_binn`](crate::to_binn) produces for `value`.
pub fn encoded_size(value: &Value) -> Result<usize> {
    Ok(SizeTable::build(value, &BinnLayout)?.total())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{from_binn, to_binn, value, ErrorKind, ObjectMap};

    #[test]
    fn test_object_layout() {
        let v = value!({"hello": "world"});
        let bytes = to_binn(&v).unwrap();
        assert_eq!(bytes, b"\xe2\x11\x01\x05hello\xa0\x05world\x00");
        assert_eq!(from_binn(&bytes).unwrap(), v);
    }

    #[test]
    fn test_map_with_integer_keys() {
        let mut map = ObjectMap::new();
        map.insert(1, "a");
        map.insert(-2, true);
        let v = Value::from(map).with_subtype(subtype::MAP);
        let bytes = to_binn(&v).unwrap();
        assert_eq!(
            bytes,
            b"\xe1\x10\x02\x00\x00\x00\x01\xa0\x01a\x00\xff\xff\xff\xfe\x01"
        );
        let back = from_binn(&bytes).unwrap();
        assert_eq!(back.subtype, subtype::MAP);
        assert_eq!(back, v);

        let mut wide = ObjectMap::new();
        wide.insert(1i64 << 40, 0);
        let err = to_binn(&Value::from(wide)).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Structure);
    }

    #[test]
    fn test_long_size_fields() {
        let v = Value::from((0..200).map(Value::from).collect::<Vec<_>>());
        let bytes = to_binn(&v).unwrap();
        assert_eq!(bytes.len(), 409);
        assert_eq!(encoded_size(&v).unwrap(), 409);
        assert_eq!(&bytes[..9], b"\xe0\x80\x00\x01\x99\x80\x00\x00\xc8");
        assert_eq!(from_binn(&bytes).unwrap(), v);
    }

    #[test]
    fn test_size_field_crosses_threshold() {
        // around 121 bytes the list total crosses the one-byte size limit
        for len in 115..125 {
            let v = value!([(Value::from("x".repeat(len)))]);
            let bytes = to_binn(&v).unwrap();
            assert_eq!(encoded_size(&v).unwrap(), bytes.len(), "len {}", len);
            assert_eq!(from_binn(&bytes).unwrap(), v);
        }
    }

    #[test]
    fn test_scalars_and_string_types() {
        assert_eq!(
            to_binn(&Value::blob(vec![1u8, 2, 3])).unwrap(),
            b"\xc0\x00\x00\x00\x03\x01\x02\x03"
        );
        assert_eq!(to_binn(&Value::from(-1)).unwrap(), b"\x21\xff");
        assert_eq!(to_binn(&Value::from(u64::MAX)).unwrap()[0], UINT64);
        assert_eq!(to_binn(&Value::from(0.5)).unwrap(), b"\x62\x3f\x00\x00\x00");
        let date = Value::bytes("2024-01-02").with_subtype(subtype::DATE);
        let bytes = to_binn(&date).unwrap();
        assert_eq!(bytes[0], DATE);
        assert_eq!(from_binn(&bytes).unwrap(), date);
    }

    #[test]
    fn test_key_restrictions() {
        let mut mixed = ObjectMap::new();
        mixed.insert("a", 1);
        mixed.insert(2, 3);
        assert_eq!(to_binn(&Value::from(mixed)).unwrap_err().kind(), ErrorKind::Structure);

        let mut long = ObjectMap::new();
        long.insert("k".repeat(256), 1);
        assert_eq!(to_binn(&Value::from(long)).unwrap_err().kind(), ErrorKind::Range);
    }

    #[test]
    fn test_malformed_input() {
        for bad in [
            &b"\xe0\x06\x01\x20\x01\x00"[..],
            b"\xe0\x05\x02\x20\x01",
            b"\xa0\x05ab",
            b"\xa0\x01ab",
            b"\x30\x00",
            b"\xe2\x08\x01\x01a\x20\x01",
            b"\xe0\x02\x00",
            b"\x99",
            b"\xe0\xff\xff\xff\xff\x01",
        ] {
            let err = from_binn(bad).unwrap_err();
            assert_eq!(err.kind(), ErrorKind::Syntax, "{:?}", bad);
        }
    }
}
