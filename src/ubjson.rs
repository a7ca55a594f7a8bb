//! Universal Binary JSON (draft 12) reader and writer.
//!
//! Every value starts with an ASCII marker: `Z` null, `T`/`F`, `U i I l L`
//! for 8..64-bit integers, `d`/`D` for reals, `C` for a character, `S` for a
//! string, `H` for a high-precision number and `[`/`{` for containers. `N`
//! is a no-op wherever a value may start. Object keys are strings without
//! their `S` marker.
//!
//! Containers may be optimized with a count (`#`), and then a single element
//! type (`$`) that the elements no longer repeat. A `[$U#n` array is read as
//! a `BLOB` string, which is also how blobs are written; `H` numbers are
//! `BIGNUM` strings in both directions.
//!
//! ```rust
//! use valuestream::{from_ubjson, to_ubjson, value};
//!
//! assert_eq!(from_ubjson(b"[$i#i\x03\x01\x02\x03").unwrap(), value!([1, 2, 3]));
//!
//! let v = value!({"a": [1, null, true]});
//! assert_eq!(to_ubjson(&v).unwrap(), b"{U\x01a[U\x01ZT]}");
//! ```

use crate::error::{Error, Result};
use crate::ieee754::fits_f32;
use crate::io::{Input, Sink, CHUNK_SIZE};
use crate::stream::{ContainerKind, Features, Header, Hooks, Nesting, StreamHandler};
use crate::tree::Parse;
use crate::value::{subtype, Subtype};
use log::trace;

const FORMAT: &str = "ubjson";

const NULL: u8 = b'Z';
const NOOP: u8 = b'N';
const TRUE: u8 = b'T';
const FALSE: u8 = b'F';
const UINT8: u8 = b'U';
const INT8: u8 = b'i';
const INT16: u8 = b'I';
const INT32: u8 = b'l';
const INT64: u8 = b'L';
const FLOAT32: u8 = b'd';
const FLOAT64: u8 = b'D';
const CHAR: u8 = b'C';
const STRING: u8 = b'S';
const HIGH_PRECISION: u8 = b'H';
const ARRAY_START: u8 = b'[';
const ARRAY_END: u8 = b']';
const OBJECT_START: u8 = b'{';
const OBJECT_END: u8 = b'}';
const TYPE: u8 = b'$';
const COUNT: u8 = b'#';

/// One open container: items still owed when counted, and the shared
/// element marker when typed.
#[derive(Debug, Clone, Copy)]
struct Open {
    left: Option<usize>,
    element: Option<u8>,
}

/// Streams one UBJSON value into a [`StreamHandler`].
pub struct Parser<'a> {
    input: Input<'a>,
    open: Vec<Open>,
}

impl<'a> Parser<'a> {
    pub fn new(bytes: &'a [u8]) -> Self {
        Parser {
            input: Input::new(bytes, FORMAT),
            open: Vec::new(),
        }
    }

    fn skip_noops(&mut self) {
        while self.input.peek() == Some(NOOP) {
            self.input.get();
        }
    }

    /// Integer payload following an integer marker.
    fn integer(&mut self, marker: u8, at: usize) -> Result<i64> {
        Ok(match marker {
            UINT8 => i64::from(self.input.next_byte("uint8")?),
            INT8 => i64::from(self.input.next_byte("int8")? as i8),
            INT16 => i64::from(i16::from_be_bytes(self.input.read_array("int16")?)),
            INT32 => i64::from(i32::from_be_bytes(self.input.read_array("int32")?)),
            INT64 => i64::from_be_bytes(self.input.read_array("int64")?),
            _ => return Err(self.input.error_at(at, "expected an integer marker")),
        })
    }

    /// A length or count: an integer value, non-negative and at most `bound`.
    fn length(&mut self, expected: &str, bound: usize) -> Result<usize> {
        let at = self.input.offset();
        let marker = self.input.next_byte(expected)?;
        let n = self.integer(marker, at)?;
        let n = usize::try_from(n).map_err(|_| self.input.error_at(at, "negative length"))?;
        if n > bound {
            return Err(self.input.eof_error(expected));
        }
        Ok(n)
    }

    fn string<H: Hooks>(&mut self, handler: &mut StreamHandler<H>, subtype: Subtype) -> Result<()> {
        let len = self.length("string length", self.input.remaining())?;
        handler.begin_string(Header::string(Some(len)).with_subtype(subtype))?;
        let mut left = len;
        while left > 0 {
            let chunk = self.input.read_chunk(left);
            if chunk.is_empty() {
                return Err(self.input.eof_error("string data"));
            }
            handler.append_to_string(chunk)?;
            left -= chunk.len();
        }
        handler.end_string()
    }

    fn container<H: Hooks>(
        &mut self,
        handler: &mut StreamHandler<H>,
        kind: ContainerKind,
    ) -> Result<()> {
        let mut element = None;
        if self.input.peek() == Some(TYPE) {
            self.input.get();
            element = Some(self.input.next_byte("element type")?);
            if self.input.peek() != Some(COUNT) {
                return Err(self.input.error("typed container without a count"));
            }
        }
        let mut count = None;
        if self.input.peek() == Some(COUNT) {
            self.input.get();
            // elements without payload are bounded separately
            let bound = match element {
                Some(NULL | TRUE | FALSE) => self.input.remaining().max(CHUNK_SIZE),
                _ => self.input.remaining(),
            };
            count = Some(self.length("container count", bound)?);
        }
        if let (ContainerKind::Array, Some(UINT8), Some(len)) = (kind, element, count) {
            trace!("ubjson uint8 array of {} bytes read as blob", len);
            let data = self.input.read_exact(len, "blob data")?;
            return handler.string(data, subtype::BLOB);
        }
        let left = match kind {
            ContainerKind::Object => {
                handler.begin_object(Header::object(count))?;
                count.map(|n| n * 2)
            }
            _ => {
                handler.begin_array(Header::array(count))?;
                count
            }
        };
        if left == Some(0) {
            return self.close(handler);
        }
        self.open.push(Open { left, element });
        Ok(())
    }

    fn close<H: Hooks>(&mut self, handler: &mut StreamHandler<H>) -> Result<()> {
        match handler.current_container_kind() {
            Some(ContainerKind::Object) => handler.end_object(),
            _ => handler.end_array(),
        }
    }

    /// Reads one value. `marker` is the element type of a typed container.
    fn value<H: Hooks>(
        &mut self,
        handler: &mut StreamHandler<H>,
        marker: Option<u8>,
    ) -> Result<()> {
        let at = self.input.offset();
        let marker = match marker {
            Some(marker) => marker,
            None => {
                self.skip_noops();
                self.input.next_byte("a value")?
            }
        };
        match marker {
            NULL => handler.null(subtype::NORMAL),
            TRUE => handler.boolean(true, subtype::NORMAL),
            FALSE => handler.boolean(false, subtype::NORMAL),
            UINT8 | INT8 | INT16 | INT32 | INT64 => {
                let n = self.integer(marker, at)?;
                handler.integer(n, subtype::NORMAL)
            }
            FLOAT32 => {
                let bits = self.input.read_array("float32")?;
                handler.real(f64::from(f32::from_be_bytes(bits)), subtype::NORMAL)
            }
            FLOAT64 => {
                let bits = self.input.read_array("float64")?;
                handler.real(f64::from_be_bytes(bits), subtype::NORMAL)
            }
            CHAR => {
                let c = self.input.next_byte("char")?;
                if !c.is_ascii() {
                    return Err(self.input.error_at(at, "char outside ASCII"));
                }
                handler.string(&[c], subtype::NORMAL)
            }
            STRING => self.string(handler, subtype::NORMAL),
            HIGH_PRECISION => self.string(handler, subtype::BIGNUM),
            ARRAY_START => self.container(handler, ContainerKind::Array),
            OBJECT_START => self.container(handler, ContainerKind::Object),
            other => Err(self
                .input
                .error_at(at, format!("unexpected marker {:?}", char::from(other)))),
        }
    }
}

impl Parse for Parser<'_> {
    fn write_one<H: Hooks>(&mut self, handler: &mut StreamHandler<H>) -> Result<()> {
        self.open.clear();
        loop {
            match self.open.last_mut() {
                None => self.value(handler, None)?,
                Some(open) => {
                    let element = open.element;
                    let counted = open.left.is_some();
                    if let Some(left) = open.left.as_mut() {
                        *left -= 1;
                    }
                    if !counted {
                        self.skip_noops();
                        let at = self.input.offset();
                        let end = match handler.current_container_kind() {
                            Some(ContainerKind::Object) => OBJECT_END,
                            _ => ARRAY_END,
                        };
                        if self.input.peek() == Some(end) {
                            if handler.key_phase() {
                                return Err(self.input.error_at(at, "object key without a value"));
                            }
                            self.input.get();
                            self.open.pop();
                            self.close(handler)?;
                        } else if handler.nesting().expects_key() {
                            self.string(handler, subtype::NORMAL)?;
                        } else {
                            self.value(handler, element)?;
                        }
                    } else if handler.nesting().expects_key() {
                        self.string(handler, subtype::NORMAL)?;
                    } else {
                        self.value(handler, element)?;
                    }
                }
            }
            while matches!(self.open.last(), Some(Open { left: Some(0), .. })) {
                self.open.pop();
                self.close(handler)?;
            }
            if self.open.is_empty() {
                return self.input.expect_end();
            }
        }
    }
}

/// Writes UBJSON into a [`Sink`]. Requires string lengths up front.
#[derive(Debug)]
pub struct Writer<S> {
    sink: S,
}

impl<S: Sink> Writer<S> {
    pub fn new(sink: S) -> Self {
        Writer { sink }
    }

    pub fn into_inner(self) -> S {
        self.sink
    }

    fn write_int(&mut self, n: i64) -> Result<()> {
        if (0..=0xff).contains(&n) {
            self.sink.write_all(&[UINT8, n as u8])
        } else if let Ok(n) = i8::try_from(n) {
            self.sink.write_all(&[INT8, n as u8])
        } else if let Ok(n) = i16::try_from(n) {
            self.sink.put(INT16)?;
            self.sink.write_all(&n.to_be_bytes())
        } else if let Ok(n) = i32::try_from(n) {
            self.sink.put(INT32)?;
            self.sink.write_all(&n.to_be_bytes())
        } else {
            self.sink.put(INT64)?;
            self.sink.write_all(&n.to_be_bytes())
        }
    }

    fn write_length(&mut self, len: usize) -> Result<()> {
        let len = i64::try_from(len).map_err(|_| Error::range(FORMAT, "length exceeds int64"))?;
        self.write_int(len)
    }

    fn scalar_key_check(nesting: &Nesting) -> Result<()> {
        if nesting.expects_key() {
            return Err(Error::structure("ubjson object keys must be strings"));
        }
        Ok(())
    }
}

impl<S: Sink> Hooks for Writer<S> {
    fn features(&self) -> Features {
        Features::REQUIRES_PREFIX_STRING_SIZE
    }

    fn null_(&mut self, nesting: &Nesting, _: &Header<'_>) -> Result<()> {
        Self::scalar_key_check(nesting)?;
        self.sink.put(NULL)
    }

    fn bool_(&mut self, nesting: &Nesting, _: &Header<'_>, value: bool) -> Result<()> {
        Self::scalar_key_check(nesting)?;
        self.sink.put(if value { TRUE } else { FALSE })
    }

    fn integer_(&mut self, nesting: &Nesting, _: &Header<'_>, value: i64) -> Result<()> {
        Self::scalar_key_check(nesting)?;
        self.write_int(value)
    }

    fn uinteger_(&mut self, nesting: &Nesting, _: &Header<'_>, value: u64) -> Result<()> {
        Self::scalar_key_check(nesting)?;
        let digits = value.to_string();
        self.sink.put(HIGH_PRECISION)?;
        self.write_length(digits.len())?;
        self.sink.write_all(digits.as_bytes())
    }

    fn real_(&mut self, nesting: &Nesting, _: &Header<'_>, value: f64) -> Result<()> {
        Self::scalar_key_check(nesting)?;
        if fits_f32(value) {
            self.sink.put(FLOAT32)?;
            self.sink.write_all(&(value as f32).to_be_bytes())
        } else {
            self.sink.put(FLOAT64)?;
            self.sink.write_all(&value.to_be_bytes())
        }
    }

    fn begin_string_(&mut self, nesting: &Nesting, header: &Header<'_>) -> Result<()> {
        let len = header.size.unwrap_or(0);
        if nesting.expects_key() {
            return self.write_length(len);
        }
        match header.subtype {
            subtype::BLOB => self.sink.write_all(&[ARRAY_START, TYPE, UINT8, COUNT])?,
            subtype::BIGNUM => self.sink.put(HIGH_PRECISION)?,
            _ => self.sink.put(STRING)?,
        }
        self.write_length(len)
    }

    fn string_data_(&mut self, _: &Nesting, data: &[u8]) -> Result<()> {
        self.sink.write_all(data)
    }

    fn begin_array_(&mut self, _: &Nesting, _: &Header<'_>) -> Result<()> {
        self.sink.put(ARRAY_START)
    }

    fn end_array_(&mut self, _: &Nesting) -> Result<()> {
        self.sink.put(ARRAY_END)
    }

    fn begin_object_(&mut self, _: &Nesting, _: &Header<'_>) -> Result<()> {
        self.sink.put(OBJECT_START)
    }

    fn end_object_(&mut self, _: &Nesting) -> Result<()> {
        self.sink.put(OBJECT_END)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{from_ubjson, to_ubjson, value, ErrorKind, Kind, ObjectMap, Value};

    #[test]
    fn test_plain_containers() {
        let v = value!({"a": [1, 2.5, null, true]});
        let bytes = to_ubjson(&v).unwrap();
        assert_eq!(bytes, b"{U\x01a[U\x01d\x40\x20\x00\x00ZT]}");
        assert_eq!(from_ubjson(&bytes).unwrap(), v);
    }

    #[test]
    fn test_optimized_containers() {
        assert_eq!(from_ubjson(b"[$i#i\x03\x01\x02\x03").unwrap(), value!([1, 2, 3]));
        assert_eq!(from_ubjson(b"[#U\x02SU\x01aZ").unwrap(), value!(["a", null]));
        assert_eq!(from_ubjson(b"{#U\x01U\x01aT").unwrap(), value!({"a": true}));
        assert_eq!(
            from_ubjson(b"{$T#U\x02U\x01aU\x01b").unwrap(),
            value!({"a": true, "b": true})
        );
        assert_eq!(from_ubjson(b"[$Z#U\x02").unwrap(), value!([null, null]));
        assert_eq!(from_ubjson(b"[#U\x00").unwrap(), value!([]));
        assert_eq!(from_ubjson(b"[NZN]").unwrap(), value!([null]));
    }

    #[test]
    fn test_blob_and_high_precision() {
        let blob = from_ubjson(b"[$U#U\x03\x01\x02\x03").unwrap();
        assert_eq!(blob, Value::blob(vec![1u8, 2, 3]));
        assert_eq!(to_ubjson(&blob).unwrap(), b"[$U#U\x03\x01\x02\x03");

        let bytes = to_ubjson(&Value::from(u64::MAX)).unwrap();
        assert_eq!(bytes, b"HU\x1418446744073709551615");
        let back = from_ubjson(&bytes).unwrap();
        assert_eq!(back.subtype, subtype::BIGNUM);
        assert_eq!(back.as_u64(), None);
        assert_eq!(back.as_str(), Some("18446744073709551615"));
    }

    #[test]
    fn test_integer_markers() {
        let cases: [(i64, &[u8]); 6] = [
            (255, b"U\xff"),
            (-1, b"i\xff"),
            (300, b"I\x01\x2c"),
            (-200, b"I\xff\x38"),
            (70000, b"l\x00\x01\x11\x70"),
            (i64::MIN, b"L\x80\x00\x00\x00\x00\x00\x00\x00"),
        ];
        for (n, expected) in cases {
            let bytes = to_ubjson(&Value::from(n)).unwrap();
            assert_eq!(bytes, expected);
            assert!(matches!(from_ubjson(&bytes).unwrap().kind, Kind::Int(m) if m == n));
        }
        assert_eq!(from_ubjson(b"CA").unwrap(), Value::from("A"));
        assert_eq!(to_ubjson(&Value::from(0.1)).unwrap()[0], FLOAT64);
    }

    #[test]
    fn test_non_string_key_rejected() {
        let mut map = ObjectMap::new();
        map.insert(1, 2);
        let err = to_ubjson(&Value::from(map)).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Structure);
    }

    #[test]
    fn test_malformed_input() {
        for bad in [
            &b"["[..],
            b"[$i\x01",
            b"{U\x01a}",
            b"{U\x01a",
            b"Si\xff",
            b"x",
            b"[]]",
            b"[$Z#L\x7f\xff\xff\xff\xff\xff\xff\xff",
            b"[#U\x05\x01",
            b"C\x80",
        ] {
            let err = from_ubjson(bad).unwrap_err();
            assert_eq!(err.kind(), ErrorKind::Syntax, "{:?}", bad);
        }
    }
}
