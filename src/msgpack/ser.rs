//! MessagePack writer.

use super::*;
use crate::error::{Error, Result};
use crate::ieee754::fits_f32;
use crate::io::Sink;
use crate::stream::{Features, Header, Hooks, Nesting};

/// Writes MessagePack into a [`Sink`].
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

    fn write_uint(&mut self, n: u64) -> Result<()> {
        match n {
            0..=0x7f => self.sink.put(n as u8),
            0x80..=0xff => self.sink.write_all(&[UINT8, n as u8]),
            0x100..=0xffff => {
                self.sink.put(UINT16)?;
                self.sink.write_all(&(n as u16).to_be_bytes())
            }
            0x1_0000..=0xffff_ffff => {
                self.sink.put(UINT32)?;
                self.sink.write_all(&(n as u32).to_be_bytes())
            }
            _ => {
                self.sink.put(UINT64)?;
                self.sink.write_all(&n.to_be_bytes())
            }
        }
    }

    fn write_int(&mut self, n: i64) -> Result<()> {
        if n >= 0 {
            return self.write_uint(n as u64);
        }
        if n >= -32 {
            self.sink.put(n as u8)
        } else if n >= i64::from(i8::MIN) {
            self.sink.write_all(&[INT8, n as u8])
        } else if n >= i64::from(i16::MIN) {
            self.sink.put(INT16)?;
            self.sink.write_all(&(n as i16).to_be_bytes())
        } else if n >= i64::from(i32::MIN) {
            self.sink.put(INT32)?;
            self.sink.write_all(&(n as i32).to_be_bytes())
        } else {
            self.sink.put(INT64)?;
            self.sink.write_all(&n.to_be_bytes())
        }
    }

    /// Writes `fix | len` for short lengths, otherwise the 8/16/32-bit form
    /// whose tags are `wide[0..3]`; `None` entries are forms the type lacks.
    fn write_length(
        &mut self,
        len: usize,
        fix: Option<(u8, usize)>,
        wide: [Option<u8>; 3],
    ) -> Result<()> {
        if let Some((base, max)) = fix {
            if len <= max {
                return self.sink.put(base | len as u8);
            }
        }
        match (len, wide) {
            (0..=0xff, [Some(tag), _, _]) => self.sink.write_all(&[tag, len as u8]),
            (0..=0xffff, [_, Some(tag), _]) => {
                self.sink.put(tag)?;
                self.sink.write_all(&(len as u16).to_be_bytes())
            }
            (_, [_, _, Some(tag)]) => {
                let len = u32::try_from(len)
                    .map_err(|_| Error::range(FORMAT, format!("length {} exceeds 32 bits", len)))?;
                self.sink.put(tag)?;
                self.sink.write_all(&len.to_be_bytes())
            }
            _ => Err(Error::range(FORMAT, format!("cannot encode length {}", len))),
        }
    }

    fn write_ext_header(&mut self, len: usize, ext_type: i8) -> Result<()> {
        match len {
            1 | 2 | 4 | 8 | 16 => self.sink.put(FIXEXT1 + len.trailing_zeros() as u8)?,
            _ => self.write_length(len, None, [Some(EXT8), Some(EXT16), Some(EXT32)])?,
        }
        self.sink.put(ext_type as u8)
    }
}

impl<S: Sink> Hooks for Writer<S> {
    fn features(&self) -> Features {
        Features::REQUIRES_PREFIX_SIZES
    }

    fn null_(&mut self, _: &Nesting, _: &Header<'_>) -> Result<()> {
        self.sink.put(NIL)
    }

    fn bool_(&mut self, _: &Nesting, _: &Header<'_>, value: bool) -> Result<()> {
        self.sink.put(if value { TRUE } else { FALSE })
    }

    fn integer_(&mut self, _: &Nesting, _: &Header<'_>, value: i64) -> Result<()> {
        self.write_int(value)
    }

    fn uinteger_(&mut self, _: &Nesting, _: &Header<'_>, value: u64) -> Result<()> {
        self.write_uint(value)
    }

    fn real_(&mut self, _: &Nesting, _: &Header<'_>, value: f64) -> Result<()> {
        if fits_f32(value) {
            self.sink.put(FLOAT32)?;
            self.sink.write_all(&(value as f32).to_be_bytes())
        } else {
            self.sink.put(FLOAT64)?;
            self.sink.write_all(&value.to_be_bytes())
        }
    }

    fn begin_string_(&mut self, _: &Nesting, header: &Header<'_>) -> Result<()> {
        let len = header.size.unwrap_or(0);
        if header.subtype == subtype::BLOB {
            return self.write_length(len, None, [Some(BIN8), Some(BIN16), Some(BIN32)]);
        }
        if let Some(ext_type) = ext_type(header.subtype) {
            return self.write_ext_header(len, ext_type);
        }
        self.write_length(len, Some((FIXSTR, 31)), [Some(STR8), Some(STR16), Some(STR32)])
    }

    fn string_data_(&mut self, _: &Nesting, data: &[u8]) -> Result<()> {
        self.sink.write_all(data)
    }

    fn begin_array_(&mut self, _: &Nesting, header: &Header<'_>) -> Result<()> {
        let len = header.size.unwrap_or(0);
        self.write_length(len, Some((FIXARRAY, 15)), [None, Some(ARRAY16), Some(ARRAY32)])
    }

    fn begin_object_(&mut self, _: &Nesting, header: &Header<'_>) -> Result<()> {
        let len = header.size.unwrap_or(0);
        self.write_length(len, Some((FIXMAP, 15)), [None, Some(MAP16), Some(MAP32)])
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::stream::StreamHandler;

    #[test]
    fn test_streamed_events_with_sizes() {
        let mut h = StreamHandler::new(Writer::new(Vec::new()));
        h.begin().unwrap();
        h.begin_object(Header::object(Some(1))).unwrap();
        h.integer(-5, subtype::NORMAL).unwrap();
        h.begin_string(Header::string(Some(4))).unwrap();
        h.append_to_string(b"ab").unwrap();
        h.append_to_string(b"cd").unwrap();
        h.end_string().unwrap();
        h.end_object().unwrap();
        h.end().unwrap();
        assert_eq!(h.into_hooks().into_inner(), b"\x81\xfb\xa4abcd");
    }

    #[test]
    fn test_length_forms() {
        let mut w = Writer::new(Vec::new());
        w.write_length(31, Some((FIXSTR, 31)), [Some(STR8), Some(STR16), Some(STR32)])
            .unwrap();
        w.write_length(32, Some((FIXSTR, 31)), [Some(STR8), Some(STR16), Some(STR32)])
            .unwrap();
        w.write_length(200, Some((FIXARRAY, 15)), [None, Some(ARRAY16), Some(ARRAY32)])
            .unwrap();
        w.write_length(70_000, None, [Some(BIN8), Some(BIN16), Some(BIN32)])
            .unwrap();
        assert_eq!(
            w.into_inner(),
            b"\xbf\xd9\x20\xdc\x00\xc8\xc6\x00\x01\x11\x70"
        );
    }
}
