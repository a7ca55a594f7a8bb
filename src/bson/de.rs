//! BSON reader.

use super::*;
use crate::io::Input;
use crate::stream::{Features, Header, Hooks, StreamHandler};
use crate::tree::Parse;
use log::trace;

struct Open {
    array: bool,
    /// Offset of the size field.
    start: usize,
    end: usize,
}

/// Streams one BSON document into a [`StreamHandler`].
///
/// Documents carry byte sizes but no element counts, so containers are
/// begun without a size and closed at their terminating NUL.
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

    fn int32(&mut self, expected: &str) -> Result<i32> {
        Ok(i32::from_le_bytes(self.input.read_array(expected)?))
    }

    /// Bytes up to the next NUL, which is consumed.
    fn cstring(&mut self, expected: &str) -> Result<&'a [u8]> {
        let len = self
            .input
            .rest()
            .iter()
            .position(|&b| b == 0)
            .ok_or_else(|| self.input.eof_error(expected))?;
        let bytes = self.input.read_exact(len, expected)?;
        self.input.skip(1);
        Ok(bytes)
    }

    fn document<H: Hooks>(&mut self, handler: &mut StreamHandler<H>, array: bool) -> Result<()> {
        let start = self.input.offset();
        let size = self.int32("document size")?;
        let limit = self
            .open
            .last()
            .map_or(start + 4 + self.input.remaining(), |parent| parent.end);
        let end = usize::try_from(size)
            .ok()
            .filter(|&n| n >= DOCUMENT_OVERHEAD)
            .map(|n| start + n)
            .filter(|&end| end <= limit)
            .ok_or_else(|| {
                self.input
                    .error_at(start, format!("document size {} is out of bounds", size))
            })?;
        trace!("bson document of {} bytes at {}", size, start);
        if array {
            handler.begin_array(Header::array(None))?;
        } else {
            handler.begin_object(Header::object(None))?;
        }
        self.open.push(Open { array, start, end });
        Ok(())
    }

    fn string<H: Hooks>(&mut self, handler: &mut StreamHandler<H>, subtype: Subtype) -> Result<()> {
        let at = self.input.offset();
        let size = self.int32("string size")?;
        let len = usize::try_from(size)
            .ok()
            .filter(|&n| n >= 1)
            .ok_or_else(|| self.input.error_at(at, format!("invalid string size {}", size)))?;
        if len > self.input.remaining() {
            return Err(self.input.eof_error("string data"));
        }
        handler.begin_string(Header::string(Some(len - 1)).with_subtype(subtype))?;
        self.chunks(handler, len - 1)?;
        let at = self.input.offset();
        if self.input.next_byte("string terminator")? != 0 {
            return Err(self.input.error_at(at, "string is not NUL-terminated"));
        }
        handler.end_string()
    }

    fn binary<H: Hooks>(&mut self, handler: &mut StreamHandler<H>) -> Result<()> {
        let at = self.input.offset();
        let size = self.int32("binary size")?;
        let len = usize::try_from(size)
            .map_err(|_| self.input.error_at(at, format!("invalid binary size {}", size)))?;
        let kind = self.input.next_byte("binary subtype")?;
        if len > self.input.remaining() {
            return Err(self.input.eof_error("binary data"));
        }
        trace!("bson binary of {} bytes, subtype {:#04x}", len, kind);
        handler.begin_string(Header::string(Some(len)).with_subtype(subtype::BLOB))?;
        self.chunks(handler, len)?;
        handler.end_string()
    }

    fn chunks<H: Hooks>(&mut self, handler: &mut StreamHandler<H>, len: usize) -> Result<()> {
        let mut left = len;
        while left > 0 {
            let chunk = self.input.read_chunk(left);
            if chunk.is_empty() {
                return Err(self.input.eof_error("string data"));
            }
            handler.append_to_string(chunk)?;
            left -= chunk.len();
        }
        Ok(())
    }

    /// Reads the payload of an element whose type byte was at `at`.
    fn element<H: Hooks>(&mut self, handler: &mut StreamHandler<H>, ty: u8, at: usize) -> Result<()> {
        match ty {
            DOUBLE => {
                let r = f64::from_le_bytes(self.input.read_array("double")?);
                handler.real(r, subtype::NORMAL)
            }
            STRING => self.string(handler, subtype::NORMAL),
            SYMBOL => self.string(handler, subtype::SYMBOL),
            DOCUMENT => self.document(handler, false),
            ARRAY => self.document(handler, true),
            BINARY => self.binary(handler),
            OBJECT_ID_TYPE => {
                let id = self.input.read_exact(OBJECT_ID_LEN, "ObjectId")?;
                handler.string(id, OBJECT_ID)
            }
            BOOLEAN => match self.input.next_byte("boolean")? {
                0 => handler.boolean(false, subtype::NORMAL),
                1 => handler.boolean(true, subtype::NORMAL),
                b => Err(self.input.error_at(at, format!("invalid boolean byte {}", b))),
            },
            DATETIME => {
                let ms = i64::from_le_bytes(self.input.read_array("datetime")?);
                handler.integer(ms, subtype::UNIX_TIMESTAMP_MS)
            }
            NULL => handler.null(subtype::NORMAL),
            INT32 => {
                let n = self.int32("int32")?;
                handler.integer(i64::from(n), subtype::NORMAL)
            }
            TIMESTAMP_TYPE => {
                let n = u64::from_le_bytes(self.input.read_array("timestamp")?);
                handler.uinteger(n, TIMESTAMP)
            }
            INT64 => {
                let n = i64::from_le_bytes(self.input.read_array("int64")?);
                handler.integer(n, subtype::NORMAL)
            }
            DECIMAL128 => Err(self.input.error_at(at, "decimal128 is not supported")),
            _ => Err(self
                .input
                .error_at(at, format!("unsupported element type {:#04x}", ty))),
        }
    }
}

impl Parse for Parser<'_> {
    fn provides(&self) -> Features {
        Features::REQUIRES_PREFIX_STRING_SIZE
    }

    fn write_one<H: Hooks>(&mut self, handler: &mut StreamHandler<H>) -> Result<()> {
        self.open.clear();
        self.document(handler, false)?;
        while let Some(top) = self.open.last() {
            let (array, start, end) = (top.array, top.start, top.end);
            let at = self.input.offset();
            let ty = self.input.next_byte("element type")?;
            if ty == 0 {
                if self.input.offset() != end {
                    return Err(self
                        .input
                        .error_at(start, "document size does not match its contents"));
                }
                self.open.pop();
                if array {
                    handler.end_array()?;
                } else {
                    handler.end_object()?;
                }
                continue;
            }
            let name = self.cstring("element name")?;
            if !array {
                handler.string(name, subtype::NORMAL)?;
            }
            self.element(handler, ty, at)?;
            if self.input.offset() > end {
                return Err(self.input.error_at(at, "element runs past the end of its document"));
            }
        }
        self.input.expect_end()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tree::build;
    use crate::{value, Limits};

    #[test]
    fn test_empty_document() {
        let v = build(&mut Parser::new(b"\x05\x00\x00\x00\x00"), &Limits::default()).unwrap();
        assert_eq!(v, value!({}));
    }

    #[test]
    fn test_array_names_are_ignored() {
        // {"a": [true]} with a nonsense element name inside the array
        let bytes = b"\x12\x00\x00\x00\x04a\x00\x0a\x00\x00\x00\x08xy\x00\x01\x00\x00";
        let v = build(&mut Parser::new(bytes), &Limits::default()).unwrap();
        assert_eq!(v, value!({"a": [true]}));
    }

    #[test]
    fn test_unsupported_type_offset() {
        // regular expression element
        let bytes = b"\x0a\x00\x00\x00\x0ba\x00\x00\x00\x00";
        let err = build(&mut Parser::new(bytes), &Limits::default()).unwrap_err();
        assert_eq!(err.offset(), Some(4));
    }
}
