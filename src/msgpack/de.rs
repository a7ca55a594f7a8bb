//! MessagePack reader.

use super::*;
use crate::error::Result;
use crate::io::Input;
use crate::stream::{ContainerKind, Features, Header, Hooks, StreamHandler};
use crate::tree::Parse;
use log::trace;

/// Streams one MessagePack value into a [`StreamHandler`].
///
/// MessagePack containers carry counts rather than end markers, so the
/// parser keeps the number of items still owed by each open container.
pub struct Parser<'a> {
    input: Input<'a>,
    remaining: Vec<usize>,
}

impl<'a> Parser<'a> {
    pub fn new(bytes: &'a [u8]) -> Self {
        Parser {
            input: Input::new(bytes, FORMAT),
            remaining: Vec::new(),
        }
    }

    /// Big-endian unsigned field of `width` bytes.
    fn uint(&mut self, width: usize, expected: &str) -> Result<u64> {
        let bytes = self.input.read_exact(width, expected)?;
        Ok(bytes.iter().fold(0u64, |acc, &b| (acc << 8) | u64::from(b)))
    }

    /// A length that the rest of the input can actually satisfy.
    fn length(&mut self, width: usize, expected: &str) -> Result<usize> {
        let raw = self.uint(width, expected)?;
        self.checked(raw, expected)
    }

    fn checked(&self, raw: u64, expected: &str) -> Result<usize> {
        usize::try_from(raw)
            .ok()
            .filter(|&n| n <= self.input.remaining())
            .ok_or_else(|| self.input.eof_error(expected))
    }

    fn string<H: Hooks>(
        &mut self,
        handler: &mut StreamHandler<H>,
        len: usize,
        subtype: Subtype,
    ) -> Result<()> {
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

    fn ext<H: Hooks>(&mut self, handler: &mut StreamHandler<H>, len: usize) -> Result<()> {
        let ext_type = self.input.next_byte("extension type")? as i8;
        let len = self.checked(len as u64, "extension data")?;
        trace!("msgpack ext type {} with {} bytes", ext_type, len);
        self.string(handler, len, ext_subtype(ext_type))
    }

    fn container<H: Hooks>(
        &mut self,
        handler: &mut StreamHandler<H>,
        count: usize,
        kind: ContainerKind,
    ) -> Result<()> {
        let items = match kind {
            ContainerKind::Object => {
                handler.begin_object(Header::object(Some(count)))?;
                count * 2
            }
            _ => {
                handler.begin_array(Header::array(Some(count)))?;
                count
            }
        };
        if items == 0 {
            self.close(handler)
        } else {
            self.remaining.push(items);
            Ok(())
        }
    }

    fn close<H: Hooks>(&mut self, handler: &mut StreamHandler<H>) -> Result<()> {
        match handler.current_container_kind() {
            Some(ContainerKind::Object) => handler.end_object(),
            _ => handler.end_array(),
        }
    }

    /// Reads one item; a container is opened and left for the caller to fill.
    fn value<H: Hooks>(&mut self, handler: &mut StreamHandler<H>) -> Result<()> {
        let at = self.input.offset();
        let tag = self.input.next_byte("a value")?;
        match tag {
            0x00..=POSFIXINT_MAX => handler.integer(i64::from(tag), subtype::NORMAL),
            NEGFIXINT..=0xff => handler.integer(i64::from(tag as i8), subtype::NORMAL),
            FIXMAP..=0x8f => {
                let count = self.checked(u64::from(tag & 0x0f), "map entries")?;
                self.container(handler, count, ContainerKind::Object)
            }
            FIXARRAY..=0x9f => {
                let count = self.checked(u64::from(tag & 0x0f), "array items")?;
                self.container(handler, count, ContainerKind::Array)
            }
            FIXSTR..=0xbf => {
                let len = self.checked(u64::from(tag & 0x1f), "string data")?;
                self.string(handler, len, subtype::NORMAL)
            }
            NIL => handler.null(subtype::NORMAL),
            NEVER_USED => Err(self.input.error_at(at, "reserved tag 0xc1")),
            FALSE => handler.boolean(false, subtype::NORMAL),
            TRUE => handler.boolean(true, subtype::NORMAL),
            BIN8 | BIN16 | BIN32 => {
                let width = 1 << (tag - BIN8);
                let len = self.length(width, "binary data")?;
                self.string(handler, len, subtype::BLOB)
            }
            EXT8 | EXT16 | EXT32 => {
                let width = 1 << (tag - EXT8);
                let len = self.uint(width, "extension length")?;
                let len = self.checked(len, "extension data")?;
                self.ext(handler, len)
            }
            FIXEXT1..=FIXEXT16 => self.ext(handler, 1 << (tag - FIXEXT1)),
            FLOAT32 => {
                let bits = self.uint(4, "float 32")? as u32;
                handler.real(f64::from(f32::from_bits(bits)), subtype::NORMAL)
            }
            FLOAT64 => {
                let bits = self.uint(8, "float 64")?;
                handler.real(f64::from_bits(bits), subtype::NORMAL)
            }
            UINT8..=UINT64 => {
                let n = self.uint(1 << (tag - UINT8), "unsigned integer")?;
                handler.uinteger(n, subtype::NORMAL)
            }
            INT8..=INT64 => {
                let width = 1 << (tag - INT8);
                let raw = self.uint(width, "signed integer")?;
                // sign-extend from the field width
                let shift = 64 - 8 * width as u32;
                handler.integer(((raw << shift) as i64) >> shift, subtype::NORMAL)
            }
            STR8 | STR16 | STR32 => {
                let width = 1 << (tag - STR8);
                let len = self.length(width, "string data")?;
                self.string(handler, len, subtype::NORMAL)
            }
            ARRAY16 | ARRAY32 => {
                let width = if tag == ARRAY16 { 2 } else { 4 };
                let count = self.length(width, "array items")?;
                self.container(handler, count, ContainerKind::Array)
            }
            MAP16 | MAP32 => {
                let width = if tag == MAP16 { 2 } else { 4 };
                let count = self.length(width, "map entries")?;
                self.container(handler, count, ContainerKind::Object)
            }
        }
    }
}

impl Parse for Parser<'_> {
    fn provides(&self) -> Features {
        Features::REQUIRES_PREFIX_SIZES
    }

    fn write_one<H: Hooks>(&mut self, handler: &mut StreamHandler<H>) -> Result<()> {
        self.remaining.clear();
        loop {
            if let Some(left) = self.remaining.last_mut() {
                *left -= 1;
            }
            self.value(handler)?;
            while self.remaining.last() == Some(&0) {
                self.remaining.pop();
                self.close(handler)?;
            }
            if self.remaining.is_empty() {
                return self.input.expect_end();
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tree::build;
    use crate::{value, Limits};

    #[test]
    fn test_nested_counts() {
        let bytes = b"\x93\x90\x81\xa1k\x92\xc0\xc3\x80";
        let v = build(&mut Parser::new(bytes), &Limits::default()).unwrap();
        assert_eq!(v, value!([[], {"k": [null, true]}, {}]));
    }

    #[test]
    fn test_sign_extension() {
        let v = build(&mut Parser::new(b"\xd2\xff\xff\xff\xfe"), &Limits::default()).unwrap();
        assert_eq!(v.as_i64(), Some(-2));
        let v = build(&mut Parser::new(b"\xd0\x7f"), &Limits::default()).unwrap();
        assert_eq!(v.as_i64(), Some(127));
    }

    #[test]
    fn test_error_offset_points_at_tag() {
        let err = build(&mut Parser::new(b"\x92\x01\xc1"), &Limits::default()).unwrap_err();
        assert_eq!(err.offset(), Some(2));
    }
}
