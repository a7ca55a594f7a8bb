//! Binn reader.

use super::*;
use crate::io::Input;
use crate::stream::{Features, Header, Hooks, StreamHandler};
use crate::tree::Parse;
use log::trace;

struct Open {
    container: u8,
    /// Offset of the type byte, for error messages.
    start: usize,
    /// Offset one past the last byte the size field claims.
    end: usize,
    /// Elements or entries still to read.
    left: usize,
}

/// Streams one Binn value into a [`StreamHandler`].
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

    /// One-byte size, or four bytes when the top bit of the first is set.
    fn size(&mut self, expected: &str) -> Result<usize> {
        let first = self.input.next_byte(expected)?;
        if first & 0x80 == 0 {
            return Ok(usize::from(first));
        }
        let rest = self.input.read_array::<3>(expected)?;
        let n = u32::from_be_bytes([first & 0x7f, rest[0], rest[1], rest[2]]);
        Ok(n as usize)
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

    fn text<H: Hooks>(&mut self, handler: &mut StreamHandler<H>, subtype: Subtype) -> Result<()> {
        let len = self.size("string size")?;
        if len >= self.input.remaining() {
            return Err(self.input.eof_error("string data and terminator"));
        }
        handler.begin_string(Header::string(Some(len)).with_subtype(subtype))?;
        self.chunks(handler, len)?;
        let at = self.input.offset();
        if self.input.next_byte("string terminator")? != 0 {
            return Err(self.input.error_at(at, "string is not NUL-terminated"));
        }
        handler.end_string()
    }

    fn blob<H: Hooks>(&mut self, handler: &mut StreamHandler<H>) -> Result<()> {
        let len = u32::from_be_bytes(self.input.read_array::<4>("blob size")?) as usize;
        if len > self.input.remaining() {
            return Err(self.input.eof_error("blob data"));
        }
        handler.begin_string(Header::string(Some(len)).with_subtype(subtype::BLOB))?;
        self.chunks(handler, len)?;
        handler.end_string()
    }

    fn container<H: Hooks>(
        &mut self,
        handler: &mut StreamHandler<H>,
        container: u8,
        start: usize,
    ) -> Result<()> {
        let size = self.size("container size")?;
        let count = self.size("container count")?;
        let here = self.input.offset();
        let end = start
            .checked_add(size)
            .filter(|&end| end >= here && end <= here + self.input.remaining())
            .ok_or_else(|| {
                self.input
                    .error_at(start, format!("container size {} is out of bounds", size))
            })?;
        // every element takes at least one byte
        if count > end - here {
            return Err(self.input.error_at(
                start,
                format!("{} items cannot fit in {} bytes", count, end - here),
            ));
        }
        trace!("binn container {:#04x} of {} bytes, {} items", container, size, count);
        match container {
            LIST => handler.begin_array(Header::array(Some(count)))?,
            MAP => handler.begin_object(Header::object(Some(count)).with_subtype(subtype::MAP))?,
            _ => handler.begin_object(Header::object(Some(count)))?,
        }
        self.open.push(Open {
            container,
            start,
            end,
            left: count,
        });
        if count == 0 {
            self.close(handler)?;
        }
        Ok(())
    }

    fn close<H: Hooks>(&mut self, handler: &mut StreamHandler<H>) -> Result<()> {
        let Some(open) = self.open.pop() else {
            return Ok(());
        };
        if self.input.offset() != open.end {
            return Err(self
                .input
                .error_at(open.start, "container size does not match its contents"));
        }
        match open.container {
            LIST => handler.end_array(),
            _ => handler.end_object(),
        }
    }

    fn key<H: Hooks>(&mut self, handler: &mut StreamHandler<H>, container: u8) -> Result<()> {
        if container == MAP {
            let id = i32::from_be_bytes(self.input.read_array::<4>("map key")?);
            return handler.integer(i64::from(id), subtype::NORMAL);
        }
        let len = usize::from(self.input.next_byte("object key length")?);
        let name = self.input.read_exact(len, "object key")?;
        handler.string(name, subtype::NORMAL)
    }

    /// Reads one value; a container is opened and left for the caller to fill.
    fn value<H: Hooks>(&mut self, handler: &mut StreamHandler<H>) -> Result<()> {
        let at = self.input.offset();
        let tag = self.input.next_byte("a value")?;
        if tag & EXTENDED != 0 {
            return Err(self
                .input
                .error_at(at, format!("extended type {:#04x} is not supported", tag)));
        }
        match tag {
            NULL => handler.null(subtype::NORMAL),
            TRUE => handler.boolean(true, subtype::NORMAL),
            FALSE => handler.boolean(false, subtype::NORMAL),
            UINT8 => {
                let n = self.input.next_byte("uint8")?;
                handler.integer(i64::from(n), subtype::NORMAL)
            }
            INT8 => {
                let n = self.input.next_byte("int8")? as i8;
                handler.integer(i64::from(n), subtype::NORMAL)
            }
            UINT16 => {
                let n = u16::from_be_bytes(self.input.read_array("uint16")?);
                handler.integer(i64::from(n), subtype::NORMAL)
            }
            INT16 => {
                let n = i16::from_be_bytes(self.input.read_array("int16")?);
                handler.integer(i64::from(n), subtype::NORMAL)
            }
            UINT32 => {
                let n = u32::from_be_bytes(self.input.read_array("uint32")?);
                handler.integer(i64::from(n), subtype::NORMAL)
            }
            INT32 => {
                let n = i32::from_be_bytes(self.input.read_array("int32")?);
                handler.integer(i64::from(n), subtype::NORMAL)
            }
            FLOAT32 => {
                let r = f32::from_be_bytes(self.input.read_array("float32")?);
                handler.real(f64::from(r), subtype::NORMAL)
            }
            UINT64 => {
                let n = u64::from_be_bytes(self.input.read_array("uint64")?);
                handler.uinteger(n, subtype::NORMAL)
            }
            INT64 => {
                let n = i64::from_be_bytes(self.input.read_array("int64")?);
                handler.integer(n, subtype::NORMAL)
            }
            FLOAT64 => {
                let r = f64::from_be_bytes(self.input.read_array("float64")?);
                handler.real(r, subtype::NORMAL)
            }
            STRING => self.text(handler, subtype::NORMAL),
            DATETIME => self.text(handler, subtype::DATETIME),
            DATE => self.text(handler, subtype::DATE),
            TIME => self.text(handler, subtype::TIME),
            DECIMAL => self.text(handler, subtype::BIGNUM),
            BLOB => self.blob(handler),
            LIST | MAP | OBJECT => self.container(handler, tag, at),
            _ => Err(self.input.error_at(at, format!("unknown type {:#04x}", tag))),
        }
    }
}

impl Parse for Parser<'_> {
    fn provides(&self) -> Features {
        Features::REQUIRES_PREFIX_SIZES
    }

    fn write_one<H: Hooks>(&mut self, handler: &mut StreamHandler<H>) -> Result<()> {
        self.open.clear();
        loop {
            let keyed = match self.open.last() {
                Some(open) if open.container != LIST && !handler.key_phase() => {
                    Some(open.container)
                }
                _ => None,
            };
            match keyed {
                Some(container) => self.key(handler, container)?,
                None => {
                    if let Some(open) = self.open.last_mut() {
                        open.left -= 1;
                    }
                    self.value(handler)?;
                }
            }
            while matches!(self.open.last(), Some(open) if open.left == 0) && !handler.key_phase() {
                self.close(handler)?;
            }
            if self.open.is_empty() {
                return self.input.expect_end();
            }
        }
    }
}
