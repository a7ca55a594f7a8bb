//! Bencode (BEP-3) reader and writer.
//!
//! Bencode has integers, byte strings, lists and dictionaries with byte-string
//! keys; nothing else. Null, booleans and reals cannot be written. Integers
//! wider than 64 bits are read as `BIGNUM` strings, and `BIGNUM` strings are
//! written back as integers. A `BIGNUM` with a fraction or exponent, such as
//! JSON's `1e400`, is a range error.
//!
//! ```rust
//! use valuestream::{from_bencode, to_bencode, value};
//!
//! let v = from_bencode(b"d3:cow3:moo4:spaml1:a1:bee").unwrap();
//! assert_eq!(v, value!({"cow": "moo", "spam": ["a", "b"]}));
//! assert_eq!(to_bencode(&v).unwrap(), b"d3:cow3:moo4:spaml1:a1:bee");
//! ```

use crate::error::{Error, Result};
use crate::io::{Input, Sink};
use crate::stream::{ContainerKind, Features, Header, Hooks, Nesting, StreamHandler};
use crate::tree::Parse;
use crate::value::subtype;
use log::trace;

const FORMAT: &str = "bencode";

/// Streams one bencoded value into a [`StreamHandler`].
pub struct Parser<'a> {
    input: Input<'a>,
}

impl<'a> Parser<'a> {
    pub fn new(bytes: &'a [u8]) -> Self {
        Parser {
            input: Input::new(bytes, FORMAT),
        }
    }

    /// Reads ASCII digits up to `terminator`, rejecting leading zeros and `-0`.
    fn digits(&mut self, terminator: u8, allow_sign: bool) -> Result<&'a [u8]> {
        let start = self.input.offset();
        let rest = self.input.rest();
        let len = rest
            .iter()
            .position(|&b| b == terminator)
            .ok_or_else(|| self.input.eof_error("number terminator"))?;
        let text = &rest[..len];
        let magnitude = match text.split_first() {
            Some((b'-', tail)) if allow_sign => tail,
            _ => text,
        };
        let well_formed = !magnitude.is_empty()
            && magnitude.iter().all(u8::is_ascii_digit)
            && (magnitude[0] != b'0' || magnitude.len() == 1)
            && !(magnitude == b"0" && text.len() > 1);
        if !well_formed {
            return Err(self.input.error_at(start, "malformed number"));
        }
        self.input.skip(len + 1);
        Ok(text)
    }

    fn integer<H: Hooks>(&mut self, handler: &mut StreamHandler<H>) -> Result<()> {
        let text = self.digits(b'e', true)?;
        // digits() guarantees ASCII
        let text_str = std::str::from_utf8(text).map_err(|e| self.input.error(e))?;
        if let Ok(n) = text_str.parse::<i64>() {
            handler.integer(n, subtype::NORMAL)
        } else if let Ok(n) = text_str.parse::<u64>() {
            handler.uinteger(n, subtype::NORMAL)
        } else {
            trace!("bencode integer {} kept as bignum", text_str);
            handler.string(text, subtype::BIGNUM)
        }
    }

    fn string<H: Hooks>(&mut self, handler: &mut StreamHandler<H>) -> Result<()> {
        let at = self.input.offset();
        let text = self.digits(b':', false)?;
        let len: usize = std::str::from_utf8(text)
            .ok()
            .and_then(|t| t.parse().ok())
            .ok_or_else(|| self.input.error_at(at, "string length out of range"))?;
        if len > self.input.remaining() {
            return Err(self.input.eof_error("string data"));
        }
        handler.begin_string(Header::string(Some(len)))?;
        let mut left = len;
        while left > 0 {
            let chunk = self.input.read_chunk(left);
            handler.append_to_string(chunk)?;
            left -= chunk.len();
        }
        handler.end_string()
    }
}

impl Parse for Parser<'_> {
    fn provides(&self) -> Features {
        Features::REQUIRES_PREFIX_STRING_SIZE
    }

    fn write_one<H: Hooks>(&mut self, handler: &mut StreamHandler<H>) -> Result<()> {
        let base = handler.nesting_depth();
        loop {
            let at = self.input.offset();
            let byte = self.input.next_byte("a value")?;
            if handler.nesting().expects_key() && !matches!(byte, b'0'..=b'9' | b'e') {
                return Err(self.input.error_at(at, "dictionary keys must be strings"));
            }
            match byte {
                b'i' => self.integer(handler)?,
                b'0'..=b'9' => {
                    self.input.unget();
                    self.string(handler)?;
                }
                b'l' => handler.begin_array(Header::array(None))?,
                b'd' => handler.begin_object(Header::object(None))?,
                b'e' => match handler.current_container_kind() {
                    Some(ContainerKind::Array) => handler.end_array()?,
                    Some(ContainerKind::Object) if handler.key_phase() => {
                        return Err(self.input.error_at(at, "dictionary key without a value"))
                    }
                    Some(ContainerKind::Object) => handler.end_object()?,
                    _ => return Err(self.input.error_at(at, "unexpected end marker")),
                },
                other => {
                    return Err(self
                        .input
                        .error_at(at, format!("unexpected byte 0x{:02x}", other)))
                }
            }
            if handler.nesting_depth() == base {
                return self.input.expect_end();
            }
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum StringMode {
    Bytes,
    Integer,
}

/// Writes bencode into a [`Sink`]. Requires string lengths up front.
#[derive(Debug)]
pub struct Writer<S> {
    sink: S,
    mode: StringMode,
    digits: Vec<u8>,
}

impl<S: Sink> Writer<S> {
    pub fn new(sink: S) -> Self {
        Writer {
            sink,
            mode: StringMode::Bytes,
            digits: Vec::new(),
        }
    }

    pub fn into_inner(self) -> S {
        self.sink
    }

    fn unsupported(what: &str) -> Error {
        Error::range(FORMAT, format!("cannot represent {}", what))
    }

    fn write_integer(&mut self, nesting: &Nesting, text: &str) -> Result<()> {
        if nesting.expects_key() {
            return Err(Error::structure("bencode dictionary keys must be strings"));
        }
        self.sink.put(b'i')?;
        self.sink.write_all(text.as_bytes())?;
        self.sink.put(b'e')
    }
}

impl<S: Sink> Hooks for Writer<S> {
    fn features(&self) -> Features {
        Features::REQUIRES_PREFIX_STRING_SIZE
    }

    fn null_(&mut self, _: &Nesting, _: &Header<'_>) -> Result<()> {
        Err(Self::unsupported("null"))
    }

    fn bool_(&mut self, _: &Nesting, _: &Header<'_>, _: bool) -> Result<()> {
        Err(Self::unsupported("a boolean"))
    }

    fn real_(&mut self, _: &Nesting, _: &Header<'_>, _: f64) -> Result<()> {
        Err(Self::unsupported("a real number"))
    }

    fn integer_(&mut self, nesting: &Nesting, _: &Header<'_>, value: i64) -> Result<()> {
        self.write_integer(nesting, &value.to_string())
    }

    fn uinteger_(&mut self, nesting: &Nesting, _: &Header<'_>, value: u64) -> Result<()> {
        self.write_integer(nesting, &value.to_string())
    }

    fn begin_string_(&mut self, nesting: &Nesting, header: &Header<'_>) -> Result<()> {
        if header.subtype == subtype::BIGNUM && !nesting.expects_key() {
            self.mode = StringMode::Integer;
            self.digits.clear();
            return Ok(());
        }
        self.mode = StringMode::Bytes;
        let len = header.size.unwrap_or(0);
        self.sink.write_all(len.to_string().as_bytes())?;
        self.sink.put(b':')
    }

    fn string_data_(&mut self, _: &Nesting, data: &[u8]) -> Result<()> {
        match self.mode {
            StringMode::Bytes => self.sink.write_all(data),
            StringMode::Integer => {
                self.digits.extend_from_slice(data);
                Ok(())
            }
        }
    }

    fn end_string_(&mut self, _: &Nesting) -> Result<()> {
        if self.mode == StringMode::Bytes {
            return Ok(());
        }
        let magnitude = self.digits.strip_prefix(b"-").unwrap_or(&self.digits[..]);
        if magnitude.is_empty() || !magnitude.iter().all(u8::is_ascii_digit) {
            return Err(Error::range(
                FORMAT,
                format!(
                    "bignum {} is not a decimal integer, which is all bencode can hold",
                    String::from_utf8_lossy(&self.digits)
                ),
            ));
        }
        self.sink.put(b'i')?;
        self.sink.write_all(&self.digits)?;
        self.sink.put(b'e')
    }

    fn begin_array_(&mut self, _: &Nesting, _: &Header<'_>) -> Result<()> {
        self.sink.put(b'l')
    }

    fn end_array_(&mut self, _: &Nesting) -> Result<()> {
        self.sink.put(b'e')
    }

    fn begin_object_(&mut self, _: &Nesting, _: &Header<'_>) -> Result<()> {
        self.sink.put(b'd')
    }

    fn end_object_(&mut self, _: &Nesting) -> Result<()> {
        self.sink.put(b'e')
    }
}
