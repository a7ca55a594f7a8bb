//! JSON reader.
//!
//! Single pass, no backtracking, no recursion. Container state comes from the
//! event engine itself: the parser asks the handler which container is open
//! and whether a key is pending, so it keeps no stack of its own.

use super::scan_number;
use crate::error::Result;
use crate::io::{Input, CHUNK_SIZE};
use crate::stream::{ContainerKind, Header, Hooks, StreamHandler};
use crate::tree::Parse;
use crate::value::subtype;
use log::trace;

const FORMAT: &str = "json";

/// Streams one JSON document into a [`StreamHandler`].
pub struct Parser<'a> {
    input: Input<'a>,
}

impl<'a> Parser<'a> {
    pub fn new(text: &'a str) -> Self {
        Self::from_slice(text.as_bytes())
    }

    /// Parses raw bytes; string contents are passed through unvalidated.
    pub fn from_slice(bytes: &'a [u8]) -> Self {
        Parser {
            input: Input::new(bytes, FORMAT),
        }
    }

    fn skip_whitespace(&mut self) {
        while let Some(b' ' | b'\t' | b'\n' | b'\r') = self.input.peek() {
            self.input.get();
        }
    }

    /// Reads one value or the opening of a non-empty container. Returns
    /// `false` in the latter case: the caller must read its contents next.
    fn value<H: Hooks>(&mut self, handler: &mut StreamHandler<H>) -> Result<bool> {
        let start = self.input.offset();
        let byte = self.input.next_byte("a value")?;
        if handler.nesting().expects_key() && byte != b'"' {
            return Err(self.input.error_at(start, "object keys must be strings"));
        }
        match byte {
            b'{' => {
                handler.begin_object(Header::object(None))?;
                self.skip_whitespace();
                match self.input.peek() {
                    Some(b'}') => {
                        self.input.get();
                        handler.end_object()?;
                        Ok(true)
                    }
                    Some(b'"') => Ok(false),
                    Some(_) => Err(self.input.error("expected a string key or '}'")),
                    None => Err(self.input.eof_error("an object key")),
                }
            }
            b'[' => {
                handler.begin_array(Header::array(None))?;
                self.skip_whitespace();
                if self.input.peek() == Some(b']') {
                    self.input.get();
                    handler.end_array()?;
                    Ok(true)
                } else {
                    Ok(false)
                }
            }
            b'"' => {
                self.string(handler)?;
                Ok(true)
            }
            b'n' => {
                self.literal(b"ull", start)?;
                handler.null(subtype::NORMAL)?;
                Ok(true)
            }
            b't' => {
                self.literal(b"rue", start)?;
                handler.boolean(true, subtype::NORMAL)?;
                Ok(true)
            }
            b'f' => {
                self.literal(b"alse", start)?;
                handler.boolean(false, subtype::NORMAL)?;
                Ok(true)
            }
            b'-' | b'0'..=b'9' => {
                self.input.unget();
                self.number(handler)?;
                Ok(true)
            }
            other => Err(self
                .input
                .error_at(start, format!("unexpected character {:?}", char::from(other)))),
        }
    }

    fn literal(&mut self, rest: &[u8], start: usize) -> Result<()> {
        if self.input.read_exact(rest.len(), "a literal")? != rest {
            return Err(self.input.error_at(start, "invalid literal"));
        }
        Ok(())
    }

    fn number<H: Hooks>(&mut self, handler: &mut StreamHandler<H>) -> Result<()> {
        let start = self.input.offset();
        let rest = self.input.rest();
        let (len, integral) = scan_number(rest).ok_or_else(|| {
            if rest.len() <= 1 {
                self.input.eof_error("a number")
            } else {
                self.input.error("malformed number")
            }
        })?;
        let span = &rest[..len];
        self.input.skip(len);
        // the scanner only accepts ASCII
        let text = std::str::from_utf8(span).map_err(|e| self.input.error_at(start, e))?;
        if integral {
            if let Ok(n) = text.parse::<i64>() {
                return handler.integer(n, subtype::NORMAL);
            }
            if let Ok(n) = text.parse::<u64>() {
                return handler.uinteger(n, subtype::NORMAL);
            }
            trace!("integer {} kept as bignum", text);
            return handler.string(span, subtype::BIGNUM);
        }
        let real: f64 = text
            .parse()
            .map_err(|_| self.input.error_at(start, "malformed number"))?;
        if real.is_infinite() {
            handler.string(span, subtype::BIGNUM)
        } else {
            handler.real(real, subtype::NORMAL)
        }
    }

    fn string<H: Hooks>(&mut self, handler: &mut StreamHandler<H>) -> Result<()> {
        handler.begin_string(Header::string(None))?;
        loop {
            let rest = self.input.rest();
            let run = rest
                .iter()
                .position(|&b| b == b'"' || b == b'\\' || b < 0x20)
                .unwrap_or(rest.len());
            for piece in rest[..run].chunks(CHUNK_SIZE) {
                handler.append_to_string(piece)?;
            }
            self.input.skip(run);
            match self.input.next_byte("closing quote")? {
                b'"' => break,
                b'\\' => {
                    let mut buf = [0u8; 4];
                    let decoded = self.escape(&mut buf)?;
                    handler.append_to_string(decoded)?;
                }
                _ => {
                    self.input.unget();
                    return Err(self.input.error("unescaped control character in string"));
                }
            }
        }
        handler.end_string()
    }

    fn escape<'b>(&mut self, buf: &'b mut [u8; 4]) -> Result<&'b [u8]> {
        let start = self.input.offset() - 1;
        let byte = match self.input.next_byte("escape sequence")? {
            b'"' => b'"',
            b'\\' => b'\\',
            b'/' => b'/',
            b'b' => 0x08,
            b'f' => 0x0c,
            b'n' => b'\n',
            b'r' => b'\r',
            b't' => b'\t',
            b'u' => {
                let ch = self.unicode_escape(start)?;
                let len = ch.encode_utf8(buf).len();
                return Ok(&buf[..len]);
            }
            _ => return Err(self.input.error_at(start, "invalid escape sequence")),
        };
        buf[0] = byte;
        Ok(&buf[..1])
    }

    fn hex4(&mut self) -> Result<u16> {
        let digits = self.input.read_array::<4>("four hex digits")?;
        let mut code = 0u16;
        for d in digits {
            let nibble = char::from(d)
                .to_digit(16)
                .ok_or_else(|| self.input.error("invalid hex digit in \\u escape"))?;
            code = (code << 4) | nibble as u16;
        }
        Ok(code)
    }

    fn unicode_escape(&mut self, start: usize) -> Result<char> {
        let first = self.hex4()?;
        let code = match first {
            0xd800..=0xdbff => {
                if self.input.read_exact(2, "low surrogate")? != b"\\u" {
                    return Err(self.input.error_at(start, "unpaired surrogate"));
                }
                let second = self.hex4()?;
                if !(0xdc00..=0xdfff).contains(&second) {
                    return Err(self.input.error_at(start, "unpaired surrogate"));
                }
                0x10000 + ((u32::from(first) - 0xd800) << 10) + (u32::from(second) - 0xdc00)
            }
            0xdc00..=0xdfff => return Err(self.input.error_at(start, "unpaired surrogate")),
            other => u32::from(other),
        };
        char::from_u32(code).ok_or_else(|| self.input.error_at(start, "invalid code point"))
    }
}

impl Parse for Parser<'_> {
    fn write_one<H: Hooks>(&mut self, handler: &mut StreamHandler<H>) -> Result<()> {
        let base = handler.nesting_depth();
        'value: loop {
            self.skip_whitespace();
            if !self.value(handler)? {
                continue;
            }
            loop {
                if handler.nesting_depth() == base {
                    self.skip_whitespace();
                    return self.input.expect_end();
                }
                self.skip_whitespace();
                let at = self.input.offset();
                match handler.current_container_kind() {
                    Some(ContainerKind::Array) => match self.input.next_byte("',' or ']'")? {
                        b',' => continue 'value,
                        b']' => handler.end_array()?,
                        _ => return Err(self.input.error_at(at, "expected ',' or ']'")),
                    },
                    Some(ContainerKind::Object) if handler.key_phase() => {
                        match self.input.next_byte("':'")? {
                            b':' => continue 'value,
                            _ => return Err(self.input.error_at(at, "expected ':'")),
                        }
                    }
                    Some(ContainerKind::Object) => match self.input.next_byte("',' or '}'")? {
                        b',' => {
                            self.skip_whitespace();
                            if self.input.peek() != Some(b'"') {
                                return Err(self.input.error("expected a string key"));
                            }
                            continue 'value;
                        }
                        b'}' => handler.end_object()?,
                        _ => return Err(self.input.error_at(at, "expected ',' or '}'")),
                    },
                    _ => return Err(self.input.error("string left open")),
                }
            }
        }
    }
}
