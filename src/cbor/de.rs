//! CBOR reader.

use super::*;
use crate::error::Result;
use crate::ieee754::f16_bits_to_f64;
use crate::io::Input;
use crate::stream::{ContainerKind, Header, Hooks, StreamHandler};
use crate::tree::Parse;
use log::{debug, trace};
use num_bigint::{BigInt, Sign};

/// Streams one CBOR data item into a [`StreamHandler`].
///
/// Each open container is remembered with the number of items it still
/// owes, or `None` when it runs until a break byte.
pub struct Parser<'a> {
    input: Input<'a>,
    open: Vec<Option<usize>>,
}

impl<'a> Parser<'a> {
    pub fn new(bytes: &'a [u8]) -> Self {
        Parser {
            input: Input::new(bytes, FORMAT),
            open: Vec::new(),
        }
    }

    /// Decodes the argument that follows an initial byte with `info` in its
    /// low five bits. The indefinite marker is the caller's business.
    fn argument(&mut self, info: u8, at: usize) -> Result<u64> {
        let width = match info {
            0..=23 => return Ok(u64::from(info)),
            24 => 1,
            25 => 2,
            26 => 4,
            27 => 8,
            _ => {
                return Err(self
                    .input
                    .error_at(at, format!("reserved additional information {}", info)))
            }
        };
        let bytes = self.input.read_exact(width, "argument")?;
        Ok(bytes.iter().fold(0u64, |acc, &b| (acc << 8) | u64::from(b)))
    }

    fn length(&mut self, info: u8, at: usize, expected: &str) -> Result<usize> {
        let raw = self.argument(info, at)?;
        usize::try_from(raw)
            .ok()
            .filter(|&n| n <= self.input.remaining())
            .ok_or_else(|| self.input.eof_error(expected))
    }

    fn chunk<H: Hooks>(&mut self, handler: &mut StreamHandler<H>, len: usize) -> Result<()> {
        let mut left = len;
        while left > 0 {
            let piece = self.input.read_chunk(left);
            if piece.is_empty() {
                return Err(self.input.eof_error("string data"));
            }
            handler.append_to_string(piece)?;
            left -= piece.len();
        }
        Ok(())
    }

    fn string<H: Hooks>(
        &mut self,
        handler: &mut StreamHandler<H>,
        major: u8,
        info: u8,
        at: usize,
        subtype: Subtype,
    ) -> Result<()> {
        if info != INDEFINITE {
            let len = self.length(info, at, "string data")?;
            handler.begin_string(Header::string(Some(len)).with_subtype(subtype))?;
            self.chunk(handler, len)?;
            return handler.end_string();
        }
        handler.begin_string(Header::string(None).with_subtype(subtype))?;
        loop {
            let at = self.input.offset();
            let initial = self.input.next_byte("string chunk or break")?;
            if initial == BREAK {
                return handler.end_string();
            }
            if initial >> 5 != major || initial & 0x1f == INDEFINITE {
                return Err(self.input.error_at(
                    at,
                    "indefinite string chunks must be definite strings of the same type",
                ));
            }
            let len = self.length(initial & 0x1f, at, "string data")?;
            self.chunk(handler, len)?;
        }
    }

    /// Reads the whole content of a byte string; only used under bignum tags.
    fn byte_string(&mut self, info: u8, at: usize) -> Result<Vec<u8>> {
        if info != INDEFINITE {
            let len = self.length(info, at, "bignum bytes")?;
            return Ok(self.input.read_exact(len, "bignum bytes")?.to_vec());
        }
        let mut bytes = Vec::new();
        loop {
            let at = self.input.offset();
            let initial = self.input.next_byte("bignum chunk or break")?;
            if initial == BREAK {
                return Ok(bytes);
            }
            if initial >> 5 != MAJOR_BYTES || initial & 0x1f == INDEFINITE {
                return Err(self.input.error_at(at, "bignum chunks must be byte strings"));
            }
            let len = self.length(initial & 0x1f, at, "bignum bytes")?;
            bytes.extend_from_slice(self.input.read_exact(len, "bignum bytes")?);
        }
    }

    fn bignum<H: Hooks>(
        &mut self,
        handler: &mut StreamHandler<H>,
        magnitude: &[u8],
        negative: bool,
    ) -> Result<()> {
        let mut n = BigInt::from_bytes_be(Sign::Plus, magnitude);
        if negative {
            n = -n - 1;
        }
        if let Ok(small) = i64::try_from(&n) {
            return handler.integer(small, subtype::NORMAL);
        }
        if let Ok(small) = u64::try_from(&n) {
            return handler.uinteger(small, subtype::NORMAL);
        }
        handler.string(n.to_string().as_bytes(), subtype::BIGNUM)
    }

    /// An integer inside a decimal fraction, bignum tags included.
    fn fraction_part(&mut self) -> Result<BigInt> {
        let at = self.input.offset();
        let initial = self.input.next_byte("decimal fraction part")?;
        let info = initial & 0x1f;
        match initial >> 5 {
            MAJOR_UNSIGNED => Ok(BigInt::from(self.argument(info, at)?)),
            MAJOR_NEGATIVE => Ok(-BigInt::from(self.argument(info, at)?) - 1),
            MAJOR_TAG => {
                let tag = self.argument(info, at)?;
                let inner_at = self.input.offset();
                let inner = self.input.next_byte("bignum bytes")?;
                if inner >> 5 != MAJOR_BYTES
                    || !(TAG_POSITIVE_BIGNUM..=TAG_NEGATIVE_BIGNUM).contains(&tag)
                {
                    return Err(self.input.error_at(at, "decimal fraction parts must be integers"));
                }
                let magnitude = self.byte_string(inner & 0x1f, inner_at)?;
                let n = BigInt::from_bytes_be(Sign::Plus, &magnitude);
                Ok(if tag == TAG_NEGATIVE_BIGNUM { -n - 1 } else { n })
            }
            _ => Err(self.input.error_at(at, "decimal fraction parts must be integers")),
        }
    }

    /// Tag 4: `[exponent, mantissa]`, read as `<mantissa>e<exponent>`.
    fn decimal_fraction<H: Hooks>(
        &mut self,
        handler: &mut StreamHandler<H>,
        info: u8,
        at: usize,
    ) -> Result<()> {
        if info == INDEFINITE || self.argument(info, at)? != 2 {
            return Err(self
                .input
                .error_at(at, "decimal fraction must be a two-item array"));
        }
        let exponent = self.fraction_part()?;
        let mantissa = self.fraction_part()?;
        let text = format!("{}e{}", mantissa, exponent);
        trace!("cbor decimal fraction read as {}", text);
        handler.string(text.as_bytes(), subtype::BIGNUM)
    }

    fn container<H: Hooks>(
        &mut self,
        handler: &mut StreamHandler<H>,
        kind: ContainerKind,
        info: u8,
        at: usize,
    ) -> Result<()> {
        let count = if info == INDEFINITE {
            None
        } else {
            Some(self.length(info, at, "container items")?)
        };
        let owed = match kind {
            ContainerKind::Object => {
                handler.begin_object(Header::object(count))?;
                count.map(|n| n * 2)
            }
            _ => {
                handler.begin_array(Header::array(count))?;
                count
            }
        };
        if owed == Some(0) {
            self.close(handler)
        } else {
            self.open.push(owed);
            Ok(())
        }
    }

    fn close<H: Hooks>(&mut self, handler: &mut StreamHandler<H>) -> Result<()> {
        match handler.current_container_kind() {
            Some(ContainerKind::Object) => handler.end_object(),
            _ => handler.end_array(),
        }
    }

    fn simple<H: Hooks>(
        &mut self,
        handler: &mut StreamHandler<H>,
        info: u8,
        at: usize,
        tagged: Subtype,
    ) -> Result<()> {
        match info {
            SIMPLE_FALSE => handler.boolean(false, subtype::NORMAL),
            SIMPLE_TRUE => handler.boolean(true, subtype::NORMAL),
            SIMPLE_NULL => handler.null(subtype::NORMAL),
            0..=19 | SIMPLE_UNDEFINED => handler.null(simple_subtype(info)),
            24 => {
                let n = self.input.next_byte("simple value")?;
                if n < 32 {
                    return Err(self.input.error_at(at, "two-byte simple value below 32"));
                }
                handler.null(simple_subtype(n))
            }
            25 => {
                let bits = self.input.read_array::<2>("half float")?;
                handler.real(f16_bits_to_f64(u16::from_be_bytes(bits)), tagged)
            }
            26 => {
                let bits = self.input.read_array::<4>("single float")?;
                handler.real(f64::from(f32::from_be_bytes(bits)), tagged)
            }
            27 => {
                let bits = self.input.read_array::<8>("double float")?;
                handler.real(f64::from_be_bytes(bits), tagged)
            }
            INDEFINITE => Err(self.input.error_at(at, "unexpected break")),
            _ => Err(self.input.error_at(at, format!("reserved simple encoding {}", info))),
        }
    }

    /// Reads one data item, tags included. Containers are opened and left
    /// for the caller to fill.
    fn item<H: Hooks>(
        &mut self,
        handler: &mut StreamHandler<H>,
        mut initial: u8,
        mut at: usize,
    ) -> Result<()> {
        let mut tag = None;
        while initial >> 5 == MAJOR_TAG {
            let number = self.argument(initial & 0x1f, at)?;
            if number <= TAG_DECIMAL_FRACTION {
                tag = Some(number);
            } else {
                debug!("skipping cbor tag {} at offset {}", number, at);
            }
            at = self.input.offset();
            initial = self.input.next_byte("tagged item")?;
        }
        let major = initial >> 5;
        let info = initial & 0x1f;
        trace!("cbor major {} info {} at {}", major, info, at);

        let tagged = match (tag, major) {
            (None, _) => subtype::NORMAL,
            (Some(TAG_DATETIME), MAJOR_TEXT) => subtype::DATETIME,
            (Some(TAG_EPOCH), MAJOR_UNSIGNED | MAJOR_NEGATIVE) => subtype::UNIX_TIMESTAMP,
            (Some(TAG_EPOCH), MAJOR_SIMPLE) if (25..=27).contains(&info) => subtype::UNIX_TIMESTAMP,
            (Some(TAG_POSITIVE_BIGNUM | TAG_NEGATIVE_BIGNUM), MAJOR_BYTES) => {
                let magnitude = self.byte_string(info, at)?;
                return self.bignum(handler, &magnitude, tag == Some(TAG_NEGATIVE_BIGNUM));
            }
            (Some(TAG_DECIMAL_FRACTION), MAJOR_ARRAY) => {
                return self.decimal_fraction(handler, info, at)
            }
            (Some(number), _) => {
                return Err(self
                    .input
                    .error_at(at, format!("tag {} does not apply to major type {}", number, major)))
            }
        };

        match major {
            MAJOR_UNSIGNED => {
                let n = self.argument(info, at)?;
                handler.uinteger(n, tagged)
            }
            MAJOR_NEGATIVE => {
                let n = self.argument(info, at)?;
                match i64::try_from(n) {
                    Ok(n) => handler.integer(-1 - n, tagged),
                    Err(_) => {
                        let wide = u128::from(n) + 1;
                        handler.string(format!("-{}", wide).as_bytes(), subtype::BIGNUM)
                    }
                }
            }
            MAJOR_BYTES => self.string(handler, major, info, at, subtype::BLOB),
            MAJOR_TEXT => self.string(handler, major, info, at, tagged),
            MAJOR_ARRAY => self.container(handler, ContainerKind::Array, info, at),
            MAJOR_MAP => self.container(handler, ContainerKind::Object, info, at),
            _ => self.simple(handler, info, at, tagged),
        }
    }
}

impl Parse for Parser<'_> {
    fn write_one<H: Hooks>(&mut self, handler: &mut StreamHandler<H>) -> Result<()> {
        self.open.clear();
        loop {
            let at = self.input.offset();
            let initial = self.input.next_byte("a data item")?;
            if initial == BREAK {
                match self.open.last() {
                    Some(None) if handler.key_phase() => {
                        return Err(self.input.error_at(at, "break after a map key"))
                    }
                    Some(None) => {
                        self.open.pop();
                        self.close(handler)?;
                    }
                    _ => return Err(self.input.error_at(at, "unexpected break")),
                }
            } else {
                if let Some(Some(left)) = self.open.last_mut() {
                    *left -= 1;
                }
                self.item(handler, initial, at)?;
            }
            while self.open.last() == Some(&Some(0)) {
                self.open.pop();
                self.close(handler)?;
            }
            if self.open.is_empty() {
                return self.input.expect_end();
            }
        }
    }
}
