//! CBOR writer.

use super::*;
use crate::error::{Error, Result};
use crate::ieee754::{f64_to_f16_bits, fits_f32};
use crate::io::Sink;
use crate::json::scan_number;
use crate::stream::{Header, Hooks, Nesting};
use num_bigint::BigInt;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum StringMode {
    Definite,
    Indefinite,
    Bignum,
}

/// Writes CBOR into a [`Sink`]. Needs nothing up front.
#[derive(Debug)]
pub struct Writer<S> {
    sink: S,
    mode: StringMode,
    major: u8,
    digits: Vec<u8>,
}

impl<S: Sink> Writer<S> {
    pub fn new(sink: S) -> Self {
        Writer {
            sink,
            mode: StringMode::Definite,
            major: MAJOR_TEXT,
            digits: Vec::new(),
        }
    }

    pub fn into_inner(self) -> S {
        self.sink
    }

    /// Initial byte plus the shortest argument encoding of `n`.
    fn head(&mut self, major: u8, n: u64) -> Result<()> {
        let major = major << 5;
        match n {
            0..=23 => self.sink.put(major | n as u8),
            24..=0xff => self.sink.write_all(&[major | 24, n as u8]),
            0x100..=0xffff => {
                self.sink.put(major | 25)?;
                self.sink.write_all(&(n as u16).to_be_bytes())
            }
            0x1_0000..=0xffff_ffff => {
                self.sink.put(major | 26)?;
                self.sink.write_all(&(n as u32).to_be_bytes())
            }
            _ => {
                self.sink.put(major | 27)?;
                self.sink.write_all(&n.to_be_bytes())
            }
        }
    }

    fn tag(&mut self, header: &Header<'_>) -> Result<()> {
        if header.subtype == subtype::UNIX_TIMESTAMP {
            self.head(MAJOR_TAG, TAG_EPOCH)?;
        }
        Ok(())
    }

    /// Integral text goes out as an integer or a tag 2/3 bignum. Text with a
    /// fraction or exponent goes out as a tag 4 decimal fraction.
    fn write_bignum(&mut self) -> Result<()> {
        let text = std::mem::take(&mut self.digits);
        let written = match scan_number(&text) {
            Some((len, true)) if len == text.len() => BigInt::parse_bytes(&text, 10)
                .ok_or_else(|| Error::range(FORMAT, "bignum string is not a decimal number"))
                .and_then(|n| self.write_integer(n)),
            Some((len, false)) if len == text.len() => self.write_decimal_fraction(&text),
            _ => Err(Error::range(FORMAT, "bignum string is not a decimal number")),
        };
        self.digits = text;
        written
    }

    fn write_integer(&mut self, n: BigInt) -> Result<()> {
        if let Ok(small) = u64::try_from(&n) {
            return self.head(MAJOR_UNSIGNED, small);
        }
        let negative = n.sign() == num_bigint::Sign::Minus;
        // a negative n is carried as -1 - n
        let magnitude = if negative { -n - 1 } else { n };
        if negative {
            if let Ok(small) = u64::try_from(&magnitude) {
                return self.head(MAJOR_NEGATIVE, small);
            }
        }
        let (_, bytes) = magnitude.to_bytes_be();
        let tag = if negative { TAG_NEGATIVE_BIGNUM } else { TAG_POSITIVE_BIGNUM };
        self.head(MAJOR_TAG, tag)?;
        self.head(MAJOR_BYTES, bytes.len() as u64)?;
        self.sink.write_all(&bytes)
    }

    /// `[exponent, mantissa]` under tag 4, with the fraction digits folded
    /// into the mantissa.
    fn write_decimal_fraction(&mut self, text: &[u8]) -> Result<()> {
        let overflow = || Error::range(FORMAT, "decimal fraction exponent out of range");
        let (significand, exponent) = match text.iter().position(|&b| b == b'e' || b == b'E') {
            Some(at) => (&text[..at], &text[at + 1..]),
            None => (text, &b"0"[..]),
        };
        let (whole, fraction) = match significand.iter().position(|&b| b == b'.') {
            Some(at) => (&significand[..at], &significand[at + 1..]),
            None => (significand, &b""[..]),
        };
        let exponent = std::str::from_utf8(exponent)
            .ok()
            .and_then(|e| e.parse::<i64>().ok())
            .and_then(|e| e.checked_sub(i64::try_from(fraction.len()).ok()?))
            .ok_or_else(overflow)?;
        let digits = [whole, fraction].concat();
        let mantissa = BigInt::parse_bytes(&digits, 10)
            .ok_or_else(|| Error::range(FORMAT, "bignum string is not a decimal number"))?;

        self.head(MAJOR_TAG, TAG_DECIMAL_FRACTION)?;
        self.head(MAJOR_ARRAY, 2)?;
        if exponent >= 0 {
            self.head(MAJOR_UNSIGNED, exponent as u64)?;
        } else {
            self.head(MAJOR_NEGATIVE, !exponent as u64)?;
        }
        self.write_integer(mantissa)
    }

    fn indefinite(nesting: &Nesting) -> bool {
        nesting.top().map_or(false, |frame| frame.declared.is_none())
    }
}

impl<S: Sink> Hooks for Writer<S> {
    fn null_(&mut self, _: &Nesting, header: &Header<'_>) -> Result<()> {
        match simple_value(header.subtype) {
            // 20..=22 are false/true/null, 24..=31 have no well-formed encoding
            Some(n @ (SIMPLE_FALSE..=SIMPLE_NULL | 24..=31)) => Err(Error::range(
                FORMAT,
                format!("simple value {} cannot be written", n),
            )),
            Some(n) if n < 24 => self.head(MAJOR_SIMPLE, u64::from(n)),
            Some(n) => self.sink.write_all(&[0xf8, n]),
            None => self.head(MAJOR_SIMPLE, u64::from(SIMPLE_NULL)),
        }
    }

    fn bool_(&mut self, _: &Nesting, _: &Header<'_>, value: bool) -> Result<()> {
        let simple = if value { SIMPLE_TRUE } else { SIMPLE_FALSE };
        self.head(MAJOR_SIMPLE, u64::from(simple))
    }

    fn integer_(&mut self, _: &Nesting, header: &Header<'_>, value: i64) -> Result<()> {
        self.tag(header)?;
        if value >= 0 {
            self.head(MAJOR_UNSIGNED, value as u64)
        } else {
            // !value == -1 - value
            self.head(MAJOR_NEGATIVE, !value as u64)
        }
    }

    fn uinteger_(&mut self, _: &Nesting, header: &Header<'_>, value: u64) -> Result<()> {
        self.tag(header)?;
        self.head(MAJOR_UNSIGNED, value)
    }

    fn real_(&mut self, _: &Nesting, header: &Header<'_>, value: f64) -> Result<()> {
        self.tag(header)?;
        if let Some(bits) = f64_to_f16_bits(value) {
            self.sink.put(HALF)?;
            self.sink.write_all(&bits.to_be_bytes())
        } else if fits_f32(value) {
            self.sink.put(SINGLE)?;
            self.sink.write_all(&(value as f32).to_be_bytes())
        } else {
            self.sink.put(DOUBLE)?;
            self.sink.write_all(&value.to_be_bytes())
        }
    }

    fn begin_string_(&mut self, _: &Nesting, header: &Header<'_>) -> Result<()> {
        if header.subtype == subtype::BIGNUM {
            self.mode = StringMode::Bignum;
            self.digits.clear();
            return Ok(());
        }
        if header.subtype == subtype::DATETIME {
            self.head(MAJOR_TAG, TAG_DATETIME)?;
        }
        self.major = if header.subtype == subtype::BLOB {
            MAJOR_BYTES
        } else {
            MAJOR_TEXT
        };
        match header.size {
            Some(len) => {
                self.mode = StringMode::Definite;
                self.head(self.major, len as u64)
            }
            None => {
                self.mode = StringMode::Indefinite;
                self.sink.put((self.major << 5) | INDEFINITE)
            }
        }
    }

    fn string_data_(&mut self, _: &Nesting, data: &[u8]) -> Result<()> {
        match self.mode {
            StringMode::Definite => self.sink.write_all(data),
            StringMode::Indefinite => {
                self.head(self.major, data.len() as u64)?;
                self.sink.write_all(data)
            }
            StringMode::Bignum => {
                self.digits.extend_from_slice(data);
                Ok(())
            }
        }
    }

    fn end_string_(&mut self, _: &Nesting) -> Result<()> {
        match self.mode {
            StringMode::Definite => Ok(()),
            StringMode::Indefinite => self.sink.put(BREAK),
            StringMode::Bignum => self.write_bignum(),
        }
    }

    fn begin_array_(&mut self, _: &Nesting, header: &Header<'_>) -> Result<()> {
        match header.size {
            Some(len) => self.head(MAJOR_ARRAY, len as u64),
            None => self.sink.put((MAJOR_ARRAY << 5) | INDEFINITE),
        }
    }

    fn end_array_(&mut self, nesting: &Nesting) -> Result<()> {
        if Self::indefinite(nesting) {
            self.sink.put(BREAK)?;
        }
        Ok(())
    }

    fn begin_object_(&mut self, _: &Nesting, header: &Header<'_>) -> Result<()> {
        match header.size {
            Some(len) => self.head(MAJOR_MAP, len as u64),
            None => self.sink.put((MAJOR_MAP << 5) | INDEFINITE),
        }
    }

    fn end_object_(&mut self, nesting: &Nesting) -> Result<()> {
        if Self::indefinite(nesting) {
            self.sink.put(BREAK)?;
        }
        Ok(())
    }
}
