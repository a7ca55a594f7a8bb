//! JSON writer.

use super::scan_number;
use crate::error::{Error, Result};
use crate::io::Sink;
use crate::stream::{ContainerKind, Header, Hooks, Nesting};
use crate::value::subtype;
use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use log::debug;

const FORMAT: &str = "json";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum StringMode {
    Text,
    Base64,
    Bignum,
}

/// Writes compact JSON into a [`Sink`].
///
/// Streams every event straight through; the only buffering is for `BLOB`
/// and `BIGNUM` strings, whose output form depends on their complete content.
#[derive(Debug)]
pub struct Writer<S> {
    sink: S,
    mode: StringMode,
    buffer: Vec<u8>,
}

impl<S: Sink> Writer<S> {
    pub fn new(sink: S) -> Self {
        Writer {
            sink,
            mode: StringMode::Text,
            buffer: Vec::new(),
        }
    }

    pub fn into_inner(self) -> S {
        self.sink
    }

    pub fn get_ref(&self) -> &S {
        &self.sink
    }

    fn scalar_key_check(nesting: &Nesting, what: &str) -> Result<()> {
        if nesting.expects_key() {
            return Err(Error::structure(format!(
                "json object keys must be strings, found {}",
                what
            )));
        }
        Ok(())
    }

    fn write_number(&mut self, text: &str) -> Result<()> {
        self.sink.write_all(text.as_bytes())
    }
}

/// Writes `data` with JSON string escaping, without the surrounding quotes.
pub(crate) fn write_escaped<S: Sink>(sink: &mut S, data: &[u8]) -> Result<()> {
    let mut start = 0;
    for (i, &byte) in data.iter().enumerate() {
        let escaped: &[u8] = match byte {
            b'"' => b"\\\"",
            b'\\' => b"\\\\",
            b'\n' => b"\\n",
            b'\r' => b"\\r",
            b'\t' => b"\\t",
            0x08 => b"\\b",
            0x0c => b"\\f",
            0x00..=0x1f => b"",
            _ => continue,
        };
        sink.write_all(&data[start..i])?;
        if escaped.is_empty() {
            sink.write_all(format!("\\u{:04x}", byte).as_bytes())?;
        } else {
            sink.write_all(escaped)?;
        }
        start = i + 1;
    }
    sink.write_all(&data[start..])
}

impl<S: Sink> Hooks for Writer<S> {
    fn begin_key_(&mut self, nesting: &Nesting, _: &Header<'_>) -> Result<()> {
        if nesting.item_count() > 0 {
            self.sink.put(b',')?;
        }
        Ok(())
    }

    fn end_key_(&mut self, _: &Nesting) -> Result<()> {
        self.sink.put(b':')
    }

    fn begin_item_(&mut self, nesting: &Nesting, _: &Header<'_>) -> Result<()> {
        if nesting.current_kind() == Some(ContainerKind::Array) && nesting.item_count() > 0 {
            self.sink.put(b',')?;
        }
        Ok(())
    }

    fn null_(&mut self, nesting: &Nesting, _: &Header<'_>) -> Result<()> {
        Self::scalar_key_check(nesting, "null")?;
        self.sink.write_all(b"null")
    }

    fn bool_(&mut self, nesting: &Nesting, _: &Header<'_>, value: bool) -> Result<()> {
        Self::scalar_key_check(nesting, "boolean")?;
        self.sink.write_all(if value { &b"true"[..] } else { &b"false"[..] })
    }

    fn integer_(&mut self, nesting: &Nesting, _: &Header<'_>, value: i64) -> Result<()> {
        Self::scalar_key_check(nesting, "integer")?;
        self.write_number(&value.to_string())
    }

    fn uinteger_(&mut self, nesting: &Nesting, _: &Header<'_>, value: u64) -> Result<()> {
        Self::scalar_key_check(nesting, "integer")?;
        self.write_number(&value.to_string())
    }

    fn real_(&mut self, nesting: &Nesting, _: &Header<'_>, value: f64) -> Result<()> {
        Self::scalar_key_check(nesting, "real")?;
        if !value.is_finite() {
            return Err(Error::range(FORMAT, format!("cannot represent {}", value)));
        }
        // `{:?}` always keeps a fraction or an exponent
        self.write_number(&format!("{:?}", value))
    }

    fn begin_string_(&mut self, _: &Nesting, header: &Header<'_>) -> Result<()> {
        self.mode = match header.subtype {
            subtype::BLOB => StringMode::Base64,
            subtype::BIGNUM => StringMode::Bignum,
            _ => StringMode::Text,
        };
        if self.mode == StringMode::Text {
            self.sink.put(b'"')
        } else {
            self.buffer.clear();
            Ok(())
        }
    }

    fn string_data_(&mut self, _: &Nesting, data: &[u8]) -> Result<()> {
        match self.mode {
            StringMode::Text => write_escaped(&mut self.sink, data),
            _ => {
                self.buffer.extend_from_slice(data);
                Ok(())
            }
        }
    }

    fn end_string_(&mut self, nesting: &Nesting) -> Result<()> {
        let is_key = nesting.top().map_or(false, |f| f.is_key);
        match self.mode {
            StringMode::Text => self.sink.put(b'"'),
            StringMode::Base64 => {
                debug!("writing {} byte blob as base64", self.buffer.len());
                let encoded = STANDARD.encode(&self.buffer);
                self.sink.put(b'"')?;
                self.sink.write_all(encoded.as_bytes())?;
                self.sink.put(b'"')
            }
            StringMode::Bignum => {
                let bare = !is_key
                    && scan_number(&self.buffer)
                        .map_or(false, |(len, _)| len == self.buffer.len());
                if bare {
                    self.sink.write_all(&self.buffer)
                } else {
                    self.sink.put(b'"')?;
                    write_escaped(&mut self.sink, &self.buffer)?;
                    self.sink.put(b'"')
                }
            }
        }
    }

    fn begin_array_(&mut self, _: &Nesting, _: &Header<'_>) -> Result<()> {
        self.sink.put(b'[')
    }

    fn end_array_(&mut self, _: &Nesting) -> Result<()> {
        self.sink.put(b']')
    }

    fn begin_object_(&mut self, _: &Nesting, _: &Header<'_>) -> Result<()> {
        self.sink.put(b'{')
    }

    fn end_object_(&mut self, _: &Nesting) -> Result<()> {
        self.sink.put(b'}')
    }
}
