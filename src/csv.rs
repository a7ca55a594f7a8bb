//! CSV and TSV reader and writer.
//!
//! A document is an array of rows and a row is an array of fields. Fields
//! are separated by the configured [`Delimiter`](crate::Delimiter) and rows
//! end with LF or CRLF. A field containing the delimiter, a quote or a line
//! break is wrapped in double quotes, with quotes inside it doubled.
//!
//! With [`CsvOptions::deduce_types`] on, unquoted fields become typed
//! values: nothing becomes `null`, `true`/`false` become booleans and JSON
//! number syntax becomes a number. Quoted fields are always strings, and the
//! writer quotes any string that would otherwise be read back as something
//! else.
//!
//! ```rust
//! use valuestream::{from_csv, to_csv, value};
//!
//! let rows = from_csv("name,qty\nbolt,\"1,000\"\nnut,12\n").unwrap();
//! assert_eq!(rows, value!([["name", "qty"], ["bolt", "1,000"], ["nut", 12]]));
//! assert_eq!(to_csv(&rows).unwrap(), "name,qty\nbolt,\"1,000\"\nnut,12\n");
//! ```

use crate::error::{Error, Result};
use crate::io::{Input, Sink};
use crate::json::scan_number;
use crate::options::CsvOptions;
use crate::stream::{Header, Hooks, Nesting, StreamHandler};
use crate::tree::Parse;
use crate::value::subtype;
use log::trace;

const FORMAT: &str = "csv";

/// Feeds one unquoted field to `handler`, typed when it looks like a
/// literal or a number.
fn deduce<H: Hooks>(text: &[u8], handler: &mut StreamHandler<H>) -> Result<()> {
    match text {
        b"" => return handler.null(subtype::NORMAL),
        b"true" => return handler.boolean(true, subtype::NORMAL),
        b"false" => return handler.boolean(false, subtype::NORMAL),
        _ => {}
    }
    let Some((len, integral)) = scan_number(text) else {
        return handler.string(text, subtype::NORMAL);
    };
    if len != text.len() {
        return handler.string(text, subtype::NORMAL);
    }
    // scan_number only accepts ASCII
    let number = std::str::from_utf8(text).unwrap_or_default();
    if integral {
        if let Ok(n) = number.parse::<i64>() {
            return handler.integer(n, subtype::NORMAL);
        }
        if let Ok(n) = number.parse::<u64>() {
            return handler.uinteger(n, subtype::NORMAL);
        }
    }
    match number.parse::<f64>() {
        Ok(r) if r.is_finite() => handler.real(r, subtype::NORMAL),
        _ => handler.string(text, subtype::NORMAL),
    }
}

/// Whether the unquoted form of `text` would be read back as a typed value.
fn deduces(text: &[u8]) -> bool {
    matches!(text, b"" | b"true" | b"false")
        || scan_number(text).map_or(false, |(len, _)| len == text.len())
}

/// Streams a CSV document into a [`StreamHandler`] as an array of rows.
pub struct Parser<'a> {
    input: Input<'a>,
    options: CsvOptions,
    field: Vec<u8>,
}

impl<'a> Parser<'a> {
    pub fn new(text: &'a str, options: CsvOptions) -> Self {
        Parser {
            input: Input::new(text.as_bytes(), FORMAT),
            options,
            field: Vec::new(),
        }
    }

    /// Consumes a line ending if one is next.
    fn line_end(&mut self) -> bool {
        match self.input.peek() {
            Some(b'\n') => {
                self.input.get();
                true
            }
            Some(b'\r') if self.input.rest().get(1) == Some(&b'\n') => {
                self.input.skip(2);
                true
            }
            _ => false,
        }
    }

    fn at_field_end(&self) -> bool {
        match self.input.peek() {
            None | Some(b'\n') => true,
            Some(b'\r') => self.input.rest().get(1) == Some(&b'\n'),
            Some(b) => b == self.options.delimiter.as_byte(),
        }
    }

    fn quoted<H: Hooks>(&mut self, handler: &mut StreamHandler<H>) -> Result<()> {
        let start = self.input.offset();
        self.input.get();
        self.field.clear();
        loop {
            let byte = self
                .input
                .get()
                .ok_or_else(|| self.input.error_at(start, "unterminated quoted field"))?;
            if byte == b'"' {
                if self.input.peek() != Some(b'"') {
                    break;
                }
                self.input.get();
            }
            self.field.push(byte);
        }
        if !self.at_field_end() {
            return Err(self
                .input
                .error("expected a delimiter or line end after a quoted field"));
        }
        handler.string(&self.field, subtype::NORMAL)
    }

    fn unquoted<H: Hooks>(&mut self, handler: &mut StreamHandler<H>) -> Result<()> {
        let rest = self.input.rest();
        let start = self.input.offset();
        while !self.at_field_end() {
            self.input.get();
        }
        let text = &rest[..self.input.offset() - start];
        if self.options.deduce_types {
            deduce(text, handler)
        } else {
            handler.string(text, subtype::NORMAL)
        }
    }

    fn row<H: Hooks>(&mut self, handler: &mut StreamHandler<H>) -> Result<()> {
        handler.begin_array(Header::array(None))?;
        if self.line_end() {
            return handler.end_array();
        }
        loop {
            if self.input.peek() == Some(b'"') {
                self.quoted(handler)?;
            } else {
                self.unquoted(handler)?;
            }
            match self.input.peek() {
                Some(b) if b == self.options.delimiter.as_byte() => {
                    self.input.get();
                }
                _ => {
                    self.line_end();
                    return handler.end_array();
                }
            }
        }
    }
}

impl Parse for Parser<'_> {
    fn write_one<H: Hooks>(&mut self, handler: &mut StreamHandler<H>) -> Result<()> {
        handler.begin_array(Header::array(None))?;
        let mut rows = 0usize;
        while !self.input.is_eof() {
            self.row(handler)?;
            rows += 1;
        }
        trace!("csv document of {} rows", rows);
        handler.end_array()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Level {
    Row,
    Field,
}

/// Writes rows of scalars as delimited text into a [`Sink`].
///
/// Accepts an array of rows, each an array of scalars, or an array of
/// scalars written one per row.
#[derive(Debug)]
pub struct Writer<S> {
    sink: S,
    options: CsvOptions,
    field: Vec<u8>,
    string_level: Level,
}

impl<S: Sink> Writer<S> {
    pub fn new(sink: S, options: CsvOptions) -> Self {
        Writer {
            sink,
            options,
            field: Vec::new(),
            string_level: Level::Row,
        }
    }

    pub fn into_inner(self) -> S {
        self.sink
    }

    fn needs_quotes(&self, text: &[u8]) -> bool {
        let delimiter = self.options.delimiter.as_byte();
        text.iter()
            .any(|&b| b == delimiter || b == b'"' || b == b'\n' || b == b'\r')
            || (self.options.deduce_types && deduces(text))
    }

    /// Places a scalar about to be written: a whole row directly under the
    /// root, or one field of a row.
    fn begin_field(&mut self, nesting: &Nesting) -> Result<Level> {
        match nesting.depth() {
            0 => Err(Error::structure("a csv document must be an array")),
            1 => Ok(Level::Row),
            2 => {
                if nesting.item_count() > 0 {
                    self.sink.put(self.options.delimiter.as_byte())?;
                }
                Ok(Level::Field)
            }
            _ => Err(Error::structure("csv rows cannot contain containers")),
        }
    }

    fn end_field(&mut self, level: Level) -> Result<()> {
        match level {
            Level::Row => self.end_row(),
            Level::Field => Ok(()),
        }
    }

    fn end_row(&mut self) -> Result<()> {
        self.sink.write_all(self.options.line_ending.as_str().as_bytes())
    }

    fn scalar(&mut self, nesting: &Nesting, text: &[u8]) -> Result<()> {
        let level = self.begin_field(nesting)?;
        self.sink.write_all(text)?;
        self.end_field(level)
    }

    fn write_quoted(&mut self, field: &[u8]) -> Result<()> {
        self.sink.put(b'"')?;
        for piece in field.split_inclusive(|&b| b == b'"') {
            self.sink.write_all(piece)?;
            if piece.last() == Some(&b'"') {
                self.sink.put(b'"')?;
            }
        }
        self.sink.put(b'"')
    }
}

impl<S: Sink> Hooks for Writer<S> {
    fn null_(&mut self, nesting: &Nesting, _: &Header<'_>) -> Result<()> {
        self.scalar(nesting, b"")
    }

    fn bool_(&mut self, nesting: &Nesting, _: &Header<'_>, value: bool) -> Result<()> {
        self.scalar(nesting, if value { b"true" } else { b"false" })
    }

    fn integer_(&mut self, nesting: &Nesting, _: &Header<'_>, value: i64) -> Result<()> {
        self.scalar(nesting, value.to_string().as_bytes())
    }

    fn uinteger_(&mut self, nesting: &Nesting, _: &Header<'_>, value: u64) -> Result<()> {
        self.scalar(nesting, value.to_string().as_bytes())
    }

    fn real_(&mut self, nesting: &Nesting, _: &Header<'_>, value: f64) -> Result<()> {
        if !value.is_finite() {
            return Err(Error::range(FORMAT, format!("cannot represent {}", value)));
        }
        self.scalar(nesting, format!("{:?}", value).as_bytes())
    }

    fn begin_string_(&mut self, nesting: &Nesting, _: &Header<'_>) -> Result<()> {
        self.string_level = self.begin_field(nesting)?;
        self.field.clear();
        Ok(())
    }

    fn string_data_(&mut self, _: &Nesting, data: &[u8]) -> Result<()> {
        self.field.extend_from_slice(data);
        Ok(())
    }

    fn end_string_(&mut self, _: &Nesting) -> Result<()> {
        let field = std::mem::take(&mut self.field);
        if self.needs_quotes(&field) {
            self.write_quoted(&field)?;
        } else {
            self.sink.write_all(&field)?;
        }
        self.field = field;
        self.end_field(self.string_level)
    }

    fn begin_array_(&mut self, nesting: &Nesting, _: &Header<'_>) -> Result<()> {
        if nesting.depth() >= 2 {
            return Err(Error::structure("csv fields must be scalars"));
        }
        Ok(())
    }

    fn end_array_(&mut self, nesting: &Nesting) -> Result<()> {
        // the closing row is still on top, above the root
        if nesting.depth() == 2 {
            self.end_row()?;
        }
        Ok(())
    }

    fn begin_object_(&mut self, _: &Nesting, _: &Header<'_>) -> Result<()> {
        Err(Error::structure("csv cannot hold objects"))
    }
}
