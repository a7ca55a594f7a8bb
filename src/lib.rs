//! # valuestream
//!
//! A dynamically typed value tree and a family of codecs that read and write
//! it through one push-based event engine.
//!
//! ## How it fits together
//!
//! - [`Value`] is the tree: null, booleans, signed and unsigned integers,
//!   reals, byte strings, arrays and insertion-ordered objects, each tagged
//!   with a [`Subtype`] that carries meaning such as "blob" or "timestamp".
//! - [`StreamHandler`] receives events (`begin_array`, `integer`,
//!   `begin_string`, ...), checks that they form a well-nested document and
//!   forwards them to a [`Hooks`] implementation.
//! - Every format has a `Parser` that pushes events into a handler and a
//!   `Writer` that implements [`Hooks`] by encoding events into a byte
//!   [`Sink`](io::Sink).
//! - [`tree::Builder`] is the hooks implementation that rebuilds a [`Value`];
//!   [`tree::emit`] walks a [`Value`] back into events.
//!
//! Writers declare what they need up front through [`Features`]: MessagePack
//! needs element counts before the elements, Binn and BSON need the whole
//! container to measure its byte size. [`tree::convert`] streams a parser
//! straight into a writer when it can and builds the tree in between when it
//! cannot.
//!
//! ## Formats
//!
//! | Module        | Format                         |
//! |---------------|--------------------------------|
//! | [`json`]      | JSON                           |
//! | [`bencode`]   | Bencode                        |
//! | [`msgpack`]   | MessagePack                    |
//! | [`cbor`]      | CBOR                           |
//! | [`ubjson`]    | Universal Binary JSON          |
//! | [`binn`]      | Binn                           |
//! | [`bson`]      | BSON                           |
//! | [`csv`]       | CSV and TSV                    |
//!
//! ## Quick Start
//!
//! ```rust
//! use valuestream::{from_json, from_message_pack, to_json, to_message_pack, value};
//!
//! let v = value!({"name": "widget", "sizes": [1, 2.5, null]});
//!
//! let packed = to_message_pack(&v).unwrap();
//! assert_eq!(from_message_pack(&packed).unwrap(), v);
//!
//! let text = to_json(&v).unwrap();
//! assert_eq!(text, r#"{"name":"widget","sizes":[1,2.5,null]}"#);
//! assert_eq!(from_json(&text).unwrap(), v);
//! ```
//!
//! ## Streaming without a tree
//!
//! ```rust
//! use valuestream::stream::{Header, StreamHandler};
//! use valuestream::json;
//!
//! let mut handler = StreamHandler::new(json::Writer::new(Vec::new()));
//! handler.begin_array(Header::array(None)).unwrap();
//! handler.integer(1, 0).unwrap();
//! handler.string(b"two", 0).unwrap();
//! handler.end_array().unwrap();
//! assert_eq!(handler.into_hooks().into_inner(), br#"[1,"two"]"#);
//! ```
//!
//! ## Errors
//!
//! Every fallible operation returns [`Result`]. [`Error::kind`] tells a
//! malformed input ([`ErrorKind::Syntax`], with a byte offset) apart from a
//! misuse of the engine ([`ErrorKind::Structure`]) and from a value the
//! target format cannot hold ([`ErrorKind::Range`]).
//!
//! ## Safety Guarantees
//!
//! - No `unsafe` code blocks
//! - Malformed input never panics; parsers bound allocations by the input
//!   they have actually seen
//! - Dropping and walking deep trees uses explicit stacks, not recursion

pub mod bencode;
pub mod binn;
pub mod bson;
pub mod cbor;
pub mod csv;
pub mod error;
pub mod ieee754;
pub mod io;
pub mod json;
#[macro_use]
mod macros;
mod map;
pub mod measure;
pub mod msgpack;
pub mod options;
pub mod stream;
pub mod tree;
pub mod ubjson;
pub mod value;

pub use error::{Error, ErrorKind, Result};
pub use map::ObjectMap;
pub use options::{CsvOptions, Delimiter, LineEnding, Limits};
pub use stream::{ContainerKind, Features, Header, Hooks, Nesting, StreamHandler};
pub use value::{subtype, Kind, Subtype, Value, ValueType};

use io::{IoSink, Sink};
use tree::{build, write_value, Parse};

fn decode<P: Parse>(mut parser: P, limits: &Limits) -> Result<Value> {
    build(&mut parser, limits)
}

fn encode<S: Sink, H: Hooks>(value: &Value, writer: H, into_inner: fn(H) -> S) -> Result<S> {
    let mut handler = StreamHandler::new(writer);
    write_value(value, &mut handler)?;
    Ok(into_inner(handler.into_hooks()))
}

fn into_text(bytes: Vec<u8>, format: &'static str) -> Result<String> {
    String::from_utf8(bytes)
        .map_err(|_| Error::range(format, "value contains strings that are not UTF-8"))
}

/// Parses a JSON document into a [`Value`].
///
/// # Examples
///
/// ```rust
/// use valuestream::{from_json, value};
///
/// let v = from_json(r#"{"id": 7, "tags": ["a", "b"]}"#).unwrap();
/// assert_eq!(v, value!({"id": 7, "tags": ["a", "b"]}));
/// ```
///
/// # Errors
///
/// Returns a syntax error carrying the byte offset when the text is not a
/// single well-formed JSON value.
#[must_use = "this returns the result of the operation, errors must be handled"]
pub fn from_json(text: &str) -> Result<Value> {
    from_json_with_limits(text, &Limits::default())
}

/// Parses a JSON document, rejecting nesting deeper than `limits` allows.
#[must_use = "this returns the result of the operation, errors must be handled"]
pub fn from_json_with_limits(text: &str, limits: &Limits) -> Result<Value> {
    decode(json::Parser::new(text), limits)
}

/// Serializes a [`Value`] as compact JSON text.
///
/// Strings tagged [`subtype::BLOB`] are written as base64 and strings tagged
/// [`subtype::BIGNUM`] as bare numbers.
///
/// # Errors
///
/// Fails on non-finite reals, on object keys that are not strings and on
/// strings that are not valid UTF-8.
#[must_use = "this returns the result of the operation, errors must be handled"]
pub fn to_json(value: &Value) -> Result<String> {
    let bytes = encode(value, json::Writer::new(Vec::new()), json::Writer::into_inner)?;
    into_text(bytes, "json")
}

/// Serializes a [`Value`] as JSON into any [`std::io::Write`].
///
/// # Examples
///
/// ```rust
/// use valuestream::{to_json_writer, value};
///
/// let mut out = Vec::new();
/// to_json_writer(&mut out, &value!([1, "x"])).unwrap();
/// assert_eq!(out, br#"[1,"x"]"#);
/// ```
///
/// # Errors
///
/// Returns an I/O error if writing fails, or the errors of [`to_json`].
pub fn to_json_writer<W: std::io::Write>(writer: W, value: &Value) -> Result<()> {
    let mut sink = encode(value, json::Writer::new(IoSink::new(writer)), json::Writer::into_inner)?;
    sink.flush()
}

#[must_use = "this returns the result of the operation, errors must be handled"]
pub fn from_bencode(bytes: &[u8]) -> Result<Value> {
    decode(bencode::Parser::new(bytes), &Limits::default())
}

/// Serializes a [`Value`] as Bencode.
///
/// # Errors
///
/// Bencode has no null, boolean or real, and its dictionary keys must be
/// strings; such values give a range or structure error.
#[must_use = "this returns the result of the operation, errors must be handled"]
pub fn to_bencode(value: &Value) -> Result<Vec<u8>> {
    encode(value, bencode::Writer::new(Vec::new()), bencode::Writer::into_inner)
}

#[must_use = "this returns the result of the operation, errors must be handled"]
pub fn from_message_pack(bytes: &[u8]) -> Result<Value> {
    decode(msgpack::Parser::new(bytes), &Limits::default())
}

/// Serializes a [`Value`] as MessagePack using the smallest encoding of
/// each integer, real and length.
///
/// # Examples
///
/// ```rust
/// use valuestream::{to_message_pack, value};
///
/// assert_eq!(to_message_pack(&value!({"a": 1})).unwrap(), b"\x81\xa1a\x01");
/// ```
#[must_use = "this returns the result of the operation, errors must be handled"]
pub fn to_message_pack(value: &Value) -> Result<Vec<u8>> {
    encode(value, msgpack::Writer::new(Vec::new()), msgpack::Writer::into_inner)
}

#[must_use = "this returns the result of the operation, errors must be handled"]
pub fn from_cbor(bytes: &[u8]) -> Result<Value> {
    decode(cbor::Parser::new(bytes), &Limits::default())
}

#[must_use = "this returns the result of the operation, errors must be handled"]
pub fn to_cbor(value: &Value) -> Result<Vec<u8>> {
    encode(value, cbor::Writer::new(Vec::new()), cbor::Writer::into_inner)
}

#[must_use = "this returns the result of the operation, errors must be handled"]
pub fn from_ubjson(bytes: &[u8]) -> Result<Value> {
    decode(ubjson::Parser::new(bytes), &Limits::default())
}

#[must_use = "this returns the result of the operation, errors must be handled"]
pub fn to_ubjson(value: &Value) -> Result<Vec<u8>> {
    encode(value, ubjson::Writer::new(Vec::new()), ubjson::Writer::into_inner)
}

#[must_use = "this returns the result of the operation, errors must be handled"]
pub fn from_binn(bytes: &[u8]) -> Result<Value> {
    decode(binn::Parser::new(bytes), &Limits::default())
}

/// Serializes a [`Value`] as Binn. Containers are measured before they are
/// written; [`binn::encoded_size`] gives the same measurement.
#[must_use = "this returns the result of the operation, errors must be handled"]
pub fn to_binn(value: &Value) -> Result<Vec<u8>> {
    encode(value, binn::Writer::new(Vec::new()), binn::Writer::into_inner)
}

#[must_use = "this returns the result of the operation, errors must be handled"]
pub fn from_bson(bytes: &[u8]) -> Result<Value> {
    decode(bson::Parser::new(bytes), &Limits::default())
}

/// Serializes an object as a BSON document.
///
/// # Errors
///
/// The root must be an object; anything else is a range error, as are
/// unsigned integers above `i64::MAX` that are not tagged
/// [`bson::TIMESTAMP`].
#[must_use = "this returns the result of the operation, errors must be handled"]
pub fn to_bson(value: &Value) -> Result<Vec<u8>> {
    encode(value, bson::Writer::new(Vec::new()), bson::Writer::into_inner)
}

/// Parses comma-separated rows with type deduction.
#[must_use = "this returns the result of the operation, errors must be handled"]
pub fn from_csv(text: &str) -> Result<Value> {
    from_csv_with_options(text, &CsvOptions::default())
}

/// Parses tab-separated rows with type deduction.
#[must_use = "this returns the result of the operation, errors must be handled"]
pub fn from_tsv(text: &str) -> Result<Value> {
    from_csv_with_options(text, &CsvOptions::tsv())
}

/// Parses delimited rows as configured by `options`.
///
/// # Examples
///
/// ```rust
/// use valuestream::{from_csv_with_options, value, CsvOptions, Delimiter};
///
/// let options = CsvOptions::new()
///     .with_delimiter(Delimiter::Pipe)
///     .with_deduce_types(false);
/// let rows = from_csv_with_options("a|1\n", &options).unwrap();
/// assert_eq!(rows, value!([["a", "1"]]));
/// ```
#[must_use = "this returns the result of the operation, errors must be handled"]
pub fn from_csv_with_options(text: &str, options: &CsvOptions) -> Result<Value> {
    decode(csv::Parser::new(text, options.clone()), &Limits::default())
}

#[must_use = "this returns the result of the operation, errors must be handled"]
pub fn to_csv(value: &Value) -> Result<String> {
    to_csv_with_options(value, &CsvOptions::default())
}

#[must_use = "this returns the result of the operation, errors must be handled"]
pub fn to_tsv(value: &Value) -> Result<String> {
    to_csv_with_options(value, &CsvOptions::tsv())
}

/// Writes an array of rows as delimited text.
///
/// # Errors
///
/// Returns a structure error unless `value` is an array whose elements are
/// scalars or arrays of scalars.
#[must_use = "this returns the result of the operation, errors must be handled"]
pub fn to_csv_with_options(value: &Value, options: &CsvOptions) -> Result<String> {
    let writer = csv::Writer::new(Vec::new(), options.clone());
    let bytes = encode(value, writer, csv::Writer::into_inner)?;
    into_text(bytes, "csv")
}
