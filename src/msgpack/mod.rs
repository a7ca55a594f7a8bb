//! MessagePack reader and writer.
//!
//! ## Mapping
//!
//! | MessagePack                   | Value                                     |
//! |-------------------------------|-------------------------------------------|
//! | nil / bool                    | `Null` / `Bool`                           |
//! | fixint, int 8..64, uint 8..64 | `Int`, or `UInt` above `i64::MAX`         |
//! | float 32/64                   | `Real`                                    |
//! | str                           | `Str`                                     |
//! | bin                           | `Str` tagged `BLOB`                       |
//! | ext / fixext of type `t`      | `Str` tagged [`ext_subtype`]`(t)`         |
//! | array / map                   | `Array` / `Object` (any scalar key)       |
//!
//! The writer picks the shortest integer encoding and writes a real as
//! float 32 only when no precision is lost. It needs every array, map and
//! string length up front, which [`tree::convert`](crate::tree::convert)
//! arranges by buffering when the source cannot promise them.
//!
//! ```rust
//! use valuestream::{from_message_pack, to_message_pack, value};
//!
//! let v = value!({"compact": true, "schema": 0});
//! let bytes = to_message_pack(&v).unwrap();
//! assert_eq!(bytes, b"\x82\xa7compact\xc3\xa6schema\x00");
//! assert_eq!(from_message_pack(&bytes).unwrap(), v);
//! ```

mod de;
mod ser;

pub use de::Parser;
pub use ser::Writer;

use crate::value::{subtype, Subtype};

const FORMAT: &str = "msgpack";

const NIL: u8 = 0xc0;
const NEVER_USED: u8 = 0xc1;
const FALSE: u8 = 0xc2;
const TRUE: u8 = 0xc3;
const BIN8: u8 = 0xc4;
const BIN16: u8 = 0xc5;
const BIN32: u8 = 0xc6;
const EXT8: u8 = 0xc7;
const EXT16: u8 = 0xc8;
const EXT32: u8 = 0xc9;
const FLOAT32: u8 = 0xca;
const FLOAT64: u8 = 0xcb;
const UINT8: u8 = 0xcc;
const UINT16: u8 = 0xcd;
const UINT32: u8 = 0xce;
const UINT64: u8 = 0xcf;
const INT8: u8 = 0xd0;
const INT16: u8 = 0xd1;
const INT32: u8 = 0xd2;
const INT64: u8 = 0xd3;
const FIXEXT1: u8 = 0xd4;
const FIXEXT16: u8 = 0xd8;
const STR8: u8 = 0xd9;
const STR16: u8 = 0xda;
const STR32: u8 = 0xdb;
const ARRAY16: u8 = 0xdc;
const ARRAY32: u8 = 0xdd;
const MAP16: u8 = 0xde;
const MAP32: u8 = 0xdf;

const POSFIXINT_MAX: u8 = 0x7f;
const FIXMAP: u8 = 0x80;
const FIXARRAY: u8 = 0x90;
const FIXSTR: u8 = 0xa0;
const NEGFIXINT: u8 = 0xe0;

/// First subtype used for extension payloads.
pub const EXT_BASE: Subtype = subtype::USER + 256;

/// Subtype carried by a `Str` holding the payload of extension `ext_type`.
#[must_use]
pub const fn ext_subtype(ext_type: i8) -> Subtype {
    EXT_BASE + (ext_type as u8) as Subtype
}

/// Inverse of [`ext_subtype`].
#[must_use]
pub const fn ext_type(subtype: Subtype) -> Option<i8> {
    if subtype >= EXT_BASE && subtype < EXT_BASE + 256 {
        Some((subtype - EXT_BASE) as u8 as i8)
    } else {
        None
    }
}
