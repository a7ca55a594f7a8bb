//! CBOR (RFC 8949) reader and writer.
//!
//! ## Mapping
//!
//! | CBOR                                  | Value                                  |
//! |---------------------------------------|----------------------------------------|
//! | major 0 / 1                           | `Int`/`UInt`, or `Str` tagged `BIGNUM` below `i64::MIN` |
//! | major 2 (byte string)                 | `Str` tagged `BLOB`                    |
//! | major 3 (text string)                 | `Str`                                  |
//! | major 4 / 5                           | `Array` / `Object`                     |
//! | tag 0 + text                          | `Str` tagged `DATETIME`                |
//! | tag 1 + number                        | number tagged `UNIX_TIMESTAMP`         |
//! | tag 2 / 3 + bytes                     | integer, or `Str` tagged `BIGNUM`      |
//! | tag 4 + `[exponent, mantissa]`        | `Str` tagged `BIGNUM`, as `<m>e<e>`    |
//! | `false` `true` `null`                 | `Bool` / `Null`                        |
//! | other simple values, `undefined`      | `Null` tagged [`simple_subtype`]`(n)`  |
//! | half / single / double                | `Real`                                 |
//!
//! Any other tag is skipped and its content read as if untagged.
//!
//! `BIGNUM` strings with a fraction or exponent are written as decimal
//! fractions, so `1.5e400` comes back as `15e399`.
//!
//! The writer streams anything: containers and strings of unknown length
//! go out in indefinite form, closed with a break byte. Reals use the
//! narrowest of half, single and double precision that is exact.
//!
//! ```rust
//! use valuestream::{from_cbor, to_cbor, value};
//!
//! let v = value!({"a": 1, "b": [2, 3]});
//! let bytes = to_cbor(&v).unwrap();
//! assert_eq!(bytes, b"\xa2\x61a\x01\x61b\x82\x02\x03");
//! assert_eq!(from_cbor(&bytes).unwrap(), v);
//!
//! // indefinite forms read the same
//! assert_eq!(from_cbor(b"\xbf\x61a\x01\x61b\x9f\x02\x03\xff\xff").unwrap(), v);
//! ```

mod de;
mod ser;

pub use de::Parser;
pub use ser::Writer;

use crate::value::{subtype, Subtype};

const FORMAT: &str = "cbor";

const MAJOR_UNSIGNED: u8 = 0;
const MAJOR_NEGATIVE: u8 = 1;
const MAJOR_BYTES: u8 = 2;
const MAJOR_TEXT: u8 = 3;
const MAJOR_ARRAY: u8 = 4;
const MAJOR_MAP: u8 = 5;
const MAJOR_TAG: u8 = 6;
const MAJOR_SIMPLE: u8 = 7;

const INDEFINITE: u8 = 31;
const BREAK: u8 = 0xff;

const TAG_DATETIME: u64 = 0;
const TAG_EPOCH: u64 = 1;
const TAG_POSITIVE_BIGNUM: u64 = 2;
const TAG_NEGATIVE_BIGNUM: u64 = 3;
const TAG_DECIMAL_FRACTION: u64 = 4;

const SIMPLE_FALSE: u8 = 20;
const SIMPLE_TRUE: u8 = 21;
const SIMPLE_NULL: u8 = 22;
const SIMPLE_UNDEFINED: u8 = 23;

const HALF: u8 = 0xf9;
const SINGLE: u8 = 0xfa;
const DOUBLE: u8 = 0xfb;

/// First subtype used for simple values other than `false`, `true` and `null`.
pub const SIMPLE_BASE: Subtype = subtype::USER + 512;

/// `Null` tagged with this subtype stands for CBOR `undefined`.
pub const UNDEFINED: Subtype = simple_subtype(SIMPLE_UNDEFINED);

/// Subtype of a `Null` standing for simple value `n`.
#[must_use]
pub const fn simple_subtype(n: u8) -> Subtype {
    SIMPLE_BASE + n as Subtype
}

/// Inverse of [`simple_subtype`].
#[must_use]
pub const fn simple_value(subtype: Subtype) -> Option<u8> {
    if subtype >= SIMPLE_BASE && subtype < SIMPLE_BASE + 256 {
        Some((subtype - SIMPLE_BASE) as u8)
    } else {
        None
    }
}
