//! The dynamically-typed value tree.
//!
//! A [`Value`] is a [`Kind`] (null, bool, signed or unsigned integer, real,
//! byte string, array, object) paired with a [`Subtype`] tag. The subtype is
//! how formats keep semantic annotations that the plain JSON data model lacks:
//! a CBOR bignum, a BSON datetime, a MessagePack ext type or a raw blob are all
//! byte strings with a distinguishing subtype.
//!
//! ## Usage Patterns
//!
//! ### Creating Values
//!
//! ```rust
//! use valuestream::{value, Value};
//!
//! let null = Value::null();
//! let boolean = Value::from(true);
//! let number = Value::from(42);
//! let text = Value::from("hello");
//! let blob = Value::blob(vec![0xde, 0xad]);
//!
//! let obj = value!({
//!     "name": "Alice",
//!     "age": 30
//! });
//! assert!(obj.is_object());
//! ```
//!
//! ### Extracting Values
//!
//! ```rust
//! use valuestream::Value;
//! use std::convert::TryFrom;
//!
//! let value = Value::from(42);
//! assert_eq!(value.as_i64(), Some(42));
//! assert_eq!(value.as_f64(), Some(42.0));
//!
//! let num: i64 = i64::try_from(value).unwrap();
//! assert_eq!(num, 42);
//! ```
//!
//! ### Subtypes
//!
//! ```rust
//! use valuestream::value::subtype;
//! use valuestream::Value;
//! use num_bigint::BigInt;
//!
//! let big: BigInt = "123456789012345678901234567890".parse().unwrap();
//! let value = Value::bignum(&big);
//! assert_eq!(value.subtype, subtype::BIGNUM);
//! assert_eq!(value.as_bigint(), Some(big));
//! ```

use crate::ObjectMap;
use chrono::{DateTime, TimeZone, Utc};
use num_bigint::BigInt;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;
use std::hash::{Hash, Hasher};
use std::mem;

/// Semantic tag attached to every value.
///
/// Values below [`subtype::USER`] are shared by every format; formats and
/// applications allocate their own tags at or above it.
pub type Subtype = i64;

/// Universal subtype tags.
pub mod subtype {
    use super::Subtype;

    pub const NORMAL: Subtype = 0;
    /// Arbitrary binary data.
    pub const BLOB: Subtype = 1;
    /// Character data without a declared encoding.
    pub const CLOB: Subtype = 2;
    pub const SYMBOL: Subtype = 3;
    /// RFC 3339 date-time string.
    pub const DATETIME: Subtype = 4;
    pub const DATE: Subtype = 5;
    pub const TIME: Subtype = 6;
    /// Decimal digits of an integer too wide for 64 bits.
    pub const BIGNUM: Subtype = 7;
    pub const REGEXP: Subtype = 8;
    pub const SEXP: Subtype = 9;
    /// Object whose keys are not strings.
    pub const MAP: Subtype = 10;
    /// Seconds since the Unix epoch.
    pub const UNIX_TIMESTAMP: Subtype = 11;
    /// Milliseconds since the Unix epoch.
    pub const UNIX_TIMESTAMP_MS: Subtype = 12;
    /// First tag open to formats and applications.
    pub const USER: Subtype = 16;
}

/// Payload of a [`Value`].
#[derive(Clone, Debug, Default, PartialEq)]
pub enum Kind {
    #[default]
    Null,
    Bool(bool),
    Int(i64),
    UInt(u64),
    Real(f64),
    /// Byte string. Text is UTF-8 by convention, blobs are arbitrary bytes.
    Str(Vec<u8>),
    Array(Vec<Value>),
    Object(ObjectMap),
}

/// Payload-free discriminant of a [`Kind`].
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum ValueType {
    Null,
    Bool,
    Int,
    UInt,
    Real,
    Str,
    Array,
    Object,
}

impl fmt::Display for ValueType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ValueType::Null => "null",
            ValueType::Bool => "boolean",
            ValueType::Int => "integer",
            ValueType::UInt => "unsigned integer",
            ValueType::Real => "real",
            ValueType::Str => "string",
            ValueType::Array => "array",
            ValueType::Object => "object",
        };
        f.write_str(name)
    }
}

/// A dynamically-typed tree value with a subtype tag.
///
/// Cloning, comparing and dropping a value never recurse, so arbitrarily deep
/// trees produced by a parser with [`Limits::unlimited`](crate::Limits::unlimited)
/// can be handled safely. `Debug`, `Hash` and serde serialization do recurse
/// and need a tree within the default depth limit.
///
/// # Examples
///
/// ```rust
/// use valuestream::{Kind, Value};
///
/// let v = Value::from(vec![Value::from(1), Value::null()]);
/// assert!(v.is_array());
/// assert!(matches!(v.kind, Kind::Array(ref items) if items.len() == 2));
/// ```
#[derive(Debug, Default)]
pub struct Value {
    pub kind: Kind,
    pub subtype: Subtype,
}

impl Value {
    /// Wraps a payload with the [`subtype::NORMAL`] tag.
    #[inline]
    #[must_use]
    pub const fn new(kind: Kind) -> Self {
        Value {
            kind,
            subtype: subtype::NORMAL,
        }
    }

    /// Wraps a payload with an explicit subtype.
    #[inline]
    #[must_use]
    pub const fn tagged(kind: Kind, subtype: Subtype) -> Self {
        Value { kind, subtype }
    }

    #[inline]
    #[must_use]
    pub const fn null() -> Self {
        Value::new(Kind::Null)
    }

    /// Empty array.
    #[must_use]
    pub fn array() -> Self {
        Value::new(Kind::Array(Vec::new()))
    }

    /// Empty object.
    #[must_use]
    pub fn object() -> Self {
        Value::new(Kind::Object(ObjectMap::new()))
    }

    /// Text string from raw bytes.
    #[must_use]
    pub fn bytes(bytes: impl Into<Vec<u8>>) -> Self {
        Value::new(Kind::Str(bytes.into()))
    }

    /// Binary string tagged [`subtype::BLOB`].
    #[must_use]
    pub fn blob(bytes: impl Into<Vec<u8>>) -> Self {
        Value::tagged(Kind::Str(bytes.into()), subtype::BLOB)
    }

    /// An unsigned integer, stored as `Int` when it fits in `i64`.
    #[must_use]
    pub const fn unsigned(n: u64) -> Self {
        if n <= i64::MAX as u64 {
            Value::new(Kind::Int(n as i64))
        } else {
            Value::new(Kind::UInt(n))
        }
    }

    /// Decimal string tagged [`subtype::BIGNUM`].
    ///
    /// ```rust
    /// use valuestream::Value;
    /// use num_bigint::BigInt;
    ///
    /// let v = Value::bignum(&BigInt::from(-7));
    /// assert_eq!(v.as_str(), Some("-7"));
    /// ```
    #[must_use]
    pub fn bignum(n: &BigInt) -> Self {
        Value::tagged(Kind::Str(n.to_string().into_bytes()), subtype::BIGNUM)
    }

    /// RFC 3339 string tagged [`subtype::DATETIME`].
    #[must_use]
    pub fn datetime(dt: DateTime<Utc>) -> Self {
        Value::tagged(Kind::Str(dt.to_rfc3339().into_bytes()), subtype::DATETIME)
    }

    #[inline]
    #[must_use]
    pub const fn value_type(&self) -> ValueType {
        match self.kind {
            Kind::Null => ValueType::Null,
            Kind::Bool(_) => ValueType::Bool,
            Kind::Int(_) => ValueType::Int,
            Kind::UInt(_) => ValueType::UInt,
            Kind::Real(_) => ValueType::Real,
            Kind::Str(_) => ValueType::Str,
            Kind::Array(_) => ValueType::Array,
            Kind::Object(_) => ValueType::Object,
        }
    }

    /// Returns `self` with its subtype replaced.
    #[must_use]
    pub fn with_subtype(mut self, subtype: Subtype) -> Self {
        self.subtype = subtype;
        self
    }

    #[inline]
    #[must_use]
    pub const fn is_null(&self) -> bool {
        matches!(self.kind, Kind::Null)
    }

    #[inline]
    #[must_use]
    pub const fn is_bool(&self) -> bool {
        matches!(self.kind, Kind::Bool(_))
    }

    /// Returns `true` for both signed and unsigned integers.
    #[inline]
    #[must_use]
    pub const fn is_integer(&self) -> bool {
        matches!(self.kind, Kind::Int(_) | Kind::UInt(_))
    }

    #[inline]
    #[must_use]
    pub const fn is_real(&self) -> bool {
        matches!(self.kind, Kind::Real(_))
    }

    #[inline]
    #[must_use]
    pub const fn is_number(&self) -> bool {
        matches!(self.kind, Kind::Int(_) | Kind::UInt(_) | Kind::Real(_))
    }

    #[inline]
    #[must_use]
    pub const fn is_string(&self) -> bool {
        matches!(self.kind, Kind::Str(_))
    }

    #[inline]
    #[must_use]
    pub const fn is_blob(&self) -> bool {
        matches!(self.kind, Kind::Str(_)) && self.subtype == subtype::BLOB
    }

    #[inline]
    #[must_use]
    pub const fn is_array(&self) -> bool {
        matches!(self.kind, Kind::Array(_))
    }

    #[inline]
    #[must_use]
    pub const fn is_object(&self) -> bool {
        matches!(self.kind, Kind::Object(_))
    }

    /// Arrays and objects.
    #[inline]
    #[must_use]
    pub const fn is_container(&self) -> bool {
        matches!(self.kind, Kind::Array(_) | Kind::Object(_))
    }

    #[inline]
    #[must_use]
    pub fn as_bool(&self) -> Option<bool> {
        match self.kind {
            Kind::Bool(b) => Some(b),
            _ => None,
        }
    }

    /// Integer value if it fits in `i64`.
    ///
    /// # Examples
    ///
    /// ```rust
    /// use valuestream::Value;
    ///
    /// assert_eq!(Value::from(42u64).as_i64(), Some(42));
    /// assert_eq!(Value::from(u64::MAX).as_i64(), None);
    /// assert_eq!(Value::from(4.0).as_i64(), None);
    /// ```
    #[inline]
    #[must_use]
    pub fn as_i64(&self) -> Option<i64> {
        match self.kind {
            Kind::Int(i) => Some(i),
            Kind::UInt(u) => i64::try_from(u).ok(),
            _ => None,
        }
    }

    /// Integer value if it is non-negative.
    #[inline]
    #[must_use]
    pub fn as_u64(&self) -> Option<u64> {
        match self.kind {
            Kind::Int(i) => u64::try_from(i).ok(),
            Kind::UInt(u) => Some(u),
            _ => None,
        }
    }

    /// Any numeric value as `f64`, possibly rounding wide integers.
    #[inline]
    #[must_use]
    pub fn as_f64(&self) -> Option<f64> {
        match self.kind {
            Kind::Int(i) => Some(i as f64),
            Kind::UInt(u) => Some(u as f64),
            Kind::Real(r) => Some(r),
            _ => None,
        }
    }

    /// The string payload if it is valid UTF-8.
    ///
    /// ```rust
    /// use valuestream::Value;
    ///
    /// assert_eq!(Value::from("hello").as_str(), Some("hello"));
    /// assert_eq!(Value::blob(vec![0xff]).as_str(), None);
    /// ```
    #[inline]
    #[must_use]
    pub fn as_str(&self) -> Option<&str> {
        match &self.kind {
            Kind::Str(bytes) => std::str::from_utf8(bytes).ok(),
            _ => None,
        }
    }

    /// The raw string payload.
    #[inline]
    #[must_use]
    pub fn as_bytes(&self) -> Option<&[u8]> {
        match &self.kind {
            Kind::Str(bytes) => Some(bytes),
            _ => None,
        }
    }

    #[inline]
    #[must_use]
    pub fn as_array(&self) -> Option<&Vec<Value>> {
        match &self.kind {
            Kind::Array(items) => Some(items),
            _ => None,
        }
    }

    #[inline]
    pub fn as_array_mut(&mut self) -> Option<&mut Vec<Value>> {
        match &mut self.kind {
            Kind::Array(items) => Some(items),
            _ => None,
        }
    }

    #[inline]
    #[must_use]
    pub fn as_object(&self) -> Option<&ObjectMap> {
        match &self.kind {
            Kind::Object(map) => Some(map),
            _ => None,
        }
    }

    #[inline]
    pub fn as_object_mut(&mut self) -> Option<&mut ObjectMap> {
        match &mut self.kind {
            Kind::Object(map) => Some(map),
            _ => None,
        }
    }

    /// Looks up a string key when this value is an object.
    #[must_use]
    pub fn get(&self, key: &str) -> Option<&Value> {
        self.as_object().and_then(|map| map.get_str(key))
    }

    /// Integer view as a [`BigInt`]: integers directly, [`subtype::BIGNUM`]
    /// strings by parsing their decimal digits.
    #[must_use]
    pub fn as_bigint(&self) -> Option<BigInt> {
        match &self.kind {
            Kind::Int(i) => Some(BigInt::from(*i)),
            Kind::UInt(u) => Some(BigInt::from(*u)),
            Kind::Str(bytes) if self.subtype == subtype::BIGNUM => {
                BigInt::parse_bytes(bytes, 10)
            }
            _ => None,
        }
    }

    /// Date-time view of [`subtype::DATETIME`] strings and Unix timestamps.
    ///
    /// ```rust
    /// use valuestream::value::subtype;
    /// use valuestream::{Kind, Value};
    ///
    /// let ts = Value::tagged(Kind::Int(86_400), subtype::UNIX_TIMESTAMP);
    /// assert_eq!(ts.as_datetime().unwrap().to_rfc3339(), "1970-01-02T00:00:00+00:00");
    /// ```
    #[must_use]
    pub fn as_datetime(&self) -> Option<DateTime<Utc>> {
        match self.subtype {
            subtype::DATETIME => DateTime::parse_from_rfc3339(self.as_str()?)
                .ok()
                .map(|dt| dt.with_timezone(&Utc)),
            subtype::UNIX_TIMESTAMP => match self.kind {
                Kind::Real(r) if r.is_finite() => {
                    let secs = r.floor();
                    let nanos = ((r - secs) * 1e9) as u32;
                    Utc.timestamp_opt(secs as i64, nanos).single()
                }
                _ => Utc.timestamp_opt(self.as_i64()?, 0).single(),
            },
            subtype::UNIX_TIMESTAMP_MS => Utc.timestamp_millis_opt(self.as_i64()?).single(),
            _ => None,
        }
    }
}

impl Drop for Value {
    fn drop(&mut self) {
        let mut pending = match &mut self.kind {
            Kind::Array(items) if !items.is_empty() => mem::take(items),
            Kind::Object(map) if !map.is_empty() => map.drain_flat(),
            _ => return,
        };
        while let Some(mut child) = pending.pop() {
            match &mut child.kind {
                Kind::Array(items) => pending.append(items),
                Kind::Object(map) => pending.extend(map.drain_flat()),
                _ => {}
            }
            // `child` is now a leaf or an empty container
        }
    }
}

/// Children of a container being cloned, plus the cloned key awaiting its value.
enum CloneSource<'a> {
    Items(std::slice::Iter<'a, Value>),
    Entries(indexmap::map::Iter<'a, Value, Value>, Option<Value>),
}

impl<'a> CloneSource<'a> {
    fn next_child(&mut self) -> Option<&'a Value> {
        match self {
            CloneSource::Items(iter) => iter.next(),
            CloneSource::Entries(iter, key) => iter.next().map(|(k, v)| {
                *key = Some(k.clone());
                v
            }),
        }
    }

    fn attach(&mut self, parent: &mut Value, child: Value) {
        match (&mut parent.kind, self) {
            (Kind::Array(items), CloneSource::Items(_)) => items.push(child),
            (Kind::Object(map), CloneSource::Entries(_, key)) => {
                if let Some(key) = key.take() {
                    map.insert(key, child);
                }
            }
            _ => {}
        }
    }
}

impl Value {
    /// Copy of a leaf, or an empty container plus the children left to copy.
    fn shell(&self) -> (Value, Option<CloneSource<'_>>) {
        let (kind, source) = match &self.kind {
            Kind::Array(items) if !items.is_empty() => (
                Kind::Array(Vec::with_capacity(items.len())),
                Some(CloneSource::Items(items.iter())),
            ),
            Kind::Object(map) if !map.is_empty() => (
                Kind::Object(ObjectMap::with_capacity(map.len())),
                Some(CloneSource::Entries(map.iter(), None)),
            ),
            Kind::Array(_) => (Kind::Array(Vec::new()), None),
            Kind::Object(_) => (Kind::Object(ObjectMap::new()), None),
            Kind::Null => (Kind::Null, None),
            Kind::Bool(b) => (Kind::Bool(*b), None),
            Kind::Int(i) => (Kind::Int(*i), None),
            Kind::UInt(u) => (Kind::UInt(*u), None),
            Kind::Real(r) => (Kind::Real(*r), None),
            Kind::Str(bytes) => (Kind::Str(bytes.clone()), None),
        };
        (Value::tagged(kind, self.subtype), source)
    }
}

impl Clone for Value {
    fn clone(&self) -> Self {
        let (root, source) = self.shell();
        let Some(source) = source else {
            return root;
        };
        let mut current = (root, source);
        let mut open = Vec::new();
        loop {
            match current.1.next_child() {
                Some(child) => match child.shell() {
                    (copy, Some(source)) => open.push(mem::replace(&mut current, (copy, source))),
                    (copy, None) => current.1.attach(&mut current.0, copy),
                },
                None => match open.pop() {
                    Some(parent) => {
                        let (done, _) = mem::replace(&mut current, parent);
                        current.1.attach(&mut current.0, done);
                    }
                    None => return current.0,
                },
            }
        }
    }
}

impl PartialEq for Value {
    fn eq(&self, other: &Self) -> bool {
        let mut pending = vec![(self, other)];
        while let Some((a, b)) = pending.pop() {
            if a.subtype != b.subtype {
                return false;
            }
            let same = match (&a.kind, &b.kind) {
                (Kind::Null, Kind::Null) => true,
                (Kind::Bool(x), Kind::Bool(y)) => x == y,
                (Kind::Int(x), Kind::Int(y)) => x == y,
                (Kind::UInt(x), Kind::UInt(y)) => x == y,
                (Kind::Int(x), Kind::UInt(y)) | (Kind::UInt(y), Kind::Int(x)) => {
                    u64::try_from(*x).map_or(false, |x| x == *y)
                }
                (Kind::Real(x), Kind::Real(y)) => x == y || (x.is_nan() && y.is_nan()),
                (Kind::Str(x), Kind::Str(y)) => x == y,
                (Kind::Array(x), Kind::Array(y)) => {
                    pending.extend(x.iter().zip(y));
                    x.len() == y.len()
                }
                // entry order does not matter, as for the map itself
                (Kind::Object(x), Kind::Object(y)) => {
                    x.len() == y.len()
                        && x.iter().all(|(key, v)| match y.get(key) {
                            Some(w) => {
                                pending.push((v, w));
                                true
                            }
                            None => false,
                        })
                }
                _ => false,
            };
            if !same {
                return false;
            }
        }
        true
    }
}

impl Eq for Value {}

impl Hash for Value {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.subtype.hash(state);
        match &self.kind {
            Kind::Null => 0u8.hash(state),
            Kind::Bool(b) => {
                1u8.hash(state);
                b.hash(state);
            }
            // non-negative integers hash alike whichever variant holds them
            Kind::Int(i) if *i >= 0 => {
                3u8.hash(state);
                (*i as u64).hash(state);
            }
            Kind::Int(i) => {
                2u8.hash(state);
                i.hash(state);
            }
            Kind::UInt(u) => {
                3u8.hash(state);
                u.hash(state);
            }
            Kind::Real(r) => {
                4u8.hash(state);
                let bits = if r.is_nan() {
                    f64::NAN.to_bits()
                } else if *r == 0.0 {
                    0
                } else {
                    r.to_bits()
                };
                bits.hash(state);
            }
            Kind::Str(bytes) => {
                5u8.hash(state);
                bytes.hash(state);
            }
            Kind::Array(items) => {
                6u8.hash(state);
                items.hash(state);
            }
            // map equality ignores order, so only the length is stable
            Kind::Object(map) => {
                7u8.hash(state);
                map.len().hash(state);
            }
        }
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match crate::to_json(self) {
            Ok(text) => f.write_str(&text),
            Err(_) => write!(f, "{:?}", self.kind),
        }
    }
}

impl Serialize for Value {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        match &self.kind {
            Kind::Null => serializer.serialize_unit(),
            Kind::Bool(b) => serializer.serialize_bool(*b),
            Kind::Int(i) => serializer.serialize_i64(*i),
            Kind::UInt(u) => serializer.serialize_u64(*u),
            Kind::Real(r) => serializer.serialize_f64(*r),
            Kind::Str(bytes) => {
                if self.subtype == subtype::BLOB {
                    return serializer.serialize_bytes(bytes);
                }
                match std::str::from_utf8(bytes) {
                    Ok(text) => serializer.serialize_str(text),
                    Err(_) => serializer.serialize_bytes(bytes),
                }
            }
            Kind::Array(items) => {
                use serde::ser::SerializeSeq;
                let mut seq = serializer.serialize_seq(Some(items.len()))?;
                for element in items {
                    seq.serialize_element(element)?;
                }
                seq.end()
            }
            Kind::Object(map) => {
                use serde::ser::SerializeMap;
                let mut out = serializer.serialize_map(Some(map.len()))?;
                for (k, v) in map.iter() {
                    out.serialize_entry(k, v)?;
                }
                out.end()
            }
        }
    }
}

impl<'de> Deserialize<'de> for Value {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        use serde::de::{self, Visitor};

        struct ValueVisitor;

        impl<'de> Visitor<'de> for ValueVisitor {
            type Value = Value;

            fn expecting(&self, formatter: &mut fmt::Formatter) -> fmt::Result {
                formatter.write_str("any value")
            }

            fn visit_bool<E>(self, value: bool) -> Result<Self::Value, E> {
                Ok(Value::from(value))
            }

            fn visit_i64<E>(self, value: i64) -> Result<Self::Value, E> {
                Ok(Value::from(value))
            }

            fn visit_u64<E>(self, value: u64) -> Result<Self::Value, E> {
                Ok(Value::unsigned(value))
            }

            fn visit_f64<E>(self, value: f64) -> Result<Self::Value, E> {
                Ok(Value::from(value))
            }

            fn visit_str<E>(self, value: &str) -> Result<Self::Value, E> {
                Ok(Value::from(value))
            }

            fn visit_string<E>(self, value: String) -> Result<Self::Value, E> {
                Ok(Value::from(value))
            }

            fn visit_bytes<E>(self, value: &[u8]) -> Result<Self::Value, E> {
                Ok(Value::blob(value))
            }

            fn visit_byte_buf<E>(self, value: Vec<u8>) -> Result<Self::Value, E> {
                Ok(Value::blob(value))
            }

            fn visit_unit<E>(self) -> Result<Self::Value, E> {
                Ok(Value::null())
            }

            fn visit_none<E>(self) -> Result<Self::Value, E> {
                Ok(Value::null())
            }

            fn visit_some<D>(self, deserializer: D) -> Result<Self::Value, D::Error>
            where
                D: Deserializer<'de>,
            {
                Deserialize::deserialize(deserializer)
            }

            fn visit_seq<A>(self, mut seq: A) -> Result<Self::Value, A::Error>
            where
                A: de::SeqAccess<'de>,
            {
                let mut vec = Vec::with_capacity(seq.size_hint().unwrap_or(0).min(4096));
                while let Some(elem) = seq.next_element()? {
                    vec.push(elem);
                }
                Ok(Value::from(vec))
            }

            fn visit_map<A>(self, mut map: A) -> Result<Self::Value, A::Error>
            where
                A: de::MapAccess<'de>,
            {
                let mut values = ObjectMap::new();
                while let Some((key, value)) = map.next_entry::<Value, Value>()? {
                    values.insert(key, value);
                }
                Ok(Value::from(values))
            }
        }

        deserializer.deserialize_any(ValueVisitor)
    }
}

impl TryFrom<Value> for i64 {
    type Error = crate::Error;

    fn try_from(value: Value) -> crate::Result<Self> {
        value
            .as_i64()
            .ok_or_else(|| crate::Error::custom(format!("expected integer, found {}", value.value_type())))
    }
}

impl TryFrom<Value> for u64 {
    type Error = crate::Error;

    fn try_from(value: Value) -> crate::Result<Self> {
        value.as_u64().ok_or_else(|| {
            crate::Error::custom(format!(
                "expected non-negative integer, found {}",
                value.value_type()
            ))
        })
    }
}

impl TryFrom<Value> for f64 {
    type Error = crate::Error;

    fn try_from(value: Value) -> crate::Result<Self> {
        value
            .as_f64()
            .ok_or_else(|| crate::Error::custom(format!("expected number, found {}", value.value_type())))
    }
}

impl TryFrom<Value> for bool {
    type Error = crate::Error;

    fn try_from(value: Value) -> crate::Result<Self> {
        value
            .as_bool()
            .ok_or_else(|| crate::Error::custom(format!("expected bool, found {}", value.value_type())))
    }
}

impl TryFrom<Value> for String {
    type Error = crate::Error;

    fn try_from(mut value: Value) -> crate::Result<Self> {
        match mem::take(&mut value.kind) {
            Kind::Str(bytes) => String::from_utf8(bytes)
                .map_err(|e| crate::Error::custom(format!("string is not UTF-8: {}", e))),
            other => Err(crate::Error::custom(format!(
                "expected string, found {}",
                Value::new(other).value_type()
            ))),
        }
    }
}

impl From<Kind> for Value {
    fn from(kind: Kind) -> Self {
        Value::new(kind)
    }
}

impl From<bool> for Value {
    fn from(value: bool) -> Self {
        Value::new(Kind::Bool(value))
    }
}

macro_rules! from_signed {
    ($($ty:ty),*) => {$(
        impl From<$ty> for Value {
            fn from(value: $ty) -> Self {
                Value::new(Kind::Int(value as i64))
            }
        }
    )*};
}

macro_rules! from_unsigned {
    ($($ty:ty),*) => {$(
        impl From<$ty> for Value {
            fn from(value: $ty) -> Self {
                Value::unsigned(value as u64)
            }
        }
    )*};
}

from_signed!(i8, i16, i32, i64, isize);
from_unsigned!(u8, u16, u32, u64, usize);

impl From<f32> for Value {
    fn from(value: f32) -> Self {
        Value::new(Kind::Real(value as f64))
    }
}

impl From<f64> for Value {
    fn from(value: f64) -> Self {
        Value::new(Kind::Real(value))
    }
}

impl From<String> for Value {
    fn from(value: String) -> Self {
        Value::new(Kind::Str(value.into_bytes()))
    }
}

impl From<&str> for Value {
    fn from(value: &str) -> Self {
        Value::new(Kind::Str(value.as_bytes().to_vec()))
    }
}

impl From<Vec<Value>> for Value {
    fn from(value: Vec<Value>) -> Self {
        Value::new(Kind::Array(value))
    }
}

impl From<ObjectMap> for Value {
    fn from(value: ObjectMap) -> Self {
        Value::new(Kind::Object(value))
    }
}

impl<T: Into<Value>> From<Option<T>> for Value {
    fn from(value: Option<T>) -> Self {
        value.map_or_else(Value::null, Into::into)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::hash_map::DefaultHasher;

    fn nested(depth: usize) -> Value {
        let mut v = Value::from(1);
        for i in 0..depth {
            v = if i % 2 == 0 {
                Value::from(vec![Value::from("x"), v])
            } else {
                Value::from(ObjectMap::from_iter([("k", v)]))
            };
        }
        v
    }

    #[test]
    fn test_deep_clone_and_compare_do_not_recurse() {
        let deep = nested(200_000);
        let copy = deep.clone();
        assert_eq!(copy, deep);
        assert_ne!(nested(200_000), nested(199_999));
    }

    #[test]
    fn test_clone_keeps_order_and_subtypes() {
        let mut map = ObjectMap::new();
        map.insert("b", Value::blob(vec![1u8, 2]));
        map.insert("a", Value::from(vec![Value::from(1.5), Value::null()]));
        map.insert("c", Value::object());
        let v = Value::from(vec![Value::from(map), Value::array()]).with_subtype(subtype::USER);
        let copy = v.clone();
        assert_eq!(copy, v);
        assert_eq!(copy.subtype, subtype::USER);
        let keys: Vec<_> = copy.as_array().unwrap()[0]
            .as_object()
            .unwrap()
            .keys()
            .filter_map(Value::as_str)
            .collect();
        assert_eq!(keys, ["b", "a", "c"]);
        assert_eq!(copy.as_array().unwrap()[0].get("b").unwrap().subtype, subtype::BLOB);
    }

    fn hash_of(v: &Value) -> u64 {
        let mut h = DefaultHasher::new();
        v.hash(&mut h);
        h.finish()
    }

    #[test]
    fn test_int_uint_equality() {
        assert_eq!(Value::new(Kind::Int(5)), Value::new(Kind::UInt(5)));
        assert_eq!(hash_of(&Value::new(Kind::Int(5))), hash_of(&Value::new(Kind::UInt(5))));
        assert_ne!(Value::new(Kind::Int(-1)), Value::new(Kind::UInt(u64::MAX)));
        assert_ne!(Value::from(1), Value::from(1.0));
    }

    #[test]
    fn test_subtype_participates_in_equality() {
        assert_ne!(Value::from("ab"), Value::blob("ab"));
        assert_eq!(Value::blob("ab"), Value::blob(b"ab".to_vec()));
    }

    #[test]
    fn test_real_equality() {
        assert_eq!(Value::from(f64::NAN), Value::from(f64::NAN));
        assert_eq!(Value::from(0.0), Value::from(-0.0));
        assert_eq!(hash_of(&Value::from(0.0)), hash_of(&Value::from(-0.0)));
    }

    #[test]
    fn test_unsigned_normalizes() {
        assert!(matches!(Value::unsigned(7).kind, Kind::Int(7)));
        assert!(matches!(Value::unsigned(u64::MAX).kind, Kind::UInt(u64::MAX)));
        assert_eq!(Value::from(u64::MAX).as_u64(), Some(u64::MAX));
    }

    #[test]
    fn test_deep_drop_does_not_overflow() {
        let mut v = Value::null();
        for _ in 0..1_000_000 {
            v = Value::from(vec![v]);
        }
        drop(v);

        let mut obj = Value::null();
        for _ in 0..200_000 {
            let mut map = ObjectMap::new();
            map.insert(Value::from("k"), obj);
            obj = Value::from(map);
        }
        drop(obj);
    }

    #[test]
    fn test_bignum_and_datetime() {
        let big: BigInt = "-18446744073709551617".parse().unwrap();
        let v = Value::bignum(&big);
        assert_eq!(v.subtype, subtype::BIGNUM);
        assert_eq!(v.as_bigint(), Some(big));
        assert_eq!(Value::from(12).as_bigint(), Some(BigInt::from(12)));

        let dt = Utc.timestamp_opt(1_700_000_000, 0).single().unwrap();
        let v = Value::datetime(dt);
        assert_eq!(v.as_datetime(), Some(dt));
        let ms = Value::tagged(Kind::Int(1_700_000_000_000), subtype::UNIX_TIMESTAMP_MS);
        assert_eq!(ms.as_datetime(), Some(dt));
    }

    #[test]
    fn test_tryfrom() {
        assert_eq!(i64::try_from(Value::from(42)).unwrap(), 42);
        assert!(i64::try_from(Value::from("x")).is_err());
        assert_eq!(f64::try_from(Value::from(2u8)).unwrap(), 2.0);
        assert!(bool::try_from(Value::from(true)).unwrap());
        assert_eq!(String::try_from(Value::from("hi")).unwrap(), "hi");
        assert!(String::try_from(Value::blob(vec![0xff])).is_err());
    }

    #[test]
    fn test_serde_json_interop() {
        let v: Value = serde_json::from_str(r#"{"a":[1,-2,3.5,null,true],"b":"x"}"#).unwrap();
        let a = v.get("a").and_then(Value::as_array).unwrap();
        assert_eq!(a[0], Value::from(1));
        assert_eq!(a[1], Value::from(-2));
        assert_eq!(a[2], Value::from(3.5));
        assert!(a[3].is_null());
        assert_eq!(serde_json::to_string(&v).unwrap(), r#"{"a":[1,-2,3.5,null,true],"b":"x"}"#);
    }

    #[test]
    fn test_const_is_methods() {
        const fn check_null(v: &Value) -> bool {
            v.is_null()
        }
        assert!(check_null(&Value::null()));
        assert!(Value::from(1u64).is_integer());
        assert!(Value::blob(vec![1]).is_blob());
        assert_eq!(Value::from(1.5).value_type(), ValueType::Real);
    }
}
