//! The push-based event engine every parser drives and every writer observes.
//!
//! A [`StreamHandler`] accepts begin/end/scalar calls from a producer, keeps
//! the nesting bookkeeping in one place and forwards each event to a
//! [`Hooks`] implementation. Writers only react to hooks; they never track
//! whether the next item is a key, how many items were written or whether a
//! declared length was honored. The engine does.
//!
//! ## Hook timing
//!
//! - `begin_item_`/`begin_key_` fire before the item, with the parent on top
//!   of the [`Nesting`] and its item count not yet incremented.
//! - Scalar hooks and `begin_string_`/`begin_array_`/`begin_object_` fire with
//!   the parent still on top, so `nesting.expects_key()` tells a writer whether
//!   it is writing an object key.
//! - `end_string_`/`end_array_`/`end_object_` fire with the finished frame
//!   still on top; the frame is popped afterwards and `end_key_`/`end_item_`
//!   follow with the parent on top again.
//!
//! ## Examples
//!
//! ```rust
//! use valuestream::stream::{Header, StreamHandler};
//! use valuestream::tree::Builder;
//! use valuestream::Value;
//!
//! let mut handler = StreamHandler::new(Builder::new());
//! handler.begin().unwrap();
//! handler.begin_array(Header::array(Some(2))).unwrap();
//! handler.write(&Value::from(1)).unwrap();
//! handler.begin_string(Header::string(None)).unwrap();
//! handler.append_to_string(b"ab").unwrap();
//! handler.append_to_string(b"c").unwrap();
//! handler.end_string().unwrap();
//! handler.end_array().unwrap();
//! handler.end().unwrap();
//!
//! let value = handler.into_hooks().finish();
//! assert_eq!(value, valuestream::value!([1, "abc"]));
//! ```

use crate::error::{Error, Result};
use crate::options::Limits;
use crate::value::{subtype, Kind, Subtype, Value, ValueType};
use log::trace;
use std::fmt;

bitflags::bitflags! {
    /// Capabilities a writer needs from whoever drives it.
    #[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
    pub struct Features: u8 {
        /// Arrays must be begun with their element count.
        const REQUIRES_PREFIX_ARRAY_SIZE = 1 << 0;
        /// Objects must be begun with their entry count.
        const REQUIRES_PREFIX_OBJECT_SIZE = 1 << 1;
        /// Strings must be begun with their byte length.
        const REQUIRES_PREFIX_STRING_SIZE = 1 << 2;
        /// Arrays must be begun with the complete value in the header.
        const REQUIRES_BUFFERED_ARRAYS = 1 << 3;
        /// Objects must be begun with the complete value in the header.
        const REQUIRES_BUFFERED_OBJECTS = 1 << 4;

        const REQUIRES_PREFIX_SIZES = Self::REQUIRES_PREFIX_ARRAY_SIZE.bits()
            | Self::REQUIRES_PREFIX_OBJECT_SIZE.bits()
            | Self::REQUIRES_PREFIX_STRING_SIZE.bits();
    }
}

/// What kind of frame is open.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum ContainerKind {
    Array,
    Object,
    String,
}

impl fmt::Display for ContainerKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            ContainerKind::Array => "array",
            ContainerKind::Object => "object",
            ContainerKind::String => "string",
        })
    }
}

/// One open container or string.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Frame {
    pub kind: ContainerKind,
    pub subtype: Subtype,
    /// Elements of an array, keys plus values of an object, bytes of a string.
    pub items: usize,
    /// Object only: a key has been written and its value is pending.
    pub key_phase: bool,
    /// This frame is itself an object key.
    pub is_key: bool,
    /// Size promised at begin: elements, entries (pairs) or bytes.
    pub declared: Option<usize>,
}

impl Frame {
    /// Completed entries of an object, elements of an array, bytes of a string.
    #[must_use]
    pub fn entries(&self) -> usize {
        match self.kind {
            ContainerKind::Object => self.items / 2,
            _ => self.items,
        }
    }
}

/// Stack of open frames, handed read-only to every hook.
#[derive(Clone, Debug, Default)]
pub struct Nesting {
    frames: Vec<Frame>,
}

impl Nesting {
    #[inline]
    #[must_use]
    pub fn depth(&self) -> usize {
        self.frames.len()
    }

    #[inline]
    #[must_use]
    pub fn top(&self) -> Option<&Frame> {
        self.frames.last()
    }

    /// The frame below the top one.
    #[must_use]
    pub fn parent(&self) -> Option<&Frame> {
        let n = self.frames.len();
        if n >= 2 {
            self.frames.get(n - 2)
        } else {
            None
        }
    }

    #[must_use]
    pub fn frames(&self) -> &[Frame] {
        &self.frames
    }

    #[inline]
    #[must_use]
    pub fn current_kind(&self) -> Option<ContainerKind> {
        self.top().map(|f| f.kind)
    }

    #[inline]
    #[must_use]
    pub fn item_count(&self) -> usize {
        self.top().map_or(0, |f| f.items)
    }

    #[inline]
    #[must_use]
    pub fn key_phase(&self) -> bool {
        self.top().map_or(false, |f| f.key_phase)
    }

    /// The next item written is an object key.
    #[inline]
    #[must_use]
    pub fn expects_key(&self) -> bool {
        matches!(self.top(), Some(f) if f.kind == ContainerKind::Object && !f.key_phase)
    }

    #[inline]
    fn top_mut(&mut self) -> Option<&mut Frame> {
        self.frames.last_mut()
    }
}

/// Describes the item about to be written.
///
/// `size` is the element count of an array, the entry count of an object or
/// the byte length of a string. `value` is the complete value when the
/// producer has it in memory; writers that must measure before writing rely
/// on it.
#[derive(Clone, Copy, Debug)]
pub struct Header<'v> {
    pub value_type: ValueType,
    pub subtype: Subtype,
    pub size: Option<usize>,
    pub value: Option<&'v Value>,
}

impl<'v> Header<'v> {
    #[must_use]
    pub fn new(value_type: ValueType, subtype: Subtype, size: Option<usize>) -> Self {
        Header {
            value_type,
            subtype,
            size,
            value: None,
        }
    }

    #[must_use]
    pub fn array(size: Option<usize>) -> Self {
        Header::new(ValueType::Array, subtype::NORMAL, size)
    }

    #[must_use]
    pub fn object(size: Option<usize>) -> Self {
        Header::new(ValueType::Object, subtype::NORMAL, size)
    }

    #[must_use]
    pub fn string(size: Option<usize>) -> Self {
        Header::new(ValueType::Str, subtype::NORMAL, size)
    }

    /// A scalar of the given type.
    #[must_use]
    pub fn scalar(value_type: ValueType, subtype: Subtype) -> Self {
        Header::new(value_type, subtype, None)
    }

    /// Header for a materialized value, with its exact size.
    #[must_use]
    pub fn of(value: &'v Value) -> Self {
        let size = match &value.kind {
            Kind::Str(bytes) => Some(bytes.len()),
            Kind::Array(items) => Some(items.len()),
            Kind::Object(map) => Some(map.len()),
            _ => None,
        };
        Header {
            value_type: value.value_type(),
            subtype: value.subtype,
            size,
            value: Some(value),
        }
    }

    #[must_use]
    pub fn with_subtype(mut self, subtype: Subtype) -> Self {
        self.subtype = subtype;
        self
    }
}

/// Reactions to engine events. Every method defaults to doing nothing.
#[allow(unused_variables)]
pub trait Hooks {
    /// What this implementation needs from producers.
    fn features(&self) -> Features {
        Features::empty()
    }

    fn begin_(&mut self, nesting: &Nesting) -> Result<()> {
        Ok(())
    }

    fn end_(&mut self, nesting: &Nesting) -> Result<()> {
        Ok(())
    }

    fn begin_key_(&mut self, nesting: &Nesting, header: &Header<'_>) -> Result<()> {
        Ok(())
    }

    fn end_key_(&mut self, nesting: &Nesting) -> Result<()> {
        Ok(())
    }

    fn begin_item_(&mut self, nesting: &Nesting, header: &Header<'_>) -> Result<()> {
        Ok(())
    }

    fn end_item_(&mut self, nesting: &Nesting) -> Result<()> {
        Ok(())
    }

    fn null_(&mut self, nesting: &Nesting, header: &Header<'_>) -> Result<()> {
        Ok(())
    }

    fn bool_(&mut self, nesting: &Nesting, header: &Header<'_>, value: bool) -> Result<()> {
        Ok(())
    }

    fn integer_(&mut self, nesting: &Nesting, header: &Header<'_>, value: i64) -> Result<()> {
        Ok(())
    }

    fn uinteger_(&mut self, nesting: &Nesting, header: &Header<'_>, value: u64) -> Result<()> {
        Ok(())
    }

    fn real_(&mut self, nesting: &Nesting, header: &Header<'_>, value: f64) -> Result<()> {
        Ok(())
    }

    fn begin_string_(&mut self, nesting: &Nesting, header: &Header<'_>) -> Result<()> {
        Ok(())
    }

    fn string_data_(&mut self, nesting: &Nesting, data: &[u8]) -> Result<()> {
        Ok(())
    }

    fn end_string_(&mut self, nesting: &Nesting) -> Result<()> {
        Ok(())
    }

    fn begin_array_(&mut self, nesting: &Nesting, header: &Header<'_>) -> Result<()> {
        Ok(())
    }

    fn end_array_(&mut self, nesting: &Nesting) -> Result<()> {
        Ok(())
    }

    fn begin_object_(&mut self, nesting: &Nesting, header: &Header<'_>) -> Result<()> {
        Ok(())
    }

    fn end_object_(&mut self, nesting: &Nesting) -> Result<()> {
        Ok(())
    }
}

/// Validates and sequences events for a [`Hooks`] implementation.
#[derive(Debug)]
pub struct StreamHandler<H> {
    hooks: H,
    nesting: Nesting,
    limits: Limits,
}

impl<H: Hooks> StreamHandler<H> {
    pub fn new(hooks: H) -> Self {
        Self::with_limits(hooks, Limits::default())
    }

    pub fn with_limits(hooks: H, limits: Limits) -> Self {
        StreamHandler {
            hooks,
            nesting: Nesting::default(),
            limits,
        }
    }

    pub fn hooks(&self) -> &H {
        &self.hooks
    }

    pub fn hooks_mut(&mut self) -> &mut H {
        &mut self.hooks
    }

    pub fn into_hooks(self) -> H {
        self.hooks
    }

    pub fn nesting(&self) -> &Nesting {
        &self.nesting
    }

    pub fn limits(&self) -> &Limits {
        &self.limits
    }

    #[must_use]
    pub fn current_container_kind(&self) -> Option<ContainerKind> {
        self.nesting.current_kind()
    }

    #[must_use]
    pub fn current_item_count(&self) -> usize {
        self.nesting.item_count()
    }

    #[must_use]
    pub fn key_phase(&self) -> bool {
        self.nesting.key_phase()
    }

    #[must_use]
    pub fn nesting_depth(&self) -> usize {
        self.nesting.depth()
    }

    /// Starts a document. Any frames left over from an aborted document are
    /// discarded.
    pub fn begin(&mut self) -> Result<()> {
        self.nesting.frames.clear();
        self.hooks.begin_(&self.nesting)
    }

    /// Finishes a document; every container and string must be closed.
    pub fn end(&mut self) -> Result<()> {
        if let Some(frame) = self.nesting.top() {
            return Err(Error::structure(format!(
                "end of document with an open {}",
                frame.kind
            )));
        }
        self.hooks.end_(&self.nesting)
    }

    /// Writes a complete value, walking containers with the tree driver.
    pub fn write(&mut self, value: &Value) -> Result<()> {
        match value.kind {
            Kind::Array(_) | Kind::Object(_) => crate::tree::emit(value, self),
            Kind::Str(_) => self.write_string(value),
            _ => self.write_scalar(value),
        }
    }

    pub fn begin_string(&mut self, header: Header<'_>) -> Result<()> {
        if header.size.is_none()
            && self
                .hooks
                .features()
                .contains(Features::REQUIRES_PREFIX_STRING_SIZE)
        {
            return Err(Error::capability("writer requires the string length up front"));
        }
        let is_key = self.start_item(&header, false)?;
        self.hooks.begin_string_(&self.nesting, &header)?;
        self.nesting.frames.push(Frame {
            kind: ContainerKind::String,
            subtype: header.subtype,
            items: 0,
            key_phase: false,
            is_key,
            declared: header.size,
        });
        Ok(())
    }

    pub fn append_to_string(&mut self, data: &[u8]) -> Result<()> {
        match self.nesting.top_mut() {
            Some(frame) if frame.kind == ContainerKind::String => {
                let total = frame.items + data.len();
                if frame.declared.map_or(false, |n| total > n) {
                    return Err(Error::structure(format!(
                        "string data exceeds the declared length of {} bytes",
                        frame.declared.unwrap_or(0)
                    )));
                }
                frame.items = total;
            }
            _ => return Err(Error::structure("string data without an open string")),
        }
        self.hooks.string_data_(&self.nesting, data)
    }

    pub fn end_string(&mut self) -> Result<()> {
        let frame = self.close_check(ContainerKind::String)?;
        self.hooks.end_string_(&self.nesting)?;
        self.nesting.frames.pop();
        self.finish_item(frame.is_key)
    }

    pub fn begin_array(&mut self, header: Header<'_>) -> Result<()> {
        let features = self.hooks.features();
        if header.size.is_none() && features.contains(Features::REQUIRES_PREFIX_ARRAY_SIZE) {
            return Err(Error::capability("writer requires the array length up front"));
        }
        if header.value.is_none() && features.contains(Features::REQUIRES_BUFFERED_ARRAYS) {
            return Err(Error::capability("writer requires the complete array up front"));
        }
        self.open(ContainerKind::Array, header)
    }

    pub fn end_array(&mut self) -> Result<()> {
        let frame = self.close_check(ContainerKind::Array)?;
        self.hooks.end_array_(&self.nesting)?;
        self.nesting.frames.pop();
        trace!("end array of {} items at depth {}", frame.items, self.nesting.depth());
        self.finish_item(frame.is_key)
    }

    pub fn begin_object(&mut self, header: Header<'_>) -> Result<()> {
        let features = self.hooks.features();
        if header.size.is_none() && features.contains(Features::REQUIRES_PREFIX_OBJECT_SIZE) {
            return Err(Error::capability("writer requires the object length up front"));
        }
        if header.value.is_none() && features.contains(Features::REQUIRES_BUFFERED_OBJECTS) {
            return Err(Error::capability("writer requires the complete object up front"));
        }
        self.open(ContainerKind::Object, header)
    }

    pub fn end_object(&mut self) -> Result<()> {
        let frame = self.close_check(ContainerKind::Object)?;
        if frame.key_phase {
            return Err(Error::structure("end of object while a key awaits its value"));
        }
        self.hooks.end_object_(&self.nesting)?;
        self.nesting.frames.pop();
        trace!("end object of {} entries at depth {}", frame.entries(), self.nesting.depth());
        self.finish_item(frame.is_key)
    }

    /// Writes a string value in one piece.
    pub(crate) fn write_string(&mut self, value: &Value) -> Result<()> {
        let bytes = value.as_bytes().unwrap_or_default();
        self.begin_string(Header::of(value))?;
        if !bytes.is_empty() {
            self.append_to_string(bytes)?;
        }
        self.end_string()
    }

    /// Writes a null, boolean or number.
    pub(crate) fn write_scalar(&mut self, value: &Value) -> Result<()> {
        let header = Header::of(value);
        let is_key = self.start_item(&header, false)?;
        let nesting = &self.nesting;
        match value.kind {
            Kind::Null => self.hooks.null_(nesting, &header)?,
            Kind::Bool(b) => self.hooks.bool_(nesting, &header, b)?,
            Kind::Int(i) => self.hooks.integer_(nesting, &header, i)?,
            Kind::UInt(u) => self.hooks.uinteger_(nesting, &header, u)?,
            Kind::Real(r) => self.hooks.real_(nesting, &header, r)?,
            Kind::Str(_) | Kind::Array(_) | Kind::Object(_) => {
                return Err(Error::structure(format!(
                    "{} is not a scalar",
                    value.value_type()
                )))
            }
        }
        self.finish_item(is_key)
    }

    pub fn null(&mut self, subtype: Subtype) -> Result<()> {
        let header = Header::scalar(ValueType::Null, subtype);
        let is_key = self.start_item(&header, false)?;
        self.hooks.null_(&self.nesting, &header)?;
        self.finish_item(is_key)
    }

    pub fn boolean(&mut self, value: bool, subtype: Subtype) -> Result<()> {
        let header = Header::scalar(ValueType::Bool, subtype);
        let is_key = self.start_item(&header, false)?;
        self.hooks.bool_(&self.nesting, &header, value)?;
        self.finish_item(is_key)
    }

    pub fn integer(&mut self, value: i64, subtype: Subtype) -> Result<()> {
        let header = Header::scalar(ValueType::Int, subtype);
        let is_key = self.start_item(&header, false)?;
        self.hooks.integer_(&self.nesting, &header, value)?;
        self.finish_item(is_key)
    }

    /// Writes an unsigned integer; values that fit `i64` go through the signed hook.
    pub fn uinteger(&mut self, value: u64, subtype: Subtype) -> Result<()> {
        if let Ok(signed) = i64::try_from(value) {
            return self.integer(signed, subtype);
        }
        let header = Header::scalar(ValueType::UInt, subtype);
        let is_key = self.start_item(&header, false)?;
        self.hooks.uinteger_(&self.nesting, &header, value)?;
        self.finish_item(is_key)
    }

    pub fn real(&mut self, value: f64, subtype: Subtype) -> Result<()> {
        let header = Header::scalar(ValueType::Real, subtype);
        let is_key = self.start_item(&header, false)?;
        self.hooks.real_(&self.nesting, &header, value)?;
        self.finish_item(is_key)
    }

    /// Writes a complete string from a slice.
    pub fn string(&mut self, data: &[u8], subtype: Subtype) -> Result<()> {
        self.begin_string(Header::string(Some(data.len())).with_subtype(subtype))?;
        if !data.is_empty() {
            self.append_to_string(data)?;
        }
        self.end_string()
    }

    fn open(&mut self, kind: ContainerKind, header: Header<'_>) -> Result<()> {
        if self.container_depth() >= self.limits.max_depth {
            return Err(Error::range(
                "stream",
                format!("nesting deeper than {} containers", self.limits.max_depth),
            ));
        }
        let is_key = self.start_item(&header, true)?;
        match kind {
            ContainerKind::Object => self.hooks.begin_object_(&self.nesting, &header)?,
            _ => self.hooks.begin_array_(&self.nesting, &header)?,
        }
        self.nesting.frames.push(Frame {
            kind,
            subtype: header.subtype,
            items: 0,
            key_phase: false,
            is_key,
            declared: header.size,
        });
        trace!("begin {} at depth {}", kind, self.nesting.depth());
        Ok(())
    }

    fn container_depth(&self) -> usize {
        // strings never hold frames below them, so only the top can be one
        match self.nesting.current_kind() {
            Some(ContainerKind::String) => self.nesting.depth() - 1,
            _ => self.nesting.depth(),
        }
    }

    /// Announces an item to its parent; returns whether it is an object key.
    fn start_item(&mut self, header: &Header<'_>, is_container: bool) -> Result<bool> {
        let frame = match self.nesting.top() {
            Some(frame) => *frame,
            None => return Ok(false),
        };
        match frame.kind {
            ContainerKind::String => Err(Error::structure(
                "cannot write a value inside an open string",
            )),
            ContainerKind::Array => {
                if frame.declared.map_or(false, |n| frame.items >= n) {
                    return Err(Error::structure(format!(
                        "array declared with {} items received more",
                        frame.items
                    )));
                }
                self.hooks.begin_item_(&self.nesting, header)?;
                Ok(false)
            }
            ContainerKind::Object if frame.key_phase => {
                self.hooks.begin_item_(&self.nesting, header)?;
                Ok(false)
            }
            ContainerKind::Object => {
                if is_container {
                    return Err(Error::structure(format!(
                        "{} cannot be an object key",
                        header.value_type
                    )));
                }
                if frame.declared.map_or(false, |n| frame.entries() >= n) {
                    return Err(Error::structure(format!(
                        "object declared with {} entries received more",
                        frame.entries()
                    )));
                }
                self.hooks.begin_key_(&self.nesting, header)?;
                Ok(true)
            }
        }
    }

    fn finish_item(&mut self, was_key: bool) -> Result<()> {
        let Some(frame) = self.nesting.top_mut() else {
            return Ok(());
        };
        frame.items += 1;
        if frame.kind == ContainerKind::Object {
            frame.key_phase = !frame.key_phase;
        }
        if was_key {
            self.hooks.end_key_(&self.nesting)
        } else {
            self.hooks.end_item_(&self.nesting)
        }
    }

    /// Checks that the top frame is `kind` and that its declared size was met.
    fn close_check(&self, kind: ContainerKind) -> Result<Frame> {
        let frame = match self.nesting.top() {
            Some(frame) if frame.kind == kind => *frame,
            Some(frame) => {
                return Err(Error::structure(format!(
                    "end of {} while a {} is open",
                    kind, frame.kind
                )))
            }
            None => return Err(Error::structure(format!("end of {} with nothing open", kind))),
        };
        if let Some(declared) = frame.declared {
            if declared != frame.entries() {
                return Err(Error::structure(format!(
                    "{} declared with size {} ended after {}",
                    kind,
                    declared,
                    frame.entries()
                )));
            }
        }
        Ok(frame)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ErrorKind;

    /// Records every hook as a short token.
    #[derive(Default)]
    struct Recorder {
        events: Vec<String>,
        features: Features,
    }

    impl Hooks for Recorder {
        fn features(&self) -> Features {
            self.features
        }
        fn begin_key_(&mut self, n: &Nesting, _: &Header<'_>) -> Result<()> {
            self.events.push(format!("key@{}", n.item_count()));
            Ok(())
        }
        fn end_key_(&mut self, _: &Nesting) -> Result<()> {
            self.events.push("/key".into());
            Ok(())
        }
        fn begin_item_(&mut self, n: &Nesting, _: &Header<'_>) -> Result<()> {
            self.events.push(format!("item@{}", n.item_count()));
            Ok(())
        }
        fn integer_(&mut self, n: &Nesting, _: &Header<'_>, v: i64) -> Result<()> {
            self.events.push(format!("int {} key={}", v, n.expects_key()));
            Ok(())
        }
        fn string_data_(&mut self, _: &Nesting, data: &[u8]) -> Result<()> {
            self.events.push(format!("data {}", String::from_utf8_lossy(data)));
            Ok(())
        }
        fn end_object_(&mut self, n: &Nesting) -> Result<()> {
            self.events.push(format!("/object {}", n.item_count()));
            Ok(())
        }
    }

    #[test]
    fn test_key_detection_and_counts() {
        let mut h = StreamHandler::new(Recorder::default());
        h.begin().unwrap();
        h.begin_object(Header::object(Some(1))).unwrap();
        h.integer(1, subtype::NORMAL).unwrap();
        assert!(h.key_phase());
        h.integer(2, subtype::NORMAL).unwrap();
        assert!(!h.key_phase());
        assert_eq!(h.current_item_count(), 2);
        h.end_object().unwrap();
        h.end().unwrap();
        assert_eq!(
            h.hooks().events,
            vec![
                "key@0",
                "int 1 key=true",
                "/key",
                "item@1",
                "int 2 key=false",
                "/object 2",
            ]
        );
    }

    #[test]
    fn test_dangling_key_rejected() {
        let mut h = StreamHandler::new(Recorder::default());
        h.begin_object(Header::object(None)).unwrap();
        h.string(b"k", subtype::NORMAL).unwrap();
        let err = h.end_object().unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Structure);
    }

    #[test]
    fn test_container_key_rejected() {
        let mut h = StreamHandler::new(Recorder::default());
        h.begin_object(Header::object(None)).unwrap();
        let err = h.begin_array(Header::array(None)).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Structure);
    }

    #[test]
    fn test_declared_sizes_enforced() {
        let mut h = StreamHandler::new(Recorder::default());
        h.begin_array(Header::array(Some(2))).unwrap();
        h.integer(1, subtype::NORMAL).unwrap();
        assert_eq!(h.end_array().unwrap_err().kind(), ErrorKind::Structure);

        let mut h = StreamHandler::new(Recorder::default());
        h.begin_array(Header::array(Some(0))).unwrap();
        assert!(h.integer(1, subtype::NORMAL).is_err());

        let mut h = StreamHandler::new(Recorder::default());
        h.begin_string(Header::string(Some(3))).unwrap();
        h.append_to_string(b"ab").unwrap();
        assert!(h.append_to_string(b"cd").is_err());
    }

    #[test]
    fn test_mismatched_ends() {
        let mut h = StreamHandler::new(Recorder::default());
        assert!(h.end_array().is_err());
        assert!(h.append_to_string(b"x").is_err());
        h.begin_array(Header::array(None)).unwrap();
        assert!(h.end_object().is_err());
        assert!(h.end().is_err());
        h.begin_string(Header::string(None)).unwrap();
        assert!(h.integer(3, subtype::NORMAL).is_err());
        h.append_to_string(b"x").unwrap();
        h.end_string().unwrap();
        h.end_array().unwrap();
        h.end().unwrap();
    }

    #[test]
    fn test_capabilities_enforced() {
        let recorder = Recorder {
            features: Features::REQUIRES_PREFIX_SIZES | Features::REQUIRES_BUFFERED_OBJECTS,
            ..Default::default()
        };
        let mut h = StreamHandler::new(recorder);
        assert_eq!(
            h.begin_array(Header::array(None)).unwrap_err().kind(),
            ErrorKind::Range
        );
        assert!(h.begin_string(Header::string(None)).is_err());
        assert!(h.begin_object(Header::object(Some(0))).is_err());
        let value = Value::object();
        h.begin_object(Header::of(&value)).unwrap();
        h.end_object().unwrap();
    }

    #[test]
    fn test_depth_limit() {
        let mut h = StreamHandler::with_limits(Recorder::default(), Limits::new().with_max_depth(2));
        h.begin_array(Header::array(None)).unwrap();
        h.begin_array(Header::array(None)).unwrap();
        h.begin_string(Header::string(None)).unwrap();
        h.end_string().unwrap();
        assert_eq!(
            h.begin_array(Header::array(None)).unwrap_err().kind(),
            ErrorKind::Range
        );
    }

    #[test]
    fn test_unsigned_narrows_when_it_fits() {
        let mut h = StreamHandler::new(Recorder::default());
        h.uinteger(9, subtype::NORMAL).unwrap();
        assert_eq!(h.hooks().events, vec!["int 9 key=false"]);
    }
}
