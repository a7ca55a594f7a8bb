//! Tree traversal driver, tree builder and the parser-to-writer bridge.
//!
//! - [`emit`] walks a [`Value`] and pushes it through a [`StreamHandler`]
//! - [`Builder`] is a [`Hooks`] implementation that rebuilds a [`Value`]
//! - [`convert`] connects any [`Parse`] implementation to any writer,
//!   materializing the document first when the writer needs more than the
//!   parser can promise
//!
//! None of them recurse, so nesting depth is bounded by memory (and by
//! [`Limits`]) rather than by the call stack.

use crate::error::Result;
use crate::io::CHUNK_SIZE;
use crate::options::Limits;
use crate::stream::{Features, Header, Hooks, Nesting, StreamHandler};
use crate::value::{Kind, Subtype, Value};
use crate::ObjectMap;
use log::debug;
use std::mem;

enum Step<'v> {
    Enter(&'v Value),
    ExitArray,
    ExitObject,
}

/// Pushes `value` through `handler`, containers with their materialized
/// value and exact size in the header.
pub fn emit<H: Hooks>(value: &Value, handler: &mut StreamHandler<H>) -> Result<()> {
    let mut stack = vec![Step::Enter(value)];
    while let Some(step) = stack.pop() {
        match step {
            Step::Enter(v) => match &v.kind {
                Kind::Array(items) => {
                    handler.begin_array(Header::of(v))?;
                    stack.push(Step::ExitArray);
                    stack.extend(items.iter().rev().map(Step::Enter));
                }
                Kind::Object(map) => {
                    handler.begin_object(Header::of(v))?;
                    stack.push(Step::ExitObject);
                    for (key, item) in map.iter().rev() {
                        stack.push(Step::Enter(item));
                        stack.push(Step::Enter(key));
                    }
                }
                Kind::Str(_) => handler.write_string(v)?,
                _ => handler.write_scalar(v)?,
            },
            Step::ExitArray => handler.end_array()?,
            Step::ExitObject => handler.end_object()?,
        }
    }
    Ok(())
}

/// Writes one complete document: `begin`, the value, `end`.
pub fn write_value<H: Hooks>(value: &Value, handler: &mut StreamHandler<H>) -> Result<()> {
    handler.begin()?;
    handler.write(value)?;
    handler.end()
}

/// Rebuilds a [`Value`] from engine events.
///
/// # Examples
///
/// ```rust
/// use valuestream::stream::{Header, StreamHandler};
/// use valuestream::tree::Builder;
/// use valuestream::value;
///
/// let mut handler = StreamHandler::new(Builder::new());
/// handler.begin_object(Header::object(None)).unwrap();
/// handler.string(b"a", 0).unwrap();
/// handler.integer(1, 0).unwrap();
/// handler.string(b"a", 0).unwrap();
/// handler.integer(2, 0).unwrap();
/// handler.end_object().unwrap();
///
/// // duplicate keys: the last write wins
/// assert_eq!(handler.into_hooks().finish(), value!({"a": 2}));
/// ```
#[derive(Debug, Default)]
pub struct Builder {
    /// Open containers, innermost last.
    containers: Vec<Value>,
    /// Per open object: the key whose value is pending.
    keys: Vec<Option<Value>>,
    string: Vec<u8>,
    string_subtype: Subtype,
    result: Option<Value>,
}

impl Builder {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// The finished value; `Null` when nothing was written.
    #[must_use]
    pub fn finish(self) -> Value {
        self.result.unwrap_or_default()
    }

    fn attach(&mut self, value: Value) {
        let Some(parent) = self.containers.last_mut() else {
            self.result = Some(value);
            return;
        };
        match &mut parent.kind {
            Kind::Array(items) => items.push(value),
            Kind::Object(map) => {
                let pending = self.keys.last_mut().and_then(Option::take);
                match pending {
                    Some(key) => {
                        map.insert(key, value);
                    }
                    None => {
                        if let Some(slot) = self.keys.last_mut() {
                            *slot = Some(value);
                        }
                    }
                }
            }
            // only containers are ever pushed
            _ => {}
        }
    }

    fn close(&mut self) {
        if let Some(value) = self.containers.pop() {
            if value.is_object() {
                self.keys.pop();
            }
            self.attach(value);
        }
    }
}

impl Hooks for Builder {
    fn null_(&mut self, _: &Nesting, header: &Header<'_>) -> Result<()> {
        self.attach(Value::tagged(Kind::Null, header.subtype));
        Ok(())
    }

    fn bool_(&mut self, _: &Nesting, header: &Header<'_>, value: bool) -> Result<()> {
        self.attach(Value::tagged(Kind::Bool(value), header.subtype));
        Ok(())
    }

    fn integer_(&mut self, _: &Nesting, header: &Header<'_>, value: i64) -> Result<()> {
        self.attach(Value::tagged(Kind::Int(value), header.subtype));
        Ok(())
    }

    fn uinteger_(&mut self, _: &Nesting, header: &Header<'_>, value: u64) -> Result<()> {
        self.attach(Value::unsigned(value).with_subtype(header.subtype));
        Ok(())
    }

    fn real_(&mut self, _: &Nesting, header: &Header<'_>, value: f64) -> Result<()> {
        self.attach(Value::tagged(Kind::Real(value), header.subtype));
        Ok(())
    }

    fn begin_string_(&mut self, _: &Nesting, header: &Header<'_>) -> Result<()> {
        self.string = Vec::with_capacity(header.size.unwrap_or(0).min(CHUNK_SIZE));
        self.string_subtype = header.subtype;
        Ok(())
    }

    fn string_data_(&mut self, _: &Nesting, data: &[u8]) -> Result<()> {
        self.string.extend_from_slice(data);
        Ok(())
    }

    fn end_string_(&mut self, _: &Nesting) -> Result<()> {
        let bytes = mem::take(&mut self.string);
        self.attach(Value::tagged(Kind::Str(bytes), self.string_subtype));
        Ok(())
    }

    fn begin_array_(&mut self, _: &Nesting, header: &Header<'_>) -> Result<()> {
        let capacity = header.size.unwrap_or(0).min(CHUNK_SIZE);
        self.containers.push(Value::tagged(
            Kind::Array(Vec::with_capacity(capacity)),
            header.subtype,
        ));
        Ok(())
    }

    fn end_array_(&mut self, _: &Nesting) -> Result<()> {
        self.close();
        Ok(())
    }

    fn begin_object_(&mut self, _: &Nesting, header: &Header<'_>) -> Result<()> {
        let capacity = header.size.unwrap_or(0).min(CHUNK_SIZE);
        self.containers.push(Value::tagged(
            Kind::Object(ObjectMap::with_capacity(capacity)),
            header.subtype,
        ));
        self.keys.push(None);
        Ok(())
    }

    fn end_object_(&mut self, _: &Nesting) -> Result<()> {
        self.close();
        Ok(())
    }
}

/// A format reader that drives the event engine.
pub trait Parse {
    /// Header information this parser always supplies. Writers requiring
    /// anything else get a materialized tree instead.
    fn provides(&self) -> Features {
        Features::empty()
    }

    /// Reads exactly one value from the input into `handler`, then checks
    /// that nothing but permitted trailing bytes remain.
    fn write_one<H: Hooks>(&mut self, handler: &mut StreamHandler<H>) -> Result<()>;
}

/// Parses a complete document into a [`Value`].
pub fn build<P: Parse>(parser: &mut P, limits: &Limits) -> Result<Value> {
    let mut handler = StreamHandler::with_limits(Builder::new(), limits.clone());
    handler.begin()?;
    parser.write_one(&mut handler)?;
    handler.end()?;
    Ok(handler.into_hooks().finish())
}

/// Feeds one document from `parser` into `writer` and returns the writer.
///
/// Events stream straight through when the parser provides what the writer
/// requires; otherwise the document is built in memory and emitted from the
/// tree.
///
/// # Examples
///
/// ```rust
/// use valuestream::{json, msgpack, tree, Limits};
///
/// let mut parser = json::Parser::new(r#"{"a":[1,2]}"#);
/// let writer = tree::convert(&mut parser, msgpack::Writer::new(Vec::new()), &Limits::default()).unwrap();
/// assert_eq!(writer.into_inner(), b"\x81\xa1a\x92\x01\x02");
/// ```
pub fn convert<P: Parse, H: Hooks>(parser: &mut P, writer: H, limits: &Limits) -> Result<H> {
    let missing = writer.features().difference(parser.provides());
    let mut handler = StreamHandler::with_limits(writer, limits.clone());
    if missing.is_empty() {
        handler.begin()?;
        parser.write_one(&mut handler)?;
        handler.end()?;
    } else {
        debug!("buffering document, writer needs {:?}", missing);
        let value = build(parser, limits)?;
        write_value(&value, &mut handler)?;
    }
    Ok(handler.into_hooks())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::value;

    #[test]
    fn test_emit_into_builder_round_trips() {
        let original = value!({
            "a": [1, 2.5, null, true],
            "b": {"c": "d"},
            "e": []
        });
        let mut handler = StreamHandler::new(Builder::new());
        write_value(&original, &mut handler).unwrap();
        assert_eq!(handler.into_hooks().finish(), original);
    }

    #[test]
    fn test_empty_stream_is_null() {
        let mut handler = StreamHandler::new(Builder::new());
        handler.begin().unwrap();
        handler.end().unwrap();
        assert!(handler.into_hooks().finish().is_null());
    }

    #[test]
    fn test_subtypes_and_non_string_keys_survive() {
        let mut map = ObjectMap::new();
        map.insert(7, Value::blob(vec![0, 1, 2]));
        map.insert(Value::from(-1), Value::from(u64::MAX));
        let original = Value::from(map).with_subtype(crate::value::subtype::MAP);

        let mut handler = StreamHandler::new(Builder::new());
        write_value(&original, &mut handler).unwrap();
        let rebuilt = handler.into_hooks().finish();
        assert_eq!(rebuilt, original);
        assert_eq!(rebuilt.subtype, crate::value::subtype::MAP);
    }

    #[test]
    fn test_deep_emit_and_build() {
        let mut v = Value::from(1);
        for _ in 0..100_000 {
            v = Value::from(vec![v]);
        }
        let mut handler = StreamHandler::with_limits(Builder::new(), Limits::unlimited());
        write_value(&v, &mut handler).unwrap();
        let rebuilt = handler.into_hooks().finish();

        let mut depth = 0;
        let mut cursor = &rebuilt;
        while let Some(items) = cursor.as_array() {
            depth += 1;
            cursor = &items[0];
        }
        assert_eq!(depth, 100_000);
    }

    #[test]
    fn test_default_depth_limit_applies_to_emit() {
        let mut v = Value::null();
        for _ in 0..(Limits::default().max_depth + 1) {
            v = Value::from(vec![v]);
        }
        let mut handler = StreamHandler::new(Builder::new());
        let err = write_value(&v, &mut handler).unwrap_err();
        assert_eq!(err.kind(), crate::ErrorKind::Range);
    }
}
