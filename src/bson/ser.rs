//! BSON writer.

use super::*;
use crate::io::Sink;
use crate::stream::{ContainerKind, Features, Header, Hooks, Nesting};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum StringMode {
    Text,
    Raw,
    Name,
}

#[derive(Debug)]
struct Open {
    start: usize,
    expected: usize,
}

/// Writes BSON into a [`Sink`].
///
/// Element names precede the type byte's payload but follow the type
/// byte itself, so an object key is held back until its value arrives.
#[derive(Debug)]
pub struct Writer<S> {
    sink: S,
    table: SizeTable,
    open: Vec<Open>,
    name: Vec<u8>,
    mode: StringMode,
}

impl<S: Sink> Writer<S> {
    pub fn new(sink: S) -> Self {
        Writer {
            sink,
            table: SizeTable::default(),
            open: Vec::new(),
            name: Vec::new(),
            mode: StringMode::Text,
        }
    }

    pub fn into_inner(self) -> S {
        self.sink
    }

    fn reject_key(nesting: &Nesting, header: &Header<'_>) -> Result<()> {
        if nesting.expects_key() {
            return Err(Error::structure(format!(
                "{} cannot be a bson element name",
                header.value_type
            )));
        }
        Ok(())
    }

    /// Type byte and name of the element about to be written.
    fn element(&mut self, nesting: &Nesting, ty: u8) -> Result<()> {
        let frame = nesting
            .top()
            .ok_or_else(|| Error::range(FORMAT, "a bson document must be an object"))?;
        self.sink.put(ty)?;
        match frame.kind {
            ContainerKind::Array => self.sink.write_all(frame.items.to_string().as_bytes())?,
            _ => self.sink.write_all(&self.name)?,
        }
        self.sink.put(0)
    }

    fn begin_document(&mut self, nesting: &Nesting, header: &Header<'_>, ty: u8) -> Result<()> {
        let value = header
            .value
            .ok_or_else(|| Error::capability("bson documents are written from complete values"))?;
        if nesting.depth() == 0 {
            if ty != DOCUMENT {
                return Err(Error::range(FORMAT, "a bson document must be an object"));
            }
            self.table = SizeTable::build(value, &BsonLayout)?;
        } else {
            self.element(nesting, ty)?;
        }
        let size = self.table.size_of(value)?;
        let start = self.sink.written();
        self.sink.write_all(&document_size(size)?.to_le_bytes())?;
        self.open.push(Open {
            start,
            expected: size,
        });
        Ok(())
    }

    fn end_document(&mut self) -> Result<()> {
        self.sink.put(0)?;
        let open = self
            .open
            .pop()
            .ok_or_else(|| Error::structure("end of a bson document that was never begun"))?;
        let actual = self.sink.written() - open.start;
        if actual != open.expected {
            return Err(Error::structure(format!(
                "bson document measured at {} bytes but {} were written",
                open.expected, actual
            )));
        }
        if self.open.is_empty() {
            self.table = SizeTable::default();
        }
        Ok(())
    }

    fn write_integer(&mut self, ty: u8, n: i64) -> Result<()> {
        match ty {
            INT32 => self.sink.write_all(&(n as i32).to_le_bytes()),
            TIMESTAMP_TYPE => self.sink.write_all(&(n as u64).to_le_bytes()),
            _ => self.sink.write_all(&n.to_le_bytes()),
        }
    }
}

impl<S: Sink> Hooks for Writer<S> {
    fn features(&self) -> Features {
        Features::REQUIRES_BUFFERED_ARRAYS
            | Features::REQUIRES_BUFFERED_OBJECTS
            | Features::REQUIRES_PREFIX_STRING_SIZE
    }

    fn null_(&mut self, nesting: &Nesting, header: &Header<'_>) -> Result<()> {
        Self::reject_key(nesting, header)?;
        self.element(nesting, NULL)
    }

    fn bool_(&mut self, nesting: &Nesting, header: &Header<'_>, value: bool) -> Result<()> {
        Self::reject_key(nesting, header)?;
        self.element(nesting, BOOLEAN)?;
        self.sink.put(u8::from(value))
    }

    fn integer_(&mut self, nesting: &Nesting, header: &Header<'_>, value: i64) -> Result<()> {
        Self::reject_key(nesting, header)?;
        let ty = int_type(value, header.subtype)?;
        self.element(nesting, ty)?;
        self.write_integer(ty, value)
    }

    fn uinteger_(&mut self, nesting: &Nesting, header: &Header<'_>, value: u64) -> Result<()> {
        Self::reject_key(nesting, header)?;
        let ty = uint_type(value, header.subtype)?;
        self.element(nesting, ty)?;
        if ty == TIMESTAMP_TYPE {
            self.sink.write_all(&value.to_le_bytes())
        } else {
            // uint_type only picks another type when the value fits i64
            self.write_integer(ty, value as i64)
        }
    }

    fn real_(&mut self, nesting: &Nesting, header: &Header<'_>, value: f64) -> Result<()> {
        Self::reject_key(nesting, header)?;
        self.element(nesting, DOUBLE)?;
        self.sink.write_all(&value.to_le_bytes())
    }

    fn begin_string_(&mut self, nesting: &Nesting, header: &Header<'_>) -> Result<()> {
        let len = header.size.unwrap_or(0);
        if nesting.expects_key() {
            self.mode = StringMode::Name;
            self.name.clear();
            return Ok(());
        }
        let ty = string_type(header.subtype, len)?;
        self.element(nesting, ty)?;
        match ty {
            OBJECT_ID_TYPE => self.mode = StringMode::Raw,
            BINARY => {
                self.mode = StringMode::Raw;
                self.sink.write_all(&document_size(len)?.to_le_bytes())?;
                self.sink.put(GENERIC_BINARY)?;
            }
            _ => {
                self.mode = StringMode::Text;
                self.sink.write_all(&document_size(len + 1)?.to_le_bytes())?;
            }
        }
        Ok(())
    }

    fn string_data_(&mut self, _: &Nesting, data: &[u8]) -> Result<()> {
        match self.mode {
            StringMode::Name => {
                self.name.extend_from_slice(data);
                Ok(())
            }
            StringMode::Text | StringMode::Raw => self.sink.write_all(data),
        }
    }

    fn end_string_(&mut self, _: &Nesting) -> Result<()> {
        match self.mode {
            StringMode::Name => check_name(&self.name),
            StringMode::Text => self.sink.put(0),
            StringMode::Raw => Ok(()),
        }
    }

    fn begin_array_(&mut self, nesting: &Nesting, header: &Header<'_>) -> Result<()> {
        self.begin_document(nesting, header, ARRAY)
    }

    fn end_array_(&mut self, _: &Nesting) -> Result<()> {
        self.end_document()
    }

    fn begin_object_(&mut self, nesting: &Nesting, header: &Header<'_>) -> Result<()> {
        self.begin_document(nesting, header, DOCUMENT)
    }

    fn end_object_(&mut self, _: &Nesting) -> Result<()> {
        self.end_document()
    }
}
