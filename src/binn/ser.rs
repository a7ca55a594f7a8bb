//! Binn writer.

use super::*;
use crate::stream::{Features, Header, Hooks, Nesting};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum StringMode {
    Text,
    Blob,
    Key,
}

#[derive(Debug)]
struct Open {
    container: u8,
    start: usize,
    expected: usize,
}

/// Writes Binn into a [`Sink`].
///
/// Containers must arrive with their complete value in the header; the
/// outermost one is measured once and every nested container is checked
/// against that measurement when it closes.
#[derive(Debug)]
pub struct Writer<S> {
    sink: S,
    table: SizeTable,
    open: Vec<Open>,
    mode: StringMode,
}

impl<S: Sink> Writer<S> {
    pub fn new(sink: S) -> Self {
        Writer {
            sink,
            table: SizeTable::default(),
            open: Vec::new(),
            mode: StringMode::Text,
        }
    }

    pub fn into_inner(self) -> S {
        self.sink
    }

    /// Type of the container whose key is being written, if any.
    fn keyed(&self, nesting: &Nesting) -> Option<u8> {
        if nesting.expects_key() {
            self.open.last().map(|open| open.container)
        } else {
            None
        }
    }

    fn scalar_key(&self, nesting: &Nesting, header: &Header<'_>) -> Result<()> {
        match self.keyed(nesting) {
            Some(_) => Err(Error::structure(format!(
                "{} cannot be a binn key",
                header.value_type
            ))),
            None => Ok(()),
        }
    }

    fn begin_container(&mut self, header: &Header<'_>) -> Result<()> {
        let value = header
            .value
            .ok_or_else(|| Error::capability("binn containers are written from complete values"))?;
        if self.open.is_empty() {
            self.table = SizeTable::build(value, &BinnLayout)?;
        }
        let size = self.table.size_of(value)?;
        let container = container_type(value);
        let start = self.sink.written();
        self.sink.put(container)?;
        write_size(&mut self.sink, size)?;
        write_size(&mut self.sink, header.size.unwrap_or(0))?;
        self.open.push(Open {
            container,
            start,
            expected: size,
        });
        Ok(())
    }

    fn end_container(&mut self) -> Result<()> {
        let open = self
            .open
            .pop()
            .ok_or_else(|| Error::structure("end of a binn container that was never begun"))?;
        let actual = self.sink.written() - open.start;
        if actual != open.expected {
            return Err(Error::structure(format!(
                "binn container measured at {} bytes but {} were written",
                open.expected, actual
            )));
        }
        if self.open.is_empty() {
            self.table = SizeTable::default();
        }
        Ok(())
    }
}

impl<S: Sink> Hooks for Writer<S> {
    fn features(&self) -> Features {
        Features::REQUIRES_BUFFERED_ARRAYS
            | Features::REQUIRES_BUFFERED_OBJECTS
            | Features::REQUIRES_PREFIX_STRING_SIZE
    }

    fn null_(&mut self, nesting: &Nesting, header: &Header<'_>) -> Result<()> {
        self.scalar_key(nesting, header)?;
        self.sink.put(NULL)
    }

    fn bool_(&mut self, nesting: &Nesting, header: &Header<'_>, value: bool) -> Result<()> {
        self.scalar_key(nesting, header)?;
        self.sink.put(if value { TRUE } else { FALSE })
    }

    fn integer_(&mut self, nesting: &Nesting, _: &Header<'_>, value: i64) -> Result<()> {
        match self.keyed(nesting) {
            Some(MAP) => {
                let id = map_key(&Value::from(value))?;
                self.sink.write_all(&id.to_be_bytes())
            }
            Some(_) => Err(Error::structure("binn object keys must be strings")),
            None => write_int(&mut self.sink, value),
        }
    }

    fn uinteger_(&mut self, nesting: &Nesting, header: &Header<'_>, value: u64) -> Result<()> {
        self.scalar_key(nesting, header)?;
        write_uint(&mut self.sink, value)
    }

    fn real_(&mut self, nesting: &Nesting, header: &Header<'_>, value: f64) -> Result<()> {
        self.scalar_key(nesting, header)?;
        write_real(&mut self.sink, value)
    }

    fn begin_string_(&mut self, nesting: &Nesting, header: &Header<'_>) -> Result<()> {
        let len = header.size.unwrap_or(0);
        match self.keyed(nesting) {
            Some(OBJECT) => {
                self.mode = StringMode::Key;
                let len = object_key_len(len)?;
                self.sink.put(len)
            }
            Some(_) => Err(Error::structure("binn map keys must be 32-bit integers")),
            None => {
                self.mode = if string_type(header.subtype) == BLOB {
                    StringMode::Blob
                } else {
                    StringMode::Text
                };
                write_string_header(&mut self.sink, header.subtype, len)
            }
        }
    }

    fn string_data_(&mut self, _: &Nesting, data: &[u8]) -> Result<()> {
        self.sink.write_all(data)
    }

    fn end_string_(&mut self, _: &Nesting) -> Result<()> {
        match self.mode {
            StringMode::Text => self.sink.put(0),
            StringMode::Blob | StringMode::Key => Ok(()),
        }
    }

    fn begin_array_(&mut self, _: &Nesting, header: &Header<'_>) -> Result<()> {
        self.begin_container(header)
    }

    fn end_array_(&mut self, _: &Nesting) -> Result<()> {
        self.end_container()
    }

    fn begin_object_(&mut self, _: &Nesting, header: &Header<'_>) -> Result<()> {
        self.begin_container(header)
    }

    fn end_object_(&mut self, _: &Nesting) -> Result<()> {
        self.end_container()
    }
}
