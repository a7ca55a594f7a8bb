//! Encoded-size table for formats whose containers carry a byte-length prefix.
//!
//! Binn and BSON write a container's total size before its contents. Their
//! writers require buffered containers, build a [`SizeTable`] once for the
//! outermost container, and look every nested container up in it while
//! emitting. The same [`Layout`] drives both the table and the encoded-size
//! helpers, so the measuring pass and the emitting pass cannot disagree.

use crate::error::{Error, Result};
use crate::value::{Kind, Value};
use std::collections::HashMap;

/// Size rules of one wire format.
pub trait Layout {
    /// Encoded size of a non-container value as it appears inside a container.
    fn scalar_size(&self, value: &Value) -> Result<usize>;

    /// Bytes a container spends on its `index`-th child besides the child's
    /// own encoding: element names, keys, type tags.
    fn element_overhead(&self, parent: &Value, index: usize, key: Option<&Value>) -> Result<usize>;

    /// Total encoded size of `container` given the summed size of its
    /// children and their overheads.
    fn container_size(&self, container: &Value, payload: usize) -> Result<usize>;
}

enum Visit<'v> {
    Enter(&'v Value),
    Exit(&'v Value),
}

/// Exact encoded size of every container in one tree, keyed by node address.
///
/// The table borrows nothing; it is only meaningful while the measured tree
/// is alive and unmodified.
#[derive(Debug, Default, Clone)]
pub struct SizeTable {
    sizes: HashMap<usize, usize>,
    total: usize,
}

#[inline]
fn address(value: &Value) -> usize {
    value as *const Value as usize
}

impl SizeTable {
    /// Measures `root` in one post-order pass.
    pub fn build<L: Layout>(root: &Value, layout: &L) -> Result<Self> {
        let mut sizes = HashMap::new();
        let mut work = vec![Visit::Enter(root)];
        // running payload of each open container; the bottom slot is the root's parent
        let mut payloads = vec![0usize];
        while let Some(visit) = work.pop() {
            match visit {
                Visit::Enter(v) => match &v.kind {
                    Kind::Array(items) => {
                        let mut overhead = 0;
                        for index in 0..items.len() {
                            overhead += layout.element_overhead(v, index, None)?;
                        }
                        payloads.push(overhead);
                        work.push(Visit::Exit(v));
                        work.extend(items.iter().rev().map(Visit::Enter));
                    }
                    Kind::Object(map) => {
                        let mut overhead = 0;
                        for (index, key) in map.keys().enumerate() {
                            overhead += layout.element_overhead(v, index, Some(key))?;
                        }
                        payloads.push(overhead);
                        work.push(Visit::Exit(v));
                        work.extend(map.values().rev().map(Visit::Enter));
                    }
                    _ => {
                        let size = layout.scalar_size(v)?;
                        if let Some(slot) = payloads.last_mut() {
                            *slot += size;
                        }
                    }
                },
                Visit::Exit(v) => {
                    let payload = payloads.pop().unwrap_or(0);
                    let size = layout.container_size(v, payload)?;
                    sizes.insert(address(v), size);
                    if let Some(slot) = payloads.last_mut() {
                        *slot += size;
                    }
                }
            }
        }
        Ok(SizeTable {
            sizes,
            total: payloads.first().copied().unwrap_or(0),
        })
    }

    /// Encoded size of the measured root.
    #[must_use]
    pub fn total(&self) -> usize {
        self.total
    }

    #[must_use]
    pub fn get(&self, container: &Value) -> Option<usize> {
        self.sizes.get(&address(container)).copied()
    }

    /// Like [`get`](Self::get), failing for a container outside the table.
    pub fn size_of(&self, container: &Value) -> Result<usize> {
        self.get(container)
            .ok_or_else(|| Error::structure("container was not part of the measured value"))
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.sizes.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.sizes.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::value;

    /// Every scalar is one byte, every element costs one tag byte, every
    /// container adds a two-byte header.
    struct Toy;

    impl Layout for Toy {
        fn scalar_size(&self, _: &Value) -> Result<usize> {
            Ok(1)
        }
        fn element_overhead(&self, _: &Value, _: usize, key: Option<&Value>) -> Result<usize> {
            Ok(1 + usize::from(key.is_some()))
        }
        fn container_size(&self, _: &Value, payload: usize) -> Result<usize> {
            Ok(2 + payload)
        }
    }

    #[test]
    fn test_nested_sizes() {
        let v = value!({"a": [1, 2], "b": 3});
        let table = SizeTable::build(&v, &Toy).unwrap();
        let inner = v.get("a").unwrap();
        // [1, 2]: header 2 + tags 2 + scalars 2
        assert_eq!(table.get(inner), Some(6));
        // object: header 2 + (tag+key) * 2 + inner 6 + scalar 1
        assert_eq!(table.get(&v), Some(13));
        assert_eq!(table.total(), 13);
        assert_eq!(table.len(), 2);
    }

    #[test]
    fn test_scalar_root() {
        let table = SizeTable::build(&Value::from(5), &Toy).unwrap();
        assert_eq!(table.total(), 1);
        assert!(table.is_empty());
        assert!(table.size_of(&Value::array()).is_err());
    }
}
