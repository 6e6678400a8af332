use std::collections::BTreeMap;

use crate::value::StoredValue;

/// Read/write/remove primitives of a key-value preference store.
///
/// The editor never assumes a concrete store; anything that can hand back its
/// full dictionary and accept single-key writes and removals will do. Errors
/// are the store's business: a file-backed store buffers writes in memory and
/// reports I/O failures when it is flushed.
pub trait Backend {
    fn read(&self) -> BTreeMap<String, StoredValue>;
    fn write(&mut self, key: &str, value: StoredValue);
    fn remove(&mut self, key: &str);
}

impl<B: Backend + ?Sized> Backend for &mut B {
    fn read(&self) -> BTreeMap<String, StoredValue> {
        (**self).read()
    }
    fn write(&mut self, key: &str, value: StoredValue) {
        (**self).write(key, value)
    }
    fn remove(&mut self, key: &str) {
        (**self).remove(key)
    }
}

impl<B: Backend + ?Sized> Backend for Box<B> {
    fn read(&self) -> BTreeMap<String, StoredValue> {
        (**self).read()
    }
    fn write(&mut self, key: &str, value: StoredValue) {
        (**self).write(key, value)
    }
    fn remove(&mut self, key: &str) {
        (**self).remove(key)
    }
}

/// A backend assembled from three closures, for hosts that expose their
/// store as plain functions.
pub struct FnBackend<R, W, D> {
    read: R,
    write: W,
    remove: D,
}

impl<R, W, D> FnBackend<R, W, D>
where
    R: Fn() -> BTreeMap<String, StoredValue>,
    W: FnMut(&str, StoredValue),
    D: FnMut(&str),
{
    pub fn new(read: R, write: W, remove: D) -> Self {
        Self {
            read,
            write,
            remove,
        }
    }
}

impl<R, W, D> Backend for FnBackend<R, W, D>
where
    R: Fn() -> BTreeMap<String, StoredValue>,
    W: FnMut(&str, StoredValue),
    D: FnMut(&str),
{
    fn read(&self) -> BTreeMap<String, StoredValue> {
        (self.read)()
    }
    fn write(&mut self, key: &str, value: StoredValue) {
        (self.write)(key, value)
    }
    fn remove(&mut self, key: &str) {
        (self.remove)(key)
    }
}

/// In-memory store. Iteration order of the source is irrelevant; the editor
/// sorts on refresh.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct MemoryStore {
    values: BTreeMap<String, StoredValue>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, key: &str) -> Option<&StoredValue> {
        self.values.get(key)
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    /// Replace the whole dictionary, as another process writing the same
    /// store would.
    pub fn replace_all(&mut self, values: BTreeMap<String, StoredValue>) {
        self.values = values;
    }
}

impl<K: Into<String>, V: Into<StoredValue>> FromIterator<(K, V)> for MemoryStore {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        Self {
            values: iter
                .into_iter()
                .map(|(k, v)| (k.into(), v.into()))
                .collect(),
        }
    }
}

impl Backend for MemoryStore {
    fn read(&self) -> BTreeMap<String, StoredValue> {
        self.values.clone()
    }
    fn write(&mut self, key: &str, value: StoredValue) {
        self.values.insert(key.to_string(), value);
    }
    fn remove(&mut self, key: &str) {
        self.values.remove(key);
    }
}
