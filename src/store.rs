use std::collections::HashMap;
use std::sync::{Arc, RwLock};
use std::time::SystemTime;

use bytes::Bytes;

use crate::frame::Frame;

/// A scalar payload held in the keyspace.
///
/// Only `Bytes` is produced by the supported write path; `Int` keeps the
/// value model symmetric with the wire protocol's `:<n>\r\n` replies.
#[derive(Clone, Debug, PartialEq)]
pub enum Value {
    Bytes(Bytes),
    Int(i64),
}

impl Value {
    /// Wire form of this value: `$<len>\r\n<bytes>\r\n` or `:<n>\r\n`.
    pub fn serialize(&self) -> Vec<u8> {
        Frame::from(self.clone()).serialize()
    }
}

impl From<Value> for Frame {
    fn from(value: Value) -> Self {
        match value {
            Value::Bytes(bytes) => Frame::Bulk(bytes),
            Value::Int(n) => Frame::Integer(n),
        }
    }
}

/// One keyspace entry: a payload plus an optional wall-clock expiry.
///
/// No supported command sets an expiry yet; readers still honor one if it is
/// present (see [`Record::is_expired`]).
#[derive(Clone, Debug, PartialEq)]
pub struct Record {
    pub value: Value,
    pub expires_at: Option<SystemTime>,
}

impl Record {
    pub fn new(value: Value) -> Record {
        Record {
            value,
            expires_at: None,
        }
    }

    pub fn is_expired(&self) -> bool {
        self.expires_at
            .is_some_and(|deadline| SystemTime::now() > deadline)
    }
}

/// The shared keyspace: binary-safe keys mapped to scalar records.
///
/// Cloning is cheap and every clone refers to the same underlying map.
/// Concurrent readers are permitted; writers are exclusive. Keys and
/// payloads are owned, so the map never aliases a network buffer, and the
/// `Bytes` payload handed out by [`get`](Store::get) stays valid after the
/// read lock is released.
#[derive(Clone)]
pub struct Store {
    inner: Arc<RwLock<HashMap<Bytes, Record>>>,
}

impl Store {
    pub fn new() -> Store {
        Store {
            inner: Arc::new(RwLock::new(HashMap::new())),
        }
    }

    /// Returns a snapshot of the record stored at `key`.
    ///
    /// Expiry is not consulted here; callers decide what an expired record
    /// means for them.
    pub fn get(&self, key: &Bytes) -> Option<Record> {
        self.inner.read().unwrap().get(key).cloned()
    }

    /// Inserts or replaces the record at `key`. The replacement is atomic:
    /// no reader ever observes a partial update.
    pub fn set(&self, key: Bytes, record: Record) {
        self.inner.write().unwrap().insert(key, record);
    }

    /// Removes the record at `key`, reporting whether one was present.
    pub fn delete(&self, key: &Bytes) -> bool {
        self.inner.write().unwrap().remove(key).is_some()
    }

    /// Applies `f` to the existing record under the write lock. Returns
    /// whether the key existed.
    pub fn update<F>(&self, key: &Bytes, f: F) -> bool
    where
        F: FnOnce(&mut Record),
    {
        match self.inner.write().unwrap().get_mut(key) {
            Some(record) => {
                f(record);
                true
            }
            None => false,
        }
    }
}

impl Default for Store {
    fn default() -> Self {
        Self::new()
    }
}
