//! In-memory storage implementation

use super::{KeyValueStore, StoreError};
use parking_lot::RwLock;
use siphasher::sip::SipHasher13;
use std::collections::HashMap;
use std::hash::BuildHasherDefault;
use tracing::debug;

/// Type alias for our hash map with SipHasher
type StoreMap = HashMap<String, String, BuildHasherDefault<SipHasher13>>;

/// In-memory key-value store
///
/// A single map behind one reader/writer lock. Gets share the lock,
/// Puts and Deletes take it exclusively, so mutations are serialized
/// against each other and against reads.
pub struct MemoryStore {
    store: RwLock<StoreMap>,
}

impl MemoryStore {
    /// Create a new memory store with default capacity
    pub fn new() -> Self {
        Self::with_capacity(1024)
    }

    /// Create a new memory store with specified initial capacity
    pub fn with_capacity(capacity: usize) -> Self {
        MemoryStore {
            store: RwLock::new(HashMap::with_capacity_and_hasher(
                capacity,
                BuildHasherDefault::<SipHasher13>::default(),
            )),
        }
    }

    /// Number of entries currently stored
    pub fn len(&self) -> usize {
        self.store.read().len()
    }

    /// Check if the store is empty
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl Default for MemoryStore {
    fn default() -> Self {
        Self::new()
    }
}

impl KeyValueStore for MemoryStore {
    fn put(&self, key: String, value: String) -> Result<(), StoreError> {
        if key.is_empty() {
            return Err(StoreError::KEY_REQUIRED);
        }
        if value.is_empty() {
            return Err(StoreError::EMPTY_VALUE);
        }

        debug!("PUT {} ({} bytes)", key, value.len());
        self.store.write().insert(key, value);
        Ok(())
    }

    fn get(&self, key: &str) -> Result<String, StoreError> {
        if key.is_empty() {
            return Err(StoreError::KEY_REQUIRED);
        }

        debug!("GET {}", key);
        self.store
            .read()
            .get(key)
            .cloned()
            .ok_or(StoreError::NotFound)
    }

    fn delete(&self, key: &str) -> Result<(), StoreError> {
        if key.is_empty() {
            return Err(StoreError::KEY_REQUIRED);
        }

        debug!("DELETE {}", key);
        // Existence check and removal under one write guard
        match self.store.write().remove(key) {
            Some(_) => Ok(()),
            None => Err(StoreError::NotFound),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use std::thread;
    use tokio_test::{assert_err, assert_ok};

    #[test]
    fn test_put_get() {
        let store = MemoryStore::new();
        store.put("key1".into(), "value1".into()).unwrap();

        assert_eq!(store.get("key1").unwrap(), "value1");
    }

    #[test]
    fn test_get_missing() {
        let store = MemoryStore::new();
        assert_eq!(store.get("nope"), Err(StoreError::NotFound));
    }

    #[test]
    fn test_put_overwrites() {
        let store = MemoryStore::new();
        store.put("key1".into(), "v1".into()).unwrap();
        store.put("key1".into(), "v2".into()).unwrap();

        assert_eq!(store.get("key1").unwrap(), "v2");
        assert_eq!(store.len(), 1);
    }

    #[test]
    fn test_delete() {
        let store = MemoryStore::new();
        store.put("key1".into(), "value1".into()).unwrap();

        assert_ok!(store.delete("key1"));
        assert_eq!(store.get("key1"), Err(StoreError::NotFound));
        assert!(store.is_empty());
    }

    #[test]
    fn test_delete_missing_is_not_found() {
        let store = MemoryStore::new();
        assert_eq!(store.delete("ghost"), Err(StoreError::NotFound));

        store.put("key1".into(), "value1".into()).unwrap();
        store.delete("key1").unwrap();
        assert_eq!(store.delete("key1"), Err(StoreError::NotFound));
    }

    #[test]
    fn test_empty_arguments() {
        let store = MemoryStore::new();

        assert_eq!(
            store.put(String::new(), "v".into()),
            Err(StoreError::InvalidArgument("key is required"))
        );
        assert_eq!(
            store.put("k".into(), String::new()),
            Err(StoreError::InvalidArgument("value cannot be empty"))
        );
        assert!(store.is_empty());

        assert_eq!(assert_err!(store.get("")), StoreError::KEY_REQUIRED);
        assert_eq!(assert_err!(store.delete("")), StoreError::KEY_REQUIRED);
    }

    #[test]
    fn test_rejected_put_keeps_old_value() {
        let store = MemoryStore::new();
        store.put("k".into(), "old".into()).unwrap();

        assert_err!(store.put("k".into(), String::new()));
        assert_eq!(store.get("k").unwrap(), "old");
    }

    #[test]
    fn test_concurrent_puts_same_key() {
        for _ in 0..50 {
            let store = Arc::new(MemoryStore::new());

            let handles: Vec<_> = ["a", "b"]
                .into_iter()
                .map(|v| {
                    let store = Arc::clone(&store);
                    thread::spawn(move || store.put("k".into(), v.repeat(4096)).unwrap())
                })
                .collect();
            for h in handles {
                h.join().unwrap();
            }

            let value = store.get("k").unwrap();
            assert!(value == "a".repeat(4096) || value == "b".repeat(4096));
        }
    }

    #[test]
    fn test_concurrent_readers_and_writers() {
        let store = Arc::new(MemoryStore::new());
        store.put("shared".into(), "x".repeat(64)).unwrap();

        let writers: Vec<_> = (0..4)
            .map(|i| {
                let store = Arc::clone(&store);
                thread::spawn(move || {
                    let fill = char::from(b'a' + i as u8).to_string().repeat(64);
                    for n in 0..200 {
                        store.put("shared".into(), fill.clone()).unwrap();
                        store.put(format!("w{}-{}", i, n), "v".into()).unwrap();
                    }
                })
            })
            .collect();

        let readers: Vec<_> = (0..4)
            .map(|_| {
                let store = Arc::clone(&store);
                thread::spawn(move || {
                    for _ in 0..200 {
                        let value = store.get("shared").unwrap();
                        let first = value.chars().next().unwrap();
                        assert_eq!(value.len(), 64);
                        assert!(value.chars().all(|c| c == first));
                    }
                })
            })
            .collect();

        for h in writers.into_iter().chain(readers) {
            h.join().unwrap();
        }

        assert_eq!(store.len(), 1 + 4 * 200);
    }
}
