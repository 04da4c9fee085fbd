//! Storage engine module
//!
//! Provides the key-value map shared by every front end.
//! This module is independent of the wire protocol and of HTTP (loose coupling).

mod error;
mod memory;

pub use error::StoreError;
pub use memory::MemoryStore;

/// Storage engine trait
///
/// The capability set every engine offers to the RPC service. The in-memory
/// store is one implementation; a persistent engine would be another.
pub trait KeyValueStore: Send + Sync {
    /// Insert or overwrite a key
    ///
    /// Fails with `InvalidArgument` if the key or the value is empty.
    fn put(&self, key: String, value: String) -> Result<(), StoreError>;

    /// Read the current value of a key
    ///
    /// Fails with `InvalidArgument` if the key is empty and `NotFound` if
    /// no entry exists.
    fn get(&self, key: &str) -> Result<String, StoreError>;

    /// Remove a key
    ///
    /// Fails with `InvalidArgument` if the key is empty and `NotFound` if
    /// the key is absent at the time of the call.
    fn delete(&self, key: &str) -> Result<(), StoreError>;
}
