//! kvgate - an in-memory key-value store with two front ends
//!
//! The store is reachable over a binary RPC protocol and through an
//! HTTP/JSON gateway that forwards every request to the RPC service:
//! - `store` owns the data and its locking
//! - `service` adapts the store to RPC calls and statuses
//! - `server` and `client` carry those calls over TCP
//! - `web` translates HTTP requests into client calls

pub mod client;
pub mod config;
pub mod protocol;
pub mod server;
pub mod service;
pub mod store;
pub mod web;

/// Re-export commonly used types
pub use client::{RpcClient, StoreClient};
pub use config::{Config, Role};
pub use protocol::{Code, Status};
pub use server::RpcServer;
pub use service::StoreService;
pub use store::{KeyValueStore, MemoryStore, StoreError};
