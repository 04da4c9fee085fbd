//! Store service
//!
//! Routes incoming calls to the storage engine and turns engine errors
//! into RPC statuses. No validation of its own happens here: the engine
//! decides what is invalid, and its error identity is kept intact.

use crate::protocol::{Reply, Request, Response, Status};
use crate::store::KeyValueStore;
use std::sync::Arc;
use tracing::debug;

/// Status confirmation returned by a successful Put
pub const PUT_OK: &str = "OK";

/// RPC adapter over a storage engine
#[derive(Clone)]
pub struct StoreService {
    store: Arc<dyn KeyValueStore>,
}

impl StoreService {
    /// Create a service over an explicitly owned store
    pub fn new(store: Arc<dyn KeyValueStore>) -> Self {
        StoreService { store }
    }

    /// Handle one call
    pub fn handle(&self, request: Request) -> Response {
        let method = request.method();
        debug!("Handling {} for key {:?}", method, request.key());

        let response = match request {
            Request::Put { key, value } => self.store.put(key, value).map(|()| Reply::Put {
                status: PUT_OK.to_string(),
            }),
            Request::Get { key } => self.store.get(&key).map(|value| Reply::Get { value }),
            Request::Delete { key } => self
                .store
                .delete(&key)
                .map(|()| Reply::Delete { success: true }),
        };

        response.map_err(|err| {
            debug!("{} failed: {}", method, err);
            Status::from(err)
        })
    }
}
