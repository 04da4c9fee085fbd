//! Store clients
//!
//! The gateway talks to the store only through the [`StoreClient`] trait.
//! [`RpcClient`] reaches a remote RPC server; [`StoreService`] itself is an
//! in-process client for embedding and tests.

mod rpc;

pub use rpc::RpcClient;

use crate::protocol::{Reply, Request, Response, Status};
use crate::service::StoreService;
use async_trait::async_trait;

/// Client view of the store service
///
/// Implementors provide `call`; the typed operations are built on it and
/// pass server statuses through unchanged.
#[async_trait]
pub trait StoreClient: Send + Sync {
    /// Perform one request/response exchange
    async fn call(&self, request: Request) -> Response;

    async fn put(&self, key: &str, value: &str) -> Result<(), Status> {
        let request = Request::Put {
            key: key.to_string(),
            value: value.to_string(),
        };
        match self.call(request).await? {
            Reply::Put { .. } => Ok(()),
            other => Err(unexpected_reply(other)),
        }
    }

    async fn get(&self, key: &str) -> Result<String, Status> {
        match self.call(Request::Get { key: key.to_string() }).await? {
            Reply::Get { value } => Ok(value),
            other => Err(unexpected_reply(other)),
        }
    }

    async fn delete(&self, key: &str) -> Result<(), Status> {
        match self.call(Request::Delete { key: key.to_string() }).await? {
            Reply::Delete { success: true } => Ok(()),
            Reply::Delete { success: false } => Err(Status::internal("delete reported no success")),
            other => Err(unexpected_reply(other)),
        }
    }
}

fn unexpected_reply(reply: Reply) -> Status {
    Status::internal(format!("unexpected {} reply", reply.method()))
}

#[async_trait]
impl StoreClient for StoreService {
    async fn call(&self, request: Request) -> Response {
        self.handle(request)
    }
}
