//! Remote client for the RPC server

use super::StoreClient;
use crate::protocol::{Connection, ConnectionError, Request, Response, Status};
use async_trait::async_trait;
use parking_lot::Mutex;
use std::time::Duration;
use tokio::time::timeout;
use tracing::{debug, warn};

/// Idle connections kept for reuse
const MAX_IDLE_CONNECTIONS: usize = 16;

/// RPC client with a small pool of idle connections
///
/// Each call borrows one connection for a single request/response exchange.
/// Failed calls drop their connection and are never retried.
pub struct RpcClient {
    addr: String,
    timeout: Duration,
    idle: Mutex<Vec<Connection>>,
}

impl RpcClient {
    /// Create a client; connections are dialled lazily
    pub fn new(addr: impl Into<String>, timeout: Duration) -> Self {
        RpcClient {
            addr: addr.into(),
            timeout,
            idle: Mutex::new(Vec::new()),
        }
    }

    pub fn addr(&self) -> &str {
        &self.addr
    }

    async fn round_trip(&self, request: &Request) -> Result<(Connection, Response), ConnectionError> {
        let pooled = self.checkout();
        let mut connection = match pooled {
            Some(connection) => connection,
            None => {
                debug!("Dialling RPC server at {}", self.addr);
                Connection::connect(self.addr.as_str()).await?
            }
        };

        connection.write_request(request).await?;
        let response = connection.read_response().await?;
        Ok((connection, response))
    }

    /// Take a live idle connection, dropping any the server has closed
    ///
    /// Nothing has been sent on a discarded connection, so dialling a
    /// fresh one is not a retry.
    fn checkout(&self) -> Option<Connection> {
        let mut idle = self.idle.lock();
        while let Some(connection) = idle.pop() {
            if !connection.is_closed() {
                return Some(connection);
            }
            debug!("Discarding stale connection to {}", self.addr);
        }
        None
    }

    fn release(&self, connection: Connection) {
        let mut idle = self.idle.lock();
        if idle.len() < MAX_IDLE_CONNECTIONS {
            idle.push(connection);
        }
    }
}

#[async_trait]
impl StoreClient for RpcClient {
    async fn call(&self, request: Request) -> Response {
        let method = request.method();

        match timeout(self.timeout, self.round_trip(&request)).await {
            Ok(Ok((connection, response))) => {
                self.release(connection);
                response
            }
            Ok(Err(e)) => {
                warn!("{} call to {} failed: {}", method, self.addr, e);
                Err(Status::internal(format!("transport error: {}", e)))
            }
            Err(_) => {
                warn!("{} call to {} timed out after {:?}", method, self.addr, self.timeout);
                Err(Status::internal("deadline exceeded"))
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::protocol::Code;
    use crate::server::RpcServer;
    use crate::service::StoreService;
    use crate::store::MemoryStore;
    use std::sync::Arc;
    use tokio::net::TcpListener;
    use tokio::task::JoinHandle;
    use tokio_util::sync::CancellationToken;

    async fn spawn_server_at(addr: &str) -> (String, CancellationToken, JoinHandle<anyhow::Result<()>>) {
        let listener = TcpListener::bind(addr).await.unwrap();
        let addr = listener.local_addr().unwrap().to_string();
        let shutdown = CancellationToken::new();

        let server = RpcServer::new(StoreService::new(Arc::new(MemoryStore::new())));
        let handle = tokio::spawn(server.serve(listener, shutdown.clone()));

        (addr, shutdown, handle)
    }

    async fn spawn_server() -> (String, CancellationToken) {
        let (addr, shutdown, _handle) = spawn_server_at("127.0.0.1:0").await;
        (addr, shutdown)
    }

    #[tokio::test]
    async fn test_remote_put_get_delete() {
        let (addr, shutdown) = spawn_server().await;
        let client = RpcClient::new(addr, Duration::from_secs(5));

        client.put("mykey", "myvalue").await.unwrap();
        assert_eq!(client.get("mykey").await.unwrap(), "myvalue");

        client.put("mykey", "other").await.unwrap();
        assert_eq!(client.get("mykey").await.unwrap(), "other");

        client.delete("mykey").await.unwrap();
        assert_eq!(client.get("mykey").await.unwrap_err().code(), Code::NotFound);
        assert_eq!(client.delete("mykey").await.unwrap_err().code(), Code::NotFound);

        // Only one connection was ever needed
        assert_eq!(client.idle.lock().len(), 1);

        shutdown.cancel();
    }

    #[tokio::test]
    async fn test_remote_status_codes() {
        let (addr, shutdown) = spawn_server().await;
        let client = RpcClient::new(addr, Duration::from_secs(5));

        let status = client.put("k", "").await.unwrap_err();
        assert_eq!(status.code(), Code::InvalidArgument);
        assert_eq!(status.message(), "value cannot be empty");

        assert_eq!(client.get("").await.unwrap_err().code(), Code::InvalidArgument);

        shutdown.cancel();
    }

    #[tokio::test]
    async fn test_concurrent_calls() {
        let (addr, shutdown) = spawn_server().await;
        let client = Arc::new(RpcClient::new(addr, Duration::from_secs(5)));

        let handles: Vec<_> = (0..32)
            .map(|i| {
                let client = client.clone();
                tokio::spawn(async move {
                    let key = format!("key{}", i);
                    client.put(&key, "v").await.unwrap();
                    client.get(&key).await.unwrap()
                })
            })
            .collect();

        for handle in handles {
            assert_eq!(handle.await.unwrap(), "v");
        }
        assert!(client.idle.lock().len() <= MAX_IDLE_CONNECTIONS);

        shutdown.cancel();
    }

    #[tokio::test]
    async fn test_server_restart_redials_stale_connection() {
        let (addr, shutdown, handle) = spawn_server_at("127.0.0.1:0").await;
        let client = RpcClient::new(addr.clone(), Duration::from_secs(5));

        client.put("k", "v1").await.unwrap();
        assert_eq!(client.idle.lock().len(), 1);

        // The server closes the pooled connection on its way down
        shutdown.cancel();
        handle.await.unwrap().unwrap();
        tokio::time::sleep(Duration::from_millis(50)).await;

        let (_, shutdown, _handle) = spawn_server_at(&addr).await;

        client.put("k", "v2").await.unwrap();
        assert_eq!(client.get("k").await.unwrap(), "v2");
        assert_eq!(client.idle.lock().len(), 1);

        shutdown.cancel();
    }

    #[tokio::test]
    async fn test_unreachable_server_is_internal() {
        // Bind then drop to get a port nobody listens on
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap().to_string();
        drop(listener);

        let client = RpcClient::new(addr, Duration::from_secs(2));
        let status = client.get("k").await.unwrap_err();
        assert_eq!(status.code(), Code::Internal);
    }

    #[tokio::test]
    async fn test_silent_server_times_out() {
        // Accepts but never answers
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap().to_string();
        tokio::spawn(async move {
            let (_socket, _) = listener.accept().await.unwrap();
            std::future::pending::<()>().await;
        });

        let client = RpcClient::new(addr, Duration::from_millis(100));
        let status = client.get("k").await.unwrap_err();
        assert_eq!(status.code(), Code::Internal);
        assert_eq!(status.message(), "deadline exceeded");
    }
}
