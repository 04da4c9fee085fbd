//! RPC server module
//!
//! Accepts TCP connections and serves store calls on them.
//! This module is responsible for the accept loop and the shutdown
//! lifecycle; call handling is delegated to the store service.

mod connection;

use crate::service::StoreService;
use tokio::net::TcpListener;
use tokio_util::sync::CancellationToken;
use tokio_util::task::TaskTracker;
use tracing::{error, info};

/// RPC server over a store service
pub struct RpcServer {
    service: StoreService,
}

impl RpcServer {
    pub fn new(service: StoreService) -> Self {
        RpcServer { service }
    }

    /// Serve connections until `shutdown` is cancelled
    ///
    /// After cancellation no new connections are accepted, idle connections
    /// close between requests and this future resolves once every
    /// in-flight request has been answered. Callers bound that wait.
    pub async fn serve(self, listener: TcpListener, shutdown: CancellationToken) -> anyhow::Result<()> {
        info!("RPC server listening on {}", listener.local_addr()?);

        let tracker = TaskTracker::new();

        loop {
            // Accept incoming connections
            let (socket, addr) = tokio::select! {
                _ = shutdown.cancelled() => break,
                accepted = listener.accept() => accepted?,
            };
            info!("New RPC connection from {}", addr);

            if let Err(e) = socket.set_nodelay(true) {
                error!("Failed to set TCP_NODELAY for {}: {}", addr, e);
            }

            let service = self.service.clone();
            let shutdown = shutdown.clone();

            // Spawn a new task to handle this connection
            tracker.spawn(async move {
                if let Err(e) = connection::serve(socket, service, shutdown).await {
                    error!("Connection error from {}: {}", addr, e);
                }

                info!("Connection closed: {}", addr);
            });
        }

        info!("RPC server draining {} connection(s)", tracker.len());
        tracker.close();
        tracker.wait().await;
        info!("RPC server stopped");

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::protocol::{Code, Connection, Reply, Request};
    use crate::store::MemoryStore;
    use bytes::BufMut;
    use std::sync::Arc;
    use std::time::Duration;
    use tokio::io::{AsyncReadExt, AsyncWriteExt};
    use tokio::net::TcpStream;

    async fn start() -> (std::net::SocketAddr, CancellationToken, tokio::task::JoinHandle<anyhow::Result<()>>) {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        let shutdown = CancellationToken::new();
        let server = RpcServer::new(StoreService::new(Arc::new(MemoryStore::new())));
        let handle = tokio::spawn(server.serve(listener, shutdown.clone()));
        (addr, shutdown, handle)
    }

    #[tokio::test]
    async fn test_requests_answered_in_order() {
        let (addr, shutdown, _handle) = start().await;
        let mut conn = Connection::connect(addr).await.unwrap();

        conn.write_request(&Request::Put {
            key: "k".into(),
            value: "v".into(),
        })
        .await
        .unwrap();
        assert_eq!(conn.read_response().await.unwrap(), Ok(Reply::Put { status: "OK".into() }));

        conn.write_request(&Request::Get { key: "k".into() }).await.unwrap();
        assert_eq!(conn.read_response().await.unwrap(), Ok(Reply::Get { value: "v".into() }));

        conn.write_request(&Request::Delete { key: "missing".into() }).await.unwrap();
        let status = conn.read_response().await.unwrap().unwrap_err();
        assert_eq!(status.code(), Code::NotFound);

        shutdown.cancel();
    }

    #[tokio::test]
    async fn test_garbage_gets_internal_status_and_close() {
        let (addr, shutdown, _handle) = start().await;
        let mut stream = TcpStream::connect(addr).await.unwrap();

        // Valid length, nonsense body
        let mut frame = Vec::new();
        frame.put_u32(16);
        frame.extend_from_slice(&[0xAB; 16]);
        stream.write_all(&frame).await.unwrap();

        let mut conn = Connection::new(stream);
        let status = conn.read_response().await.unwrap().unwrap_err();
        assert_eq!(status.code(), Code::Internal);

        // Server hung up afterwards
        let mut rest = Vec::new();
        let mut stream = conn.into_inner();
        assert_eq!(stream.read_to_end(&mut rest).await.unwrap(), 0);

        shutdown.cancel();
    }

    #[tokio::test]
    async fn test_shutdown_closes_idle_connections() {
        let (addr, shutdown, handle) = start().await;
        let mut conn = Connection::connect(addr).await.unwrap();

        conn.write_request(&Request::Get { key: "k".into() }).await.unwrap();
        conn.read_response().await.unwrap().unwrap_err();

        shutdown.cancel();

        let stopped = tokio::time::timeout(Duration::from_secs(5), handle).await;
        assert!(stopped.unwrap().unwrap().is_ok());

        // The idle connection was closed by the server
        let mut stream = conn.into_inner();
        let mut rest = Vec::new();
        assert_eq!(stream.read_to_end(&mut rest).await.unwrap(), 0);
    }
}
