//! Connection handling
//!
//! Reads request frames from one client, hands them to the store service
//! and writes the responses back in order.

use crate::protocol::{Connection, ConnectionError, Status};
use crate::service::StoreService;
use tokio::net::TcpStream;
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

/// Serve one client until it disconnects, sends garbage, or shutdown starts
pub(super) async fn serve(
    stream: TcpStream,
    service: StoreService,
    shutdown: CancellationToken,
) -> Result<(), ConnectionError> {
    let mut connection = Connection::new(stream);

    loop {
        // Shutdown only interrupts a connection waiting for its next request
        let read = tokio::select! {
            _ = shutdown.cancelled() => {
                debug!("Shutdown requested, closing idle connection");
                return Ok(());
            }
            read = connection.read_request() => read,
        };

        let request = match read {
            Ok(Some(request)) => request,
            Ok(None) => return Ok(()),
            Err(ConnectionError::Frame(e)) => {
                // Framing is lost, answer once and hang up
                warn!("Protocol error: {}", e);
                let status = Status::internal(format!("protocol error: {}", e));
                connection.write_response(&Err(status)).await?;
                return Ok(());
            }
            Err(e) => return Err(e),
        };

        let method = request.method();
        let response = service.handle(request);

        debug!("{} -> {}", method, response.as_ref().map_or_else(|s| s.code().as_str(), |_| "ok"));

        connection.write_response(&response).await?;
    }
}
