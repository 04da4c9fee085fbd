//! HTTP server implementation

use axum::{
    extract::DefaultBodyLimit,
    middleware,
    routing::{get, put},
    Router,
};
use std::time::Duration;
use tokio::net::TcpListener;
use tokio_util::sync::CancellationToken;
use tower_http::{cors::CorsLayer, timeout::TimeoutLayer, trace::TraceLayer};
use tracing::info;

use super::handlers::{delete_value, get_value, missing_key, put_value, timeout_as_failure, AppState};
use crate::protocol::MAX_FRAME_SIZE;

/// Build the gateway router
///
/// PUT bodies may be as large as one RPC frame.
pub fn router(client: AppState, request_timeout: Duration) -> Router {
    Router::new()
        .route("/store", put(put_value).get(missing_key).delete(missing_key))
        .route("/store/", get(missing_key).delete(missing_key))
        .route("/store/:key", get(get_value).delete(delete_value))
        .layer(DefaultBodyLimit::max(MAX_FRAME_SIZE))
        .layer(TimeoutLayer::new(request_timeout))
        .layer(middleware::from_fn(timeout_as_failure))
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
        .with_state(client)
}

/// Run the gateway until `shutdown` is cancelled
///
/// In-flight requests are allowed to finish; callers bound that wait.
pub async fn serve(listener: TcpListener, app: Router, shutdown: CancellationToken) -> anyhow::Result<()> {
    info!("HTTP gateway available at http://{}", listener.local_addr()?);

    axum::serve(listener, app)
        .with_graceful_shutdown(async move { shutdown.cancelled().await })
        .await?;

    info!("HTTP gateway stopped");
    Ok(())
}
