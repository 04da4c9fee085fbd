use anyhow::Context;
use kvgate::{web, Config, MemoryStore, RpcClient, RpcServer, StoreService};
use std::sync::Arc;
use tokio::net::TcpListener;
use tokio::signal;
use tokio::task::{JoinError, JoinSet};
use tokio_util::sync::CancellationToken;
use tracing::{error, info, warn};

#[tokio::main]
async fn main() {
    // Initialize logging (INFO unless RUST_LOG says otherwise)
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    if let Err(e) = run().await {
        error!("{:#}", e);
        std::process::exit(1);
    }
}

async fn run() -> anyhow::Result<()> {
    let config = Config::from_env().context("failed to load configuration")?;
    info!("kvgate starting in '{}' role", config.role);

    let shutdown = CancellationToken::new();
    let mut servers = JoinSet::new();

    if config.role.runs_store() {
        let listener = TcpListener::bind(&config.rpc_listen_addr)
            .await
            .with_context(|| format!("failed to bind RPC listener on {}", config.rpc_listen_addr))?;

        // The store lives as long as the RPC server that owns it
        let service = StoreService::new(Arc::new(MemoryStore::new()));
        servers.spawn(RpcServer::new(service).serve(listener, shutdown.clone()));
    }

    if config.role.runs_gateway() {
        let listener = TcpListener::bind(&config.http_listen_addr)
            .await
            .with_context(|| format!("failed to bind HTTP listener on {}", config.http_listen_addr))?;

        info!("Gateway forwarding to RPC server at {}", config.rpc_server_addr);
        let client = Arc::new(RpcClient::new(config.rpc_server_addr.clone(), config.rpc_timeout));
        let app = web::router(client, config.http_timeout);
        servers.spawn(web::serve(listener, app, shutdown.clone()));
    }

    // Wait for a signal, or for a server to stop on its own
    tokio::select! {
        _ = shutdown_signal() => info!("Shutdown signal received"),
        Some(result) = servers.join_next() => {
            report(result);
            warn!("A server stopped unexpectedly, shutting down");
        }
    }

    shutdown.cancel();

    let drain = async {
        while let Some(result) = servers.join_next().await {
            report(result);
        }
    };

    if tokio::time::timeout(config.shutdown_timeout, drain).await.is_err() {
        warn!("Shutdown timed out after {:?}, forcing stop", config.shutdown_timeout);
        servers.abort_all();
    } else {
        info!("kvgate stopped gracefully");
    }

    Ok(())
}

fn report(result: Result<anyhow::Result<()>, JoinError>) {
    match result {
        Ok(Ok(())) => {}
        Ok(Err(e)) => error!("Server error: {:#}", e),
        Err(e) => error!("Server task failed: {}", e),
    }
}

/// Resolves on SIGINT, or SIGTERM on unix
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            error!("Failed to listen for Ctrl+C: {}", e);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut sigterm) => {
                sigterm.recv().await;
            }
            Err(e) => {
                error!("Failed to listen for SIGTERM: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
}
