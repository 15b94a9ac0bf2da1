//! PriceLab - price A/B testing service for e-commerce storefronts.
//!
//! Standalone server with a REST API for the storefront script and the
//! merchant dashboard.

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use anyhow::Result;
use tokio::signal;
use tower::limit::ConcurrencyLimitLayer;
use tower_http::trace::TraceLayer;
use tracing::info;
use tracing_subscriber::EnvFilter;

use pricelab::config::ServerConfig;
use pricelab::handlers::{build_routes, AppContext};
use pricelab::{metrics, middleware};

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    metrics::register_metrics();

    let config = ServerConfig::from_env();
    let addr = SocketAddr::new(config.host, config.port);
    let context = Arc::new(AppContext::new(config.clone()));

    // Periodic retention sweep for old funnel events
    let purge_context = context.clone();
    let purge_interval = Duration::from_secs(config.purge_interval_hours * 3600);
    let retention_days = config.event_retention_days;
    tokio::spawn(async move {
        let mut ticker = tokio::time::interval(purge_interval);
        ticker.tick().await; // first tick fires immediately; skip it
        loop {
            ticker.tick().await;
            if let Err(e) = purge_context.manager.purge_expired(retention_days) {
                tracing::error!(error = %e, "retention sweep failed");
            }
        }
    });

    let app = build_routes(context)
        .layer(axum::middleware::from_fn(middleware::track_metrics))
        .layer(TraceLayer::new_for_http())
        .layer(ConcurrencyLimitLayer::new(config.max_concurrent_requests));

    info!(%addr, "pricelab listening");
    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    info!("shutdown complete");
    Ok(())
}

/// Resolve on ctrl-c or SIGTERM so Kubernetes can drain us.
async fn shutdown_signal() {
    let ctrl_c = async {
        signal::ctrl_c().await.expect("install ctrl-c handler");
    };

    #[cfg(unix)]
    let terminate = async {
        signal::unix::signal(signal::unix::SignalKind::terminate())
            .expect("install SIGTERM handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => info!("received ctrl-c"),
        _ = terminate => info!("received SIGTERM"),
    }
}
