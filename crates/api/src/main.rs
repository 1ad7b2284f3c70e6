mod config;
mod error;
mod game;
mod handlers;
mod state;
mod stores;
#[cfg(test)]
mod test_utils;

use std::net::SocketAddr;
use std::sync::Arc;

use anyhow::Result;
use axum::{Router, http};
use clap::Parser;
use tokio::{net::TcpListener, sync::watch};
use tower_http::{
    limit::RequestBodyLimitLayer,
    request_id::{MakeRequestUuid, PropagateRequestIdLayer, SetRequestIdLayer},
    trace::TraceLayer,
};
use tracing_subscriber::{EnvFilter, fmt, layer::SubscriberExt, util::SubscriberInitExt};

use crate::{
    config::Config,
    game::{AccrualJob, Catalog, Economy, Leaderboard, LeaseManager, RateLimiter},
    state::AppState,
    stores::{MemoryStore, RedisStore, SharedStore},
};

#[derive(Parser)]
#[command(name = "api")]
#[command(about = "Auto-feeder game server")]
struct Args {
    /// Serve HTTP only; do not run the auto-feeder scheduler on this replica
    #[arg(long)]
    no_scheduler: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();
    let config = Config::from_env()?;

    // Initialize Sentry for error tracking (must be done early, guard must stay alive)
    let _sentry_guard = config.sentry_dsn.as_ref().map(|dsn| {
        sentry::init((
            dsn.as_str(),
            sentry::ClientOptions {
                release: sentry::release_name!(),
                environment: Some(config.env.clone().into()),
                ..Default::default()
            },
        ))
    });

    // Set up tracing: JSON in production, human-readable otherwise
    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    if config.is_production() {
        tracing_subscriber::registry()
            .with(env_filter)
            .with(fmt::layer().json())
            .init();
    } else {
        tracing_subscriber::registry()
            .with(env_filter)
            .with(fmt::layer())
            .init();
    }

    let store: Arc<dyn SharedStore> = if config.is_memory_store() {
        tracing::warn!("Using in-memory store; state is not shared between replicas");
        Arc::new(MemoryStore::new())
    } else {
        let client = redis::Client::open(config.store_url.as_str())?;
        Arc::new(RedisStore::new(client, config.namespace.clone()))
    };

    // Build game components
    let leaderboard = Leaderboard::new(store.clone(), config.accrual_snapshot_limit);
    let economy = Economy::new(
        store.clone(),
        leaderboard.clone(),
        Arc::new(Catalog::standard()),
    );
    let rate_limiter = RateLimiter::new(store.clone(), config.rate_limit_policy());

    let (shutdown_tx, shutdown_rx) = watch::channel(false);
    let scheduler = if config.scheduler_enabled && !args.no_scheduler {
        let job = AccrualJob::new(
            leaderboard.clone(),
            economy.clone(),
            LeaseManager::new(store.clone()),
            config.accrual_lease_ttl(),
        );
        Some(game::accrual::spawn(
            job,
            config.accrual_interval(),
            shutdown_rx,
        ))
    } else {
        tracing::info!("Auto-feeder scheduler disabled on this replica");
        None
    };

    let state = AppState {
        config: config.clone(),
        store,
        rate_limiter,
        leaderboard,
        economy,
    };

    // Request ID header name
    let x_request_id = http::HeaderName::from_static("x-request-id");

    let app = Router::new()
        .merge(handlers::game::router())
        .nest("/health", handlers::health::router())
        .with_state(state)
        // Request ID: generate UUID, include in logs, return in response
        .layer(PropagateRequestIdLayer::new(x_request_id.clone()))
        .layer(TraceLayer::new_for_http().make_span_with(
            |request: &http::Request<axum::body::Body>| {
                let request_id = request
                    .headers()
                    .get("x-request-id")
                    .and_then(|v| v.to_str().ok())
                    .unwrap_or("-");

                tracing::info_span!(
                    "http",
                    method = %request.method(),
                    uri = %request.uri(),
                    request_id = %request_id,
                )
            },
        ))
        .layer(SetRequestIdLayer::new(x_request_id, MakeRequestUuid))
        .layer(RequestBodyLimitLayer::new(64 * 1024)); // 64KB limit

    let addr: SocketAddr = format!("{}:{}", config.host, config.port).parse()?;
    let listener = TcpListener::bind(addr).await?;

    tracing::info!("Listening on {}", addr);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    // Let an in-flight tick finish before exiting
    let _ = shutdown_tx.send(true);
    if let Some(handle) = scheduler {
        if let Err(e) = handle.await {
            tracing::error!("Scheduler task failed: {}", e);
        }
    }

    tracing::info!("Shutdown complete");

    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!("Failed to listen for Ctrl+C: {}", e);
            std::future::pending::<()>().await;
        }
    };

    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(e) => {
                tracing::error!("Failed to install SIGTERM handler: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    tokio::select! {
        _ = ctrl_c => tracing::info!("Received Ctrl+C, shutting down..."),
        _ = terminate => tracing::info!("Received SIGTERM, shutting down..."),
    }
}
