//! kicker-daemon entry point.
//!
//! Thin on purpose: tracing, config, database, the match controller, then
//! middleware and the HTTP server. Handlers live in `routes.rs`; shared state
//! and background tasks in `state.rs`.

use std::sync::Arc;

use anyhow::Context;
use axum::http::{HeaderValue, Method};
use kicker_daemon::{config::DaemonConfig, routes, state};
use kicker_db::{PgEventSource, PgMatchStore};
use kicker_match::MatchController;
use tower_http::{
    cors::CorsLayer,
    trace::{DefaultMakeSpan, DefaultOnResponse, TraceLayer},
};
use tracing::{info, Level};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Silent if the file does not exist; production injects env vars directly.
    let _ = dotenvy::from_filename(".env.local");

    init_tracing();

    let cfg = DaemonConfig::from_env().context("daemon config")?;

    let pool = kicker_db::connect_from_env().await?;
    kicker_db::migrate(&pool).await?;
    // A record left open by a previous process can never be resumed.
    kicker_db::close_orphaned_matches(&pool).await?;

    let bus = state::bus_channel(cfg.bus_capacity);
    let controller = Arc::new(MatchController::new(
        Arc::new(PgEventSource::new(pool.clone())),
        Arc::new(PgMatchStore::new(pool.clone())),
        Arc::new(state::BusNotifier::new(bus.clone())),
    ));
    let shared = Arc::new(state::AppState::new(controller, bus, Some(pool)));

    state::spawn_heartbeat(shared.bus.clone(), cfg.heartbeat_interval);
    state::spawn_reconcile_tick(Arc::clone(&shared), cfg.reconcile_interval);

    let app = routes::build_router(Arc::clone(&shared))
        .layer(
            TraceLayer::new_for_http()
                .make_span_with(DefaultMakeSpan::new().level(Level::INFO))
                .on_response(DefaultOnResponse::new().level(Level::INFO)),
        )
        .layer(cors_localhost_only());

    info!(
        reconcile_ms = cfg.reconcile_interval.as_millis() as u64,
        "kicker-daemon listening on http://{}", cfg.addr
    );

    axum::serve(tokio::net::TcpListener::bind(cfg.addr).await?, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("server crashed")?;

    Ok(())
}

fn init_tracing() {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into()),
        )
        .init();
}

async fn shutdown_signal() {
    let _ = tokio::signal::ctrl_c().await;
    info!("shutdown requested");
}

/// CORS: allow only localhost origins.
fn cors_localhost_only() -> CorsLayer {
    let allowed_origins = [
        "http://localhost",
        "http://127.0.0.1",
        "http://localhost:3000",
        "http://127.0.0.1:3000",
        "http://localhost:5173",
        "http://127.0.0.1:5173",
    ];

    let origins: Vec<HeaderValue> = allowed_origins
        .iter()
        .filter_map(|o| HeaderValue::from_str(o).ok())
        .collect();

    CorsLayer::new()
        .allow_origin(origins)
        .allow_methods([Method::GET, Method::POST, Method::DELETE])
        .allow_headers(tower_http::cors::Any)
}
