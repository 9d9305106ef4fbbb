use axum::Router;
use chrono::Utc;
use dotenvy::dotenv;
use log::{error, info};
use std::net::{IpAddr, Ipv4Addr, SocketAddr};
use std::sync::Arc;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

mod config;
mod delivery;
mod lists;
mod shared;

use crate::config::AppConfig;
use crate::shared::state::AppState;
use crate::shared::utils::{create_conn, run_migrations, DbPool};

#[tokio::main]
async fn main() -> std::io::Result<()> {
    dotenv().ok();
    env_logger::init();

    let config = AppConfig::from_env().map_err(std::io::Error::other)?;

    let pool = create_conn(&config.database_url()).map_err(|e| {
        error!("failed to create database pool: {}", e);
        std::io::Error::other(e)
    })?;
    run_migrations(&pool).map_err(|e| {
        error!("failed to run migrations: {}", e);
        std::io::Error::other(e.to_string())
    })?;

    if config.retention.retention_days > 0 {
        spawn_retention_job(pool.clone(), config.retention.retention_days);
    } else {
        info!("retention purge disabled (RETENTION_DAYS=0), schedule it externally");
    }

    let state = Arc::new(AppState {
        conn: pool,
        config: config.clone(),
    });

    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    let app = Router::new()
        .merge(delivery::configure())
        .layer(cors)
        .layer(TraceLayer::new_for_http())
        .with_state(state);

    let host: IpAddr = config
        .server
        .host
        .parse()
        .unwrap_or(IpAddr::V4(Ipv4Addr::LOCALHOST));
    let addr = SocketAddr::from((host, config.server.port));

    let listener = match tokio::net::TcpListener::bind(addr).await {
        Ok(l) => l,
        Err(e) => {
            error!(
                "Failed to bind to {}: {} - is another instance running?",
                addr, e
            );
            return Err(e);
        }
    };
    info!("HTTP server listening on {}", addr);
    axum::serve(listener, app.into_make_service())
        .with_graceful_shutdown(shutdown_signal())
        .await
        .map_err(std::io::Error::other)
}

/// Periodically delete delivery logs older than the retention window.
/// Purge needs no exclusivity: rows sent after the cutoff are unaffected
/// by definition, so running alongside live inserts is safe.
fn spawn_retention_job(pool: DbPool, retention_days: i64) {
    info!("retention purge enabled: {} days, daily run", retention_days);
    tokio::spawn(async move {
        let mut interval = tokio::time::interval(std::time::Duration::from_secs(24 * 60 * 60));
        loop {
            interval.tick().await;
            let cutoff = Utc::now() - chrono::Duration::days(retention_days);
            let conn = pool.clone();
            match tokio::task::spawn_blocking(move || {
                delivery::purge_delivery_logs_before(&conn, cutoff)
            })
            .await
            {
                Ok(Ok(deleted)) => {
                    info!(
                        "retention purge removed {} delivery logs older than {}",
                        deleted, cutoff
                    );
                }
                Ok(Err(e)) => error!("retention purge failed: {}", e),
                Err(e) => error!("retention purge task panicked: {}", e),
            }
        }
    });
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            error!("failed to install Ctrl+C handler: {}", e);
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(e) => error!("failed to install SIGTERM handler: {}", e),
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
    info!("Shutting down HTTP server...");
}
