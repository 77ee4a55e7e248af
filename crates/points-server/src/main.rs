mod config;

use std::sync::Arc;

use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;
use tracing::{error, info};

use points_api::password::hash_password;
use points_api::{AppState, AppStateInner};
use points_db::Database;

use crate::config::Config;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load .env if present
    let _ = dotenvy::dotenv();

    // Init logging
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| {
                "points_admin=debug,points_api=debug,points_db=info,tower_http=debug".into()
            }),
        )
        .init();

    let config = match Config::from_env() {
        Ok(config) => config,
        Err(e) => {
            error!("Invalid configuration: {:#}", e);
            std::process::exit(1);
        }
    };

    // Init database
    let db = Database::open(&config.db_path)?;
    if let Some((username, password)) = &config.bootstrap_admin {
        bootstrap_admin(&db, username, password)?;
    }
    info!(
        "{} users, {} ledger entries",
        db.count_users()?,
        db.count_ledger_entries()?
    );

    let state: AppState = Arc::new(AppStateInner {
        db,
        jwt_secret: config.jwt_secret,
        token_ttl: config.token_ttl,
    });

    let app = points_api::router(state)
        .layer(CorsLayer::permissive())
        .layer(TraceLayer::new_for_http());

    info!("Points admin listening on {}", config.addr);

    let listener = tokio::net::TcpListener::bind(config.addr).await?;
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    Ok(())
}

/// Insert the configured admin unless one with that name already exists.
/// Existing admin rows are never touched.
fn bootstrap_admin(db: &Database, username: &str, password: &str) -> anyhow::Result<()> {
    if db.get_admin(username)?.is_some() {
        info!("Admin '{}' already exists, skipping bootstrap", username);
        return Ok(());
    }
    db.create_admin(username, &hash_password(password)?)?;
    info!("Bootstrapped admin '{}'", username);
    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = tokio::signal::ctrl_c();
    #[cfg(unix)]
    {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut sigterm) => {
                tokio::select! {
                    _ = ctrl_c => info!("Received Ctrl+C, shutting down..."),
                    _ = sigterm.recv() => info!("Received SIGTERM, shutting down..."),
                }
            }
            Err(e) => {
                error!("Failed to install SIGTERM handler: {}", e);
                ctrl_c.await.ok();
                info!("Received Ctrl+C, shutting down...");
            }
        }
    }
    #[cfg(not(unix))]
    {
        ctrl_c.await.ok();
        info!("Received Ctrl+C, shutting down...");
    }
}
