use std::net::SocketAddr;

use axum::Router;
use migration::MigratorTrait;
use sea_orm::DatabaseConnection;
use tokio::sync::watch;
use tower_http::cors::CorsLayer;
use tracing::info;

use configs::AppConfig;
use models::db::{connect_with_config, DatabaseConfig};
use service::auth::repo::seaorm::SeaOrmAuthRepository;
use service::jobs::{Scheduler, SchedulerConfig};

use crate::errors::StartupError;
use crate::routes::{self, auth::ServerState};

fn build_cors() -> CorsLayer {
    CorsLayer::very_permissive()
}

fn bind_addr(cfg: &AppConfig) -> Result<SocketAddr, StartupError> {
    format!("{}:{}", cfg.server.host, cfg.server.port)
        .parse()
        .map_err(|e| StartupError::InvalidConfig(format!("server address: {}", e)))
}

/// Connect, run pending migrations and make sure the admin account exists.
pub async fn prepare_database(cfg: &AppConfig) -> Result<DatabaseConnection, StartupError> {
    let db = connect_with_config(&DatabaseConfig::from(&cfg.database))
        .await
        .map_err(|e| StartupError::Database(e.to_string()))?;
    models::db::test_connection(&db)
        .await
        .map_err(|e| StartupError::Database(format!("connection check: {}", e)))?;
    migration::Migrator::up(&db, None)
        .await
        .map_err(|e| StartupError::Database(format!("migrations: {}", e)))?;
    info!(event = "migrations_applied", "database schema up to date");
    let repo = SeaOrmAuthRepository::new(db.clone());
    service::seed::ensure_admin(&repo, &cfg.admin)
        .await
        .map_err(|e| StartupError::Database(format!("admin seed: {}", e)))?;
    Ok(db)
}

pub fn build_app(state: ServerState) -> Router {
    routes::build_router(state, build_cors())
}

async fn wait_for(mut shutdown: watch::Receiver<bool>) {
    while !*shutdown.borrow() {
        if shutdown.changed().await.is_err() {
            break;
        }
    }
}

/// Serve the HTTP API until `shutdown` flips; also runs the job scheduler when enabled.
pub async fn run(cfg: AppConfig, shutdown: watch::Receiver<bool>) -> anyhow::Result<()> {
    let db = prepare_database(&cfg).await?;
    let state = ServerState::new(db, &cfg);

    let scheduler_tasks = if cfg.jobs.enabled {
        Scheduler::new(state.jobs.clone(), SchedulerConfig::from(&cfg.jobs)).spawn(shutdown.clone())
    } else {
        info!("background jobs disabled");
        Vec::new()
    };

    let app = build_app(state);
    let addr = bind_addr(&cfg)?;
    info!(%addr, event = "listening", "starting http server");
    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).with_graceful_shutdown(wait_for(shutdown)).await?;

    for task in scheduler_tasks {
        let _ = task.await;
    }
    Ok(())
}

/// Scheduler only, no HTTP listener.
pub async fn run_worker(cfg: AppConfig, shutdown: watch::Receiver<bool>) -> anyhow::Result<()> {
    let db = prepare_database(&cfg).await?;
    let state = ServerState::new(db, &cfg);
    let tasks = Scheduler::new(state.jobs, SchedulerConfig::from(&cfg.jobs)).spawn(shutdown);
    for task in tasks {
        task.await?;
    }
    Ok(())
}
