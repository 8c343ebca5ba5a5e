use std::{future::Future, net::SocketAddr, path::Path};

use axum::Router;
use configs::{AppConfig, StorageBackend};
use migration::MigratorTrait;
use service::Services;
use tower_http::cors::CorsLayer;
use tracing::{info, warn};

use crate::errors::StartupError;
use crate::routes;

fn build_cors() -> CorsLayer {
    CorsLayer::very_permissive()
}

/// Open the configured storage backend and wire the collection services.
pub async fn build_services(cfg: &AppConfig) -> Result<Services, StartupError> {
    let services = match cfg.storage.backend {
        StorageBackend::Postgres => {
            let db = models::db::connect_with_config(&cfg.database).await?;
            if cfg.database.auto_migrate {
                migration::Migrator::up(&db, None)
                    .await
                    .map_err(|e| StartupError::Any(anyhow::anyhow!("migrate up failed: {e}")))?;
                info!("migrations applied");
            }
            Services::seaorm(db)?
        }
        StorageBackend::Memory => {
            warn!("memory storage selected; records are lost on restart");
            Services::memory()?
        }
        StorageBackend::File => {
            let dir = Path::new(&cfg.storage.data_dir);
            common::env::ensure_data_dir(dir).await?;
            Services::file(dir).await?
        }
    };
    info!(backend = ?cfg.storage.backend, "storage ready");
    Ok(services)
}

/// Router for a configuration, with CORS and tracing layers applied.
pub async fn build_app(cfg: &AppConfig) -> Result<Router, StartupError> {
    let services = build_services(cfg).await?;
    Ok(routes::build_router(&services, build_cors()))
}

fn bind_addr(cfg: &AppConfig) -> Result<SocketAddr, StartupError> {
    format!("{}:{}", cfg.server.host, cfg.server.port)
        .parse()
        .map_err(|e| StartupError::InvalidConfig(format!("bad bind address: {e}")))
}

/// Resolve on Ctrl+C.
pub async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        warn!(error = %e, "cannot listen for Ctrl+C; shutdown only by termination");
        std::future::pending::<()>().await;
    }
    info!("shutdown signal received");
}

/// Serve with an explicit configuration until `shutdown` resolves.
pub async fn run_with_config<F>(cfg: AppConfig, shutdown: F) -> anyhow::Result<()>
where
    F: Future<Output = ()> + Send + 'static,
{
    let app = build_app(&cfg).await?;
    let addr = bind_addr(&cfg)?;
    let listener = tokio::net::TcpListener::bind(addr).await?;
    info!(%addr, "listening");
    axum::serve(listener, app).with_graceful_shutdown(shutdown).await?;
    info!("server stopped");
    Ok(())
}
