//! Gatekeeper Server - Main Entry Point
//!
//! Prepares the permission database: applies migrations and resets the
//! permission catalog to the built-in list.

use std::sync::Arc;

use anyhow::{Context, Result};
use tracing::info;

use gatekeeper_server::permissions::{catalog, PermissionService, PgPermissionStore};
use gatekeeper_server::{config, db};

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize tracing
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "gatekeeper_server=debug".into()),
        )
        .json()
        .init();

    // Load configuration
    dotenvy::dotenv().ok();
    let config = config::Config::from_env()?;

    info!(
        version = env!("CARGO_PKG_VERSION"),
        "Starting Gatekeeper Server"
    );

    // Initialize database
    let db_pool = db::create_pool(&config.database_url, config.database_max_connections).await?;
    db::run_migrations(&db_pool).await?;

    let service = PermissionService::new(Arc::new(PgPermissionStore::new(db_pool)));

    if config.sync_permissions_on_startup {
        service
            .sync_catalog()
            .await
            .context("Failed to initialize permission catalog")?;
        info!(
            permissions = catalog::all_permissions().len(),
            "Permission catalog synchronized"
        );
    } else {
        info!("Permission catalog sync disabled");
    }

    Ok(())
}
